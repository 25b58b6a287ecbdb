// 该文件是 Paru 项目的一部分。
// src/compare.rs - 双模型对比
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Paru 项目贡献者

//! 同一图像、同一阈值下，基线模型与 GWO 调优模型的结果对比。

use std::fmt;

use serde::Serialize;

use crate::model::{Confidence, DetectResult};

/// 平均置信度差值小于该值视为相等
pub const CONFIDENCE_TOLERANCE: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
  NotEnoughData,
  DetectedExtra { extra: usize },
  MissedObjects { missed: usize },
  MoreConfident { delta: f32 },
  LessConfident { delta: f32 },
  Equal,
}

impl fmt::Display for Verdict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Verdict::NotEnoughData => write!(f, "not enough data"),
      Verdict::DetectedExtra { extra } => {
        write!(f, "GWO model detected extra objects (+{})", extra)
      }
      Verdict::MissedObjects { missed } => {
        write!(f, "GWO model missed objects (-{})", missed)
      }
      Verdict::MoreConfident { delta } => write!(f, "GWO model more confident (+{:.2})", delta),
      Verdict::LessConfident { delta } => write!(f, "GWO model less confident ({:.2})", delta),
      Verdict::Equal => write!(f, "equal"),
    }
  }
}

/// 根据两次推理结果给出结论
pub fn verdict(baseline: &DetectResult, tuned: &DetectResult) -> Verdict {
  match (baseline.len(), tuned.len()) {
    (0, 0) => Verdict::NotEnoughData,
    (b, t) if t > b => Verdict::DetectedExtra { extra: t - b },
    (b, t) if t < b => Verdict::MissedObjects { missed: b - t },
    _ => {
      let delta = tuned.mean_confidence().unwrap_or(0.0) - baseline.mean_confidence().unwrap_or(0.0);
      if delta > CONFIDENCE_TOLERANCE {
        Verdict::MoreConfident { delta }
      } else if delta < -CONFIDENCE_TOLERANCE {
        Verdict::LessConfident { delta }
      } else {
        Verdict::Equal
      }
    }
  }
}

/// 单个模型的一次推理
#[derive(Debug, Clone, Serialize)]
pub struct ModelRun {
  pub name: String,
  pub result: DetectResult,
}

impl ModelRun {
  pub fn new(name: impl Into<String>, result: DetectResult) -> Self {
    Self {
      name: name.into(),
      result,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonOutcome {
  pub confidence: Confidence,
  pub baseline: ModelRun,
  pub tuned: ModelRun,
  pub verdict: Verdict,
}

impl ComparisonOutcome {
  pub fn new(confidence: Confidence, baseline: ModelRun, tuned: ModelRun) -> Self {
    let verdict = verdict(&baseline.result, &tuned.result);
    Self {
      confidence,
      baseline,
      tuned,
      verdict,
    }
  }
}
