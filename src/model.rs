// 该文件是 Paru 项目的一部分。
// src/model.rs - 模型
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

use std::{fmt, str::FromStr, sync::Arc};

use serde::Serialize;
use thiserror::Error;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input, confidence: Confidence)
  -> Result<Self::Output, Self::Error>;
}

// 缓存中取出的共享句柄
impl<M: Model + ?Sized> Model for Arc<M> {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(
    &self,
    input: &Self::Input,
    confidence: Confidence,
  ) -> Result<Self::Output, Self::Error> {
    (**self).infer(input, confidence)
  }
}

/// 置信度阈值，取值范围 [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Confidence(f32);

#[derive(Error, Debug, PartialEq)]
pub enum ConfidenceError {
  #[error("置信度必须在 [0, 1] 范围内，实际为 {0}")]
  OutOfRange(f32),
  #[error("无法解析置信度: {0}")]
  Parse(String),
  #[error("置信度必须是 {step} 的整数倍，实际为 {value}")]
  OffStep { value: f32, step: f32 },
}

impl Confidence {
  /// 滑块步长
  pub const STEP: f32 = 0.05;

  pub fn new(value: f32) -> Result<Self, ConfidenceError> {
    if (0.0..=1.0).contains(&value) {
      Ok(Self(value))
    } else {
      Err(ConfidenceError::OutOfRange(value))
    }
  }

  /// 对比模式的滑块取值：范围 [0, 1] 且落在 `STEP` 刻度上
  pub fn stepped(value: f32) -> Result<Self, ConfidenceError> {
    let confidence = Self::new(value)?;
    let ticks = value / Self::STEP;
    if (ticks - ticks.round()).abs() > 1e-3 {
      return Err(ConfidenceError::OffStep {
        value,
        step: Self::STEP,
      });
    }
    Ok(confidence)
  }

  /// 解析命令行中的滑块取值
  pub fn parse_stepped(s: &str) -> Result<Self, ConfidenceError> {
    Self::stepped(s.parse::<Self>()?.value())
  }

  pub fn value(self) -> f32 {
    self.0
  }

  pub fn admits(self, score: f32) -> bool {
    score >= self.0
  }
}

impl FromStr for Confidence {
  type Err = ConfidenceError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let value = s
      .trim()
      .parse::<f32>()
      .map_err(|_| ConfidenceError::Parse(s.to_string()))?;
    Self::new(value)
  }
}

impl fmt::Display for Confidence {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:.2}", self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectItem {
  pub class_id: u32,
  pub label: String,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，相对原图归一化
}

impl DetectItem {
  /// 边界框在原图中的像素坐标
  pub fn pixel_bbox(&self, width: u32, height: u32) -> [f32; 4] {
    let (w, h) = (width as f32, height as f32);
    [
      self.bbox[0] * w,
      self.bbox[1] * h,
      self.bbox[2] * w,
      self.bbox[3] * h,
    ]
  }
}

/// 单次推理的结果，按置信度降序排列
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
  pub width: u32,
  pub height: u32,
}

impl DetectResult {
  pub fn new(mut items: Vec<DetectItem>, width: u32, height: u32) -> Self {
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    Self {
      items: items.into_boxed_slice(),
      width,
      height,
    }
  }

  pub fn empty(width: u32, height: u32) -> Self {
    Self::new(Vec::new(), width, height)
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn mean_confidence(&self) -> Option<f32> {
    if self.items.is_empty() {
      return None;
    }
    let sum: f32 = self.items.iter().map(|item| item.score).sum();
    Some(sum / self.items.len() as f32)
  }

  pub fn max_confidence(&self) -> Option<f32> {
    self.items.first().map(|item| item.score)
  }

  /// 以更高的阈值重新筛选，不重新推理
  pub fn above(&self, confidence: Confidence) -> Self {
    Self {
      items: self
        .items
        .iter()
        .filter(|item| confidence.admits(item.score))
        .cloned()
        .collect(),
      width: self.width,
      height: self.height,
    }
  }
}

pub mod cache;
mod labels;
mod postprocess;
mod yolov8;

pub use self::cache::ModelCache;
pub use self::labels::ClassNames;
pub use self::postprocess::{PostprocessOptions, postprocess};
pub use self::yolov8::{Yolov8, Yolov8Builder, Yolov8Error};

#[cfg(test)]
mod tests {
  use super::*;

  fn item(score: f32) -> DetectItem {
    DetectItem {
      class_id: 0,
      label: "pneumonia".to_string(),
      score,
      bbox: [0.1, 0.1, 0.4, 0.4],
    }
  }

  #[test]
  fn stepped_confidence_follows_slider_ticks() {
    for value in ["0", "0.05", "0.25", "0.35", "0.95", "1"] {
      assert!(Confidence::parse_stepped(value).is_ok(), "{}", value);
    }
    assert!(matches!(
      Confidence::parse_stepped("0.33"),
      Err(ConfidenceError::OffStep { .. })
    ));
    assert!(matches!(
      Confidence::parse_stepped("1.05"),
      Err(ConfidenceError::OutOfRange(_))
    ));
    assert!(matches!(
      Confidence::parse_stepped("high"),
      Err(ConfidenceError::Parse(_))
    ));
  }

  #[test]
  fn confidence_rejects_out_of_range() {
    assert_eq!(Confidence::new(1.2), Err(ConfidenceError::OutOfRange(1.2)));
    assert!(Confidence::new(-0.01).is_err());
    assert!(Confidence::new(0.0).is_ok());
    assert!(Confidence::new(1.0).is_ok());
    assert!("abc".parse::<Confidence>().is_err());
    assert_eq!("0.25".parse::<Confidence>().unwrap().value(), 0.25);
  }

  #[test]
  fn result_sorted_and_summarized() {
    let result = DetectResult::new(vec![item(0.3), item(0.9), item(0.6)], 100, 100);
    let scores: Vec<f32> = result.items.iter().map(|i| i.score).collect();
    assert_eq!(scores, vec![0.9, 0.6, 0.3]);
    assert_eq!(result.max_confidence(), Some(0.9));
    assert!((result.mean_confidence().unwrap() - 0.6).abs() < 1e-6);
    assert_eq!(DetectResult::empty(1, 1).mean_confidence(), None);
  }

  #[test]
  fn above_never_grows() {
    let result = DetectResult::new(vec![item(0.3), item(0.5), item(0.8)], 10, 10);
    let mut last = result.len();
    for step in 0..=20 {
      let threshold = Confidence::new((step as f32 * Confidence::STEP).min(1.0)).unwrap();
      let count = result.above(threshold).len();
      assert!(count <= last);
      last = count;
    }
    assert_eq!(result.above(Confidence::new(0.5).unwrap()).len(), 2);
  }
}
