// 该文件是 Paru 项目的一部分。
// src/task.rs - 任务流程
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

use image::RgbImage;
use tracing::{info, warn};

use crate::{
  compare::{ComparisonOutcome, ModelRun},
  model::{Confidence, DetectResult, Model},
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 单模型检测：读取一帧、推理一次、渲染一次
#[derive(Debug, Clone, Copy)]
pub struct OneShotTask {
  confidence: Confidence,
}

impl OneShotTask {
  pub fn new(confidence: Confidence) -> Self {
    Self { confidence }
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = RgbImage>,
  M: Model<Input = RgbImage, Output = DetectResult, Error = ME>,
  O: Render<RgbImage, DetectResult, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Output = DetectResult;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!(
      "输入帧获取成功（{}x{}），置信度阈值 {}，开始推理...",
      frame.width(),
      frame.height(),
      self.confidence
    );
    let now = std::time::Instant::now();
    let result = model.infer(&frame, self.confidence)?;
    info!("推理完成，耗时: {:.2?}，检测到 {} 个目标", now.elapsed(), result.len());
    if result.is_empty() {
      warn!("未检测到目标");
    }

    let now = std::time::Instant::now();
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(result)
  }
}

/// 双模型对比：同一帧、同一阈值分别推理
#[derive(Debug, Clone)]
pub struct CompareTask {
  confidence: Confidence,
  baseline_name: String,
  tuned_name: String,
}

impl CompareTask {
  pub fn new(confidence: Confidence) -> Self {
    Self {
      confidence,
      baseline_name: "YOLOv8s".to_string(),
      tuned_name: "YOLOv8s + GWO".to_string(),
    }
  }
}

impl<
  BE: std::error::Error + Sync + Send + 'static,
  TE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = RgbImage>,
  B: Model<Input = RgbImage, Output = DetectResult, Error = BE>,
  T: Model<Input = RgbImage, Output = DetectResult, Error = TE>,
  O: Render<RgbImage, ComparisonOutcome, Error = RE>,
> Task<I, (B, T), O> for CompareTask
{
  type Output = ComparisonOutcome;
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    (baseline, tuned): (B, T),
    output: O,
  ) -> Result<Self::Output, Self::Error> {
    info!("开始对比任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;

    let now = std::time::Instant::now();
    let baseline_result = baseline.infer(&frame, self.confidence)?;
    info!(
      "{} 推理完成，耗时: {:.2?}，检测到 {} 个目标",
      self.baseline_name,
      now.elapsed(),
      baseline_result.len()
    );

    let now = std::time::Instant::now();
    let tuned_result = tuned.infer(&frame, self.confidence)?;
    info!(
      "{} 推理完成，耗时: {:.2?}，检测到 {} 个目标",
      self.tuned_name,
      now.elapsed(),
      tuned_result.len()
    );

    let outcome = ComparisonOutcome::new(
      self.confidence,
      ModelRun::new(self.baseline_name, baseline_result),
      ModelRun::new(self.tuned_name, tuned_result),
    );
    info!("对比结论: {}", outcome.verdict);

    output.render_result(&frame, &outcome)?;
    Ok(outcome)
  }
}
