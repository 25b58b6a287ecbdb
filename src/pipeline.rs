// 该文件是 Paru 项目的一部分。
// src/pipeline.rs - 模型、输入与输出的准备
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

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::InputWrapper,
  model::{Yolov8, Yolov8Builder, cache::load_yolov8},
  output::{OutputWrapper, SaveImageFileOutput, TextReport},
  parse_location,
};

/// 先加载模型，再打开输入
///
/// 模型加载失败是致命错误，此时不会读取任何输入。
pub fn prepare<M, I>(
  load: impl FnOnce() -> Result<M>,
  open: impl FnOnce() -> Result<I>,
) -> Result<(M, I)> {
  let model = load()?;
  let input = open()?;
  Ok((model, input))
}

/// 通过进程级缓存加载模型，`configure` 用于设置构建参数
pub fn load_model(
  location: &str,
  configure: impl FnOnce(Yolov8Builder) -> Yolov8Builder,
) -> Result<Arc<Yolov8>> {
  let url = parse_location(location, Yolov8Builder::SCHEME)
    .with_context(|| format!("无效的模型路径: {}", location))?;
  let builder = configure(Yolov8Builder::from_url(&url)?);

  let model = load_yolov8(builder).with_context(|| format!("无法加载模型 {}，程序终止", location))?;
  info!(
    "模型就绪: {}，类别数 {}",
    model.path().display(),
    model.names().len()
  );
  Ok(model)
}

pub fn open_input(location: &str) -> Result<InputWrapper> {
  let url = parse_location(location, "image")
    .with_context(|| format!("无效的输入路径: {}", location))?;
  InputWrapper::from_url(&url).with_context(|| format!("无法读取输入图像: {}", location))
}

/// 控制台报告总在首位，其余输出按给定位置依次创建
pub fn open_outputs(locations: &[String], with_summary: bool) -> Result<Vec<OutputWrapper>> {
  let mut outputs = vec![OutputWrapper::Console(TextReport::stdout(with_summary))];
  for location in locations {
    let url = parse_location(location, SaveImageFileOutput::SCHEME)
      .with_context(|| format!("无效的输出路径: {}", location))?;
    outputs.push(OutputWrapper::from_url(&url)?);
  }
  Ok(outputs)
}
