// 该文件是 Paru 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use paru::{
  pipeline::{load_model, open_input, open_outputs, prepare},
  task::{CompareTask, OneShotTask, Task},
};

use args::{Args, Command};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  match args.command {
    Command::Detect(detect) => {
      info!("模型文件路径: {}", detect.model);
      info!("输入来源: {}", detect.input);
      info!("置信度阈值: {}", detect.confidence);

      let options = &detect.model_options;
      let (model, input) = prepare(
        || load_model(&detect.model, |builder| options.apply(builder)),
        || open_input(&detect.input),
      )?;
      let outputs = open_outputs(&detect.output, detect.summary)?;

      OneShotTask::new(detect.confidence).run_task(input, model, outputs)?;
    }
    Command::Compare(compare) => {
      info!("GWO 模型: {}", compare.model);
      info!("基线模型: {}", compare.baseline);
      info!("输入来源: {}", compare.input);
      info!("置信度阈值: {}", compare.confidence);

      let options = &compare.model_options;
      let ((baseline, tuned), input) = prepare(
        || {
          let tuned = load_model(&compare.model, |builder| options.apply(builder))?;
          let baseline = load_model(&compare.baseline, |builder| options.apply(builder))?;
          Ok((baseline, tuned))
        },
        || open_input(&compare.input),
      )?;
      let outputs = open_outputs(&compare.output, true)?;

      CompareTask::new(compare.confidence).run_task(input, (baseline, tuned), outputs)?;
    }
  }

  Ok(())
}
