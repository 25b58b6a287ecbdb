// 该文件是 Paru 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use paru::model::{Confidence, Yolov8Builder};

/// 胸部 X 光目标检测演示（YOLOv8s + GWO）
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 单模型检测
  Detect(DetectArgs),
  /// 基线模型与 GWO 模型对比
  Compare(CompareArgs),
}

/// 模型公共参数
#[derive(ClapArgs, Debug)]
pub struct ModelOptions {
  /// 模型输入尺寸（32 的倍数）
  #[arg(long, default_value_t = 640, value_name = "PIXELS")]
  pub imgsz: u32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.7, value_name = "THRESHOLD")]
  pub iou: f32,

  /// 每张图最多保留的检测数
  #[arg(long, default_value_t = 300, value_name = "COUNT")]
  pub max_det: usize,

  /// 类别标签文件（每行一个），缺省时读取模型元数据
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,
}

impl ModelOptions {
  pub fn apply(&self, builder: Yolov8Builder) -> Yolov8Builder {
    builder
      .input_size(self.imgsz)
      .iou_threshold(self.iou)
      .max_detections(self.max_det)
      .labels(self.labels.clone())
  }
}

#[derive(ClapArgs, Debug)]
pub struct DetectArgs {
  /// 模型文件（yolov8:///path/best.onnx 或路径）
  #[arg(long, default_value = "best.onnx", value_name = "MODEL")]
  pub model: String,

  /// 输入图像（JPG/JPEG/PNG）
  #[arg(long, value_name = "SOURCE")]
  pub input: String,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: Confidence,

  /// 输出位置，可重复：image://（标注图像，目录则自动命名）或 json://（报告）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Vec<String>,

  /// 显示汇总指标
  #[arg(long)]
  pub summary: bool,

  #[command(flatten)]
  pub model_options: ModelOptions,
}

#[derive(ClapArgs, Debug)]
pub struct CompareArgs {
  /// GWO 调优模型
  #[arg(long, default_value = "best.onnx", value_name = "MODEL")]
  pub model: String,

  /// 基线模型
  #[arg(long, default_value = "yolov8s_base.onnx", value_name = "MODEL")]
  pub baseline: String,

  /// 输入图像（JPG/JPEG/PNG）
  #[arg(long, value_name = "SOURCE")]
  pub input: String,

  /// 置信度阈值 (0.0 - 1.0，步长 0.05)
  #[arg(
    long,
    default_value = "0.25",
    value_name = "THRESHOLD",
    value_parser = Confidence::parse_stepped
  )]
  pub confidence: Confidence,

  /// 输出位置，可重复：image://（并排标注图像）或 json://（报告）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Vec<String>,

  #[command(flatten)]
  pub model_options: ModelOptions,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn detect_defaults() {
    let args = Args::try_parse_from(["paru", "detect", "--input", "xray.png"]).unwrap();
    let Command::Detect(detect) = args.command else {
      panic!("expected detect");
    };
    assert_eq!(detect.model, "best.onnx");
    assert_eq!(detect.confidence.value(), 0.5);
    assert_eq!(detect.model_options.imgsz, 640);
    assert!(detect.output.is_empty());
  }

  #[test]
  fn compare_defaults() {
    let args = Args::try_parse_from([
      "paru",
      "compare",
      "--input",
      "xray.jpg",
      "--output",
      "out/",
      "--output",
      "json://report.json",
    ])
    .unwrap();
    let Command::Compare(compare) = args.command else {
      panic!("expected compare");
    };
    assert_eq!(compare.baseline, "yolov8s_base.onnx");
    assert_eq!(compare.confidence.value(), 0.25);
    assert_eq!(compare.output.len(), 2);
  }

  #[test]
  fn compare_confidence_snaps_to_slider_step() {
    let parse = |value: &str| {
      Args::try_parse_from(["paru", "compare", "--input", "xray.png", "--confidence", value])
    };
    assert!(parse("0.33").is_err());
    let Command::Compare(compare) = parse("0.35").unwrap().command else {
      panic!("expected compare");
    };
    assert_eq!(compare.confidence.value(), 0.35);
  }

  #[test]
  fn confidence_out_of_range_rejected() {
    let result = Args::try_parse_from([
      "paru",
      "detect",
      "--input",
      "xray.png",
      "--confidence",
      "1.5",
    ]);
    assert!(result.is_err());
  }
}
