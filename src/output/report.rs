// 该文件是 Paru 项目的一部分。
// src/output/report.rs - 文本与 JSON 报告
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

use std::{
  io::Write,
  path::{Path, PathBuf},
  sync::Mutex,
};

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  compare::{ComparisonOutcome, ModelRun},
  model::DetectResult,
  output::Render,
  url_file_path,
};

pub const NO_DETECTIONS: &str = "No detections found";

#[derive(Error, Debug)]
pub enum ReportError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 每个检测一行；无检测时只有一行提示
pub fn detection_lines(result: &DetectResult) -> Vec<String> {
  if result.is_empty() {
    return vec![NO_DETECTIONS.to_string()];
  }
  result
    .items
    .iter()
    .map(|item| format!("Detected: {} (confidence {:.2})", item.label, item.score))
    .collect()
}

/// 汇总指标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
  pub count: usize,
  pub mean_confidence: Option<f32>,
  pub max_confidence: Option<f32>,
}

impl From<&DetectResult> for Summary {
  fn from(result: &DetectResult) -> Self {
    Self {
      count: result.len(),
      mean_confidence: result.mean_confidence(),
      max_confidence: result.max_confidence(),
    }
  }
}

impl Summary {
  pub fn line(&self) -> String {
    match (self.mean_confidence, self.max_confidence) {
      (Some(mean), Some(max)) => format!(
        "Objects: {} | mean confidence {:.2} | max confidence {:.2}",
        self.count, mean, max
      ),
      _ => format!("Objects: {}", self.count),
    }
  }
}

/// 控制台（或任意 Write）文本报告
pub struct TextReport<W: Write> {
  writer: Mutex<W>,
  with_summary: bool,
}

impl TextReport<std::io::Stdout> {
  pub fn stdout(with_summary: bool) -> Self {
    Self::new(std::io::stdout(), with_summary)
  }
}

impl<W: Write> TextReport<W> {
  pub fn new(writer: W, with_summary: bool) -> Self {
    Self {
      writer: Mutex::new(writer),
      with_summary,
    }
  }

  pub fn into_inner(self) -> W {
    self
      .writer
      .into_inner()
      .unwrap_or_else(std::sync::PoisonError::into_inner)
  }

  fn write_lines(&self, lines: &[String]) -> Result<(), ReportError> {
    let mut writer = self
      .writer
      .lock()
      .unwrap_or_else(std::sync::PoisonError::into_inner);
    for line in lines {
      writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
  }

  fn run_lines(&self, run: &ModelRun) -> Vec<String> {
    let mut lines = vec![format!("[{}]", run.name)];
    lines.extend(detection_lines(&run.result));
    lines.push(Summary::from(&run.result).line());
    lines
  }
}

impl<W: Write> Render<RgbImage, DetectResult> for TextReport<W> {
  type Error = ReportError;

  fn render_result(&self, _frame: &RgbImage, result: &DetectResult) -> Result<(), Self::Error> {
    let mut lines = detection_lines(result);
    if self.with_summary {
      lines.push(Summary::from(result).line());
    }
    self.write_lines(&lines)
  }
}

impl<W: Write> Render<RgbImage, ComparisonOutcome> for TextReport<W> {
  type Error = ReportError;

  fn render_result(
    &self,
    _frame: &RgbImage,
    result: &ComparisonOutcome,
  ) -> Result<(), Self::Error> {
    let mut lines = vec![format!("Confidence threshold: {}", result.confidence)];
    lines.extend(self.run_lines(&result.baseline));
    lines.extend(self.run_lines(&result.tuned));
    lines.push(format!("Verdict: {}", result.verdict));
    self.write_lines(&lines)
  }
}

/// JSON 报告文件
pub struct JsonReportOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for JsonReportOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonReportOutput {
  type Error = ReportError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReportError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(Self::new(url_file_path(url)))
  }
}

#[derive(Serialize)]
struct DetectionDocument<'a> {
  summary: Summary,
  result: &'a DetectResult,
}

impl JsonReportOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  fn write_json<T: Serialize>(&self, value: &T) -> Result<(), ReportError> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&self.path)?;
    serde_json::to_writer_pretty(file, value)?;
    info!("保存报告到文件: {}", self.path.display());
    Ok(())
  }
}

impl Render<RgbImage, DetectResult> for JsonReportOutput {
  type Error = ReportError;

  fn render_result(&self, _frame: &RgbImage, result: &DetectResult) -> Result<(), Self::Error> {
    self.write_json(&DetectionDocument {
      summary: Summary::from(result),
      result,
    })
  }
}

impl Render<RgbImage, ComparisonOutcome> for JsonReportOutput {
  type Error = ReportError;

  fn render_result(
    &self,
    _frame: &RgbImage,
    result: &ComparisonOutcome,
  ) -> Result<(), Self::Error> {
    self.write_json(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{Confidence, DetectItem};

  fn result(scores: &[f32]) -> DetectResult {
    let items = scores
      .iter()
      .enumerate()
      .map(|(i, &score)| DetectItem {
        class_id: i as u32 % 2,
        label: if i % 2 == 0 { "NORMAL" } else { "PNEUMONIA" }.to_string(),
        score,
        bbox: [0.0, 0.0, 0.5, 0.5],
      })
      .collect();
    DetectResult::new(items, 10, 10)
  }

  #[test]
  fn one_line_per_detection() {
    for scores in [&[][..], &[0.9][..], &[0.9, 0.7, 0.51][..]] {
      let result = result(scores);
      let lines = detection_lines(&result);
      if result.is_empty() {
        assert_eq!(lines, vec![NO_DETECTIONS.to_string()]);
      } else {
        assert_eq!(lines.len(), result.len());
      }
    }
  }

  #[test]
  fn detection_line_format() {
    let lines = detection_lines(&result(&[0.876]));
    assert_eq!(lines[0], "Detected: NORMAL (confidence 0.88)");
  }

  #[test]
  fn text_report_with_summary() {
    let report = TextReport::new(Vec::new(), true);
    let frame = RgbImage::new(10, 10);
    report.render_result(&frame, &result(&[0.8, 0.6])).unwrap();
    let text = String::from_utf8(report.into_inner()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
      lines[2],
      "Objects: 2 | mean confidence 0.70 | max confidence 0.80"
    );
  }

  #[test]
  fn comparison_report_ends_with_verdict() {
    let report = TextReport::new(Vec::new(), false);
    let outcome = ComparisonOutcome::new(
      Confidence::new(0.25).unwrap(),
      ModelRun::new("YOLOv8s", result(&[])),
      ModelRun::new("YOLOv8s + GWO", result(&[])),
    );
    report.render_result(&RgbImage::new(1, 1), &outcome).unwrap();
    let text = String::from_utf8(report.into_inner()).unwrap();
    assert!(text.starts_with("Confidence threshold: 0.25\n[YOLOv8s]\nNo detections found"));
    assert_eq!(text.lines().last(), Some("Verdict: not enough data"));
  }

  #[test]
  fn json_report_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("report.json");
    let output = JsonReportOutput::new(&path);
    output
      .render_result(&RgbImage::new(10, 10), &result(&[0.9, 0.4]))
      .unwrap();

    let value: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["summary"]["count"], 2);
    assert_eq!(value["result"]["items"].as_array().unwrap().len(), 2);
  }
}
