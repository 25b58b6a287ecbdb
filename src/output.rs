// 该文件是 Paru 项目的一部分。
// src/output.rs - 输出定义
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

pub mod draw;
pub mod report;
mod save_image_file;

pub use self::report::{JsonReportOutput, ReportError, TextReport};
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput, encode_png};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[error("报告输出错误: {0}")]
  ReportError(#[from] ReportError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper {
  SaveImageFileOutput(SaveImageFileOutput),
  JsonReportOutput(JsonReportOutput),
  Console(TextReport<std::io::Stdout>),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      JsonReportOutput::SCHEME => {
        let output = JsonReportOutput::from_url(url)?;
        Ok(OutputWrapper::JsonReportOutput(output))
      }
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl<F, D> Render<F, D> for OutputWrapper
where
  SaveImageFileOutput: Render<F, D, Error = SaveImageFileError>,
  JsonReportOutput: Render<F, D, Error = ReportError>,
  TextReport<std::io::Stdout>: Render<F, D, Error = ReportError>,
{
  type Error = OutputError;

  fn render_result(&self, frame: &F, result: &D) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::SaveImageFileOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      OutputWrapper::JsonReportOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      OutputWrapper::Console(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}

/// 多个输出依次渲染
impl<F, D, R: Render<F, D>> Render<F, D> for Vec<R> {
  type Error = R::Error;

  fn render_result(&self, frame: &F, result: &D) -> Result<(), Self::Error> {
    for output in self {
      output.render_result(frame, result)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dispatches_on_scheme() {
    let json = Url::parse("json:///tmp/report.json").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&json),
      Ok(OutputWrapper::JsonReportOutput(_))
    ));

    let image = Url::parse("image:///tmp/annotated.png").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&image),
      Ok(OutputWrapper::SaveImageFileOutput(_))
    ));

    let rtsp = Url::parse("rtsp://localhost/stream").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&rtsp),
      Err(OutputError::SchemeMismatch(_))
    ));
  }
}
