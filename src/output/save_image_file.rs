// 该文件是 Paru 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像
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
  io::Cursor,
  path::{Path, PathBuf},
};

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  compare::ComparisonOutcome,
  model::DetectResult,
  output::{Render, draw::Draw},
  url_file_path,
};

const DOWNLOAD_PREFIX: &str = "hasil_deteksi";

pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("字体错误: {0}")]
  FontError(#[from] ab_glyph::InvalidFont),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Self::new(url_file_path(uri))
  }
}

/// 将图像编码为 PNG 字节，供下载使用
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
  let mut bytes = Vec::new();
  image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
  Ok(bytes)
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Result<Self, SaveImageFileError> {
    Ok(SaveImageFileOutput {
      path: path.into(),
      draw: Draw::try_new()?,
    })
  }

  /// 目标是目录（或以 `/` 结尾）时生成带时间戳的文件名
  pub fn resolve_path(&self) -> PathBuf {
    let is_dir = self.path.is_dir() || self.path.as_os_str().to_string_lossy().ends_with('/');
    if is_dir {
      let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
      self.path.join(format!("{}_{}.png", DOWNLOAD_PREFIX, stamp))
    } else {
      self.path.clone()
    }
  }

  fn save_image(&self, image: &RgbImage) -> Result<PathBuf, SaveImageFileError> {
    let path = self.resolve_path();
    if let Some(parent) = Path::new(&path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    // 无扩展名时按 PNG 保存
    match ImageFormat::from_path(&path) {
      Ok(_) => image.save(&path)?,
      Err(_) => {
        warn!("无法从扩展名推断格式，按 PNG 保存: {}", path.display());
        std::fs::write(&path, encode_png(image)?)?;
      }
    }

    info!("保存图像到文件: {}", path.display());
    Ok(path)
  }
}

impl Render<RgbImage, DetectResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &RgbImage, result: &DetectResult) -> Result<(), Self::Error> {
    let image = self.draw.annotate(frame, result);
    self.save_image(&image).map(|_| ())
  }
}

impl Render<RgbImage, ComparisonOutcome> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(
    &self,
    frame: &RgbImage,
    result: &ComparisonOutcome,
  ) -> Result<(), Self::Error> {
    let left = self.draw.annotate(frame, &result.baseline.result);
    let right = self.draw.annotate(frame, &result.tuned.result);
    let image = self
      .draw
      .side_by_side(&left, &result.baseline.name, &right, &result.tuned.name);
    self.save_image(&image).map(|_| ())
  }
}
