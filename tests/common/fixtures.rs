use std::convert::Infallible;

use image::{ImageBuffer, Rgb, RgbImage};
use paru::model::{Confidence, DetectItem, DetectResult, Model};
use tempfile::NamedTempFile;

/// 返回固定候选框的模型，按阈值筛选
pub struct FixedModel {
  items: Vec<DetectItem>,
}

impl FixedModel {
  pub fn new(scores: &[f32]) -> Self {
    let items = scores
      .iter()
      .enumerate()
      .map(|(i, &score)| {
        let offset = (i % 4) as f32 * 0.2;
        DetectItem {
          class_id: 0,
          label: "PNEUMONIA".to_string(),
          score,
          bbox: [offset, offset, offset + 0.15, offset + 0.15],
        }
      })
      .collect();
    Self { items }
  }

  pub fn empty() -> Self {
    Self { items: Vec::new() }
  }
}

impl Model for FixedModel {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = Infallible;

  fn infer(
    &self,
    input: &Self::Input,
    confidence: Confidence,
  ) -> Result<Self::Output, Self::Error> {
    let all = DetectResult::new(self.items.clone(), input.width(), input.height());
    Ok(all.above(confidence))
  }
}

/// 模拟 X 光片：灰度渐变
pub fn xray_image(width: u32, height: u32) -> RgbImage {
  ImageBuffer::from_fn(width, height, |x, y| {
    let v = ((x + y) % 256) as u8;
    Rgb([v, v, v])
  })
}

/// 保存为临时 PNG 文件，文件在释放时删除
pub fn xray_png() -> NamedTempFile {
  let file = tempfile::Builder::new()
    .suffix(".png")
    .tempfile()
    .expect("Failed to create temp image file");
  xray_image(96, 80)
    .save_with_format(file.path(), image::ImageFormat::Png)
    .expect("Failed to save test image");
  file
}

pub fn confidence(value: f32) -> Confidence {
  Confidence::new(value).expect("valid confidence")
}
