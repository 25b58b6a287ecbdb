// 该文件是 Paru 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use ab_glyph::{FontArc, InvalidFont, PxScale};
use image::{Rgb, RgbImage, imageops};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};

use crate::model::{DetectItem, DetectResult};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const LABEL_TEXT_HORIZONTAL_PADDING: u32 = 4;
const BOX_THICKNESS: i32 = 2;
const PALETTE_SIZE: u32 = 20;
const CAPTION_HEIGHT: u32 = 32;
const CANVAS_COLOR: [u8; 3] = [255, 255, 255];

pub struct Draw {
  font_size: f32,
  label_text_vertical_padding: i32,
  font: FontArc,
}

impl Draw {
  pub fn try_new() -> Result<Self, InvalidFont> {
    let font_data = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data)?;

    Ok(Self {
      font_size: LABEL_FONT_SIZE,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      font,
    })
  }

  /// 按类别取颜色
  pub fn class_color(class_id: u32) -> Rgb<u8> {
    let hue = ((class_id % PALETTE_SIZE) as f32 / PALETTE_SIZE as f32) * 360.0;
    hsv_to_rgb(hue, 0.8, 0.9)
  }

  /// 在原图副本上绘制检测结果
  pub fn annotate(&self, image: &RgbImage, result: &DetectResult) -> RgbImage {
    let mut annotated = image.clone();
    self.draw_detections_on_image(&mut annotated, result);
    annotated
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult) {
    // 先画低分框，高分框的标签覆盖在上面
    for item in result.items.iter().rev() {
      self.draw_bbox_with_label(image, item);
    }
  }

  // bbox 为归一化坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &DetectItem) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }
    let bbox = item.pixel_bbox(image.width(), image.height());

    let x_min = (bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = Self::class_color(item.class_id);

    // 边框加粗
    for t in 0..BOX_THICKNESS {
      let width = x_max - x_min - 2 * t;
      let height = y_max - y_min - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32 + 1, height as u32 + 1);
      draw_hollow_rect_mut(image, rect, color);
    }

    let label = format!("{} {:.2}", item.label, item.score);
    let scale = PxScale::from(self.font_size);
    let (text_width, text_height) = text_size(scale, &self.font, &label);
    let plate_height = text_height + 2 * self.label_text_vertical_padding as u32;

    // 标签放在边框上方，空间不足时放在框内
    let label_x = x_min;
    let label_y = if y_min >= plate_height as i32 {
      y_min - plate_height as i32
    } else {
      y_min
    };

    let max_width = (w - label_x).max(0) as u32;
    let plate_width = (text_width + 2 * LABEL_TEXT_HORIZONTAL_PADDING).min(max_width);

    if plate_width > 0 && plate_height > 0 {
      let rect = Rect::at(label_x, label_y).of_size(plate_width, plate_height);
      draw_filled_rect_mut(image, rect, color);
      draw_text_mut(
        image,
        Rgb([255u8, 255u8, 255u8]),
        label_x + LABEL_TEXT_HORIZONTAL_PADDING as i32,
        label_y + self.label_text_vertical_padding,
        scale,
        &self.font,
        &label,
      );
    }
  }

  /// 两张标注图左右并排，上方各带标题
  pub fn side_by_side(
    &self,
    left: &RgbImage,
    left_caption: &str,
    right: &RgbImage,
    right_caption: &str,
  ) -> RgbImage {
    let width = left.width() + right.width();
    let height = left.height().max(right.height()) + CAPTION_HEIGHT;
    let mut canvas = RgbImage::from_pixel(width, height, Rgb(CANVAS_COLOR));

    imageops::overlay(&mut canvas, left, 0, CAPTION_HEIGHT as i64);
    imageops::overlay(
      &mut canvas,
      right,
      left.width() as i64,
      CAPTION_HEIGHT as i64,
    );

    let scale = PxScale::from(self.font_size);
    for (x, caption) in [(0, left_caption), (left.width() as i32, right_caption)] {
      draw_text_mut(
        &mut canvas,
        Rgb([0u8, 0u8, 0u8]),
        x + LABEL_TEXT_HORIZONTAL_PADDING as i32,
        self.label_text_vertical_padding * 2,
        scale,
        &self.font,
        caption,
      );
    }

    canvas
  }
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}
