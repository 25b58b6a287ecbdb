// 该文件是 Paru 项目的一部分。
// src/frame.rs - 模型输入帧（Letterbox 后的 NCHW 张量）
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

use image::{RgbImage, imageops::FilterType};
use ndarray::Array4;

const RGB_CHANNELS: usize = 3;
const PAD_VALUE: f32 = 114.0 / 255.0;

/// Letterbox 变换参数，用于把模型坐标还原到原图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub scale: f32,
  pub pad_x: f32,
  pub pad_y: f32,
  pub orig_width: u32,
  pub orig_height: u32,
}

impl Letterbox {
  pub fn new(orig_width: u32, orig_height: u32, input_width: u32, input_height: u32) -> Self {
    let scale_w = input_width as f32 / orig_width.max(1) as f32;
    let scale_h = input_height as f32 / orig_height.max(1) as f32;
    let scale = scale_w.min(scale_h);

    let (new_w, new_h) = Self::resized(orig_width, orig_height, scale, input_width, input_height);

    Self {
      scale,
      pad_x: ((input_width - new_w) / 2) as f32,
      pad_y: ((input_height - new_h) / 2) as f32,
      orig_width,
      orig_height,
    }
  }

  fn resized(w: u32, h: u32, scale: f32, max_w: u32, max_h: u32) -> (u32, u32) {
    let new_w = ((w as f32) * scale).round() as u32;
    let new_h = ((h as f32) * scale).round() as u32;
    (new_w.clamp(1, max_w), new_h.clamp(1, max_h))
  }

  /// 模型输入坐标 → 原图像素坐标（裁剪到图像范围内）
  pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
    let ox = ((x - self.pad_x) / self.scale).clamp(0.0, self.orig_width as f32);
    let oy = ((y - self.pad_y) / self.scale).clamp(0.0, self.orig_height as f32);
    (ox, oy)
  }
}

/// RGB 归一化的 NCHW 输入帧
#[derive(Debug, Clone)]
pub struct RgbNchwFrame {
  data: Array4<f32>,
  letterbox: Letterbox,
}

impl RgbNchwFrame {
  pub fn from_image(image: &RgbImage, input_width: u32, input_height: u32) -> Self {
    let (orig_w, orig_h) = image.dimensions();
    let letterbox = Letterbox::new(orig_w, orig_h, input_width, input_height);
    let (new_w, new_h) = Letterbox::resized(
      orig_w,
      orig_h,
      letterbox.scale,
      input_width,
      input_height,
    );

    let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let mut data = Array4::<f32>::from_elem(
      (1, RGB_CHANNELS, input_height as usize, input_width as usize),
      PAD_VALUE,
    );

    let offset_x = letterbox.pad_x as usize;
    let offset_y = letterbox.pad_y as usize;
    for (x, y, pixel) in resized.enumerate_pixels() {
      let (x, y) = (offset_x + x as usize, offset_y + y as usize);
      for c in 0..RGB_CHANNELS {
        data[[0, c, y, x]] = pixel[c] as f32 / 255.0;
      }
    }

    Self { data, letterbox }
  }

  pub fn tensor(&self) -> &Array4<f32> {
    &self.data
  }

  pub fn letterbox(&self) -> Letterbox {
    self.letterbox
  }

  pub fn height(&self) -> usize {
    self.data.shape()[2]
  }

  pub fn width(&self) -> usize {
    self.data.shape()[3]
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }
}
