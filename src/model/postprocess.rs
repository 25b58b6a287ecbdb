// 该文件是 Paru 项目的一部分。
// src/model/postprocess.rs - YOLOv8 输出后处理
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

use tracing::debug;

use crate::{
  frame::Letterbox,
  model::{ClassNames, Confidence, DetectItem, DetectResult},
};

const BOX_FEATURES: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct PostprocessOptions {
  pub confidence: Confidence,
  pub iou_threshold: f32,
  pub max_detections: usize,
}

#[derive(Debug, Clone)]
struct Candidate {
  class_id: u32,
  score: f32,
  // 原图像素坐标 [x_min, y_min, x_max, y_max]
  bbox: [f32; 4],
}

/// 输出布局
#[derive(Debug, Clone, Copy, PartialEq)]
enum Layout {
  /// [1, 4 + nc, N]
  FeaturesFirst { features: usize, anchors: usize },
  /// [1, N, 4 + nc]
  AnchorsFirst { features: usize, anchors: usize },
}

impl Layout {
  fn detect(shape: &[usize]) -> Option<Self> {
    let &[batch, a, b] = shape else {
      return None;
    };
    if batch != 1 {
      return None;
    }
    // 锚点数远大于特征数
    if a <= b && a > BOX_FEATURES {
      Some(Layout::FeaturesFirst {
        features: a,
        anchors: b,
      })
    } else if b > BOX_FEATURES {
      Some(Layout::AnchorsFirst {
        features: b,
        anchors: a,
      })
    } else {
      None
    }
  }

  fn features(&self) -> usize {
    match *self {
      Layout::FeaturesFirst { features, .. } | Layout::AnchorsFirst { features, .. } => features,
    }
  }

  fn anchors(&self) -> usize {
    match *self {
      Layout::FeaturesFirst { anchors, .. } | Layout::AnchorsFirst { anchors, .. } => anchors,
    }
  }

  fn at(&self, data: &[f32], anchor: usize, feature: usize) -> f32 {
    match *self {
      Layout::FeaturesFirst { anchors, .. } => data[feature * anchors + anchor],
      Layout::AnchorsFirst { features, .. } => data[anchor * features + feature],
    }
  }
}

/// 将原始输出张量解码为检测结果
///
/// 返回 `None` 表示张量形状无法识别。
pub fn postprocess(
  data: &[f32],
  shape: &[usize],
  letterbox: &Letterbox,
  names: &ClassNames,
  options: &PostprocessOptions,
) -> Option<DetectResult> {
  let layout = Layout::detect(shape)?;
  if data.len() < layout.features() * layout.anchors() {
    return None;
  }

  let num_classes = layout.features() - BOX_FEATURES;
  let mut candidates = Vec::new();

  for anchor in 0..layout.anchors() {
    let (class_id, score) = (0..num_classes)
      .map(|c| (c, layout.at(data, anchor, BOX_FEATURES + c)))
      .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    if !options.confidence.admits(score) {
      continue;
    }

    let cx = layout.at(data, anchor, 0);
    let cy = layout.at(data, anchor, 1);
    let w = layout.at(data, anchor, 2);
    let h = layout.at(data, anchor, 3);

    let (x_min, y_min) = letterbox.to_original(cx - w / 2.0, cy - h / 2.0);
    let (x_max, y_max) = letterbox.to_original(cx + w / 2.0, cy + h / 2.0);

    if x_max <= x_min || y_max <= y_min {
      continue;
    }

    candidates.push(Candidate {
      class_id: class_id as u32,
      score,
      bbox: [x_min, y_min, x_max, y_max],
    });
  }

  let candidates_before_nms = candidates.len();
  let kept = non_max_suppression(candidates, options.iou_threshold, options.max_detections);

  debug!(
    "候选框 {} 个，NMS 后保留 {} 个",
    candidates_before_nms,
    kept.len()
  );

  let (w, h) = (
    letterbox.orig_width.max(1) as f32,
    letterbox.orig_height.max(1) as f32,
  );
  let items = kept
    .into_iter()
    .map(|c| DetectItem {
      class_id: c.class_id,
      label: names.label(c.class_id),
      score: c.score,
      bbox: [c.bbox[0] / w, c.bbox[1] / h, c.bbox[2] / w, c.bbox[3] / h],
    })
    .collect();

  Some(DetectResult::new(
    items,
    letterbox.orig_width,
    letterbox.orig_height,
  ))
}

/// 按类别的贪心非极大值抑制
fn non_max_suppression(
  mut candidates: Vec<Candidate>,
  iou_threshold: f32,
  max_detections: usize,
) -> Vec<Candidate> {
  // 稳定排序，保证阈值提高时结果是原结果的前缀
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept: Vec<Candidate> = Vec::new();
  for candidate in candidates {
    if kept.len() >= max_detections {
      break;
    }
    let suppressed = kept.iter().any(|k| {
      k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold
    });
    if !suppressed {
      kept.push(candidate);
    }
  }
  kept
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}
