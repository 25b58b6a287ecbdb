// 该文件是 Paru 项目的一部分。
// src/model/yolov8.rs - YOLOv8 ONNX 模型
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
  path::{Path, PathBuf},
  sync::Mutex,
};

use image::RgbImage;
use ort::{session::Session, value::Tensor};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNchwFrame,
  model::{ClassNames, Confidence, DetectResult, Model, PostprocessOptions, postprocess},
  url_file_path,
};

const YOLOV8_INPUT_SIZE: u32 = 640;
const YOLOV8_IOU_THRESH: f32 = 0.7;
const YOLOV8_MAX_DET: usize = 300;
const YOLOV8_DEFAULT_INPUT: &str = "images";

pub struct Yolov8 {
  session: Mutex<Session>,
  path: PathBuf,
  input_name: String,
  output_name: String,
  input_size: u32,
  iou_threshold: f32,
  max_detections: usize,
  names: ClassNames,
}

#[derive(Error, Debug)]
pub enum Yolov8Error {
  #[error("模型文件不存在: {}", .0.display())]
  ModelNotFound(PathBuf),
  #[error("模型加载错误: {}, 错误: {}", .0.display(), .1)]
  ModelLoad(PathBuf, ort::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("标签文件读取错误: {0}")]
  Labels(std::io::Error),
  #[error("推理错误: {0}")]
  Inference(#[from] ort::Error),
  #[error("模型输出形状无法识别: {0:?}")]
  OutputShape(Vec<usize>),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

pub struct Yolov8Builder {
  model_path: PathBuf,
  input_size: u32,
  iou_threshold: f32,
  max_detections: usize,
  labels: Option<PathBuf>,
}

impl FromUrlWithScheme for Yolov8Builder {
  const SCHEME: &'static str = "yolov8";
}

impl FromUrl for Yolov8Builder {
  type Error = Yolov8Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolov8Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(Self::new(url_file_path(url)))
  }
}

impl Yolov8Builder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      input_size: YOLOV8_INPUT_SIZE,
      iou_threshold: YOLOV8_IOU_THRESH,
      max_detections: YOLOV8_MAX_DET,
      labels: None,
    }
  }

  pub fn model_path(&self) -> &Path {
    &self.model_path
  }

  pub fn input_size(mut self, input_size: u32) -> Self {
    self.input_size = input_size;
    self
  }

  pub fn iou_threshold(mut self, iou_threshold: f32) -> Self {
    self.iou_threshold = iou_threshold;
    self
  }

  pub fn max_detections(mut self, max_detections: usize) -> Self {
    self.max_detections = max_detections;
    self
  }

  pub fn labels(mut self, labels: Option<PathBuf>) -> Self {
    self.labels = labels;
    self
  }

  pub fn build(self) -> Result<Yolov8, Yolov8Error> {
    info!("加载模型文件: {}", self.model_path.display());
    if !self.model_path.is_file() {
      error!("模型文件不存在: {}", self.model_path.display());
      return Err(Yolov8Error::ModelNotFound(self.model_path));
    }
    if self.input_size == 0 || self.input_size % 32 != 0 {
      return Err(Yolov8Error::ModelInvalid(format!(
        "输入尺寸必须是 32 的正整数倍，实际为 {}",
        self.input_size
      )));
    }

    if !(0.0..=1.0).contains(&self.iou_threshold) {
      return Err(Yolov8Error::ModelInvalid(format!(
        "NMS IOU 阈值必须在 [0, 1] 范围内，实际为 {}",
        self.iou_threshold
      )));
    }
    if self.max_detections == 0 {
      return Err(Yolov8Error::ModelInvalid(
        "最大检测数必须大于 0".to_string(),
      ));
    }

    let session = create_session(&self.model_path)
      .map_err(|e| Yolov8Error::ModelLoad(self.model_path.clone(), e))?;

    let input_name = session
      .inputs
      .first()
      .map(|i| i.name.clone())
      .unwrap_or_else(|| YOLOV8_DEFAULT_INPUT.to_string());
    let output_name = session
      .outputs
      .first()
      .map(|o| o.name.clone())
      .ok_or_else(|| Yolov8Error::ModelInvalid("模型没有输出".to_string()))?;

    let names = match &self.labels {
      Some(path) => ClassNames::from_file(path).map_err(Yolov8Error::Labels)?,
      None => read_names_metadata(&session).unwrap_or_default(),
    };

    if names.is_empty() {
      warn!("模型未提供类别名称，标签将显示为 class{{id}}");
    }

    debug!("模型输入: {}, 输出: {}", input_name, output_name);
    debug!("模型类别数: {}", names.len());
    info!("模型加载完成");

    Ok(Yolov8 {
      session: Mutex::new(session),
      path: self.model_path,
      input_name,
      output_name,
      input_size: self.input_size,
      iou_threshold: self.iou_threshold,
      max_detections: self.max_detections,
      names,
    })
  }
}

fn create_session(path: &Path) -> ort::Result<Session> {
  let builder = Session::builder()?;

  #[cfg(feature = "cuda")]
  let builder = builder.with_execution_providers([
    ort::execution_providers::CUDAExecutionProvider::default().build(),
  ])?;

  builder.commit_from_file(path)
}

fn read_names_metadata(session: &Session) -> Option<ClassNames> {
  let metadata = session.metadata().ok()?;
  let raw = metadata.custom("names").ok()??;
  ClassNames::from_metadata(&raw)
}

impl Yolov8 {
  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn names(&self) -> &ClassNames {
    &self.names
  }

  fn run(&self, frame: &RgbNchwFrame) -> Result<(Vec<f32>, Vec<usize>), Yolov8Error> {
    let input = Tensor::from_array(frame.tensor().clone())?;

    // Session::run 需要可变引用，缓存的句柄通过互斥锁共享
    let mut session = self
      .session
      .lock()
      .map_err(|_| Yolov8Error::ModelInvalid("推理会话锁已损坏".to_string()))?;
    let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;

    let output = outputs
      .get(self.output_name.as_str())
      .ok_or_else(|| Yolov8Error::ModelInvalid(format!("缺少输出 {}", self.output_name)))?;
    let (shape, data) = output.try_extract_tensor::<f32>()?;

    let shape: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
    Ok((data.to_vec(), shape))
  }
}

impl Model for Yolov8 {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = Yolov8Error;

  fn infer(
    &self,
    input: &Self::Input,
    confidence: Confidence,
  ) -> Result<Self::Output, Self::Error> {
    debug!("预处理输入图像 {}x{}", input.width(), input.height());
    let frame = RgbNchwFrame::from_image(input, self.input_size, self.input_size);

    debug!("执行模型推理");
    let (data, shape) = self.run(&frame)?;
    debug!("模型输出形状: {:?}", shape);

    let options = PostprocessOptions {
      confidence,
      iou_threshold: self.iou_threshold,
      max_detections: self.max_detections,
    };
    postprocess(&data, &shape, &frame.letterbox(), &self.names, &options)
      .ok_or(Yolov8Error::OutputShape(shape))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_model_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("best.onnx");
    let result = Yolov8Builder::new(&path).build();
    assert!(matches!(result, Err(Yolov8Error::ModelNotFound(p)) if p == path));
  }

  #[test]
  fn rejects_wrong_scheme() {
    let url = Url::parse("image:///tmp/best.onnx").unwrap();
    assert!(matches!(
      Yolov8Builder::from_url(&url),
      Err(Yolov8Error::ModelPathError(_))
    ));
  }

  #[test]
  fn builder_from_url_decodes_path() {
    let url = Url::parse("yolov8:///models/gwo%20tuned/best.onnx").unwrap();
    let builder = Yolov8Builder::from_url(&url).unwrap();
    assert_eq!(builder.model_path(), Path::new("/models/gwo tuned/best.onnx"));
  }

  #[test]
  fn rejects_bad_nms_options_before_loading() {
    let file = tempfile::NamedTempFile::new().unwrap();
    for iou in [-0.1, 1.5, f32::NAN] {
      let result = Yolov8Builder::new(file.path()).iou_threshold(iou).build();
      assert!(matches!(result, Err(Yolov8Error::ModelInvalid(_))), "iou {}", iou);
    }
    let result = Yolov8Builder::new(file.path()).max_detections(0).build();
    assert!(matches!(result, Err(Yolov8Error::ModelInvalid(_))));
  }

  #[test]
  fn rejects_bad_input_size_before_loading() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let result = Yolov8Builder::new(file.path()).input_size(100).build();
    assert!(matches!(result, Err(Yolov8Error::ModelInvalid(_))));
  }
}
