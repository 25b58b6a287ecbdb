// 该文件是 Paru 项目的一部分。
// src/model/cache.rs - 进程级模型句柄缓存
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
  collections::HashMap,
  path::{Path, PathBuf},
  sync::{Arc, LazyLock, Mutex, PoisonError},
};

use tracing::{debug, info};

use crate::model::{Yolov8, Yolov8Builder, Yolov8Error};

/// 每个权重文件只加载一次，之后共享只读句柄
pub struct ModelCache<M> {
  handles: Mutex<HashMap<PathBuf, Arc<M>>>,
}

impl<M> Default for ModelCache<M> {
  fn default() -> Self {
    Self {
      handles: Mutex::new(HashMap::new()),
    }
  }
}

impl<M> ModelCache<M> {
  pub fn new() -> Self {
    Self::default()
  }

  /// 取出缓存的句柄，首次访问时调用 `load` 加载
  ///
  /// 加载失败不会写入缓存。
  pub fn get_or_load<E, F>(&self, path: &Path, load: F) -> Result<Arc<M>, E>
  where
    F: FnOnce(&Path) -> Result<M, E>,
  {
    let key = cache_key(path);
    // 持锁加载，保证同一文件不会被并发加载两次
    let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(handle) = handles.get(&key) {
      debug!("复用已加载的模型: {}", key.display());
      return Ok(Arc::clone(handle));
    }

    let handle = Arc::new(load(path)?);
    handles.insert(key.clone(), Arc::clone(&handle));
    info!("模型已缓存: {}", key.display());
    Ok(handle)
  }

  pub fn len(&self) -> usize {
    self.handles.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

fn cache_key(path: &Path) -> PathBuf {
  path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

static YOLOV8_CACHE: LazyLock<ModelCache<Yolov8>> = LazyLock::new(ModelCache::new);

/// 通过进程级缓存加载 YOLOv8 模型
pub fn load_yolov8(builder: Yolov8Builder) -> Result<Arc<Yolov8>, Yolov8Error> {
  let path = builder.model_path().to_path_buf();
  YOLOV8_CACHE.get_or_load(&path, |_| builder.build())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;

  #[derive(Debug)]
  struct Handle(usize);

  #[test]
  fn loads_each_file_once() {
    let dir = tempfile::tempdir().unwrap();
    let best = dir.path().join("best.onnx");
    std::fs::write(&best, b"weights").unwrap();

    let cache = ModelCache::new();
    let loads = Cell::new(0);
    let load = |_: &Path| -> Result<Handle, String> {
      loads.set(loads.get() + 1);
      Ok(Handle(loads.get()))
    };

    let a = cache.get_or_load(&best, load).unwrap();
    let b = cache.get_or_load(&best, load).unwrap();
    // 同一文件的不同写法指向同一个句柄
    let c = cache
      .get_or_load(&dir.path().join(".").join("best.onnx"), load)
      .unwrap();

    assert_eq!(loads.get(), 1);
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &c));
    assert_eq!(a.0, 1);
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn failed_load_leaves_no_handle() {
    let cache: ModelCache<Handle> = ModelCache::new();
    let result = cache.get_or_load(Path::new("/nonexistent/best.onnx"), |p| {
      Err(format!("missing {}", p.display()))
    });
    assert!(result.is_err());
    assert!(cache.is_empty());
  }

  #[test]
  fn global_cache_reports_missing_weights() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_yolov8(Yolov8Builder::new(dir.path().join("yolov8s_base.onnx")));
    assert!(matches!(result, Err(Yolov8Error::ModelNotFound(_))));
  }
}
