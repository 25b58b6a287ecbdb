// 该文件是 Paru 项目的一部分。
// src/model/labels.rs - 类别名称
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

use std::{collections::BTreeMap, path::Path};

use tracing::{debug, warn};

/// 类别编号到名称的映射
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassNames {
  names: BTreeMap<u32, String>,
}

impl ClassNames {
  pub fn from_list<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      names: names
        .into_iter()
        .enumerate()
        .map(|(id, name)| (id as u32, name.into()))
        .collect(),
    }
  }

  /// 标签文件：每行一个类别名，空行忽略
  pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let names = Self::from_list(
      content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty()),
    );
    debug!("从 {} 读取 {} 个类别", path.display(), names.len());
    Ok(names)
  }

  /// 解析 Ultralytics 导出时写入的 `names` 元数据，
  /// 形如 `{0: 'NORMAL', 1: 'PNEUMONIA'}`
  pub fn from_metadata(raw: &str) -> Option<Self> {
    let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut names = BTreeMap::new();

    for entry in split_entries(body) {
      let Some((id, name)) = entry.split_once(':') else {
        warn!("无法解析类别元数据项: {}", entry);
        return None;
      };
      let id = id.trim().parse::<u32>().ok()?;
      let name = name.trim().trim_matches(|c| c == '\'' || c == '"');
      names.insert(id, name.to_string());
    }

    if names.is_empty() {
      None
    } else {
      Some(Self { names })
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn label(&self, class_id: u32) -> String {
    self
      .names
      .get(&class_id)
      .cloned()
      .unwrap_or_else(|| format!("class{}", class_id))
  }
}

// 按逗号分割，但忽略引号内的逗号
fn split_entries(body: &str) -> Vec<&str> {
  let mut entries = Vec::new();
  let mut quote: Option<char> = None;
  let mut start = 0;

  for (idx, c) in body.char_indices() {
    match (quote, c) {
      (None, '\'' | '"') => quote = Some(c),
      (Some(q), _) if q == c => quote = None,
      (None, ',') => {
        entries.push(&body[start..idx]);
        start = idx + 1;
      }
      _ => {}
    }
  }
  entries.push(&body[start..]);

  entries
    .into_iter()
    .filter(|entry| !entry.trim().is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_ultralytics_names() {
    let names = ClassNames::from_metadata("{0: 'NORMAL', 1: 'PNEUMONIA'}").unwrap();
    assert_eq!(names.len(), 2);
    assert_eq!(names.label(0), "NORMAL");
    assert_eq!(names.label(1), "PNEUMONIA");
    assert_eq!(names.label(7), "class7");
  }

  #[test]
  fn keeps_commas_inside_quotes() {
    let names = ClassNames::from_metadata("{0: 'opacity, left', 1: \"nodule\"}").unwrap();
    assert_eq!(names.label(0), "opacity, left");
    assert_eq!(names.label(1), "nodule");
  }

  #[test]
  fn rejects_malformed_metadata() {
    assert!(ClassNames::from_metadata("pneumonia").is_none());
    assert!(ClassNames::from_metadata("{}").is_none());
    assert!(ClassNames::from_metadata("{x: 'a'}").is_none());
  }

  #[test]
  fn reads_label_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.txt");
    std::fs::write(&path, "normal\n\npneumonia\n").unwrap();
    let names = ClassNames::from_file(&path).unwrap();
    assert_eq!(names.len(), 2);
    assert_eq!(names.label(1), "pneumonia");
  }
}
