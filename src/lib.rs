// 该文件是 Paru 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod compare;
pub mod frame;
pub mod input;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod task;

use std::path::{Path, PathBuf};

use url::Url;

pub trait FromUrl {
  type Error;
  fn from_url(url: &Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 将命令行中的位置字符串解析为 URL
///
/// 已带方案的字符串（如 `image:///tmp/a.png`）按其方案解析，
/// `json://out/report.json` 这类相对路径相对当前目录补全；
/// 裸路径使用给定的默认方案。
pub fn parse_location(location: &str, default_scheme: &str) -> Result<Url, url::ParseError> {
  let (scheme, path) = match location.split_once("://") {
    Some((scheme, rest))
      if scheme.len() > 1
        && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+') =>
    {
      if rest.starts_with('/') {
        return Url::parse(location);
      }
      (scheme, rest)
    }
    _ => (default_scheme, location),
  };

  let path = Path::new(path);
  let absolute = if path.is_absolute() {
    path.to_path_buf()
  } else {
    std::env::current_dir()
      .map(|dir| dir.join(path))
      .unwrap_or_else(|_| path.to_path_buf())
  };

  // 文件名中的 `#`、`?`、`%` 等字符逐段转义，避免被当作 URL 语法
  let encoded = absolute
    .to_string_lossy()
    .split('/')
    .map(|segment| urlencoding::encode(segment).into_owned())
    .collect::<Vec<_>>()
    .join("/");

  Url::parse(&format!("{}://{}", scheme, encoded))
}

/// 取出 URL 中的文件路径（处理百分号编码）
pub fn url_file_path(url: &Url) -> PathBuf {
  let raw = url.path();
  match urlencoding::decode(raw) {
    Ok(decoded) => PathBuf::from(decoded.into_owned()),
    Err(_) => PathBuf::from(raw),
  }
}
