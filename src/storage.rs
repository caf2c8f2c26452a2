//! 导出路径辅助
//!
//! # 设计思路
//!
//! 导出文件默认与源文件同目录，文件名为 `<原文件名>_cleaned.png`，
//! 避免覆盖原图。目录不会被隐式创建。

use std::path::{Path, PathBuf};

use crate::redaction::RasterImage;

/// 默认导出文件名后缀。
pub const CLEANED_SUFFIX: &str = "_cleaned";

/// 根据源文件路径给出建议的导出路径。
pub fn suggested_export_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());

    let file_name = format!("{}{}.png", stem, CLEANED_SUFFIX);
    match input.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// 导出格式是否受支持，与 `RasterImage::export_to_path` 使用同一套扩展名规则。
pub fn is_supported_export_path(path: &Path) -> bool {
    RasterImage::supports_export_path(path)
}
