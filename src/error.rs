//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，聚合打码引擎、检测器、设置文件与 I/O 的错误，
//! 替代分散的 `.map_err(|e| e.to_string())` 与 `expect()`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `RedactError` / `DetectionError` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于前端适配层直接回传。

use serde::Serialize;

use crate::detection::DetectionError;
use crate::redaction::RedactError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 打码引擎错误（加载 / 编辑 / 导出）
    #[error("{0}")]
    Redact(#[from] RedactError),

    /// 目标检测错误
    #[error("{0}")]
    Detection(#[from] DetectionError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件读写或解析失败
    #[error("设置错误: {0}")]
    Settings(String),

    /// 命令行参数不合法
    #[error("参数错误: {0}")]
    InvalidArgument(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Redact(e) => e.code(),
            Self::Detection(e) => e.code(),
            Self::Io(_) => "E_IO",
            Self::Settings(_) => "E_SETTINGS",
            Self::InvalidArgument(_) => "E_ARGUMENT",
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_module_errors_transparently() {
        let err: AppError = RedactError::NoImage.into();
        assert_eq!(err.to_string(), "尚未加载图片");
        assert_eq!(err.code(), "E_NO_IMAGE");

        let err: AppError = DetectionError::Parse("bad".into()).into();
        assert_eq!(err.code(), "E_DETECTOR_PARSE");
    }

    #[test]
    fn serializes_as_message_string() {
        let err = AppError::Settings("解析失败".into());
        let json = serde_json::to_string(&err).expect("serialize");
        assert_eq!(json, "\"设置错误: 解析失败\"");
    }
}
