//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载打码链路（加载 / 解码 / 编辑 / 导出）中的所有失败，
//! 避免字符串拼接式错误处理。通过 `thiserror` 保持人类可读错误，调用侧仍可按分支匹配。
//!
//! 会话层的约定：任何返回 `Err` 的操作都不会修改会话状态。

/// 打码引擎统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum RedactError {
    #[error("尚未加载图片")]
    NoImage,

    #[error("加载失败：{0}")]
    Load(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error(
        "选区尺寸不匹配：期望 {}x{}，实际 {}x{}",
        expected.0, expected.1, actual.0, actual.1
    )]
    InvalidMaskDimensions {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("选区数据长度异常：期望 {expected} 字节，实际 {actual} 字节")]
    MaskLength { expected: u64, actual: u64 },

    #[error(
        "图片尺寸不匹配：期望 {}x{}，实际 {}x{}",
        expected.0, expected.1, actual.0, actual.1
    )]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("配置无效：{0}")]
    InvalidConfig(String),
}

impl RedactError {
    /// 稳定的错误码，供前端或脚本按码分支处理。
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoImage => "E_NO_IMAGE",
            Self::Load(_) => "E_LOAD",
            Self::Decode(_) => "E_DECODE",
            Self::Encode(_) => "E_ENCODE",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
            Self::InvalidMaskDimensions { .. } => "E_MASK_DIMENSIONS",
            Self::MaskLength { .. } => "E_MASK_LENGTH",
            Self::DimensionMismatch { .. } => "E_IMAGE_DIMENSIONS",
            Self::InvalidConfig(_) => "E_CONFIG",
        }
    }

    /// 出错所在阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Load(_) | Self::Decode(_) | Self::ResourceLimit(_) => "load",
            Self::Encode(_) => "export",
            Self::InvalidConfig(_) => "config",
            Self::NoImage
            | Self::InvalidMaskDimensions { .. }
            | Self::MaskLength { .. }
            | Self::DimensionMismatch { .. } => "edit",
        }
    }
}

impl From<RedactError> for String {
    fn from(error: RedactError) -> Self {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_dimension_message_names_both_sizes() {
        let err = RedactError::InvalidMaskDimensions {
            expected: (100, 80),
            actual: (10, 8),
        };
        let message = err.to_string();
        assert!(message.contains("100x80"));
        assert!(message.contains("10x8"));
        assert_eq!(err.code(), "E_MASK_DIMENSIONS");
        assert_eq!(err.stage(), "edit");
    }

    #[test]
    fn mask_length_message_keeps_full_byte_counts() {
        let err = RedactError::MaskLength {
            expected: 16,
            actual: 5_000_000_000,
        };
        assert!(err.to_string().contains("5000000000"));
        assert_eq!(err.code(), "E_MASK_LENGTH");
        assert_eq!(err.stage(), "edit");
    }

    #[test]
    fn codec_errors_map_to_their_stage() {
        assert_eq!(RedactError::Decode("x".into()).stage(), "load");
        assert_eq!(RedactError::Encode("x".into()).stage(), "export");
        assert_eq!(RedactError::NoImage.code(), "E_NO_IMAGE");
    }
}
