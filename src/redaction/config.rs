//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `RedactionConfig`：解码资源上限、撤销深度、
//! 移除打码时的参考强度、滑块防抖窗口以及导出质量。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置。
//! - `validate` 做区间校验，避免非法值在运行中才暴露。

use std::time::Duration;

use super::RedactError;

/// 强度取值上限（UI 滑块范围为 0..=100）。
pub const MAX_STRENGTH: u32 = 100;

/// 移除打码时重建模糊所用的参考强度（对应半径 21）。
pub const DEFAULT_REFERENCE_STRENGTH: u32 = 50;

/// 打码引擎配置。
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    /// 允许读取的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 撤销栈最大深度，超出时淘汰最旧快照。
    pub undo_limit: usize,
    /// `remove_redaction` 重建模糊时使用的固定强度。
    pub reference_strength: u32,
    /// 连续强度调整的防抖窗口（毫秒）。
    pub debounce_window_ms: u64,
    /// JPEG 导出质量（1..=100）。
    pub jpeg_quality: u8,
    /// 选区尺寸与原图不一致时：`false` 回退整图操作，`true` 直接拒绝。
    pub reject_mismatched_masks: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            undo_limit: 32,
            reference_strength: DEFAULT_REFERENCE_STRENGTH,
            debounce_window_ms: 100,
            jpeg_quality: 90,
            reject_mismatched_masks: false,
        }
    }
}

impl RedactionConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    /// 校验配置区间。
    pub fn validate(&self) -> Result<(), RedactError> {
        if self.max_file_size == 0 {
            return Err(RedactError::InvalidConfig("max_file_size 必须大于 0".to_string()));
        }
        if self.max_decoded_pixels == 0 {
            return Err(RedactError::InvalidConfig("max_decoded_pixels 必须大于 0".to_string()));
        }
        if !(1..=1_000).contains(&self.undo_limit) {
            return Err(RedactError::InvalidConfig("undo_limit 必须在 1~1000 之间".to_string()));
        }
        if self.reference_strength > MAX_STRENGTH {
            return Err(RedactError::InvalidConfig(format!(
                "reference_strength 必须在 0~{} 之间",
                MAX_STRENGTH
            )));
        }
        if !(10..=5_000).contains(&self.debounce_window_ms) {
            return Err(RedactError::InvalidConfig(
                "debounce_window_ms 必须在 10~5000 毫秒之间".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(RedactError::InvalidConfig("jpeg_quality 必须在 1~100 之间".to_string()));
        }
        Ok(())
    }
}
