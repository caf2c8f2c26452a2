//! 用户设置文件
//!
//! # 设计思路
//!
//! 所有可调项以 JSON 持久化，字段缺省时回退默认值，方便手工编辑。
//! 文件不存在视为全部默认；文件存在但无法解析则报错，而不是静默忽略用户的配置。

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detection::{DEFAULT_CONFIDENCE, DEFAULT_TIMEOUT_SECS, DetectorConfig};
use crate::error::AppError;
use crate::redaction::RedactionConfig;

/// 默认设置文件名。
pub const SETTINGS_FILE_NAME: &str = "cleanshare.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// 默认打码强度（0~100）。
    pub strength: u32,
    pub max_file_size: u64,
    pub max_decoded_pixels: u64,
    pub undo_limit: usize,
    pub reference_strength: u32,
    pub debounce_window_ms: u64,
    pub jpeg_quality: u8,
    pub reject_mismatched_masks: bool,
    pub detector: DetectorSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub interpreter: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub model: Option<PathBuf>,
    pub timeout_secs: u64,
    pub confidence: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        let redaction = RedactionConfig::default();
        Self {
            strength: redaction.reference_strength,
            max_file_size: redaction.max_file_size,
            max_decoded_pixels: redaction.max_decoded_pixels,
            undo_limit: redaction.undo_limit,
            reference_strength: redaction.reference_strength,
            debounce_window_ms: redaction.debounce_window_ms,
            jpeg_quality: redaction.jpeg_quality,
            reject_mismatched_masks: redaction.reject_mismatched_masks,
            detector: DetectorSettings::default(),
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            interpreter: None,
            script: None,
            model: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl AppSettings {
    /// 读取设置文件；文件不存在时返回默认值。
    pub fn load_from_path(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::debug!("设置文件不存在，使用默认设置：{}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings = serde_json::from_str::<Self>(&content)
            .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))?;
        log::info!("⚙️ 已加载设置：{}", path.display());
        Ok(settings)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), AppError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 转换为打码引擎配置，并做区间校验。
    pub fn redaction_config(&self) -> Result<RedactionConfig, AppError> {
        let config = RedactionConfig {
            max_file_size: self.max_file_size,
            max_decoded_pixels: self.max_decoded_pixels,
            undo_limit: self.undo_limit,
            reference_strength: self.reference_strength,
            debounce_window_ms: self.debounce_window_ms,
            jpeg_quality: self.jpeg_quality,
            reject_mismatched_masks: self.reject_mismatched_masks,
        };
        config.validate()?;
        Ok(config)
    }

    /// 转换为检测器配置；脚本或模型未配置时返回 `None`。
    pub fn detector_config(&self) -> Option<DetectorConfig> {
        let detector = &self.detector;
        let mut config = DetectorConfig::new(detector.script.clone()?, detector.model.clone()?);
        config.interpreter = detector.interpreter.clone();
        config.timeout = Duration::from_secs(detector.timeout_secs.max(1));
        config.confidence = detector.confidence;
        Some(config)
    }
}
