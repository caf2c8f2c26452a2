//! # 目标检测适配模块（detection）
//!
//! ## 设计思路
//!
//! 检测器是外部 Python 进程（YOLO 模型），打码引擎只消费它输出的矩形框。
//! 本模块负责：定位解释器与脚本、带超时地运行进程、从 stdout 中解析结果。
//!
//! ```text
//! run_detector（runner.rs）
//!    ├─ 校验脚本 / 模型 / 解释器
//!    ├─ tokio::process 运行，超时即终止子进程
//!    └─ parse_detector_output（parse.rs）
//!    ↓
//! DetectionOutcome → RedactionSession::apply_detections
//! ```

mod error;
mod parse;
mod runner;

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::redaction::PixelRect;

pub use error::DetectionError;
pub use parse::parse_detector_output;
pub use runner::run_detector;

/// 默认置信度阈值。
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// 默认超时时间（秒）。
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// 检测器输出的矩形框（原图像素坐标，可能越界或退化）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DetectionBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl DetectionBox {
    /// 裁剪到 `width × height` 图像范围；裁剪后为空则返回 `None`。
    pub fn clip(&self, width: u32, height: u32) -> Option<PixelRect> {
        let x0 = i64::from(self.x).max(0);
        let y0 = i64::from(self.y).max(0);
        let x1 = (i64::from(self.x) + i64::from(self.w)).min(i64::from(width));
        let y1 = (i64::from(self.y) + i64::from(self.h)).min(i64::from(height));

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// 检测结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// 检测成功但没有任何框。
    NoBoxes,
    Boxes(Vec<DetectionBox>),
}

impl DetectionOutcome {
    pub fn boxes(&self) -> &[DetectionBox] {
        match self {
            Self::NoBoxes => &[],
            Self::Boxes(boxes) => boxes,
        }
    }
}

/// 检测器配置。
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// 指定解释器；为空时依次查找 `python3` 与 `python`。
    pub interpreter: Option<PathBuf>,
    pub script: PathBuf,
    pub model: PathBuf,
    pub timeout: Duration,
    pub confidence: f32,
}

impl DetectorConfig {
    pub fn new(script: impl Into<PathBuf>, model: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: None,
            script: script.into(),
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_keeps_inner_box() {
        let b = DetectionBox { x: 2, y: 3, w: 4, h: 5 };
        assert_eq!(
            b.clip(10, 10),
            Some(PixelRect { x: 2, y: 3, width: 4, height: 5 })
        );
    }

    #[test]
    fn clip_trims_to_bounds() {
        let b = DetectionBox { x: -5, y: 8, w: 10, h: 10 };
        assert_eq!(
            b.clip(10, 10),
            Some(PixelRect { x: 0, y: 8, width: 5, height: 2 })
        );
    }

    #[test]
    fn degenerate_or_outside_boxes_are_dropped() {
        assert_eq!(DetectionBox { x: 0, y: 0, w: 0, h: 5 }.clip(10, 10), None);
        assert_eq!(DetectionBox { x: 0, y: 0, w: -3, h: 5 }.clip(10, 10), None);
        assert_eq!(DetectionBox { x: 10, y: 0, w: 3, h: 5 }.clip(10, 10), None);
        assert_eq!(DetectionBox { x: -9, y: -9, w: 9, h: 9 }.clip(10, 10), None);
        assert_eq!(DetectionBox { x: i32::MAX, y: 0, w: i32::MAX, h: 1 }.clip(10, 10), None);
    }

    #[test]
    fn default_config_matches_detector_script() {
        let config = DetectorConfig::new("liquor_detect.py", "best.pt");
        assert_eq!(config.confidence, 0.25);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.interpreter.is_none());
        assert!(DetectionOutcome::NoBoxes.boxes().is_empty());
    }
}
