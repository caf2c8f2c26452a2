//! # 强度滑块防抖
//!
//! 拖动滑块时只有静止超过窗口期的最后一个值才会触发计算。
//! 状态机不依赖时钟，调用方传入 `Instant`，便于在测试中精确控制时间。

use std::time::{Duration, Instant};

use super::config::RedactionConfig;

fn debounce_remaining(elapsed: Duration, window: Duration) -> Option<Duration> {
    if elapsed >= window {
        None
    } else {
        Some(window - elapsed)
    }
}

/// 尾沿防抖器：保存最后一次触发的值，窗口期内无新触发才放行。
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// 使用配置中的窗口期（默认 100 毫秒）。
    pub fn from_config(config: &RedactionConfig) -> Self {
        Self::new(config.debounce_window())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 记录一次触发，覆盖之前未放行的值并重新计时。
    pub fn trigger(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// 距离放行还需等待的时间；没有待处理值时返回 `None`。
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let (_, at) = self.pending.as_ref()?;
        Some(debounce_remaining(now.saturating_duration_since(*at), self.window).unwrap_or_default())
    }

    /// 窗口期已过则取出最后一个值。
    pub fn take_ready(&mut self, now: Instant) -> Option<T> {
        let (_, at) = self.pending.as_ref()?;
        if debounce_remaining(now.saturating_duration_since(*at), self.window).is_some() {
            return None;
        }
        self.pending.take().map(|(value, _)| value)
    }

    /// 放弃待处理的值（例如重新加载图片）。
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
