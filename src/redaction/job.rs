//! # 后台任务快照与合并
//!
//! ## 设计思路
//!
//! 模糊计算可以放到工作线程，但会话本身只在所属线程上修改。
//! 工作线程拿到的是一份不可变快照：恰好包含 {原图, 选区, 强度}，按值复制，
//! 与会话再无共享。计算完成后由所属线程通过会话的修改 API 合并回去。
//!
//! ## 实现思路
//!
//! - 每次提交分配单调递增的 `JobId`。
//! - 合并时只接受“最近一次提交”的结果，过期结果直接丢弃，绝不乱序应用。
//! - 不做抢占式取消：过期与否完全由合并时的比对决定。

use std::fmt;

use super::blur::{BlurEngine, radius_for_strength};
use super::mask::SelectionMask;
use super::raster::RasterImage;

/// 后台任务编号，单调递增。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl JobId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 任务编号分配器。
#[derive(Debug, Default)]
pub struct JobTracker {
    latest: u64,
}

impl JobTracker {
    /// 分配新编号，之前的编号全部过期。
    pub fn issue(&mut self) -> JobId {
        self.latest += 1;
        JobId(self.latest)
    }

    pub fn is_current(&self, id: JobId) -> bool {
        id.0 == self.latest
    }

    pub fn latest(&self) -> Option<JobId> {
        (self.latest > 0).then_some(JobId(self.latest))
    }

    /// 作废所有在途任务（例如重新加载图片后）。
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

/// 后台任务要完成的操作。
#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    FullBlur { strength: u32 },
    MaskedBlur { strength: u32, mask: SelectionMask },
    Removal { mask: SelectionMask },
}

/// 工作线程的只读输入。
#[derive(Debug, Clone)]
pub struct BlurSnapshot {
    pub id: JobId,
    pub original: RasterImage,
    pub request: JobRequest,
    /// 本次计算使用的模糊强度（移除操作为参考强度）。
    pub blur_strength: u32,
}

impl BlurSnapshot {
    /// 在当前线程执行模糊计算。
    pub fn compute<E: BlurEngine + ?Sized>(self, engine: &E) -> JobResult {
        let blurred = engine.blur(&self.original, radius_for_strength(self.blur_strength));
        JobResult {
            id: self.id,
            request: self.request,
            blurred,
        }
    }
}

/// 工作线程的计算结果：整图模糊后的图片，等待所属线程合并。
#[derive(Debug, Clone)]
pub struct JobResult {
    pub id: JobId,
    pub request: JobRequest,
    pub blurred: RasterImage,
}

/// 合并结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobCommit {
    Applied { id: JobId },
    /// 结果已过期，被更新的任务取代。
    Discarded { id: JobId, latest: Option<JobId> },
    /// 结果是最新的，但提交时已无可移除的打码区域，状态未变。
    Skipped { id: JobId },
}

impl JobCommit {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redaction::blur::BoxBlur;

    #[test]
    fn issued_ids_are_monotonic_and_supersede() {
        let mut tracker = JobTracker::default();
        assert_eq!(tracker.latest(), None);

        let first = tracker.issue();
        let second = tracker.issue();
        assert!(second > first);
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }

    #[test]
    fn invalidate_expires_outstanding_ids() {
        let mut tracker = JobTracker::default();
        let id = tracker.issue();
        tracker.invalidate();
        assert!(!tracker.is_current(id));
        assert!(tracker.issue() > id);
    }

    #[test]
    fn compute_blurs_original_at_requested_strength() {
        let original = RasterImage::from_fn(6, 6, |x, y| [(x * 40) as u8, (y * 40) as u8, 0, 255]);
        let snapshot = BlurSnapshot {
            id: JobId(7),
            original: original.clone(),
            request: JobRequest::FullBlur { strength: 4 },
            blur_strength: 4,
        };

        let result = snapshot.compute(&BoxBlur);
        assert_eq!(result.id, JobId(7));
        assert_eq!(result.blurred, BoxBlur.blur(&original, radius_for_strength(4)));
        assert_eq!(result.id.to_string(), "#7");
    }
}
