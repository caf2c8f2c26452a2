//! # 编辑历史模块
//!
//! ## 设计思路
//!
//! 撤销 / 重做栈保存完整的打码结果快照（最近的在末尾），遵循线性历史规则：
//! 任何新的已提交编辑都会清空重做栈。
//!
//! 撤销栈有深度上限，超出时淘汰最旧快照，避免长时间编辑导致内存无限增长。

use std::collections::VecDeque;

use super::raster::RasterImage;

/// 有界撤销 / 重做历史。
#[derive(Debug, Clone)]
pub struct EditHistory {
    undo: VecDeque<RasterImage>,
    redo: Vec<RasterImage>,
    limit: usize,
}

impl EditHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// 记录一次已提交编辑之前的状态，并清空重做栈。
    pub fn record(&mut self, before: RasterImage) {
        self.push_undo(before);
        self.redo.clear();
    }

    /// 撤销：当前状态入重做栈，返回需要恢复的快照。
    pub fn undo(&mut self, current: RasterImage) -> Option<RasterImage> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// 重做：当前状态入撤销栈，返回需要恢复的快照。
    pub fn redo(&mut self, current: RasterImage) -> Option<RasterImage> {
        let next = self.redo.pop()?;
        self.push_undo(current);
        Some(next)
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn push_undo(&mut self, snapshot: RasterImage) {
        self.undo.push_back(snapshot);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
            log::debug!("🗑️ 撤销栈超出上限 {}，淘汰最旧快照", self.limit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shade(v: u8) -> RasterImage {
        RasterImage::solid(2, 2, [v, v, v, 255])
    }

    #[test]
    fn undo_then_redo_walks_linear_history() {
        let mut history = EditHistory::new(8);
        history.record(shade(0));
        history.record(shade(1));

        // 当前为 shade(2)
        let restored = history.undo(shade(2)).expect("undo");
        assert_eq!(restored, shade(1));
        assert_eq!(history.redo_depth(), 1);

        let redone = history.redo(restored).expect("redo");
        assert_eq!(redone, shade(2));
        assert_eq!(history.undo_depth(), 2);
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn new_record_clears_redo() {
        let mut history = EditHistory::new(8);
        history.record(shade(0));
        let _ = history.undo(shade(1));
        assert_eq!(history.redo_depth(), 1);

        history.record(shade(0));
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn empty_stacks_are_noops() {
        let mut history = EditHistory::new(4);
        assert!(history.undo(shade(0)).is_none());
        assert!(history.redo(shade(0)).is_none());
        assert_eq!(history.undo_depth(), 0);
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn oldest_snapshot_is_evicted_at_limit() {
        let mut history = EditHistory::new(3);
        for v in 0..5 {
            history.record(shade(v));
        }
        assert_eq!(history.undo_depth(), 3);

        assert_eq!(history.undo(shade(5)), Some(shade(4)));
        assert_eq!(history.undo(shade(4)), Some(shade(3)));
        assert_eq!(history.undo(shade(3)), Some(shade(2)));
        assert_eq!(history.undo(shade(2)), None);
    }
}
