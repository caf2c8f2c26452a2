//! # 打码会话（状态机）
//!
//! ## 设计思路
//!
//! `RedactionSession` 独占一张图片的全部编辑状态：
//! 原图、当前打码结果、累计选区、整图模糊缓存、撤销 / 重做栈、后台任务编号。
//! 会话由调用方显式持有并按引用传入，不存在全局单例。
//!
//! 状态迁移：
//!
//! ```text
//! load_image ──► 全部重置（redacted = original，无选区，无缓存，栈清空）
//! apply_full_blur ──► 整图预览（可命中缓存，不算已提交编辑）
//! apply_masked_blur ──► 入撤销栈 → 选区并集 → 合成 → 失效缓存
//! remove_redaction ──► 入撤销栈 → 参考强度重建 → 选区差集 → 失效缓存
//! undo / redo ──► 栈间交换快照 → 失效缓存
//! ```
//!
//! ## 实现思路
//!
//! - 每个操作先校验前置条件（已加载图片、尺寸一致），全部通过后才开始写状态，
//!   失败时会话保持原样。
//! - 选区尺寸与原图不一致时，默认回退为对应的整图操作并记录 warn 日志；
//!   `reject_mismatched_masks` 打开时改为直接拒绝。
//! - 后台任务通过 `snapshot_*` 取快照、`commit_job` 合并，只接受最新编号。

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::blur::{BlurEngine, BoxBlur, radius_for_strength};
use super::history::EditHistory;
use super::job::{BlurSnapshot, JobCommit, JobRequest, JobResult, JobTracker};
use super::mask::SelectionMask;
use super::raster::{CHANNELS, RasterImage};
use super::{RedactError, RedactionConfig};
use crate::detection::DetectionBox;

/// 整图模糊缓存（最多一条）。
#[derive(Debug, Clone)]
struct BlurCacheEntry {
    strength: u32,
    image: RasterImage,
}

/// 按检测框打码的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionApply {
    /// 没有可打码的区域，会话未被修改。
    NothingToRedact,
    /// 已按 `boxes` 个有效检测框完成打码。
    Redacted { boxes: usize },
}

/// 单张图片的打码会话。
pub struct RedactionSession<E: BlurEngine = BoxBlur> {
    config: RedactionConfig,
    engine: E,
    source_path: Option<PathBuf>,
    original: Option<RasterImage>,
    redacted: Option<RasterImage>,
    cumulative_mask: Option<SelectionMask>,
    cache: Option<BlurCacheEntry>,
    history: EditHistory,
    jobs: JobTracker,
}

impl RedactionSession<BoxBlur> {
    /// 使用默认配置与盒式模糊创建会话。
    pub fn new() -> Self {
        Self::with_engine(RedactionConfig::default(), BoxBlur)
    }

    /// 使用自定义配置创建会话。
    pub fn with_config(config: RedactionConfig) -> Result<Self, RedactError> {
        config.validate()?;
        Ok(Self::with_engine(config, BoxBlur))
    }
}

impl Default for RedactionSession<BoxBlur> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BlurEngine> RedactionSession<E> {
    /// 注入模糊实现（测试中用于统计调用次数）。
    pub fn with_engine(config: RedactionConfig, engine: E) -> Self {
        let history = EditHistory::new(config.undo_limit);
        Self {
            config,
            engine,
            source_path: None,
            original: None,
            redacted: None,
            cumulative_mask: None,
            cache: None,
            history,
            jobs: JobTracker::default(),
        }
    }

    // ------------------------------------------------------------------------
    // 查询
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &RedactionConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn has_image(&self) -> bool {
        self.original.is_some()
    }

    pub fn original(&self) -> Option<&RasterImage> {
        self.original.as_ref()
    }

    pub fn redacted(&self) -> Option<&RasterImage> {
        self.redacted.as_ref()
    }

    pub fn cumulative_mask(&self) -> Option<&SelectionMask> {
        self.cumulative_mask.as_ref()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// 当前缓存对应的强度。
    pub fn cached_strength(&self) -> Option<u32> {
        self.cache.as_ref().map(|entry| entry.strength)
    }

    pub fn can_undo(&self) -> bool {
        self.history.undo_depth() > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history.redo_depth() > 0
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    // ------------------------------------------------------------------------
    // 加载与导出
    // ------------------------------------------------------------------------

    /// 从文件加载图片；解码失败时保留之前的全部状态。
    pub fn load_image(&mut self, path: &Path) -> Result<(), RedactError> {
        let image = RasterImage::load_from_path(path, &self.config)?;
        self.reset_with(image, Some(path.to_path_buf()));
        Ok(())
    }

    /// 采用内存中的图片，重置语义与 `load_image` 相同。
    pub fn load_raster(&mut self, image: RasterImage) {
        self.reset_with(image, None);
    }

    /// 将当前打码结果导出到文件。
    pub fn export(&self, path: &Path) -> Result<(), RedactError> {
        let redacted = self.redacted.as_ref().ok_or(RedactError::NoImage)?;
        redacted.export_to_path(path, &self.config)
    }

    fn reset_with(&mut self, image: RasterImage, source_path: Option<PathBuf>) {
        log::info!(
            "🖼️ 会话载入新图片 - {}x{}",
            image.width(),
            image.height()
        );
        self.redacted = Some(image.clone());
        self.original = Some(image);
        self.source_path = source_path;
        self.cumulative_mask = None;
        self.cache = None;
        self.history.clear();
        self.jobs.invalidate();
    }

    // ------------------------------------------------------------------------
    // 编辑操作
    // ------------------------------------------------------------------------

    /// 整图模糊预览；同强度命中缓存时不再计算。
    pub fn apply_full_blur(&mut self, strength: u32) -> Result<(), RedactError> {
        let original = self.original.as_ref().ok_or(RedactError::NoImage)?;

        if let Some(entry) = self.cache.as_ref().filter(|entry| entry.strength == strength) {
            log::debug!("♻️ 命中整图模糊缓存 - strength={}", strength);
            self.redacted = Some(entry.image.clone());
            return Ok(());
        }

        let start = Instant::now();
        let radius = radius_for_strength(strength);
        let blurred = self.engine.blur(original, radius);
        log::info!(
            "🌫️ 整图模糊完成 - strength={} radius={} elapsed={}ms",
            strength,
            radius,
            start.elapsed().as_millis()
        );

        self.cache = Some(BlurCacheEntry {
            strength,
            image: blurred.clone(),
        });
        self.redacted = Some(blurred);
        Ok(())
    }

    /// 在选区内打码，并将选区并入累计选区。
    pub fn apply_masked_blur(&mut self, strength: u32, stroke: &SelectionMask) -> Result<(), RedactError> {
        if !self.mask_fits(stroke)? {
            return self.apply_full_blur(strength);
        }
        let original = self.original.as_ref().ok_or(RedactError::NoImage)?;

        let start = Instant::now();
        let blurred = self.engine.blur(original, radius_for_strength(strength));
        self.commit_masked_blur(stroke, &blurred)?;
        log::info!(
            "🖌️ 选区打码完成 - strength={} selected={} elapsed={}ms",
            strength,
            stroke.selected_count(),
            start.elapsed().as_millis()
        );
        Ok(())
    }

    /// 移除选区内的打码；没有累计选区时不做任何事并返回 `Ok(false)`。
    ///
    /// 被保留的区域用固定参考强度重建模糊，而非各笔迹当时的强度，
    /// 因此“移除后再打码”并不总是严格的逆操作。
    pub fn remove_redaction(&mut self, stroke: &SelectionMask) -> Result<bool, RedactError> {
        let original = self.original.as_ref().ok_or(RedactError::NoImage)?;
        if !self.has_matching_cumulative_mask() {
            log::debug!("当前没有累计选区，忽略移除操作");
            return Ok(false);
        }

        let start = Instant::now();
        let reference = self
            .engine
            .blur(original, radius_for_strength(self.config.reference_strength));
        let changed = self.commit_removal(stroke, &reference)?;
        log::info!(
            "🧽 移除打码完成 - reference_strength={} elapsed={}ms",
            self.config.reference_strength,
            start.elapsed().as_millis()
        );
        Ok(changed)
    }

    /// 采用外部（后台线程）算好的整图模糊结果，同时写入缓存；不触碰累计选区。
    pub fn commit_computed(&mut self, image: RasterImage, strength: u32) -> Result<(), RedactError> {
        let original = self.original.as_ref().ok_or(RedactError::NoImage)?;
        if image.dimensions() != original.dimensions() {
            return Err(RedactError::DimensionMismatch {
                expected: original.dimensions(),
                actual: image.dimensions(),
            });
        }

        self.cache = Some(BlurCacheEntry {
            strength,
            image: image.clone(),
        });
        self.redacted = Some(image);
        Ok(())
    }

    /// 撤销；撤销栈为空时返回 `Ok(false)`。
    pub fn undo(&mut self) -> Result<bool, RedactError> {
        let current = self.redacted.as_ref().ok_or(RedactError::NoImage)?;
        match self.history.undo(current.clone()) {
            Some(previous) => {
                self.redacted = Some(previous);
                self.cache = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 重做；重做栈为空时返回 `Ok(false)`。
    pub fn redo(&mut self) -> Result<bool, RedactError> {
        let current = self.redacted.as_ref().ok_or(RedactError::NoImage)?;
        match self.history.redo(current.clone()) {
            Some(next) => {
                self.redacted = Some(next);
                self.cache = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 按检测框打码。空列表或全部框被裁掉时不修改会话。
    pub fn apply_detections(
        &mut self,
        strength: u32,
        boxes: &[DetectionBox],
    ) -> Result<DetectionApply, RedactError> {
        let original = self.original.as_ref().ok_or(RedactError::NoImage)?;
        let (width, height) = original.dimensions();

        let valid = boxes.iter().filter(|b| b.clip(width, height).is_some()).count();
        if valid == 0 {
            log::info!("🔍 检测结果为空（共 {} 个框），无需打码", boxes.len());
            return Ok(DetectionApply::NothingToRedact);
        }

        let mask = SelectionMask::from_detections(width, height, boxes);
        self.apply_masked_blur(strength, &mask)?;
        Ok(DetectionApply::Redacted { boxes: valid })
    }

    // ------------------------------------------------------------------------
    // 后台任务
    // ------------------------------------------------------------------------

    /// 为整图模糊取快照。
    pub fn snapshot_full_blur(&mut self, strength: u32) -> Result<BlurSnapshot, RedactError> {
        self.snapshot(JobRequest::FullBlur { strength }, strength)
    }

    /// 为选区打码取快照（选区按值复制进快照）。
    pub fn snapshot_masked_blur(
        &mut self,
        strength: u32,
        mask: &SelectionMask,
    ) -> Result<BlurSnapshot, RedactError> {
        self.snapshot(
            JobRequest::MaskedBlur {
                strength,
                mask: mask.clone(),
            },
            strength,
        )
    }

    /// 为移除打码取快照，使用参考强度。
    pub fn snapshot_removal(&mut self, mask: &SelectionMask) -> Result<BlurSnapshot, RedactError> {
        let reference = self.config.reference_strength;
        self.snapshot(JobRequest::Removal { mask: mask.clone() }, reference)
    }

    /// 合并后台结果；非最新编号的结果直接丢弃。
    pub fn commit_job(&mut self, result: JobResult) -> Result<JobCommit, RedactError> {
        if !self.jobs.is_current(result.id) {
            log::debug!(
                "⏭️ 丢弃过期后台结果 {}（最新 {:?}）",
                result.id,
                self.jobs.latest().map(|id| id.value())
            );
            return Ok(JobCommit::Discarded {
                id: result.id,
                latest: self.jobs.latest(),
            });
        }

        let original = self.original.as_ref().ok_or(RedactError::NoImage)?;
        if result.blurred.dimensions() != original.dimensions() {
            return Err(RedactError::DimensionMismatch {
                expected: original.dimensions(),
                actual: result.blurred.dimensions(),
            });
        }

        match result.request {
            JobRequest::FullBlur { strength } => {
                self.commit_computed(result.blurred, strength)?;
            }
            JobRequest::MaskedBlur { strength, mask } => {
                if self.mask_fits(&mask)? {
                    self.commit_masked_blur(&mask, &result.blurred)?;
                } else {
                    self.commit_computed(result.blurred, strength)?;
                }
            }
            JobRequest::Removal { mask } => {
                if !self.has_matching_cumulative_mask() {
                    log::debug!("⏭️ 后台移除结果 {} 无可移除区域，未改动", result.id);
                    return Ok(JobCommit::Skipped { id: result.id });
                }
                self.commit_removal(&mask, &result.blurred)?;
            }
        }

        log::debug!("✅ 已合并后台结果 {}", result.id);
        Ok(JobCommit::Applied { id: result.id })
    }

    fn snapshot(&mut self, request: JobRequest, blur_strength: u32) -> Result<BlurSnapshot, RedactError> {
        let original = self.original.as_ref().ok_or(RedactError::NoImage)?.clone();
        let id = self.jobs.issue();
        log::debug!("📤 提交后台任务 {} - strength={}", id, blur_strength);
        Ok(BlurSnapshot {
            id,
            original,
            request,
            blur_strength,
        })
    }

    // ------------------------------------------------------------------------
    // 内部合成
    // ------------------------------------------------------------------------

    /// 选区是否可直接使用；`false` 表示需要回退为整图操作。
    fn mask_fits(&self, mask: &SelectionMask) -> Result<bool, RedactError> {
        let original = self.original.as_ref().ok_or(RedactError::NoImage)?;
        let (width, height) = original.dimensions();
        match mask.ensure_dimensions(width, height) {
            Ok(()) => Ok(true),
            Err(err) if self.config.reject_mismatched_masks => Err(err),
            Err(err) => {
                log::warn!("⚠️ {}，回退为整图操作", err);
                Ok(false)
            }
        }
    }

    fn has_matching_cumulative_mask(&self) -> bool {
        match (&self.original, &self.cumulative_mask) {
            (Some(original), Some(mask)) => mask.dimensions() == original.dimensions(),
            _ => false,
        }
    }

    /// 选区打码的写入阶段；`blurred` 为原图的整图模糊结果。
    fn commit_masked_blur(&mut self, stroke: &SelectionMask, blurred: &RasterImage) -> Result<(), RedactError> {
        let original = self.original.as_ref().ok_or(RedactError::NoImage)?;
        let current = self.redacted.as_ref().ok_or(RedactError::NoImage)?;

        let effective = match &self.cumulative_mask {
            Some(cumulative) => stroke.union(cumulative)?,
            None => stroke.clone(),
        };
        let composed = compose(original, blurred, &effective, |v| v > 0)?;

        self.history.record(current.clone());
        self.redacted = Some(composed);
        self.cumulative_mask = Some(effective);
        self.cache = None;
        Ok(())
    }

    /// 移除打码的写入阶段；`reference` 为参考强度下的整图模糊结果。
    fn commit_removal(&mut self, stroke: &SelectionMask, reference: &RasterImage) -> Result<bool, RedactError> {
        let original = self.original.as_ref().ok_or(RedactError::NoImage)?;
        let current = self.redacted.as_ref().ok_or(RedactError::NoImage)?;
        let cumulative = self.cumulative_mask.as_ref().ok_or(RedactError::NoImage)?;
        let (width, height) = original.dimensions();

        let stroke = if self.mask_fits(stroke)? {
            stroke.clone()
        } else {
            SelectionMask::full(width, height)
        };

        let remaining = cumulative.subtract(&stroke)?;
        let composed = compose(original, reference, &remaining, |v| v > 0)?;

        self.history.record(current.clone());
        self.redacted = Some(composed);
        self.cumulative_mask = if remaining.is_empty() { None } else { Some(remaining) };
        self.cache = None;
        Ok(true)
    }
}

/// 以原图为底，在 `select` 为真的像素处取 `overlay`。
fn compose<F>(
    base: &RasterImage,
    overlay: &RasterImage,
    mask: &SelectionMask,
    select: F,
) -> Result<RasterImage, RedactError>
where
    F: Fn(u8) -> bool,
{
    if overlay.dimensions() != base.dimensions() {
        return Err(RedactError::DimensionMismatch {
            expected: base.dimensions(),
            actual: overlay.dimensions(),
        });
    }
    let (width, height) = base.dimensions();
    mask.ensure_dimensions(width, height)?;

    let mut output = base.clone();
    let source = overlay.as_raw();
    let target = output.as_raw_mut();
    for (index, &intensity) in mask.as_raw().iter().enumerate() {
        if select(intensity) {
            let offset = index * CHANNELS;
            target[offset..offset + CHANNELS].copy_from_slice(&source[offset..offset + CHANNELS]);
        }
    }
    Ok(output)
}
