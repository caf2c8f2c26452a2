//! # 选区掩码模块
//!
//! ## 设计思路
//!
//! 选区是与目标图片同尺寸的单通道强度缓冲，取值 0..=255，0 表示未选中。
//! 相比“用彩色图的亮度充当掩码”，单通道缓冲内存更省，也不会与颜色通道耦合。
//! “尚无选区”用 `Option<SelectionMask>` 表达，与“全 0 选区”区分开。
//!
//! ## 实现思路
//!
//! - 代数运算逐像素进行：并集取 max，差集在 B 选中处清零，替换直接取 B。
//! - 检测框先裁剪到图像范围，退化矩形静默丢弃。
//! - 画笔笔迹在图像坐标系中光栅化：每段折线按“胶囊”距离判定。

use super::RedactError;
use crate::detection::DetectionBox;

/// 选中像素的强度。
pub const SELECTED: u8 = 255;

/// 画笔默认半径（像素）。
pub const DEFAULT_BRUSH_RADIUS: f32 = 30.0;

/// 已裁剪到图像范围内的非空矩形（像素坐标）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }
}

/// 一笔画笔轨迹（图像坐标系）。
#[derive(Debug, Clone, PartialEq)]
pub struct BrushStroke {
    pub points: Vec<(f32, f32)>,
    pub radius: f32,
}

impl BrushStroke {
    pub fn new(points: Vec<(f32, f32)>, radius: f32) -> Self {
        Self { points, radius }
    }

    /// 使用默认画笔半径。
    pub fn with_default_brush(points: Vec<(f32, f32)>) -> Self {
        Self::new(points, DEFAULT_BRUSH_RADIUS)
    }
}

/// 选区组合方式（对应画布上的 替换 / 添加 / 减去 三种模式）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Replace,
    Add,
    Subtract,
}

impl SelectionMode {
    /// 用新笔迹更新当前选区；当前无选区时视为全 0。
    pub fn combine(
        self,
        current: Option<&SelectionMask>,
        stroke: &SelectionMask,
    ) -> Result<SelectionMask, RedactError> {
        let Some(current) = current else {
            return Ok(match self {
                Self::Replace | Self::Add => stroke.clone(),
                Self::Subtract => SelectionMask::empty(stroke.width, stroke.height),
            });
        };

        match self {
            Self::Replace => current.replace(stroke),
            Self::Add => current.union(stroke),
            Self::Subtract => current.subtract(stroke),
        }
    }
}

/// 单通道选区掩码。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl SelectionMask {
    /// 全 0 选区。
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// 整图选中。
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![SELECTED; width as usize * height as usize],
        }
    }

    /// 由原始强度数据构建，长度必须为 `width * height`。
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RedactError> {
        let expected = width as u64 * height as u64;
        let actual = data.len() as u64;
        if actual != expected {
            return Err(RedactError::MaskLength { expected, actual });
        }
        Ok(Self { width, height, data })
    }

    /// 将若干已裁剪矩形填充为最大强度。
    pub fn from_rects(width: u32, height: u32, rects: &[PixelRect]) -> Self {
        let mut mask = Self::empty(width, height);
        for rect in rects {
            mask.fill_rect(rect);
        }
        mask
    }

    /// 由检测框构建：逐框裁剪，退化或越界的框不产生任何选中像素。
    pub fn from_detections(width: u32, height: u32, boxes: &[DetectionBox]) -> Self {
        let rects: Vec<PixelRect> = boxes
            .iter()
            .filter_map(|b| b.clip(width, height))
            .collect();
        Self::from_rects(width, height, &rects)
    }

    /// 光栅化画笔轨迹。
    pub fn from_stroke(width: u32, height: u32, stroke: &BrushStroke) -> Self {
        let mut mask = Self::empty(width, height);
        if stroke.points.is_empty() || stroke.radius <= 0.0 || width == 0 || height == 0 {
            return mask;
        }

        let first = stroke.points[0];
        mask.paint_segment(first, first, stroke.radius);
        for pair in stroke.points.windows(2) {
            mask.paint_segment(pair[0], pair[1], stroke.radius);
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y as usize * self.width as usize + x as usize])
    }

    pub fn is_selected(&self, x: u32, y: u32) -> bool {
        self.get(x, y).is_some_and(|v| v > 0)
    }

    /// 没有任何选中像素。
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    pub fn selected_count(&self) -> usize {
        self.data.iter().filter(|&&v| v > 0).count()
    }

    /// `union(A,B)[p] = max(A[p], B[p])`
    pub fn union(&self, other: &SelectionMask) -> Result<SelectionMask, RedactError> {
        self.zip_with(other, |a, b| a.max(b))
    }

    /// `subtract(A,B)[p] = A[p]`，仅当 `B[p] == 0`；否则为 0。
    pub fn subtract(&self, other: &SelectionMask) -> Result<SelectionMask, RedactError> {
        self.zip_with(other, |a, b| if b == 0 { a } else { 0 })
    }

    /// `replace(A,B) = B`，尺寸仍需一致。
    pub fn replace(&self, other: &SelectionMask) -> Result<SelectionMask, RedactError> {
        self.ensure_same_dimensions(other)?;
        Ok(other.clone())
    }

    pub(crate) fn ensure_dimensions(&self, width: u32, height: u32) -> Result<(), RedactError> {
        if self.dimensions() != (width, height) {
            return Err(RedactError::InvalidMaskDimensions {
                expected: (width, height),
                actual: self.dimensions(),
            });
        }
        Ok(())
    }

    fn ensure_same_dimensions(&self, other: &SelectionMask) -> Result<(), RedactError> {
        other.ensure_dimensions(self.width, self.height)
    }

    fn zip_with<F>(&self, other: &SelectionMask, f: F) -> Result<SelectionMask, RedactError>
    where
        F: Fn(u8, u8) -> u8,
    {
        self.ensure_same_dimensions(other)?;
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(SelectionMask {
            width: self.width,
            height: self.height,
            data,
        })
    }

    fn fill_rect(&mut self, rect: &PixelRect) {
        let x_end = (rect.x + rect.width).min(self.width) as usize;
        let y_end = (rect.y + rect.height).min(self.height) as usize;
        let stride = self.width as usize;
        for y in rect.y as usize..y_end {
            self.data[y * stride + rect.x as usize..y * stride + x_end].fill(SELECTED);
        }
    }

    /// 以像素中心到线段的距离判定，距离不超过半径即选中。
    fn paint_segment(&mut self, a: (f32, f32), b: (f32, f32), radius: f32) {
        let min_x = (a.0.min(b.0) - radius).floor().max(0.0);
        let min_y = (a.1.min(b.1) - radius).floor().max(0.0);
        let max_x = (a.0.max(b.0) + radius).ceil().min(self.width as f32 - 1.0);
        let max_y = (a.1.max(b.1) + radius).ceil().min(self.height as f32 - 1.0);
        if max_x < min_x || max_y < min_y {
            return;
        }

        let radius_sq = radius * radius;
        let stride = self.width as usize;
        for y in min_y as usize..=max_y as usize {
            for x in min_x as usize..=max_x as usize {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                if distance_sq_to_segment(p, a, b) <= radius_sq {
                    self.data[y * stride + x] = SELECTED;
                }
            }
        }
    }
}

fn distance_sq_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    (p.0 - cx) * (p.0 - cx) + (p.1 - cy) * (p.1 - cy)
}
