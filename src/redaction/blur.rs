//! # 盒式模糊模块
//!
//! ## 设计思路
//!
//! 模糊是纯函数：输入图片与半径，输出新图片，无副作用。
//! 通过 `BlurEngine` trait 抽象，会话对其泛型化，测试可以注入计数实现。
//!
//! ## 实现思路
//!
//! 1. 逐通道构建积分图（summed-area table，带一行一列零填充），O(W·H)
//! 2. 对每个像素取 `2r+1` 方形窗口并裁剪到图像边界（不环绕、不镜像）
//! 3. 四角查表得到窗口和，O(1) 每像素
//! 4. 四舍五入：`(sum + count/2) / count`
//!
//! 积分图缓冲在四个通道之间复用，峰值内存约为 `(W+1)(H+1)*8` 字节。

use super::config::MAX_STRENGTH;
use super::raster::{CHANNELS, RasterImage};

/// 模糊半径上限。
pub const MAX_BLUR_RADIUS: u32 = 30;

/// 强度 → 半径：`floor(sqrt(strength) * 3)`，上限 30。
///
/// 平方根曲线在低强度区间提供更细的调节，并在高强度区间迅速饱和。
pub fn radius_for_strength(strength: u32) -> u32 {
    let strength = strength.min(MAX_STRENGTH);
    let radius = ((strength as f64).sqrt() * 3.0).floor() as u32;
    radius.min(MAX_BLUR_RADIUS)
}

/// 模糊算法抽象。
pub trait BlurEngine: Send + Sync {
    /// `radius == 0` 时必须原样返回输入。
    fn blur(&self, image: &RasterImage, radius: u32) -> RasterImage;
}

/// 基于积分图的均匀盒式模糊。
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxBlur;

impl BlurEngine for BoxBlur {
    fn blur(&self, image: &RasterImage, radius: u32) -> RasterImage {
        box_blur(image, radius)
    }
}

/// 盒式模糊。
pub fn box_blur(image: &RasterImage, radius: u32) -> RasterImage {
    let (width, height) = image.dimensions();
    if radius == 0 || width == 0 || height == 0 {
        return image.clone();
    }

    let w = width as usize;
    let h = height as usize;
    let r = radius as usize;
    let stride = w + 1;

    let src = image.as_raw();
    let mut output = image.clone();
    let dst = output.as_raw_mut();
    let mut table = vec![0u64; stride * (h + 1)];

    for channel in 0..CHANNELS {
        fill_summed_area_table(&mut table, src, w, h, channel);

        for y in 0..h {
            let y0 = y.saturating_sub(r);
            let y1 = (y + r).min(h - 1) + 1;

            for x in 0..w {
                let x0 = x.saturating_sub(r);
                let x1 = (x + r).min(w - 1) + 1;

                let sum = table[y1 * stride + x1] + table[y0 * stride + x0]
                    - table[y0 * stride + x1]
                    - table[y1 * stride + x0];
                let count = ((x1 - x0) * (y1 - y0)) as u64;

                dst[(y * w + x) * CHANNELS + channel] = ((sum + count / 2) / count) as u8;
            }
        }
    }

    output
}

/// 构建单通道的包含式前缀和，`table[(y+1)*stride + (x+1)]` 为 `[0..=x] × [0..=y]` 的和。
fn fill_summed_area_table(table: &mut [u64], src: &[u8], w: usize, h: usize, channel: usize) {
    let stride = w + 1;
    table[..stride].fill(0);

    for y in 0..h {
        let row = (y + 1) * stride;
        table[row] = 0;
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += src[(y * w + x) * CHANNELS + channel] as u64;
            table[row + x + 1] = table[row - stride + x + 1] + row_sum;
        }
    }
}
