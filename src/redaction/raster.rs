//! # 位图与编解码模块
//!
//! ## 设计思路
//!
//! `RasterImage` 是引擎内部唯一的像素表示：固定 RGBA、每通道 8 位。
//! 原图一经加载即不可变，打码结果始终与原图同尺寸。
//!
//! ## 实现思路
//!
//! 加载顺序与剪贴板图片流水线一致，尽早失败：
//! 1. 文件存在性与体积校验
//! 2. 魔数识别（仅接受 PNG / JPEG / BMP）
//! 3. 读取 header 尺寸并按像素上限快速拒绝
//! 4. 完整解码并转换为 RGBA
//!
//! 导出按扩展名选择 PNG 或 JPEG，不隐式创建目录。

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use super::{RedactError, RedactionConfig};

/// 每像素字节数（RGBA）。
pub const CHANNELS: usize = 4;

/// RGBA8 位图。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    /// 由原始 RGBA 字节构建，长度必须等于 `width * height * 4`。
    pub fn from_rgba(width: u32, height: u32, bytes: Vec<u8>) -> Result<Self, RedactError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(CHANNELS))
            .ok_or_else(|| RedactError::ResourceLimit("图片尺寸导致内存溢出风险".to_string()))?;

        if bytes.len() != expected {
            return Err(RedactError::Decode(format!(
                "像素数据长度异常：期望 {} 字节，实际 {} 字节",
                expected,
                bytes.len()
            )));
        }

        RgbaImage::from_raw(width, height, bytes)
            .map(|pixels| Self { pixels })
            .ok_or_else(|| RedactError::Decode("无法构建像素缓冲".to_string()))
    }

    /// 纯色图片。
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba(rgba)),
        }
    }

    /// 按坐标生成像素。
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 4],
    {
        Self {
            pixels: RgbaImage::from_fn(width, height, |x, y| Rgba(f(x, y))),
        }
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            pixels: image.to_rgba8(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// 读取单个像素，越界返回 `None`。
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixels.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// 行优先的 RGBA 字节。
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels.into_raw()
    }

    /// 从本地路径加载图片。
    pub fn load_from_path(path: &Path, config: &RedactionConfig) -> Result<Self, RedactError> {
        let start = Instant::now();
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        if !path.exists() {
            return Err(RedactError::Load(format!("文件不存在：{}", path.display())));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| RedactError::Load(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > config.max_file_size {
            return Err(RedactError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| RedactError::Load(format!("无法读取图片文件：{}", e)))?;

        let image = Self::decode(&bytes, config)?;

        log::info!(
            "✅ 图片解码成功 - {}x{} elapsed={}ms",
            image.width(),
            image.height(),
            start.elapsed().as_millis()
        );

        Ok(image)
    }

    /// 解码内存中的图片字节。
    pub fn decode(bytes: &[u8], config: &RedactionConfig) -> Result<Self, RedactError> {
        let format = sniff_supported_format(bytes)?;

        let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(|e| RedactError::Decode(format!("无法读取图片尺寸：{}", e)))?;
        validate_pixel_limits(config, width, height)?;

        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| RedactError::Decode(format!("图片解码失败：{}", e)))?;

        Ok(Self::from_dynamic(decoded))
    }

    /// 路径的扩展名是否为可导出格式（png / jpg / jpeg，不区分大小写）。
    pub fn supports_export_path(path: &Path) -> bool {
        export_format_for(path).is_ok()
    }

    /// 按扩展名编码并写入目标路径。
    pub fn export_to_path(&self, path: &Path, config: &RedactionConfig) -> Result<(), RedactError> {
        let start = Instant::now();
        let format = export_format_for(path)?;

        // 先在内存中完成编码，编码失败时不会在磁盘上留下残缺文件
        let mut encoded = Cursor::new(Vec::new());
        match format {
            ImageFormat::Jpeg => {
                // JPEG 不支持透明通道
                let rgb = DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(self.pixels.clone()).to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut encoded, config.jpeg_quality);
                rgb.write_with_encoder(encoder)
                    .map_err(|e| RedactError::Encode(format!("JPEG 编码失败：{}", e)))?;
            }
            _ => {
                DynamicImage::ImageRgba8(self.pixels.clone())
                    .write_to(&mut encoded, ImageFormat::Png)
                    .map_err(|e| RedactError::Encode(format!("PNG 编码失败：{}", e)))?;
            }
        }

        std::fs::write(path, encoded.into_inner())
            .map_err(|e| RedactError::Encode(format!("无法写入 {}：{}", path.display(), e)))?;

        log::info!(
            "💾 导出完成 - {} ({:?}) elapsed={}ms",
            path.display(),
            format,
            start.elapsed().as_millis()
        );
        Ok(())
    }
}

/// 通过魔数识别格式，仅放行 PNG / JPEG / BMP。
fn sniff_supported_format(bytes: &[u8]) -> Result<ImageFormat, RedactError> {
    if bytes.is_empty() {
        return Err(RedactError::Decode("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| RedactError::Decode("无法识别图片类型".to_string()))?;

    match kind.mime_type() {
        "image/png" => Ok(ImageFormat::Png),
        "image/jpeg" => Ok(ImageFormat::Jpeg),
        "image/bmp" => Ok(ImageFormat::Bmp),
        other => Err(RedactError::Decode(format!("不支持的图片格式：{}", other))),
    }
}

fn validate_pixel_limits(config: &RedactionConfig, width: u32, height: u32) -> Result<(), RedactError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| RedactError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels == 0 {
        return Err(RedactError::Decode("图片尺寸为 0".to_string()));
    }

    if pixels > config.max_decoded_pixels {
        return Err(RedactError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

fn export_format_for(path: &Path) -> Result<ImageFormat, RedactError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        other => Err(RedactError::Encode(format!(
            "不支持的导出格式：{:?}（可选：png / jpg / jpeg）",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("cleanshare_raster_{}_{}", tag, nanos));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn gradient(width: u32, height: u32) -> RasterImage {
        RasterImage::from_fn(width, height, |x, y| {
            [(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255]
        })
    }

    #[test]
    fn from_rgba_rejects_wrong_length() {
        let result = RasterImage::from_rgba(2, 2, vec![0; 15]);
        assert!(matches!(result, Err(RedactError::Decode(_))));
    }

    #[test]
    fn png_export_then_load_is_lossless() {
        let dir = unique_temp_dir("png");
        let path = dir.join("out.png");
        let config = RedactionConfig::default();
        let image = gradient(37, 21);

        image.export_to_path(&path, &config).expect("export png");
        let loaded = RasterImage::load_from_path(&path, &config).expect("load png");
        assert_eq!(loaded, image);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn jpeg_export_keeps_dimensions() {
        let dir = unique_temp_dir("jpeg");
        let path = dir.join("out.JPG");
        let config = RedactionConfig::default();
        let image = gradient(40, 30);

        image.export_to_path(&path, &config).expect("export jpeg");
        let loaded = RasterImage::load_from_path(&path, &config).expect("load jpeg");
        assert_eq!(loaded.dimensions(), (40, 30));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn bmp_is_accepted_on_load() {
        let dir = unique_temp_dir("bmp");
        let path = dir.join("in.bmp");
        let image = gradient(8, 5);
        DynamicImage::ImageRgba8(RgbaImage::from_raw(8, 5, image.as_raw().to_vec()).expect("buffer"))
            .save_with_format(&path, ImageFormat::Bmp)
            .expect("write bmp");

        let loaded = RasterImage::load_from_path(&path, &RedactionConfig::default()).expect("load bmp");
        assert_eq!(loaded.dimensions(), (8, 5));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_is_load_error() {
        let result = RasterImage::load_from_path(
            Path::new("/definitely/not/here.png"),
            &RedactionConfig::default(),
        );
        assert!(matches!(result, Err(RedactError::Load(_))));
    }

    #[test]
    fn non_image_bytes_are_decode_error() {
        let result = RasterImage::decode(b"hello, this is not an image", &RedactionConfig::default());
        assert!(matches!(result, Err(RedactError::Decode(_))));
        assert!(matches!(
            RasterImage::decode(&[], &RedactionConfig::default()),
            Err(RedactError::Decode(_))
        ));
    }

    #[test]
    fn pixel_limit_rejects_before_full_decode() {
        let dir = unique_temp_dir("limit");
        let path = dir.join("big.png");
        gradient(64, 64)
            .export_to_path(&path, &RedactionConfig::default())
            .expect("export");

        let mut config = RedactionConfig::default();
        config.max_decoded_pixels = 100;
        let result = RasterImage::load_from_path(&path, &config);
        assert!(matches!(result, Err(RedactError::ResourceLimit(_))));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn unsupported_extension_or_unwritable_path_is_encode_error() {
        let config = RedactionConfig::default();
        let image = gradient(4, 4);

        let dir = unique_temp_dir("ext");
        let result = image.export_to_path(&dir.join("out.gif"), &config);
        assert!(matches!(result, Err(RedactError::Encode(_))));

        let result = image.export_to_path(&dir.join("missing_dir").join("out.png"), &config);
        assert!(matches!(result, Err(RedactError::Encode(_))));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn failed_encode_leaves_no_file_behind() {
        let dir = unique_temp_dir("partial");
        let path = dir.join("empty.jpg");
        let config = RedactionConfig::default();

        // JPEG 要求宽高都在 1..=65535
        let result = RasterImage::solid(0, 0, [0, 0, 0, 255]).export_to_path(&path, &config);
        assert!(matches!(result, Err(RedactError::Encode(_))));
        assert!(!path.exists());

        let ok = dir.join("ok.jpg");
        gradient(3, 3).export_to_path(&ok, &config).expect("export");
        assert!(ok.exists());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn export_path_support_follows_export_formats() {
        assert!(RasterImage::supports_export_path(Path::new("a.PNG")));
        assert!(RasterImage::supports_export_path(Path::new("a.jpeg")));
        assert!(RasterImage::supports_export_path(Path::new("a.JpG")));
        assert!(!RasterImage::supports_export_path(Path::new("a.bmp")));
        assert!(!RasterImage::supports_export_path(Path::new("a")));
    }
}
