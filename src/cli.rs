//! 命令行前端
//!
//! 在无界面环境下驱动同一套会话 API：加载 → 打码（整图 / 矩形 / 检测）→ 导出。
//! 整图模糊走后台工作器路径，与图形界面中拖动滑块时的流程一致。

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;

use crate::detection::{self, DetectionBox, DetectionOutcome};
use crate::error::AppError;
use crate::redaction::{DetectionApply, MAX_STRENGTH, PreviewScheduler, RedactionSession};
use crate::settings::AppSettings;
use crate::storage::{is_supported_export_path, suggested_export_path};

#[derive(Debug, Parser)]
#[command(name = "cleanshare")]
#[command(about = "Blur sensitive regions of an image before sharing", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Image to redact (PNG, JPEG or BMP)
    pub input: PathBuf,

    /// Output file (.png / .jpg / .jpeg); defaults to <stem>_cleaned.png next to the input
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Blur strength 0-100 (default from settings: 50)
    #[arg(short, long)]
    pub strength: Option<u32>,

    /// Region to blur as x,y,w,h in image pixels; may be repeated
    #[arg(long = "box", value_name = "X,Y,W,H", value_parser = parse_box)]
    pub boxes: Vec<DetectionBox>,

    /// Run the external object detector and blur what it finds
    #[arg(long)]
    pub detect: bool,

    /// Blur the whole image; cannot be combined with --box or --detect
    #[arg(long, conflicts_with_all = ["boxes", "detect"])]
    pub full: bool,

    /// Settings file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// 解析 `x,y,w,h`。
pub fn parse_box(value: &str) -> Result<DetectionBox, String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [x, y, w, h] = parts.as_slice() else {
        return Err(format!("expected x,y,w,h but got '{}'", value));
    };
    let number = |s: &str| s.parse::<i32>().map_err(|e| format!("invalid number '{}': {}", s, e));
    Ok(DetectionBox {
        x: number(*x)?,
        y: number(*y)?,
        w: number(*w)?,
        h: number(*h)?,
    })
}

/// 执行一次完整的打码流程，返回导出路径。
pub async fn run(cli: Cli) -> Result<PathBuf, AppError> {
    let started = Instant::now();
    let settings = match &cli.config {
        Some(path) => AppSettings::load_from_path(path)?,
        None => AppSettings::default(),
    };

    let strength = cli.strength.unwrap_or(settings.strength);
    if strength > MAX_STRENGTH {
        return Err(AppError::InvalidArgument(format!(
            "strength 必须在 0~{} 之间，实际 {}",
            MAX_STRENGTH, strength
        )));
    }

    let output = cli.output.clone().unwrap_or_else(|| suggested_export_path(&cli.input));
    if !is_supported_export_path(&output) {
        return Err(AppError::InvalidArgument(format!(
            "不支持的导出格式：{}（仅支持 png / jpg / jpeg）",
            output.display()
        )));
    }

    let mut session = RedactionSession::with_config(settings.redaction_config()?)?;
    session.load_image(&cli.input)?;

    // --full 与 --box / --detect 互斥，由 clap 保证
    let selective = !cli.boxes.is_empty() || cli.detect;
    if !selective {
        full_blur_in_background(&mut session, strength).await?;
    }

    if !cli.boxes.is_empty() {
        report(session.apply_detections(strength, &cli.boxes)?, "--box");
    }

    if cli.detect {
        detect_and_blur(&mut session, &settings, &cli.input, strength).await?;
    }

    session.export(&output)?;
    log::info!(
        "✅ 处理完成 - output={} total={}ms",
        output.display(),
        started.elapsed().as_millis()
    );
    Ok(output)
}

async fn full_blur_in_background(session: &mut RedactionSession, strength: u32) -> Result<(), AppError> {
    let mut preview = PreviewScheduler::new(session.config());
    preview.request(strength, Instant::now());

    match preview.settle(session).await? {
        Some(commit) if commit.is_applied() => log::debug!("🖼️ 整图模糊已合并 - strength={}", strength),
        other => log::warn!("⚠️ 整图模糊未合并：{:?}", other),
    }
    Ok(())
}

async fn detect_and_blur(
    session: &mut RedactionSession,
    settings: &AppSettings,
    input: &Path,
    strength: u32,
) -> Result<(), AppError> {
    let config = settings.detector_config().ok_or_else(|| {
        AppError::InvalidArgument("--detect 需要在设置文件中配置 detector.script 与 detector.model".to_string())
    })?;

    match detection::run_detector(&config, input).await? {
        DetectionOutcome::NoBoxes => {
            log::info!("🔍 检测器没有发现需要打码的区域");
        }
        DetectionOutcome::Boxes(boxes) => {
            report(session.apply_detections(strength, &boxes)?, "detector");
        }
    }
    Ok(())
}

fn report(outcome: DetectionApply, source: &str) {
    match outcome {
        DetectionApply::NothingToRedact => {
            log::warn!("⚠️ {} 给出的区域全部位于图片之外，未打码", source);
        }
        DetectionApply::Redacted { boxes } => {
            log::info!("🖌️ 已按 {} 的 {} 个区域打码", source, boxes);
        }
    }
}
