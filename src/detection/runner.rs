//! 运行外部检测脚本。

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;

use super::{DetectionError, DetectionOutcome, DetectorConfig, parse_detector_output};

const INTERPRETER_CANDIDATES: [&str; 2] = ["python3", "python"];

/// 对 `image_path` 运行检测脚本。
///
/// 调用形式：`<python> <script> --model <model> --image <image> --conf <confidence>`。
/// 超时后子进程会被终止。
pub async fn run_detector(
    config: &DetectorConfig,
    image_path: &Path,
) -> Result<DetectionOutcome, DetectionError> {
    if !config.script.is_file() {
        return Err(DetectionError::Unavailable(format!(
            "检测脚本不存在：{}",
            config.script.display()
        )));
    }
    if !config.model.is_file() {
        return Err(DetectionError::Unavailable(format!(
            "模型文件不存在：{}",
            config.model.display()
        )));
    }
    let interpreter = resolve_interpreter(config)?;

    log::info!(
        "🔍 启动检测器 - interpreter={} script={} image={}",
        interpreter.display(),
        config.script.display(),
        image_path.display()
    );
    let start = Instant::now();

    let child = Command::new(&interpreter)
        .arg(&config.script)
        .arg("--model")
        .arg(&config.model)
        .arg("--image")
        .arg(image_path)
        .arg("--conf")
        .arg(config.confidence.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DetectionError::Unavailable(format!("无法启动 {}：{}", interpreter.display(), e)))?;

    let output = match tokio::time::timeout(config.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(DetectionError::failure(format!("等待检测进程失败：{}", e), ""));
        }
        Err(_) => {
            log::warn!("⏱️ 检测器超时（{}s），已终止", config.timeout.as_secs());
            return Err(DetectionError::failure(
                format!("检测超时（{}ms）", config.timeout.as_millis()),
                "",
            ));
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        log::warn!("❌ 检测器异常退出 - status={}", output.status);
        return Err(DetectionError::failure(
            format!("检测进程退出状态 {}", output.status),
            diagnostics(&stderr, &stdout),
        ));
    }

    let outcome = parse_detector_output(&stdout).map_err(|e| match e {
        DetectionError::Failure { message, .. } => {
            DetectionError::failure(message, diagnostics(&stderr, &stdout))
        }
        other => other,
    })?;

    log::info!(
        "✅ 检测完成 - boxes={} elapsed={}ms",
        outcome.boxes().len(),
        start.elapsed().as_millis()
    );
    Ok(outcome)
}

fn resolve_interpreter(config: &DetectorConfig) -> Result<PathBuf, DetectionError> {
    if let Some(explicit) = &config.interpreter {
        return which::which(explicit).map_err(|e| {
            DetectionError::Unavailable(format!("解释器不可用 {}：{}", explicit.display(), e))
        });
    }

    INTERPRETER_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| DetectionError::Unavailable("未找到 python3 / python".to_string()))
}

fn diagnostics(stderr: &str, stdout: &str) -> String {
    match (stderr.trim(), stdout.trim()) {
        ("", out) => out.to_string(),
        (err, "") => err.to_string(),
        (err, out) => format!("{}\n{}", err, out),
    }
}
