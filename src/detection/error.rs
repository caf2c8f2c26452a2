//! 检测器错误类型。
//!
//! 任何检测失败都只通过返回值传播，不会修改打码会话。

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    /// 脚本、模型或 Python 解释器缺失。
    #[error("检测器不可用：{0}")]
    Unavailable(String),

    /// 进程非零退出、超时，或输出缺少必需字段。
    #[error("检测器执行失败：{message}")]
    Failure {
        message: String,
        /// 捕获到的 stderr / stdout，便于排查。
        diagnostics: String,
    },

    /// 输出中找不到合法的 JSON 对象。
    #[error("检测结果解析失败：{0}")]
    Parse(String),
}

impl DetectionError {
    pub(crate) fn failure(message: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            diagnostics: diagnostics.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "E_DETECTOR_UNAVAILABLE",
            Self::Failure { .. } => "E_DETECTOR_FAILURE",
            Self::Parse(_) => "E_DETECTOR_PARSE",
        }
    }

    pub fn stage(&self) -> &'static str {
        "detect"
    }

    /// 捕获的诊断输出（仅执行失败时存在）。
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Failure { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_keeps_diagnostics() {
        let err = DetectionError::failure("退出码 1", "ERROR: model not found");
        assert_eq!(err.code(), "E_DETECTOR_FAILURE");
        assert_eq!(err.diagnostics(), Some("ERROR: model not found"));
        assert_eq!(err.to_string(), "检测器执行失败：退出码 1");
    }

    #[test]
    fn codes_are_distinct() {
        assert_eq!(DetectionError::Unavailable("x".into()).code(), "E_DETECTOR_UNAVAILABLE");
        assert_eq!(DetectionError::Parse("x".into()).code(), "E_DETECTOR_PARSE");
        assert_eq!(DetectionError::Parse("x".into()).stage(), "detect");
        assert!(DetectionError::Parse("x".into()).diagnostics().is_none());
    }
}
