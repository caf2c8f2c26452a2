//! 解析检测脚本的标准输出。
//!
//! 脚本可能在结果前后打印模型加载日志等诊断文本，其中可能混有不配对的 `{` 或引号。
//! 因此不做括号计数，而是从每个 `{` 处尝试流式解析一个 JSON 值；
//! 解析成功的对象会跳过其内部的嵌套 `{`，最终取最后一个对象作为结果。

use serde::Deserialize;
use serde_json::Value;

use super::{DetectionBox, DetectionError, DetectionOutcome};

#[derive(Debug, Deserialize)]
struct DetectorReport {
    detections: Vec<DetectionBox>,
}

/// 从 stdout 中解析检测结果。
pub fn parse_detector_output(stdout: &str) -> Result<DetectionOutcome, DetectionError> {
    let value = top_level_objects(stdout)
        .pop()
        .ok_or_else(|| DetectionError::Parse(format!("输出中没有 JSON 对象：{}", preview(stdout))))?;

    let report: DetectorReport = serde_json::from_value(value)
        .map_err(|e| DetectionError::failure(format!("检测结果缺少必需字段：{}", e), stdout))?;

    if report.detections.is_empty() {
        Ok(DetectionOutcome::NoBoxes)
    } else {
        Ok(DetectionOutcome::Boxes(report.detections))
    }
}

/// 按出现顺序返回文本中所有可解析的顶层 JSON 对象。
fn top_level_objects(text: &str) -> Vec<Value> {
    let mut objects = Vec::new();
    let mut consumed_until = 0usize;

    for (start, _) in text.match_indices('{') {
        if start < consumed_until {
            continue;
        }
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            consumed_until = start + stream.byte_offset();
            objects.push(value);
        }
    }

    objects
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = text.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detector_json() {
        let stdout = r#"{"width": 640, "height": 480, "detections": [{"x": 10, "y": 20, "w": 30, "h": 40, "conf": 0.91, "cls": 0}]}"#;
        let outcome = parse_detector_output(stdout).expect("parse");
        assert_eq!(
            outcome,
            DetectionOutcome::Boxes(vec![DetectionBox { x: 10, y: 20, w: 30, h: 40 }])
        );
    }

    #[test]
    fn tolerates_preceding_diagnostics_and_takes_last_object() {
        let stdout = "Loading model {weights}...\n\
            {\"detections\": [{\"x\": 1, \"y\": 1, \"w\": 1, \"h\": 1}]}\n\
            warming up\n\
            {\"detections\": [{\"x\": 5, \"y\": 6, \"w\": 7, \"h\": 8}]}\n";
        let outcome = parse_detector_output(stdout).expect("parse");
        assert_eq!(
            outcome,
            DetectionOutcome::Boxes(vec![DetectionBox { x: 5, y: 6, w: 7, h: 8 }])
        );
    }

    #[test]
    fn braces_inside_strings_do_not_split_objects() {
        let stdout = r#"{"note": "a } inside", "detections": []}"#;
        assert_eq!(parse_detector_output(stdout).expect("parse"), DetectionOutcome::NoBoxes);
    }

    #[test]
    fn unbalanced_brace_in_leading_diagnostics_is_skipped() {
        let stdout = "WARNING: format string {conf missing\n\
            {\"detections\": [{\"x\":1,\"y\":2,\"w\":3,\"h\":4}]}\n";
        assert_eq!(
            parse_detector_output(stdout).expect("parse"),
            DetectionOutcome::Boxes(vec![DetectionBox { x: 1, y: 2, w: 3, h: 4 }])
        );
    }

    #[test]
    fn stray_text_between_objects_does_not_hide_the_result() {
        let stdout = "{\"progress\": 1}\n\
            note: unmatched \"quote and { brace\n\
            {\"detections\": [{\"x\":9,\"y\":8,\"w\":7,\"h\":6}]}\n";
        assert_eq!(
            parse_detector_output(stdout).expect("parse"),
            DetectionOutcome::Boxes(vec![DetectionBox { x: 9, y: 8, w: 7, h: 6 }])
        );
    }

    #[test]
    fn nested_box_objects_are_not_mistaken_for_the_result() {
        let stdout = r#"{"detections": [{"x": 1, "y": 1, "w": 2, "h": 2}, {"x": 3, "y": 3, "w": 4, "h": 4}]}"#;
        assert_eq!(parse_detector_output(stdout).expect("parse").boxes().len(), 2);
    }

    #[test]
    fn empty_detections_is_no_boxes() {
        let stdout = r#"{"width": 1, "height": 1, "detections": []}"#;
        assert_eq!(parse_detector_output(stdout).expect("parse"), DetectionOutcome::NoBoxes);
    }

    #[test]
    fn no_json_is_parse_error() {
        let err = parse_detector_output("Traceback: something broke").expect_err("no json");
        assert!(matches!(err, DetectionError::Parse(_)));

        let err = parse_detector_output("{\"detections\": [").expect_err("truncated");
        assert!(matches!(err, DetectionError::Parse(_)));
    }

    #[test]
    fn missing_fields_is_failure() {
        let err = parse_detector_output(r#"{"width": 10}"#).expect_err("missing detections");
        assert!(matches!(err, DetectionError::Failure { .. }));

        let err = parse_detector_output(r#"{"detections": [{"x": 1, "y": 2}]}"#)
            .expect_err("missing box fields");
        assert!(matches!(err, DetectionError::Failure { .. }));
    }
}
