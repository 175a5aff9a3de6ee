//! 从页面状态提取验证结果
//!
//! 宽松解析：任何字段缺失或格式不对都退回默认值，从不返回错误。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::types::{Severity, Statistics, VerificationResult, Violation};
use crate::browser::UiDriver;
use crate::platform::verification::EXTRACT_SCRIPT;

const UNKNOWN_TYPE: &str = "unknown";
const NO_MESSAGE: &str = "No message";

/// 执行提取脚本并解析；脚本失败时返回默认结果（passed=false，统计全 0）
pub async fn extract(driver: &dyn UiDriver) -> VerificationResult {
    match driver.evaluate(EXTRACT_SCRIPT).await {
        Ok(raw) => parse_snapshot(&raw),
        Err(e) => {
            tracing::warn!(error = %e, "result extraction script failed, using defaults");
            VerificationResult::default()
        }
    }
}

/// 解析提取脚本返回的原始快照
pub fn parse_snapshot(raw: &Value) -> VerificationResult {
    let passed = raw.get("passed").and_then(Value::as_bool).unwrap_or(false);

    let violations = raw
        .get("violations")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(parse_violation).collect())
        .unwrap_or_default();

    let stats = raw.get("statistics");
    let field = |name: &str| parse_count(stats.and_then(|s| s.get(name)));
    let statistics = Statistics {
        total_checks: field("totalChecks"),
        passed: field("passed"),
        failed: field("failed"),
        warnings: field("warnings"),
    };

    VerificationResult {
        passed,
        violations,
        statistics,
    }
}

fn text_of(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_violation(v: &Value) -> Violation {
    Violation {
        kind: text_of(v, "type").unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
        message: text_of(v, "message").unwrap_or_else(|| NO_MESSAGE.to_string()),
        location: text_of(v, "location"),
        severity: text_of(v, "severity")
            .map(|s| Severity::parse(&s))
            .unwrap_or_default(),
    }
}

fn digits() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
}

/// 数字直接取；文本取第一段数字（"Total: 42 checks" → 42）；其他情况为 0
pub fn parse_count(v: Option<&Value>) -> u64 {
    match v {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => digits()
            .find(s)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::FakeDriver;
    use serde_json::json;

    #[test]
    fn test_full_snapshot() {
        let raw = json!({
            "passed": false,
            "violations": [
                {"type": "assertion", "message": "  overflow on acc ", "location": "alu.v:42", "severity": "error"},
                {"type": "coverage", "message": "unreachable state", "location": null, "severity": "Warning"}
            ],
            "statistics": {"totalChecks": "Total: 12", "passed": "10 passed", "failed": 1, "warnings": "1"}
        });
        let r = parse_snapshot(&raw);
        assert!(!r.passed);
        assert_eq!(r.violations.len(), 2);
        assert_eq!(r.violations[0].message, "overflow on acc");
        assert_eq!(r.violations[0].location.as_deref(), Some("alu.v:42"));
        assert_eq!(r.violations[1].severity, Severity::Warning);
        assert_eq!(r.violations[1].location, None);
        assert_eq!(
            r.statistics,
            Statistics {
                total_checks: 12,
                passed: 10,
                failed: 1,
                warnings: 1
            }
        );
    }

    #[test]
    fn test_missing_everything_defaults() {
        let r = parse_snapshot(&Value::Null);
        assert!(!r.passed);
        assert!(r.violations.is_empty());
        assert_eq!(r.statistics, Statistics::default());
    }

    #[test]
    fn test_violation_placeholders() {
        let raw = json!({"passed": true, "violations": [{}, {"severity": "catastrophic"}]});
        let r = parse_snapshot(&raw);
        assert!(r.passed);
        assert_eq!(r.violations[0].kind, "unknown");
        assert_eq!(r.violations[0].message, "No message");
        assert_eq!(r.violations[0].severity, Severity::Error);
        assert_eq!(r.violations[1].severity, Severity::Error);
    }

    #[test]
    fn test_parse_count_non_numeric() {
        assert_eq!(parse_count(Some(&json!("n/a"))), 0);
        assert_eq!(parse_count(Some(&json!(-3))), 0);
        assert_eq!(parse_count(Some(&json!(7.9))), 7);
        assert_eq!(parse_count(Some(&json!(true))), 0);
        assert_eq!(parse_count(None), 0);
    }

    #[tokio::test]
    async fn test_extract_without_markers() {
        let driver = FakeDriver::new();
        let r = extract(&driver).await;
        assert_eq!(r, VerificationResult::default());
    }
}
