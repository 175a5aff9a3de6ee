//! 验证运行的参数与结果类型

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 验证类型（也用作项目类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerificationKind {
    Formal,
    Equivalence,
    Power,
    Security,
    Fpga,
}

impl VerificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationKind::Formal => "formal",
            VerificationKind::Equivalence => "equivalence",
            VerificationKind::Power => "power",
            VerificationKind::Security => "security",
            VerificationKind::Fpga => "fpga",
        }
    }
}

/// 可选运行参数；timeout 缺省取 [verification] default_timeout_secs（300）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOptions {
    /// 等待完成的上限（秒）
    #[schemars(range(min = 1))]
    pub timeout: Option<u64>,
    /// 有界证明深度
    pub depth: Option<u32>,
    /// 只检查这些属性
    pub properties: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

impl Severity {
    /// 未知取值按 error 处理
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "warning" | "warn" => Severity::Warning,
            "info" | "information" | "note" => Severity::Info,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_checks: u64,
    pub passed: u64,
    pub failed: u64,
    pub warnings: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VerificationResult {
    pub passed: bool,
    pub violations: Vec<Violation>,
    pub statistics: Statistics,
}
