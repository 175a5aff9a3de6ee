//! 示例语料：自然语言查询 → 操作 + 参数
//!
//! 语料构造后不可变；插入顺序参与平分时的取舍（先出现者胜）。

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 一条示例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub query: String,
    pub interpretation: String,
    pub operation: String,
    #[serde(default)]
    pub parameters: Value,
}

impl Example {
    pub fn new(query: &str, interpretation: &str, operation: &str, parameters: Value) -> Self {
        Self {
            query: query.to_string(),
            interpretation: interpretation.to_string(),
            operation: operation.to_string(),
            parameters,
        }
    }
}

/// 小写 + 空白切分后的词集合
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// 有序、不可变的示例集合，词集合在构造时预先计算
#[derive(Debug, Clone)]
pub struct Corpus {
    entries: Vec<(Example, HashSet<String>)>,
}

impl Corpus {
    pub fn new(examples: Vec<Example>) -> Self {
        let entries = examples
            .into_iter()
            .map(|e| {
                let tokens = tokenize(&e.query);
                (e, tokens)
            })
            .collect();
        Self { entries }
    }

    /// 从 JSON 数组文件加载（字段同 [`Example`]）
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read corpus {}", path.display()))?;
        let examples: Vec<Example> =
            serde_json::from_str(&raw).with_context(|| format!("parse corpus {}", path.display()))?;
        Ok(Self::new(examples))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn examples(&self) -> impl Iterator<Item = &Example> {
        self.entries.iter().map(|(e, _)| e)
    }

    pub(crate) fn entries(&self) -> &[(Example, HashSet<String>)] {
        &self.entries
    }

    /// 内置语料
    pub fn builtin() -> Self {
        Self::new(vec![
            Example::new(
                "I want to create a new formal verification project for my CPU design",
                "Create a new project configured for formal verification",
                "project",
                json!({"action": "create", "projectType": "formal"}),
            ),
            Example::new(
                "Create an equivalence checking project",
                "Create a new project configured for equivalence checking",
                "project",
                json!({"action": "create", "projectType": "equivalence"}),
            ),
            Example::new(
                "Set up a new power analysis project",
                "Create a new project configured for power analysis",
                "project",
                json!({"action": "create", "projectType": "power"}),
            ),
            Example::new(
                "Show me all my projects",
                "List the projects in the workspace",
                "project",
                json!({"action": "list"}),
            ),
            Example::new(
                "Open my existing project",
                "Open a project by id",
                "project",
                json!({"action": "open"}),
            ),
            Example::new(
                "Upload my Verilog files to the project",
                "Upload Verilog source files to the current project",
                "upload_file",
                json!({"fileType": "verilog"}),
            ),
            Example::new(
                "Add a SystemVerilog testbench file",
                "Upload a SystemVerilog file to the current project",
                "upload_file",
                json!({"fileType": "systemverilog"}),
            ),
            Example::new(
                "Upload the timing constraints file",
                "Upload a constraints file to the current project",
                "upload_file",
                json!({"fileType": "constraints"}),
            ),
            Example::new(
                "Run formal verification on my design",
                "Run a formal verification on the current project",
                "run_verification",
                json!({"verificationType": "formal"}),
            ),
            Example::new(
                "Check if my two designs are equivalent",
                "Run an equivalence check on the current project",
                "run_verification",
                json!({"verificationType": "equivalence"}),
            ),
            Example::new(
                "Analyze the power consumption of my chip",
                "Run a power verification on the current project",
                "run_verification",
                json!({"verificationType": "power"}),
            ),
            Example::new(
                "Run a security check for hardware trojans",
                "Run a security verification on the current project",
                "run_verification",
                json!({"verificationType": "security"}),
            ),
            Example::new(
                "Verify my FPGA design",
                "Run an FPGA verification on the current project",
                "run_verification",
                json!({"verificationType": "fpga"}),
            ),
            Example::new(
                "Show me the verification results",
                "Read the latest verification results",
                "get_results",
                json!({}),
            ),
            Example::new(
                "Did my verification pass",
                "Read the latest verification results",
                "get_results",
                json!({}),
            ),
            Example::new(
                "Go to the dashboard",
                "Navigate to the home page",
                "navigate",
                json!({"target": "home"}),
            ),
            Example::new(
                "Take me to the project list",
                "Navigate to the project list",
                "navigate",
                json!({"target": "projects"}),
            ),
            Example::new(
                "Open the account settings",
                "Navigate to the settings page",
                "navigate",
                json!({"target": "settings"}),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_dedups() {
        let t = tokenize("Run  run RUN formal\tcheck");
        assert_eq!(t.len(), 3);
        assert!(t.contains("run"));
        assert!(t.contains("formal"));
    }

    #[test]
    fn test_builtin_contains_reference_example() {
        let corpus = Corpus::builtin();
        let first = corpus.examples().next().unwrap();
        assert_eq!(first.operation, "project");
        assert_eq!(first.parameters["projectType"], "formal");
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(
            &path,
            r#"[{"query": "run lint", "interpretation": "Lint", "operation": "run_verification",
                 "parameters": {"verificationType": "formal"}}]"#,
        )
        .unwrap();
        let corpus = Corpus::from_json_file(&path).unwrap();
        assert_eq!(corpus.len(), 1);
        assert!(Corpus::from_json_file(&dir.path().join("missing.json")).is_err());
    }
}
