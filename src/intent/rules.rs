//! 规则表：类别判定与槽位填充
//!
//! 全部是有序数据：类别表按顺序匹配，第一个命中的类别胜出；槽位表同理，都不命中时取默认值。
//! 关键词按子串匹配小写后的查询。

use serde::Serialize;
use serde_json::{json, Map, Value};

/// 类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ProjectCreation,
    Verification,
    FileOperation,
    Navigation,
    ResultsQuery,
    Help,
}

/// 槽位取值组：任一关键词命中即取 value
#[derive(Debug)]
pub struct SlotGroup {
    pub value: &'static str,
    pub keywords: &'static [&'static str],
}

/// 有序槽位表 + 默认值
#[derive(Debug)]
pub struct SlotTable {
    pub name: &'static str,
    pub groups: &'static [SlotGroup],
    pub default: &'static str,
}

impl SlotTable {
    pub fn detect(&self, lowered: &str) -> &'static str {
        self.groups
            .iter()
            .find(|g| g.keywords.iter().any(|k| lowered.contains(k)))
            .map(|g| g.value)
            .unwrap_or(self.default)
    }
}

pub const VERIFICATION_KINDS: SlotTable = SlotTable {
    name: "verificationType",
    groups: &[
        SlotGroup {
            value: "formal",
            keywords: &["formal", "property", "assertion", "model check"],
        },
        SlotGroup {
            value: "equivalence",
            keywords: &["equivalence", "equivalent", "equiv"],
        },
        SlotGroup {
            value: "power",
            keywords: &["power", "leakage"],
        },
        SlotGroup {
            value: "security",
            keywords: &["security", "secure", "trojan", "vulnerab"],
        },
        SlotGroup {
            value: "fpga",
            keywords: &["fpga", "bitstream"],
        },
    ],
    default: "formal",
};

pub const FILE_TYPES: SlotTable = SlotTable {
    name: "fileType",
    groups: &[
        SlotGroup {
            value: "systemverilog",
            keywords: &["systemverilog", "system verilog", ".sv"],
        },
        SlotGroup {
            value: "vhdl",
            keywords: &["vhdl", ".vhd"],
        },
        SlotGroup {
            value: "verilog",
            keywords: &["verilog", ".v"],
        },
        SlotGroup {
            value: "constraints",
            keywords: &["constraint", ".sdc", ".xdc"],
        },
    ],
    default: "verilog",
};

pub const NAVIGATION_TARGETS: SlotTable = SlotTable {
    name: "target",
    groups: &[
        SlotGroup {
            value: "projects",
            keywords: &["project"],
        },
        SlotGroup {
            value: "verification",
            keywords: &["verification", "verify"],
        },
        SlotGroup {
            value: "results",
            keywords: &["result", "report"],
        },
        SlotGroup {
            value: "settings",
            keywords: &["setting", "preference", "account"],
        },
        SlotGroup {
            value: "home",
            keywords: &["home", "dashboard", "main page"],
        },
    ],
    default: "home",
};

/// 槽位填充结果
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub text: String,
    pub parameters: Map<String, Value>,
}

/// 类别规则：关键词判定 + 目标操作 + 槽位填充
pub struct CategoryRule {
    pub category: Category,
    pub keywords: &'static [&'static str],
    pub operation: &'static str,
    /// (小写查询, 原始查询) → 解释与参数
    pub fill: fn(&str, &str) -> Interpretation,
}

impl CategoryRule {
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::ProjectCreation,
        keywords: &["create", "new project", "start a project", "set up a project", "setup project"],
        operation: "project",
        fill: fill_project,
    },
    CategoryRule {
        category: Category::Verification,
        keywords: &["verif", "prove", "formal check", "run check", "equivalence", "lint"],
        operation: "run_verification",
        fill: fill_verification,
    },
    CategoryRule {
        category: Category::FileOperation,
        keywords: &["upload", "import", "attach", "add file", "file"],
        operation: "upload_file",
        fill: fill_file,
    },
    CategoryRule {
        category: Category::Navigation,
        keywords: &["go to", "navigate", "open", "take me", "show me", "switch to"],
        operation: "navigate",
        fill: fill_navigation,
    },
    CategoryRule {
        category: Category::ResultsQuery,
        keywords: &["result", "report", "violation", "status", "passed", "failed", "how did"],
        operation: "get_results",
        fill: fill_results,
    },
    CategoryRule {
        category: Category::Help,
        keywords: &["help", "how do i", "how to", "what can", "guide", "tutorial"],
        operation: "help",
        fill: fill_help,
    },
];

/// 第一个命中的类别规则
pub fn classify(lowered: &str) -> Option<&'static CategoryRule> {
    CATEGORY_RULES.iter().find(|rule| rule.matches(lowered))
}

/// 第一段双引号内的文本（项目名）
fn quoted(original: &str) -> Option<String> {
    let inner = original.split('"').nth(1)?.trim();
    (!inner.is_empty() && original.matches('"').count() >= 2).then(|| inner.to_string())
}

const HDL_EXTENSIONS: &[&str] = &[".v", ".sv", ".vh", ".svh", ".vhd", ".vhdl", ".sdc", ".xdc"];

/// 第一个看起来像设计文件的词
fn file_path_token(original: &str) -> Option<String> {
    original
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')' | '"' | '\'')))
        .find(|w| {
            let lower = w.to_lowercase();
            w.len() > 2 && HDL_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        })
        .map(str::to_string)
}

fn params(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn fill_project(lowered: &str, original: &str) -> Interpretation {
    let kind = VERIFICATION_KINDS.detect(lowered);
    let mut parameters = params(&[("action", json!("create")), ("projectType", json!(kind))]);
    if let Some(name) = quoted(original) {
        parameters.insert("name".to_string(), json!(name));
    }
    Interpretation {
        text: format!("Create a new {} verification project", kind),
        parameters,
    }
}

fn fill_verification(lowered: &str, _original: &str) -> Interpretation {
    let kind = VERIFICATION_KINDS.detect(lowered);
    Interpretation {
        text: format!("Run {} verification", kind),
        parameters: params(&[("verificationType", json!(kind))]),
    }
}

fn fill_file(lowered: &str, original: &str) -> Interpretation {
    let file_type = FILE_TYPES.detect(lowered);
    let mut parameters = params(&[("fileType", json!(file_type))]);
    if let Some(path) = file_path_token(original) {
        parameters.insert("filePath".to_string(), json!(path));
    }
    Interpretation {
        text: format!("Upload a {} file", file_type),
        parameters,
    }
}

fn fill_navigation(lowered: &str, _original: &str) -> Interpretation {
    let target = NAVIGATION_TARGETS.detect(lowered);
    Interpretation {
        text: format!("Navigate to {}", target),
        parameters: params(&[("target", json!(target))]),
    }
}

fn fill_results(_lowered: &str, _original: &str) -> Interpretation {
    Interpretation {
        text: "Show the latest verification results".to_string(),
        parameters: Map::new(),
    }
}

fn fill_help(_lowered: &str, _original: &str) -> Interpretation {
    Interpretation {
        text: "Explain the available operations: project, navigate, upload_file, run_verification, get_results"
            .to_string(),
        parameters: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_rule_classifies_its_own_keywords() {
        for rule in CATEGORY_RULES {
            for kw in rule.keywords {
                let hit = classify(kw).expect("keyword must classify");
                // 更靠前的规则可能也包含这个关键词，顺序决定结果
                let first = CATEGORY_RULES.iter().position(|r| r.matches(kw)).unwrap();
                assert_eq!(hit.category, CATEGORY_RULES[first].category);
            }
        }
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let order: Vec<Category> = CATEGORY_RULES.iter().map(|r| r.category).collect();
        assert_eq!(
            order,
            vec![
                Category::ProjectCreation,
                Category::Verification,
                Category::FileOperation,
                Category::Navigation,
                Category::ResultsQuery,
                Category::Help,
            ]
        );
    }

    #[test]
    fn test_expected_outcomes() {
        let cases = [
            ("create a block for the alu", Category::ProjectCreation, "project"),
            ("please prove the fifo never overflows", Category::Verification, "run_verification"),
            ("import the netlist", Category::FileOperation, "upload_file"),
            ("take me somewhere", Category::Navigation, "navigate"),
            ("any violations yet", Category::ResultsQuery, "get_results"),
            ("what can you do", Category::Help, "help"),
        ];
        for (query, category, operation) in cases {
            let rule = classify(query).unwrap();
            assert_eq!(rule.category, category, "{query}");
            assert_eq!(rule.operation, operation, "{query}");
        }
        assert!(classify("bake me a cake").is_none());
    }

    #[test]
    fn test_slot_defaults_and_order() {
        assert_eq!(VERIFICATION_KINDS.detect("check my design"), "formal");
        assert_eq!(VERIFICATION_KINDS.detect("low power and security"), "power");
        assert_eq!(FILE_TYPES.detect("my systemverilog files"), "systemverilog");
        assert_eq!(FILE_TYPES.detect("a source"), "verilog");
        assert_eq!(FILE_TYPES.detect("the vhdl entity"), "vhdl");
        assert_eq!(NAVIGATION_TARGETS.detect("somewhere"), "home");
        assert_eq!(NAVIGATION_TARGETS.detect("the settings page"), "settings");
    }

    #[test]
    fn test_project_name_from_quotes() {
        let i = fill_project("create \"riscv core\" for security", "create \"RISCV core\" for security");
        assert_eq!(i.parameters["name"], "RISCV core");
        assert_eq!(i.parameters["projectType"], "security");
    }

    #[test]
    fn test_file_path_token() {
        assert_eq!(file_path_token("upload rtl/alu.v, please"), Some("rtl/alu.v".to_string()));
        assert_eq!(file_path_token("upload \"top.SV\""), Some("top.SV".to_string()));
        assert_eq!(file_path_token("upload my code"), None);
    }
}
