//! 意图解析：自由文本 → 建议的操作与参数
//!
//! 两级匹配，只给建议，从不执行：
//! 1. 示例相似度：词集合交集 / 较大集合的大小，最高分胜出（并列取语料中靠前者），分数 > 0.5 才采纳
//! 2. 规则表：按顺序判定类别，再用槽位表填充参数
//!
//! 都不命中时返回回退提示，附带前 N 条示例查询。

mod corpus;
pub mod rules;

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

pub use corpus::{tokenize, Corpus, Example};
pub use rules::{classify, Category, CategoryRule, SlotGroup, SlotTable, CATEGORY_RULES};

/// 示例相似度的采纳阈值（严格大于）
pub const SIMILARITY_THRESHOLD: f64 = 0.5;

/// 接受上下文 projectId 的操作
const PROJECT_SCOPED: &[&str] = &["run_verification", "upload_file", "get_results"];

/// 两个词集合的相似度；都为空时为 0
pub fn similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let denom = a.len().max(b.len());
    if denom == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / denom as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Example,
    Category,
}

/// 解析结果；对外形状见 [`IntentResolution::to_value`]
#[derive(Debug, Clone, PartialEq)]
pub enum IntentResolution {
    Suggestion {
        query: String,
        interpretation: String,
        operation: String,
        parameters: Map<String, Value>,
        confidence: Option<f64>,
        method: MatchMethod,
        category: Option<Category>,
    },
    Fallback {
        query: String,
        message: String,
        examples: Vec<String>,
    },
}

impl IntentResolution {
    pub fn operation(&self) -> Option<&str> {
        match self {
            IntentResolution::Suggestion { operation, .. } => Some(operation),
            IntentResolution::Fallback { .. } => None,
        }
    }

    /// `{"kind": "suggestion" | "fallback", ...}`；confidence / category 缺失时省略
    pub fn to_value(&self) -> Value {
        match self {
            IntentResolution::Suggestion {
                query,
                interpretation,
                operation,
                parameters,
                confidence,
                method,
                category,
            } => {
                let mut out = json!({
                    "kind": "suggestion",
                    "query": query,
                    "interpretation": interpretation,
                    "operation": operation,
                    "parameters": parameters,
                    "method": method,
                });
                if let Some(score) = confidence {
                    out["confidence"] = json!(score);
                }
                if let Some(category) = category {
                    out["category"] = json!(category);
                }
                out
            }
            IntentResolution::Fallback {
                query,
                message,
                examples,
            } => json!({
                "kind": "fallback",
                "query": query,
                "message": message,
                "examples": examples,
            }),
        }
    }

    pub fn parameters(&self) -> Option<&Map<String, Value>> {
        match self {
            IntentResolution::Suggestion { parameters, .. } => Some(parameters),
            IntentResolution::Fallback { .. } => None,
        }
    }
}

pub struct IntentResolver {
    corpus: Arc<Corpus>,
    fallback_examples: usize,
}

impl IntentResolver {
    pub fn new(corpus: Arc<Corpus>, fallback_examples: usize) -> Self {
        Self {
            corpus,
            fallback_examples,
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn resolve(&self, query: &str, context: Option<&Value>) -> IntentResolution {
        let query = query.trim();
        let mut resolution = self
            .best_example(query)
            .or_else(|| self.by_category(query))
            .unwrap_or_else(|| self.fallback(query));

        if let IntentResolution::Suggestion {
            operation, parameters, ..
        } = &mut resolution
        {
            if PROJECT_SCOPED.contains(&operation.as_str()) && !parameters.contains_key("projectId") {
                if let Some(id) = context_project(context) {
                    parameters.insert("projectId".to_string(), Value::String(id));
                }
            }
        }

        tracing::debug!(query, operation = ?resolution.operation(), "intent resolved");
        resolution
    }

    fn best_example(&self, query: &str) -> Option<IntentResolution> {
        let tokens = tokenize(query);
        let mut best: Option<(&Example, f64)> = None;
        for (example, example_tokens) in self.corpus.entries() {
            let score = similarity(&tokens, example_tokens);
            // 严格大于：并列时保留先出现的
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((example, score));
            }
        }

        let (example, score) = best.filter(|(_, s)| *s > SIMILARITY_THRESHOLD)?;
        let parameters = match &example.parameters {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        Some(IntentResolution::Suggestion {
            query: query.to_string(),
            interpretation: example.interpretation.clone(),
            operation: example.operation.clone(),
            parameters,
            confidence: Some(score),
            method: MatchMethod::Example,
            category: None,
        })
    }

    fn by_category(&self, query: &str) -> Option<IntentResolution> {
        let lowered = query.to_lowercase();
        let rule = classify(&lowered)?;
        let filled = (rule.fill)(&lowered, query);
        Some(IntentResolution::Suggestion {
            query: query.to_string(),
            interpretation: filled.text,
            operation: rule.operation.to_string(),
            parameters: filled.parameters,
            confidence: None,
            method: MatchMethod::Category,
            category: Some(rule.category),
        })
    }

    fn fallback(&self, query: &str) -> IntentResolution {
        IntentResolution::Fallback {
            query: query.to_string(),
            message: "I couldn't map that request to an operation. Try phrasing it like one of these examples."
                .to_string(),
            examples: self
                .corpus
                .examples()
                .take(self.fallback_examples)
                .map(|e| e.query.clone())
                .collect(),
        }
    }
}

fn context_project(context: Option<&Value>) -> Option<String> {
    let ctx = context?.as_object()?;
    ["projectId", "currentProject"]
        .iter()
        .filter_map(|key| ctx.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver() -> IntentResolver {
        IntentResolver::new(Arc::new(Corpus::builtin()), 5)
    }

    #[test]
    fn test_similarity_bounds() {
        let empty = HashSet::new();
        assert_eq!(similarity(&empty, &empty), 0.0);
        let a = tokenize("run formal check");
        assert_eq!(similarity(&a, &a), 1.0);
        assert_eq!(similarity(&a, &tokenize("run lint")), 1.0 / 3.0);
    }

    #[test]
    fn test_exact_corpus_query() {
        let query = "I want to create a new formal verification project for my CPU design";
        match resolver().resolve(query, None) {
            IntentResolution::Suggestion {
                operation,
                parameters,
                confidence,
                method,
                ..
            } => {
                assert_eq!(operation, "project");
                assert_eq!(parameters["action"], "create");
                assert_eq!(parameters["projectType"], "formal");
                assert_eq!(confidence, Some(1.0));
                assert_eq!(method, MatchMethod::Example);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_upload_verilog_classifies_as_file_operation() {
        match resolver().resolve("could you upload verilog code for the adder", None) {
            IntentResolution::Suggestion {
                operation,
                parameters,
                method,
                category,
                ..
            } => {
                assert_eq!(method, MatchMethod::Category);
                assert_eq!(category, Some(Category::FileOperation));
                assert_eq!(operation, "upload_file");
                assert_eq!(parameters["fileType"], "verilog");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_suggestion_shape() {
        let r = resolver();
        let by_example = r
            .resolve("I want to create a new formal verification project for my CPU design", None)
            .to_value();
        assert_eq!(by_example["kind"], "suggestion");
        assert_eq!(by_example["method"], "example");
        assert_eq!(by_example["confidence"], 1.0);
        assert!(by_example.get("category").is_none());

        let by_category = r.resolve("please prove the fifo never overflows", None).to_value();
        assert_eq!(by_category["method"], "category");
        assert_eq!(by_category["category"], "verification");
        assert!(by_category.get("confidence").is_none());
    }

    #[test]
    fn test_threshold_is_strict() {
        // 4 个词中命中 2 个：0.5 不被采纳
        let corpus = Corpus::new(vec![Example::new("alpha beta gamma delta", "x", "navigate", json!({}))]);
        let r = IntentResolver::new(Arc::new(corpus), 5);
        assert!(matches!(
            r.resolve("alpha beta zeta eta", None),
            IntentResolution::Fallback { .. }
        ));
        assert!(matches!(
            r.resolve("alpha beta gamma eta", None),
            IntentResolution::Suggestion { .. }
        ));
    }

    #[test]
    fn test_tie_goes_to_first_example() {
        let corpus = Corpus::new(vec![
            Example::new("zig zag one", "first", "navigate", json!({"target": "home"})),
            Example::new("zig zag two", "second", "navigate", json!({"target": "settings"})),
        ]);
        let r = IntentResolver::new(Arc::new(corpus), 5);
        match r.resolve("zig zag", None) {
            IntentResolution::Suggestion { interpretation, .. } => assert_eq!(interpretation, "first"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_fallback_lists_first_examples() {
        let r = IntentResolver::new(Arc::new(Corpus::builtin()), 3);
        match r.resolve("bake me a cake", None) {
            IntentResolution::Fallback { examples, message, .. } => {
                assert_eq!(examples.len(), 3);
                assert_eq!(
                    examples[0],
                    "I want to create a new formal verification project for my CPU design"
                );
                assert!(!message.is_empty());
            }
            other => panic!("unexpected: {other:?}"),
        }
        let data = r.resolve("bake me a cake", None).to_value();
        assert_eq!(data["kind"], "fallback");
        assert_eq!(data["examples"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_context_fills_project_id() {
        let r = resolver();
        let ctx = json!({"currentProject": "p9"});
        let params = r.resolve("how did the latest violations look", Some(&ctx));
        assert_eq!(params.operation(), Some("get_results"));
        assert_eq!(params.parameters().unwrap()["projectId"], "p9");

        // 导航不接受上下文项目
        let nav = r.resolve("take me somewhere else", Some(&json!({"projectId": "p9"})));
        assert_eq!(nav.operation(), Some("navigate"));
        assert!(!nav.parameters().unwrap().contains_key("projectId"));
    }

    #[test]
    fn test_deterministic() {
        let r = resolver();
        for query in [
            "please verify the security of my chip",
            "Upload the timing constraints file",
            "nothing relevant here",
            "",
        ] {
            assert_eq!(r.resolve(query, None), r.resolve(query, None));
        }
    }

    #[test]
    fn test_every_category_reachable_through_resolver() {
        let r = IntentResolver::new(Arc::new(Corpus::new(Vec::new())), 5);
        for rule in CATEGORY_RULES {
            let query = format!("zz {} zz", rule.keywords[0]);
            let resolution = r.resolve(&query, None);
            let expected = classify(&query.to_lowercase()).map(|c| c.operation);
            assert_eq!(resolution.operation(), expected, "{query}");
        }
    }
}
