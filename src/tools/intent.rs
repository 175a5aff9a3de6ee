//! resolve_intent 操作：自由文本 → 建议的操作（只建议，不执行）

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::OpError;
use crate::intent::IntentResolver;
use crate::tools::{FnTool, Tool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResolveIntentArgs {
    /// 自然语言请求
    pub query: String,
    /// 可选上下文，例如 {"currentProject": "p1"}
    pub context: Option<Value>,
}

pub fn tool(resolver: Arc<IntentResolver>) -> impl Tool {
    FnTool::new(
        "resolve_intent",
        "Map a natural-language request to a suggested operation and parameters. Never executes anything.",
        move |args: ResolveIntentArgs| {
            let resolver = resolver.clone();
            async move { Ok::<_, OpError>(resolver.resolve(&args.query, args.context.as_ref()).to_value()) }
        },
    )
}
