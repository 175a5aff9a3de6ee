//! 操作分发
//!
//! invoke(name, args)：查找 → schema 校验 → 执行 → 把任何失败（包括 panic）折叠为 OperationResult。
//! 未知操作名是分发层错误，不进入 OperationResult。每次调用输出结构化审计日志（JSON）。

use std::time::Instant;

use serde_json::{json, Value};

use crate::core::{DispatchError, OperationResult};
use crate::tools::registry::ToolDescriptor;
use crate::tools::{Tool, ToolRegistry};

/// 审计日志中需要打码的参数名
const REDACTED_KEYS: &[&str] = &["password"];

/// 操作执行器：持有注册表（注册完成后不可变）
pub struct ToolExecutor {
    registry: ToolRegistry,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// 调用指定操作；只有未知操作名会返回 Err
    pub async fn invoke(&self, name: &str, args: Value) -> Result<OperationResult, DispatchError> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| DispatchError::UnknownOperation(name.to_string()))?;

        let start = Instant::now();
        let args = if args.is_null() { json!({}) } else { args };
        let preview = args_preview(&args);

        let (outcome, result) = match tool.validate(&args) {
            Err(e) => ("invalid", OperationResult::fail(e.to_string())),
            Ok(()) => {
                // 独立任务执行：handler 内的 panic 也被折叠为失败
                let handle = tokio::spawn(async move { tool.execute(args).await });
                match handle.await {
                    Ok(Ok(data)) => ("ok", OperationResult::ok(data)),
                    Ok(Err(e)) => ("error", OperationResult::fail(e.to_string())),
                    Err(e) => ("error", OperationResult::fail(format!("Operation aborted: {}", e))),
                }
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = json!({
            "event": "tool_audit",
            "tool": name,
            "ok": result.is_success(),
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        Ok(result.with_metadata(json!({
            "operation": name,
            "durationMs": duration_ms,
        })))
    }

    pub fn get_tool(&self, name: &str) -> Option<std::sync::Arc<dyn Tool>> {
        self.registry.get(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors()
    }
}

fn args_preview(args: &Value) -> String {
    let mut shown = args.clone();
    if let Some(obj) = shown.as_object_mut() {
        for key in REDACTED_KEYS {
            if let Some(v) = obj.get_mut(*key) {
                *v = Value::String("***".to_string());
            }
        }
    }
    let s = shown.to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OpError;
    use crate::tools::FnTool;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct EchoArgs {
        text: String,
    }

    fn executor() -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(FnTool::new("echo", "Echo text", |args: EchoArgs| async move {
            Ok::<Value, OpError>(json!({ "text": args.text }))
        }));
        registry.register(FnTool::new("fail", "Always fails", |_: EchoArgs| async move {
            Err::<Value, _>(OpError::ElementNotFound("#nothing".to_string()))
        }));
        registry.register(FnTool::new("boom", "Panics", |_: EchoArgs| async move {
            if true {
                panic!("handler bug");
            }
            Ok::<Value, OpError>(Value::Null)
        }));
        ToolExecutor::new(registry)
    }

    #[tokio::test]
    async fn test_unknown_operation_is_dispatch_error() {
        let err = executor().invoke("nope", json!({})).await.unwrap_err();
        assert_eq!(err, DispatchError::UnknownOperation("nope".to_string()));
    }

    #[tokio::test]
    async fn test_success_carries_data() {
        let r = executor().invoke("echo", json!({"text": "hi"})).await.unwrap();
        assert!(r.is_success());
        assert_eq!(r.data(), Some(&json!({"text": "hi"})));
        assert_eq!(r.metadata().unwrap()["operation"], "echo");
    }

    #[tokio::test]
    async fn test_validation_failure_skips_handler() {
        let r = executor().invoke("boom", Value::Null).await.unwrap();
        assert!(!r.is_success());
        assert!(r.error().unwrap().starts_with("Invalid arguments:"));
        assert!(r.error().unwrap().contains("text"));
    }

    #[tokio::test]
    async fn test_handler_error_folded() {
        let r = executor().invoke("fail", json!({"text": "x"})).await.unwrap();
        assert!(!r.is_success());
        assert_eq!(r.error(), Some("Element not found: #nothing"));
        assert!(r.data().is_none());
    }

    #[tokio::test]
    async fn test_handler_panic_folded() {
        let r = executor().invoke("boom", json!({"text": "x"})).await.unwrap();
        assert!(!r.is_success());
        assert!(r.error().unwrap().starts_with("Operation aborted"));
    }

    #[test]
    fn test_password_redacted_in_preview() {
        let p = args_preview(&json!({"username": "alice", "password": "hunter2"}));
        assert!(!p.contains("hunter2"));
        assert!(p.contains("alice"));
    }
}
