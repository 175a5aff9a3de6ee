//! 工具注册表
//!
//! 所有操作实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找；
//! ToolExecutor 在调用时先按 schema 校验，再执行并把失败折叠为 OperationResult。
//! 大多数操作是普通 async 函数，用 [`FnTool`] 包一层即可注册。

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::OpError;
use crate::tools::schema;

/// 操作 trait：名称、描述、参数 schema、异步执行（args 已通过 schema 校验）
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认接受任意对象
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 按参数 schema 校验；默认每次编译 parameters_schema()
    fn validate(&self, args: &Value) -> Result<(), OpError> {
        schema::validate(&self.parameters_schema(), args)
    }

    async fn execute(&self, args: Value) -> Result<Value, OpError>;
}

/// 把「类型化参数 → async 结果」的函数包装成 Tool；schema 由 schemars 从参数类型生成，注册时编译一次
pub struct FnTool<A, F> {
    name: String,
    description: String,
    schema: Value,
    validator: Result<jsonschema::Validator, String>,
    handler: F,
    _args: PhantomData<fn() -> A>,
}

impl<A, F, Fut> FnTool<A, F>
where
    A: DeserializeOwned + JsonSchema,
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<Value, OpError>>,
{
    pub fn new(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self {
        let name = name.into();
        let schema = schema::schema_of::<A>();
        let validator = jsonschema::validator_for(&schema).map_err(|e| {
            tracing::error!(tool = %name, error = %e, "parameter schema does not compile");
            format!("invalid schema: {}", e)
        });
        Self {
            name,
            description: description.into(),
            schema,
            validator,
            handler,
            _args: PhantomData,
        }
    }
}

#[async_trait]
impl<A, F, Fut> Tool for FnTool<A, F>
where
    A: DeserializeOwned + JsonSchema + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, OpError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    fn validate(&self, args: &Value) -> Result<(), OpError> {
        match &self.validator {
            Ok(validator) => schema::check(validator, args),
            Err(message) => Err(OpError::Validation(vec![message.clone()])),
        }
    }

    async fn execute(&self, args: Value) -> Result<Value, OpError> {
        let args: A = schema::narrow(args)?;
        (self.handler)(args).await
    }
}

/// 注册后不可变的操作描述
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 工具注册表：按名称存储 Arc<dyn Tool>
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_some() {
            tracing::warn!(tool = %name, "tool registered twice, keeping the latest");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// 按名称排序，保证输出稳定
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tool_names()
            .into_iter()
            .filter_map(|name| {
                let tool = self.tools.get(&name)?;
                Some(ToolDescriptor {
                    description: tool.description().to_string(),
                    parameters: tool.parameters_schema(),
                    name,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct PingArgs {
        target: String,
    }

    fn ping() -> impl Tool {
        FnTool::new("ping", "echo the target", |args: PingArgs| async move {
            Ok::<Value, OpError>(json!({"pong": args.target}))
        })
    }

    struct Loose;

    #[async_trait]
    impl Tool for Loose {
        fn name(&self) -> &str {
            "loose"
        }

        fn description(&self) -> &str {
            "accepts any object"
        }

        async fn execute(&self, args: Value) -> Result<Value, OpError> {
            Ok(args)
        }
    }

    #[test]
    fn test_fn_tool_validates_with_stored_validator() {
        let tool = ping();
        for _ in 0..3 {
            assert!(tool.validate(&json!({"target": "a"})).is_ok());
        }
        match tool.validate(&json!({"target": 7})) {
            Err(OpError::Validation(messages)) => assert_eq!(messages.len(), 1),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(tool.validate(&json!({})).is_err());
    }

    #[test]
    fn test_default_validate_uses_parameters_schema() {
        assert!(Loose.validate(&json!({"anything": true})).is_ok());
        assert!(Loose.validate(&json!("not an object")).is_err());
    }

    #[tokio::test]
    async fn test_fn_tool_execute_narrows_args() {
        let out = ping().execute(json!({"target": "b"})).await.unwrap();
        assert_eq!(out, json!({"pong": "b"}));
    }

    #[test]
    fn test_descriptors_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Loose);
        registry.register(ping());
        let names: Vec<String> = registry.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["loose", "ping"]);
    }
}
