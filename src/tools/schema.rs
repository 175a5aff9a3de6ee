//! 参数 Schema：schemars 生成，jsonschema 校验，serde 收窄为类型化参数

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::OpError;

/// 参数类型的 JSON Schema
pub fn schema_of<A: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(A)).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// 编译 schema，供重复校验
pub fn compile(schema: &Value) -> Result<jsonschema::Validator, OpError> {
    jsonschema::validator_for(schema).map_err(|e| OpError::Validation(vec![format!("invalid schema: {}", e)]))
}

/// 按 schema 校验原始参数（每次重新编译）
pub fn validate(schema: &Value, args: &Value) -> Result<(), OpError> {
    check(&compile(schema)?, args)
}

/// 用已编译的校验器检查参数；失败时每条违规一条消息
pub fn check(validator: &jsonschema::Validator, args: &Value) -> Result<(), OpError> {
    let messages: Vec<String> = validator.iter_errors(args).map(|e| e.to_string()).collect();
    if messages.is_empty() {
        Ok(())
    } else {
        Err(OpError::Validation(messages))
    }
}

/// 把已校验的 JSON 反序列化为参数类型
pub fn narrow<A: DeserializeOwned>(args: Value) -> Result<A, OpError> {
    serde_json::from_value(args).map_err(|e| OpError::Validation(vec![e.to_string()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[allow(dead_code)]
    #[derive(Debug, Deserialize, JsonSchema)]
    #[serde(rename_all = "camelCase")]
    struct Args {
        project_id: String,
        depth: Option<u32>,
    }

    #[test]
    fn test_valid_args_pass() {
        let schema = schema_of::<Args>();
        assert!(validate(&schema, &json!({"projectId": "p1", "depth": 3})).is_ok());
        let args: Args = narrow(json!({"projectId": "p1"})).unwrap();
        assert_eq!(args.project_id, "p1");
    }

    #[test]
    fn test_every_violation_reported() {
        let schema = schema_of::<Args>();
        let err = validate(&schema, &json!({"depth": "deep"})).unwrap_err();
        match err {
            OpError::Validation(messages) => {
                assert_eq!(messages.len(), 2);
                assert!(messages.iter().any(|m| m.contains("projectId")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_compiled_validator_is_reusable() {
        let validator = compile(&schema_of::<Args>()).unwrap();
        assert!(check(&validator, &json!({"projectId": "p1"})).is_ok());
        assert!(check(&validator, &json!({})).is_err());
        assert!(check(&validator, &json!({"projectId": "p2", "depth": 1})).is_ok());
    }

    #[test]
    fn test_broken_schema_is_a_validation_error() {
        let err = compile(&json!({"type": 12})).unwrap_err();
        match err {
            OpError::Validation(messages) => assert!(messages[0].starts_with("invalid schema")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
