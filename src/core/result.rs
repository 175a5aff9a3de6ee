//! 统一的操作结果
//!
//! success 与 data / error 的存在互斥且穷尽：字段私有，只能通过 ok / fail 构造。

use serde::Serialize;
use serde_json::Value;

use crate::core::OpError;

/// 一次调用的结果，每次调用新建，不缓存
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
}

impl OperationResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: None,
        }
    }

    /// 空消息会被替换，保证失败时 error 非空
    pub fn fail(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "Operation failed".to_string();
        }
        Self {
            success: false,
            data: None,
            error: Some(message),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    /// 转为传输层的回包：data 序列化为文本，或 error 文本，加 isError 标志
    pub fn into_transport(self) -> TransportReply {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => TransportReply {
                content: serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string()),
                is_error: false,
            },
            (_, _, error) => TransportReply {
                content: error.unwrap_or_else(|| "Operation failed".to_string()),
                is_error: true,
            },
        }
    }
}

impl From<Result<Value, OpError>> for OperationResult {
    fn from(result: Result<Value, OpError>) -> Self {
        match result {
            Ok(data) => OperationResult::ok(data),
            Err(e) => OperationResult::fail(e.to_string()),
        }
    }
}

/// 传输层回包
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportReply {
    pub content: String,
    pub is_error: bool,
}
