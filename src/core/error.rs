//! 操作错误类型
//!
//! 领域操作、会话与验证编排统一返回 OpError；分发层把它折叠进 OperationResult。
//! DispatchError 只表示分发层自身的错误（未知操作名），经传输层的协议错误通道返回。

use thiserror::Error;

use crate::browser::DriverError;

/// 领域操作中可能出现的错误（参数、认证、句柄、导航、元素、上传、验证）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpError {
    /// 参数不满足声明的 schema；每个元素是一条字段级错误
    #[error("Invalid arguments: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Authentication required: supply username/password or set EDA_USERNAME/EDA_PASSWORD")]
    AuthRequired,

    #[error("Login failed: {0}")]
    AuthFailed(String),

    #[error("Browser session unavailable: {0}")]
    HandleUnavailable(String),

    #[error("Navigation timed out: {0}")]
    NavigationTimeout(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Upload source missing: {0}")]
    UploadSourceMissing(String),

    #[error("Verification did not start within {0}s")]
    VerificationStartTimeout(u64),

    #[error("Verification did not complete within {0}s")]
    VerificationTimeout(u64),

    /// 自动化后端的其他失败（进程崩溃、协议错误等）
    #[error("Browser error: {0}")]
    Driver(String),
}

impl From<DriverError> for OpError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::Timeout(msg) => OpError::NavigationTimeout(msg),
            DriverError::ElementNotFound(sel) => OpError::ElementNotFound(sel),
            DriverError::Backend(msg) => OpError::Driver(msg),
        }
    }
}

/// 分发层错误：不进入 OperationResult，由传输层以协议错误返回
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_joins_fields() {
        let err = OpError::Validation(vec![
            "\"projectId\" is a required property".to_string(),
            "3 is not of type \"string\"".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid arguments: \"projectId\" is a required property; 3 is not of type \"string\""
        );
    }

    #[test]
    fn test_driver_error_mapping() {
        let e: OpError = DriverError::Timeout("https://x".into()).into();
        assert!(matches!(e, OpError::NavigationTimeout(_)));
        let e: OpError = DriverError::ElementNotFound("#run".into()).into();
        assert_eq!(e, OpError::ElementNotFound("#run".into()));
    }
}
