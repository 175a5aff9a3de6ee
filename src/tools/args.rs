//! 各操作共用的参数片段

use schemars::JsonSchema;
use serde::Deserialize;

use crate::config::Credentials;
use crate::core::OpError;
use crate::session::SessionManager;

/// 可选的登录凭据；未提供时使用环境变量 EDA_USERNAME / EDA_PASSWORD
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct AuthArgs {
    /// 平台用户名
    pub username: Option<String>,
    /// 平台密码
    pub password: Option<String>,
}

impl AuthArgs {
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(self.username.as_deref(), self.password.as_deref())
    }
}

/// 参数里的 projectId 优先，其次会话的当前项目
pub fn resolve_project(session: &SessionManager, project_id: Option<String>) -> Result<String, OpError> {
    project_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .or_else(|| session.current_project())
        .ok_or_else(|| {
            OpError::Validation(vec![
                "projectId is required (no project is currently open)".to_string(),
            ])
        })
}
