//! close_session 操作：显式关闭浏览器会话（关闭后不可再用）

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::core::OpError;
use crate::session::SessionManager;
use crate::tools::{FnTool, Tool};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CloseArgs {}

pub fn tool(session: Arc<SessionManager>) -> impl Tool {
    FnTool::new(
        "close_session",
        "Close the browser session. Later session-backed operations fail until the process restarts.",
        move |_args: CloseArgs| {
            let session = session.clone();
            async move {
                session.close().await;
                Ok::<_, OpError>(json!({ "closed": true }))
            }
        },
    )
}
