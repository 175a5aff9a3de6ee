//! 操作层：注册表、参数校验、执行器，以及各个平台操作

pub mod args;
pub mod executor;
pub mod intent;
pub mod navigate;
pub mod project;
pub mod registry;
pub mod schema;
pub mod session;
pub mod upload;
pub mod verify;

use std::sync::Arc;

use crate::intent::IntentResolver;
use crate::session::SessionManager;
use crate::verification::VerificationRunner;

pub use executor::ToolExecutor;
pub use registry::{FnTool, Tool, ToolDescriptor, ToolRegistry};

/// 注册全部平台操作
pub fn build_registry(
    session: Arc<SessionManager>,
    runner: Arc<VerificationRunner>,
    resolver: Arc<IntentResolver>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(navigate::tool(session.clone()));
    registry.register(project::tool(session.clone()));
    registry.register(upload::tool(session.clone()));
    registry.register(verify::tool(runner.clone()));
    registry.register(verify::results_tool(runner));
    registry.register(intent::tool(resolver));
    registry.register(session::tool(session));
    registry
}
