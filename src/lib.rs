//! eda-pilot - 通过浏览器界面操作 EDA 验证平台
//!
//! 模块划分：
//! - **browser**: 远程 UI 能力抽象（UiDriver）与 Chrome / 内存实现
//! - **config**: 应用配置加载（TOML + 环境变量）与凭据
//! - **core**: 错误、统一结果、优雅关闭
//! - **intent**: 自由文本 → 建议操作（示例相似度 + 规则表）
//! - **platform**: 平台路由与页面选择器
//! - **session**: 唯一浏览器会话、登录状态机、UI 串行化
//! - **tools**: 操作注册表、参数校验、执行器与各平台操作
//! - **transport**: 行分隔 JSON 的 stdio 传输
//! - **verification**: 验证运行的驱动、轮询与结果提取

pub mod browser;
pub mod config;
pub mod core;
pub mod intent;
pub mod observability;
pub mod platform;
pub mod session;
pub mod tools;
pub mod transport;
pub mod verification;

pub use crate::core::{OpError, OperationResult};
pub use crate::tools::ToolExecutor;
