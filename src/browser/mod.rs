//! 远程 UI 自动化能力
//!
//! 核心只依赖 [`UiDriver`] 这一能力接口（open / find / type / click / select / upload / evaluate），
//! 真实后端由 [`chrome::ChromeDriver`] 适配 headless_chrome，测试与离线演练使用 [`fake::FakeDriver`]。
//! 任何调用都可能以超时或「元素不存在」失败，均为普通错误，不会 panic。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[cfg(feature = "browser")]
pub mod chrome;
pub mod fake;
pub mod wait;

#[cfg(feature = "browser")]
pub use chrome::{ChromeDriver, ChromeLauncher};
pub use fake::{FakeDriver, FakeLauncher};
pub use wait::{find_first, wait_for_any};

/// 自动化后端错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    ElementNotFound(String),

    #[error("{0}")]
    Backend(String),
}

/// 页面打开后等待到什么程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// 只等导航提交
    Commit,
    /// 等 DOM 可用（body 出现）
    #[default]
    DomReady,
    /// 等网络基本空闲（SPA 首屏数据加载完）
    NetworkIdle,
}

/// 页面元素引用；后端按 selector 重新定位，避免持有跨调用的 DOM 句柄
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef {
    selector: String,
}

impl ElementRef {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }
}

/// 远程 UI 能力接口
#[async_trait]
pub trait UiDriver: Send + Sync {
    async fn open(&self, url: &str, wait: WaitPolicy, timeout: Duration) -> Result<(), DriverError>;

    /// 元素不存在时返回 Ok(None)
    async fn find(&self, selector: &str) -> Result<Option<ElementRef>, DriverError>;

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), DriverError>;

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError>;

    async fn select_option(&self, element: &ElementRef, value: &str) -> Result<(), DriverError>;

    async fn upload_file(&self, element: &ElementRef, local_path: &Path) -> Result<(), DriverError>;

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    /// 释放底层浏览器；重复调用无副作用
    async fn close(&self) -> Result<(), DriverError>;
}

/// 创建驱动（启动浏览器进程）；由会话管理器在首次需要时调用一次
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn UiDriver>, DriverError>;
}
