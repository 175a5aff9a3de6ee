//! 验证编排：配置 → 触发 → 等待运行 → 等待完成 → 提取
//!
//! 前四步任何失败都是致命的（不重试、不返回部分结果）；提取永远成功，缺失项退回默认值。
//! 整个序列在会话的 UI 互斥区内完成，其他调用看不到中间状态。

pub mod extract;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Credentials, VerificationSection};
use crate::core::OpError;
use crate::platform::verification as ui_marks;
use crate::session::{SessionManager, UiSession};

pub use extract::{extract, parse_snapshot};
pub use types::{Severity, Statistics, VerificationKind, VerificationOptions, VerificationResult, Violation};

fn whole_secs(d: Duration) -> u64 {
    d.as_secs_f64().ceil() as u64
}

/// 验证编排器
pub struct VerificationRunner {
    session: Arc<SessionManager>,
    start_timeout: Duration,
    default_timeout_secs: u64,
}

impl VerificationRunner {
    pub fn new(session: Arc<SessionManager>, settings: &VerificationSection) -> Self {
        Self {
            session,
            start_timeout: Duration::from_secs(settings.start_timeout_secs),
            default_timeout_secs: settings.default_timeout_secs,
        }
    }

    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// 在 project_id 上运行一次验证并返回提取的结果
    pub async fn run(
        &self,
        project_id: &str,
        kind: VerificationKind,
        options: &VerificationOptions,
        credentials: Option<&Credentials>,
    ) -> Result<VerificationResult, OpError> {
        let timeout_secs = options.timeout.unwrap_or(self.default_timeout_secs);
        let ui = self.session.acquire(credentials).await?;

        ui.goto(&ui.routes().verification(project_id)).await?;
        configure(&ui, kind, options).await?;

        let run = ui.element(ui_marks::RUN, "run verification button").await?;
        ui.driver().click(&run).await?;
        tracing::info!(project_id, kind = kind.as_str(), timeout_secs, "verification triggered");

        // 极快的运行可能直接跳到完成状态
        let started: Vec<&str> = ui_marks::RUNNING
            .iter()
            .chain(ui_marks::COMPLETE.iter())
            .copied()
            .collect();
        if ui.wait_for(&started, self.start_timeout).await?.is_none() {
            tracing::warn!(project_id, "verification did not start");
            return Err(OpError::VerificationStartTimeout(whole_secs(self.start_timeout)));
        }

        if ui
            .wait_for(ui_marks::COMPLETE, Duration::from_secs(timeout_secs))
            .await?
            .is_none()
        {
            tracing::warn!(project_id, timeout_secs, "verification timed out");
            return Err(OpError::VerificationTimeout(timeout_secs));
        }

        let result = extract(ui.driver()).await;
        ui.manager().set_current_project(Some(project_id.to_string()));
        tracing::info!(
            project_id,
            passed = result.passed,
            violations = result.violations.len(),
            "verification complete"
        );
        Ok(result)
    }

    /// 打开结果页读取最近一次运行的结果
    pub async fn latest_results(
        &self,
        project_id: &str,
        credentials: Option<&Credentials>,
    ) -> Result<VerificationResult, OpError> {
        let ui = self.session.acquire(credentials).await?;
        ui.goto(&ui.routes().results(project_id)).await?;
        ui.element(ui_marks::RESULTS_VIEW, "results view").await?;
        let result = extract(ui.driver()).await;
        ui.manager().set_current_project(Some(project_id.to_string()));
        Ok(result)
    }
}

async fn configure(ui: &UiSession<'_>, kind: VerificationKind, options: &VerificationOptions) -> Result<(), OpError> {
    let driver = ui.driver();

    let type_select = ui.element(ui_marks::TYPE, "verification type selector").await?;
    driver.select_option(&type_select, kind.as_str()).await?;

    if let Some(timeout) = options.timeout {
        let input = ui.element(ui_marks::TIMEOUT, "timeout input").await?;
        driver.type_text(&input, &timeout.to_string()).await?;
    }
    if let Some(depth) = options.depth {
        let input = ui.element(ui_marks::DEPTH, "depth input").await?;
        driver.type_text(&input, &depth.to_string()).await?;
    }
    if let Some(properties) = options.properties.as_ref().filter(|p| !p.is_empty()) {
        let input = ui.element(ui_marks::PROPERTIES, "properties input").await?;
        driver.type_text(&input, &properties.join("\n")).await?;
    }
    Ok(())
}
