//! eda-pilot - EDA 平台操作代理
//!
//! 入口：初始化日志、加载配置，组装会话 / 验证编排 / 意图解析 / 操作注册表，
//! 然后在 stdio 上提供行分隔 JSON 服务，直到输入结束或收到关闭信号。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use eda_pilot::browser::DriverLauncher;
use eda_pilot::config::{load_config, AppConfig, Credentials};
use eda_pilot::core::{
    run_with_graceful_shutdown, SessionCleanup, ShutdownCoordinator, ShutdownManager, ShutdownReason,
};
use eda_pilot::intent::{Corpus, IntentResolver};
use eda_pilot::session::{SessionManager, SessionSettings};
use eda_pilot::tools::{build_registry, ToolExecutor};
use eda_pilot::verification::VerificationRunner;
use eda_pilot::{observability, transport};

#[cfg(feature = "browser")]
fn launcher(config: &AppConfig) -> Arc<dyn DriverLauncher> {
    Arc::new(eda_pilot::browser::ChromeLauncher::new(config.browser.clone()))
}

/// 未启用 browser 特性时只能空跑
#[cfg(not(feature = "browser"))]
fn launcher(_config: &AppConfig) -> Arc<dyn DriverLauncher> {
    use eda_pilot::browser::{FakeDriver, FakeLauncher};
    tracing::warn!("built without the browser feature, using an in-memory driver");
    Arc::new(FakeLauncher::new(Arc::new(FakeDriver::new())))
}

fn corpus(config: &AppConfig) -> anyhow::Result<Corpus> {
    match &config.intent.corpus_path {
        Some(path) => Corpus::from_json_file(path),
        None => Ok(Corpus::builtin()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    // 第一个参数可指定额外的配置文件
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path).context("Failed to load config")?;
    tracing::info!(base_url = %config.platform.base_url, "config loaded");

    let env_credentials = Credentials::from_env();
    if env_credentials.is_none() {
        tracing::info!("EDA_USERNAME / EDA_PASSWORD not set, operations must pass credentials");
    }

    let settings = SessionSettings::from_config(&config).with_env_credentials(env_credentials);
    let session = Arc::new(SessionManager::new(launcher(&config), settings));
    let runner = Arc::new(VerificationRunner::new(session.clone(), &config.verification));

    let corpus = corpus(&config).context("Failed to load intent corpus")?;
    tracing::info!(examples = corpus.len(), "intent corpus ready");
    let resolver = Arc::new(IntentResolver::new(Arc::new(corpus), config.intent.fallback_examples));

    let executor = ToolExecutor::new(build_registry(session.clone(), runner, resolver));
    tracing::info!(operations = ?executor.tool_names(), "operations registered");

    let shutdown = Arc::new(ShutdownManager::new());
    let mut coordinator = ShutdownCoordinator::new(shutdown.clone()).with_timeout(10);
    coordinator.register(SessionCleanup::new(session));

    let token = shutdown.token();
    let app_shutdown = shutdown.clone();
    let app = async move {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        if let Err(e) = transport::serve(&executor, stdin, tokio::io::stdout(), token).await {
            tracing::error!(error = %e, "transport failed");
        }
        app_shutdown.shutdown(ShutdownReason::TransportClosed);
    };

    run_with_graceful_shutdown(shutdown.clone(), app, || async move { coordinator.run_cleanup().await }).await;
    tracing::info!(reason = ?shutdown.reason(), "bye");
    Ok(())
}
