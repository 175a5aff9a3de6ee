//! 会话管理：唯一的浏览器句柄、登录状态机、UI 访问串行化
//!
//! 状态：`Uninitialized → Initializing → Ready → LoggingIn → Authenticated`，任意状态可到 `Closed`。
//! - 句柄存在 ⇔ 状态为 Ready / LoggingIn / Authenticated；一个进程最多一个句柄
//! - 登录是 single-flight：已有登录进行时，后来者等待同一次结果，不会再提交一次表单
//! - 所有「导航-操作-提取」序列都在 [`UiSession`] 守卫内执行，彼此互斥
//! - Closed 为终态，之后的调用返回 HandleUnavailable

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{watch, Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::browser::{find_first, wait_for_any, DriverLauncher, ElementRef, UiDriver, WaitPolicy};
use crate::config::{AppConfig, Credentials};
use crate::core::OpError;
use crate::platform::{login, Routes};

/// 会话生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Ready,
    LoggingIn,
    Authenticated,
    Closed,
}

type LoginOutcome = Option<Result<(), OpError>>;

struct SessionState {
    phase: SessionPhase,
    driver: Option<Arc<dyn UiDriver>>,
    current_project: Option<String>,
    /// 进行中的登录；后来者 clone 这个 receiver 等结果
    login: Option<watch::Receiver<LoginOutcome>>,
}

/// 会话相关的超时与凭据
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub routes: Routes,
    pub navigation_timeout: Duration,
    pub element_timeout: Duration,
    pub poll_interval: Duration,
    pub login_timeout: Duration,
    /// 环境变量提供的凭据（调用方未提供时使用）
    pub env_credentials: Option<Credentials>,
}

impl SessionSettings {
    pub fn new(base_url: &str) -> Self {
        Self::from_config(&AppConfig {
            platform: crate::config::PlatformSection {
                base_url: base_url.to_string(),
            },
            ..AppConfig::default()
        })
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            routes: Routes::new(&config.platform.base_url),
            navigation_timeout: config.browser.navigation_timeout(),
            element_timeout: config.browser.element_timeout(),
            poll_interval: config.browser.poll_interval(),
            login_timeout: Duration::from_secs(config.auth.login_timeout_secs),
            env_credentials: None,
        }
    }

    pub fn with_env_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.env_credentials = credentials;
        self
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    pub fn with_element_timeout(mut self, timeout: Duration) -> Self {
        self.element_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// 会话管理器：由组合根创建一次，以 Arc 传给各领域操作
pub struct SessionManager {
    launcher: Arc<dyn DriverLauncher>,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    init_gate: AsyncMutex<()>,
    ui: AsyncMutex<()>,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn DriverLauncher>, settings: SessionSettings) -> Self {
        Self {
            launcher,
            settings,
            state: Mutex::new(SessionState {
                phase: SessionPhase::Uninitialized,
                driver: None,
                current_project: None,
                login: None,
            }),
            init_gate: AsyncMutex::new(()),
            ui: AsyncMutex::new(()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn phase(&self) -> SessionPhase {
        self.state().phase
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase() == SessionPhase::Authenticated
    }

    pub fn current_project(&self) -> Option<String> {
        self.state().current_project.clone()
    }

    pub fn set_current_project(&self, project_id: Option<String>) {
        self.state().current_project = project_id;
    }

    /// 启动浏览器并打开平台首页；失败回到 Uninitialized，不自动重试
    pub async fn initialize(&self) -> Result<(), OpError> {
        let _gate = self.init_gate.lock().await;
        {
            let mut st = self.state();
            match st.phase {
                SessionPhase::Uninitialized => st.phase = SessionPhase::Initializing,
                SessionPhase::Closed => {
                    return Err(OpError::HandleUnavailable("session closed".to_string()))
                }
                _ => return Ok(()),
            }
        }
        tracing::info!(url = %self.settings.routes.landing(), "initializing browser session");

        let opened = self.open_handle().await;

        let leftover = {
            let mut st = self.state();
            match opened {
                Ok(driver) if st.phase == SessionPhase::Initializing => {
                    st.driver = Some(driver);
                    st.phase = SessionPhase::Ready;
                    tracing::info!("browser session ready");
                    return Ok(());
                }
                // close() 抢在初始化完成前执行
                Ok(driver) => driver,
                Err(e) => {
                    if st.phase == SessionPhase::Initializing {
                        st.phase = SessionPhase::Uninitialized;
                    }
                    tracing::warn!(error = %e, "browser session initialization failed");
                    return Err(e);
                }
            }
        };
        let _ = leftover.close().await;
        Err(OpError::HandleUnavailable("session closed".to_string()))
    }

    async fn open_handle(&self) -> Result<Arc<dyn UiDriver>, OpError> {
        let driver = self
            .launcher
            .launch()
            .await
            .map_err(|e| OpError::HandleUnavailable(e.to_string()))?;
        let _ui = self.ui.lock().await;
        let landing = self.settings.routes.landing();
        if let Err(e) = driver
            .open(&landing, WaitPolicy::DomReady, self.settings.navigation_timeout)
            .await
        {
            let _ = driver.close().await;
            return Err(e.into());
        }
        Ok(driver)
    }

    /// 确保已登录：已登录直接返回；未初始化则先初始化
    ///
    /// 初始化进行中时经 init_gate 等待同一次启动完成。
    /// 凭据优先用调用方提供的，其次环境变量；都没有返回 AuthRequired 且不触碰登录表单。
    pub async fn ensure_authenticated(&self, credentials: Option<&Credentials>) -> Result<(), OpError> {
        if matches!(
            self.phase(),
            SessionPhase::Uninitialized | SessionPhase::Initializing
        ) {
            self.initialize().await?;
        }

        let role = {
            let mut st = self.state();
            match st.phase {
                SessionPhase::Authenticated => return Ok(()),
                SessionPhase::Closed => {
                    return Err(OpError::HandleUnavailable("session closed".to_string()))
                }
                SessionPhase::Uninitialized | SessionPhase::Initializing => {
                    return Err(OpError::HandleUnavailable("session not initialized".to_string()))
                }
                SessionPhase::LoggingIn => match st.login.clone() {
                    Some(rx) => LoginRole::Follower(rx),
                    None => {
                        return Err(OpError::AuthFailed("login state lost".to_string()))
                    }
                },
                SessionPhase::Ready => {
                    let creds = credentials
                        .cloned()
                        .or_else(|| self.settings.env_credentials.clone())
                        .ok_or(OpError::AuthRequired)?;
                    let driver = st
                        .driver
                        .clone()
                        .ok_or_else(|| OpError::HandleUnavailable("no browser handle".to_string()))?;
                    let (tx, rx) = watch::channel(None);
                    st.login = Some(rx);
                    st.phase = SessionPhase::LoggingIn;
                    LoginRole::Leader(tx, driver, creds)
                }
            }
        };

        match role {
            LoginRole::Follower(mut rx) => {
                tracing::debug!("login already in flight, waiting for its outcome");
                let outcome = rx.wait_for(|v| v.is_some()).await.map(|v| v.clone());
                match outcome {
                    Ok(Some(result)) => result,
                    _ => Err(OpError::AuthFailed("login attempt abandoned".to_string())),
                }
            }
            LoginRole::Leader(tx, driver, creds) => {
                let flight = LoginFlight {
                    manager: self,
                    tx: Some(tx),
                };
                tracing::info!(username = %creds.username, "attempting login");
                let outcome = self.login(driver.as_ref(), &creds).await.map_err(|e| match e {
                    OpError::AuthFailed(_) => e,
                    other => OpError::AuthFailed(other.to_string()),
                });
                match &outcome {
                    Ok(()) => tracing::info!("login succeeded"),
                    Err(e) => tracing::warn!(error = %e, "login failed"),
                }
                flight.finish(outcome.clone());
                outcome
            }
        }
    }

    async fn login(&self, driver: &dyn UiDriver, creds: &Credentials) -> Result<(), OpError> {
        let _ui = self.ui.lock().await;
        driver
            .open(&self.settings.routes.login(), WaitPolicy::DomReady, self.settings.navigation_timeout)
            .await?;

        let user = find_first(driver, login::USERNAME)
            .await?
            .ok_or_else(|| OpError::ElementNotFound("username input".to_string()))?;
        let pass = find_first(driver, login::PASSWORD)
            .await?
            .ok_or_else(|| OpError::ElementNotFound("password input".to_string()))?;
        let submit = find_first(driver, login::SUBMIT)
            .await?
            .ok_or_else(|| OpError::ElementNotFound("login button".to_string()))?;

        driver.type_text(&user, &creds.username).await?;
        driver.type_text(&pass, &creds.password).await?;
        driver.click(&submit).await?;

        let marker = wait_for_any(
            driver,
            login::SUCCESS,
            self.settings.login_timeout,
            self.settings.poll_interval,
        )
        .await?;
        marker.map(|_| ()).ok_or_else(|| {
            OpError::AuthFailed(format!(
                "no success indicator within {}s",
                self.settings.login_timeout.as_secs()
            ))
        })
    }

    /// 确保已登录后进入 UI 互斥区；守卫存活期间其他调用无法操作页面
    pub async fn acquire(&self, credentials: Option<&Credentials>) -> Result<UiSession<'_>, OpError> {
        self.ensure_authenticated(credentials).await?;
        let guard = self.ui.lock().await;
        let driver = {
            let st = self.state();
            match (st.phase, st.driver.clone()) {
                (SessionPhase::Authenticated, Some(d)) => d,
                (SessionPhase::Closed, _) => {
                    return Err(OpError::HandleUnavailable("session closed".to_string()))
                }
                _ => return Err(OpError::HandleUnavailable("session not authenticated".to_string())),
            }
        };
        Ok(UiSession {
            manager: self,
            driver,
            _guard: guard,
        })
    }

    /// 任意状态下释放句柄并进入 Closed；幂等
    pub async fn close(&self) {
        let driver = {
            let mut st = self.state();
            if st.phase == SessionPhase::Closed {
                return;
            }
            st.phase = SessionPhase::Closed;
            st.current_project = None;
            st.driver.take()
        };
        if let Some(driver) = driver {
            if let Err(e) = driver.close().await {
                tracing::warn!(error = %e, "browser close failed");
            }
        }
        tracing::info!("browser session closed");
    }
}

enum LoginRole {
    Leader(watch::Sender<LoginOutcome>, Arc<dyn UiDriver>, Credentials),
    Follower(watch::Receiver<LoginOutcome>),
}

/// 登录进行中的收尾：正常结束写入结果；若 leader 被中途丢弃，回到 Ready 并通知等待者
struct LoginFlight<'a> {
    manager: &'a SessionManager,
    tx: Option<watch::Sender<LoginOutcome>>,
}

impl LoginFlight<'_> {
    fn finish(mut self, outcome: Result<(), OpError>) {
        self.settle(outcome);
    }

    fn settle(&mut self, outcome: Result<(), OpError>) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        {
            let mut st = self.manager.state();
            if st.phase == SessionPhase::LoggingIn {
                st.phase = if outcome.is_ok() {
                    SessionPhase::Authenticated
                } else {
                    SessionPhase::Ready
                };
            }
            st.login = None;
        }
        let _ = tx.send(Some(outcome));
    }
}

impl Drop for LoginFlight<'_> {
    fn drop(&mut self) {
        self.settle(Err(OpError::AuthFailed("login attempt abandoned".to_string())));
    }
}

/// UI 互斥区守卫：持有期间独占页面
pub struct UiSession<'a> {
    manager: &'a SessionManager,
    driver: Arc<dyn UiDriver>,
    _guard: AsyncMutexGuard<'a, ()>,
}

impl UiSession<'_> {
    pub fn driver(&self) -> &dyn UiDriver {
        self.driver.as_ref()
    }

    pub fn routes(&self) -> &Routes {
        &self.manager.settings.routes
    }

    pub fn poll_interval(&self) -> Duration {
        self.manager.settings.poll_interval
    }

    pub fn manager(&self) -> &SessionManager {
        self.manager
    }

    /// 打开页面并等待 DOM 就绪
    pub async fn goto(&self, url: &str) -> Result<(), OpError> {
        tracing::debug!(url, "navigate");
        self.driver
            .open(url, WaitPolicy::DomReady, self.manager.settings.navigation_timeout)
            .await?;
        Ok(())
    }

    /// 在元素超时内等待任一 selector 出现，否则 ElementNotFound(what)
    pub async fn element(&self, selectors: &[&str], what: &str) -> Result<ElementRef, OpError> {
        self.wait_for(selectors, self.manager.settings.element_timeout)
            .await?
            .ok_or_else(|| OpError::ElementNotFound(what.to_string()))
    }

    /// 立即查找，不等待
    pub async fn find(&self, selectors: &[&str]) -> Result<Option<ElementRef>, OpError> {
        Ok(find_first(self.driver.as_ref(), selectors).await?)
    }

    pub async fn wait_for(&self, selectors: &[&str], timeout: Duration) -> Result<Option<ElementRef>, OpError> {
        Ok(wait_for_any(self.driver.as_ref(), selectors, timeout, self.poll_interval()).await?)
    }

    pub async fn current_url(&self) -> Result<String, OpError> {
        Ok(self.driver.current_url().await?)
    }
}
