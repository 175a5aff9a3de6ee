//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `EDA__*` 覆盖（双下划线表示嵌套，如 `EDA__PLATFORM__BASE_URL=https://...`）。
//! 登录凭据不放在配置文件里，见 [`Credentials::from_env`]。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub platform: PlatformSection,
    pub browser: BrowserSection,
    pub auth: AuthSection,
    pub verification: VerificationSection,
    pub intent: IntentSection,
}

/// [platform] 段：EDA 平台地址
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "https://eda.example.com".to_string()
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// [browser] 段：无头模式、导航/元素等待超时、轮询间隔、窗口尺寸
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSection {
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_element_timeout_secs")]
    pub element_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

fn default_headless() -> bool {
    true
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

fn default_element_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_window_width() -> u32 {
    1440
}

fn default_window_height() -> u32 {
    900
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            element_timeout_secs: default_element_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl BrowserSection {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

/// [auth] 段：登录成功标记的等待上限
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSection {
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,
}

fn default_login_timeout_secs() -> u64 {
    15
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            login_timeout_secs: default_login_timeout_secs(),
        }
    }
}

/// [verification] 段：启动等待与默认完成等待（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationSection {
    #[serde(default = "default_start_timeout_secs")]
    pub start_timeout_secs: u64,
    #[serde(default = "default_verification_timeout_secs")]
    pub default_timeout_secs: u64,
}

fn default_start_timeout_secs() -> u64 {
    5
}

fn default_verification_timeout_secs() -> u64 {
    300
}

impl Default for VerificationSection {
    fn default() -> Self {
        Self {
            start_timeout_secs: default_start_timeout_secs(),
            default_timeout_secs: default_verification_timeout_secs(),
        }
    }
}

/// [intent] 段：兜底回复里的示例条数、可替换的语料文件
#[derive(Debug, Clone, Deserialize)]
pub struct IntentSection {
    #[serde(default = "default_fallback_examples")]
    pub fallback_examples: usize,
    pub corpus_path: Option<PathBuf>,
}

fn default_fallback_examples() -> usize {
    5
}

impl Default for IntentSection {
    fn default() -> Self {
        Self {
            fallback_examples: default_fallback_examples(),
            corpus_path: None,
        }
    }
}

/// 平台登录凭据
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// 成对提供才算数；任一为空返回 None
    pub fn from_parts(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.trim().is_empty() && !p.is_empty() => Some(Self::new(u.trim(), p)),
            _ => None,
        }
    }

    /// 读取 EDA_USERNAME / EDA_PASSWORD
    pub fn from_env() -> Option<Self> {
        let username = std::env::var("EDA_USERNAME").ok();
        let password = std::env::var("EDA_PASSWORD").ok();
        Self::from_parts(username.as_deref(), password.as_deref())
    }
}

/// 从 config 目录加载配置，环境变量 EDA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 EDA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("EDA")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
