//! headless_chrome 适配器
//!
//! 需启用 feature "browser" 且系统已安装 Chrome/Chromium。
//! headless_chrome 是同步 API，所有调用经 spawn_blocking 执行；元素按 selector 每次重新定位。

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use headless_chrome::protocol::cdp::DOM;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;

use super::{DriverError, DriverLauncher, ElementRef, UiDriver, WaitPolicy};
use crate::config::BrowserSection;

fn classify(e: impl std::fmt::Display) -> DriverError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        DriverError::Timeout(msg)
    } else {
        DriverError::Backend(msg)
    }
}

/// JS 字符串字面量转义
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

struct ChromeInner {
    // 持有 Browser 以保活浏览器进程，drop 即关闭
    _browser: Browser,
    tab: Arc<Tab>,
}

/// 单标签页的 Chrome 驱动
pub struct ChromeDriver {
    inner: Mutex<Option<ChromeInner>>,
}

impl ChromeDriver {
    pub fn launch(settings: &BrowserSection) -> Result<Self, DriverError> {
        let options = LaunchOptions::default_builder()
            .headless(settings.headless)
            .window_size(Some((settings.window_width, settings.window_height)))
            .idle_browser_timeout(Duration::from_secs(3600))
            .build()
            .map_err(|e| DriverError::Backend(format!("Chrome options: {}", e)))?;
        let browser =
            Browser::new(options).map_err(|e| DriverError::Backend(format!("Chrome launch failed: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| DriverError::Backend(format!("Browser tab failed: {}", e)))?;
        Ok(Self {
            inner: Mutex::new(Some(ChromeInner { _browser: browser, tab })),
        })
    }

    fn tab(&self) -> Result<Arc<Tab>, DriverError> {
        let guard = self
            .inner
            .lock()
            .map_err(|e| DriverError::Backend(e.to_string()))?;
        guard
            .as_ref()
            .map(|inner| Arc::clone(&inner.tab))
            .ok_or_else(|| DriverError::Backend("browser closed".to_string()))
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, DriverError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Tab>) -> Result<T, DriverError> + Send + 'static,
    {
        let tab = self.tab()?;
        tokio::task::spawn_blocking(move || f(tab))
            .await
            .map_err(|e| DriverError::Backend(format!("Task join: {}", e)))?
    }
}

#[async_trait]
impl UiDriver for ChromeDriver {
    async fn open(&self, url: &str, wait: WaitPolicy, timeout: Duration) -> Result<(), DriverError> {
        let url = url.to_string();
        tracing::debug!(url = %url, ?wait, "chrome open");
        self.blocking(move |tab| {
            let started = Instant::now();
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url).map_err(classify)?;
            if wait == WaitPolicy::Commit {
                return Ok(());
            }
            tab.wait_until_navigated().map_err(classify)?;
            tab.wait_for_element_with_custom_timeout("body", timeout)
                .map_err(|e| DriverError::Timeout(format!("{}: {}", url, e)))?;
            if wait == WaitPolicy::NetworkIdle {
                loop {
                    let ready = tab
                        .evaluate("document.readyState === 'complete'", false)
                        .map_err(classify)?
                        .value
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                    if ready {
                        break;
                    }
                    if started.elapsed() >= timeout {
                        return Err(DriverError::Timeout(format!("{} did not settle", url)));
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
            Ok(())
        })
        .await
    }

    async fn find(&self, selector: &str) -> Result<Option<ElementRef>, DriverError> {
        let selector = selector.to_string();
        self.blocking(move |tab| {
            Ok(tab
                .find_element(&selector)
                .ok()
                .map(|_| ElementRef::new(selector.clone())))
        })
        .await
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        let selector = element.selector().to_string();
        let text = text.to_string();
        self.blocking(move |tab| {
            let el = tab
                .find_element(&selector)
                .map_err(|_| DriverError::ElementNotFound(selector.clone()))?;
            el.click().map_err(classify)?;
            el.type_into(&text).map_err(classify)?;
            Ok(())
        })
        .await
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        let selector = element.selector().to_string();
        self.blocking(move |tab| {
            tab.find_element(&selector)
                .map_err(|_| DriverError::ElementNotFound(selector.clone()))?
                .click()
                .map_err(classify)?;
            Ok(())
        })
        .await
    }

    async fn select_option(&self, element: &ElementRef, value: &str) -> Result<(), DriverError> {
        let js = format!(
            r#"(function() {{
                const el = document.querySelector({sel});
                if (!el) return 'missing';
                const opt = Array.from(el.options || []).find(o => o.value === {val} || o.text.trim().toLowerCase() === {val}.toLowerCase());
                if (!opt) return 'no-option';
                el.value = opt.value;
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return 'ok';
            }})()"#,
            sel = js_string(element.selector()),
            val = js_string(value),
        );
        let selector = element.selector().to_string();
        let value = value.to_string();
        self.blocking(move |tab| {
            let outcome = tab
                .evaluate(&js, false)
                .map_err(classify)?
                .value
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            match outcome.as_str() {
                "ok" => Ok(()),
                "no-option" => Err(DriverError::ElementNotFound(format!(
                    "option '{}' in {}",
                    value, selector
                ))),
                _ => Err(DriverError::ElementNotFound(selector)),
            }
        })
        .await
    }

    async fn upload_file(&self, element: &ElementRef, local_path: &Path) -> Result<(), DriverError> {
        let selector = element.selector().to_string();
        let path = local_path.to_string_lossy().to_string();
        self.blocking(move |tab| {
            let el = tab
                .find_element(&selector)
                .map_err(|_| DriverError::ElementNotFound(selector.clone()))?;
            tab.call_method(DOM::SetFileInputFiles {
                files: vec![path],
                node_id: None,
                backend_node_id: None,
                object_id: Some(el.remote_object_id.clone()),
            })
            .map_err(classify)?;
            Ok(())
        })
        .await
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        // 对象按引用返回时拿不到值，统一在页面内 JSON 序列化
        let js = format!("JSON.stringify({})", script);
        self.blocking(move |tab| {
            let raw = tab.evaluate(&js, true).map_err(classify)?.value;
            Ok(match raw {
                Some(Value::String(s)) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
                Some(other) => other,
                None => Value::Null,
            })
        })
        .await
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.blocking(|tab| Ok(tab.get_url())).await
    }

    async fn close(&self) -> Result<(), DriverError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| DriverError::Backend(e.to_string()))?
            .take();
        if let Some(inner) = inner {
            tokio::task::spawn_blocking(move || drop(inner))
                .await
                .map_err(|e| DriverError::Backend(format!("Task join: {}", e)))?;
        }
        Ok(())
    }
}

/// 按 [browser] 配置启动 Chrome
pub struct ChromeLauncher {
    settings: BrowserSection,
}

impl ChromeLauncher {
    pub fn new(settings: BrowserSection) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl DriverLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Arc<dyn UiDriver>, DriverError> {
        let settings = self.settings.clone();
        let driver = tokio::task::spawn_blocking(move || ChromeDriver::launch(&settings))
            .await
            .map_err(|e| DriverError::Backend(format!("Task join: {}", e)))??;
        tracing::info!("Chrome launched");
        Ok(Arc::new(driver) as Arc<dyn UiDriver>)
    }
}
