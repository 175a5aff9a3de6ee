//! 内存版驱动：用于测试与离线演练
//!
//! 页面由「URL 片段 → 可见 selector 集合」描述；点击某个 selector 可以让新的 selector 出现，
//! evaluate 按脚本片段返回预设值。所有调用都记录在 calls 里，便于断言。

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{DriverError, DriverLauncher, ElementRef, UiDriver, WaitPolicy};

#[derive(Default)]
struct FakeState {
    url: String,
    visible: HashSet<String>,
    pages: Vec<(String, Vec<String>)>,
    reveals: HashMap<String, Vec<String>>,
    evals: Vec<(String, Value)>,
    calls: Vec<String>,
    fail_open: bool,
    action_delay: Option<Duration>,
    closed: bool,
}

/// 内存版 UiDriver
#[derive(Default)]
pub struct FakeDriver {
    state: Mutex<FakeState>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// 打开 URL 包含 fragment 的页面后，selectors 可见（多条匹配时取并集）
    pub fn page(&self, fragment: &str, selectors: &[&str]) -> &Self {
        self.lock()
            .pages
            .push((fragment.to_string(), selectors.iter().map(|s| s.to_string()).collect()));
        self
    }

    /// 点击 selector 后，selectors 出现在当前页
    pub fn on_click(&self, selector: &str, selectors: &[&str]) -> &Self {
        self.lock()
            .reveals
            .entry(selector.to_string())
            .or_default()
            .extend(selectors.iter().map(|s| s.to_string()));
        self
    }

    /// 脚本包含 fragment 时 evaluate 返回 value；未匹配返回 Null
    pub fn on_evaluate(&self, fragment: &str, value: Value) -> &Self {
        self.lock().evals.push((fragment.to_string(), value));
        self
    }

    /// 直接让 selectors 出现在当前页
    pub fn show(&self, selectors: &[&str]) -> &Self {
        self.lock().visible.extend(selectors.iter().map(|s| s.to_string()));
        self
    }

    pub fn fail_open(&self, fail: bool) -> &Self {
        self.lock().fail_open = fail;
        self
    }

    /// 每个 type / click / select / upload 之前的人为延迟
    pub fn action_delay(&self, delay: Duration) -> &Self {
        self.lock().action_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn record(&self, call: String) -> Result<(), DriverError> {
        let mut st = self.lock();
        if st.closed {
            return Err(DriverError::Backend("browser closed".to_string()));
        }
        st.calls.push(call);
        Ok(())
    }

    fn require_visible(&self, element: &ElementRef) -> Result<(), DriverError> {
        if self.lock().visible.contains(element.selector()) {
            Ok(())
        } else {
            Err(DriverError::ElementNotFound(element.selector().to_string()))
        }
    }

    async fn pause(&self) {
        let delay = self.lock().action_delay;
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait]
impl UiDriver for FakeDriver {
    async fn open(&self, url: &str, _wait: WaitPolicy, _timeout: Duration) -> Result<(), DriverError> {
        self.record(format!("open:{}", url))?;
        let mut st = self.lock();
        if st.fail_open {
            return Err(DriverError::Timeout(format!("{} did not load", url)));
        }
        let visible: HashSet<String> = st
            .pages
            .iter()
            .filter(|(fragment, _)| url.contains(fragment.as_str()))
            .flat_map(|(_, sels)| sels.iter().cloned())
            .collect();
        st.visible = visible;
        st.url = url.to_string();
        Ok(())
    }

    async fn find(&self, selector: &str) -> Result<Option<ElementRef>, DriverError> {
        let st = self.lock();
        if st.closed {
            return Err(DriverError::Backend("browser closed".to_string()));
        }
        Ok(st.visible.contains(selector).then(|| ElementRef::new(selector)))
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        self.pause().await;
        self.require_visible(element)?;
        self.record(format!("type:{}={}", element.selector(), text))
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.pause().await;
        self.require_visible(element)?;
        self.record(format!("click:{}", element.selector()))?;
        let mut st = self.lock();
        if let Some(revealed) = st.reveals.get(element.selector()).cloned() {
            st.visible.extend(revealed);
        }
        Ok(())
    }

    async fn select_option(&self, element: &ElementRef, value: &str) -> Result<(), DriverError> {
        self.pause().await;
        self.require_visible(element)?;
        self.record(format!("select:{}={}", element.selector(), value))
    }

    async fn upload_file(&self, element: &ElementRef, local_path: &Path) -> Result<(), DriverError> {
        self.pause().await;
        self.require_visible(element)?;
        self.record(format!("upload:{}={}", element.selector(), local_path.display()))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, DriverError> {
        let st = self.lock();
        if st.closed {
            return Err(DriverError::Backend("browser closed".to_string()));
        }
        Ok(st
            .evals
            .iter()
            .find(|(fragment, _)| script.contains(fragment.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Null))
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.lock().url.clone())
    }

    async fn close(&self) -> Result<(), DriverError> {
        let mut st = self.lock();
        st.closed = true;
        st.visible.clear();
        Ok(())
    }
}

/// 总是返回同一个 FakeDriver 的启动器；记录启动次数
pub struct FakeLauncher {
    driver: Arc<FakeDriver>,
    launches: AtomicUsize,
    fail: bool,
    launch_delay: Option<Duration>,
}

impl FakeLauncher {
    pub fn new(driver: Arc<FakeDriver>) -> Self {
        Self {
            driver,
            launches: AtomicUsize::new(0),
            fail: false,
            launch_delay: None,
        }
    }

    /// 启动前的人为延迟（模拟 Chrome 冷启动）
    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = Some(delay);
        self
    }

    /// 启动总是失败（模拟找不到 Chrome）
    pub fn failing() -> Self {
        Self {
            driver: Arc::new(FakeDriver::new()),
            launches: AtomicUsize::new(0),
            fail: true,
            launch_delay: None,
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriverLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Arc<dyn UiDriver>, DriverError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.launch_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DriverError::Backend("Chrome launch failed".to_string()));
        }
        Ok(self.driver.clone() as Arc<dyn UiDriver>)
    }
}
