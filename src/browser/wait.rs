//! 有界等待：所有挂起点都走这里，轮询 + 截止时间，从不无限阻塞

use std::time::Duration;

use tokio::time::{sleep, Instant};

use super::{DriverError, ElementRef, UiDriver};

/// 依次尝试 selectors，返回第一个存在的元素
pub async fn find_first(
    driver: &dyn UiDriver,
    selectors: &[&str],
) -> Result<Option<ElementRef>, DriverError> {
    for sel in selectors {
        if let Some(el) = driver.find(sel).await? {
            return Ok(Some(el));
        }
    }
    Ok(None)
}

/// 在 timeout 内轮询，直到任一 selector 出现；超时返回 Ok(None)
///
/// 至少检查一次，即使 timeout 为 0；timeout 大到无法表示截止时间时视为不设上限。
pub async fn wait_for_any(
    driver: &dyn UiDriver,
    selectors: &[&str],
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Option<ElementRef>, DriverError> {
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if let Some(el) = find_first(driver, selectors).await? {
            return Ok(Some(el));
        }
        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                poll_interval.min(deadline - now)
            }
            None => poll_interval,
        };
        sleep(pause).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::FakeDriver;

    #[tokio::test]
    async fn test_find_first_respects_order() {
        let driver = FakeDriver::new();
        driver.show(&["#b", "#c"]);
        let el = find_first(&driver, &["#a", "#c", "#b"]).await.unwrap();
        assert_eq!(el.unwrap().selector(), "#c");
    }

    #[tokio::test]
    async fn test_wait_for_any_with_huge_timeout() {
        let driver = FakeDriver::new();
        driver.show(&["#ready"]);
        let el = wait_for_any(&driver, &["#ready"], Duration::MAX, Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(el.unwrap().selector(), "#ready");

        let el = wait_for_any(
            &driver,
            &["#ready"],
            Duration::from_secs(u64::MAX),
            Duration::from_millis(20),
        )
        .await
        .unwrap();
        assert!(el.is_some());
    }

    #[tokio::test]
    async fn test_wait_for_any_times_out() {
        let driver = FakeDriver::new();
        let start = std::time::Instant::now();
        let el = wait_for_any(
            &driver,
            &["#never"],
            Duration::from_millis(200),
            Duration::from_millis(20),
        )
        .await
        .unwrap();
        assert!(el.is_none());
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
