//! Element resolution: evaluate a locator against the live page.
//!
//! Path queries are evaluated as XPath, everything else as a CSS selector.
//! Resolution polls until a node matches or the wait budget elapses; the
//! retry policy decides whether a timed-out resolution is attempted again.

use crate::config::{DetoxConfig, RetryPolicy};
use crate::driver::{ElementHandle, PageDriver};
use crate::matcher::LocatorDescriptor;
use crate::result::{DetoxError, DetoxResult};
use std::time::Duration;
use tokio::time::Instant;

/// Lower bound on the polling interval so a zero interval cannot spin
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Resolves locator descriptors to element handles
#[derive(Debug)]
pub struct Resolver<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    timeout: Duration,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl<'a, D: PageDriver + ?Sized> Resolver<'a, D> {
    /// Resolver using the session's timing settings
    #[must_use]
    pub fn new(driver: &'a D, config: &DetoxConfig) -> Self {
        Self {
            driver,
            timeout: config.resolve_timeout(),
            poll_interval: config.poll_interval().max(MIN_POLL_INTERVAL),
            retry: config.retry,
        }
    }

    /// Override the wait budget
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the retry policy
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Resolve to exactly one element, or fail with `ElementNotFound`.
    ///
    /// Driver failures (such as a rejected selector) are returned at once and
    /// never retried.
    pub async fn resolve(&self, descriptor: &LocatorDescriptor) -> DetoxResult<ElementHandle> {
        let attempts = self.retry.attempts();
        let mut attempt = 1;
        loop {
            match self.wait_for(descriptor).await {
                Err(e) if e.is_not_found() && attempt < attempts => {
                    tracing::debug!(
                        locator = %descriptor,
                        attempt,
                        backoff_ms = self.retry.backoff_ms,
                        "element not found, retrying"
                    );
                    tokio::time::sleep(self.retry.backoff()).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn wait_for(&self, descriptor: &LocatorDescriptor) -> DetoxResult<ElementHandle> {
        if descriptor.is_inert() {
            return Err(DetoxError::ElementNotFound {
                locator: descriptor.to_string(),
                timeout_ms: 0,
            });
        }

        tracing::debug!(locator = %descriptor, timeout_ms = self.timeout.as_millis() as u64, "resolving element");
        let start = Instant::now();
        loop {
            let found = match &descriptor.path_query {
                Some(query) => self.driver.query_xpath(query).await?,
                None => self.driver.query_selector(&descriptor.selector).await?,
            };
            if let Some(handle) = found {
                tracing::debug!(locator = %descriptor, elapsed_ms = start.elapsed().as_millis() as u64, "element resolved");
                return Ok(handle);
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                return Err(DetoxError::ElementNotFound {
                    locator: descriptor.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval.min(self.timeout - elapsed)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::by;
    use crate::mock::{MockDriver, MockNode};

    fn config() -> DetoxConfig {
        DetoxConfig::default()
    }

    mod selector_tests {
        use super::*;

        #[tokio::test]
        async fn test_resolves_by_selector() {
            let driver = MockDriver::new().with_node(MockNode::new("button").test_id("go"));
            let handle = Resolver::new(&driver, &config())
                .resolve(&by::id("go").get())
                .await
                .unwrap();
            assert_eq!(handle.id, driver.node_id(0));
        }

        #[tokio::test]
        async fn test_resolves_by_path_query() {
            let driver = MockDriver::new()
                .with_node(MockNode::new("p").text("Welcome!"))
                .with_node(MockNode::new("h1").text("Welcome"));
            let handle = Resolver::new(&driver, &config())
                .resolve(&by::text("Welcome").get())
                .await
                .unwrap();
            assert_eq!(handle.id, driver.node_id(1));
        }

        #[tokio::test(start_paused = true)]
        async fn test_waits_for_late_node() {
            let driver =
                MockDriver::new().with_node(MockNode::new("div").test_id("late").appears_after(3));
            let handle = Resolver::new(&driver, &config())
                .resolve(&by::id("late").get())
                .await
                .unwrap();
            assert_eq!(handle.id, driver.node_id(0));
            assert_eq!(driver.query_count(), 4);
        }
    }

    mod timeout_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_times_out_within_budget() {
            let driver = MockDriver::new();
            let start = Instant::now();
            let err = Resolver::new(&driver, &config())
                .resolve(&by::id("missing").get())
                .await
                .unwrap_err();
            let elapsed = start.elapsed();

            assert!(err.is_not_found());
            assert!(elapsed >= Duration::from_millis(2000));
            assert!(elapsed < Duration::from_millis(2000) + config().poll_interval());
        }

        #[tokio::test(start_paused = true)]
        async fn test_inert_fails_without_waiting() {
            let driver = MockDriver::new();
            let start = Instant::now();
            let err = Resolver::new(&driver, &config())
                .resolve(&by::r#type("View").get())
                .await
                .unwrap_err();
            assert!(err.is_not_found());
            assert_eq!(start.elapsed(), Duration::ZERO);
            assert_eq!(driver.query_count(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_retry_once_after_backoff() {
            let driver = MockDriver::new();
            let start = Instant::now();
            let err = Resolver::new(&driver, &config())
                .with_timeout(Duration::from_millis(100))
                .with_retry(RetryPolicy::once_after(Duration::from_millis(1000)))
                .resolve(&by::id("missing").get())
                .await
                .unwrap_err();
            assert!(err.is_not_found());
            assert!(start.elapsed() >= Duration::from_millis(1200));
        }

        #[tokio::test]
        async fn test_invalid_selector_is_not_retried() {
            let driver = MockDriver::new();
            let descriptor = LocatorDescriptor {
                selector: "div > span".to_string(),
                path_query: None,
            };
            let err = Resolver::new(&driver, &config())
                .with_retry(RetryPolicy::once_after(Duration::from_millis(10)))
                .resolve(&descriptor)
                .await
                .unwrap_err();
            assert!(matches!(err, DetoxError::InvalidSelector { .. }));
            assert_eq!(driver.query_count(), 1);
        }
    }
}
