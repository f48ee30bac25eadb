//! Session configuration.
//!
//! All timing knobs are stored in milliseconds so the config serializes as
//! plain numbers; `Duration` getters are provided for the call sites.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Origin the app under test is served from
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Wait budget for element resolution (2 seconds)
pub const DEFAULT_RESOLVE_TIMEOUT_MS: u64 = 2000;

/// Polling interval while waiting for an element (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Press-to-release delay of a tap
pub const DEFAULT_TAP_DELAY_MS: u64 = 10;

/// Press-to-release delay of a long press
pub const DEFAULT_LONG_PRESS_DELAY_MS: u64 = 600;

/// Delay between characters when replacing text
pub const DEFAULT_TYPE_DELAY_MS: u64 = 20;

/// Accuracy reported with geolocation overrides, in meters
pub const DEFAULT_GEOLOCATION_ACCURACY: f64 = 100.0;

/// Environment variable overriding [`DetoxConfig::base_url`]
pub const ENV_BASE_URL: &str = "DETOX_WEB_BASE_URL";

/// Environment variable overriding [`DetoxConfig::resolve_timeout_ms`]
pub const ENV_TIMEOUT_MS: &str = "DETOX_WEB_TIMEOUT_MS";

/// Environment variable overriding [`DetoxConfig::screenshot_dir`]
pub const ENV_SCREENSHOT_DIR: &str = "DETOX_WEB_SCREENSHOT_DIR";

/// How often element resolution is attempted before giving up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1)
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds
    pub backoff_ms: u64,
}

impl RetryPolicy {
    /// Single attempt, no retry
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 0,
        }
    }

    /// One retry after a fixed backoff
    #[must_use]
    pub const fn once_after(backoff: Duration) -> Self {
        Self {
            max_attempts: 2,
            backoff_ms: backoff.as_millis() as u64,
        }
    }

    /// Attempts to make, never less than one
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    /// Backoff as Duration
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Configuration shared by the element, expect and device facades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetoxConfig {
    /// Origin navigated to by `launch_app`, `send_to_home` and `reload_app`
    pub base_url: String,
    /// Element resolution wait budget
    pub resolve_timeout_ms: u64,
    /// Polling interval during resolution
    pub poll_interval_ms: u64,
    /// Retry policy around resolution
    pub retry: RetryPolicy,
    /// Tap press duration
    pub tap_delay_ms: u64,
    /// Long press duration
    pub long_press_delay_ms: u64,
    /// Per-character delay for `replace_text`
    pub type_delay_ms: u64,
    /// Accuracy sent with geolocation overrides
    pub geolocation_accuracy: f64,
    /// Directory screenshots are written to
    pub screenshot_dir: PathBuf,
}

impl Default for DetoxConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            resolve_timeout_ms: DEFAULT_RESOLVE_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            retry: RetryPolicy::disabled(),
            tap_delay_ms: DEFAULT_TAP_DELAY_MS,
            long_press_delay_ms: DEFAULT_LONG_PRESS_DELAY_MS,
            type_delay_ms: DEFAULT_TYPE_DELAY_MS,
            geolocation_accuracy: DEFAULT_GEOLOCATION_ACCURACY,
            screenshot_dir: PathBuf::from("."),
        }
    }
}

impl DetoxConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `DETOX_WEB_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.resolve_timeout_ms = ms,
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring {ENV_TIMEOUT_MS}"),
            }
        }
        if let Some(dir) = lookup(ENV_SCREENSHOT_DIR).filter(|v| !v.trim().is_empty()) {
            self.screenshot_dir = PathBuf::from(dir.trim());
        }
        self
    }

    /// Set the app origin
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the resolution wait budget
    #[must_use]
    pub const fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the retry policy
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set tap and long press durations
    #[must_use]
    pub const fn with_press_delays(mut self, tap: Duration, long_press: Duration) -> Self {
        self.tap_delay_ms = tap.as_millis() as u64;
        self.long_press_delay_ms = long_press.as_millis() as u64;
        self
    }

    /// Set the per-character typing delay
    #[must_use]
    pub const fn with_type_delay(mut self, delay: Duration) -> Self {
        self.type_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the screenshot directory
    #[must_use]
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    /// Resolution wait budget as Duration
    #[must_use]
    pub const fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    /// Poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Tap delay as Duration
    #[must_use]
    pub const fn tap_delay(&self) -> Duration {
        Duration::from_millis(self.tap_delay_ms)
    }

    /// Long press delay as Duration
    #[must_use]
    pub const fn long_press_delay(&self) -> Duration {
        Duration::from_millis(self.long_press_delay_ms)
    }

    /// Typing delay as Duration
    #[must_use]
    pub const fn type_delay(&self) -> Duration {
        Duration::from_millis(self.type_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = DetoxConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.resolve_timeout(), Duration::from_millis(2000));
        assert_eq!(config.tap_delay(), Duration::from_millis(10));
        assert_eq!(config.long_press_delay(), Duration::from_millis(600));
        assert_eq!(config.type_delay(), Duration::from_millis(20));
        assert_eq!(config.retry, RetryPolicy::disabled());
    }

    #[test]
    fn test_config_builder() {
        let config = DetoxConfig::new()
            .with_base_url("http://127.0.0.1:8080")
            .with_resolve_timeout(Duration::from_millis(500))
            .with_poll_interval(Duration::from_millis(5))
            .with_retry(RetryPolicy::once_after(Duration::from_secs(1)))
            .with_screenshot_dir("/tmp/shots");

        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.resolve_timeout_ms, 500);
        assert_eq!(config.poll_interval_ms, 5);
        assert_eq!(config.retry.attempts(), 2);
        assert_eq!(config.retry.backoff(), Duration::from_secs(1));
        assert_eq!(config.screenshot_dir, PathBuf::from("/tmp/shots"));
    }

    #[test]
    fn test_overrides_apply() {
        let config = DetoxConfig::default().with_overrides(lookup(&[
            (ENV_BASE_URL, " http://app.test "),
            (ENV_TIMEOUT_MS, "750"),
            (ENV_SCREENSHOT_DIR, "artifacts"),
        ]));
        assert_eq!(config.base_url, "http://app.test");
        assert_eq!(config.resolve_timeout_ms, 750);
        assert_eq!(config.screenshot_dir, PathBuf::from("artifacts"));
    }

    #[test]
    fn test_bad_timeout_override_ignored() {
        let config = DetoxConfig::default().with_overrides(lookup(&[(ENV_TIMEOUT_MS, "soon")]));
        assert_eq!(config.resolve_timeout_ms, DEFAULT_RESOLVE_TIMEOUT_MS);
    }

    #[test]
    fn test_retry_zero_attempts_means_one() {
        let policy = RetryPolicy {
            max_attempts: 0,
            backoff_ms: 10,
        };
        assert_eq!(policy.attempts(), 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DetoxConfig =
            serde_json::from_str(r#"{"base_url":"http://x","resolve_timeout_ms":100}"#).unwrap();
        assert_eq!(config.base_url, "http://x");
        assert_eq!(config.resolve_timeout_ms, 100);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }
}
