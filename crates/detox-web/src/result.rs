//! Result and error types for detox-web.
//!
//! Only genuine failures travel on this channel. Operations the web platform
//! cannot emulate are reported through [`crate::Outcome`] diagnostics instead.

use thiserror::Error;

/// Result type for detox-web operations
pub type DetoxResult<T> = Result<T, DetoxError>;

/// Errors that can occur while driving a page
#[derive(Debug, Error)]
pub enum DetoxError {
    /// No element matched the locator before the wait budget elapsed
    #[error("Element not found: {locator} (waited {timeout_ms}ms)")]
    ElementNotFound {
        /// Human-readable locator (selector or path query)
        locator: String,
        /// Wait budget that elapsed, in milliseconds
        timeout_ms: u64,
    },

    /// The page rejected a selector or path query
    #[error("Invalid selector {selector:?}: {message}")]
    InvalidSelector {
        /// Selector or path query that was rejected
        selector: String,
        /// Error message
        message: String,
    },

    /// Element exists but has no layout box to act on
    #[error("Element is not rendered: {locator}")]
    NotRendered {
        /// Locator of the element
        locator: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Script evaluation in the page failed
    #[error("Script evaluation failed: {message}")]
    EvaluationError {
        /// Error message
        message: String,
    },

    /// Input simulation error
    #[error("Input simulation failed: {message}")]
    InputError {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    ScreenshotError {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DetoxError {
    /// Whether this error means the locator matched nothing in time
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ElementNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = DetoxError::ElementNotFound {
            locator: "[data-testid='submit']".to_string(),
            timeout_ms: 2000,
        };
        assert_eq!(
            err.to_string(),
            "Element not found: [data-testid='submit'] (waited 2000ms)"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_other_errors_are_not_not_found() {
        let err = DetoxError::InputError {
            message: "boom".to_string(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_json_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DetoxError = parse.into();
        assert!(matches!(err, DetoxError::Json(_)));
    }
}
