//! detox-web: Detox-compatible end-to-end testing against a browser page
//!
//! Test code written for the Detox `by` / `element` / `expect` / `device`
//! API runs against a web build of the app. Matchers compile to CSS selectors
//! and XPath, gestures to mouse, keyboard and script primitives of a
//! [`PageDriver`]. Gestures the browser cannot express complete normally and
//! are reported on a diagnostic channel instead of failing the test.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ by::id(..)   │   │ Resolver     │   │ WebElement   │   │ PageDriver   │
//! │ Matcher      │──►│ poll + retry │──►│ actions      │──►│ chromium /   │
//! │ (CSS/XPath)  │   │              │   │ WebExpect    │   │ mock         │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘
//!        │                                     │
//!        └────────── Diagnostics ──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use detox_web::{by, DetoxConfig, DetoxSession, ElementActions, MockDriver};
//!
//! # async fn run() -> detox_web::DetoxResult<()> {
//! let session = DetoxSession::new(MockDriver::new(), DetoxConfig::from_env());
//! let field = session.element(&by::id("email")).await?;
//! let outcome = field.replace_text("user@example.com").await?;
//! assert!(outcome.is_clean());
//!
//! let pinch = field.pinch(2.0, detox_web::Speed::Fast, 0.0).await;
//! assert!(pinch.reported("pinch"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::float_cmp))]

mod config;
#[allow(clippy::missing_errors_doc)]
mod device;
mod diagnostic;
#[allow(clippy::missing_errors_doc)]
mod driver;
#[allow(clippy::missing_errors_doc)]
mod element;
#[allow(clippy::missing_errors_doc)]
mod expect;
#[allow(clippy::missing_errors_doc)]
mod facade;
mod launch;
mod matcher;
mod result;
mod scripts;
#[allow(clippy::missing_errors_doc)]
mod session;

/// Convenience wrappers: tap, replace text and visibility by id/text/label,
/// full reset
#[allow(clippy::missing_errors_doc)]
pub mod helpers;

/// Subscriber setup
pub mod logging;

/// In-memory [`PageDriver`] for tests
#[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
pub mod mock;

/// Locator resolution with bounded wait
#[allow(clippy::missing_errors_doc)]
pub mod resolver;

/// Chromium over CDP
#[cfg(feature = "browser")]
pub mod chromium;

#[cfg(feature = "browser")]
pub use chromium::{BrowserConfig, ChromiumDriver};
pub use config::{
    DetoxConfig, RetryPolicy, DEFAULT_BASE_URL, DEFAULT_GEOLOCATION_ACCURACY,
    DEFAULT_LONG_PRESS_DELAY_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RESOLVE_TIMEOUT_MS,
    DEFAULT_TAP_DELAY_MS, DEFAULT_TYPE_DELAY_MS, ENV_BASE_URL, ENV_SCREENSHOT_DIR,
    ENV_TIMEOUT_MS,
};
pub use device::WebDevice;
pub use diagnostic::{Diagnostic, DiagnosticKind, DiagnosticLog, Outcome};
pub use driver::{
    BoundingBox, ClickOptions, ComputedStyle, ElementHandle, GeolocationPosition, Key, PageDriver,
    Point,
};
pub use element::{Direction, DragGesture, PinchDirection, Speed, WebElement};
pub use expect::{is_visible, WebExpect};
pub use facade::{
    ByFacade, DeviceFacade, ElementActions, ExpectFacade, MatcherFacade, Orientation, Platform,
};
pub use helpers::sleep;
pub use launch::{LaunchAppConfig, LaunchArgs, Permission, PermissionState, Permissions};
pub use matcher::{
    by, LocatorDescriptor, Matcher, WebBy, LABEL_ATTRIBUTE, ROLE_ATTRIBUTE, TEST_ID_ATTRIBUTE,
};
pub use mock::{DriverEvent, MockDriver, MockNode};
pub use result::{DetoxError, DetoxResult};
pub use scripts::ScrollEdge;
pub use session::DetoxSession;

/// Everything a test file needs
pub mod prelude {
    pub use super::facade::*;
    pub use super::helpers::*;
    pub use super::{
        by, DetoxConfig, DetoxError, DetoxResult, DetoxSession, Direction, DragGesture,
        LaunchAppConfig, Outcome, PinchDirection, Point, RetryPolicy, Speed,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The web implementations satisfy the facades.
    #[test]
    fn test_facades_implemented() {
        fn by_facade<B: ByFacade>() {}
        fn actions<A: ElementActions>() {}
        fn expect<E: ExpectFacade>() {}
        fn device<F: DeviceFacade>() {}

        by_facade::<WebBy>();
        actions::<WebElement<MockDriver>>();
        expect::<WebExpect<'static, MockDriver>>();
        device::<WebDevice<MockDriver>>();
    }
}
