//! PageDriver - the browser-automation seam.
//!
//! Everything the element, expect and device facades need from a live page
//! goes through this trait, so the facades can run against chromium or
//! against the in-memory [`crate::MockDriver`].
//!
//! # Implementations
//!
//! - `ChromiumDriver` - CDP via chromiumoxide (feature `browser`)
//! - [`crate::MockDriver`] - in-memory DOM for unit and integration tests

use crate::launch::Permission;
use crate::result::{DetoxError, DetoxResult};
use crate::scripts;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A point in page or element coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Element geometry relative to the viewport
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top-left corner
    #[must_use]
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Center point
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the box covers any area
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Reference to one live DOM node.
///
/// Never cached across actions: the DOM may change between calls, so each
/// `element()` call resolves afresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-specific node reference (CDP remote object id, mock node id)
    pub id: String,
    /// Locator the handle was resolved from, for messages
    pub locator: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            locator: locator.into(),
        }
    }
}

/// Subset of the computed style used by the visibility rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedStyle {
    /// CSS `display`
    pub display: String,
    /// CSS `visibility`
    pub visibility: String,
    /// CSS `opacity`, as the browser serializes it
    pub opacity: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: "1".to_string(),
        }
    }
}

impl ComputedStyle {
    /// `display: none`
    #[must_use]
    pub fn hidden_by_display() -> Self {
        Self {
            display: "none".to_string(),
            ..Self::default()
        }
    }

    /// `visibility: hidden`
    #[must_use]
    pub fn hidden_by_visibility() -> Self {
        Self {
            visibility: "hidden".to_string(),
            ..Self::default()
        }
    }

    /// `opacity: 0`
    #[must_use]
    pub fn transparent() -> Self {
        Self {
            opacity: "0".to_string(),
            ..Self::default()
        }
    }
}

/// Mouse click parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOptions {
    /// Click count reported with the press (2 = double click, 3 = triple)
    pub click_count: u32,
    /// Time between press and release
    pub delay: Duration,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            click_count: 1,
            delay: Duration::ZERO,
        }
    }
}

impl ClickOptions {
    /// Single click held for `delay`
    #[must_use]
    pub const fn held(delay: Duration) -> Self {
        Self {
            click_count: 1,
            delay,
        }
    }

    /// Click with a given click count
    #[must_use]
    pub const fn count(click_count: u32) -> Self {
        Self {
            click_count,
            delay: Duration::ZERO,
        }
    }
}

/// Keys the action layer presses on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Return / Enter
    Enter,
    /// Backspace
    Backspace,
}

impl Key {
    /// DOM `key` value
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Enter => "Enter",
            Self::Backspace => "Backspace",
        }
    }

    /// DOM `code` value
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.key()
    }

    /// Windows virtual key code
    #[must_use]
    pub const fn key_code(&self) -> i64 {
        match self {
            Self::Enter => 13,
            Self::Backspace => 8,
        }
    }

    /// Text the key inserts, if any
    #[must_use]
    pub const fn text(&self) -> Option<&'static str> {
        match self {
            Self::Enter => Some("\r"),
            Self::Backspace => None,
        }
    }
}

/// Geolocation override
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeolocationPosition {
    /// Latitude in decimal degrees (-90.0 to 90.0)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180.0 to 180.0)
    pub longitude: f64,
    /// Accuracy in meters
    pub accuracy: f64,
}

impl GeolocationPosition {
    /// Create a position, rejecting out-of-range coordinates
    pub fn try_new(latitude: f64, longitude: f64, accuracy: f64) -> DetoxResult<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(DetoxError::InputError {
                message: format!("latitude {latitude} outside -90..=90"),
            });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(DetoxError::InputError {
                message: format!("longitude {longitude} outside -180..=180"),
            });
        }
        if accuracy.is_nan() || accuracy < 0.0 {
            return Err(DetoxError::InputError {
                message: format!("accuracy {accuracy} must be non-negative"),
            });
        }
        Ok(Self {
            latitude,
            longitude,
            accuracy,
        })
    }
}

/// Browser primitives consumed by the facades.
///
/// Every method is an awaited round-trip to the page. Callers issue them
/// strictly one after another.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Short driver name, reported as the device id
    fn name(&self) -> &str;

    /// Navigate to URL
    async fn goto(&self, url: &str) -> DetoxResult<()>;

    /// Reload the current page
    async fn reload(&self) -> DetoxResult<()>;

    /// Go back in history
    async fn go_back(&self) -> DetoxResult<()>;

    /// Run `script` in every new document before page scripts
    async fn add_init_script(&self, script: &str) -> DetoxResult<()>;

    /// First element matching a CSS selector, if any
    async fn query_selector(&self, selector: &str) -> DetoxResult<Option<ElementHandle>>;

    /// First node matching an XPath expression, if any
    async fn query_xpath(&self, xpath: &str) -> DetoxResult<Option<ElementHandle>>;

    /// Mouse click at the element's center, scrolling it into view first
    async fn click(&self, element: &ElementHandle, options: ClickOptions) -> DetoxResult<()>;

    /// Mouse click at viewport coordinates
    async fn mouse_click(&self, x: f64, y: f64) -> DetoxResult<()>;

    /// Dispatch a single character-input event to the page
    async fn send_character(&self, ch: char) -> DetoxResult<()>;

    /// Type one character into the element as key down / input / key up
    async fn type_character(&self, element: &ElementHandle, ch: char) -> DetoxResult<()>;

    /// Press and release a key on the page
    async fn press_key(&self, key: Key) -> DetoxResult<()>;

    /// Call `function` with `this` bound to the element, returning its JSON value
    async fn call_on(
        &self,
        element: &ElementHandle,
        function: &str,
    ) -> DetoxResult<serde_json::Value>;

    /// Scroll the element into the viewport so pointer input at its box hits it
    async fn scroll_into_view(&self, element: &ElementHandle) -> DetoxResult<()> {
        self.call_on(element, scripts::SCROLL_INTO_VIEW).await?;
        Ok(())
    }

    /// Layout box, `None` when the element is not rendered
    async fn bounding_box(&self, element: &ElementHandle) -> DetoxResult<Option<BoundingBox>> {
        let value = self.call_on(element, scripts::BOUNDING_BOX).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Computed style of the element
    async fn computed_style(&self, element: &ElementHandle) -> DetoxResult<ComputedStyle> {
        let value = self.call_on(element, scripts::COMPUTED_STYLE).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> DetoxResult<Vec<u8>>;

    /// Override the reported geolocation
    async fn set_geolocation(&self, position: GeolocationPosition) -> DetoxResult<()>;

    /// Grant permissions for an origin
    async fn grant_permissions(&self, origin: &str, permissions: &[Permission])
        -> DetoxResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    mod geometry_tests {
        use super::*;

        #[test]
        fn test_bounding_box_origin_and_center() {
            let b = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
            assert_eq!(b.origin(), Point::new(10.0, 20.0));
            assert_eq!(b.center(), Point::new(60.0, 45.0));
        }

        #[test]
        fn test_zero_size_has_no_area() {
            assert!(!BoundingBox::new(5.0, 5.0, 0.0, 10.0).has_area());
            assert!(!BoundingBox::new(5.0, 5.0, 10.0, 0.0).has_area());
            assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).has_area());
        }

        #[test]
        fn test_bounding_box_from_null() {
            let b: Option<BoundingBox> = serde_json::from_value(serde_json::Value::Null).unwrap();
            assert!(b.is_none());
        }
    }

    mod key_tests {
        use super::*;

        #[test]
        fn test_enter() {
            assert_eq!(Key::Enter.key(), "Enter");
            assert_eq!(Key::Enter.key_code(), 13);
            assert_eq!(Key::Enter.text(), Some("\r"));
        }

        #[test]
        fn test_backspace() {
            assert_eq!(Key::Backspace.code(), "Backspace");
            assert_eq!(Key::Backspace.key_code(), 8);
            assert!(Key::Backspace.text().is_none());
        }
    }

    mod click_options_tests {
        use super::*;

        #[test]
        fn test_default_is_single_click() {
            let o = ClickOptions::default();
            assert_eq!(o.click_count, 1);
            assert_eq!(o.delay, Duration::ZERO);
        }

        #[test]
        fn test_held_and_count() {
            assert_eq!(ClickOptions::held(Duration::from_millis(600)).click_count, 1);
            assert_eq!(ClickOptions::count(3).click_count, 3);
        }
    }

    mod geolocation_tests {
        use super::*;

        #[test]
        fn test_valid_position() {
            let p = GeolocationPosition::try_new(51.5, -0.12, 100.0).unwrap();
            assert_eq!(p.latitude, 51.5);
        }

        #[test]
        fn test_out_of_range_rejected() {
            assert!(GeolocationPosition::try_new(91.0, 0.0, 1.0).is_err());
            assert!(GeolocationPosition::try_new(0.0, -181.0, 1.0).is_err());
            assert!(GeolocationPosition::try_new(0.0, 0.0, -1.0).is_err());
        }
    }

    mod scroll_into_view_tests {
        use super::*;
        use crate::mock::{DriverEvent, MockDriver, MockNode};

        #[tokio::test]
        async fn test_calls_scroll_into_view_on_the_element() {
            let driver = MockDriver::new()
                .with_node(MockNode::new("footer"))
                .with_node(MockNode::new("button").test_id("below-fold"));
            let handle = ElementHandle::new(driver.node_id(1), "css=[data-testid='below-fold']");

            driver.scroll_into_view(&handle).await.unwrap();

            assert_eq!(
                driver.events(),
                vec![DriverEvent::CallOn {
                    node: driver.node_id(1),
                    function: scripts::SCROLL_INTO_VIEW.to_string(),
                }]
            );
            assert!(scripts::SCROLL_INTO_VIEW.contains("block: 'center'"));
        }

        #[tokio::test]
        async fn test_detached_element_is_an_error() {
            let driver = MockDriver::new().with_node(MockNode::new("button"));
            let handle = ElementHandle::new(driver.node_id(0), "css=button");
            driver.detach(0);
            assert!(driver.scroll_into_view(&handle).await.is_err());
        }
    }

    mod style_tests {
        use super::*;

        #[test]
        fn test_style_json_shape() {
            let s: ComputedStyle = serde_json::from_value(serde_json::json!({
                "display": "flex", "visibility": "visible", "opacity": "0.5"
            }))
            .unwrap();
            assert_eq!(s.display, "flex");
            assert_eq!(s.opacity, "0.5");
        }
    }
}
