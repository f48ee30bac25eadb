//! Detox-shaped facades.
//!
//! Test code written against these traits runs unchanged on any platform
//! that implements them. The web implementations ([`crate::WebBy`],
//! [`crate::WebElement`], [`crate::WebExpect`], [`crate::WebDevice`]) are
//! checked against them at compile time.
//!
//! Operations that can never fail on web return a bare [`Outcome`] rather
//! than a `Result`: unsupported gestures always resolve.

use crate::diagnostic::Outcome;
use crate::driver::Point;
use crate::element::{Direction, DragGesture, PinchDirection, Speed};
use crate::launch::{LaunchAppConfig, LaunchArgs};
use crate::matcher::LocatorDescriptor;
use crate::result::DetoxResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Composable matcher (`by.id(..).withAncestor(..)`)
pub trait MatcherFacade: Sized {
    /// Both matchers must hold
    fn and(self, other: Self) -> Self;
    /// Restrict to elements inside `parent`
    fn with_ancestor(self, parent: Self) -> Self;
    /// Restrict to elements containing `child`
    fn with_descendant(self, child: Self) -> Self;
    /// Serializable locator
    fn get(&self) -> LocatorDescriptor;
}

/// Matcher factory (`by`)
pub trait ByFacade {
    /// Matcher type produced
    type Matcher: MatcherFacade;

    /// Match by test id
    fn id(&self, id: &str) -> Self::Matcher;
    /// Match by exact text
    fn text(&self, text: &str) -> Self::Matcher;
    /// Match by accessibility label
    fn label(&self, label: &str) -> Self::Matcher;
    /// Match by native view type
    fn r#type(&self, native_view_type: &str) -> Self::Matcher;
    /// Match by accessibility traits
    fn traits(&self, traits: &[&str]) -> Self::Matcher;
}

/// The element action vocabulary
#[async_trait]
pub trait ElementActions: Send + Sync {
    /// Single tap
    async fn tap(&self) -> DetoxResult<Outcome<()>>;
    /// `times` taps in one gesture
    async fn multi_tap(&self, times: u32) -> DetoxResult<Outcome<()>>;
    /// Tap at an offset from the element's top-left corner
    async fn tap_at_point(&self, point: Point) -> DetoxResult<Outcome<()>>;
    /// Long press
    async fn long_press(&self) -> DetoxResult<Outcome<()>>;
    /// Long press then drag onto `target`
    async fn long_press_and_drag(&self, target: &Self, gesture: DragGesture) -> Outcome<()>
    where
        Self: Sized;
    /// Type text character by character
    async fn type_text(&self, text: &str) -> DetoxResult<Outcome<()>>;
    /// Replace the current content with `text`
    async fn replace_text(&self, text: &str) -> DetoxResult<Outcome<()>>;
    /// Remove the current content
    async fn clear_text(&self) -> DetoxResult<Outcome<()>>;
    /// Press return on the focused element
    async fn tap_return_key(&self) -> DetoxResult<Outcome<()>>;
    /// Press backspace on the focused element
    async fn tap_backspace_key(&self) -> DetoxResult<Outcome<()>>;
    /// Scroll by `offset` pixels
    async fn scroll(
        &self,
        offset: f64,
        direction: Direction,
        start_x: Option<f64>,
        start_y: Option<f64>,
    ) -> DetoxResult<Outcome<()>>;
    /// Scroll to an edge
    async fn scroll_to(&self, edge: Direction) -> DetoxResult<Outcome<()>>;
    /// Swipe gesture
    async fn swipe(
        &self,
        direction: Direction,
        speed: Option<Speed>,
        percentage: Option<f64>,
        start_x: Option<f64>,
        start_y: Option<f64>,
    ) -> Outcome<()>;
    /// Picker column selection
    async fn set_column_to_value(&self, column: u32, value: &str) -> Outcome<()>;
    /// Date picker selection
    async fn set_date_picker_date(&self, date: &str, format: &str) -> Outcome<()>;
    /// Pinch with direction and angle
    async fn pinch_with_angle(
        &self,
        direction: PinchDirection,
        speed: Speed,
        angle: f64,
    ) -> Outcome<()>;
    /// Pinch to a scale
    async fn pinch(&self, scale: f64, speed: Speed, angle: f64) -> Outcome<()>;
}

/// Assertions on a resolved element (`expect(el)`)
#[async_trait]
pub trait ExpectFacade: Send + Sync {
    /// An element was obtained
    fn to_exist(&self) -> bool;
    /// The element is rendered and not hidden
    async fn to_be_visible(&self) -> DetoxResult<bool>;
}

/// Platform reported by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Android device
    Android,
    /// iOS device
    Ios,
    /// Browser
    Web,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Web => "web",
        })
    }
}

/// Device orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Portrait
    Portrait,
    /// Landscape
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        })
    }
}

/// The device facade
#[async_trait]
pub trait DeviceFacade: Send + Sync {
    /// Device id
    fn id(&self) -> &str;
    /// Device name
    fn name(&self) -> &str;
    /// Platform
    fn platform(&self) -> Platform;
    /// Current launch arguments
    fn app_launch_args(&self) -> &LaunchArgs;
    /// Mutable launch arguments (`reset`, `merge`)
    fn app_launch_args_mut(&mut self) -> &mut LaunchArgs;

    /// Launch (or relaunch) the app
    async fn launch_app(&mut self, config: LaunchAppConfig) -> DetoxResult<Outcome<()>>;
    /// Switch to another app
    async fn select_app(&mut self, name: &str) -> Outcome<()>;
    /// Terminate the app
    async fn terminate_app(&mut self, bundle: Option<&str>) -> Outcome<()>;
    /// Background the app
    async fn send_to_home(&mut self) -> DetoxResult<Outcome<()>>;
    /// Reload the app's JS bundle
    async fn reload_app(&mut self) -> DetoxResult<Outcome<()>>;
    /// Install an app binary
    async fn install_app(&mut self, path: Option<&str>) -> Outcome<()>;
    /// Uninstall the app
    async fn uninstall_app(&mut self, bundle: Option<&str>) -> DetoxResult<Outcome<()>>;
    /// Open a URL through the OS
    async fn open_url(&mut self, url: &str, source_app: Option<&str>) -> Outcome<()>;
    /// Deliver a user notification
    async fn send_user_notification(&mut self, payload: &serde_json::Value) -> Outcome<()>;
    /// Deliver a user activity
    async fn send_user_activity(&mut self, payload: &serde_json::Value) -> Outcome<()>;
    /// Rotate the device
    async fn set_orientation(&mut self, orientation: Orientation) -> Outcome<()>;
    /// Override geolocation
    async fn set_location(&mut self, latitude: f64, longitude: f64)
        -> DetoxResult<Outcome<()>>;
    /// Block URLs from synchronization
    async fn set_url_blacklist(&mut self, urls: &[&str]) -> Outcome<()>;
    /// Enable idle synchronization
    async fn enable_synchronization(&mut self) -> Outcome<()>;
    /// Disable idle synchronization
    async fn disable_synchronization(&mut self) -> Outcome<()>;
    /// Wipe persisted app data
    async fn reset_content_and_settings(&mut self) -> DetoxResult<Outcome<()>>;
    /// Screenshot; `None` when capture fails
    async fn take_screenshot(&mut self, name: &str) -> Outcome<Option<PathBuf>>;
    /// Shake gesture
    async fn shake(&mut self) -> Outcome<()>;
    /// Biometric enrollment
    async fn set_biometric_enrollment(&mut self, enrolled: bool) -> Outcome<()>;
    /// Successful face match
    async fn match_face(&mut self) -> Outcome<()>;
    /// Failed face match
    async fn unmatch_face(&mut self) -> Outcome<()>;
    /// Successful fingerprint match
    async fn match_finger(&mut self) -> Outcome<()>;
    /// Failed fingerprint match
    async fn unmatch_finger(&mut self) -> Outcome<()>;
    /// Clear the keychain
    async fn clear_keychain(&mut self) -> Outcome<()>;
    /// Hardware back
    async fn press_back(&mut self) -> DetoxResult<Outcome<()>>;
    /// Native UI device access
    async fn get_ui_device(&mut self) -> Outcome<()>;
}
