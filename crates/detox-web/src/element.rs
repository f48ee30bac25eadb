//! Element action layer.
//!
//! Maps the Detox gesture vocabulary onto mouse, keyboard and script
//! primitives of a [`PageDriver`].
//!
//! | Action | Web translation |
//! |---|---|
//! | `tap` | click held for the tap delay |
//! | `multi_tap(n)` | click with click count `n` |
//! | `long_press` | click held for the long press delay |
//! | `type_text` | one character-input event per character |
//! | `replace_text` | triple click, then type character by character |
//! | `clear_text` | triple click, then one backspace key press |
//! | `tap_return_key` / `tap_backspace_key` | key press on the page |
//! | `scroll` | `scrollBy` on the element (up/down only) |
//! | `scroll_to` | `scrollTop`/`scrollLeft` to 0 or max |
//! | `tap_at_point` | click at box origin + offset |
//! | `swipe`, `pinch*`, `set_column_to_value`, `set_date_picker_date` | unsupported |
//! | `long_press_and_drag` | unsupported; degrades to a held click |

use crate::config::DetoxConfig;
use crate::diagnostic::{Diagnostic, DiagnosticLog, Outcome};
use crate::driver::{ClickOptions, ElementHandle, Key, PageDriver, Point};
use crate::facade::ElementActions;
use crate::matcher::LocatorDescriptor;
use crate::result::{DetoxError, DetoxResult};
use crate::scripts::{self, ScrollEdge};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Gesture direction, also used to name scroll edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Up
    Up,
    /// Down
    Down,
    /// Left
    Left,
    /// Right
    Right,
    /// Top edge
    Top,
    /// Bottom edge
    Bottom,
}

impl Direction {
    fn as_edge(self) -> Option<ScrollEdge> {
        match self {
            Self::Top => Some(ScrollEdge::Top),
            Self::Bottom => Some(ScrollEdge::Bottom),
            Self::Left => Some(ScrollEdge::Left),
            Self::Right => Some(ScrollEdge::Right),
            Self::Up | Self::Down => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
        })
    }
}

/// Gesture speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    /// Fast
    Fast,
    /// Slow
    Slow,
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fast => "fast",
            Self::Slow => "slow",
        })
    }
}

/// Pinch direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinchDirection {
    /// Fingers move apart
    Outward,
    /// Fingers move together
    Inward,
}

impl fmt::Display for PinchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Outward => "outward",
            Self::Inward => "inward",
        })
    }
}

/// Parameters of a long-press-and-drag gesture. Positions are normalized
/// to the element size (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragGesture {
    /// Press duration before dragging, in milliseconds
    pub duration_ms: u64,
    /// Start position on the dragged element
    pub start: Point,
    /// Drop position on the target element
    pub target: Point,
    /// Drag speed
    pub speed: Speed,
    /// Hold at the drop position, in milliseconds
    pub hold_duration_ms: u64,
}

impl Default for DragGesture {
    fn default() -> Self {
        Self {
            duration_ms: 1000,
            start: Point::new(0.5, 0.5),
            target: Point::new(0.5, 0.5),
            speed: Speed::Fast,
            hold_duration_ms: 1000,
        }
    }
}

fn or_default<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "default".to_string(), |v| v.to_string())
}

/// A resolved element exposing the action vocabulary.
///
/// Holds exactly one handle; resolve again (via the session) after the DOM
/// changes.
#[derive(Debug)]
pub struct WebElement<D: PageDriver> {
    driver: Arc<D>,
    handle: ElementHandle,
    descriptor: LocatorDescriptor,
    config: DetoxConfig,
    diagnostics: DiagnosticLog,
}

impl<D: PageDriver> WebElement<D> {
    pub(crate) fn new(
        driver: Arc<D>,
        handle: ElementHandle,
        descriptor: LocatorDescriptor,
        config: DetoxConfig,
        diagnostics: DiagnosticLog,
    ) -> Self {
        Self {
            driver,
            handle,
            descriptor,
            config,
            diagnostics,
        }
    }

    /// Underlying node reference
    #[must_use]
    pub const fn handle(&self) -> &ElementHandle {
        &self.handle
    }

    /// Locator this element was resolved from
    #[must_use]
    pub const fn descriptor(&self) -> &LocatorDescriptor {
        &self.descriptor
    }

    pub(crate) fn driver(&self) -> &D {
        &self.driver
    }

    fn report(&self, diagnostic: Diagnostic) -> Outcome<()> {
        self.diagnostics.record(diagnostic.clone());
        Outcome::with_diagnostic((), diagnostic)
    }

    fn unsupported(&self, operation: String) -> Outcome<()> {
        self.report(Diagnostic::unsupported(operation))
    }

    async fn click(&self, options: ClickOptions) -> DetoxResult<()> {
        tracing::debug!(locator = %self.descriptor, click_count = options.click_count, "click");
        self.driver.click(&self.handle, options).await
    }

    async fn select_all(&self) -> DetoxResult<()> {
        self.click(ClickOptions::count(3)).await
    }
}

#[async_trait]
impl<D: PageDriver> ElementActions for WebElement<D> {
    async fn tap(&self) -> DetoxResult<Outcome<()>> {
        self.click(ClickOptions::held(self.config.tap_delay())).await?;
        Ok(Outcome::ok(()))
    }

    async fn multi_tap(&self, times: u32) -> DetoxResult<Outcome<()>> {
        if times > 0 {
            self.click(ClickOptions::count(times)).await?;
        }
        Ok(Outcome::ok(()))
    }

    async fn tap_at_point(&self, point: Point) -> DetoxResult<Outcome<()>> {
        let bbox = self
            .driver
            .bounding_box(&self.handle)
            .await?
            .ok_or_else(|| DetoxError::NotRendered {
                locator: self.descriptor.to_string(),
            })?;
        let origin = bbox.origin();
        self.driver
            .mouse_click(origin.x + point.x, origin.y + point.y)
            .await?;
        Ok(Outcome::ok(()))
    }

    async fn long_press(&self) -> DetoxResult<Outcome<()>> {
        self.click(ClickOptions::held(self.config.long_press_delay()))
            .await?;
        Ok(Outcome::ok(()))
    }

    async fn long_press_and_drag(&self, target: &Self, gesture: DragGesture) -> Outcome<()> {
        let mut outcome = self.unsupported(format!(
            "longPressAndDrag({}, {}, {}, {}, {}, {}, {}, {})",
            gesture.duration_ms,
            gesture.start.x,
            gesture.start.y,
            target.descriptor,
            gesture.target.x,
            gesture.target.y,
            gesture.speed,
            gesture.hold_duration_ms
        ));
        let hold = Duration::from_millis(gesture.hold_duration_ms);
        if let Err(e) = self.click(ClickOptions::held(hold)).await {
            let degraded = Diagnostic::degraded("longPressAndDrag()", e.to_string());
            outcome.absorb(self.report(degraded));
        }
        outcome
    }

    async fn type_text(&self, text: &str) -> DetoxResult<Outcome<()>> {
        for ch in text.chars() {
            self.driver.send_character(ch).await?;
        }
        Ok(Outcome::ok(()))
    }

    async fn replace_text(&self, text: &str) -> DetoxResult<Outcome<()>> {
        self.select_all().await?;
        let delay = self.config.type_delay();
        for ch in text.chars() {
            self.driver.type_character(&self.handle, ch).await?;
            tokio::time::sleep(delay).await;
        }
        Ok(Outcome::ok(()))
    }

    /// Triple click, then a page-level Backspace. Typing an empty string
    /// into the selection dispatches no input at all, so the literal
    /// "select, type nothing" translation would leave the text in place.
    /// Page key listeners see the one extra `keydown`/`keyup` pair.
    async fn clear_text(&self) -> DetoxResult<Outcome<()>> {
        self.select_all().await?;
        self.driver.press_key(Key::Backspace).await?;
        Ok(Outcome::ok(()))
    }

    async fn tap_return_key(&self) -> DetoxResult<Outcome<()>> {
        self.driver.press_key(Key::Enter).await?;
        Ok(Outcome::ok(()))
    }

    async fn tap_backspace_key(&self) -> DetoxResult<Outcome<()>> {
        self.driver.press_key(Key::Backspace).await?;
        Ok(Outcome::ok(()))
    }

    async fn scroll(
        &self,
        offset: f64,
        direction: Direction,
        start_x: Option<f64>,
        start_y: Option<f64>,
    ) -> DetoxResult<Outcome<()>> {
        let mut outcome = Outcome::ok(());
        if start_x.is_some() || start_y.is_some() {
            outcome.absorb(self.unsupported(
                "scroll() with startPositionX and/or startPositionY".to_string(),
            ));
        }

        let dy = match direction {
            Direction::Up => -offset,
            Direction::Down => offset,
            other => {
                outcome.absorb(self.unsupported(format!("scroll({offset}, {other})")));
                return Ok(outcome);
            }
        };
        self.driver
            .call_on(&self.handle, &scripts::scroll_by(0.0, dy))
            .await?;
        Ok(outcome)
    }

    async fn scroll_to(&self, edge: Direction) -> DetoxResult<Outcome<()>> {
        let Some(edge) = edge.as_edge() else {
            return Ok(self.unsupported(format!("scrollTo({edge})")));
        };
        self.driver
            .call_on(&self.handle, &scripts::scroll_to_edge(edge))
            .await?;
        Ok(Outcome::ok(()))
    }

    async fn swipe(
        &self,
        direction: Direction,
        speed: Option<Speed>,
        percentage: Option<f64>,
        start_x: Option<f64>,
        start_y: Option<f64>,
    ) -> Outcome<()> {
        self.unsupported(format!(
            "swipe({direction}, {}, {}, {}, {})",
            or_default(speed),
            or_default(percentage),
            or_default(start_x),
            or_default(start_y)
        ))
    }

    async fn set_column_to_value(&self, column: u32, value: &str) -> Outcome<()> {
        self.unsupported(format!("setColumnToValue({column}, {value})"))
    }

    async fn set_date_picker_date(&self, date: &str, format: &str) -> Outcome<()> {
        self.unsupported(format!("setDatePickerDate({date}, {format})"))
    }

    async fn pinch_with_angle(
        &self,
        direction: PinchDirection,
        speed: Speed,
        angle: f64,
    ) -> Outcome<()> {
        self.unsupported(format!("pinchWithAngle({direction}, {speed}, {angle})"))
    }

    async fn pinch(&self, scale: f64, speed: Speed, angle: f64) -> Outcome<()> {
        self.unsupported(format!("pinch({scale}, {speed}, {angle})"))
    }
}
