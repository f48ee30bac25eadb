//! JavaScript evaluated in the page.
//!
//! Element functions are called with `this` bound to the resolved node, so
//! they act on exactly the element the locator produced.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Layout box of `this`, or `null` when it is not rendered
pub const BOUNDING_BOX: &str = "function() { \
    if (this.getClientRects().length === 0) { return null; } \
    const r = this.getBoundingClientRect(); \
    return { x: r.x, y: r.y, width: r.width, height: r.height }; \
}";

/// Visibility-relevant computed style of `this`
pub const COMPUTED_STYLE: &str = "function() { \
    const s = window.getComputedStyle(this); \
    return { display: s.display, visibility: s.visibility, opacity: s.opacity }; \
}";

/// Bring `this` to the middle of the viewport before pointer input
pub const SCROLL_INTO_VIEW: &str = "function() { \
    this.scrollIntoView({ block: 'center', inline: 'center', behavior: 'instant' }); \
}";

/// Clears persisted storage; installed as an init script
pub const CLEAR_LOCAL_STORAGE: &str = "localStorage.clear();";

/// Edge of a scrollable element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScrollEdge {
    /// `scrollTop = 0`
    Top,
    /// `scrollTop = scrollHeight`
    Bottom,
    /// `scrollLeft = 0`
    Left,
    /// `scrollLeft = scrollWidth`
    Right,
}

impl fmt::Display for ScrollEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// Scroll `this` by a pixel offset
#[must_use]
pub fn scroll_by(dx: f64, dy: f64) -> String {
    format!("function() {{ this.scrollBy({dx}, {dy}); }}")
}

/// Scroll `this` to one of its edges
#[must_use]
pub fn scroll_to_edge(edge: ScrollEdge) -> String {
    let assignment = match edge {
        ScrollEdge::Top => "this.scrollTop = 0;",
        ScrollEdge::Bottom => "this.scrollTop = this.scrollHeight;",
        ScrollEdge::Left => "this.scrollLeft = 0;",
        ScrollEdge::Right => "this.scrollLeft = this.scrollWidth;",
    };
    format!("function() {{ {assignment} }}")
}
