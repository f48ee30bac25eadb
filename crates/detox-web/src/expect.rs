//! Assertions on resolved elements.

use crate::driver::{BoundingBox, ComputedStyle, PageDriver};
use crate::element::WebElement;
use crate::facade::ExpectFacade;
use crate::result::DetoxResult;
use async_trait::async_trait;

/// Visibility rule: not `display: none`, not `visibility: hidden`, not fully
/// transparent, and laid out with a non-empty box.
#[must_use]
pub fn is_visible(style: &ComputedStyle, bbox: Option<&BoundingBox>) -> bool {
    let transparent = style.opacity.trim() == "0"
        || style
            .opacity
            .trim()
            .parse::<f64>()
            .is_ok_and(|opacity| opacity <= 0.0);

    style.display != "none"
        && style.visibility != "hidden"
        && !transparent
        && bbox.is_some_and(BoundingBox::has_area)
}

/// `expect(element)`.
///
/// Built from the element a resolution produced, or from nothing when
/// resolution failed, so `to_exist` can answer either way.
#[derive(Debug)]
pub struct WebExpect<'a, D: PageDriver> {
    element: Option<&'a WebElement<D>>,
}

impl<'a, D: PageDriver> WebExpect<'a, D> {
    /// Expectation on a resolved element
    #[must_use]
    pub const fn new(element: &'a WebElement<D>) -> Self {
        Self {
            element: Some(element),
        }
    }

    /// Expectation on a failed resolution
    #[must_use]
    pub const fn missing() -> Self {
        Self { element: None }
    }

    /// Expectation on a resolution result
    #[must_use]
    pub fn from_resolution(result: &'a DetoxResult<WebElement<D>>) -> Self {
        Self {
            element: result.as_ref().ok(),
        }
    }
}

#[async_trait]
impl<D: PageDriver> ExpectFacade for WebExpect<'_, D> {
    fn to_exist(&self) -> bool {
        self.element.is_some()
    }

    async fn to_be_visible(&self) -> DetoxResult<bool> {
        let Some(element) = self.element else {
            return Ok(false);
        };
        let driver = element.driver();
        let style = driver.computed_style(element.handle()).await?;
        let bbox = driver.bounding_box(element.handle()).await?;
        let visible = is_visible(&style, bbox.as_ref());
        tracing::debug!(locator = %element.descriptor(), visible, "visibility checked");
        Ok(visible)
    }
}
