//! Session context: one page, one device, one diagnostic log.
//!
//! ```no_run
//! use detox_web::{by, DetoxConfig, DetoxSession, ElementActions, MockDriver};
//!
//! # async fn run() -> detox_web::DetoxResult<()> {
//! let session = DetoxSession::new(MockDriver::new(), DetoxConfig::default());
//! let button = session.element(&by::id("submit-btn")).await?;
//! button.tap().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::DetoxConfig;
use crate::device::WebDevice;
use crate::diagnostic::DiagnosticLog;
use crate::driver::PageDriver;
use crate::element::WebElement;
use crate::expect::WebExpect;
use crate::matcher::{LocatorDescriptor, Matcher, WebBy};
use crate::resolver::Resolver;
use crate::result::DetoxResult;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Owns the driver and everything shared across element lookups
#[derive(Debug)]
pub struct DetoxSession<D: PageDriver> {
    driver: Arc<D>,
    config: DetoxConfig,
    diagnostics: DiagnosticLog,
    device: WebDevice<D>,
    /// Matcher diagnostics already recorded, per locator
    reported: Mutex<HashSet<(LocatorDescriptor, String)>>,
}

impl<D: PageDriver> DetoxSession<D> {
    /// Session over a driver
    #[must_use]
    pub fn new(driver: D, config: DetoxConfig) -> Self {
        Self::from_arc(Arc::new(driver), config)
    }

    /// Session over a driver shared with the caller
    #[must_use]
    pub fn from_arc(driver: Arc<D>, config: DetoxConfig) -> Self {
        let diagnostics = DiagnosticLog::new();
        let device = WebDevice::new(Arc::clone(&driver), config.clone(), diagnostics.clone());
        Self {
            driver,
            config,
            diagnostics,
            device,
            reported: Mutex::new(HashSet::new()),
        }
    }

    /// The page driver
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &DetoxConfig {
        &self.config
    }

    /// Every diagnostic raised in this session
    #[must_use]
    pub const fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    /// `device`
    #[must_use]
    pub const fn device(&self) -> &WebDevice<D> {
        &self.device
    }

    /// `device`, for lifecycle calls
    pub fn device_mut(&mut self) -> &mut WebDevice<D> {
        &mut self.device
    }

    /// `by`
    #[must_use]
    pub const fn by(&self) -> WebBy {
        WebBy
    }

    /// `element(matcher)`: resolve once, waiting up to the configured budget.
    ///
    /// Diagnostics the matcher collected while being built are recorded here,
    /// before resolution, once per session however often it is resolved.
    pub async fn element(&self, matcher: &Matcher) -> DetoxResult<WebElement<D>> {
        let descriptor = matcher.get();
        self.record_matcher_diagnostics(matcher, &descriptor);
        let handle = Resolver::new(&*self.driver, &self.config)
            .resolve(&descriptor)
            .await?;
        Ok(WebElement::new(
            Arc::clone(&self.driver),
            handle,
            descriptor,
            self.config.clone(),
            self.diagnostics.clone(),
        ))
    }

    fn record_matcher_diagnostics(&self, matcher: &Matcher, descriptor: &LocatorDescriptor) {
        let mut reported = self.reported.lock().unwrap_or_else(PoisonError::into_inner);
        for diagnostic in matcher.diagnostics() {
            if reported.insert((descriptor.clone(), diagnostic.to_string())) {
                self.diagnostics.record(diagnostic.clone());
            }
        }
    }

    /// `expect(element)`
    #[must_use]
    pub const fn expect<'a>(&self, element: &'a WebElement<D>) -> WebExpect<'a, D> {
        WebExpect::new(element)
    }

    /// `expect` over a resolution that may have failed
    #[must_use]
    pub fn expect_resolution<'a>(
        &self,
        resolution: &'a DetoxResult<WebElement<D>>,
    ) -> WebExpect<'a, D> {
        WebExpect::from_resolution(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::{ByFacade, ExpectFacade};
    use crate::matcher::by;
    use crate::mock::{MockDriver, MockNode};

    fn session(driver: MockDriver) -> DetoxSession<MockDriver> {
        DetoxSession::new(driver, DetoxConfig::default())
    }

    mod element_tests {
        use super::*;

        #[tokio::test]
        async fn test_element_resolves_fresh_each_call() {
            let s = session(MockDriver::new().with_node(MockNode::new("button").test_id("b")));
            let first = s.element(&by::id("b")).await.unwrap();
            let second = s.element(&by::id("b")).await.unwrap();
            assert_eq!(first.handle(), second.handle());
            assert_eq!(s.driver().query_count(), 2);
        }

        #[tokio::test]
        async fn test_matcher_diagnostics_recorded() {
            let s = session(MockDriver::new().with_node(MockNode::new("p").text("Hi")));
            let matcher = s.by().text("Hi").with_ancestor(by::id("card"));
            s.element(&matcher).await.unwrap();
            assert!(s.diagnostics().contains_operation("withAncestor"));
        }

        #[tokio::test]
        async fn test_matcher_diagnostics_recorded_once_across_resolutions() {
            let s = session(
                MockDriver::new()
                    .with_node(MockNode::new("p").text("Hi"))
                    .with_node(MockNode::new("p").text("Bye")),
            );
            let hi = by::text("Hi").with_ancestor(by::id("card"));
            s.element(&hi).await.unwrap();
            s.element(&hi).await.unwrap();
            s.element(&hi.clone()).await.unwrap();
            assert_eq!(s.diagnostics().len(), 1);

            let bye = by::text("Bye").with_ancestor(by::id("card"));
            s.element(&bye).await.unwrap();
            assert_eq!(s.diagnostics().len(), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_expect_on_failed_resolution() {
            let s = session(MockDriver::new());
            let resolution = s.element(&by::id("nope")).await;
            let expect = s.expect_resolution(&resolution);
            assert!(!expect.to_exist());
            assert!(!expect.to_be_visible().await.unwrap());
        }

        #[tokio::test]
        async fn test_device_shares_log() {
            use crate::facade::DeviceFacade;
            let mut s = session(MockDriver::new());
            s.device_mut().shake().await;
            assert!(s.diagnostics().contains_operation("shake"));
        }
    }
}
