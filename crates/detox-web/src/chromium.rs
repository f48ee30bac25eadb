//! Chromium over CDP.
//!
//! Element handles are CDP remote object ids obtained from
//! `Runtime.evaluate` with `returnByValue: false`; element functions run via
//! `Runtime.callFunctionOn` against that id.

#![allow(
    clippy::missing_errors_doc,
    clippy::significant_drop_tightening,
    clippy::redundant_closure_for_method_calls
)]

use crate::driver::{ClickOptions, ElementHandle, GeolocationPosition, Key, PageDriver};
use crate::launch::Permission;
use crate::result::{DetoxError, DetoxResult};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::{GrantPermissionsParams, PermissionType};
use chromiumoxide::cdp::browser_protocol::emulation::SetGeolocationOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat, CaptureScreenshotParams,
    GetNavigationHistoryParams, NavigateToHistoryEntryParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{
    CallFunctionOnParams, EvaluateParams, RemoteObject, RemoteObjectId,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use tokio::sync::Mutex;

const FOCUS: &str = "function() { this.focus(); }";

/// Browser launch options
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run without a window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

fn page_error(e: impl ToString) -> DetoxError {
    DetoxError::PageError {
        message: e.to_string(),
    }
}

fn input_error(e: impl ToString) -> DetoxError {
    DetoxError::InputError {
        message: e.to_string(),
    }
}

fn eval_error(e: impl ToString) -> DetoxError {
    DetoxError::EvaluationError {
        message: e.to_string(),
    }
}

const fn permission_type(permission: Permission) -> PermissionType {
    match permission {
        Permission::Camera => PermissionType::VideoCapture,
        Permission::Microphone => PermissionType::AudioCapture,
        Permission::Notifications => PermissionType::Notifications,
        Permission::Location => PermissionType::Geolocation,
        Permission::Clipboard => PermissionType::ClipboardReadWrite,
    }
}

/// One chromium page driven over CDP
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Mutex<CdpBrowser>,
    page: CdpPage,
    handler: tokio::task::JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch chromium and open a blank page
    pub async fn launch(config: BrowserConfig) -> DetoxResult<Self> {
        let mut builder = CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|message| DetoxError::BrowserLaunchError { message })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| DetoxError::BrowserLaunchError {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(page_error)?;
        tracing::info!(headless = config.headless, "chromium launched");
        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }

    /// Close the browser
    pub async fn close(self) -> DetoxResult<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| DetoxError::BrowserLaunchError {
                message: e.to_string(),
            })?;
        self.handler.abort();
        Ok(())
    }

    /// Evaluate `expression` and keep the result as a remote object
    async fn evaluate_handle(
        &self,
        expression: String,
        locator: &str,
    ) -> DetoxResult<Option<ElementHandle>> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .return_by_value(false)
            .build()
            .map_err(eval_error)?;
        let response = self.page.execute(params).await.map_err(page_error)?;
        if let Some(exception) = &response.result.exception_details {
            return Err(DetoxError::InvalidSelector {
                selector: locator.to_string(),
                message: exception.text.clone(),
            });
        }
        Ok(response
            .result
            .result
            .object_id
            .as_ref()
            .map(|id| ElementHandle::new(id.inner().clone(), locator)))
    }

    async fn dispatch_mouse(
        &self,
        kind: DispatchMouseEventType,
        x: f64,
        y: f64,
        click_count: u32,
    ) -> DetoxResult<()> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(i64::from(click_count))
            .build()
            .map_err(input_error)?;
        self.page.execute(params).await.map_err(input_error)?;
        Ok(())
    }

    async fn click_at(&self, x: f64, y: f64, options: ClickOptions) -> DetoxResult<()> {
        self.dispatch_mouse(DispatchMouseEventType::MouseMoved, x, y, 0)
            .await?;
        self.dispatch_mouse(DispatchMouseEventType::MousePressed, x, y, options.click_count)
            .await?;
        if !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
        self.dispatch_mouse(DispatchMouseEventType::MouseReleased, x, y, options.click_count)
            .await
    }

    async fn dispatch_key(
        &self,
        kind: DispatchKeyEventType,
        key: &str,
        code: &str,
        key_code: i64,
        text: Option<&str>,
    ) -> DetoxResult<()> {
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key(key)
            .code(code)
            .windows_virtual_key_code(key_code);
        if let Some(text) = text {
            builder = builder.text(text);
        }
        let params = builder.build().map_err(input_error)?;
        self.page.execute(params).await.map_err(input_error)?;
        Ok(())
    }
}

fn remote_value(object: RemoteObject) -> serde_json::Value {
    object.value.unwrap_or(serde_json::Value::Null)
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn goto(&self, url: &str) -> DetoxResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| DetoxError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn reload(&self) -> DetoxResult<()> {
        self.page.reload().await.map_err(page_error)?;
        Ok(())
    }

    async fn go_back(&self) -> DetoxResult<()> {
        let history = self
            .page
            .execute(GetNavigationHistoryParams::default())
            .await
            .map_err(page_error)?;
        let Some(previous) = usize::try_from(history.result.current_index - 1)
            .ok()
            .and_then(|i| history.result.entries.get(i))
        else {
            return Ok(());
        };
        self.page
            .execute(NavigateToHistoryEntryParams::new(previous.id))
            .await
            .map_err(page_error)?;
        Ok(())
    }

    async fn add_init_script(&self, script: &str) -> DetoxResult<()> {
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(script))
            .await
            .map_err(page_error)?;
        Ok(())
    }

    async fn query_selector(&self, selector: &str) -> DetoxResult<Option<ElementHandle>> {
        let quoted = serde_json::to_string(selector)?;
        self.evaluate_handle(
            format!("document.querySelector({quoted})"),
            &format!("css={selector}"),
        )
        .await
    }

    async fn query_xpath(&self, xpath: &str) -> DetoxResult<Option<ElementHandle>> {
        let quoted = serde_json::to_string(xpath)?;
        self.evaluate_handle(
            format!(
                "document.evaluate({quoted}, document, null, \
                 XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue"
            ),
            &format!("xpath={xpath}"),
        )
        .await
    }

    async fn click(&self, element: &ElementHandle, options: ClickOptions) -> DetoxResult<()> {
        self.scroll_into_view(element).await?;
        let center = self
            .bounding_box(element)
            .await?
            .ok_or_else(|| DetoxError::NotRendered {
                locator: element.locator.clone(),
            })?
            .center();
        self.click_at(center.x, center.y, options).await
    }

    async fn mouse_click(&self, x: f64, y: f64) -> DetoxResult<()> {
        self.click_at(x, y, ClickOptions::default()).await
    }

    async fn send_character(&self, ch: char) -> DetoxResult<()> {
        self.page
            .execute(InsertTextParams::new(ch.to_string()))
            .await
            .map_err(input_error)?;
        Ok(())
    }

    async fn type_character(&self, element: &ElementHandle, ch: char) -> DetoxResult<()> {
        self.call_on(element, FOCUS).await?;
        let text = ch.to_string();
        self.dispatch_key(DispatchKeyEventType::KeyDown, &text, "", 0, Some(&text))
            .await?;
        self.dispatch_key(DispatchKeyEventType::KeyUp, &text, "", 0, None)
            .await
    }

    async fn press_key(&self, key: Key) -> DetoxResult<()> {
        let down = if key.text().is_some() {
            DispatchKeyEventType::KeyDown
        } else {
            DispatchKeyEventType::RawKeyDown
        };
        self.dispatch_key(down, key.key(), key.code(), key.key_code(), key.text())
            .await?;
        self.dispatch_key(
            DispatchKeyEventType::KeyUp,
            key.key(),
            key.code(),
            key.key_code(),
            None,
        )
        .await
    }

    async fn call_on(
        &self,
        element: &ElementHandle,
        function: &str,
    ) -> DetoxResult<serde_json::Value> {
        let params = CallFunctionOnParams::builder()
            .function_declaration(function)
            .object_id(RemoteObjectId::new(element.id.clone()))
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(eval_error)?;
        let response = self.page.execute(params).await.map_err(page_error)?;
        if let Some(exception) = &response.result.exception_details {
            return Err(eval_error(&exception.text));
        }
        Ok(remote_value(response.result.result.clone()))
    }

    async fn screenshot(&self) -> DetoxResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let response = self
            .page
            .execute(params)
            .await
            .map_err(|e| DetoxError::ScreenshotError {
                message: e.to_string(),
            })?;
        base64::engine::general_purpose::STANDARD
            .decode(&response.result.data)
            .map_err(|e| DetoxError::ScreenshotError {
                message: e.to_string(),
            })
    }

    async fn set_geolocation(&self, position: GeolocationPosition) -> DetoxResult<()> {
        let params = SetGeolocationOverrideParams::builder()
            .latitude(position.latitude)
            .longitude(position.longitude)
            .accuracy(position.accuracy)
            .build();
        self.page.execute(params).await.map_err(page_error)?;
        Ok(())
    }

    async fn grant_permissions(
        &self,
        origin: &str,
        permissions: &[Permission],
    ) -> DetoxResult<()> {
        let params = GrantPermissionsParams::builder()
            .permissions(permissions.iter().copied().map(permission_type).collect::<Vec<_>>())
            .origin(origin)
            .build()
            .map_err(page_error)?;
        self.browser
            .lock()
            .await
            .execute(params)
            .await
            .map_err(page_error)?;
        Ok(())
    }
}
