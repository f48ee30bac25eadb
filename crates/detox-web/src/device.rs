//! Device facade for the browser.
//!
//! App lifecycle maps onto page navigation against the configured origin;
//! persisted storage is cleared by an init script that runs before the next
//! document's own scripts. Capabilities with no browser counterpart report
//! an unsupported diagnostic and return normally.

use crate::config::DetoxConfig;
use crate::diagnostic::{Diagnostic, DiagnosticLog, Outcome};
use crate::driver::{GeolocationPosition, PageDriver};
use crate::facade::{DeviceFacade, Orientation, Platform};
use crate::launch::{LaunchAppConfig, LaunchArgs};
use crate::result::DetoxResult;
use crate::scripts;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// The browser presented as a device
#[derive(Debug)]
pub struct WebDevice<D: PageDriver> {
    driver: Arc<D>,
    id: String,
    config: DetoxConfig,
    diagnostics: DiagnosticLog,
    launch_args: LaunchArgs,
    last_launch: Option<LaunchAppConfig>,
}

impl<D: PageDriver> WebDevice<D> {
    /// Device over `driver`, reporting into `diagnostics`
    #[must_use]
    pub fn new(driver: Arc<D>, config: DetoxConfig, diagnostics: DiagnosticLog) -> Self {
        let id = driver.name().to_string();
        Self {
            driver,
            id,
            config,
            diagnostics,
            launch_args: LaunchArgs::new(),
            last_launch: None,
        }
    }

    /// Config passed to the most recent `launch_app`
    #[must_use]
    pub const fn last_launch(&self) -> Option<&LaunchAppConfig> {
        self.last_launch.as_ref()
    }

    fn unsupported(&self, operation: String) -> Outcome<()> {
        let diagnostic = Diagnostic::unsupported(operation);
        self.diagnostics.record(diagnostic.clone());
        Outcome::with_diagnostic((), diagnostic)
    }

    async fn clear_storage_on_next_document(&self) -> DetoxResult<()> {
        self.driver
            .add_init_script(scripts::CLEAR_LOCAL_STORAGE)
            .await
    }

    async fn open_origin(&self) -> DetoxResult<()> {
        tracing::debug!(url = %self.config.base_url, "navigating to app origin");
        self.driver.goto(&self.config.base_url).await
    }
}

#[async_trait]
impl<D: PageDriver> DeviceFacade for WebDevice<D> {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn platform(&self) -> Platform {
        Platform::Web
    }

    fn app_launch_args(&self) -> &LaunchArgs {
        &self.launch_args
    }

    fn app_launch_args_mut(&mut self) -> &mut LaunchArgs {
        &mut self.launch_args
    }

    async fn launch_app(&mut self, config: LaunchAppConfig) -> DetoxResult<Outcome<()>> {
        tracing::info!(
            new_instance = ?config.new_instance,
            delete = config.clears_storage(),
            "launching app"
        );
        let mut outcome = Outcome::ok(());
        self.launch_args
            .replace(config.launch_args.clone().unwrap_or_default());

        if config.clears_storage() {
            self.clear_storage_on_next_document().await?;
        }

        let granted = config
            .permissions
            .as_ref()
            .map(crate::launch::Permissions::granted)
            .unwrap_or_default();
        if !granted.is_empty() {
            self.driver
                .grant_permissions(&self.config.base_url, &granted)
                .await?;
        }

        if let Some(url) = &config.url {
            outcome.absorb(self.unsupported(format!("launchApp(url: {url})")));
        }

        self.open_origin().await?;
        self.last_launch = Some(config);
        Ok(outcome)
    }

    async fn select_app(&mut self, name: &str) -> Outcome<()> {
        self.unsupported(format!("selectApp({name})"))
    }

    async fn terminate_app(&mut self, bundle: Option<&str>) -> Outcome<()> {
        self.unsupported(format!("terminateApp({})", bundle.unwrap_or_default()))
    }

    async fn send_to_home(&mut self) -> DetoxResult<Outcome<()>> {
        self.open_origin().await?;
        Ok(Outcome::ok(()))
    }

    async fn reload_app(&mut self) -> DetoxResult<Outcome<()>> {
        self.open_origin().await?;
        self.driver.reload().await?;
        Ok(Outcome::ok(()))
    }

    async fn install_app(&mut self, path: Option<&str>) -> Outcome<()> {
        self.unsupported(format!("installApp({})", path.unwrap_or_default()))
    }

    async fn uninstall_app(&mut self, bundle: Option<&str>) -> DetoxResult<Outcome<()>> {
        self.clear_storage_on_next_document().await?;
        Ok(self.unsupported(format!("uninstallApp({})", bundle.unwrap_or_default())))
    }

    async fn open_url(&mut self, url: &str, source_app: Option<&str>) -> Outcome<()> {
        let params = serde_json::json!({ "url": url, "sourceApp": source_app });
        self.unsupported(format!("openURL({params})"))
    }

    async fn send_user_notification(&mut self, _payload: &serde_json::Value) -> Outcome<()> {
        self.unsupported("sendUserNotification()".to_string())
    }

    async fn send_user_activity(&mut self, _payload: &serde_json::Value) -> Outcome<()> {
        self.unsupported("sendUserActivity()".to_string())
    }

    async fn set_orientation(&mut self, orientation: Orientation) -> Outcome<()> {
        self.unsupported(format!("setOrientation({orientation})"))
    }

    async fn set_location(
        &mut self,
        latitude: f64,
        longitude: f64,
    ) -> DetoxResult<Outcome<()>> {
        let position =
            GeolocationPosition::try_new(latitude, longitude, self.config.geolocation_accuracy)?;
        self.driver.set_geolocation(position).await?;
        Ok(Outcome::ok(()))
    }

    async fn set_url_blacklist(&mut self, urls: &[&str]) -> Outcome<()> {
        self.unsupported(format!("setURLBlacklist({})", urls.join(", ")))
    }

    async fn enable_synchronization(&mut self) -> Outcome<()> {
        self.unsupported("enableSynchronization()".to_string())
    }

    async fn disable_synchronization(&mut self) -> Outcome<()> {
        self.unsupported("disableSynchronization()".to_string())
    }

    async fn reset_content_and_settings(&mut self) -> DetoxResult<Outcome<()>> {
        self.clear_storage_on_next_document().await?;
        Ok(Outcome::ok(()))
    }

    async fn take_screenshot(&mut self, name: &str) -> Outcome<Option<PathBuf>> {
        let path = self.config.screenshot_dir.join(format!("{name}.png"));
        let written: DetoxResult<()> = match self.driver.screenshot().await {
            Ok(bytes) => tokio::fs::write(&path, bytes).await.map_err(Into::into),
            Err(e) => Err(e),
        };
        match written {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "screenshot saved");
                Outcome::ok(Some(path))
            }
            Err(e) => {
                let diagnostic = Diagnostic::degraded(format!("takeScreenshot({name})"), e.to_string());
                self.diagnostics.record(diagnostic.clone());
                Outcome::with_diagnostic(None, diagnostic)
            }
        }
    }

    async fn shake(&mut self) -> Outcome<()> {
        self.unsupported("shake()".to_string())
    }

    async fn set_biometric_enrollment(&mut self, _enrolled: bool) -> Outcome<()> {
        self.unsupported("setBiometricEnrollment()".to_string())
    }

    async fn match_face(&mut self) -> Outcome<()> {
        self.unsupported("matchFace()".to_string())
    }

    async fn unmatch_face(&mut self) -> Outcome<()> {
        self.unsupported("unmatchFace()".to_string())
    }

    async fn match_finger(&mut self) -> Outcome<()> {
        self.unsupported("matchFinger()".to_string())
    }

    async fn unmatch_finger(&mut self) -> Outcome<()> {
        self.unsupported("unmatchFinger()".to_string())
    }

    async fn clear_keychain(&mut self) -> Outcome<()> {
        self.unsupported("clearKeychain()".to_string())
    }

    async fn press_back(&mut self) -> DetoxResult<Outcome<()>> {
        self.driver.go_back().await?;
        Ok(Outcome::ok(()))
    }

    async fn get_ui_device(&mut self) -> Outcome<()> {
        self.unsupported("getUiDevice()".to_string())
    }
}
