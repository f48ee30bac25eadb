//! App launch configuration and launch arguments.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Device permission a launch can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    /// Camera access
    Camera,
    /// Microphone access
    Microphone,
    /// Notifications
    Notifications,
    /// Geolocation
    Location,
    /// Clipboard read
    Clipboard,
}

impl Permission {
    /// Name as written in launch configs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Microphone => "microphone",
            Self::Notifications => "notifications",
            Self::Location => "location",
            Self::Clipboard => "clipboard",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested state of a permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionState {
    /// Grant
    #[serde(rename = "YES")]
    Yes,
    /// Deny
    #[serde(rename = "NO")]
    No,
    /// Leave untouched
    #[serde(rename = "unset")]
    Unset,
}

/// Permission requests attached to a launch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeMap<Permission, PermissionState>);

impl Permissions {
    /// No requests
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera, microphone and notifications granted
    #[must_use]
    pub fn default_grants() -> Self {
        Self::new()
            .set(Permission::Camera, PermissionState::Yes)
            .set(Permission::Microphone, PermissionState::Yes)
            .set(Permission::Notifications, PermissionState::Yes)
    }

    /// Request a state for a permission
    #[must_use]
    pub fn set(mut self, permission: Permission, state: PermissionState) -> Self {
        self.0.insert(permission, state);
        self
    }

    /// Requested state, if any
    #[must_use]
    pub fn get(&self, permission: Permission) -> Option<PermissionState> {
        self.0.get(&permission).copied()
    }

    /// Permissions requested as `YES`, in stable order
    #[must_use]
    pub fn granted(&self) -> Vec<Permission> {
        self.0
            .iter()
            .filter(|(_, state)| **state == PermissionState::Yes)
            .map(|(p, _)| *p)
            .collect()
    }

    /// True when nothing was requested
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Options accepted by `launch_app`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaunchAppConfig {
    /// Start a fresh instance
    pub new_instance: Option<bool>,
    /// Clear persisted storage before the app loads
    pub delete: Option<bool>,
    /// Permission requests
    pub permissions: Option<Permissions>,
    /// Deep link to open (not supported on web)
    pub url: Option<String>,
    /// Arguments handed to the app
    pub launch_args: Option<Map<String, Value>>,
}

impl LaunchAppConfig {
    /// Empty launch config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a fresh instance
    #[must_use]
    pub const fn new_instance(mut self, fresh: bool) -> Self {
        self.new_instance = Some(fresh);
        self
    }

    /// Clear persisted storage
    #[must_use]
    pub const fn delete(mut self, delete: bool) -> Self {
        self.delete = Some(delete);
        self
    }

    /// Attach permission requests
    #[must_use]
    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Attach a deep link
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attach launch arguments
    #[must_use]
    pub fn launch_args(mut self, args: Map<String, Value>) -> Self {
        self.launch_args = Some(args);
        self
    }

    /// Whether storage should be cleared
    #[must_use]
    pub fn clears_storage(&self) -> bool {
        self.delete.unwrap_or(false)
    }
}

/// Launch arguments of the current device session.
///
/// Read and replaced wholesale by `launch_app`; `merge` does a shallow object
/// merge where later keys win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchArgs {
    args: Map<String, Value>,
}

impl LaunchArgs {
    /// Empty arguments
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current arguments
    #[must_use]
    pub const fn get(&self) -> &Map<String, Value> {
        &self.args
    }

    /// Clear all arguments
    pub fn reset(&mut self) {
        self.args.clear();
    }

    /// Shallow-merge `other` over the current arguments
    pub fn merge(&mut self, other: Map<String, Value>) {
        self.args.extend(other);
    }

    /// Replace all arguments
    pub fn replace(&mut self, args: Map<String, Value>) {
        self.args = args;
    }
}
