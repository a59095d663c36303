//! Host collaborators the core talks to.
//!
//! Everything the operating system knows about installed apps, private
//! profiles and launching sits behind [`AppDirectoryProvider`]. Calls may
//! block on slow OS queries, so implementations backed by synchronous APIs
//! should hop onto `tokio::task::spawn_blocking` themselves.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{ActivityHandle, IconHandle, ProfileHandle},
    RawAppEntry, RawShortcutEntry,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LaunchSource {
    #[default]
    Drawer,
    Search,
    Home,
    Gesture,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    pub source: LaunchSource,
    pub animate: bool,
}

impl LaunchOptions {
    pub fn for_source(source: LaunchSource) -> Self {
        Self {
            source,
            animate: true,
        }
    }
}

#[async_trait]
pub trait AppDirectoryProvider: Send + Sync {
    async fn query_launchable_apps(&self) -> Result<Vec<RawAppEntry>>;
    async fn load_icon(&self, package: &str) -> Result<Option<IconHandle>>;
    /// Long-press shortcuts published by `package`. May fail when the
    /// shortcut API is unavailable to this launcher.
    async fn resolve_shortcuts(&self, package: &str) -> Result<Vec<RawShortcutEntry>>;

    async fn private_profile(&self) -> Result<Option<ProfileHandle>>;
    async fn is_private_space_unlocked(&self, profile: &ProfileHandle) -> Result<bool>;
    async fn set_private_space_locked(&self, profile: &ProfileHandle, locked: bool)
        -> Result<bool>;
    async fn query_private_profile_apps(&self, profile: &ProfileHandle)
        -> Result<Vec<RawAppEntry>>;

    /// Returns `Ok(false)` when the package has no launchable entry.
    async fn launch(&self, package: &str, options: &LaunchOptions) -> Result<bool>;
    async fn launch_in_profile(
        &self,
        activity: &ActivityHandle,
        profile: &ProfileHandle,
    ) -> Result<bool>;
    async fn open_deep_link(&self, uri: &str) -> Result<bool>;
    async fn start_shortcut(&self, package: &str, shortcut_id: &str) -> Result<bool>;
}

/// Provider used when no host integration is wired up: an empty directory
/// that cannot launch anything.
pub struct MissingAppDirectoryProvider;

#[async_trait]
impl AppDirectoryProvider for MissingAppDirectoryProvider {
    async fn query_launchable_apps(&self) -> Result<Vec<RawAppEntry>> {
        Ok(Vec::new())
    }

    async fn load_icon(&self, _package: &str) -> Result<Option<IconHandle>> {
        Ok(None)
    }

    async fn resolve_shortcuts(&self, package: &str) -> Result<Vec<RawShortcutEntry>> {
        Err(anyhow!("shortcut queries unavailable for {package}"))
    }

    async fn private_profile(&self) -> Result<Option<ProfileHandle>> {
        Ok(None)
    }

    async fn is_private_space_unlocked(&self, _profile: &ProfileHandle) -> Result<bool> {
        Ok(false)
    }

    async fn set_private_space_locked(
        &self,
        profile: &ProfileHandle,
        _locked: bool,
    ) -> Result<bool> {
        Err(anyhow!("private profile {} is unavailable", profile.as_str()))
    }

    async fn query_private_profile_apps(
        &self,
        _profile: &ProfileHandle,
    ) -> Result<Vec<RawAppEntry>> {
        Ok(Vec::new())
    }

    async fn launch(&self, package: &str, _options: &LaunchOptions) -> Result<bool> {
        Err(anyhow!("app directory provider unavailable; cannot launch {package}"))
    }

    async fn launch_in_profile(
        &self,
        activity: &ActivityHandle,
        _profile: &ProfileHandle,
    ) -> Result<bool> {
        Err(anyhow!(
            "app directory provider unavailable; cannot launch {}",
            activity.as_str()
        ))
    }

    async fn open_deep_link(&self, uri: &str) -> Result<bool> {
        Err(anyhow!("app directory provider unavailable; cannot open {uri}"))
    }

    async fn start_shortcut(&self, package: &str, shortcut_id: &str) -> Result<bool> {
        Err(anyhow!(
            "app directory provider unavailable; cannot start {package}/{shortcut_id}"
        ))
    }
}
