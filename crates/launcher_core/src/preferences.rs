use std::sync::Arc;

use anyhow::Result;
use shared::{
    codec::{parse_favorites, parse_shortcuts, serialize_favorites, serialize_shortcuts},
    FavoriteEntry, ShortcutEntry, ShortcutTarget,
};
use storage::PreferenceStore;
use tokio::sync::watch;

pub mod keys {
    pub const FAVORITES: &str = "favorites";
    pub const RIGHT_SHORTCUTS: &str = "right_shortcuts";
    pub const SWIPE_LEFT_TARGET: &str = "swipe_left_target";
    pub const SWIPE_RIGHT_TARGET: &str = "swipe_right_target";
    pub const WEATHER_APP_PACKAGE: &str = "weather_app_package";
    pub const SHOW_WALLPAPER: &str = "show_wallpaper";
    pub const HAS_COMPLETED_ONBOARDING: &str = "has_completed_onboarding";
    pub const ONBOARDING_REACHED_SET_DEFAULT: &str = "onboarding_reached_set_default";
    pub const WEATHER_LOCATION_OPTED_OUT: &str = "weather_location_opted_out";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn key(self) -> &'static str {
        match self {
            Self::Left => keys::SWIPE_LEFT_TARGET,
            Self::Right => keys::SWIPE_RIGHT_TARGET,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    ShowWallpaper,
    HasCompletedOnboarding,
    OnboardingReachedSetDefault,
    WeatherLocationOptedOut,
}

impl Flag {
    pub fn key(self) -> &'static str {
        match self {
            Self::ShowWallpaper => keys::SHOW_WALLPAPER,
            Self::HasCompletedOnboarding => keys::HAS_COMPLETED_ONBOARDING,
            Self::OnboardingReachedSetDefault => keys::ONBOARDING_REACHED_SET_DEFAULT,
            Self::WeatherLocationOptedOut => keys::WEATHER_LOCATION_OPTED_OUT,
        }
    }

    pub fn default_value(self) -> bool {
        matches!(self, Self::ShowWallpaper)
    }

    pub fn parse(self, raw: Option<&str>) -> bool {
        match raw.map(str::trim) {
            Some("true") => true,
            Some("false") => false,
            _ => self.default_value(),
        }
    }
}

pub fn parse_target(raw: Option<&str>) -> Option<ShortcutTarget> {
    raw.and_then(ShortcutTarget::decode)
}

pub fn parse_package(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Typed view over the raw preference store.
#[derive(Clone)]
pub struct LauncherPreferences {
    store: Arc<dyn PreferenceStore>,
}

impl LauncherPreferences {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub async fn observe(&self, key: &str) -> Result<watch::Receiver<Option<String>>> {
        self.store.observe(key).await
    }

    pub async fn favorites(&self) -> Result<Vec<FavoriteEntry>> {
        let raw = self.store.get(keys::FAVORITES).await?;
        Ok(raw.as_deref().map(parse_favorites).unwrap_or_default())
    }

    /// Replaces the whole list in one write.
    pub async fn set_favorites(&self, favorites: &[FavoriteEntry]) -> Result<()> {
        self.store
            .set(keys::FAVORITES, &serialize_favorites(favorites))
            .await
    }

    pub async fn shortcuts(&self) -> Result<Vec<ShortcutEntry>> {
        let raw = self.store.get(keys::RIGHT_SHORTCUTS).await?;
        Ok(raw.as_deref().map(parse_shortcuts).unwrap_or_default())
    }

    pub async fn set_shortcuts(&self, shortcuts: &[ShortcutEntry]) -> Result<()> {
        self.store
            .set(keys::RIGHT_SHORTCUTS, &serialize_shortcuts(shortcuts))
            .await
    }

    pub async fn swipe_target(&self, direction: SwipeDirection) -> Result<Option<ShortcutTarget>> {
        let raw = self.store.get(direction.key()).await?;
        Ok(parse_target(raw.as_deref()))
    }

    pub async fn set_swipe_target(
        &self,
        direction: SwipeDirection,
        target: Option<&ShortcutTarget>,
    ) -> Result<()> {
        match target {
            Some(target) => self.store.set(direction.key(), &target.encode()).await,
            None => self.store.remove(direction.key()).await,
        }
    }

    pub async fn weather_app(&self) -> Result<Option<String>> {
        let raw = self.store.get(keys::WEATHER_APP_PACKAGE).await?;
        Ok(parse_package(raw.as_deref()))
    }

    pub async fn set_weather_app(&self, package: Option<&str>) -> Result<()> {
        match package.map(str::trim).filter(|package| !package.is_empty()) {
            Some(package) => self.store.set(keys::WEATHER_APP_PACKAGE, package).await,
            None => self.store.remove(keys::WEATHER_APP_PACKAGE).await,
        }
    }

    pub async fn flag(&self, flag: Flag) -> Result<bool> {
        let raw = self.store.get(flag.key()).await?;
        Ok(flag.parse(raw.as_deref()))
    }

    pub async fn set_flag(&self, flag: Flag, value: bool) -> Result<()> {
        self.store
            .set(flag.key(), if value { "true" } else { "false" })
            .await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}

#[cfg(test)]
#[path = "tests/preferences_tests.rs"]
mod tests;
