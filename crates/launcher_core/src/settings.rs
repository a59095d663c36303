//! Read-aggregate view for the settings surfaces. Every mutation writes
//! straight through to the stores and comes back through their channels.

use std::{
    collections::BTreeMap,
    sync::{Arc, Weak},
};

use anyhow::{Context, Result};
use shared::{
    codec::{parse_favorites, parse_shortcuts},
    AppRecord, CategoryDefinition, FavoriteEntry, ShortcutEntry, ShortcutTarget,
};
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::info;

use crate::{
    combine::ChangeFeed,
    directory::DirectoryRepository,
    preferences::{keys, parse_package, parse_target, Flag, LauncherPreferences, SwipeDirection},
    ticker::ScopedTask,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenApp {
    pub package: String,
    /// Live label, or the package name for apps no longer installed.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedApp {
    pub package: String,
    pub original_label: Option<String>,
    pub custom_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsUiState {
    pub hidden_apps: Vec<HiddenApp>,
    pub renamed_apps: Vec<RenamedApp>,
    pub favorites: Vec<FavoriteEntry>,
    pub shortcuts: Vec<ShortcutEntry>,
    pub swipe_left: Option<ShortcutTarget>,
    pub swipe_right: Option<ShortcutTarget>,
    pub weather_app: Option<String>,
    pub show_wallpaper: bool,
    /// Every installed app, overlays not applied.
    pub all_apps: Vec<AppRecord>,
    pub app_categories: BTreeMap<String, String>,
    pub category_definitions: Vec<CategoryDefinition>,
}

impl Default for SettingsUiState {
    fn default() -> Self {
        Self {
            hidden_apps: Vec::new(),
            renamed_apps: Vec::new(),
            favorites: Vec::new(),
            shortcuts: Vec::new(),
            swipe_left: None,
            swipe_right: None,
            weather_app: None,
            show_wallpaper: Flag::ShowWallpaper.default_value(),
            all_apps: Vec::new(),
            app_categories: BTreeMap::new(),
            category_definitions: Vec::new(),
        }
    }
}

struct SettingsSources {
    favorites: watch::Receiver<Option<String>>,
    shortcuts: watch::Receiver<Option<String>>,
    swipe_left: watch::Receiver<Option<String>>,
    swipe_right: watch::Receiver<Option<String>>,
    weather_app: watch::Receiver<Option<String>>,
    show_wallpaper: watch::Receiver<Option<String>>,
}

pub struct SettingsEngine {
    directory: Arc<DirectoryRepository>,
    prefs: LauncherPreferences,
    sources: SettingsSources,
    state: watch::Sender<SettingsUiState>,
    recompute_lock: Mutex<()>,
    refresh_task: Mutex<Option<ScopedTask>>,
}

impl SettingsEngine {
    pub async fn start(
        directory: Arc<DirectoryRepository>,
        prefs: LauncherPreferences,
    ) -> Result<Arc<Self>> {
        let sources = SettingsSources {
            favorites: prefs.observe(keys::FAVORITES).await?,
            shortcuts: prefs.observe(keys::RIGHT_SHORTCUTS).await?,
            swipe_left: prefs.observe(keys::SWIPE_LEFT_TARGET).await?,
            swipe_right: prefs.observe(keys::SWIPE_RIGHT_TARGET).await?,
            weather_app: prefs.observe(keys::WEATHER_APP_PACKAGE).await?,
            show_wallpaper: prefs.observe(keys::SHOW_WALLPAPER).await?,
        };
        let overlays = Arc::clone(directory.overlays());
        let mut feed = ChangeFeed::new()
            .watch(sources.favorites.clone())
            .watch(sources.shortcuts.clone())
            .watch(sources.swipe_left.clone())
            .watch(sources.swipe_right.clone())
            .watch(sources.weather_app.clone())
            .watch(sources.show_wallpaper.clone())
            .watch(overlays.hidden_apps())
            .watch(overlays.renamed_apps())
            .watch(overlays.app_categories())
            .watch(overlays.category_definitions())
            .watch(directory.subscribe_changes());

        let engine = Arc::new(Self {
            directory,
            prefs,
            sources,
            state: watch::channel(SettingsUiState::default()).0,
            recompute_lock: Mutex::new(()),
            refresh_task: Mutex::new(None),
        });
        engine.recompute().await;

        let weak: Weak<Self> = Arc::downgrade(&engine);
        let task = ScopedTask::spawn(async move {
            while feed.changed().await.is_some() {
                let Some(engine) = weak.upgrade() else {
                    break;
                };
                engine.recompute().await;
            }
        });
        *engine.refresh_task.lock().await = Some(task);
        Ok(engine)
    }

    pub fn subscribe(&self) -> watch::Receiver<SettingsUiState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SettingsUiState {
        self.state.borrow().clone()
    }

    async fn recompute(&self) {
        let guard = self.recompute_lock.lock().await;
        let _gate = self.directory.snapshot_read().await;
        self.publish(&guard).await;
    }

    async fn publish(&self, _guard: &MutexGuard<'_, ()>) {
        let apps = self.directory.list_apps().await;
        let overlays = self.directory.overlays();
        let hidden = overlays.hidden_apps().borrow().clone();
        let renamed = overlays.renamed_apps().borrow().clone();
        let app_categories = overlays.app_categories().borrow().clone();
        let definitions = overlays.category_definitions().borrow().clone();

        let label_of = |package: &str| {
            apps.iter()
                .find(|app| app.package == package)
                .map(|app| app.label.clone())
        };

        let mut hidden_apps: Vec<HiddenApp> = hidden
            .iter()
            .map(|package| HiddenApp {
                package: package.clone(),
                label: renamed
                    .get(package)
                    .cloned()
                    .or_else(|| label_of(package))
                    .unwrap_or_else(|| package.clone()),
            })
            .collect();
        hidden_apps.sort_by_cached_key(|app| app.label.to_lowercase());

        let mut renamed_apps: Vec<RenamedApp> = renamed
            .iter()
            .map(|(package, custom_label)| RenamedApp {
                package: package.clone(),
                original_label: label_of(package),
                custom_label: custom_label.clone(),
            })
            .collect();
        renamed_apps.sort_by_cached_key(|app| app.custom_label.to_lowercase());

        let next = SettingsUiState {
            hidden_apps,
            renamed_apps,
            favorites: self
                .sources
                .favorites
                .borrow()
                .as_deref()
                .map(parse_favorites)
                .unwrap_or_default(),
            shortcuts: self
                .sources
                .shortcuts
                .borrow()
                .as_deref()
                .map(parse_shortcuts)
                .unwrap_or_default(),
            swipe_left: parse_target(self.sources.swipe_left.borrow().as_deref()),
            swipe_right: parse_target(self.sources.swipe_right.borrow().as_deref()),
            weather_app: parse_package(self.sources.weather_app.borrow().as_deref()),
            show_wallpaper: Flag::ShowWallpaper
                .parse(self.sources.show_wallpaper.borrow().as_deref()),
            all_apps: apps.as_ref().clone(),
            app_categories: app_categories.as_ref().clone(),
            category_definitions: definitions.as_ref().clone(),
        };

        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    pub async fn hide_app(&self, package: &str) -> Result<()> {
        self.directory.hide_app(package).await
    }

    pub async fn unhide_app(&self, package: &str) -> Result<()> {
        self.directory.unhide_app(package).await
    }

    pub async fn rename_app(&self, package: &str, label: &str) -> Result<()> {
        self.directory.rename_app(package, label).await
    }

    pub async fn clear_app_rename(&self, package: &str) -> Result<()> {
        self.directory.rename_app(package, "").await
    }

    pub async fn set_app_category(&self, package: &str, category: &str) -> Result<bool> {
        self.directory.set_app_category(package, category).await
    }

    pub async fn add_category(&self, name: &str) -> Result<bool> {
        self.directory.add_category_definition(name).await
    }

    pub async fn rename_category(&self, old_name: &str, new_name: &str) -> Result<bool> {
        self.directory.rename_category(old_name, new_name).await
    }

    pub async fn delete_category(&self, name: &str) -> Result<bool> {
        self.directory.delete_category(name).await
    }

    pub async fn reorder_categories(&self, names: &[String]) -> Result<bool> {
        self.directory.reorder_category_definitions(names).await
    }

    pub async fn set_swipe_target(
        &self,
        direction: SwipeDirection,
        target: Option<&ShortcutTarget>,
    ) -> Result<()> {
        self.prefs.set_swipe_target(direction, target).await
    }

    pub async fn set_weather_app(&self, package: Option<&str>) -> Result<()> {
        self.prefs.set_weather_app(package).await
    }

    pub async fn set_show_wallpaper(&self, show: bool) -> Result<()> {
        self.prefs.set_flag(Flag::ShowWallpaper, show).await
    }

    /// Drops one favorite from the saved list.
    pub async fn remove_favorite(&self, package: &str) -> Result<bool> {
        let mut favorites = self.prefs.favorites().await?;
        let before = favorites.len();
        favorites.retain(|favorite| favorite.package != package);
        if favorites.len() == before {
            return Ok(false);
        }
        self.prefs.set_favorites(&favorites).await?;
        Ok(true)
    }

    pub async fn remove_shortcut(&self, target: &ShortcutTarget) -> Result<bool> {
        let mut shortcuts = self.prefs.shortcuts().await?;
        let before = shortcuts.len();
        shortcuts.retain(|shortcut| shortcut.target != *target);
        if shortcuts.len() == before {
            return Ok(false);
        }
        self.prefs.set_shortcuts(&shortcuts).await?;
        Ok(true)
    }

    /// Clears every preference and overlay table, then drops the directory
    /// cache. Subscribers of every engine see the state before and the state
    /// after, never a mix of the two.
    pub async fn reset_all_data(&self) -> Result<()> {
        let guard = self.recompute_lock.lock().await;
        let _gate = self.directory.snapshot_write().await;
        self.prefs
            .clear()
            .await
            .context("failed to clear preferences")?;
        self.directory
            .overlays()
            .clear_all()
            .await
            .context("failed to clear overlays")?;
        self.directory.invalidate().await;
        self.publish(&guard).await;
        info!("launcher data reset");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
