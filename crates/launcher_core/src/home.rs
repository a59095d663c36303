//! Home screen state: resolved favorites, right-side shortcuts, swipe
//! targets, the edit session and the clock/weather header.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Weak},
    time::Duration,
};

use anyhow::{Context, Result};
use shared::{
    codec::{parse_favorites, parse_shortcuts},
    domain::ICON_NAMES,
    target::encode_optional,
    AppRecord, FavoriteEntry, ShortcutAction, ShortcutEntry, ShortcutTarget,
};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::{
    clock::ClockSnapshot,
    combine::ChangeFeed,
    directory::DirectoryRepository,
    edit_buffer::{DragReorder, EditBuffer},
    events::{notify_launch_failed, EventSender},
    heuristics::infer_shortcut_icon,
    preferences::{keys, parse_package, parse_target, Flag, LauncherPreferences, SwipeDirection},
    provider::{LaunchOptions, LaunchSource},
    ticker::{PeriodicTask, ScopedTask},
    weather::{WeatherClient, WeatherLocation, WeatherSnapshot},
};

#[derive(Debug, Clone, PartialEq)]
pub struct HomeEditState {
    pub favorites: Vec<FavoriteEntry>,
    pub shortcuts: Vec<ShortcutEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomeUiState {
    /// Favorites with display labels resolved.
    pub favorites: Vec<FavoriteEntry>,
    pub shortcuts: Vec<ShortcutEntry>,
    pub swipe_left: Option<ShortcutTarget>,
    pub swipe_right: Option<ShortcutTarget>,
    pub weather_app: Option<String>,
    pub show_wallpaper: bool,
    /// Present while an edit session is open.
    pub edit: Option<HomeEditState>,
    pub clock: Option<ClockSnapshot>,
    pub weather: Option<WeatherSnapshot>,
}

impl Default for HomeUiState {
    fn default() -> Self {
        Self {
            favorites: Vec::new(),
            shortcuts: Vec::new(),
            swipe_left: None,
            swipe_right: None,
            weather_app: None,
            show_wallpaper: Flag::ShowWallpaper.default_value(),
            edit: None,
            clock: None,
            weather: None,
        }
    }
}

/// Label precedence: rename, then the installed app's label, then the label
/// stored with the favorite.
pub fn resolve_favorite_labels(
    favorites: &[FavoriteEntry],
    apps: &[AppRecord],
    renamed: &BTreeMap<String, String>,
) -> Vec<FavoriteEntry> {
    let live: HashMap<&str, &str> = apps
        .iter()
        .map(|app| (app.package.as_str(), app.label.as_str()))
        .collect();
    favorites
        .iter()
        .map(|favorite| {
            let label = renamed
                .get(&favorite.package)
                .map(String::as_str)
                .or_else(|| live.get(favorite.package.as_str()).copied())
                .unwrap_or(&favorite.label);
            FavoriteEntry {
                label: label.to_string(),
                ..favorite.clone()
            }
        })
        .collect()
}

fn target_label(target: &ShortcutTarget) -> &str {
    match target {
        ShortcutTarget::DeepLink { uri } => uri,
        _ => target.package().unwrap_or_default(),
    }
}

fn is_known_icon(icon_name: &str) -> bool {
    ICON_NAMES.contains(&icon_name)
}

struct HomeSources {
    favorites: watch::Receiver<Option<String>>,
    shortcuts: watch::Receiver<Option<String>>,
    swipe_left: watch::Receiver<Option<String>>,
    swipe_right: watch::Receiver<Option<String>>,
    weather_app: watch::Receiver<Option<String>>,
    show_wallpaper: watch::Receiver<Option<String>>,
}

impl HomeSources {
    async fn observe(prefs: &LauncherPreferences) -> Result<Self> {
        Ok(Self {
            favorites: prefs.observe(keys::FAVORITES).await?,
            shortcuts: prefs.observe(keys::RIGHT_SHORTCUTS).await?,
            swipe_left: prefs.observe(keys::SWIPE_LEFT_TARGET).await?,
            swipe_right: prefs.observe(keys::SWIPE_RIGHT_TARGET).await?,
            weather_app: prefs.observe(keys::WEATHER_APP_PACKAGE).await?,
            show_wallpaper: prefs.observe(keys::SHOW_WALLPAPER).await?,
        })
    }

    fn swipe(&self, direction: SwipeDirection) -> Option<ShortcutTarget> {
        let source = match direction {
            SwipeDirection::Left => &self.swipe_left,
            SwipeDirection::Right => &self.swipe_right,
        };
        let raw = source.borrow();
        parse_target(raw.as_deref())
    }
}

struct EditSession {
    favorites: EditBuffer<FavoriteEntry>,
    shortcuts: EditBuffer<ShortcutEntry>,
}

impl EditSession {
    fn snapshot(&self) -> HomeEditState {
        HomeEditState {
            favorites: self.favorites.items().to_vec(),
            shortcuts: self.shortcuts.items().to_vec(),
        }
    }
}

pub struct HomeEngine {
    directory: Arc<DirectoryRepository>,
    prefs: LauncherPreferences,
    events: EventSender,
    sources: HomeSources,
    state: watch::Sender<HomeUiState>,
    session: Mutex<Option<EditSession>>,
    clock: Mutex<Option<ClockSnapshot>>,
    weather: Mutex<Option<WeatherSnapshot>>,
    recompute_lock: Mutex<()>,
    refresh_task: Mutex<Option<ScopedTask>>,
    clock_task: Mutex<Option<PeriodicTask>>,
    weather_task: Mutex<Option<PeriodicTask>>,
}

impl HomeEngine {
    pub async fn start(
        directory: Arc<DirectoryRepository>,
        prefs: LauncherPreferences,
        events: EventSender,
    ) -> Result<Arc<Self>> {
        let sources = HomeSources::observe(&prefs).await?;
        let mut feed = ChangeFeed::new()
            .watch(sources.favorites.clone())
            .watch(sources.shortcuts.clone())
            .watch(sources.swipe_left.clone())
            .watch(sources.swipe_right.clone())
            .watch(sources.weather_app.clone())
            .watch(sources.show_wallpaper.clone())
            .watch(directory.overlays().renamed_apps())
            .watch(directory.subscribe_changes());

        let engine = Arc::new(Self {
            directory,
            prefs,
            events,
            sources,
            state: watch::channel(HomeUiState::default()).0,
            session: Mutex::new(None),
            clock: Mutex::new(None),
            weather: Mutex::new(None),
            recompute_lock: Mutex::new(()),
            refresh_task: Mutex::new(None),
            clock_task: Mutex::new(None),
            weather_task: Mutex::new(None),
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

    pub fn subscribe(&self) -> watch::Receiver<HomeUiState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> HomeUiState {
        self.state.borrow().clone()
    }

    async fn resolved_favorites(&self) -> Vec<FavoriteEntry> {
        let stored = {
            let raw = self.sources.favorites.borrow();
            raw.as_deref().map(parse_favorites).unwrap_or_default()
        };
        let apps = self.directory.list_apps().await;
        let renamed = self.directory.overlays().renamed_apps().borrow().clone();
        resolve_favorite_labels(&stored, &apps, &renamed)
    }

    fn stored_shortcuts(&self) -> Vec<ShortcutEntry> {
        let raw = self.sources.shortcuts.borrow();
        raw.as_deref().map(parse_shortcuts).unwrap_or_default()
    }

    async fn recompute(&self) {
        let _guard = self.recompute_lock.lock().await;
        let _gate = self.directory.snapshot_read().await;

        let favorites = self.resolved_favorites().await;
        let edit = self.session.lock().await.as_ref().map(EditSession::snapshot);
        let clock = self.clock.lock().await.clone();
        let weather = self.weather.lock().await.clone();
        let next = HomeUiState {
            favorites,
            shortcuts: self.stored_shortcuts(),
            swipe_left: self.sources.swipe(SwipeDirection::Left),
            swipe_right: self.sources.swipe(SwipeDirection::Right),
            weather_app: parse_package(self.sources.weather_app.borrow().as_deref()),
            show_wallpaper: Flag::ShowWallpaper
                .parse(self.sources.show_wallpaper.borrow().as_deref()),
            edit,
            clock,
            weather,
        };

        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    pub async fn is_editing(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Opens an edit session over the current favorites and shortcuts.
    /// Returns false when one is already open.
    pub async fn begin_edit(&self) -> bool {
        let favorites = self.resolved_favorites().await;
        let shortcuts = self.stored_shortcuts();
        {
            let mut session = self.session.lock().await;
            if session.is_some() {
                return false;
            }
            *session = Some(EditSession {
                favorites: EditBuffer::open(favorites),
                shortcuts: EditBuffer::open(shortcuts),
            });
        }
        debug!("home edit session opened");
        self.recompute().await;
        true
    }

    async fn edit<R>(&self, change: impl FnOnce(&mut EditSession) -> R) -> Option<R> {
        let result = {
            let mut session = self.session.lock().await;
            session.as_mut().map(change)
        };
        if result.is_some() {
            self.recompute().await;
        }
        result
    }

    /// Removes `app` from the buffer, or adds it at the top. False when no
    /// session is open.
    pub async fn toggle_favorite(&self, app: &AppRecord) -> bool {
        let entry = FavoriteEntry::new(&app.label, &app.package);
        self.edit(|session| {
            session
                .favorites
                .toggle(entry, |favorite: &FavoriteEntry| favorite.package.clone())
        })
        .await
        .is_some()
    }

    pub async fn reorder_favorites(&self, from: usize, to: usize) -> bool {
        self.edit(|session| session.favorites.reorder(from, to))
            .await
            .unwrap_or(false)
    }

    /// Shortcuts are keyed by their encoded target, since one app can
    /// contribute several.
    pub async fn toggle_shortcut(&self, action: &ShortcutAction) -> bool {
        let entry = ShortcutEntry {
            icon_name: infer_shortcut_icon(&action.app_label, &action.action_label).to_string(),
            target: action.target.clone(),
        };
        self.edit(|session| session.shortcuts.toggle(entry, ShortcutEntry::key))
            .await
            .is_some()
    }

    pub async fn reorder_shortcuts(&self, from: usize, to: usize) -> bool {
        self.edit(|session| session.shortcuts.reorder(from, to))
            .await
            .unwrap_or(false)
    }

    /// Applies the moves produced by `drag` for `delta` pixels of motion to
    /// the favorites buffer. Returns how many were applied.
    pub async fn drag_favorite(&self, drag: &mut DragReorder, delta: f32) -> usize {
        let moves = drag.drag_by(delta);
        if moves.is_empty() {
            return 0;
        }
        self.edit(|session| {
            moves
                .iter()
                .filter(|(from, to)| session.favorites.reorder(*from, *to))
                .count()
        })
        .await
        .unwrap_or(0)
    }

    pub async fn drag_shortcut(&self, drag: &mut DragReorder, delta: f32) -> usize {
        let moves = drag.drag_by(delta);
        if moves.is_empty() {
            return 0;
        }
        self.edit(|session| {
            moves
                .iter()
                .filter(|(from, to)| session.shortcuts.reorder(*from, *to))
                .count()
        })
        .await
        .unwrap_or(0)
    }

    pub async fn set_favorite_icon(&self, index: usize, icon_name: &str) -> bool {
        let icon_name = icon_name.trim();
        if !is_known_icon(icon_name) {
            debug!(icon_name, "unknown icon ignored");
            return false;
        }
        self.edit(|session| match session.favorites.get_mut(index) {
            Some(favorite) => {
                favorite.icon_name = icon_name.to_string();
                true
            }
            None => false,
        })
        .await
        .unwrap_or(false)
    }

    /// `None` restores the default of opening the favorite's own package.
    pub async fn set_favorite_icon_target(
        &self,
        index: usize,
        target: Option<&ShortcutTarget>,
    ) -> bool {
        let encoded = encode_optional(target);
        self.edit(|session| match session.favorites.get_mut(index) {
            Some(favorite) => {
                favorite.icon_target = encoded;
                true
            }
            None => false,
        })
        .await
        .unwrap_or(false)
    }

    pub async fn set_shortcut_icon(&self, index: usize, icon_name: &str) -> bool {
        let icon_name = icon_name.trim();
        if !is_known_icon(icon_name) {
            debug!(icon_name, "unknown icon ignored");
            return false;
        }
        self.edit(|session| match session.shortcuts.get_mut(index) {
            Some(shortcut) => {
                shortcut.icon_name = icon_name.to_string();
                true
            }
            None => false,
        })
        .await
        .unwrap_or(false)
    }

    /// Writes both buffers back as whole lists and closes the session.
    /// Returns false when no session was open. On a failed write the
    /// session stays open.
    pub async fn save_edit(&self) -> Result<bool> {
        let mut slot = self.session.lock().await;
        let Some(session) = slot.take() else {
            return Ok(false);
        };
        if let Err(error) = self.persist(&session).await {
            *slot = Some(session);
            return Err(error);
        }
        drop(slot);

        info!("home edit session saved");
        self.recompute().await;
        Ok(true)
    }

    /// Leaving the editor any other way saves too; there is no discard.
    pub async fn close_edit(&self) -> Result<bool> {
        self.save_edit().await
    }

    async fn persist(&self, session: &EditSession) -> Result<()> {
        self.prefs
            .set_favorites(session.favorites.items())
            .await
            .context("failed to save favorites")?;
        self.prefs
            .set_shortcuts(session.shortcuts.items())
            .await
            .context("failed to save shortcuts")?;
        Ok(())
    }

    pub async fn launch_favorite(&self, favorite: &FavoriteEntry) -> bool {
        let options = LaunchOptions::for_source(LaunchSource::Home);
        let launched = self.directory.launch(&favorite.package, &options).await;
        if !launched {
            notify_launch_failed(&self.events, &favorite.package, &favorite.label);
        }
        launched
    }

    /// Opens the favorite's icon target, which may differ from its label
    /// target.
    pub async fn launch_favorite_icon(&self, favorite: &FavoriteEntry) -> bool {
        let Some(target) = favorite.icon_action() else {
            return false;
        };
        self.launch_target(&target, &favorite.label, LaunchSource::Home)
            .await
    }

    pub async fn launch_shortcut(&self, shortcut: &ShortcutEntry) -> bool {
        self.launch_target(
            &shortcut.target,
            target_label(&shortcut.target),
            LaunchSource::Home,
        )
        .await
    }

    /// An unset swipe does nothing and reports nothing.
    pub async fn swipe(&self, direction: SwipeDirection) -> bool {
        let Some(target) = self.sources.swipe(direction) else {
            return false;
        };
        self.launch_target(&target, target_label(&target), LaunchSource::Gesture)
            .await
    }

    pub async fn open_weather_app(&self) -> bool {
        let Some(package) = parse_package(self.sources.weather_app.borrow().as_deref()) else {
            return false;
        };
        let target = ShortcutTarget::app(package);
        self.launch_target(&target, target_label(&target), LaunchSource::Home)
            .await
    }

    async fn launch_target(
        &self,
        target: &ShortcutTarget,
        label: &str,
        source: LaunchSource,
    ) -> bool {
        let launched = self
            .directory
            .launch_target(target, &LaunchOptions::for_source(source))
            .await;
        if !launched {
            notify_launch_failed(&self.events, &target.encode(), label);
        }
        launched
    }

    /// Ticks the header clock every `period` until stopped or the engine
    /// is dropped.
    pub async fn start_clock(self: &Arc<Self>, period: Duration) {
        let weak = Arc::downgrade(self);
        let task = PeriodicTask::spawn(period, move || {
            let weak = weak.clone();
            async move {
                if let Some(engine) = weak.upgrade() {
                    engine.set_clock(ClockSnapshot::now()).await;
                }
            }
        });
        *self.clock_task.lock().await = Some(task);
    }

    pub async fn stop_clock(&self) {
        self.clock_task.lock().await.take();
    }

    pub async fn set_clock(&self, snapshot: ClockSnapshot) {
        *self.clock.lock().await = Some(snapshot);
        self.recompute().await;
    }

    /// Refreshes the weather header every `period` until stopped or the
    /// engine is dropped.
    pub async fn start_weather_refresh(
        self: &Arc<Self>,
        client: Arc<WeatherClient>,
        location: WeatherLocation,
        period: Duration,
    ) {
        let weak = Arc::downgrade(self);
        let task = PeriodicTask::spawn(period, move || {
            let weak = weak.clone();
            let client = Arc::clone(&client);
            async move {
                if let Some(engine) = weak.upgrade() {
                    engine.refresh_weather(&client, location).await;
                }
            }
        });
        *self.weather_task.lock().await = Some(task);
    }

    pub async fn stop_weather_refresh(&self) {
        self.weather_task.lock().await.take();
    }

    /// One refresh. Opting out of location clears the snapshot without a
    /// request; a failed request keeps the previous one.
    pub async fn refresh_weather(&self, client: &WeatherClient, location: WeatherLocation) {
        let opted_out = match self.prefs.flag(Flag::WeatherLocationOptedOut).await {
            Ok(opted_out) => opted_out,
            Err(error) => {
                warn!(%error, "failed to read weather opt-out");
                return;
            }
        };

        if opted_out {
            *self.weather.lock().await = None;
        } else {
            match client.current(location).await {
                Ok(snapshot) => *self.weather.lock().await = Some(snapshot),
                Err(error) => {
                    warn!(%error, "weather refresh failed");
                    return;
                }
            }
        }
        self.recompute().await;
    }
}

#[cfg(test)]
#[path = "tests/home_tests.rs"]
mod tests;
