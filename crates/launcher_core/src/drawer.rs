//! App drawer state: overlay merge, category chips, search filtering and
//! search-driven auto-launch.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Weak},
};

use anyhow::Result;
use shared::{
    domain::is_reserved_category, AppRecord, CategoryDefinition, ALL_APPS_CATEGORY,
    PRIVATE_CATEGORY,
};
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::{
    combine::ChangeFeed,
    directory::{sort_and_dedup, DirectoryRepository},
    events::{notify_launch_failed, EventSender, LauncherEvent},
    provider::{LaunchOptions, LaunchSource},
    ticker::ScopedTask,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawerUiState {
    /// Visible apps after overlays, sorted by label.
    pub all_apps: Vec<AppRecord>,
    pub filtered_apps: Vec<AppRecord>,
    pub private_apps: Vec<AppRecord>,
    pub filtered_private_apps: Vec<AppRecord>,
    pub categories: Vec<String>,
    pub search_query: String,
    pub selected_category: String,
    pub private_space_unlocked: bool,
}

impl Default for DrawerUiState {
    fn default() -> Self {
        Self {
            all_apps: Vec::new(),
            filtered_apps: Vec::new(),
            private_apps: Vec::new(),
            filtered_private_apps: Vec::new(),
            categories: vec![ALL_APPS_CATEGORY.to_string()],
            search_query: String::new(),
            selected_category: ALL_APPS_CATEGORY.to_string(),
            private_space_unlocked: false,
        }
    }
}

/// Drops hidden apps, then applies renames and category overrides to
/// copies of the directory records and re-sorts by the shown label.
pub fn apply_overlays(
    apps: &[AppRecord],
    hidden: &BTreeSet<String>,
    renamed: &BTreeMap<String, String>,
    categories: &BTreeMap<String, String>,
) -> Vec<AppRecord> {
    let visible = apps
        .iter()
        .filter(|app| !hidden.contains(&app.package))
        .map(|app| {
            let mut app = app.clone();
            if let Some(label) = renamed.get(&app.package) {
                app.label = label.clone();
            }
            if let Some(category) = categories.get(&app.package) {
                app.category = category.clone();
            }
            app
        })
        .collect();
    sort_and_dedup(visible)
}

/// "All apps", then "Private" when it has something to show, then the
/// user's definitions in stored order, then every other category some app
/// carries, alphabetically.
pub fn derive_categories(
    apps: &[AppRecord],
    definitions: &[CategoryDefinition],
    show_private: bool,
) -> Vec<String> {
    let mut categories = vec![ALL_APPS_CATEGORY.to_string()];
    if show_private {
        categories.push(PRIVATE_CATEGORY.to_string());
    }

    let mut known: BTreeSet<String> = BTreeSet::new();
    for definition in definitions {
        if known.insert(definition.name.to_lowercase()) {
            categories.push(definition.name.clone());
        }
    }

    let mut dynamic: Vec<&str> = Vec::new();
    for app in apps {
        let category = app.category.trim();
        if category.is_empty() || is_reserved_category(category) {
            continue;
        }
        if known.insert(category.to_lowercase()) {
            dynamic.push(category);
        }
    }
    dynamic.sort_by_cached_key(|category| category.to_lowercase());
    categories.extend(dynamic.into_iter().map(str::to_string));
    categories
}

fn matches_query(app: &AppRecord, needle: &str) -> bool {
    needle.is_empty() || app.label.to_lowercase().contains(needle)
}

/// Main list filter. Selecting "Private" empties it.
pub fn filter_apps(apps: &[AppRecord], query: &str, category: &str) -> Vec<AppRecord> {
    let category = category.trim();
    if category.eq_ignore_ascii_case(PRIVATE_CATEGORY) {
        return Vec::new();
    }
    let needle = query.trim().to_lowercase();
    let any_category = category.eq_ignore_ascii_case(ALL_APPS_CATEGORY);
    apps.iter()
        .filter(|app| matches_query(app, &needle))
        .filter(|app| any_category || app.category.trim().eq_ignore_ascii_case(category))
        .cloned()
        .collect()
}

/// Private list filter: the same search rule, and the category rule only
/// for categories other than "All apps" and "Private".
pub fn filter_private_apps(apps: &[AppRecord], query: &str, category: &str) -> Vec<AppRecord> {
    let category = category.trim();
    let needle = query.trim().to_lowercase();
    let any_category = is_reserved_category(category);
    apps.iter()
        .filter(|app| matches_query(app, &needle))
        .filter(|app| any_category || app.category.trim().eq_ignore_ascii_case(category))
        .cloned()
        .collect()
}

/// The app to start for `query`, if exactly one candidate matches across
/// the private and main lists. A leading space keeps the drawer in browse
/// mode.
pub fn auto_launch_candidate<'a>(
    query: &str,
    private_matches: &'a [AppRecord],
    main_matches: &'a [AppRecord],
) -> Option<&'a AppRecord> {
    if query.starts_with(' ') || query.trim().is_empty() {
        return None;
    }
    let mut candidates = private_matches.iter().chain(main_matches.iter());
    let first = candidates.next()?;
    if candidates.next().is_some() {
        return None;
    }
    Some(first)
}

#[derive(Debug, Clone)]
struct DrawerInputs {
    search_query: String,
    selected_category: String,
}

#[derive(Debug, Clone, Default)]
struct PrivateSpace {
    unlocked: bool,
    apps: Vec<AppRecord>,
}

pub struct DrawerEngine {
    directory: Arc<DirectoryRepository>,
    events: EventSender,
    state: watch::Sender<DrawerUiState>,
    inputs: Mutex<DrawerInputs>,
    private_space: Mutex<PrivateSpace>,
    // One recompute at a time, so the last publish saw the latest inputs.
    recompute_lock: Mutex<()>,
    refresh_task: Mutex<Option<ScopedTask>>,
}

impl DrawerEngine {
    /// Builds the engine, loads the first state and starts following the
    /// directory and every overlay table.
    pub async fn start(directory: Arc<DirectoryRepository>, events: EventSender) -> Arc<Self> {
        let overlays = Arc::clone(directory.overlays());
        let mut feed = ChangeFeed::new()
            .watch(overlays.hidden_apps())
            .watch(overlays.renamed_apps())
            .watch(overlays.app_categories())
            .watch(overlays.category_definitions())
            .watch(directory.subscribe_changes());

        let engine = Arc::new(Self {
            directory,
            events,
            state: watch::channel(DrawerUiState::default()).0,
            inputs: Mutex::new(DrawerInputs {
                search_query: String::new(),
                selected_category: ALL_APPS_CATEGORY.to_string(),
            }),
            private_space: Mutex::new(PrivateSpace::default()),
            recompute_lock: Mutex::new(()),
            refresh_task: Mutex::new(None),
        });
        engine.refresh_private_space().await;

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
        engine
    }

    pub fn subscribe(&self) -> watch::Receiver<DrawerUiState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> DrawerUiState {
        self.state.borrow().clone()
    }

    pub fn directory(&self) -> &Arc<DirectoryRepository> {
        &self.directory
    }

    /// Updates the query and, when it names exactly one app, launches it.
    /// Returns true when an app was auto-launched.
    ///
    /// Candidates come from the stores as they are now, not from the last
    /// published state, so an app hidden a moment ago is never started.
    pub async fn set_search_query(&self, query: &str) -> bool {
        let guard = self.recompute_lock.lock().await;
        let _gate = self.directory.snapshot_read().await;
        let all_apps = self.visible_apps().await;

        let mut inputs = self.inputs.lock().await;
        inputs.search_query = query.to_string();
        let main_matches = filter_apps(&all_apps, query, &inputs.selected_category);
        let private_matches = {
            let private_space = self.private_space.lock().await;
            filter_private_apps(&private_space.apps, query, &inputs.selected_category)
        };

        let mut launched = false;
        if let Some(app) = auto_launch_candidate(query, &private_matches, &main_matches) {
            let options = LaunchOptions::for_source(LaunchSource::Search);
            if self.directory.launch_record(app, &options).await {
                info!(
                    package = %app.package,
                    private = app.is_private(),
                    "auto-launched from search"
                );
                inputs.search_query.clear();
                inputs.selected_category = ALL_APPS_CATEGORY.to_string();
                let _ = self.events.send(LauncherEvent::AutoLaunched {
                    package: app.package.clone(),
                    private: app.is_private(),
                });
                launched = true;
            } else {
                notify_launch_failed(&self.events, &app.package, &app.label);
            }
        }
        drop(inputs);

        self.publish(&guard, all_apps).await;
        launched
    }

    pub async fn select_category(&self, category: &str) {
        let category = category.trim();
        let category = if category.is_empty() {
            ALL_APPS_CATEGORY
        } else {
            category
        };
        self.inputs.lock().await.selected_category = category.to_string();
        self.recompute().await;
    }

    /// Long-press rename on a category chip. Reserved chips are ignored.
    pub async fn rename_category(&self, old_name: &str, new_name: &str) -> Result<bool> {
        if is_reserved_category(old_name) || is_reserved_category(new_name) {
            debug!(old_name, new_name, "reserved category rename ignored");
            return Ok(false);
        }
        if !self.directory.rename_category(old_name, new_name).await? {
            return Ok(false);
        }
        {
            let mut inputs = self.inputs.lock().await;
            if inputs.selected_category.eq_ignore_ascii_case(old_name.trim()) {
                inputs.selected_category = new_name.trim().to_string();
            }
        }
        self.recompute().await;
        Ok(true)
    }

    /// Long-press delete on a category chip. Reserved chips are ignored; a
    /// deleted selection falls back to "All apps".
    pub async fn delete_category(&self, name: &str) -> Result<bool> {
        if is_reserved_category(name) {
            debug!(name, "reserved category delete ignored");
            return Ok(false);
        }
        if !self.directory.delete_category(name).await? {
            return Ok(false);
        }
        {
            let mut inputs = self.inputs.lock().await;
            if inputs.selected_category.eq_ignore_ascii_case(name.trim()) {
                inputs.selected_category = ALL_APPS_CATEGORY.to_string();
            }
        }
        self.recompute().await;
        Ok(true)
    }

    /// Re-reads the lock state and, when unlocked, the private app list.
    pub async fn refresh_private_space(&self) {
        let unlocked = self.directory.is_private_space_unlocked().await;
        let apps = if unlocked {
            self.directory.list_private_apps().await
        } else {
            Vec::new()
        };
        debug!(unlocked, count = apps.len(), "private space refreshed");
        *self.private_space.lock().await = PrivateSpace { unlocked, apps };
        self.recompute().await;
    }

    pub async fn on_profile_availability_changed(&self) {
        self.refresh_private_space().await;
    }

    /// Locking clears the private list right away instead of waiting for
    /// the profile availability signal.
    pub async fn set_private_space_locked(&self, locked: bool) -> bool {
        if locked {
            *self.private_space.lock().await = PrivateSpace::default();
            self.recompute().await;
        }
        let applied = self.directory.set_private_space_locked(locked).await;
        if !locked || !applied {
            self.refresh_private_space().await;
        }
        applied
    }

    pub async fn launch_app(&self, app: &AppRecord) -> bool {
        let options = LaunchOptions::for_source(LaunchSource::Drawer);
        let launched = self.directory.launch_record(app, &options).await;
        if !launched {
            notify_launch_failed(&self.events, &app.package, &app.label);
        }
        launched
    }

    /// Directory records with the current overlays applied.
    async fn visible_apps(&self) -> Vec<AppRecord> {
        let raw = self.directory.list_apps().await;
        let overlays = self.directory.overlays();
        let hidden = overlays.hidden_apps().borrow().clone();
        let renamed = overlays.renamed_apps().borrow().clone();
        let explicit = overlays.app_categories().borrow().clone();
        apply_overlays(&raw, &hidden, &renamed, &explicit)
    }

    async fn recompute(&self) {
        let guard = self.recompute_lock.lock().await;
        let _gate = self.directory.snapshot_read().await;
        let all_apps = self.visible_apps().await;
        self.publish(&guard, all_apps).await;
    }

    async fn publish(&self, _guard: &MutexGuard<'_, ()>, all_apps: Vec<AppRecord>) {
        let definitions = self
            .directory
            .overlays()
            .category_definitions()
            .borrow()
            .clone();
        let inputs = self.inputs.lock().await.clone();
        let private_space = self.private_space.lock().await.clone();

        let show_private = private_space.unlocked && !private_space.apps.is_empty();
        let next = DrawerUiState {
            filtered_apps: filter_apps(&all_apps, &inputs.search_query, &inputs.selected_category),
            filtered_private_apps: filter_private_apps(
                &private_space.apps,
                &inputs.search_query,
                &inputs.selected_category,
            ),
            categories: derive_categories(&all_apps, &definitions, show_private),
            all_apps,
            private_apps: private_space.apps,
            search_query: inputs.search_query,
            selected_category: inputs.selected_category,
            private_space_unlocked: private_space.unlocked,
        };

        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

#[cfg(test)]
#[path = "tests/drawer_tests.rs"]
mod tests;
