//! Single source of truth for which apps exist.
//!
//! Wraps the host provider with an in-memory cache, category inference and
//! shortcut enumeration, and forwards overlay writes to the overlay store.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::Result;
use shared::{
    domain::{validate_category_name, ActivityHandle, IconHandle, ProfileHandle},
    AppRecord, RawAppEntry, RejectedMutation, ShortcutAction, ShortcutTarget,
};
use storage::OverlayStore;
use tokio::sync::{watch, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::{
    heuristics::infer_category,
    provider::{AppDirectoryProvider, LaunchOptions},
};

pub const OPEN_APP_ACTION: &str = "Open app";

pub struct DirectoryRepository {
    provider: Arc<dyn AppDirectoryProvider>,
    overlays: Arc<dyn OverlayStore>,
    own_package: Option<String>,
    cache: RwLock<Option<Arc<Vec<AppRecord>>>>,
    // Bumped by every invalidation; a rebuild that started under an older
    // generation must not be cached.
    generation: AtomicU64,
    rebuild_lock: Mutex<()>,
    changes: watch::Sender<u64>,
    // Engine recomputes hold this shared; writes spanning several tables
    // or stores hold it exclusively, so no snapshot mixes old and new rows.
    snapshot_gate: RwLock<()>,
}

pub(crate) fn reject(operation: &'static str, reason: RejectedMutation) -> bool {
    debug!(operation, %reason, "mutation rejected");
    false
}

/// Explicit override if present, else the inferred category.
pub fn effective_category<'a>(
    app: &'a AppRecord,
    explicit: &'a std::collections::BTreeMap<String, String>,
) -> &'a str {
    explicit
        .get(&app.package)
        .map(String::as_str)
        .unwrap_or(&app.category)
}

/// Sorts by lowercase label, then keeps the first record per package.
pub fn sort_and_dedup(mut apps: Vec<AppRecord>) -> Vec<AppRecord> {
    apps.sort_by_cached_key(AppRecord::sort_key);
    let mut seen = HashSet::new();
    apps.retain(|app| seen.insert(app.package.clone()));
    apps
}

impl DirectoryRepository {
    pub fn new(
        provider: Arc<dyn AppDirectoryProvider>,
        overlays: Arc<dyn OverlayStore>,
        own_package: Option<String>,
    ) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            provider,
            overlays,
            own_package,
            cache: RwLock::new(None),
            generation: AtomicU64::new(0),
            rebuild_lock: Mutex::new(()),
            changes,
            snapshot_gate: RwLock::new(()),
        }
    }

    pub fn overlays(&self) -> &Arc<dyn OverlayStore> {
        &self.overlays
    }

    pub(crate) async fn snapshot_read(&self) -> RwLockReadGuard<'_, ()> {
        self.snapshot_gate.read().await
    }

    pub(crate) async fn snapshot_write(&self) -> RwLockWriteGuard<'_, ()> {
        self.snapshot_gate.write().await
    }

    /// Ticks once per invalidation.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Cached app list, rebuilt from the provider on a miss. Readers always
    /// see either the previous list or a complete new one.
    pub async fn list_apps(&self) -> Arc<Vec<AppRecord>> {
        if let Some(apps) = self.cache.read().await.as_ref() {
            return Arc::clone(apps);
        }

        let _rebuild = self.rebuild_lock.lock().await;
        if let Some(apps) = self.cache.read().await.as_ref() {
            return Arc::clone(apps);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let apps = match self.build_app_list().await {
            Ok(apps) => Arc::new(apps),
            Err(error) => {
                warn!(%error, "failed to enumerate launchable apps");
                return Arc::new(Vec::new());
            }
        };

        let mut cache = self.cache.write().await;
        if self.generation.load(Ordering::SeqCst) == generation {
            *cache = Some(Arc::clone(&apps));
        }
        info!(count = apps.len(), "app directory rebuilt");
        apps
    }

    /// Drops the cache. Safe to call any number of times, from any task.
    pub async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.cache.write().await = None;
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
        debug!("app directory invalidated");
    }

    async fn build_app_list(&self) -> Result<Vec<AppRecord>> {
        let raw = self.provider.query_launchable_apps().await?;
        let mut apps = Vec::with_capacity(raw.len());
        for entry in raw {
            if self.own_package.as_deref() == Some(entry.package.as_str()) {
                continue;
            }
            let icon = self.load_icon(&entry.package).await;
            apps.push(self.to_record(entry, icon, None));
        }
        Ok(sort_and_dedup(apps))
    }

    fn to_record(
        &self,
        entry: RawAppEntry,
        icon: Option<IconHandle>,
        profile: Option<ProfileHandle>,
    ) -> AppRecord {
        let category = infer_category(&entry.package, &entry.label).to_string();
        AppRecord {
            package: entry.package,
            label: entry.label,
            icon,
            category,
            activity: profile.as_ref().and(entry.activity),
            profile,
        }
    }

    async fn load_icon(&self, package: &str) -> Option<IconHandle> {
        match self.provider.load_icon(package).await {
            Ok(icon) => icon,
            Err(error) => {
                debug!(package, %error, "icon load failed");
                None
            }
        }
    }

    pub async fn launch(&self, package: &str, options: &LaunchOptions) -> bool {
        match self.provider.launch(package, options).await {
            Ok(launched) => {
                if !launched {
                    debug!(package, "no launchable entry");
                }
                launched
            }
            Err(error) => {
                warn!(package, %error, "launch failed");
                false
            }
        }
    }

    /// The only way to start an app that lives in the private profile.
    pub async fn launch_private_profile_app(
        &self,
        activity: &ActivityHandle,
        profile: &ProfileHandle,
    ) -> bool {
        match self.provider.launch_in_profile(activity, profile).await {
            Ok(launched) => launched,
            Err(error) => {
                warn!(activity = activity.as_str(), %error, "private launch failed");
                false
            }
        }
    }

    pub async fn launch_record(&self, app: &AppRecord, options: &LaunchOptions) -> bool {
        match (&app.activity, &app.profile) {
            (Some(activity), Some(profile)) => {
                self.launch_private_profile_app(activity, profile).await
            }
            _ => self.launch(&app.package, options).await,
        }
    }

    pub async fn launch_target(&self, target: &ShortcutTarget, options: &LaunchOptions) -> bool {
        let result = match target {
            ShortcutTarget::App { package } => return self.launch(package, options).await,
            ShortcutTarget::DeepLink { uri } => self.provider.open_deep_link(uri).await,
            ShortcutTarget::LauncherShortcut {
                package,
                shortcut_id,
            } => self.provider.start_shortcut(package, shortcut_id).await,
        };
        match result {
            Ok(launched) => launched,
            Err(error) => {
                warn!(target = %target, %error, "target launch failed");
                false
            }
        }
    }

    pub async fn private_profile(&self) -> Option<ProfileHandle> {
        match self.provider.private_profile().await {
            Ok(profile) => profile,
            Err(error) => {
                debug!(%error, "private profile query failed");
                None
            }
        }
    }

    pub async fn is_private_space_unlocked(&self) -> bool {
        let Some(profile) = self.private_profile().await else {
            return false;
        };
        self.provider
            .is_private_space_unlocked(&profile)
            .await
            .unwrap_or_else(|error| {
                debug!(%error, "private space state query failed");
                false
            })
    }

    pub async fn set_private_space_locked(&self, locked: bool) -> bool {
        let Some(profile) = self.private_profile().await else {
            return false;
        };
        match self.provider.set_private_space_locked(&profile, locked).await {
            Ok(applied) => applied,
            Err(error) => {
                warn!(locked, %error, "private space lock request failed");
                false
            }
        }
    }

    /// Apps in the private profile, sorted by label. Empty when there is no
    /// profile or it is locked. Not cached.
    pub async fn list_private_apps(&self) -> Vec<AppRecord> {
        let Some(profile) = self.private_profile().await else {
            return Vec::new();
        };
        let raw = match self.provider.query_private_profile_apps(&profile).await {
            Ok(raw) => raw,
            Err(error) => {
                debug!(%error, "private app query failed");
                return Vec::new();
            }
        };

        let mut apps = Vec::with_capacity(raw.len());
        for entry in raw {
            if entry.activity.is_none() {
                debug!(package = %entry.package, "private app without activity skipped");
                continue;
            }
            let icon = self.load_icon(&entry.package).await;
            apps.push(self.to_record(entry, icon, Some(profile.clone())));
        }
        sort_and_dedup(apps)
    }

    /// One "open app" action per app plus every enabled shortcut it
    /// publishes, sorted by app label then action label.
    pub async fn enumerate_shortcut_actions(&self) -> Vec<ShortcutAction> {
        let apps = self.list_apps().await;
        let mut actions = Vec::new();
        for app in apps.iter() {
            actions.push(ShortcutAction {
                app_label: app.label.clone(),
                action_label: OPEN_APP_ACTION.to_string(),
                target: ShortcutTarget::app(&app.package),
            });

            let shortcuts = match self.provider.resolve_shortcuts(&app.package).await {
                Ok(shortcuts) => shortcuts,
                Err(error) => {
                    debug!(package = %app.package, %error, "shortcut query unavailable");
                    Vec::new()
                }
            };

            let mut seen = HashSet::new();
            for shortcut in shortcuts.iter().filter(|shortcut| shortcut.enabled) {
                if !seen.insert(shortcut.id.as_str()) {
                    continue;
                }
                let Some(label) = shortcut.display_label() else {
                    continue;
                };
                actions.push(ShortcutAction {
                    app_label: app.label.clone(),
                    action_label: label.to_string(),
                    target: ShortcutTarget::launcher_shortcut(&app.package, &shortcut.id),
                });
            }
        }

        actions.sort_by_cached_key(|action| {
            (
                action.app_label.to_lowercase(),
                action.action_label.to_lowercase(),
            )
        });
        actions
    }

    pub async fn hide_app(&self, package: &str) -> Result<()> {
        self.overlays.hide_app(package).await
    }

    pub async fn unhide_app(&self, package: &str) -> Result<()> {
        self.overlays.unhide_app(package).await
    }

    /// A blank label removes the rename.
    pub async fn rename_app(&self, package: &str, label: &str) -> Result<()> {
        let label = label.trim();
        if label.is_empty() {
            self.overlays.clear_app_rename(package).await
        } else {
            self.overlays.rename_app(package, label).await
        }
    }

    /// A blank category removes the override; reserved names are rejected.
    pub async fn set_app_category(&self, package: &str, category: &str) -> Result<bool> {
        if category.trim().is_empty() {
            self.overlays.clear_app_category(package).await?;
            return Ok(true);
        }
        let category = match validate_category_name(category) {
            Ok(category) => category,
            Err(reason) => return Ok(reject("set_app_category", reason)),
        };
        self.overlays.set_app_category(package, &category).await?;
        Ok(true)
    }

    pub async fn add_category_definition(&self, name: &str) -> Result<bool> {
        let name = match validate_category_name(name) {
            Ok(name) => name,
            Err(reason) => return Ok(reject("add_category_definition", reason)),
        };
        let definitions = self.overlays.category_definitions().borrow().clone();
        if definitions
            .iter()
            .any(|definition| definition.name.eq_ignore_ascii_case(&name))
        {
            return Ok(reject(
                "add_category_definition",
                RejectedMutation::DuplicateCategory(name),
            ));
        }
        let position = definitions
            .iter()
            .map(|definition| definition.position + 1)
            .max()
            .unwrap_or(0);
        self.overlays
            .upsert_category_definition(&name, position)
            .await?;
        Ok(true)
    }

    /// Renames a category, moving every app whose effective category was
    /// `old_name` onto `new_name`. A defined category keeps its position.
    pub async fn rename_category(&self, old_name: &str, new_name: &str) -> Result<bool> {
        let (old_name, new_name) =
            match (validate_category_name(old_name), validate_category_name(new_name)) {
                (Ok(old_name), Ok(new_name)) => (old_name, new_name),
                (Err(reason), _) | (_, Err(reason)) => {
                    return Ok(reject("rename_category", reason))
                }
            };
        if old_name == new_name {
            return Ok(false);
        }

        let _gate = self.snapshot_write().await;
        let definitions = self.overlays.category_definitions().borrow().clone();
        let stored_old = definitions
            .iter()
            .find(|definition| definition.name.eq_ignore_ascii_case(&old_name))
            .map(|definition| definition.name.clone());
        let clashes = !old_name.eq_ignore_ascii_case(&new_name)
            && definitions
                .iter()
                .any(|definition| definition.name.eq_ignore_ascii_case(&new_name));
        if clashes {
            return Ok(reject(
                "rename_category",
                RejectedMutation::DuplicateCategory(new_name),
            ));
        }

        let moves = self.category_moves(&old_name, &new_name).await;
        if stored_old.is_none() && moves.is_empty() {
            return Ok(reject(
                "rename_category",
                RejectedMutation::UnknownCategory(old_name),
            ));
        }
        self.overlays
            .rename_category(stored_old.as_deref().unwrap_or(&old_name), &new_name, &moves)
            .await?;
        info!(from = %old_name, to = %new_name, migrated = moves.len(), "category renamed");
        Ok(true)
    }

    /// Deletes a category. Apps that were in it become uncategorized.
    pub async fn delete_category(&self, name: &str) -> Result<bool> {
        let name = match validate_category_name(name) {
            Ok(name) => name,
            Err(reason) => return Ok(reject("delete_category", reason)),
        };
        let _gate = self.snapshot_write().await;
        let stored = self
            .overlays
            .category_definitions()
            .borrow()
            .iter()
            .find(|definition| definition.name.eq_ignore_ascii_case(&name))
            .map(|definition| definition.name.clone());

        let moves = self.category_moves(&name, "").await;
        if stored.is_none() && moves.is_empty() {
            return Ok(reject(
                "delete_category",
                RejectedMutation::UnknownCategory(name),
            ));
        }
        self.overlays
            .delete_category(stored.as_deref().unwrap_or(&name), &moves)
            .await?;
        info!(category = %name, migrated = moves.len(), "category deleted");
        Ok(true)
    }

    /// Stores `names` as the new definition order. Definitions missing from
    /// `names` keep their relative order after the listed ones.
    pub async fn reorder_category_definitions(&self, names: &[String]) -> Result<bool> {
        let definitions = self.overlays.category_definitions().borrow().clone();
        let mut ordered: Vec<String> = Vec::with_capacity(definitions.len());
        for name in names {
            let Some(definition) = definitions
                .iter()
                .find(|definition| definition.name.eq_ignore_ascii_case(name.trim()))
            else {
                continue;
            };
            if !ordered.contains(&definition.name) {
                ordered.push(definition.name.clone());
            }
        }
        for definition in definitions.iter() {
            if !ordered.contains(&definition.name) {
                ordered.push(definition.name.clone());
            }
        }

        let unchanged = ordered
            .iter()
            .zip(definitions.iter())
            .all(|(name, definition)| *name == definition.name);
        if unchanged {
            return Ok(false);
        }
        self.overlays.replace_category_definitions(&ordered).await?;
        Ok(true)
    }

    /// Assignments that move every app whose effective category is `from`
    /// onto `to`.
    async fn category_moves(&self, from: &str, to: &str) -> Vec<(String, String)> {
        let apps = self.list_apps().await;
        let explicit = self.overlays.app_categories().borrow().clone();

        let mut assignments: Vec<(String, String)> = apps
            .iter()
            .filter(|app| effective_category(app, &explicit).eq_ignore_ascii_case(from))
            .map(|app| (app.package.clone(), to.to_string()))
            .collect();
        // Overrides for apps that are not installed right now move too.
        for (package, category) in explicit.iter() {
            if category.eq_ignore_ascii_case(from)
                && !assignments.iter().any(|(assigned, _)| assigned == package)
            {
                assignments.push((package.clone(), to.to_string()));
            }
        }

        assignments
    }
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;
