use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::domain::CategoryDefinition;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use tokio::sync::{watch, Mutex};

mod overlay;
mod preferences;

pub type HiddenApps = Arc<BTreeSet<String>>;
/// package -> custom label
pub type RenamedApps = Arc<BTreeMap<String, String>>;
/// package -> explicit category
pub type AppCategories = Arc<BTreeMap<String, String>>;
/// Ordered by position.
pub type CategoryDefinitions = Arc<Vec<CategoryDefinition>>;

/// Async key-value store for user settings. Every key can be observed on
/// its own; absence is `None`.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
    async fn observe(&self, key: &str) -> Result<watch::Receiver<Option<String>>>;
}

/// Relational store for per-app user overlays.
///
/// Each table is exposed as a full-table watch channel that is republished
/// after every write touching it.
#[async_trait]
pub trait OverlayStore: Send + Sync {
    fn hidden_apps(&self) -> watch::Receiver<HiddenApps>;
    fn renamed_apps(&self) -> watch::Receiver<RenamedApps>;
    fn app_categories(&self) -> watch::Receiver<AppCategories>;
    fn category_definitions(&self) -> watch::Receiver<CategoryDefinitions>;

    async fn hide_app(&self, package: &str) -> Result<()>;
    async fn unhide_app(&self, package: &str) -> Result<()>;
    async fn rename_app(&self, package: &str, custom_name: &str) -> Result<()>;
    async fn clear_app_rename(&self, package: &str) -> Result<()>;
    async fn set_app_category(&self, package: &str, category: &str) -> Result<()>;
    /// Writes several assignments in one transaction.
    async fn set_app_categories(&self, assignments: &[(String, String)]) -> Result<()>;
    async fn clear_app_category(&self, package: &str) -> Result<()>;
    async fn upsert_category_definition(&self, name: &str, position: i64) -> Result<()>;
    /// Writes `assignments` and renames the definition `old_name`, keeping
    /// its position, in one transaction. Returns false when `old_name` is
    /// not defined; the assignments are written either way.
    async fn rename_category(
        &self,
        old_name: &str,
        new_name: &str,
        assignments: &[(String, String)],
    ) -> Result<bool>;
    /// Writes `assignments` and deletes the definition `name` in one
    /// transaction. Returns false when `name` was not defined.
    async fn delete_category(&self, name: &str, assignments: &[(String, String)]) -> Result<bool>;
    /// Replaces the whole list; positions become `0..names.len()`.
    async fn replace_category_definitions(&self, names: &[String]) -> Result<()>;
    async fn clear_all(&self) -> Result<()>;
}

/// SQLite-backed implementation of both stores.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
    overlays: Arc<OverlayChannels>,
    preference_watchers: Arc<Mutex<HashMap<String, watch::Sender<Option<String>>>>>,
}

struct OverlayChannels {
    hidden: watch::Sender<HiddenApps>,
    renamed: watch::Sender<RenamedApps>,
    categories: watch::Sender<AppCategories>,
    definitions: watch::Sender<CategoryDefinitions>,
    // Serialises re-reads so the last publish reflects the last write.
    publish_lock: Mutex<()>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        let pool = if is_memory_url(database_url) {
            // Every connection to an in-memory database is a separate
            // database, so keep exactly one alive for the pool's lifetime.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(connect_options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(connect_options)
                .await?
        };
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run launcher migrations")?;

        let overlays = OverlayChannels {
            hidden: watch::channel(Arc::new(overlay::load_hidden(&pool).await?)).0,
            renamed: watch::channel(Arc::new(overlay::load_renamed(&pool).await?)).0,
            categories: watch::channel(Arc::new(overlay::load_categories(&pool).await?)).0,
            definitions: watch::channel(Arc::new(overlay::load_definitions(&pool).await?)).0,
            publish_lock: Mutex::new(()),
        };

        Ok(Self {
            pool,
            overlays: Arc::new(overlays),
            preference_watchers: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
