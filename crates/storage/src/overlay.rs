use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::domain::CategoryDefinition;
use sqlx::{Pool, Sqlite, Transaction};
use tokio::sync::watch;
use tracing::debug;

use crate::{
    AppCategories, CategoryDefinitions, HiddenApps, OverlayStore, RenamedApps, Storage,
};

#[derive(Debug, Clone, Copy)]
enum Table {
    Hidden,
    Renamed,
    Categories,
    Definitions,
}

pub(crate) async fn load_hidden(pool: &Pool<Sqlite>) -> Result<BTreeSet<String>> {
    let rows: Vec<String> = sqlx::query_scalar("SELECT package_name FROM hidden_apps")
        .fetch_all(pool)
        .await
        .context("failed to load hidden_apps")?;
    Ok(rows.into_iter().collect())
}

pub(crate) async fn load_renamed(pool: &Pool<Sqlite>) -> Result<BTreeMap<String, String>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT package_name, custom_name FROM renamed_apps")
            .fetch_all(pool)
            .await
            .context("failed to load renamed_apps")?;
    Ok(rows.into_iter().collect())
}

pub(crate) async fn load_categories(pool: &Pool<Sqlite>) -> Result<BTreeMap<String, String>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT package_name, category FROM app_categories")
            .fetch_all(pool)
            .await
            .context("failed to load app_categories")?;
    Ok(rows.into_iter().collect())
}

pub(crate) async fn load_definitions(pool: &Pool<Sqlite>) -> Result<Vec<CategoryDefinition>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT name, position FROM category_definitions ORDER BY position, name")
            .fetch_all(pool)
            .await
            .context("failed to load category_definitions")?;
    Ok(rows
        .into_iter()
        .map(|(name, position)| CategoryDefinition { name, position })
        .collect())
}

enum Loaded {
    Hidden(BTreeSet<String>),
    Renamed(BTreeMap<String, String>),
    Categories(BTreeMap<String, String>),
    Definitions(Vec<CategoryDefinition>),
}

impl Storage {
    /// Re-reads every table in `tables`, then sends them together so no
    /// subscriber wakes between a half-published set.
    async fn publish(&self, tables: &[Table]) -> Result<()> {
        let _guard = self.overlays.publish_lock.lock().await;
        let mut loaded = Vec::with_capacity(tables.len());
        for table in tables {
            loaded.push(match table {
                Table::Hidden => Loaded::Hidden(load_hidden(&self.pool).await?),
                Table::Renamed => Loaded::Renamed(load_renamed(&self.pool).await?),
                Table::Categories => Loaded::Categories(load_categories(&self.pool).await?),
                Table::Definitions => Loaded::Definitions(load_definitions(&self.pool).await?),
            });
        }
        for rows in loaded {
            match rows {
                Loaded::Hidden(rows) => {
                    self.overlays.hidden.send_replace(Arc::new(rows));
                }
                Loaded::Renamed(rows) => {
                    self.overlays.renamed.send_replace(Arc::new(rows));
                }
                Loaded::Categories(rows) => {
                    self.overlays.categories.send_replace(Arc::new(rows));
                }
                Loaded::Definitions(rows) => {
                    self.overlays.definitions.send_replace(Arc::new(rows));
                }
            }
        }
        debug!(?tables, "published overlay tables");
        Ok(())
    }
}

async fn write_assignments(
    tx: &mut Transaction<'_, Sqlite>,
    assignments: &[(String, String)],
) -> Result<()> {
    for (package, category) in assignments {
        sqlx::query(
            "INSERT INTO app_categories (package_name, category) VALUES (?, ?)
             ON CONFLICT(package_name) DO UPDATE SET category = excluded.category",
        )
        .bind(package)
        .bind(category)
        .execute(&mut **tx)
        .await
        .context("failed to assign app category")?;
    }
    Ok(())
}

#[async_trait]
impl OverlayStore for Storage {
    fn hidden_apps(&self) -> watch::Receiver<HiddenApps> {
        self.overlays.hidden.subscribe()
    }

    fn renamed_apps(&self) -> watch::Receiver<RenamedApps> {
        self.overlays.renamed.subscribe()
    }

    fn app_categories(&self) -> watch::Receiver<AppCategories> {
        self.overlays.categories.subscribe()
    }

    fn category_definitions(&self) -> watch::Receiver<CategoryDefinitions> {
        self.overlays.definitions.subscribe()
    }

    async fn hide_app(&self, package: &str) -> Result<()> {
        sqlx::query("INSERT INTO hidden_apps (package_name) VALUES (?) ON CONFLICT DO NOTHING")
            .bind(package)
            .execute(&self.pool)
            .await
            .context("failed to hide app")?;
        self.publish(&[Table::Hidden]).await
    }

    async fn unhide_app(&self, package: &str) -> Result<()> {
        sqlx::query("DELETE FROM hidden_apps WHERE package_name = ?")
            .bind(package)
            .execute(&self.pool)
            .await
            .context("failed to unhide app")?;
        self.publish(&[Table::Hidden]).await
    }

    async fn rename_app(&self, package: &str, custom_name: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO renamed_apps (package_name, custom_name) VALUES (?, ?)
             ON CONFLICT(package_name) DO UPDATE SET custom_name = excluded.custom_name",
        )
        .bind(package)
        .bind(custom_name)
        .execute(&self.pool)
        .await
        .context("failed to rename app")?;
        self.publish(&[Table::Renamed]).await
    }

    async fn clear_app_rename(&self, package: &str) -> Result<()> {
        sqlx::query("DELETE FROM renamed_apps WHERE package_name = ?")
            .bind(package)
            .execute(&self.pool)
            .await
            .context("failed to clear app rename")?;
        self.publish(&[Table::Renamed]).await
    }

    async fn set_app_category(&self, package: &str, category: &str) -> Result<()> {
        self.set_app_categories(&[(package.to_string(), category.to_string())])
            .await
    }

    async fn set_app_categories(&self, assignments: &[(String, String)]) -> Result<()> {
        if assignments.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        write_assignments(&mut tx, assignments).await?;
        tx.commit().await?;
        self.publish(&[Table::Categories]).await
    }

    async fn clear_app_category(&self, package: &str) -> Result<()> {
        sqlx::query("DELETE FROM app_categories WHERE package_name = ?")
            .bind(package)
            .execute(&self.pool)
            .await
            .context("failed to clear app category")?;
        self.publish(&[Table::Categories]).await
    }

    async fn upsert_category_definition(&self, name: &str, position: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO category_definitions (name, position) VALUES (?, ?)
             ON CONFLICT(name) DO UPDATE SET position = excluded.position",
        )
        .bind(name)
        .bind(position)
        .execute(&self.pool)
        .await
        .context("failed to store category definition")?;
        self.publish(&[Table::Definitions]).await
    }

    async fn rename_category(
        &self,
        old_name: &str,
        new_name: &str,
        assignments: &[(String, String)],
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        write_assignments(&mut tx, assignments).await?;

        let position: Option<i64> =
            sqlx::query_scalar("SELECT position FROM category_definitions WHERE name = ?")
                .bind(old_name)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(position) = position {
            sqlx::query("DELETE FROM category_definitions WHERE name = ?")
                .bind(old_name)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO category_definitions (name, position) VALUES (?, ?)
                 ON CONFLICT(name) DO UPDATE SET position = excluded.position",
            )
            .bind(new_name)
            .bind(position)
            .execute(&mut *tx)
            .await
            .context("failed to rename category definition")?;
        }
        tx.commit().await?;

        self.publish(&[Table::Categories, Table::Definitions]).await?;
        Ok(position.is_some())
    }

    async fn delete_category(&self, name: &str, assignments: &[(String, String)]) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        write_assignments(&mut tx, assignments).await?;
        let result = sqlx::query("DELETE FROM category_definitions WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .context("failed to delete category definition")?;
        tx.commit().await?;

        self.publish(&[Table::Categories, Table::Definitions]).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_category_definitions(&self, names: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM category_definitions")
            .execute(&mut *tx)
            .await?;
        for (position, name) in names.iter().enumerate() {
            sqlx::query("INSERT INTO category_definitions (name, position) VALUES (?, ?)")
                .bind(name)
                .bind(position as i64)
                .execute(&mut *tx)
                .await
                .context("failed to reorder category definitions")?;
        }
        tx.commit().await?;
        self.publish(&[Table::Definitions]).await
    }

    async fn clear_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for statement in [
            "DELETE FROM hidden_apps",
            "DELETE FROM renamed_apps",
            "DELETE FROM app_categories",
            "DELETE FROM category_definitions",
        ] {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("failed to run '{statement}'"))?;
        }
        tx.commit().await?;
        self.publish(&[
            Table::Hidden,
            Table::Renamed,
            Table::Categories,
            Table::Definitions,
        ])
        .await
    }
}
