use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::{PreferenceStore, Storage};

// Writers hold the watcher map lock across the write and the publish so an
// observer created concurrently never starts from a stale value.
#[async_trait]
impl PreferenceStore for Storage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read preference '{key}'"))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let watchers = self.preference_watchers.lock().await;
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write preference '{key}'"))?;

        if let Some(sender) = watchers.get(key) {
            sender.send_replace(Some(value.to_string()));
        }
        debug!(key, "preference updated");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let watchers = self.preference_watchers.lock().await;
        sqlx::query("DELETE FROM preferences WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove preference '{key}'"))?;

        if let Some(sender) = watchers.get(key) {
            sender.send_replace(None);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let watchers = self.preference_watchers.lock().await;
        sqlx::query("DELETE FROM preferences")
            .execute(&self.pool)
            .await
            .context("failed to clear preferences")?;

        for sender in watchers.values() {
            sender.send_if_modified(|value| value.take().is_some());
        }
        debug!("preferences cleared");
        Ok(())
    }

    async fn observe(&self, key: &str) -> Result<watch::Receiver<Option<String>>> {
        let mut watchers = self.preference_watchers.lock().await;
        if let Some(sender) = watchers.get(key) {
            return Ok(sender.subscribe());
        }

        let current = self.get(key).await?;
        let (sender, receiver) = watch::channel(current);
        watchers.insert(key.to_string(), sender);
        Ok(receiver)
    }
}
