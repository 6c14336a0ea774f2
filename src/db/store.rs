use dashmap::DashMap;
use sqlx::Row;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::core::Database;
use crate::error::StoreError;
use crate::TARGET_DB;

/// String key-value storage that survives between runs of the cache layer.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn keys_with_prefix(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}

impl KeyValueStore for Database {
    #[instrument(target = "db", level = "debug", skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        debug!(target: TARGET_DB, "Lookup of key {}: {}", key, if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    #[instrument(target = "db", level = "debug", skip(self, value))]
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(updated_at)
        .execute(self.pool())
        .await?;

        debug!(target: TARGET_DB, "Stored key {} ({} bytes)", key, value.len());
        Ok(())
    }

    #[instrument(target = "db", level = "debug", skip(self))]
    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let affected_rows = sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(self.pool())
            .await?
            .rows_affected();

        debug!(target: TARGET_DB, "Removed key {} ({} rows)", key, affected_rows);
        Ok(())
    }

    #[instrument(target = "db", level = "debug", skip(self))]
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        // substr comparison avoids LIKE wildcards hidden in the prefix
        let rows = sqlx::query(
            "SELECT key FROM kv_store WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )
        .bind(prefix)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(|row| row.get::<String, _>("key")).collect())
    }
}

/// Process-local store, shared between clones.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
