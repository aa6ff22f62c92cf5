//! Client-side key/value storage for session state.
//!
//! Values are plain strings with no expiry. [`SqliteStore`] persists them in a
//! local SQLite file; [`MemoryStore`] keeps them for the life of the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create state directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

/// SQLite-backed store (table `client_state`).
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and its parent directory.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %path.display(), "opened client state store");
        Self::init(pool).await
    }

    /// A private in-memory database. The single connection is never recycled,
    /// so contents live as long as the store.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS client_state (
                key        TEXT PRIMARY KEY NOT NULL,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ClientStore for SqliteStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT value
            FROM client_state
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO client_state (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key)
            DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM client_state WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Process-local store, for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.inner.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.inner
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.inner.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise(store: &dyn ClientStore) {
        assert_eq!(store.get("isLoggedIn").await.unwrap(), None);

        store.set("isLoggedIn", "true").await.unwrap();
        store.set("isLoggedIn", "false").await.unwrap();
        assert_eq!(store.get("isLoggedIn").await.unwrap().as_deref(), Some("false"));

        store.remove("isLoggedIn").await.unwrap();
        store.remove("isLoggedIn").await.unwrap();
        assert_eq!(store.get("isLoggedIn").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_upserts_and_removes() {
        exercise(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn sqlite_store_upserts_and_removes() {
        let store = SqliteStore::in_memory().await.unwrap();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn sqlite_store_persists_across_reopen() {
        let dir = std::env::temp_dir().join(format!("karatbook-store-{}", uuid::Uuid::now_v7()));
        let path = dir.join("nested").join("state.db");

        let store = SqliteStore::open(&path).await.unwrap();
        store.set("userData", r#"{"name":"Meera"}"#).await.unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("userData").await.unwrap().as_deref(),
            Some(r#"{"name":"Meera"}"#)
        );
        drop(reopened);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
