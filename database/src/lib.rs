pub mod blocked_log;
pub mod memory;
pub mod registry;
pub mod state;
pub mod store;


pub use blocked_log::{BlockedItemLog, BLOCKED_LOG_CAPACITY};
pub use memory::MemoryStore;
pub use registry::{block_ttl, BlockRegistry, BLOCK_TTL_DAYS};
pub use store::{get_typed, StateKey, StateStore};

use async_trait::async_trait;
use cleaner_core::{CoreError, StorageError};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

const CREATE_STATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS state (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)";

const UPSERT_STATE: &str = "INSERT INTO state (key, value, updated_at) VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

const SELECT_STATE: &str = "SELECT value FROM state WHERE key = ?1";

/// SQLite-backed persisted state shared by every page instance on this machine.
pub struct Database {
    connection_string: String,
    pool: Option<SqlitePool>,
}

impl Database {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            pool: None,
        }
    }

    pub async fn connect(&mut self) -> Result<(), CoreError> {
        let options = SqliteConnectOptions::from_str(&self.connection_string)
            .map_err(|e| StorageError::ConnectionFailed {
                reason: e.to_string(),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        info!("Connected to state database");
        self.pool = Some(pool);
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::query(CREATE_STATE_TABLE)
            .execute(self.pool()?)
            .await
            .map_err(|e| StorageError::MigrationFailed {
                migration: format!("create_state_table: {e}"),
            })?;
        debug!("State table ready");
        Ok(())
    }

    pub async fn save_setting(&self, key: &str, value: &str) -> Result<(), CoreError> {
        sqlx::query(UPSERT_STATE)
            .bind(key)
            .bind(value)
            .bind(chrono::Utc::now().timestamp_millis())
            .execute(self.pool()?)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, CoreError> {
        let value = sqlx::query_scalar::<_, String>(SELECT_STATE)
            .bind(key)
            .fetch_optional(self.pool()?)
            .await
            .map_err(StorageError::from)?;
        Ok(value)
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }

    fn pool(&self) -> Result<&SqlitePool, StorageError> {
        self.pool.as_ref().ok_or_else(|| StorageError::ConnectionFailed {
            reason: "database not connected".to_string(),
        })
    }
}

#[async_trait]
impl StateStore for Database {
    async fn get(&self, key: StateKey) -> Result<Option<Value>, StorageError> {
        let raw = sqlx::query_scalar::<_, String>(SELECT_STATE)
            .bind(key.as_str())
            .fetch_optional(self.pool()?)
            .await?;

        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::CorruptValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn set_many(&self, entries: Vec<(StateKey, Value)>) -> Result<(), StorageError> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool()?.begin().await?;
        for (key, value) in &entries {
            sqlx::query(UPSERT_STATE)
                .bind(key.as_str())
                .bind(value.to_string())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::QueryFailed {
                    query: format!("upsert {key}: {e}"),
                })?;
        }
        tx.commit().await?;
        debug!(keys = entries.len(), "Persisted state");
        Ok(())
    }
}
