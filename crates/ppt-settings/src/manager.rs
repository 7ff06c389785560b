//! Settings Manager
//!
//! Write-through key-value store. The in-memory mirror is updated before the
//! durable write so reads stay consistent if the backend fails.

use chrono::Utc;
use parking_lot::RwLock;
use rusqlite::OptionalExtension;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use ppt_storage::{ConnectionManager, TransactionMode};

pub struct SettingsManager {
    /// In-memory settings mirror
    settings: Arc<RwLock<HashMap<String, Value>>>,
    /// Durable backend
    connection: ConnectionManager,
}

impl SettingsManager {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            settings: Arc::new(RwLock::new(HashMap::new())),
            connection,
        }
    }

    /// Read a setting, preferring the durable value over the mirror.
    pub async fn get(&self, key: &str) -> Option<Value> {
        if self.connection.is_failed() {
            return self.cached(key);
        }

        let lookup = key.to_string();
        let durable = self
            .connection
            .run_with_db(TransactionMode::ReadOnly, move |conn| {
                let raw: Option<String> = conn
                    .query_row(
                        "SELECT value FROM settings WHERE key = ?1",
                        [&lookup],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(raw
                    .map(|value| serde_json::from_str::<Value>(&value))
                    .transpose()?)
            })
            .await
            .flatten();

        match durable {
            Some(value) if !value.is_null() => Some(value),
            _ => self.cached(key),
        }
    }

    /// Store a setting. Durable failures are absorbed by the connection manager.
    pub async fn set(&self, key: &str, value: Value) {
        self.settings.write().insert(key.to_string(), value.clone());
        if self.connection.is_failed() {
            return;
        }

        let key = key.to_string();
        let updated_at = Utc::now().to_rfc3339();
        self.connection
            .run_with_db(TransactionMode::ReadWrite, move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![key, serde_json::to_string(&value)?, updated_at],
                )?;
                tracing::debug!(key = %key, "Persisted setting");
                Ok(())
            })
            .await;
    }

    fn cached(&self, key: &str) -> Option<Value> {
        self.settings
            .read()
            .get(key)
            .filter(|value| !value.is_null())
            .cloned()
    }
}

impl Clone for SettingsManager {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            connection: self.connection.clone(),
        }
    }
}
