//! Series Manager
//!
//! Keyed series collection with an in-memory mirror. Mutations hit the
//! mirror first; durable hits refresh it.

use parking_lot::RwLock;
use rusqlite::OptionalExtension;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use ppt_storage::{ConnectionManager, TransactionMode};

use crate::series::Series;

pub struct SeriesManager {
    /// In-memory series mirror, keyed by id
    series: Arc<RwLock<HashMap<String, Series>>>,
    /// Durable backend
    connection: ConnectionManager,
}

impl SeriesManager {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            series: Arc::new(RwLock::new(HashMap::new())),
            connection,
        }
    }

    /// Every stored series. A durable read rebuilds the mirror from scratch.
    pub async fn list(&self) -> Vec<Series> {
        if self.connection.is_failed() {
            return self.cached_values();
        }

        let durable = self
            .connection
            .run_with_db(TransactionMode::ReadOnly, |conn| {
                let mut stmt = conn.prepare("SELECT payload FROM series ORDER BY id ASC")?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let mut values = Vec::with_capacity(rows.len());
                for raw in rows {
                    values.push(serde_json::from_str::<Value>(&raw)?);
                }
                Ok(values)
            })
            .await;

        let Some(values) = durable else {
            return self.cached_values();
        };

        // Records without an id cannot be keyed and are dropped
        let list: Vec<Series> = values.into_iter().filter_map(Series::from_value).collect();
        {
            let mut cache = self.series.write();
            cache.clear();
            for series in &list {
                cache.insert(series.id.clone(), series.clone());
            }
        }

        tracing::debug!(count = list.len(), "Loaded series list");
        list
    }

    pub async fn get_by_id(&self, id: &str) -> Option<Series> {
        if id.is_empty() {
            return None;
        }
        if self.connection.is_failed() {
            return self.cached(id);
        }

        let lookup = id.to_string();
        let durable = self
            .connection
            .run_with_db(TransactionMode::ReadOnly, move |conn| {
                let raw: Option<String> = conn
                    .query_row("SELECT payload FROM series WHERE id = ?1", [&lookup], |row| {
                        row.get(0)
                    })
                    .optional()?;
                Ok(raw
                    .map(|payload| serde_json::from_str::<Value>(&payload))
                    .transpose()?)
            })
            .await
            .flatten()
            .and_then(Series::from_value);

        match durable {
            Some(series) => {
                self.series
                    .write()
                    .insert(series.id.clone(), series.clone());
                Some(series)
            }
            None => self.cached(id),
        }
    }

    /// Insert or replace a series by id. Returns `None`, with no side
    /// effects, when the series has no id.
    pub async fn save(&self, series: Series) -> Option<Series> {
        if !series.has_id() {
            tracing::debug!("Rejected series without id");
            return None;
        }

        self.series
            .write()
            .insert(series.id.clone(), series.clone());
        if self.connection.is_failed() {
            return Some(series);
        }

        let stored = series.clone();
        self.connection
            .run_with_db(TransactionMode::ReadWrite, move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO series (id, payload) VALUES (?1, ?2)",
                    rusqlite::params![stored.id, serde_json::to_string(&stored)?],
                )?;
                tracing::debug!(series_id = %stored.id, "Persisted series");
                Ok(())
            })
            .await;

        Some(series)
    }

    pub async fn delete(&self, id: &str) {
        if id.is_empty() {
            return;
        }

        self.series.write().remove(id);
        if self.connection.is_failed() {
            return;
        }

        let id = id.to_string();
        self.connection
            .run_with_db(TransactionMode::ReadWrite, move |conn| {
                conn.execute("DELETE FROM series WHERE id = ?1", [&id])?;
                tracing::debug!(series_id = %id, "Deleted series");
                Ok(())
            })
            .await;
    }

    fn cached(&self, id: &str) -> Option<Series> {
        self.series.read().get(id).cloned()
    }

    fn cached_values(&self) -> Vec<Series> {
        self.series.read().values().cloned().collect()
    }
}

impl Clone for SeriesManager {
    fn clone(&self) -> Self {
        Self {
            series: Arc::clone(&self.series),
            connection: self.connection.clone(),
        }
    }
}
