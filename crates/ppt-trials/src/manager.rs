//! Trial Log Manager
//!
//! Keeps an ordered mirror of the log next to the durable collection. A
//! successful durable read replaces the mirror, so it heals from the
//! durable copy whenever the backend is reachable.

use parking_lot::RwLock;
use std::sync::Arc;

use ppt_storage::{ConnectionManager, TransactionMode};

use crate::entry::TrialLogEntry;

pub struct TrialLogManager {
    /// In-memory log mirror, in insertion order
    entries: Arc<RwLock<Vec<TrialLogEntry>>>,
    /// Durable backend
    connection: ConnectionManager,
}

impl TrialLogManager {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            connection,
        }
    }

    /// The full log in insertion order.
    pub async fn get_all(&self) -> Vec<TrialLogEntry> {
        if self.connection.is_failed() {
            return self.snapshot();
        }

        let durable = self
            .connection
            .run_with_db(TransactionMode::ReadOnly, |conn| {
                let mut stmt = conn.prepare("SELECT entry FROM trial_log ORDER BY id ASC")?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let mut entries = Vec::with_capacity(rows.len());
                for raw in rows {
                    entries.push(serde_json::from_str::<TrialLogEntry>(&raw)?);
                }
                Ok(entries)
            })
            .await;

        match durable {
            Some(entries) => {
                *self.entries.write() = entries.clone();
                entries
            }
            None => self.snapshot(),
        }
    }

    /// Append one entry. The mirror sees it immediately.
    pub async fn append(&self, entry: TrialLogEntry) {
        self.entries.write().push(entry.clone());
        if self.connection.is_failed() {
            return;
        }

        self.connection
            .run_with_db(TransactionMode::ReadWrite, move |conn| {
                conn.execute(
                    "INSERT INTO trial_log (entry) VALUES (?1)",
                    [serde_json::to_string(&entry)?],
                )?;
                Ok(())
            })
            .await;
    }

    /// Atomically replace the whole log. `None` clears it.
    pub async fn replace_all(&self, entries: impl Into<Option<Vec<TrialLogEntry>>>) {
        let replacement = entries.into().unwrap_or_default();
        *self.entries.write() = replacement;
        if self.connection.is_failed() {
            return;
        }

        let entries = self.snapshot();
        self.connection
            .run_with_db(TransactionMode::ReadWrite, move |conn| {
                conn.execute("DELETE FROM trial_log", [])?;
                let mut stmt = conn.prepare("INSERT INTO trial_log (entry) VALUES (?1)")?;
                for entry in &entries {
                    stmt.execute([serde_json::to_string(entry)?])?;
                }
                tracing::debug!(count = entries.len(), "Replaced trial log");
                Ok(())
            })
            .await;
    }

    fn snapshot(&self) -> Vec<TrialLogEntry> {
        self.entries.read().clone()
    }
}

impl Clone for TrialLogManager {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            connection: self.connection.clone(),
        }
    }
}
