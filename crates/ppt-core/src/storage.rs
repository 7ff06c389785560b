//! Storage facade
//!
//! The single entry point callers use for persistence. Every operation has a
//! defined fallback value; backend failures never surface here.

use serde_json::Value;

use ppt_series::{Series, SeriesManager};
use ppt_settings::SettingsManager;
use ppt_storage::{ConnectionManager, ConnectionState};
use ppt_trials::{TrialLogEntry, TrialLogManager};

use crate::config::Config;

pub struct Storage {
    /// Configuration
    config: Config,
    /// Shared durable connection, and its degrade flag
    connection: ConnectionManager,
    settings: SettingsManager,
    trial_log: TrialLogManager,
    series: SeriesManager,
}

impl Storage {
    pub fn new(config: Config) -> Self {
        let connection = ConnectionManager::new(config.database_source());
        tracing::debug!(source = ?connection.source(), "Created storage");

        Self {
            settings: SettingsManager::new(connection.clone()),
            trial_log: TrialLogManager::new(connection.clone()),
            series: SeriesManager::new(connection.clone()),
            connection,
            config,
        }
    }

    // === Settings ===

    pub async fn get_setting(&self, key: &str) -> Option<Value> {
        self.settings.get(key).await
    }

    pub async fn set_setting(&self, key: &str, value: Value) {
        self.settings.set(key, value).await
    }

    // === Trial log ===

    pub async fn get_trial_log(&self) -> Vec<TrialLogEntry> {
        self.trial_log.get_all().await
    }

    pub async fn append_trial_log(&self, entry: TrialLogEntry) {
        self.trial_log.append(entry).await
    }

    pub async fn replace_trial_log(&self, entries: impl Into<Option<Vec<TrialLogEntry>>>) {
        self.trial_log.replace_all(entries).await
    }

    // === Series ===

    pub async fn get_series_list(&self) -> Vec<Series> {
        self.series.list().await
    }

    pub async fn get_series_by_id(&self, id: &str) -> Option<Series> {
        self.series.get_by_id(id).await
    }

    pub async fn save_series(&self, series: Series) -> Option<Series> {
        self.series.save(series).await
    }

    pub async fn delete_series(&self, id: &str) {
        self.series.delete(id).await
    }

    // === Backend state ===

    /// Whether storage has degraded to session-only persistence.
    pub fn is_memory_only(&self) -> bool {
        self.connection.is_failed()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Clone for Storage {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            connection: self.connection.clone(),
            settings: self.settings.clone(),
            trial_log: self.trial_log.clone(),
            series: self.series.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(n: i64) -> TrialLogEntry {
        TrialLogEntry::new(json!({"trialNumber": n}))
    }

    async fn break_backend(storage: &Storage) {
        let db = storage.connection().open().await.unwrap();
        db.with_connection(|conn| {
            conn.execute_batch("DROP TABLE settings; DROP TABLE trial_log; DROP TABLE series;")?;
            Ok(())
        })
        .unwrap();
    }

    #[tokio::test]
    async fn test_volume_survives_unavailable_backend() {
        let storage = Storage::new(Config::memory_only());

        storage.set_setting("volume", json!(7)).await;

        assert_eq!(storage.get_setting("volume").await, Some(json!(7)));
        assert!(storage.is_memory_only());
    }

    #[tokio::test]
    async fn test_healthy_series_roundtrip() {
        let storage = Storage::new(Config::in_memory());

        storage.save_series(Series::with_id("s1")).await;
        storage.save_series(Series::with_id("s2")).await;

        let mut ids: Vec<String> = storage
            .get_series_list()
            .await
            .into_iter()
            .map(|s| s.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert_eq!(
            storage.get_series_by_id("s1").await,
            Some(Series::with_id("s1"))
        );
        assert_eq!(
            storage.get_series_by_id("s2").await,
            Some(Series::with_id("s2"))
        );
        assert!(!storage.is_memory_only());
        assert!(matches!(storage.connection_state(), ConnectionState::Open(_)));
    }

    #[tokio::test]
    async fn test_trial_log_append_and_replace() {
        let storage = Storage::new(Config::in_memory());

        storage.append_trial_log(entry(1)).await;
        storage.append_trial_log(entry(2)).await;
        let log = storage.get_trial_log().await;
        assert_eq!(log[log.len() - 2..], [entry(1), entry(2)]);

        storage.replace_trial_log(vec![entry(8), entry(9)]).await;
        assert_eq!(storage.get_trial_log().await, vec![entry(8), entry(9)]);

        storage.replace_trial_log(None).await;
        assert!(storage.get_trial_log().await.is_empty());
    }

    #[tokio::test]
    async fn test_degrade_is_seen_by_every_collection() {
        let storage = Storage::new(Config::in_memory());
        storage.set_setting("volume", json!(4)).await;
        storage.append_trial_log(entry(1)).await;
        storage.save_series(Series::with_id("s1")).await;

        break_backend(&storage).await;

        // The first failing call degrades; later calls never touch the backend
        storage.set_setting("volume", json!(6)).await;
        assert!(storage.is_memory_only());
        assert!(matches!(storage.connection_state(), ConnectionState::Failed));

        assert_eq!(storage.get_setting("volume").await, Some(json!(6)));
        assert_eq!(storage.get_trial_log().await, vec![entry(1)]);
        assert_eq!(
            storage.get_series_by_id("s1").await,
            Some(Series::with_id("s1"))
        );

        storage.delete_series("s1").await;
        assert_eq!(storage.get_series_by_id("s1").await, None);
        assert!(storage.get_series_list().await.is_empty());
        assert!(storage.is_memory_only());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let storage = Storage::new(Config::memory_only());
        let clone = storage.clone();

        clone.save_series(Series::with_id("s1")).await;
        assert!(storage.get_series_by_id("s1").await.is_some());
        assert!(storage.is_memory_only());
    }

    #[tokio::test]
    async fn test_unopenable_database_serves_from_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("data");
        std::fs::write(&blocker, b"plain file").unwrap();
        let storage = Storage::new(Config::new(blocker));

        storage.set_setting("instrument", json!("a")).await;
        storage.append_trial_log(entry(1)).await;

        assert!(storage.is_memory_only());
        assert_eq!(storage.get_setting("instrument").await, Some(json!("a")));
        assert_eq!(storage.get_trial_log().await, vec![entry(1)]);
    }

    #[tokio::test]
    async fn test_file_backed_storage_persists_across_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path().join("data"));

        {
            let storage = Storage::new(config.clone());
            storage.set_setting("volume", json!(7)).await;
            storage.append_trial_log(entry(1)).await;
            storage
                .save_series(Series::with_id("s1").with_field("name", json!("Warmup")))
                .await;
            assert!(!storage.is_memory_only());
        }

        let restarted = Storage::new(config);
        assert_eq!(restarted.get_setting("volume").await, Some(json!(7)));
        assert_eq!(restarted.get_trial_log().await, vec![entry(1)]);
        assert_eq!(
            restarted
                .get_series_by_id("s1")
                .await
                .and_then(|s| s.field("name").cloned()),
            Some(json!("Warmup"))
        );
    }
}
