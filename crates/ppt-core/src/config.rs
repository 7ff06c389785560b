//! Storage configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use ppt_storage::{DatabaseSource, DB_NAME};

use crate::error::CoreError;
use crate::Result;

const IN_MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file, or `:memory:`
    pub database_path: PathBuf,
    /// When false the durable backend is treated as unavailable
    #[serde(default = "default_persistence_enabled")]
    pub persistence_enabled: bool,
}

fn default_persistence_enabled() -> bool {
    true
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join(format!("{DB_NAME}.db")),
            persistence_enabled: true,
        }
    }

    /// Configuration backed by a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            persistence_enabled: true,
        }
    }

    /// Configuration for an environment that denies durable storage.
    pub fn memory_only() -> Self {
        Self {
            persistence_enabled: false,
            ..Self::default()
        }
    }

    /// Load a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;

        if config.database_path.as_os_str().is_empty() {
            return Err(CoreError::Config("database_path cannot be empty".to_string()));
        }
        Ok(config)
    }

    pub fn database_source(&self) -> DatabaseSource {
        if !self.persistence_enabled {
            DatabaseSource::Unavailable
        } else if self.database_path.as_os_str() == IN_MEMORY_PATH {
            DatabaseSource::InMemory
        } else {
            DatabaseSource::File(self.database_path.clone())
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("PPT Training"))
            .unwrap_or_else(|| PathBuf::from(".ppt-training"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

// Simple dirs implementation for the local data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
