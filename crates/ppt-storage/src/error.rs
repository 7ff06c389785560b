//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database schema version {found} is newer than supported version {supported}")]
    IncompatibleVersion { found: i32, supported: i32 },

    #[error("Durable storage unavailable")]
    Unavailable,

    #[error("Storage task failed: {0}")]
    Task(String),
}
