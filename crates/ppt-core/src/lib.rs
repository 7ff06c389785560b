//! PPT Training Core
//!
//! Persistence for the training app: user settings, the trial log and named
//! series. Prefers the on-device SQLite database and silently degrades to an
//! in-memory store when it is unavailable or fails.

mod config;
mod error;
mod storage;

pub use config::Config;
pub use error::CoreError;
pub use storage::Storage;

// Re-export core components
pub use ppt_series::{Series, SeriesManager};
pub use ppt_settings::SettingsManager;
pub use ppt_storage::{ConnectionManager, ConnectionState, DatabaseSource, StorageError};
pub use ppt_trials::{TrialLogEntry, TrialLogManager};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
