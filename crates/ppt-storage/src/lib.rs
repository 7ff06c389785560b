//! PPT Training Storage Layer
//!
//! SQLite-based durable backend for settings, the trial log and series.
//! Access goes through [`ConnectionManager`], which opens the database once
//! and degrades permanently on the first failure.

mod connection;
mod database;
mod error;
mod migrations;

pub use connection::{ConnectionManager, ConnectionState, DatabaseSource, TransactionMode};
pub use database::Database;
pub use error::StorageError;
pub use migrations::SCHEMA_VERSION;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Name of the durable database, used for the default file name.
pub const DB_NAME: &str = "ppt-training";
