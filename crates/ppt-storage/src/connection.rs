//! Connection Manager
//!
//! Owns the lifecycle of the durable database handle. The open attempt is
//! memoized (including failure), and the first failure of any kind switches
//! the manager into a permanent failed state shared by every clone.

use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::database::Database;
use crate::error::StorageError;
use crate::Result;

/// Where the durable backend lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseSource {
    File(PathBuf),
    InMemory,
    /// The environment denies durable storage.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

/// Observable lifecycle of the durable handle.
#[derive(Debug, Clone)]
pub enum ConnectionState {
    Unopened,
    Open(Database),
    Failed,
}

struct Inner {
    source: DatabaseSource,
    handle: OnceCell<std::result::Result<Database, Arc<StorageError>>>,
    failed: AtomicBool,
    open_attempts: AtomicUsize,
}

#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(source: DatabaseSource) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                handle: OnceCell::new(),
                failed: AtomicBool::new(false),
                open_attempts: AtomicUsize::new(0),
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(DatabaseSource::InMemory)
    }

    pub fn unavailable() -> Self {
        Self::new(DatabaseSource::Unavailable)
    }

    pub fn source(&self) -> &DatabaseSource {
        &self.inner.source
    }

    /// Whether the manager has degraded. Never resets once true.
    pub fn is_failed(&self) -> bool {
        self.inner.failed.load(Ordering::SeqCst)
    }

    /// Number of real open attempts performed so far (0 or 1).
    pub fn open_attempts(&self) -> usize {
        self.inner.open_attempts.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ConnectionState {
        if self.is_failed() {
            return ConnectionState::Failed;
        }
        match self.inner.handle.get() {
            None => ConnectionState::Unopened,
            Some(Ok(db)) => ConnectionState::Open(db.clone()),
            Some(Err(_)) => ConnectionState::Failed,
        }
    }

    /// Open the database and run schema upgrades.
    ///
    /// Only the first call does any work; every other call, concurrent or
    /// later, observes the same outcome. `None` means durable storage is
    /// unavailable for the rest of the process.
    pub async fn open(&self) -> Option<Database> {
        self.open_outcome().await.as_ref().ok().cloned()
    }

    async fn open_outcome(&self) -> &std::result::Result<Database, Arc<StorageError>> {
        self.inner.handle.get_or_init(|| self.open_once()).await
    }

    async fn open_once(&self) -> std::result::Result<Database, Arc<StorageError>> {
        self.inner.open_attempts.fetch_add(1, Ordering::SeqCst);
        let source = self.inner.source.clone();

        match blocking(move || open_source(&source)).await {
            Ok(db) => {
                tracing::info!(source = ?self.inner.source, "Opened durable storage");
                Ok(db)
            }
            Err(StorageError::Unavailable) => {
                tracing::info!("Durable storage unavailable in this environment");
                Err(Arc::new(StorageError::Unavailable))
            }
            Err(e) => {
                tracing::warn!(source = ?self.inner.source, error = %e, "Failed to open durable storage");
                Err(Arc::new(e))
            }
        }
    }

    /// Run `op` inside one transaction on the durable backend.
    ///
    /// Returns `None` ("no result") when the manager has already failed, the
    /// handle cannot be obtained, or the transaction errors. The latter two
    /// degrade the manager permanently. Errors never reach the caller.
    pub async fn run_with_db<F, T>(&self, mode: TransactionMode, op: F) -> Option<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_failed() {
            return None;
        }

        let db = match self.open_outcome().await {
            Ok(db) => db.clone(),
            Err(e) => {
                self.degrade(e);
                return None;
            }
        };

        match blocking(move || db.transaction(mode, op)).await {
            Ok(value) => Some(value),
            Err(e) => {
                self.degrade(&e);
                None
            }
        }
    }

    fn degrade(&self, error: &StorageError) {
        if !self.inner.failed.swap(true, Ordering::SeqCst) {
            tracing::warn!(error = %error, "Durable storage failed, continuing in memory-only mode");
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("source", &self.inner.source)
            .field("failed", &self.is_failed())
            .finish()
    }
}

fn open_source(source: &DatabaseSource) -> Result<Database> {
    match source {
        DatabaseSource::Unavailable => Err(StorageError::Unavailable),
        DatabaseSource::InMemory => Database::open_in_memory(),
        DatabaseSource::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Database::open(path)
        }
    }
}

/// Run a blocking closure on the tokio blocking pool.
async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
}
