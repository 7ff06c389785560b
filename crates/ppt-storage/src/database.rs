//! Database connection and operations

use parking_lot::Mutex;
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;

use crate::connection::TransactionMode;
use crate::migrations::run_migrations;
use crate::Result;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for better concurrent performance
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Run `f` inside one transaction. The result is only returned once the
    /// commit succeeds; any error rolls the transaction back.
    ///
    /// `ReadOnly` transactions run with `query_only` set, so a write inside
    /// one fails instead of committing.
    pub fn transaction<F, T>(&self, mode: TransactionMode, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();

        match mode {
            TransactionMode::ReadWrite => {
                run_transaction(&mut conn, TransactionBehavior::Immediate, f)
            }
            TransactionMode::ReadOnly => {
                conn.pragma_update(None, "query_only", true)?;
                let result = run_transaction(&mut conn, TransactionBehavior::Deferred, f);
                conn.pragma_update(None, "query_only", false)?;
                result
            }
        }
    }

    /// Whether both values refer to the same underlying connection.
    pub fn same_handle(&self, other: &Database) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }
}

fn run_transaction<F, T>(conn: &mut Connection, behavior: TransactionBehavior, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T>,
{
    let tx = conn.transaction_with_behavior(behavior)?;
    let result = f(&tx)?;
    tx.commit()?;
    Ok(result)
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let count: i32 =
                conn.query_row("SELECT COUNT(*) FROM series", [], |row| row.get(0))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.transaction(TransactionMode::ReadWrite, |conn| {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES ('a', '1', 'now')",
                [],
            )?;
            Err(StorageError::Unavailable)
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_read_only_transaction_rejects_writes() {
        let db = Database::open_in_memory().unwrap();

        let write: Result<()> = db.transaction(TransactionMode::ReadOnly, |conn| {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES ('a', '1', 'now')",
                [],
            )?;
            Ok(())
        });
        assert!(matches!(write, Err(StorageError::Database(_))));

        // The connection is writable again afterwards
        db.transaction(TransactionMode::ReadWrite, |conn| {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES ('b', '2', 'now')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let keys: Vec<String> = db
            .transaction(TransactionMode::ReadOnly, |conn| {
                let mut stmt = conn.prepare("SELECT key FROM settings")?;
                let keys = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .unwrap();
        assert_eq!(keys, vec!["b"]);
    }

    #[test]
    fn test_clone_shares_handle() {
        let db = Database::open_in_memory().unwrap();
        let other = Database::open_in_memory().unwrap();

        assert!(db.same_handle(&db.clone()));
        assert!(!db.same_handle(&other));
    }
}
