//! Database migrations
//!
//! Schema: settings, trial_log, series. Every statement is `IF NOT EXISTS`,
//! so re-running a migration leaves existing collections untouched.

use crate::{Result, StorageError};
use rusqlite::Connection;

pub const SCHEMA_VERSION: i32 = 2;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        return Err(StorageError::IncompatibleVersion {
            found: current_version,
            supported: SCHEMA_VERSION,
        });
    }

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    if current_version != SCHEMA_VERSION {
        set_schema_version(conn, SCHEMA_VERSION)?;
    }
    Ok(())
}

pub(crate) fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<i32, _> =
        conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        });

    match result {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(rusqlite::Error::SqliteFailure(_, Some(ref message)))
            if message.starts_with("no such table") =>
        {
            // Table doesn't exist yet
            conn.execute(
                "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
                [],
            )?;
            conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])?;
            Ok(0)
        }
        Err(e) => Err(e.into()),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    tracing::info!("Running migration v1: settings and trial log");

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#,
    )?;

    // Entries are opaque JSON; the lookup columns exist only when the entry has the field
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS trial_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry TEXT NOT NULL,
            trial_number INTEGER GENERATED ALWAYS AS (json_extract(entry, '$.trialNumber')) VIRTUAL,
            trial_date TEXT GENERATED ALWAYS AS (json_extract(entry, '$.trialDate')) VIRTUAL
        );

        CREATE INDEX IF NOT EXISTS idx_trial_log_number ON trial_log(trial_number);
        CREATE INDEX IF NOT EXISTS idx_trial_log_date ON trial_log(trial_date);
    "#,
    )?;

    Ok(())
}

fn migrate_v2(conn: &Connection) -> Result<()> {
    tracing::info!("Running migration v2: series");

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS series (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            created_at TEXT GENERATED ALWAYS AS (json_extract(payload, '$.createdAt')) VIRTUAL
        );

        CREATE INDEX IF NOT EXISTS idx_series_created ON series(created_at);
    "#,
    )?;

    Ok(())
}
