//! SQLite connection management
//!
//! The connection is opened once by the process entry point and handed to
//! the store; there is no process-wide handle.

use crate::error::{InsightError, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Open (or create) the database file and make sure the schema exists.
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)
        .map_err(|e| InsightError::Store(format!("Failed to open database {}: {}", path.display(), e)))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    init_schema(&conn)?;

    info!("Opened dataset store at {}", path.display());
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS properties (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            area TEXT,
            year INTEGER,
            price REAL,
            demand REAL,
            extra TEXT NOT NULL DEFAULT '{}'
        );
        CREATE INDEX IF NOT EXISTS idx_properties_area ON properties(area);

        CREATE TABLE IF NOT EXISTS query_logs (
            id TEXT PRIMARY KEY,
            query TEXT NOT NULL,
            success INTEGER NOT NULL,
            timestamp TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_query_logs_timestamp ON query_logs(timestamp);
        "#,
    )
    .map_err(|e| InsightError::Store(format!("Failed to create schema: {}", e)))
}
