//! Query history repository for the audit log of analysed queries

use crate::error::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub id: String,
    pub query: String,
    pub success: bool,
    pub timestamp: String,
}

impl QueryLogEntry {
    pub fn now(query: &str, success: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.to_string(),
            success,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

pub fn save_query(conn: &Connection, entry: &QueryLogEntry) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO query_logs (id, query, success, timestamp)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![entry.id, entry.query, entry.success, entry.timestamp],
    )?;
    Ok(())
}

/// Most recent entries first.
pub fn recent_queries(conn: &Connection, limit: usize) -> Result<Vec<QueryLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, query, success, timestamp FROM query_logs ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |row| {
        Ok(QueryLogEntry {
            id: row.get(0)?,
            query: row.get(1)?,
            success: row.get(2)?,
            timestamp: row.get(3)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::open_in_memory;

    #[test]
    fn test_save_and_list_queries() {
        let conn = open_in_memory().unwrap();
        save_query(&conn, &QueryLogEntry::now("price trend koramangala", true)).unwrap();
        save_query(&conn, &QueryLogEntry::now("what about mars", false)).unwrap();

        let entries = recent_queries(&conn, 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].query, "what about mars");
        assert!(!entries[0].success);
        assert!(chrono::DateTime::parse_from_rfc3339(&entries[1].timestamp).is_ok());

        assert_eq!(recent_queries(&conn, 1).unwrap().len(), 1);
    }
}
