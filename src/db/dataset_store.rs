//! Dataset store
//!
//! The persistent source of truth for the analysed records. The query
//! engine only sees the [`DatasetStore`] trait; [`SqliteStore`] is the
//! production implementation.

use crate::db::connection;
use crate::db::query_history::{self, QueryLogEntry};
use crate::error::{InsightError, Result};
use crate::record::{Record, Table};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

/// Result of a full replace of the stored records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub success: bool,
    pub count: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PriceStats {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub avg_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DatasetStatistics {
    pub total_records: usize,
    pub total_areas: usize,
    pub areas: Vec<String>,
    pub price_stats: PriceStats,
}

pub trait DatasetStore: Send + Sync {
    /// Every stored record; internal identifiers are not exposed.
    fn load_all(&self) -> Result<Table>;

    /// Clear the store, then insert `records`.
    fn replace_all(&self, records: &[Record]) -> Result<UploadOutcome>;

    /// Sorted distinct non-null values of `field`.
    fn distinct(&self, field: &str) -> Result<Vec<String>>;

    /// Records whose area contains `area`, case-insensitively.
    fn data_by_area(&self, area: &str) -> Result<Table>;

    fn statistics(&self) -> Result<DatasetStatistics>;

    fn log_query(&self, entry: &QueryLogEntry) -> Result<()>;

    fn recent_queries(&self, limit: usize) -> Result<Vec<QueryLogEntry>>;
}

pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_connection(connection::open(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_connection(connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| InsightError::Store("database lock poisoned".to_string()))
    }

    fn query_records(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Table> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(args, |row| Ok(row_to_parts(row)))?;

        let mut records = Vec::new();
        for row in rows {
            let (area, year, price, demand, extra) = row??;
            records.push(Record {
                area,
                year,
                price,
                demand,
                extra,
            });
        }
        Ok(Table::new(records))
    }
}

/// Stand-in for a database that could not be opened. Every call fails with
/// [`InsightError::Store`], so readers degrade to the seed file.
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> Result<T> {
        Err(InsightError::Store(self.reason.clone()))
    }
}

impl DatasetStore for UnavailableStore {
    fn load_all(&self) -> Result<Table> {
        self.fail()
    }

    fn replace_all(&self, _records: &[Record]) -> Result<UploadOutcome> {
        self.fail()
    }

    fn distinct(&self, _field: &str) -> Result<Vec<String>> {
        self.fail()
    }

    fn data_by_area(&self, _area: &str) -> Result<Table> {
        self.fail()
    }

    fn statistics(&self) -> Result<DatasetStatistics> {
        self.fail()
    }

    fn log_query(&self, _entry: &QueryLogEntry) -> Result<()> {
        self.fail()
    }

    fn recent_queries(&self, _limit: usize) -> Result<Vec<QueryLogEntry>> {
        self.fail()
    }
}

/// Open the SQLite store at `path`, or an [`UnavailableStore`] carrying the
/// open error when that fails.
pub fn open_store(path: impl AsRef<Path>) -> Arc<dyn DatasetStore> {
    let path = path.as_ref();
    match SqliteStore::open(path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Dataset store at {} unavailable: {}", path.display(), e);
            Arc::new(UnavailableStore::new(e.to_string()))
        }
    }
}

type RecordParts = (
    Option<String>,
    Option<i32>,
    Option<f64>,
    Option<f64>,
    Map<String, Value>,
);

fn row_to_parts(row: &Row<'_>) -> Result<RecordParts> {
    let extra: String = row.get(4)?;
    let extra = match serde_json::from_str::<Value>(&extra)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, extra))
}

/// Map a field name onto a SQL expression over `properties`.
fn field_expr(field: &str) -> String {
    match field.trim().to_lowercase().as_str() {
        "area" => "area".to_string(),
        "year" => "CAST(year AS TEXT)".to_string(),
        "price" => "CAST(price AS TEXT)".to_string(),
        "demand" => "CAST(demand AS TEXT)".to_string(),
        _ => format!(
            "CAST(json_extract(extra, '$.\"{}\"') AS TEXT)",
            field.trim().replace('\'', "''").replace('"', "")
        ),
    }
}

const SELECT_RECORDS: &str = "SELECT area, year, price, demand, extra FROM properties";

impl DatasetStore for SqliteStore {
    fn load_all(&self) -> Result<Table> {
        let conn = self.conn()?;
        Self::query_records(&conn, &format!("{} ORDER BY id", SELECT_RECORDS), &[])
    }

    fn replace_all(&self, records: &[Record]) -> Result<UploadOutcome> {
        if records.is_empty() {
            return Ok(UploadOutcome {
                success: false,
                count: 0,
                message: "No records to upload".to_string(),
            });
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM properties", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO properties (area, year, price, demand, extra) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in records {
                let extra = serde_json::to_string(&record.extra)?;
                stmt.execute(params![record.area, record.year, record.price, record.demand, extra])?;
            }
        }
        tx.commit()?;

        info!("Replaced dataset with {} records", records.len());
        Ok(UploadOutcome {
            success: true,
            count: records.len(),
            message: format!("Successfully uploaded {} records", records.len()),
        })
    }

    fn distinct(&self, field: &str) -> Result<Vec<String>> {
        let expr = field_expr(field);
        let sql = format!(
            "SELECT DISTINCT {expr} AS value FROM properties WHERE {expr} IS NOT NULL ORDER BY value",
            expr = expr
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }

    fn data_by_area(&self, area: &str) -> Result<Table> {
        let conn = self.conn()?;
        Self::query_records(
            &conn,
            &format!("{} WHERE area LIKE '%' || ?1 || '%' ORDER BY id", SELECT_RECORDS),
            &[&area],
        )
    }

    fn statistics(&self) -> Result<DatasetStatistics> {
        let areas = self.distinct("area")?;
        let conn = self.conn()?;

        let total_records: i64 = conn.query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))?;
        let price_stats = conn.query_row(
            "SELECT MIN(price), MAX(price), AVG(price) FROM properties",
            [],
            |row| {
                Ok(PriceStats {
                    min_price: row.get(0)?,
                    max_price: row.get(1)?,
                    avg_price: row.get(2)?,
                })
            },
        )?;

        Ok(DatasetStatistics {
            total_records: total_records.max(0) as usize,
            total_areas: areas.len(),
            areas,
            price_stats,
        })
    }

    fn log_query(&self, entry: &QueryLogEntry) -> Result<()> {
        let conn = self.conn()?;
        query_history::save_query(&conn, entry)
    }

    fn recent_queries(&self, limit: usize) -> Result<Vec<QueryLogEntry>> {
        let conn = self.conn()?;
        query_history::recent_queries(&conn, limit)
    }
}
