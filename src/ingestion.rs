//! Dataset ingestion
//!
//! Reads uploaded spreadsheets (Excel, CSV) and Parquet files, trims column
//! names and normalizes every cell into a plain JSON value: nulls and NaN
//! become `null`, temporal values become strings and native numeric types
//! become plain numbers.

use crate::error::{InsightError, Result};
use crate::record::{Record, Table};
use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "parquet", "xlsx", "xls"];

/// File formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Parquet,
    Xlsx,
    Xls,
}

impl DatasetFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(DatasetFormat::Csv),
            "parquet" => Ok(DatasetFormat::Parquet),
            "xlsx" => Ok(DatasetFormat::Xlsx),
            "xls" => Ok(DatasetFormat::Xls),
            _ => Err(InsightError::UnsupportedFile(format!(
                "{} (accepted formats: .{})",
                path.display(),
                SUPPORTED_EXTENSIONS.join(", .")
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DatasetFormat::Csv => "csv",
            DatasetFormat::Parquet => "parquet",
            DatasetFormat::Xlsx => "xlsx",
            DatasetFormat::Xls => "xls",
        }
    }

    fn is_workbook(&self) -> bool {
        matches!(self, DatasetFormat::Xlsx | DatasetFormat::Xls)
    }
}

/// Load a CSV or Parquet file. Workbooks have no columnar reader and are
/// rejected here; use [`read_rows`] for them.
pub fn read_dataframe(path: &Path) -> Result<DataFrame> {
    let format = DatasetFormat::from_path(path)?;
    ensure_exists(path)?;

    let df = match format {
        DatasetFormat::Csv => LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()
            .map_err(|e| InsightError::Ingestion(format!("Failed to load CSV {}: {}", path.display(), e)))?
            .collect()?,
        DatasetFormat::Parquet => ParquetReader::new(std::fs::File::open(path)?)
            .finish()
            .map_err(|e| InsightError::Ingestion(format!("Failed to load Parquet {}: {}", path.display(), e)))?,
        DatasetFormat::Xlsx | DatasetFormat::Xls => {
            return Err(InsightError::Ingestion(format!(
                "{} is a workbook, not a columnar file",
                path.display()
            )))
        }
    };

    info!("Loaded {} rows, {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Read any supported file into normalized JSON rows.
pub fn read_rows(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let format = DatasetFormat::from_path(path)?;
    if format.is_workbook() {
        ensure_exists(path)?;
        read_workbook_rows(path)
    } else {
        dataframe_to_rows(&read_dataframe(path)?)
    }
}

/// Read a dataset file straight into a [`Table`].
pub fn read_table(path: &Path) -> Result<Table> {
    Ok(rows_to_table(read_rows(path)?))
}

pub fn table_from_dataframe(df: &DataFrame) -> Result<Table> {
    Ok(rows_to_table(dataframe_to_rows(df)?))
}

fn rows_to_table(rows: Vec<Map<String, Value>>) -> Table {
    let records: Vec<Record> = rows.into_iter().map(Record::from_row).collect();

    let without_area = records.iter().filter(|r| r.area.is_none()).count();
    if without_area > 0 {
        warn!("{} rows have no Area and will never match a query", without_area);
    }
    Table::new(records)
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(InsightError::Ingestion(format!("File not found: {}", path.display())))
    }
}

/// Convert every row into a JSON object keyed by trimmed column name.
pub fn dataframe_to_rows(df: &DataFrame) -> Result<Vec<Map<String, Value>>> {
    let columns = df.get_columns();
    let names: Vec<String> = columns.iter().map(|s| s.name().trim().to_string()).collect();

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let mut row = Map::new();
        for (series, name) in columns.iter().zip(&names) {
            let value = series.get(i).map_err(|e| {
                InsightError::Ingestion(format!("Failed to read column '{}' row {}: {}", name, i, e))
            })?;
            row.insert(name.clone(), any_value_to_json(value));
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Convert a polars value to plain JSON.
pub fn any_value_to_json(val: AnyValue) -> Value {
    match val {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::Int8(i) => Value::Number(i.into()),
        AnyValue::Int16(i) => Value::Number(i.into()),
        AnyValue::Int32(i) => Value::Number(i.into()),
        AnyValue::Int64(i) => Value::Number(i.into()),
        AnyValue::UInt8(u) => Value::Number(u.into()),
        AnyValue::UInt16(u) => Value::Number(u.into()),
        AnyValue::UInt32(u) => Value::Number(u.into()),
        AnyValue::UInt64(u) => Value::Number(u.into()),
        AnyValue::Float32(f) => float_to_json(f as f64),
        AnyValue::Float64(f) => float_to_json(f),
        AnyValue::Date(days) => date_from_days(days)
            .map(|d| Value::String(d.to_string()))
            .unwrap_or(Value::Null),
        AnyValue::Datetime(v, unit, _) => datetime_from_epoch(v, unit)
            .map(|dt| Value::String(dt.to_string()))
            .unwrap_or(Value::Null),
        other => Value::String(other.to_string().trim_matches('"').to_string()),
    }
}

fn float_to_json(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn unix_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?.and_hms_opt(0, 0, 0)
}

fn date_from_days(days: i32) -> Option<NaiveDate> {
    unix_epoch()?
        .date()
        .checked_add_signed(Duration::days(days as i64))
}

fn datetime_from_epoch(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let offset = match unit {
        TimeUnit::Nanoseconds => Duration::nanoseconds(value),
        TimeUnit::Microseconds => Duration::microseconds(value),
        TimeUnit::Milliseconds => Duration::milliseconds(value),
    };
    unix_epoch()?.checked_add_signed(offset)
}

/// First worksheet as rows. The first row is the header; blank header
/// cells drop their column and fully empty rows are skipped.
fn read_workbook_rows(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| InsightError::Ingestion(format!("Failed to open workbook {}: {}", path.display(), e)))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| InsightError::Ingestion(format!("Workbook {} has no sheets", path.display())))?
        .map_err(|e| InsightError::Ingestion(format!("Failed to read sheet of {}: {}", path.display(), e)))?;

    let mut sheet_rows = range.rows();
    let Some(header) = sheet_rows.next() else {
        return Ok(Vec::new());
    };
    let names: Vec<String> = header.iter().map(|c| c.to_string().trim().to_string()).collect();

    let mut rows = Vec::new();
    for cells in sheet_rows {
        let mut row = Map::new();
        for (name, cell) in names.iter().zip(cells) {
            if !name.is_empty() {
                row.insert(name.clone(), cell_to_json(cell));
            }
        }
        if row.values().any(|v| !v.is_null()) {
            rows.push(row);
        }
    }

    info!("Loaded {} rows, {} columns from {}", rows.len(), names.len(), path.display());
    Ok(rows)
}

fn cell_to_json(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) => float_to_json(*f),
        Data::String(s) => Value::String(s.clone()),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| Value::String(dt.to_string()))
            .unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::filtered_table;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_any_value_to_json() {
        assert_eq!(any_value_to_json(AnyValue::Null), Value::Null);
        assert_eq!(any_value_to_json(AnyValue::Int64(2020)), json!(2020));
        assert_eq!(any_value_to_json(AnyValue::Float64(12.5)), json!(12.5));
        assert_eq!(any_value_to_json(AnyValue::Float64(f64::NAN)), Value::Null);
        assert_eq!(any_value_to_json(AnyValue::Float32(f32::NAN)), Value::Null);
        assert_eq!(any_value_to_json(AnyValue::String("Hebbal")), json!("Hebbal"));
        assert_eq!(any_value_to_json(AnyValue::Boolean(true)), json!(true));
    }

    #[test]
    fn test_small_integer_types_are_numbers() {
        assert_eq!(any_value_to_json(AnyValue::Int8(-3)), json!(-3));
        assert_eq!(any_value_to_json(AnyValue::Int16(3)), json!(3));
        assert_eq!(any_value_to_json(AnyValue::UInt8(4)), json!(4));
        assert_eq!(any_value_to_json(AnyValue::UInt16(5)), json!(5));
    }

    #[test]
    fn test_temporal_values_are_strings() {
        // 18262 days after the epoch
        assert_eq!(any_value_to_json(AnyValue::Date(18262)), json!("2020-01-01"));
        assert_eq!(
            any_value_to_json(AnyValue::Datetime(1_577_874_600_000, TimeUnit::Milliseconds, &None)),
            json!("2020-01-01 10:30:00")
        );
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DatasetFormat::from_path(&PathBuf::from("data/x.CSV")).unwrap(),
            DatasetFormat::Csv
        );
        assert_eq!(
            DatasetFormat::from_path(&PathBuf::from("x.parquet")).unwrap(),
            DatasetFormat::Parquet
        );
        assert_eq!(
            DatasetFormat::from_path(&PathBuf::from("x.XLSX")).unwrap(),
            DatasetFormat::Xlsx
        );
        assert_eq!(
            DatasetFormat::from_path(&PathBuf::from("x.xls")).unwrap(),
            DatasetFormat::Xls
        );
        assert!(matches!(
            DatasetFormat::from_path(&PathBuf::from("x.json")),
            Err(InsightError::UnsupportedFile(_))
        ));
    }

    #[test]
    fn test_table_from_dataframe() {
        let df = df! [
            " Area " => ["Koramangala", "Hebbal"],
            "Year" => [2020i64, 2021],
            "Price" => [100.0, f64::NAN],
            "Demand" => [40.0, 55.0],
            "Segment" => ["Premium", "Mid"]
        ]
        .unwrap();

        let table = table_from_dataframe(&df).unwrap();
        let records = table.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], {
            let mut r = Record::new("Koramangala", 2020, 100.0, 40.0);
            r.extra.insert("Segment".to_string(), json!("Premium"));
            r
        });
        assert_eq!(records[1].price, None);
    }

    #[test]
    fn test_table_rows_keep_native_numbers_and_dates() {
        let listed = Series::new("Listed", &[18262i32]).cast(&DataType::Date).unwrap();
        let mut df = df! [
            "Area" => ["Hebbal"],
            "Year" => [2020i64],
            "Price" => [4200.0],
            "Demand" => [61.0],
            "Bedrooms" => [3i16],
            "Floors" => [2u8]
        ]
        .unwrap();
        df.with_column(listed).unwrap();

        let table = table_from_dataframe(&df).unwrap();
        let rows = filtered_table(&table, "hebbal", 50);

        assert_eq!(rows[0]["Bedrooms"], json!(3));
        assert_eq!(rows[0]["Floors"], json!(2));
        assert_eq!(rows[0]["Listed"], json!("2020-01-01"));
    }
}
