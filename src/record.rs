//! Dataset records
//!
//! A record carries the four analytical fields (Area, Year, Price, Demand)
//! as typed values, plus every other column of the source row as an opaque
//! JSON map. Rows are validated permissively: a required field that is
//! missing or unparseable is stored as `None` and simply skipped by the
//! aggregations.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const AREA: &str = "Area";
pub const YEAR: &str = "Year";
pub const PRICE: &str = "Price";
pub const DEMAND: &str = "Demand";

/// One observation of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Record {
    pub area: Option<String>,
    pub year: Option<i32>,
    pub price: Option<f64>,
    pub demand: Option<f64>,

    /// Columns other than the four analytical ones, already normalized
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl Record {
    pub fn new(area: &str, year: i32, price: f64, demand: f64) -> Self {
        Self {
            area: Some(area.to_string()),
            year: Some(year),
            price: Some(price),
            demand: Some(demand),
            extra: Map::new(),
        }
    }

    /// Build a record from a normalized row. Column names are trimmed and the
    /// analytical columns are matched case-insensitively.
    pub fn from_row(row: Map<String, Value>) -> Self {
        let mut record = Record::default();

        for (key, value) in row {
            let key = key.trim().to_string();
            if key.eq_ignore_ascii_case(AREA) {
                record.area = parse_area(&value);
            } else if key.eq_ignore_ascii_case(YEAR) {
                record.year = parse_year(&value);
            } else if key.eq_ignore_ascii_case(PRICE) {
                record.price = parse_number(&value);
            } else if key.eq_ignore_ascii_case(DEMAND) {
                record.demand = parse_number(&value);
            } else {
                record.extra.insert(key, value);
            }
        }

        record
    }

    /// Flatten back into a row for table output. Missing values become
    /// explicit nulls; non-finite numbers never reach the output.
    pub fn to_row(&self) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert(
            AREA.to_string(),
            self.area.clone().map(Value::String).unwrap_or(Value::Null),
        );
        row.insert(
            YEAR.to_string(),
            self.year.map(Value::from).unwrap_or(Value::Null),
        );
        row.insert(PRICE.to_string(), number_or_null(self.price));
        row.insert(DEMAND.to_string(), number_or_null(self.demand));
        for (key, value) in &self.extra {
            row.insert(key.clone(), value.clone());
        }
        row
    }

    /// Case-insensitive substring test against this record's area.
    pub fn area_matches(&self, needle_lower: &str) -> bool {
        self.area
            .as_deref()
            .map(|a| a.to_lowercase().contains(needle_lower))
            .unwrap_or(false)
    }
}

/// The working snapshot for one analysis pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct area names in first-seen order, canonical casing preserved.
    pub fn known_areas(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.area.as_deref())
            .filter(|a| !a.trim().is_empty())
            .unique()
            .map(str::to_string)
            .collect()
    }
}

impl From<Vec<Record>> for Table {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

fn number_or_null(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn parse_area(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_year(value: &Value) -> Option<i32> {
    let year = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }?;
    i32::try_from(year).ok()
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}
