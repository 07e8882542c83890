//! Aggregation Engine
//!
//! Pure functions over a loaded [`Table`]: area filtering, per-year trends,
//! multi-area comparison and the row-limited table projection. Every
//! average is taken only over values that are present, so no output ever
//! carries a NaN.

use crate::record::{Record, Table};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_TABLE_LIMIT: usize = 50;

/// Metric tracked by a trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Price,
    Demand,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Price => "price",
            Metric::Demand => "demand",
        }
    }

    fn value(&self, record: &Record) -> Option<f64> {
        match self {
            Metric::Price => record.price,
            Metric::Demand => record.demand,
        }
    }
}

/// One aggregated point of a trend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub year: i32,
    pub value: f64,
}

/// Year-ascending series for one metric. Serializes as
/// `[{"year": 2020, "price": 100.0}, ...]`, keyed by the metric name.
#[derive(Debug, Clone, PartialEq)]
pub struct Trend {
    pub metric: Metric,
    pub points: Vec<TrendPoint>,
}

impl Trend {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

struct KeyedPoint<'a> {
    metric: Metric,
    point: &'a TrendPoint,
}

impl Serialize for KeyedPoint<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("year", &self.point.year)?;
        map.serialize_entry(self.metric.as_str(), &self.point.value)?;
        map.end()
    }
}

impl Serialize for Trend {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.points.len()))?;
        for point in &self.points {
            seq.serialize_element(&KeyedPoint {
                metric: self.metric,
                point,
            })?;
        }
        seq.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaPrice {
    pub area: String,
    pub avg_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaDemand {
    pub area: String,
    pub avg_demand: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ComparisonResult {
    pub price_comparison: Vec<AreaPrice>,
    pub demand_comparison: Vec<AreaDemand>,
}

/// Rows whose Area contains `area`, case-insensitively. Rows without an
/// area never match.
pub fn filter_by_area(table: &Table, area: &str) -> Table {
    let needle = area.to_lowercase();
    table
        .records()
        .iter()
        .filter(|r| r.area_matches(&needle))
        .cloned()
        .collect::<Vec<_>>()
        .into()
}

pub fn price_trend(table: &Table) -> Trend {
    trend(table, Metric::Price)
}

pub fn demand_trend(table: &Table) -> Trend {
    trend(table, Metric::Demand)
}

/// Group by year and average `metric` per group. Rows without a year are
/// ignored, and a year with no present metric value yields no point.
pub fn trend(table: &Table, metric: Metric) -> Trend {
    let mut groups: BTreeMap<i32, (f64, usize)> = BTreeMap::new();

    for record in table.records() {
        let (Some(year), Some(value)) = (record.year, metric.value(record)) else {
            continue;
        };
        let entry = groups.entry(year).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    let points = groups
        .into_iter()
        .map(|(year, (sum, count))| TrendPoint {
            year,
            value: sum / count as f64,
        })
        .collect();

    Trend { metric, points }
}

/// Average price and demand per area, in input order. Areas without any
/// matching row are omitted.
pub fn compare(table: &Table, areas: &[String]) -> ComparisonResult {
    let mut result = ComparisonResult::default();

    for area in areas {
        let filtered = filter_by_area(table, area);
        if filtered.is_empty() {
            continue;
        }
        result.price_comparison.push(AreaPrice {
            area: area.clone(),
            avg_price: mean(filtered.records().iter().filter_map(|r| r.price)),
        });
        result.demand_comparison.push(AreaDemand {
            area: area.clone(),
            avg_demand: mean(filtered.records().iter().filter_map(|r| r.demand)),
        });
    }

    result
}

/// Filtered rows for display, truncated to `limit`.
pub fn filtered_table(table: &Table, area: &str, limit: usize) -> Vec<Map<String, Value>> {
    let needle = area.to_lowercase();
    table
        .records()
        .iter()
        .filter(|r| r.area_matches(&needle))
        .take(limit)
        .map(Record::to_row)
        .collect()
}

/// Arithmetic mean of the present values, `None` when there are none.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Smallest and largest year present in the table.
pub fn year_range(table: &Table) -> Option<(i32, i32)> {
    let years = table.records().iter().filter_map(|r| r.year);
    let (min, max) = years.fold((i32::MAX, i32::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));
    (min <= max).then_some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Table {
        Table::new(vec![
            Record::new("Koramangala", 2021, 130.0, 60.0),
            Record::new("Koramangala", 2020, 100.0, 40.0),
            Record::new("Koramangala", 2020, 120.0, 50.0),
            Record::new("Indiranagar", 2020, 200.0, 70.0),
            Record {
                area: None,
                year: Some(2020),
                price: Some(999.0),
                demand: Some(999.0),
                ..Default::default()
            },
        ])
    }

    #[test]
    fn test_filter_by_area_case_insensitive() {
        let filtered = filter_by_area(&sample(), "KORAMANGALA");
        assert_eq!(filtered.len(), 3);
        assert!(filtered
            .records()
            .iter()
            .all(|r| r.area.as_deref() == Some("Koramangala")));
    }

    #[test]
    fn test_filter_by_area_no_match_is_empty() {
        assert!(filter_by_area(&sample(), "Hebbal").is_empty());
    }

    #[test]
    fn test_trend_averages_duplicate_years() {
        let trend = price_trend(&filter_by_area(&sample(), "koramangala"));
        assert_eq!(
            trend.points,
            vec![
                TrendPoint { year: 2020, value: 110.0 },
                TrendPoint { year: 2021, value: 130.0 },
            ]
        );
    }

    #[test]
    fn test_trend_skips_missing_values() {
        let table = Table::new(vec![
            Record {
                area: Some("A".to_string()),
                year: Some(2019),
                price: None,
                demand: Some(5.0),
                ..Default::default()
            },
            Record::new("A", 2020, 10.0, 6.0),
        ]);
        let trend = price_trend(&table);
        assert_eq!(trend.points, vec![TrendPoint { year: 2020, value: 10.0 }]);
        assert_eq!(demand_trend(&table).points.len(), 2);
    }

    #[test]
    fn test_trend_empty_input() {
        assert!(demand_trend(&Table::default()).is_empty());
    }

    #[test]
    fn test_trend_serializes_with_metric_key() {
        let trend = demand_trend(&filter_by_area(&sample(), "indiranagar"));
        assert_eq!(
            serde_json::to_value(&trend).unwrap(),
            json!([{ "year": 2020, "demand": 70.0 }])
        );
    }

    #[test]
    fn test_compare_omits_missing_areas_and_keeps_order() {
        let areas = vec![
            "Indiranagar".to_string(),
            "Hebbal".to_string(),
            "Koramangala".to_string(),
        ];
        let result = compare(&sample(), &areas);

        let names: Vec<_> = result.price_comparison.iter().map(|p| p.area.as_str()).collect();
        assert_eq!(names, vec!["Indiranagar", "Koramangala"]);
        assert_eq!(result.price_comparison[1].avg_price, Some(350.0 / 3.0));
        assert_eq!(result.demand_comparison[0].avg_demand, Some(70.0));
    }

    #[test]
    fn test_compare_empty_areas() {
        let result = compare(&sample(), &[]);
        assert!(result.price_comparison.is_empty());
        assert!(result.demand_comparison.is_empty());
    }

    #[test]
    fn test_filtered_table_respects_limit() {
        let rows = filtered_table(&sample(), "koramangala", 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Year"), Some(&json!(2021)));
    }

    #[test]
    fn test_year_range() {
        assert_eq!(year_range(&sample()), Some((2020, 2021)));
        assert_eq!(year_range(&Table::default()), None);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(vec![1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(Vec::new()), None);
    }
}
