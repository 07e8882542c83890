//! Query Engine
//!
//! Entry point of the query-to-insight pipeline: loads a snapshot, finds
//! the areas named in the query, routes to the comparison or single-area
//! analysis and shapes the response envelope. Every failure is returned as
//! a `{success: false, message}` envelope.

use crate::aggregation::{compare, demand_trend, filter_by_area, filtered_table, price_trend};
use crate::area_extractor::AreaExtractor;
use crate::config::AppConfig;
use crate::data_source::{DataOrigin, DataSource, Snapshot};
use crate::db::{DatasetStore, QueryLogEntry};
use crate::error::{InsightError, Result};
use crate::record::Table;
use crate::response::{AnalysisResponse, ChartData, ChartKind, CombinedTrends};
use crate::summary::{format_figure, format_price, SummaryGenerator};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const COMPARE_KEYWORD: &str = "compare";

/// What the query asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryIntent {
    Comparison(Vec<String>),
    SingleArea(String),
}

/// A chart selection rule: the first rule whose predicate holds on the
/// lower-cased query decides the chart.
pub struct ChartRule {
    pub predicate: fn(&str) -> bool,
    pub kind: ChartKind,
}

fn mentions_demand(query: &str) -> bool {
    query.contains("demand")
}

fn mentions_price(query: &str) -> bool {
    query.contains("price") || query.contains("growth")
}

pub const CHART_RULES: &[ChartRule] = &[
    ChartRule {
        predicate: mentions_demand,
        kind: ChartKind::Demand,
    },
    ChartRule {
        predicate: mentions_price,
        kind: ChartKind::Price,
    },
];

/// Chart for a lower-cased query; `Both` when no rule applies.
pub fn select_chart(query_lower: &str) -> ChartKind {
    CHART_RULES
        .iter()
        .find(|rule| (rule.predicate)(query_lower))
        .map(|rule| rule.kind)
        .unwrap_or(ChartKind::Both)
}

/// Comparison needs the keyword and more than one area; otherwise the first
/// extracted area is analysed alone. `areas` must be non-empty.
pub fn classify(query_lower: &str, mut areas: Vec<String>) -> QueryIntent {
    if query_lower.contains(COMPARE_KEYWORD) && areas.len() > 1 {
        QueryIntent::Comparison(areas)
    } else {
        QueryIntent::SingleArea(areas.swap_remove(0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub data_loaded: bool,
    pub llm_configured: bool,
}

pub struct QueryEngine {
    source: DataSource,
    extractor: AreaExtractor,
    summarizer: SummaryGenerator,
    table_limit: usize,
}

impl QueryEngine {
    pub fn new(source: DataSource, summarizer: SummaryGenerator) -> Self {
        Self {
            source,
            extractor: AreaExtractor::default(),
            summarizer,
            table_limit: crate::aggregation::DEFAULT_TABLE_LIMIT,
        }
    }

    pub fn from_config(config: &AppConfig, store: Arc<dyn DatasetStore>) -> Self {
        let source = DataSource::new(store, Some(config.seed_path.clone()));
        Self::new(source, config.summary_generator())
            .with_extractor(AreaExtractor::new(config.match_mode))
            .with_table_limit(config.table_limit)
    }

    pub fn with_extractor(mut self, extractor: AreaExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_table_limit(mut self, limit: usize) -> Self {
        self.table_limit = limit;
        self
    }

    pub fn store(&self) -> &Arc<dyn DatasetStore> {
        self.source.store()
    }

    /// Answer a query against a fresh snapshot and log the outcome.
    pub async fn analyze_query(&self, query: &str) -> AnalysisResponse {
        let snapshot = self.load_snapshot().await;
        debug!("Analysing against {:?} snapshot of {} records", snapshot.origin, snapshot.table.len());

        let result = if snapshot.origin == DataOrigin::Unavailable {
            Err(InsightError::EmptyDataset)
        } else {
            self.analyze_table(query, &snapshot.table).await
        };

        let response = result.unwrap_or_else(|e| {
            info!("Query '{}' failed: {}", query, e);
            AnalysisResponse::from(e)
        });
        self.record(query, response.success).await;
        response
    }

    /// Run the pipeline over a given snapshot.
    pub async fn analyze_table(&self, query: &str, table: &Table) -> Result<AnalysisResponse> {
        let query_lower = query.to_lowercase();
        let areas = self.extractor.extract(&query_lower, &table.known_areas());
        if areas.is_empty() {
            return Err(InsightError::NoAreaIdentified);
        }

        match classify(&query_lower, areas) {
            QueryIntent::Comparison(areas) => Ok(comparison_response(table, &areas)),
            QueryIntent::SingleArea(area) => self.single_area_response(table, &area, &query_lower).await,
        }
    }

    async fn single_area_response(
        &self,
        table: &Table,
        area: &str,
        query_lower: &str,
    ) -> Result<AnalysisResponse> {
        let filtered = filter_by_area(table, area);
        if filtered.is_empty() {
            return Err(InsightError::NoDataForArea(area.to_string()));
        }

        let summary = self.summarizer.summarize(area, &filtered).await;
        let chart_data = match select_chart(query_lower) {
            ChartKind::Demand => ChartData::Demand {
                data: demand_trend(&filtered),
            },
            ChartKind::Price => ChartData::Price {
                data: price_trend(&filtered),
            },
            ChartKind::Both => ChartData::Both {
                data: CombinedTrends {
                    price: price_trend(&filtered),
                    demand: demand_trend(&filtered),
                },
            },
        };
        let table_data = filtered_table(table, area, self.table_limit);

        Ok(AnalysisResponse::single_area(
            area.to_string(),
            summary,
            chart_data,
            table_data,
        ))
    }

    pub async fn health(&self) -> HealthReport {
        let snapshot = self.load_snapshot().await;
        HealthReport {
            status: "healthy",
            data_loaded: !snapshot.table.is_empty(),
            llm_configured: self.summarizer.ai_enabled(),
        }
    }

    /// Store and file reads block, so they run off the async worker threads.
    async fn load_snapshot(&self) -> Snapshot {
        let source = self.source.clone();
        match tokio::task::spawn_blocking(move || source.load()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Snapshot load task failed: {}", e);
                Snapshot::unavailable()
            }
        }
    }

    async fn record(&self, query: &str, success: bool) {
        let store = Arc::clone(self.store());
        let entry = QueryLogEntry::now(query, success);
        let logged = tokio::task::spawn_blocking(move || store.log_query(&entry)).await;
        match logged {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to save query log: {}", e),
            Err(e) => warn!("Query log task failed: {}", e),
        }
    }
}

fn comparison_response(table: &Table, areas: &[String]) -> AnalysisResponse {
    let comparison = compare(table, areas);

    let mut summary = format!("Comparing {}:\n\n", areas.join(" and "));
    for item in &comparison.price_comparison {
        summary.push_str(&format!("{}: Average Price {}\n", item.area, format_price(item.avg_price)));
    }
    summary.push('\n');
    for item in &comparison.demand_comparison {
        summary.push_str(&format!("{}: Average Demand {}\n", item.area, format_figure(item.avg_demand)));
    }

    AnalysisResponse::comparison(
        summary,
        ChartData::Comparison {
            price_data: comparison.price_comparison,
            demand_data: comparison.demand_comparison,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_rule_precedence() {
        assert_eq!(select_chart("demand and price in hebbal"), ChartKind::Demand);
        assert_eq!(select_chart("price growth of hebbal"), ChartKind::Price);
        assert_eq!(select_chart("growth in hebbal"), ChartKind::Price);
        assert_eq!(select_chart("tell me about hebbal"), ChartKind::Both);
    }

    #[test]
    fn test_classify() {
        let two = vec!["A".to_string(), "B".to_string()];
        assert_eq!(
            classify("compare a and b", two.clone()),
            QueryIntent::Comparison(two.clone())
        );
        assert_eq!(classify("a vs b", two), QueryIntent::SingleArea("A".to_string()));
        assert_eq!(
            classify("compare a", vec!["A".to_string()]),
            QueryIntent::SingleArea("A".to_string())
        );
    }

    #[test]
    fn test_comparison_summary_lists_all_requested_areas() {
        let table = Table::new(vec![crate::record::Record::new("Koramangala", 2020, 1500.0, 40.0)]);
        let response =
            comparison_response(&table, &["Koramangala".to_string(), "Indiranagar".to_string()]);
        let insight = response.insight().unwrap();

        assert!(insight.summary.starts_with("Comparing Koramangala and Indiranagar:\n\n"));
        assert!(insight.summary.contains("Koramangala: Average Price ₹1,500.00\n"));
        assert!(insight.summary.contains("Koramangala: Average Demand 40.00\n"));
        assert!(!insight.summary.contains("Indiranagar: Average"));
        assert!(insight.table_data.is_empty());
    }
}
