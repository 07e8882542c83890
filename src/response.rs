//! Response envelopes returned by the query engine.

use crate::aggregation::{AreaDemand, AreaPrice, Trend};
use crate::error::InsightError;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Price,
    Demand,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedTrends {
    pub price: Trend,
    pub demand: Trend,
}

/// Chart-ready payload, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChartData {
    Price {
        data: Trend,
    },
    Demand {
        data: Trend,
    },
    Both {
        data: CombinedTrends,
    },
    Comparison {
        price_data: Vec<AreaPrice>,
        demand_data: Vec<AreaDemand>,
    },
}

impl ChartData {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ChartData::Price { .. } => "price",
            ChartData::Demand { .. } => "demand",
            ChartData::Both { .. } => "both",
            ChartData::Comparison { .. } => "comparison",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub summary: String,
    pub chart_data: ChartData,
    pub table_data: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Insight(Insight),
    Failure { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl AnalysisResponse {
    pub fn single_area(
        area: String,
        summary: String,
        chart_data: ChartData,
        table_data: Vec<Map<String, Value>>,
    ) -> Self {
        Self {
            success: true,
            body: ResponseBody::Insight(Insight {
                summary,
                chart_data,
                table_data,
                area: Some(area),
            }),
        }
    }

    /// Comparisons never carry table rows.
    pub fn comparison(summary: String, chart_data: ChartData) -> Self {
        Self {
            success: true,
            body: ResponseBody::Insight(Insight {
                summary,
                chart_data,
                table_data: Vec::new(),
                area: None,
            }),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            body: ResponseBody::Failure {
                message: message.into(),
            },
        }
    }

    pub fn insight(&self) -> Option<&Insight> {
        match &self.body {
            ResponseBody::Insight(insight) => Some(insight),
            ResponseBody::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Failure { message } => Some(message),
            ResponseBody::Insight(_) => None,
        }
    }
}

impl From<InsightError> for AnalysisResponse {
    fn from(err: InsightError) -> Self {
        AnalysisResponse::failure(err.to_string())
    }
}
