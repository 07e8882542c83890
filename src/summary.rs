//! Summary Generator
//!
//! Turns a filtered data slice into a short narrative. When a text
//! generator is configured it is asked once; anything other than generated
//! text falls through to the rule-based summary, which is total for any
//! slice.

use crate::aggregation::{mean, year_range};
use crate::llm::{Generation, TextGenerator};
use crate::record::Table;
use std::sync::Arc;
use tracing::{info, warn};

const GROWTH_THRESHOLD_PCT: f64 = 10.0;
const STRONG_DEMAND_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTrendLabel {
    Growing,
    Declining,
    Stable,
}

impl PriceTrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceTrendLabel::Growing => "growing",
            PriceTrendLabel::Declining => "declining",
            PriceTrendLabel::Stable => "stable",
        }
    }

    fn investment_clause(&self) -> &'static str {
        match self {
            PriceTrendLabel::Growing => "a promising investment opportunity",
            _ => "an area worth monitoring",
        }
    }
}

/// Headline figures shared by both summary strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceStats {
    pub avg_price: Option<f64>,
    pub avg_demand: Option<f64>,
    pub year_range: Option<(i32, i32)>,
    pub record_count: usize,
}

impl SliceStats {
    pub fn from_table(data: &Table) -> Self {
        Self {
            avg_price: mean(data.records().iter().filter_map(|r| r.price)),
            avg_demand: mean(data.records().iter().filter_map(|r| r.demand)),
            year_range: year_range(data),
            record_count: data.len(),
        }
    }

    fn period(&self) -> String {
        match self.year_range {
            Some((min, max)) => format!("{} to {}", min, max),
            None => "an unknown period".to_string(),
        }
    }
}

#[derive(Clone, Default)]
pub struct SummaryGenerator {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl SummaryGenerator {
    /// A generator that only ever produces the rule-based summary.
    pub fn fallback_only() -> Self {
        Self { generator: None }
    }

    pub fn with_generator(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    pub fn ai_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn summarize(&self, area: &str, data: &Table) -> String {
        let Some(generator) = &self.generator else {
            return fallback_summary(area, data);
        };
        if data.is_empty() {
            return fallback_summary(area, data);
        }

        let prompt = build_prompt(area, &SliceStats::from_table(data));
        match generator.generate(&prompt).await {
            Generation::Generated(text) => {
                info!("Generated AI summary for {}", area);
                text
            }
            Generation::Unavailable(reason) => {
                warn!("AI summary unavailable for {}, using fallback: {}", area, reason);
                fallback_summary(area, data)
            }
        }
    }
}

pub fn build_prompt(area: &str, stats: &SliceStats) -> String {
    format!(
        r#"Analyze the real estate data for {area} and provide a concise summary (3-4 sentences):

Statistics:
- Average Price: {price}
- Average Demand: {demand}
- Data Period: {period}
- Total Records: {count}

Provide insights about the market trends, pricing, and investment potential."#,
        area = area,
        price = format_price(stats.avg_price),
        demand = format_figure(stats.avg_demand),
        period = stats.period(),
        count = stats.record_count,
    )
}

/// Rule-based narrative. Never fails; an empty slice short-circuits before
/// any aggregate is computed.
pub fn fallback_summary(area: &str, data: &Table) -> String {
    if data.is_empty() {
        return format!("No data available for {}.", area);
    }

    let stats = SliceStats::from_table(data);
    let trend = price_trend_label(data);
    let demand_label = match stats.avg_demand {
        Some(d) if d > STRONG_DEMAND_THRESHOLD => "strong",
        _ => "moderate",
    };

    format!(
        "Real Estate Analysis for {area}:\n\n\
         The average property price in {area} is {price}, with demand levels averaging {demand} during the period {period}.\n\
         The market shows a {trend} trend, making it {clause}.\n\
         With {count} data points analyzed, this locality demonstrates {demand_label} demand patterns.",
        area = area,
        price = format_price(stats.avg_price),
        demand = format_figure(stats.avg_demand),
        period = stats.period(),
        trend = trend.as_str(),
        clause = trend.investment_clause(),
        count = stats.record_count,
        demand_label = demand_label,
    )
}

/// Relative change between the first and last row's price, in slice order.
/// Callers wanting a chronological reading must pass rows in year order.
pub fn price_trend_label(data: &Table) -> PriceTrendLabel {
    let records = data.records();
    if records.len() < 2 {
        return PriceTrendLabel::Stable;
    }

    let first = records.first().and_then(|r| r.price);
    let last = records.last().and_then(|r| r.price);
    match (first, last) {
        (Some(first), Some(last)) if first != 0.0 => {
            let change = (last - first) / first * 100.0;
            if change > GROWTH_THRESHOLD_PCT {
                PriceTrendLabel::Growing
            } else if change < -GROWTH_THRESHOLD_PCT {
                PriceTrendLabel::Declining
            } else {
                PriceTrendLabel::Stable
            }
        }
        _ => PriceTrendLabel::Stable,
    }
}

/// `₹1,234,567.89`, or `n/a` for a non-finite value.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let rounded = format!("{:.2}", value.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && rounded != "0.00" { "-" } else { "" };
    format!("{}₹{}.{}", sign, grouped, frac_part)
}

pub fn format_price(value: Option<f64>) -> String {
    value.map(format_currency).unwrap_or_else(|| "n/a".to_string())
}

pub fn format_figure(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "n/a".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use async_trait::async_trait;

    struct Scripted(Generation);

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, _prompt: &str) -> Generation {
            self.0.clone()
        }
    }

    fn slice(prices: &[f64]) -> Table {
        Table::new(
            prices
                .iter()
                .enumerate()
                .map(|(i, p)| Record::new("Whitefield", 2018 + i as i32, *p, 55.0))
                .collect(),
        )
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "₹0.00");
        assert_eq!(format_currency(999.5), "₹999.50");
        assert_eq!(format_currency(1234567.891), "₹1,234,567.89");
        assert_eq!(format_currency(-1500.0), "-₹1,500.00");
    }

    #[test]
    fn test_overflowing_average_formats_as_unavailable() {
        assert_eq!(format_currency(f64::INFINITY), "n/a");
        assert_eq!(format_currency(f64::NAN), "n/a");

        let huge = slice(&[f64::MAX, f64::MAX]);
        let summary = fallback_summary("Whitefield", &huge);
        assert!(summary.contains("is n/a,"));
        assert!(!summary.contains("inf"));
    }

    #[test]
    fn test_price_trend_label() {
        assert_eq!(price_trend_label(&slice(&[100.0, 111.0])), PriceTrendLabel::Growing);
        assert_eq!(price_trend_label(&slice(&[100.0, 89.0])), PriceTrendLabel::Declining);
        assert_eq!(price_trend_label(&slice(&[100.0, 110.0])), PriceTrendLabel::Stable);
        assert_eq!(price_trend_label(&slice(&[100.0])), PriceTrendLabel::Stable);
        assert_eq!(price_trend_label(&slice(&[0.0, 50.0])), PriceTrendLabel::Stable);
    }

    #[test]
    fn test_price_trend_uses_slice_order() {
        // last row is the earliest year; the label follows row order
        let mut records = slice(&[100.0, 150.0]).into_records();
        records.reverse();
        assert_eq!(
            price_trend_label(&Table::new(records)),
            PriceTrendLabel::Declining
        );
    }

    #[test]
    fn test_fallback_summary_empty_slice() {
        assert_eq!(
            fallback_summary("Hebbal", &Table::default()),
            "No data available for Hebbal."
        );
    }

    #[test]
    fn test_fallback_summary_content() {
        let summary = fallback_summary("Whitefield", &slice(&[1000.0, 1500.0]));
        assert!(summary.starts_with("Real Estate Analysis for Whitefield:"));
        assert!(summary.contains("₹1,250.00"));
        assert!(summary.contains("averaging 55.00"));
        assert!(summary.contains("2018 to 2019"));
        assert!(summary.contains("growing trend"));
        assert!(summary.contains("a promising investment opportunity"));
        assert!(summary.contains("With 2 data points"));
        assert!(summary.contains("strong demand"));
    }

    #[test]
    fn test_fallback_summary_with_missing_values() {
        let table = Table::new(vec![Record {
            area: Some("Whitefield".to_string()),
            ..Default::default()
        }]);
        let summary = fallback_summary("Whitefield", &table);
        assert!(summary.contains("n/a"));
        assert!(summary.contains("an unknown period"));
        assert!(summary.contains("moderate demand"));
    }

    #[test]
    fn test_build_prompt_embeds_figures() {
        let prompt = build_prompt("Whitefield", &SliceStats::from_table(&slice(&[100.0, 200.0])));
        assert!(prompt.contains("real estate data for Whitefield"));
        assert!(prompt.contains("Average Price: ₹150.00"));
        assert!(prompt.contains("Data Period: 2018 to 2019"));
        assert!(prompt.contains("Total Records: 2"));
    }

    #[tokio::test]
    async fn test_generated_text_is_used() {
        let generator = SummaryGenerator::with_generator(Arc::new(Scripted(
            Generation::Generated("AI says hello".to_string()),
        )));
        assert_eq!(generator.summarize("Whitefield", &slice(&[1.0])).await, "AI says hello");
    }

    #[tokio::test]
    async fn test_unavailable_falls_back() {
        let data = slice(&[100.0, 90.0]);
        let generator = SummaryGenerator::with_generator(Arc::new(Scripted(
            Generation::Unavailable("quota exceeded".to_string()),
        )));
        assert_eq!(
            generator.summarize("Whitefield", &data).await,
            fallback_summary("Whitefield", &data)
        );
    }

    #[tokio::test]
    async fn test_no_generator_uses_fallback() {
        let data = slice(&[100.0]);
        let generator = SummaryGenerator::fallback_only();
        assert!(!generator.ai_enabled());
        assert_eq!(
            generator.summarize("Whitefield", &data).await,
            fallback_summary("Whitefield", &data)
        );
    }
}
