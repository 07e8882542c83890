pub mod aggregation;
pub mod area_extractor;
pub mod config;
pub mod data_source;
pub mod error;
pub mod ingestion;
pub mod llm;
pub mod query_engine;
pub mod record;
pub mod response;
pub mod summary;
pub mod upload;

// SQLite-backed dataset store and query history
pub mod db;

pub use error::{InsightError, Result};
pub use query_engine::QueryEngine;
pub use response::AnalysisResponse;
