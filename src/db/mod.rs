//! Database module for the SQLite-backed dataset store
//!
//! This module provides the persistent store the analyses read from, and
//! the query history log.

pub mod connection;
pub mod dataset_store;
pub mod query_history;

pub use dataset_store::{
    open_store, DatasetStatistics, DatasetStore, PriceStats, SqliteStore, UnavailableStore, UploadOutcome,
};
pub use query_history::QueryLogEntry;
