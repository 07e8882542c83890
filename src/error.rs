use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Could not identify any area in your query. Please specify an area name.")]
    NoAreaIdentified,

    #[error("No data found for {0}.")]
    NoDataForArea(String),

    #[error("No real estate data is available. Upload a dataset first.")]
    EmptyDataset,

    #[error("Store error: {0}")]
    Store(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported file: {0}")]
    UnsupportedFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for InsightError {
    fn from(err: polars::error::PolarsError) -> Self {
        InsightError::Polars(err.to_string())
    }
}

impl From<rusqlite::Error> for InsightError {
    fn from(err: rusqlite::Error) -> Self {
        InsightError::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
