//! Process configuration read from the environment (and `.env`).

use crate::aggregation::DEFAULT_TABLE_LIMIT;
use crate::area_extractor::MatchMode;
use crate::error::{InsightError, Result};
use crate::llm::{LlmClient, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::summary::SummaryGenerator;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "LLM_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout: Duration,
    pub db_path: PathBuf,
    pub seed_path: PathBuf,
    pub match_mode: MatchMode,
    pub table_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm_api_key: None,
            llm_base_url: DEFAULT_BASE_URL.to_string(),
            llm_model: DEFAULT_MODEL.to_string(),
            llm_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            db_path: PathBuf::from("data/realty.db"),
            seed_path: PathBuf::from("data/real_estate_data.xlsx"),
            match_mode: MatchMode::Substring,
            table_limit: DEFAULT_TABLE_LIMIT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = AppConfig::default();

        config.llm_api_key = API_KEY_VARS.iter().find_map(|key| get(*key));
        if let Some(url) = get("LLM_BASE_URL") {
            config.llm_base_url = url;
        }
        if let Some(model) = get("LLM_MODEL") {
            config.llm_model = model;
        }
        if let Some(secs) = get("LLM_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| InsightError::Config(format!("LLM_TIMEOUT_SECS must be an integer, got '{}'", secs)))?;
            config.llm_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(path) = get("REALTY_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(path) = get("REALTY_SEED_PATH") {
            config.seed_path = PathBuf::from(path);
        }
        if let Some(mode) = get("AREA_MATCH_MODE") {
            config.match_mode = mode.parse().map_err(InsightError::Config)?;
        }
        if let Some(limit) = get("TABLE_ROW_LIMIT") {
            config.table_limit = limit
                .trim()
                .parse()
                .map_err(|_| InsightError::Config(format!("TABLE_ROW_LIMIT must be an integer, got '{}'", limit)))?;
        }

        Ok(config)
    }

    pub fn llm_configured(&self) -> bool {
        self.llm_api_key.is_some()
    }

    /// The AI-backed path is only wired in when a credential is present.
    pub fn summary_generator(&self) -> SummaryGenerator {
        match &self.llm_api_key {
            Some(key) => SummaryGenerator::with_generator(Arc::new(LlmClient::new(
                key.clone(),
                self.llm_model.clone(),
                self.llm_base_url.clone(),
                self.llm_timeout,
            ))),
            None => SummaryGenerator::fallback_only(),
        }
    }
}
