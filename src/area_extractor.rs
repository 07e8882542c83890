//! Area Extractor
//!
//! Finds the known area names mentioned in a free-text query. Matching is
//! a literal, case-insensitive substring test by default, so a short area
//! name that happens to sit inside a longer word ("Ulsoor" inside
//! "Ulsoorpet") is reported as a match. `MatchMode::WordBoundary` trades
//! that false-positive risk for stricter matching.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Substring,
    WordBoundary,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "substring" => Ok(MatchMode::Substring),
            "word" | "word_boundary" => Ok(MatchMode::WordBoundary),
            other => Err(format!(
                "unknown area match mode '{}' (expected 'substring' or 'word')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AreaExtractor {
    pub mode: MatchMode,
}

impl AreaExtractor {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    /// Areas from `known_areas` that occur in `query`, in the iteration
    /// order of `known_areas` (not query order), with their original casing.
    pub fn extract<S: AsRef<str>>(&self, query: &str, known_areas: &[S]) -> Vec<String> {
        let query_lower = query.to_lowercase();
        if query_lower.trim().is_empty() {
            return Vec::new();
        }

        let mut found = Vec::new();
        for area in known_areas {
            let area: &str = area.as_ref();
            if !area.trim().is_empty() && self.mentions(&query_lower, &area.to_lowercase()) {
                found.push(area.to_string());
            }
        }
        found
    }

    fn mentions(&self, query_lower: &str, area_lower: &str) -> bool {
        match self.mode {
            MatchMode::Substring => query_lower.contains(area_lower),
            MatchMode::WordBoundary => {
                let pattern = format!(r"\b{}\b", regex::escape(area_lower));
                match Regex::new(&pattern) {
                    Ok(re) => re.is_match(query_lower),
                    Err(_) => query_lower.contains(area_lower),
                }
            }
        }
    }
}
