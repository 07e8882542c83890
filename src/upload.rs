//! Dataset upload
//!
//! Validates and parses an uploaded file, keeps a copy next to the seed
//! path so the file-based fallback sees the same data, and replaces the
//! store contents with the parsed records.

use crate::db::{DatasetStore, UploadOutcome};
use crate::error::Result;
use crate::ingestion::{self, DatasetFormat, SUPPORTED_EXTENSIONS};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Seed locations checked in order: the configured path, then the same
/// stem with every supported extension.
pub fn seed_candidates(seed_path: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![seed_path.to_path_buf()];
    for ext in SUPPORTED_EXTENSIONS {
        let candidate = seed_path.with_extension(ext);
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

pub fn upload_file(store: &dyn DatasetStore, source: &Path, seed_path: &Path) -> Result<UploadOutcome> {
    let format = DatasetFormat::from_path(source)?;
    let table = ingestion::read_table(source)?;
    if table.is_empty() {
        return Ok(UploadOutcome {
            success: false,
            count: 0,
            message: "No records to upload".to_string(),
        });
    }

    let destination = seed_path.with_extension(format.extension());
    keep_seed_copy(source, &destination)?;

    let outcome = store.replace_all(table.records())?;
    info!("Upload of {}: {}", source.display(), outcome.message);
    Ok(outcome)
}

fn keep_seed_copy(source: &Path, destination: &Path) -> Result<()> {
    let same_file = match (source.canonicalize(), destination.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if same_file {
        return Ok(());
    }

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::copy(source, destination)?;

    // a seed left in another format could be picked up before this one
    for stale in seed_candidates(destination) {
        if stale != destination && stale.exists() {
            if let Err(e) = std::fs::remove_file(&stale) {
                warn!("Failed to remove stale seed {}: {}", stale.display(), e);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_candidates() {
        let candidates = seed_candidates(Path::new("data/real_estate_data.csv"));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("data/real_estate_data.csv"),
                PathBuf::from("data/real_estate_data.parquet"),
                PathBuf::from("data/real_estate_data.xlsx"),
                PathBuf::from("data/real_estate_data.xls"),
            ]
        );
    }
}
