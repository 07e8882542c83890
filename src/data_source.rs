//! Snapshot loading
//!
//! Each analysis works on one table snapshot. The store is consulted first;
//! an empty store is bootstrapped from the seed file, and an unreachable
//! store degrades to reading the seed file directly.

use crate::db::DatasetStore;
use crate::ingestion;
use crate::record::Table;
use crate::upload::seed_candidates;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Store,
    Seed,
    /// The store was reachable and no seed file exists.
    Empty,
    /// Neither the store nor the seed file could provide data.
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub table: Table,
    pub origin: DataOrigin,
}

impl Snapshot {
    pub fn unavailable() -> Self {
        Self {
            table: Table::default(),
            origin: DataOrigin::Unavailable,
        }
    }
}

#[derive(Clone)]
pub struct DataSource {
    store: Arc<dyn DatasetStore>,
    seed_path: Option<PathBuf>,
}

impl DataSource {
    pub fn new(store: Arc<dyn DatasetStore>, seed_path: Option<PathBuf>) -> Self {
        Self { store, seed_path }
    }

    pub fn store(&self) -> &Arc<dyn DatasetStore> {
        &self.store
    }

    pub fn load(&self) -> Snapshot {
        match self.store.load_all() {
            Ok(table) if !table.is_empty() => Snapshot {
                table,
                origin: DataOrigin::Store,
            },
            Ok(_) => match self.read_seed() {
                Some(table) => {
                    self.bootstrap_store(&table);
                    Snapshot {
                        table,
                        origin: DataOrigin::Seed,
                    }
                }
                None => Snapshot {
                    table: Table::default(),
                    origin: DataOrigin::Empty,
                },
            },
            Err(e) => {
                warn!("Dataset store unavailable, falling back to seed file: {}", e);
                match self.read_seed() {
                    Some(table) => Snapshot {
                        table,
                        origin: DataOrigin::Seed,
                    },
                    None => Snapshot::unavailable(),
                }
            }
        }
    }

    fn read_seed(&self) -> Option<Table> {
        let seed_path = self.seed_path.as_ref()?;
        let path = seed_candidates(seed_path).into_iter().find(|p| p.exists())?;
        match ingestion::read_table(&path) {
            Ok(table) if !table.is_empty() => {
                info!("Loaded {} records from seed file {}", table.len(), path.display());
                Some(table)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to read seed file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn bootstrap_store(&self, table: &Table) {
        match self.store.replace_all(table.records()) {
            Ok(outcome) if outcome.success => info!("Seed data uploaded to store: {}", outcome.message),
            Ok(outcome) => warn!("Seed upload skipped: {}", outcome.message),
            Err(e) => warn!("Seed upload failed: {}", e),
        }
    }
}
