//! Storage module for persisting ingestion results
//!
//! This module handles everything that outlives a run:
//! - The checkpoint store holding every validated record (JSON Lines)
//! - Atomic temp-file-and-rename replacement of persisted files
//! - The SQLite run ledger (run history and not-found misses)

mod atomic;
mod checkpoint;
mod ledger;
mod schema;
mod traits;

pub use atomic::{temp_path_for, AtomicFile};
pub use checkpoint::{JsonlCheckpoint, StagedCheckpoint};
pub use ledger::RunLedger;
pub use traits::{CheckpointStore, StorageError, StorageResult};

/// Represents an ingestion run in the ledger
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub range_start: u64,
    pub range_end: u64,
    pub status: RunStatus,
    pub attempted: u64,
    pub succeeded: u64,
    pub skipped: u64,
}

/// Status of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
