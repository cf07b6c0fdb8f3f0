//! Storage traits and error types
//!
//! This module defines the interface of the checkpoint store and the error
//! types shared by every storage backend.

use crate::record::Record;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt record at {}:{line}: {reason}", .path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

impl StorageError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable holder of every record ingested so far
///
/// The store's key set is the single source of truth for "done": an
/// identifier whose key is present is never fetched again, and anything
/// absent (never attempted, failed, or rejected) is picked up by the next run.
pub trait CheckpointStore: Send {
    /// Returns every `source_key` currently persisted
    fn read_keys(&self) -> StorageResult<HashSet<String>>;

    /// Returns every persisted record, one per key
    fn read_all(&self) -> StorageResult<Vec<Record>>;

    /// Merges `new_records` into the persisted set and replaces it atomically
    ///
    /// New records win on key collision. A crash at any point leaves either
    /// the previous complete set or the new complete set on disk.
    ///
    /// # Returns
    ///
    /// The number of records in the written set
    fn merge_and_write(&mut self, new_records: Vec<Record>) -> StorageResult<usize>;

    /// Where the persisted set lives, for reporting
    fn location(&self) -> &Path;
}
