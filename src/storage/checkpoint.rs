//! JSON Lines checkpoint store
//!
//! The dataset is a single file with one JSON-encoded [`Record`] per line,
//! sorted by `source_key`. A merge always rewrites the complete file through
//! [`AtomicFile`], so there is never a partially written dataset on disk.

use crate::record::Record;
use crate::storage::atomic::AtomicFile;
use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Checkpoint store backed by a JSON Lines file
#[derive(Debug, Clone)]
pub struct JsonlCheckpoint {
    path: PathBuf,
}

impl JsonlCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted set keyed by `source_key`
    ///
    /// A missing file is an empty store. Blank lines are ignored; any other
    /// line that does not decode to a valid record is reported as corrupt.
    fn load(&self) -> StorageResult<BTreeMap<String, Record>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        let mut records = BTreeMap::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| StorageError::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }

            let record: Record =
                serde_json::from_str(&line).map_err(|e| self.corrupt(index, e.to_string()))?;

            if record.source_key.trim().is_empty() {
                return Err(self.corrupt(index, "empty source_key".to_string()));
            }
            if record.title.trim().is_empty() || record.artist.trim().is_empty() {
                return Err(self.corrupt(index, "empty title or artist".to_string()));
            }

            records.insert(record.source_key.clone(), record);
        }

        Ok(records)
    }

    fn corrupt(&self, index: usize, reason: String) -> StorageError {
        StorageError::Corrupt {
            path: self.path.clone(),
            line: index + 1,
            reason,
        }
    }

    /// Writes the merged set to the temporary file without replacing the
    /// dataset yet
    ///
    /// This is the first half of [`merge_and_write`]: the returned
    /// [`StagedCheckpoint`] must be committed for the merge to become visible.
    ///
    /// [`merge_and_write`]: CheckpointStore::merge_and_write
    pub fn stage(&self, new_records: Vec<Record>) -> StorageResult<StagedCheckpoint> {
        let mut merged = self.load()?;
        for record in new_records {
            merged.insert(record.source_key.clone(), record);
        }

        let mut file = AtomicFile::create(&self.path)?;
        let temp = file.temp_path().to_path_buf();
        for record in merged.values() {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{}", line).map_err(|e| StorageError::io(&temp, e))?;
        }

        Ok(StagedCheckpoint {
            file,
            count: merged.len(),
        })
    }
}

impl CheckpointStore for JsonlCheckpoint {
    fn read_keys(&self) -> StorageResult<HashSet<String>> {
        Ok(self.load()?.into_keys().collect())
    }

    fn read_all(&self) -> StorageResult<Vec<Record>> {
        Ok(self.load()?.into_values().collect())
    }

    fn merge_and_write(&mut self, new_records: Vec<Record>) -> StorageResult<usize> {
        self.stage(new_records)?.commit()
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// A fully written merge waiting for its atomic rename
#[derive(Debug)]
pub struct StagedCheckpoint {
    file: AtomicFile,
    count: usize,
}

impl StagedCheckpoint {
    /// Number of records the dataset will hold once committed
    pub fn record_count(&self) -> usize {
        self.count
    }

    /// Replaces the dataset with the staged file
    pub fn commit(self) -> StorageResult<usize> {
        let count = self.count;
        self.file.commit()?;
        Ok(count)
    }
}
