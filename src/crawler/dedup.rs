//! Dedup filter: which identifiers still need fetching
//!
//! The filter is built once per run from a point-in-time snapshot of the
//! checkpoint keys (plus the tombstoned keys when that policy is enabled) and
//! is never updated while the run is in flight.

use crate::source::{IdentifierRange, SourceIdentifier, UrlTemplate};
use std::collections::HashSet;

/// Snapshot of keys that must not be fetched again
#[derive(Debug, Clone, Default)]
pub struct DedupFilter {
    present: HashSet<String>,
    tombstoned: HashSet<String>,
}

/// Identifiers left after filtering, with the reasons others were dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingWork {
    pub identifiers: Vec<SourceIdentifier>,
    pub already_present: u64,
    pub tombstoned: u64,
}

impl PendingWork {
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

impl DedupFilter {
    /// # Arguments
    ///
    /// * `present` - `source_key`s currently held by the checkpoint store
    /// * `tombstoned` - keys excluded by the not-found policy; pass an empty
    ///   set to retry every missing identifier
    pub fn new(present: HashSet<String>, tombstoned: HashSet<String>) -> Self {
        Self {
            present,
            tombstoned,
        }
    }

    /// Returns true if `source_key` must be skipped
    pub fn excludes(&self, source_key: &str) -> bool {
        self.present.contains(source_key) || self.tombstoned.contains(source_key)
    }

    /// Walks `range` in ascending order and keeps identifiers whose rendered
    /// key is neither stored nor tombstoned
    ///
    /// A key that is both stored and tombstoned counts as already present.
    pub fn pending(&self, range: IdentifierRange, template: &UrlTemplate) -> PendingWork {
        let mut work = PendingWork::default();

        for id in range.iter() {
            let key = template.render(id);
            if self.present.contains(&key) {
                work.already_present += 1;
            } else if self.tombstoned.contains(&key) {
                work.tombstoned += 1;
            } else {
                work.identifiers.push(id);
            }
        }

        work
    }
}
