//! Per-run counters

use std::fmt;

/// Tallies for one ingestion run
///
/// `attempted` counts identifiers a worker actually fetched. Every attempt
/// ends as exactly one of `succeeded`, `not_found`, `transient` or `rejected`;
/// the last three together make up `skipped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub attempted: u64,
    pub succeeded: u64,
    pub not_found: u64,
    pub transient: u64,
    pub rejected: u64,

    /// Identifiers filtered out because the store already holds them
    pub already_present: u64,

    /// Identifiers filtered out by the not-found tombstone policy
    pub tombstoned: u64,
}

impl RunCounters {
    /// Attempts that produced no record
    pub fn skipped(&self) -> u64 {
        self.not_found + self.transient + self.rejected
    }

    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_not_found(&mut self) {
        self.attempted += 1;
        self.not_found += 1;
    }

    pub fn record_transient(&mut self) {
        self.attempted += 1;
        self.transient += 1;
    }

    pub fn record_rejection(&mut self) {
        self.attempted += 1;
        self.rejected += 1;
    }
}

impl fmt::Display for RunCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted={} succeeded={} skipped={}",
            self.attempted,
            self.succeeded,
            self.skipped()
        )
    }
}
