//! End-of-run summary

use crate::source::IdentifierRange;
use crate::state::RunCounters;
use crate::storage::RunStatus;
use std::path::PathBuf;
use std::time::Duration;

/// What one ingestion run did
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: i64,
    pub status: RunStatus,
    pub range: IdentifierRange,
    pub counters: RunCounters,

    /// Identifiers left after the dedup filter
    pub pending: u64,

    /// Identifiers never handed to a worker, because of a stop request or
    /// because the workers died
    pub undispatched: u64,

    /// Number of merge-and-write calls, including the final one
    pub flushes: u32,

    /// Records in the dataset after the last flush
    pub records_in_store: usize,

    pub dataset_path: PathBuf,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Whether the run ended before every pending identifier was attempted
    pub fn was_interrupted(&self) -> bool {
        self.status == RunStatus::Interrupted
    }
}

/// Prints the summary to stderr, next to the log output
pub fn print_run_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!("=== Ingestion Run {} ({}) ===", summary.run_id, summary.status);
    eprintln!("  Range: {}", summary.range);
    eprintln!(
        "  Filtered: {} already stored, {} tombstoned, {} pending",
        summary.counters.already_present, summary.counters.tombstoned, summary.pending
    );
    eprintln!("  {}", summary.counters);
    eprintln!(
        "  Skipped breakdown: not_found={} transient={} rejected={}",
        summary.counters.not_found, summary.counters.transient, summary.counters.rejected
    );
    if summary.was_interrupted() {
        eprintln!(
            "  Not dispatched: {} (run the same range again to resume)",
            summary.undispatched
        );
    }
    eprintln!(
        "  Dataset: {} ({} records, {} flushes)",
        summary.dataset_path.display(),
        summary.records_in_store,
        summary.flushes
    );
    eprintln!("  Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
}
