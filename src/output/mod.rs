//! Output module for run summaries and dataset reports
//!
//! This module handles:
//! - The end-of-run summary (counters, output location)
//! - Dataset statistics for the `--stats` mode

pub mod stats;
mod summary;

pub use stats::{compute_statistics, load_statistics, print_statistics, DatasetStatistics};
pub use summary::{print_run_summary, RunSummary};
