//! Crawler module for identifier fetching and run orchestration
//!
//! This module contains the core ingestion logic, including:
//! - HTTP fetching and outcome classification
//! - The dedup filter against the checkpoint store
//! - The bounded worker pool
//! - Overall run coordination (flushes, stop requests, ledger)

mod context;
mod coordinator;
mod dedup;
mod fetcher;
mod pool;

pub use context::IngestContext;
pub use coordinator::{run_ingestion, Coordinator};
pub use dedup::{DedupFilter, PendingWork};
pub use fetcher::{build_http_client, fetch_identifier, FetchOutcome, FetchStatus};
pub use pool::{
    politeness_delay, ItemOutcome, PoolSettings, WorkQueue, WorkerEvent, WorkerPool,
};
