//! State module for tracking run progress
//!
//! # Components
//!
//! - `RunPhase`: lifecycle of a run (running, draining, flushing, done)
//! - `RunCounters`: attempted / succeeded / skipped tallies

mod counters;
mod run_phase;

// Re-export main types
pub use counters::RunCounters;
pub use run_phase::RunPhase;
