//! Phase definitions for a single ingestion run
//!
//! A run moves strictly forward: `Running -> Draining -> Flushing -> Done`.
//! `Running` may skip straight to `Flushing` when the identifier stream is
//! exhausted without a stop request.

use std::fmt;

/// Represents where a run is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Workers are pulling identifiers from the queue
    Running,

    /// A stop was requested: no new dispatch, in-flight fetches finish
    Draining,

    /// All workers are done; the accumulator is being merged into the store
    Flushing,

    /// Final flush written and counters reported
    Done,
}

impl RunPhase {
    /// Returns true if moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Draining)
                | (Self::Running, Self::Flushing)
                | (Self::Draining, Self::Flushing)
                | (Self::Flushing, Self::Done)
        )
    }

    /// Returns true while new identifiers may still be dispatched
    pub fn accepts_dispatch(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Flushing => "flushing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
