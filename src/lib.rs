//! album-harvest: a resumable album-review ingestion crawler
//!
//! This crate fetches album review pages for a range of numeric source
//! identifiers under a bounded worker pool, extracts structured records from
//! them and merges the results into a crash-safe checkpoint file. Identifiers
//! already present in the checkpoint are never fetched again, so re-running a
//! range only retries what is still missing.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod prepare;
pub mod record;
pub mod source;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for album-harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid run phase transition: {from} -> {to}")]
    InvalidTransition {
        from: state::RunPhase,
        to: state::RunPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while turning identifiers into resource URLs
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Empty identifier range: start {start} must be below end {end}")]
    EmptyRange { start: u64, end: u64 },

    #[error("Identifier {value} is above the supported maximum {max}")]
    IdentifierTooLarge { value: u64, max: u64 },

    #[error("Template '{template}' renders an invalid URL: {reason}")]
    InvalidTemplate { template: String, reason: String },
}

/// Result type alias for album-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, IngestContext};
pub use extract::{Extractor, GutsExtractor};
pub use record::{Record, RecordDraft, Rejection};
pub use source::{IdentifierRange, SourceIdentifier, UrlTemplate};
pub use state::{RunCounters, RunPhase};
pub use storage::{CheckpointStore, JsonlCheckpoint, RunLedger, RunStatus};
