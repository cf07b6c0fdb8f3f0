//! Configuration module for album-harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use album_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Range: [{}, {})", config.source.start_id, config.source.end_id);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    CleaningConfig, Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{validate, MAX_WORKERS};
