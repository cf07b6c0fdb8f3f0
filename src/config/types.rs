use crate::source::{IdentifierRange, UrlTemplate};
use crate::SourceError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for album-harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
}

impl Config {
    pub fn range(&self) -> Result<IdentifierRange, SourceError> {
        IdentifierRange::new(self.source.start_id, self.source.end_id)
    }

    pub fn template(&self) -> Result<UrlTemplate, SourceError> {
        UrlTemplate::parse(&self.source.base_url_template)
    }
}

/// Where pages come from and which identifiers to visit
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// URL template; `{id}` is replaced by the identifier, or the identifier
    /// is appended when the placeholder is absent
    #[serde(rename = "base-url-template")]
    pub base_url_template: String,

    /// First identifier of the range (inclusive)
    #[serde(rename = "start-id")]
    pub start_id: u64,

    /// End of the range (exclusive)
    #[serde(rename = "end-id")]
    pub end_id: u64,
}

/// Worker pool and flush behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent fetch workers
    #[serde(rename = "worker-count")]
    pub worker_count: u32,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// Minimum delay between two fetches of one worker (milliseconds)
    #[serde(rename = "request-delay")]
    pub request_delay: u64,

    /// Upper bound of the random extra delay added to `request-delay` (milliseconds)
    #[serde(rename = "request-jitter", default)]
    pub request_jitter: u64,

    /// Number of new records accumulated before a merge-and-write
    #[serde(rename = "flush-interval")]
    pub flush_interval: u32,

    /// Stop fetching keys that answered "not found" this many times
    #[serde(rename = "tombstone-after", default)]
    pub tombstone_after: Option<u32>,
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay)
    }

    pub fn request_jitter(&self) -> Duration {
        Duration::from_millis(self.request_jitter)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the JSON Lines dataset (the checkpoint)
    #[serde(rename = "dataset-path")]
    pub dataset_path: String,

    /// Path to the SQLite run ledger
    #[serde(rename = "ledger-path")]
    pub ledger_path: String,
}

impl OutputConfig {
    pub fn dataset_path(&self) -> &Path {
        Path::new(&self.dataset_path)
    }

    pub fn ledger_path(&self) -> &Path {
        Path::new(&self.ledger_path)
    }
}

/// Cleaning stage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CleaningConfig {
    /// Path of the cleaned JSON Lines file handed to the text encoder
    #[serde(rename = "cleaned-path", default = "default_cleaned_path")]
    pub cleaned_path: String,

    /// Minimum description length (characters) for a cleaned record
    #[serde(rename = "min-description-length", default = "default_min_description_length")]
    pub min_description_length: usize,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            cleaned_path: default_cleaned_path(),
            min_description_length: default_min_description_length(),
        }
    }
}

fn default_cleaned_path() -> String {
    "data/processed/albums_clean.jsonl".to_string()
}

fn default_min_description_length() -> usize {
    50
}
