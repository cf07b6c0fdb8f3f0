//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with a proper user agent string
//! - GET requests for one identifier's page
//! - Classifying the response as success, not found or transient failure
//!
//! There is no retry here. A failed identifier simply stays absent from the
//! checkpoint and is picked up again by the next run's dedup pass.

use crate::config::UserAgentConfig;
use crate::source::{SourceIdentifier, UrlTemplate};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;

/// Maximum redirect hops followed for one page
const MAX_REDIRECTS: usize = 10;

/// Result of one fetch attempt; never persisted
#[derive(Debug)]
pub struct FetchOutcome {
    pub id: SourceIdentifier,
    /// URL the identifier rendered to
    pub source_key: String,
    pub status: FetchStatus,
}

/// Classification of a fetch attempt
#[derive(Debug, PartialEq, Eq)]
pub enum FetchStatus {
    /// 2xx response; the body goes to the extractor
    Success { body: String },

    /// 404 or 410: the identifier has no page (right now)
    NotFound,

    /// Timeout, connection failure or any other status
    TransientError { reason: String },
}

impl FetchStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::NotFound => "not_found",
            Self::TransientError { .. } => "transient_error",
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout covering connect, headers and body
///
/// # Example
///
/// ```no_run
/// use album_harvest::config::UserAgentConfig;
/// use album_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "AlbumHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches the page of one identifier
///
/// # Classification
///
/// | Condition                       | Status         |
/// |---------------------------------|----------------|
/// | HTTP 2xx with a readable body   | Success        |
/// | HTTP 404, HTTP 410              | NotFound       |
/// | Any other HTTP status           | TransientError |
/// | Timeout, connection error       | TransientError |
/// | Body read failure               | TransientError |
pub async fn fetch_identifier(
    client: &Client,
    template: &UrlTemplate,
    id: SourceIdentifier,
) -> FetchOutcome {
    let source_key = template.render(id);
    let status = fetch_url(client, &source_key).await;
    FetchOutcome {
        id,
        source_key,
        status,
    }
}

async fn fetch_url(client: &Client, url: &str) -> FetchStatus {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };

    let status = response.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return FetchStatus::NotFound;
    }

    if !status.is_success() {
        return FetchStatus::TransientError {
            reason: format!("HTTP {}", status.as_u16()),
        };
    }

    match response.text().await {
        Ok(body) => FetchStatus::Success { body },
        Err(e) => classify_error(&e),
    }
}

fn classify_error(error: &reqwest::Error) -> FetchStatus {
    let reason = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else {
        error.to_string()
    };
    FetchStatus::TransientError { reason }
}
