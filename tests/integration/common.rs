//! Shared fixtures for the integration tests

use album_harvest::config::{
    CleaningConfig, Config, CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig,
};
use album_harvest::crawler::{Coordinator, IngestContext};
use album_harvest::output::RunSummary;
use std::path::Path;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
///
/// No politeness delay, so runs finish quickly.
pub fn test_config(server: &MockServer, dir: &Path, start: u64, end: u64) -> Config {
    Config {
        source: SourceConfig {
            base_url_template: format!("{}/album/{{id}}", server.uri()),
            start_id: start,
            end_id: end,
        },
        crawler: CrawlerConfig {
            worker_count: 4,
            request_timeout: 2000,
            request_delay: 0,
            request_jitter: 0,
            flush_interval: 100,
            tombstone_after: None,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            dataset_path: dir.join("albums.jsonl").to_string_lossy().into_owned(),
            ledger_path: dir.join("ledger.db").to_string_lossy().into_owned(),
        },
        cleaning: CleaningConfig::default(),
    }
}

/// The source key (rendered URL) of an identifier
pub fn key(server: &MockServer, id: u64) -> String {
    format!("{}/album/{}", server.uri(), id)
}

pub fn album_page(artist: &str, title: &str) -> String {
    format!(
        r#"<html><body>
        <h1>{} &gt; <em>{}</em></h1>
        <div class="objet-style"><a>Doom Metal</a></div>
        <div class="objet-chronique"><p>A heavy and slow record.</p></div>
        <div id="objetVote"><span class="gfxNotePleine"></span><span class="gfxNoteDemi"></span></div>
        </body></html>"#,
        artist, title
    )
}

/// Serves a valid album page for `id`
pub async fn mount_album(server: &MockServer, id: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/album/{}", id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(album_page(&format!("Artist {}", id), &format!("Album {}", id)))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Serves a bare status code for `id`
pub async fn mount_status(server: &MockServer, id: u64, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/album/{}", id)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Runs one ingestion with the production context and no stop request
pub async fn run(config: Config) -> album_harvest::Result<RunSummary> {
    let ctx = IngestContext::from_config(&config)?;
    let (_stop_tx, stop_rx) = watch::channel(false);
    Coordinator::new(config, "test-hash", ctx).run(stop_rx).await
}

/// Paths of every request the server has seen, sorted
pub async fn requested_paths(server: &MockServer) -> Vec<String> {
    let mut paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    paths.sort();
    paths
}
