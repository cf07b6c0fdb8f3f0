//! Integration tests for single ingestion runs
//!
//! These tests use wiremock to serve album pages and drive the real
//! coordinator end-to-end: fetch, extract, flush and ledger bookkeeping.

use crate::common::{album_page, key, mount_album, mount_status, run, test_config};
use album_harvest::crawler::{Coordinator, IngestContext};
use album_harvest::extract::{Extractor, GutsExtractor};
use album_harvest::record::{Record, Rejection};
use album_harvest::source::SourceIdentifier;
use album_harvest::storage::{
    CheckpointStore, JsonlCheckpoint, RunLedger, RunStatus, StorageError, StorageResult,
};
use album_harvest::HarvestError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use tokio::sync::watch;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_scenario_success_not_found_success() {
    let server = MockServer::start().await;
    mount_album(&server, 0).await;
    mount_status(&server, 1, 404).await;
    mount_album(&server, 2).await;

    let dir = tempdir().unwrap();
    let config = test_config(&server, dir.path(), 0, 3);
    let dataset = config.output.dataset_path.clone();
    let ledger_path = config.output.ledger_path.clone();

    let summary = run(config).await.expect("run failed");

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.counters.attempted, 3);
    assert_eq!(summary.counters.succeeded, 2);
    assert_eq!(summary.counters.skipped(), 1);
    assert_eq!(summary.counters.not_found, 1);
    assert_eq!(summary.records_in_store, 2);

    let keys = JsonlCheckpoint::new(&dataset).read_keys().unwrap();
    let expected: HashSet<String> = [key(&server, 0), key(&server, 2)].into_iter().collect();
    assert_eq!(keys, expected);

    let ledger = RunLedger::open(Path::new(&ledger_path)).unwrap();
    let recorded = ledger.get_run(summary.run_id).unwrap();
    assert_eq!(recorded.status, RunStatus::Completed);
    assert_eq!(recorded.attempted, 3);
    assert_eq!(recorded.succeeded, 2);
    assert_eq!(recorded.skipped, 1);
    assert_eq!(ledger.count_misses().unwrap(), 1);
}

#[tokio::test]
async fn test_persisted_records_are_valid() {
    let server = MockServer::start().await;
    mount_album(&server, 10).await;
    // Page exists but has no album heading
    Mock::given(path("/album/11"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Oops</body></html>"))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let config = test_config(&server, dir.path(), 10, 12);
    let dataset = config.output.dataset_path.clone();

    let summary = run(config).await.unwrap();
    assert_eq!(summary.counters.succeeded, 1);
    assert_eq!(summary.counters.rejected, 1);

    let records = JsonlCheckpoint::new(&dataset).read_all().unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.title, "Album 10");
    assert_eq!(record.artist, "Artist 10");
    assert_eq!(record.styles, vec!["Doom Metal"]);
    assert_eq!(record.rating_average, Some(1.5));
    assert_eq!(record.source_key, key(&server, 10));
}

#[tokio::test]
async fn test_server_errors_and_timeouts_are_skipped() {
    let server = MockServer::start().await;
    mount_album(&server, 0).await;
    mount_status(&server, 1, 500).await;
    Mock::given(path("/album/2"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1500)))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut config = test_config(&server, dir.path(), 0, 3);
    config.crawler.request_timeout = 300;

    let summary = run(config).await.unwrap();
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.counters.succeeded, 1);
    assert_eq!(summary.counters.transient, 2);
    assert_eq!(summary.counters.skipped(), 2);
}

#[tokio::test]
async fn test_periodic_flushes() {
    let server = MockServer::start().await;
    for id in 0..5 {
        mount_album(&server, id).await;
    }

    let dir = tempdir().unwrap();
    let mut config = test_config(&server, dir.path(), 0, 5);
    config.crawler.flush_interval = 2;
    let dataset = config.output.dataset_path.clone();

    let summary = run(config).await.unwrap();

    // 2 + 2 during the run, 1 in the final flush
    assert_eq!(summary.flushes, 3);
    assert_eq!(summary.records_in_store, 5);
    assert_eq!(JsonlCheckpoint::new(&dataset).read_keys().unwrap().len(), 5);
}

#[tokio::test]
async fn test_all_missing_writes_nothing() {
    let server = MockServer::start().await;
    for id in 0..3 {
        mount_status(&server, id, 404).await;
    }

    let dir = tempdir().unwrap();
    let config = test_config(&server, dir.path(), 0, 3);
    let dataset = PathBuf::from(&config.output.dataset_path);

    let summary = run(config).await.unwrap();
    assert_eq!(summary.flushes, 0);
    assert_eq!(summary.counters.not_found, 3);
    assert!(!dataset.exists());
}

/// Store whose writes always fail, as on a full disk
struct FailingStore {
    path: PathBuf,
}

impl CheckpointStore for FailingStore {
    fn read_keys(&self) -> StorageResult<HashSet<String>> {
        Ok(HashSet::new())
    }

    fn read_all(&self) -> StorageResult<Vec<Record>> {
        Ok(Vec::new())
    }

    fn merge_and_write(&mut self, _new_records: Vec<Record>) -> StorageResult<usize> {
        Err(StorageError::io(
            &self.path,
            std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"),
        ))
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[tokio::test]
async fn test_store_failure_is_fatal_and_recorded() {
    let server = MockServer::start().await;
    for id in 0..4 {
        mount_album(&server, id).await;
    }

    let dir = tempdir().unwrap();
    let config = test_config(&server, dir.path(), 0, 4);
    let ledger_path = PathBuf::from(&config.output.ledger_path);

    let base = IngestContext::from_config(&config).unwrap();
    let ctx = IngestContext::new(
        base.client,
        Arc::clone(&base.extractor),
        Box::new(FailingStore {
            path: dir.path().join("albums.jsonl"),
        }),
        base.ledger,
    );

    let (_stop_tx, stop_rx) = watch::channel(false);
    let result = Coordinator::new(config, "test-hash", ctx).run(stop_rx).await;
    assert!(matches!(result, Err(HarvestError::Storage(_))));

    let ledger = RunLedger::open(&ledger_path).unwrap();
    let runs = ledger.recent_runs(1).unwrap();
    assert_eq!(runs[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn test_worker_count_bounds_concurrent_fetches() {
    let server = MockServer::start().await;
    let latency = Duration::from_millis(200);
    for id in 0..6 {
        Mock::given(path(format!("/album/{}", id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(album_page(&format!("Artist {}", id), "Slow"))
                    .set_delay(latency),
            )
            .mount(&server)
            .await;
    }

    let dir = tempdir().unwrap();
    let mut config = test_config(&server, dir.path(), 0, 6);
    config.crawler.worker_count = 2;

    let started = Instant::now();
    let summary = run(config).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(summary.counters.succeeded, 6);
    // Six slow pages through two workers take at least three rounds
    assert!(
        elapsed >= latency * 3,
        "two workers fetched six pages in {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_request_delay_paces_a_single_worker() {
    let server = MockServer::start().await;
    for id in 0..4 {
        mount_album(&server, id).await;
    }

    let dir = tempdir().unwrap();
    let mut config = test_config(&server, dir.path(), 0, 4);
    config.crawler.worker_count = 1;
    config.crawler.request_delay = 100;

    let started = Instant::now();
    let summary = run(config).await.unwrap();

    assert_eq!(summary.counters.succeeded, 4);
    // Three pauses between four fetches
    assert!(started.elapsed() >= Duration::from_millis(300));
}

/// Guts extractor that panics on one identifier
struct PanickingExtractor {
    inner: GutsExtractor,
    panic_on: u64,
}

impl Extractor for PanickingExtractor {
    fn extract(
        &self,
        id: SourceIdentifier,
        source_key: &str,
        body: &str,
    ) -> Result<Record, Rejection> {
        if id.value() == self.panic_on {
            panic!("extractor crashed on {}", id);
        }
        self.inner.extract(id, source_key, body)
    }
}

#[tokio::test]
async fn test_worker_panic_keeps_completed_records() {
    let server = MockServer::start().await;
    for id in 0..6 {
        mount_album(&server, id).await;
    }

    let dir = tempdir().unwrap();
    let mut config = test_config(&server, dir.path(), 0, 6);
    config.crawler.worker_count = 1;
    let dataset = config.output.dataset_path.clone();
    let ledger_path = PathBuf::from(&config.output.ledger_path);

    let base = IngestContext::from_config(&config).unwrap();
    let ctx = IngestContext::new(
        base.client,
        Arc::new(PanickingExtractor {
            inner: GutsExtractor::new(),
            panic_on: 3,
        }),
        base.store,
        base.ledger,
    );

    let (_stop_tx, stop_rx) = watch::channel(false);
    let summary = Coordinator::new(config, "test-hash", ctx)
        .run(stop_rx)
        .await
        .expect("a dead worker must not fail the run");

    assert_eq!(summary.status, RunStatus::Interrupted);
    assert_eq!(summary.counters.succeeded, 3);
    // The lone worker died holding id 3, leaving 4 and 5 queued
    assert_eq!(summary.undispatched, 2);
    assert_eq!(summary.records_in_store, 3);

    let keys = JsonlCheckpoint::new(&dataset).read_keys().unwrap();
    let expected: HashSet<String> = (0..3).map(|id| key(&server, id)).collect();
    assert_eq!(keys, expected);

    let ledger = RunLedger::open(&ledger_path).unwrap();
    assert_eq!(
        ledger.get_run(summary.run_id).unwrap().status,
        RunStatus::Interrupted
    );
}
