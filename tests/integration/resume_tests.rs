//! Integration tests for resumption across runs and for stop requests

use crate::common::{key, mount_album, mount_status, requested_paths, run, test_config};
use album_harvest::crawler::{Coordinator, IngestContext};
use album_harvest::storage::{CheckpointStore, JsonlCheckpoint, RunStatus};
use std::collections::HashSet;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::watch;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_second_run_fetches_only_failed_identifiers() {
    let server = MockServer::start().await;
    for id in [100, 102, 103, 105] {
        mount_album(&server, id).await;
    }
    mount_status(&server, 101, 503).await;
    mount_status(&server, 104, 503).await;

    let dir = tempdir().unwrap();
    let config = test_config(&server, dir.path(), 100, 106);
    let dataset = config.output.dataset_path.clone();

    let first = run(config.clone()).await.unwrap();
    assert_eq!(first.counters.succeeded, 4);
    assert_eq!(first.counters.transient, 2);

    let keys = JsonlCheckpoint::new(&dataset).read_keys().unwrap();
    let expected: HashSet<String> = [100, 102, 103, 105]
        .into_iter()
        .map(|id| key(&server, id))
        .collect();
    assert_eq!(keys, expected);

    // The failing identifiers recover
    server.reset().await;
    for id in 100..106 {
        mount_album(&server, id).await;
    }

    let second = run(config).await.unwrap();
    assert_eq!(second.counters.already_present, 4);
    assert_eq!(second.counters.attempted, 2);
    assert_eq!(second.counters.succeeded, 2);
    assert_eq!(
        requested_paths(&server).await,
        vec!["/album/101".to_string(), "/album/104".to_string()]
    );

    let keys = JsonlCheckpoint::new(&dataset).read_keys().unwrap();
    assert_eq!(keys.len(), 6);
}

#[tokio::test]
async fn test_rerun_after_full_success_is_noop() {
    let server = MockServer::start().await;
    for id in 0..4 {
        mount_album(&server, id).await;
    }

    let dir = tempdir().unwrap();
    let config = test_config(&server, dir.path(), 0, 4);
    let dataset = config.output.dataset_path.clone();

    run(config.clone()).await.unwrap();
    let before = std::fs::read_to_string(&dataset).unwrap();

    server.reset().await;
    let second = run(config).await.unwrap();

    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.pending, 0);
    assert_eq!(second.counters.attempted, 0);
    assert_eq!(second.flushes, 0);
    assert!(requested_paths(&server).await.is_empty());
    assert_eq!(std::fs::read_to_string(&dataset).unwrap(), before);
}

#[tokio::test]
async fn test_overlapping_ranges_keep_keys_unique() {
    let server = MockServer::start().await;
    for id in 0..6 {
        mount_album(&server, id).await;
    }

    let dir = tempdir().unwrap();
    let first = test_config(&server, dir.path(), 0, 4);
    let second = test_config(&server, dir.path(), 2, 6);
    let dataset = first.output.dataset_path.clone();

    run(first).await.unwrap();
    let summary = run(second).await.unwrap();
    assert_eq!(summary.counters.already_present, 2);
    assert_eq!(summary.counters.attempted, 2);

    let records = JsonlCheckpoint::new(&dataset).read_all().unwrap();
    let unique: HashSet<_> = records.iter().map(|r| r.source_key.as_str()).collect();
    assert_eq!(records.len(), 6);
    assert_eq!(unique.len(), 6);
}

#[tokio::test]
async fn test_missing_pages_retried_until_tombstoned() {
    let server = MockServer::start().await;
    mount_album(&server, 0).await;
    mount_status(&server, 1, 404).await;

    let dir = tempdir().unwrap();
    let mut config = test_config(&server, dir.path(), 0, 2);
    config.crawler.tombstone_after = Some(2);

    let first = run(config.clone()).await.unwrap();
    assert_eq!(first.counters.not_found, 1);

    // One miss recorded so far: still below the threshold
    let second = run(config.clone()).await.unwrap();
    assert_eq!(second.counters.attempted, 1);
    assert_eq!(second.counters.not_found, 1);

    let third = run(config).await.unwrap();
    assert_eq!(third.counters.attempted, 0);
    assert_eq!(third.counters.tombstoned, 1);
    assert_eq!(third.counters.already_present, 1);
}

#[tokio::test]
async fn test_missing_pages_retried_forever_by_default() {
    let server = MockServer::start().await;
    mount_status(&server, 7, 404).await;

    let dir = tempdir().unwrap();
    let config = test_config(&server, dir.path(), 7, 8);

    for _ in 0..3 {
        let summary = run(config.clone()).await.unwrap();
        assert_eq!(summary.counters.attempted, 1);
        assert_eq!(summary.counters.tombstoned, 0);
    }
}

#[tokio::test]
async fn test_stop_request_drains_and_flushes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(crate::common::album_page("Slow Band", "Slow Album"))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let mut config = test_config(&server, dir.path(), 0, 40);
    config.crawler.worker_count = 2;
    config.crawler.flush_interval = 1000;
    let dataset = config.output.dataset_path.clone();

    let ctx = IngestContext::from_config(&config).unwrap();
    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(Coordinator::new(config, "test-hash", ctx).run(stop_rx));

    tokio::time::sleep(Duration::from_millis(350)).await;
    stop_tx.send(true).unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("run did not stop")
        .unwrap()
        .unwrap();

    assert_eq!(summary.status, RunStatus::Interrupted);
    assert!(summary.counters.succeeded >= 1);
    assert!(summary.undispatched > 0);
    assert_eq!(
        summary.counters.attempted + summary.undispatched,
        summary.pending
    );

    // Nothing reached the flush interval, so only the final flush wrote
    assert_eq!(summary.flushes, 1);
    let keys = JsonlCheckpoint::new(&dataset).read_keys().unwrap();
    assert_eq!(keys.len() as u64, summary.counters.succeeded);
}
