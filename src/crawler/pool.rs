//! Bounded fetch worker pool
//!
//! `W` tokio tasks pull identifiers from one shared [`WorkQueue`]. Each worker
//! fetches a page, runs the extractor on it and sends exactly one
//! [`WorkerEvent`] per identifier to the orchestrator over an mpsc channel.
//! The orchestrator is the only consumer, so the record accumulator has a
//! single owner and is never flushed concurrently with itself.
//!
//! A stop request (the watch channel flipping to `true`) prevents workers from
//! taking new identifiers. A fetch already in flight is not cancelled; it
//! completes or hits the request timeout, and its event is still delivered.

use crate::crawler::fetcher::{fetch_identifier, FetchStatus};
use crate::extract::Extractor;
use crate::record::{Record, Rejection};
use crate::source::{SourceIdentifier, UrlTemplate};
use rand::Rng;
use reqwest::Client;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinSet;

/// Shared queue of identifiers waiting for a worker
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<SourceIdentifier>>,
}

impl WorkQueue {
    pub fn new(identifiers: impl IntoIterator<Item = SourceIdentifier>) -> Self {
        Self {
            items: Mutex::new(identifiers.into_iter().collect()),
        }
    }

    pub async fn pop(&self) -> Option<SourceIdentifier> {
        self.items.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Drops every identifier not yet taken and returns how many there were
    pub async fn close(&self) -> usize {
        let mut items = self.items.lock().await;
        let remaining = items.len();
        items.clear();
        remaining
    }
}

/// What happened to one identifier
#[derive(Debug)]
pub enum ItemOutcome {
    Record(Record),
    NotFound,
    Transient { reason: String },
    Rejected(Rejection),
}

/// Message from a worker to the orchestrator
#[derive(Debug)]
pub struct WorkerEvent {
    pub id: SourceIdentifier,
    pub source_key: String,
    pub outcome: ItemOutcome,
}

/// Politeness settings shared by every worker
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub workers: u32,
    /// Minimum pause between two fetches of one worker
    pub delay: Duration,
    /// Upper bound of the random extra pause
    pub jitter: Duration,
}

/// Handles of the running worker tasks
pub struct WorkerPool {
    tasks: JoinSet<()>,
}

impl WorkerPool {
    /// Spawns `settings.workers` workers on the current runtime
    pub fn spawn(
        settings: PoolSettings,
        queue: Arc<WorkQueue>,
        client: Client,
        template: Arc<UrlTemplate>,
        extractor: Arc<dyn Extractor>,
        events: mpsc::Sender<WorkerEvent>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        let mut tasks = JoinSet::new();

        for worker_id in 0..settings.workers {
            let worker = Worker {
                worker_id,
                settings,
                queue: Arc::clone(&queue),
                client: client.clone(),
                template: Arc::clone(&template),
                extractor: Arc::clone(&extractor),
                events: events.clone(),
                stop: stop.clone(),
            };
            tasks.spawn(worker.run());
        }

        tracing::debug!("Spawned {} fetch workers", settings.workers);
        Self { tasks }
    }

    /// Waits for every worker to exit and returns how many of them died
    ///
    /// A worker that panics only loses the identifier it was holding. The
    /// events it already sent are with the orchestrator, so the failure is
    /// logged and the remaining workers are still awaited.
    pub async fn join(mut self) -> usize {
        let mut failed = 0;
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                if e.is_cancelled() {
                    continue;
                }
                tracing::error!("Fetch worker failed: {}", e);
                failed += 1;
            }
        }
        failed
    }

    /// Cancels every worker immediately
    pub fn abort(&mut self) {
        self.tasks.abort_all();
    }
}

struct Worker {
    worker_id: u32,
    settings: PoolSettings,
    queue: Arc<WorkQueue>,
    client: Client,
    template: Arc<UrlTemplate>,
    extractor: Arc<dyn Extractor>,
    events: mpsc::Sender<WorkerEvent>,
    stop: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            if *self.stop.borrow() {
                break;
            }

            let Some(id) = self.queue.pop().await else {
                break;
            };

            let event = self.process(id).await;
            if self.events.send(event).await.is_err() {
                // Orchestrator is gone
                break;
            }

            let pause = politeness_delay(self.settings.delay, self.settings.jitter);
            if !pause.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    _ = stop_requested(&mut self.stop) => {}
                }
            }
        }

        tracing::trace!("Worker {} exiting", self.worker_id);
    }

    async fn process(&self, id: SourceIdentifier) -> WorkerEvent {
        let fetched = fetch_identifier(&self.client, &self.template, id).await;

        let outcome = match fetched.status {
            FetchStatus::Success { body } => {
                match self.extractor.extract(id, &fetched.source_key, &body) {
                    Ok(record) => ItemOutcome::Record(record),
                    Err(reason) => ItemOutcome::Rejected(reason),
                }
            }
            FetchStatus::NotFound => ItemOutcome::NotFound,
            FetchStatus::TransientError { reason } => ItemOutcome::Transient { reason },
        };

        WorkerEvent {
            id,
            source_key: fetched.source_key,
            outcome,
        }
    }
}

/// `delay` plus a uniform random share of `jitter`
pub fn politeness_delay(delay: Duration, jitter: Duration) -> Duration {
    let jitter_ms = jitter.as_millis() as u64;
    if jitter_ms == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
}

/// Resolves once the stop flag is `true`
///
/// If every sender is dropped without a stop request, this never resolves.
pub async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
