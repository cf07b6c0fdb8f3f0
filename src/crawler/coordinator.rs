//! Crawler coordinator - main ingestion orchestration logic
//!
//! This module contains the run loop that ties everything together:
//! - Snapshotting the checkpoint keys and computing the pending identifiers
//! - Starting the worker pool and consuming its events
//! - Accumulating records and flushing them every `flush-interval` successes
//! - Handling stop requests (drain, then final flush)
//! - Recording the run in the ledger

use crate::config::Config;
use crate::crawler::context::IngestContext;
use crate::crawler::dedup::{DedupFilter, PendingWork};
use crate::crawler::pool::{
    stop_requested, ItemOutcome, PoolSettings, WorkQueue, WorkerEvent, WorkerPool,
};
use crate::output::RunSummary;
use crate::record::Record;
use crate::source::{IdentifierRange, UrlTemplate};
use crate::state::{RunCounters, RunPhase};
use crate::storage::RunStatus;
use crate::{HarvestError, Result};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};

/// Events buffered per worker before workers wait on the orchestrator
const EVENTS_PER_WORKER: usize = 4;

/// Main orchestrator structure
pub struct Coordinator {
    config: Config,
    config_hash: String,
    ctx: IngestContext,
    phase: RunPhase,
    counters: RunCounters,
    accumulator: Vec<Record>,
    flushes: u32,
    records_in_store: usize,
}

/// State of one run once the ledger row exists
struct RunPlan {
    run_id: i64,
    range: IdentifierRange,
    template: Arc<UrlTemplate>,
    work: PendingWork,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Fingerprint of the configuration file, stored with the run
    /// * `ctx` - Client, extractor, checkpoint store and ledger for this run
    pub fn new(config: Config, config_hash: impl Into<String>, ctx: IngestContext) -> Self {
        Self {
            config,
            config_hash: config_hash.into(),
            ctx,
            phase: RunPhase::Running,
            counters: RunCounters::default(),
            accumulator: Vec::new(),
            flushes: 0,
            records_in_store: 0,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Runs one ingestion pass over the configured range
    ///
    /// The run ends when every pending identifier has been attempted or when
    /// `stop` turns `true`. Either way the accumulator is flushed before this
    /// returns.
    ///
    /// # Errors
    ///
    /// A checkpoint store failure (while snapshotting keys or during any
    /// flush) ends the run with [`RunStatus::Failed`] and is returned.
    /// Per-identifier failures never surface here.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> Result<RunSummary> {
        let started = Instant::now();
        let plan = self.plan()?;

        tracing::info!(
            "Run {} over {}: {} pending, {} already stored, {} tombstoned",
            plan.run_id,
            plan.range,
            plan.work.len(),
            self.counters.already_present,
            self.counters.tombstoned
        );

        let undispatched = match self.dispatch(&plan, &mut stop).await {
            Ok(undispatched) => undispatched,
            Err(e) => return Err(self.fail(plan.run_id, e)),
        };

        let status = if self.phase == RunPhase::Draining {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };

        self.transition(RunPhase::Flushing)?;
        if let Err(e) = self.flush() {
            return Err(self.fail(plan.run_id, e));
        }
        self.transition(RunPhase::Done)?;
        if let Err(e) = self
            .ctx
            .ledger
            .finish_run(plan.run_id, status, &self.counters)
        {
            tracing::warn!("Failed to record end of run {}: {}", plan.run_id, e);
        }

        tracing::info!("Run {} {}: {}", plan.run_id, status, self.counters);

        Ok(RunSummary {
            run_id: plan.run_id,
            status,
            range: plan.range,
            counters: self.counters,
            pending: plan.work.len() as u64,
            undispatched: undispatched as u64,
            flushes: self.flushes,
            records_in_store: self.records_in_store,
            dataset_path: self.ctx.store.location().to_path_buf(),
            elapsed: started.elapsed(),
        })
    }

    /// Snapshots the store, applies the dedup filter and opens the ledger row
    fn plan(&mut self) -> Result<RunPlan> {
        let range = self.config.range()?;
        let template = self.config.template()?;

        let present = self.ctx.store.read_keys()?;
        self.records_in_store = present.len();

        let tombstoned = match self.config.crawler.tombstone_after {
            Some(threshold) => self.ctx.ledger.tombstoned_keys(threshold)?,
            None => HashSet::new(),
        };

        let work = DedupFilter::new(present, tombstoned).pending(range, &template);
        self.counters.already_present = work.already_present;
        self.counters.tombstoned = work.tombstoned;

        let run_id = self.ctx.ledger.begin_run(&self.config_hash, range)?;

        Ok(RunPlan {
            run_id,
            range,
            template: Arc::new(template),
            work,
        })
    }

    /// Feeds the pending identifiers to the pool and consumes its events
    /// until every worker has exited
    ///
    /// Returns the number of identifiers dropped from the queue by a stop
    /// request or left behind by workers that died. Either case ends the
    /// dispatch phase early, so the run is recorded as interrupted.
    async fn dispatch(
        &mut self,
        plan: &RunPlan,
        stop: &mut watch::Receiver<bool>,
    ) -> Result<usize> {
        if plan.work.is_empty() {
            tracing::info!("Nothing to fetch in {}", plan.range);
            return Ok(0);
        }

        let settings = PoolSettings {
            workers: self.config.crawler.worker_count,
            delay: self.config.crawler.request_delay(),
            jitter: self.config.crawler.request_jitter(),
        };
        let queue = Arc::new(WorkQueue::new(plan.work.identifiers.iter().copied()));
        let capacity = settings.workers as usize * EVENTS_PER_WORKER;
        let (events_tx, mut events_rx) = mpsc::channel(capacity);

        let mut pool = WorkerPool::spawn(
            settings,
            Arc::clone(&queue),
            self.ctx.client.clone(),
            Arc::clone(&plan.template),
            Arc::clone(&self.ctx.extractor),
            events_tx,
            stop.clone(),
        );

        let total = plan.work.len();
        let mut undispatched = 0;

        loop {
            tokio::select! {
                event = events_rx.recv() => {
                    let Some(event) = event else {
                        // Every worker dropped its sender
                        break;
                    };
                    if let Err(e) = self.handle_event(event, plan.run_id, total) {
                        pool.abort();
                        return Err(e);
                    }
                }
                _ = stop_requested(stop), if self.phase.accepts_dispatch() => {
                    self.transition(RunPhase::Draining)?;
                    undispatched = queue.close().await;
                    tracing::warn!(
                        "Stop requested: draining in-flight fetches, {} identifiers not dispatched",
                        undispatched
                    );
                }
            }
        }

        // Workers may all notice the stop before the select above does
        if self.phase.accepts_dispatch() && *stop.borrow() {
            self.transition(RunPhase::Draining)?;
            undispatched = queue.close().await;
        }

        let failed = pool.join().await;
        if failed > 0 {
            // Identifiers left behind by dead workers are retried next run
            let stranded = queue.close().await;
            tracing::error!(
                "{} fetch workers failed, {} identifiers not dispatched",
                failed,
                stranded
            );
            undispatched += stranded;
            if self.phase.accepts_dispatch() {
                self.transition(RunPhase::Draining)?;
            }
        }
        Ok(undispatched)
    }

    fn handle_event(&mut self, event: WorkerEvent, run_id: i64, total: usize) -> Result<()> {
        match event.outcome {
            ItemOutcome::Record(record) => {
                self.counters.record_success();
                tracing::info!(
                    "[{}/{}] {} - {}",
                    self.counters.attempted,
                    total,
                    record.artist,
                    record.title
                );
                if let Err(e) = self.ctx.ledger.clear_miss(&event.source_key) {
                    tracing::warn!("Failed to clear miss for {}: {}", event.source_key, e);
                }
                self.accumulator.push(record);

                if self.accumulator.len() >= self.config.crawler.flush_interval as usize {
                    self.flush()?;
                }
            }
            ItemOutcome::NotFound => {
                self.counters.record_not_found();
                tracing::debug!("[{}/{}] {} not found", self.counters.attempted, total, event.id);
                if let Err(e) = self.ctx.ledger.record_miss(&event.source_key, run_id) {
                    tracing::warn!("Failed to record miss for {}: {}", event.source_key, e);
                }
            }
            ItemOutcome::Transient { reason } => {
                self.counters.record_transient();
                tracing::debug!(
                    "[{}/{}] {} skipped: {}",
                    self.counters.attempted,
                    total,
                    event.id,
                    reason
                );
            }
            ItemOutcome::Rejected(reason) => {
                self.counters.record_rejection();
                tracing::debug!(
                    "[{}/{}] {} rejected: {}",
                    self.counters.attempted,
                    total,
                    event.id,
                    reason
                );
            }
        }
        Ok(())
    }

    /// Merges the accumulator into the checkpoint store and clears it
    ///
    /// An empty accumulator leaves the store untouched. On failure the
    /// previous dataset file stays intact and the run is over.
    fn flush(&mut self) -> Result<()> {
        if self.accumulator.is_empty() {
            return Ok(());
        }

        let batch = self.accumulator.len();
        let written = self
            .ctx
            .store
            .merge_and_write(std::mem::take(&mut self.accumulator))?;

        self.flushes += 1;
        self.records_in_store = written;
        tracing::info!(
            "Flushed {} records to {} ({} total)",
            batch,
            self.ctx.store.location().display(),
            written
        );
        Ok(())
    }

    fn transition(&mut self, next: RunPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!("Run phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Marks the run failed in the ledger and hands the error back
    fn fail(&mut self, run_id: i64, error: HarvestError) -> HarvestError {
        tracing::error!("Run {} failed: {}", run_id, error);
        if let Err(e) = self
            .ctx
            .ledger
            .finish_run(run_id, RunStatus::Failed, &self.counters)
        {
            tracing::warn!("Failed to record failure of run {}: {}", run_id, e);
        }
        error
    }
}

/// Runs one ingestion with the production context and Ctrl-C handling
///
/// The first Ctrl-C requests a graceful stop: no new dispatch, in-flight
/// fetches finish, the accumulator is flushed and the summary returned.
/// A second Ctrl-C exits the process at once with status 130. Records not
/// yet flushed are lost, but the dataset file is never left half written.
///
/// # Example
///
/// ```no_run
/// use album_harvest::config::load_config_with_hash;
/// use album_harvest::crawler::run_ingestion;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("harvest.toml"))?;
/// let summary = run_ingestion(config, hash).await?;
/// println!("{}", summary.counters);
/// # Ok(())
/// # }
/// ```
pub async fn run_ingestion(config: Config, config_hash: String) -> Result<RunSummary> {
    let ctx = IngestContext::from_config(&config)?;
    let (stop_tx, stop_rx) = watch::channel(false);

    let signal = tokio::spawn(async move {
        if forward_interrupts(tokio::signal::ctrl_c, stop_tx).await {
            tracing::error!("Second interrupt received, exiting without the final flush");
            std::process::exit(130);
        }
    });

    let result = Coordinator::new(config, config_hash, ctx).run(stop_rx).await;
    signal.abort();
    result
}

/// Turns the first interrupt into a stop request
///
/// Returns `true` when a second interrupt arrives and `false` if the signal
/// source fails before that.
async fn forward_interrupts<F, Fut>(mut next_signal: F, stop_tx: watch::Sender<bool>) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    let mut received = 0u32;
    while next_signal().await.is_ok() {
        received += 1;
        if received > 1 {
            return true;
        }
        tracing::warn!("Interrupt received, finishing in-flight work (interrupt again to quit now)");
        let _ = stop_tx.send(true);
    }
    false
}
