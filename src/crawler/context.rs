//! Handles shared by one ingestion run
//!
//! Everything the orchestrator and workers talk to is built once here and
//! passed down explicitly. Tests construct the context by hand to swap in a
//! fake store or a different extractor.

use crate::config::Config;
use crate::crawler::fetcher::build_http_client;
use crate::extract::{Extractor, GutsExtractor};
use crate::storage::{CheckpointStore, JsonlCheckpoint, RunLedger};
use crate::Result;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;

pub struct IngestContext {
    pub client: Client,
    pub extractor: Arc<dyn Extractor>,
    pub store: Box<dyn CheckpointStore>,
    pub ledger: RunLedger,
}

impl fmt::Debug for IngestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestContext")
            .field("store", &self.store.location())
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl IngestContext {
    pub fn new(
        client: Client,
        extractor: Arc<dyn Extractor>,
        store: Box<dyn CheckpointStore>,
        ledger: RunLedger,
    ) -> Self {
        Self {
            client,
            extractor,
            store,
            ledger,
        }
    }

    /// Builds the production context: HTTP client from `[user-agent]`, the
    /// Guts of Darkness extractor, the JSONL checkpoint and the SQLite ledger
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;
        let store = JsonlCheckpoint::new(config.output.dataset_path());
        let ledger = RunLedger::open(config.output.ledger_path())?;

        Ok(Self::new(
            client,
            Arc::new(GutsExtractor::new()),
            Box::new(store),
            ledger,
        ))
    }
}
