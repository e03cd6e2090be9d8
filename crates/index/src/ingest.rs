//! Ingestion pipeline feeding committed ledger entries into the index.

use std::sync::Arc;

use futures_util::StreamExt;
use ledger::Ledger;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::oracle::AggregateIndex;

/// Pulls committed transactions from the ledger into the aggregate index.
///
/// Ingestion is asynchronous relative to notary finality: the pipeline runs
/// on its own cadence, so a just-committed record is durable before it is
/// queryable. `run_catch_up` is idempotent; the pipeline tracks its position
/// in the commit log and ingestion itself is idempotent by commit id.
pub struct IngestionPipeline {
    ledger: Ledger,
    index: AggregateIndex,
    position: Arc<Mutex<usize>>,
}

impl IngestionPipeline {
    /// Creates a pipeline between a ledger and an index.
    pub fn new(ledger: Ledger, index: AggregateIndex) -> Self {
        Self {
            ledger,
            index,
            position: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns the number of ledger entries processed so far.
    pub async fn position(&self) -> usize {
        *self.position.lock().await
    }

    /// Ingests every ledger entry the pipeline has not seen yet.
    ///
    /// Returns the number of newly ingested facts.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let mut position = self.position.lock().await;

        let mut stream = self.ledger.stream_entries_from(*position).await;
        let mut ingested: u64 = 0;

        while let Some(entry) = stream.next().await {
            let tx = entry?;
            *position += 1;
            if self.index.ingest(&tx).await {
                ingested += 1;
            }
        }

        metrics::counter!("index_catch_up_runs").increment(1);
        tracing::info!(ingested, position = *position, "catch-up complete");

        Ok(ingested)
    }
}
