//! The aggregate index and its query-oracle contract.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledger::CommittedTransaction;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::fact::IndexedFact;
use crate::snapshot::IndexSnapshot;

/// The query-oracle contract consumed by balance evaluation.
///
/// Implementations hand out pinned snapshots; all querying happens on the
/// snapshot. `as_of` targets a valid-time instant; `None` means "now".
/// Collaborators are injected where they are needed — nothing looks an
/// oracle up from ambient state.
#[async_trait]
pub trait QueryOracle: Send + Sync {
    /// Takes a point-in-time snapshot of the index.
    async fn snapshot(&self, as_of: Option<DateTime<Utc>>) -> Result<IndexSnapshot>;
}

/// In-memory bitemporal aggregate index.
///
/// Ingestion is idempotent by commit id, so replaying the ledger from the
/// start never duplicates facts. Readers never block each other; snapshots
/// copy the visible fact set out under a read lock.
#[derive(Clone, Default)]
pub struct AggregateIndex {
    facts: Arc<RwLock<Vec<IndexedFact>>>,
}

impl AggregateIndex {
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests a committed transaction as a fact.
    ///
    /// Returns true if the fact was new, false if this commit had already
    /// been ingested.
    pub async fn ingest(&self, tx: &CommittedTransaction) -> bool {
        let mut facts = self.facts.write().await;
        if facts.iter().any(|f| f.transaction_id == tx.id) {
            return false;
        }
        facts.push(IndexedFact::from_commit(tx));
        metrics::counter!("index_facts_ingested").increment(1);
        true
    }

    /// Returns the number of facts currently ingested.
    pub async fn fact_count(&self) -> usize {
        self.facts.read().await.len()
    }
}

#[async_trait]
impl QueryOracle for AggregateIndex {
    async fn snapshot(&self, as_of: Option<DateTime<Utc>>) -> Result<IndexSnapshot> {
        let facts = self.facts.read().await.clone();
        Ok(IndexSnapshot::new(facts, as_of.unwrap_or_else(Utc::now)))
    }
}
