//! The append-only commit log.

use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::RwLock;

use common::TransactionId;

use crate::error::{LedgerError, Result};
use crate::transaction::CommittedTransaction;

/// A stream of committed transactions in commit order.
pub type CommitStream = Pin<Box<dyn Stream<Item = Result<CommittedTransaction>> + Send>>;

/// The append-only collection of committed transactions.
///
/// Entries are only ever appended; no update or delete operation exists.
/// The log is cheap to clone and all clones share the same entries.
#[derive(Clone, Default)]
pub struct Ledger {
    entries: Arc<RwLock<Vec<CommittedTransaction>>>,
}

impl Ledger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a committed transaction.
    ///
    /// Fails if a transaction with the same commit id is already present.
    pub async fn append(&self, tx: CommittedTransaction) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.id == tx.id) {
            return Err(LedgerError::DuplicateTransaction(tx.id));
        }
        entries.push(tx);
        Ok(())
    }

    /// Looks up a committed transaction by its commit id.
    pub async fn get(&self, id: TransactionId) -> Option<CommittedTransaction> {
        self.entries.read().await.iter().find(|e| e.id == id).cloned()
    }

    /// Returns the number of committed transactions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing has been committed yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Streams the committed transactions at positions `offset..`, in commit
    /// order.
    ///
    /// The index ingestion pipeline passes its tracked position so each
    /// catch-up run only pulls what it has not seen yet. Only the tail is
    /// cloned out of the log.
    pub async fn stream_entries_from(&self, offset: usize) -> CommitStream {
        use futures_util::stream;

        let entries = self.entries.read().await;
        let tail: Vec<_> = entries.iter().skip(offset).cloned().collect();
        Box::pin(stream::iter(tail.into_iter().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ItemRecord, LedgerRecord};
    use crate::transaction::{CommandKind, SignedTransaction, TransactionProposal};
    use common::{NotaryId, Party};
    use futures_util::StreamExt;

    fn committed(value: i64) -> CommittedTransaction {
        let owner = Party::new("B");
        let record = LedgerRecord::Item(ItemRecord::new(owner.clone(), "thing", value));
        let proposal = TransactionProposal::builder()
            .output(record)
            .command(CommandKind::IssueItem)
            .signer(owner.key())
            .notary(NotaryId::new())
            .build();
        CommittedTransaction {
            id: TransactionId::new(),
            committed_at: chrono::Utc::now(),
            transaction: SignedTransaction::new(proposal),
        }
    }

    #[tokio::test]
    async fn append_and_get() {
        let ledger = Ledger::new();
        let tx = committed(1);
        let id = tx.id;

        ledger.append(tx).await.unwrap();
        assert_eq!(ledger.len().await, 1);

        let found = ledger.get(id).await.unwrap();
        assert_eq!(found.id, id);
    }

    #[tokio::test]
    async fn duplicate_commit_id_is_rejected() {
        let ledger = Ledger::new();
        let tx = committed(1);

        ledger.append(tx.clone()).await.unwrap();
        let result = ledger.append(tx).await;
        assert!(matches!(result, Err(LedgerError::DuplicateTransaction(_))));
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn repeated_lookups_return_identical_record() {
        let ledger = Ledger::new();
        let tx = committed(5);
        let id = tx.id;
        ledger.append(tx).await.unwrap();

        let first = ledger.get(id).await.unwrap();
        let second = ledger.get(id).await.unwrap();
        assert_eq!(first.record(), second.record());
        assert_eq!(first.committed_at, second.committed_at);
    }

    #[tokio::test]
    async fn stream_yields_entries_in_commit_order() {
        let ledger = Ledger::new();
        ledger.append(committed(1)).await.unwrap();
        ledger.append(committed(2)).await.unwrap();

        let stream = ledger.stream_entries_from(0).await;
        let entries: Vec<_> = stream.collect().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].as_ref().unwrap().record().face_value(), 1);
        assert_eq!(entries[1].as_ref().unwrap().record().face_value(), 2);
    }

    #[tokio::test]
    async fn stream_skips_the_seen_prefix() {
        let ledger = Ledger::new();
        ledger.append(committed(1)).await.unwrap();
        ledger.append(committed(2)).await.unwrap();
        ledger.append(committed(3)).await.unwrap();

        let tail: Vec<_> = ledger.stream_entries_from(2).await.collect().await;
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].as_ref().unwrap().record().face_value(), 3);

        let empty: Vec<_> = ledger.stream_entries_from(3).await.collect().await;
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let ledger = Ledger::new();
        let view = ledger.clone();
        ledger.append(committed(1)).await.unwrap();
        assert_eq!(view.len().await, 1);
    }
}
