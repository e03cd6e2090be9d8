//! Per-party record stores (vaults).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::{PartyKey, TransactionId};

use crate::error::Result;
use crate::transaction::CommittedTransaction;

/// Durable local storage of committed transactions per party.
///
/// After finality the issuance flow records the result in every
/// participant's store. Stored transactions are immutable; recording the
/// same commit twice is a no-op.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records a committed transaction in a participant's store.
    async fn record(&self, participant: PartyKey, tx: &CommittedTransaction) -> Result<()>;

    /// Looks up a committed transaction in a participant's store.
    async fn get(
        &self,
        participant: PartyKey,
        id: TransactionId,
    ) -> Result<Option<CommittedTransaction>>;
}

/// In-memory record store keyed by party.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    vaults: Arc<RwLock<HashMap<PartyKey, Vec<CommittedTransaction>>>>,
}

impl InMemoryRecordStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of transactions recorded for a party.
    pub async fn count_for(&self, participant: PartyKey) -> usize {
        self.vaults
            .read()
            .await
            .get(&participant)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Returns all transactions recorded for a party, in recording order.
    pub async fn records_for(&self, participant: PartyKey) -> Vec<CommittedTransaction> {
        self.vaults
            .read()
            .await
            .get(&participant)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn record(&self, participant: PartyKey, tx: &CommittedTransaction) -> Result<()> {
        let mut vaults = self.vaults.write().await;
        let vault = vaults.entry(participant).or_default();
        if !vault.iter().any(|existing| existing.id == tx.id) {
            vault.push(tx.clone());
        }
        Ok(())
    }

    async fn get(
        &self,
        participant: PartyKey,
        id: TransactionId,
    ) -> Result<Option<CommittedTransaction>> {
        let vaults = self.vaults.read().await;
        Ok(vaults
            .get(&participant)
            .and_then(|vault| vault.iter().find(|tx| tx.id == id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ItemRecord, LedgerRecord};
    use crate::transaction::{CommandKind, SignedTransaction, TransactionProposal};
    use common::{NotaryId, Party};

    fn committed(owner: &Party) -> CommittedTransaction {
        let record = LedgerRecord::Item(ItemRecord::new(owner.clone(), "house", 3));
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
    async fn record_and_get() {
        let store = InMemoryRecordStore::new();
        let owner = Party::new("B");
        let tx = committed(&owner);

        store.record(owner.key(), &tx).await.unwrap();

        let found = store.get(owner.key(), tx.id).await.unwrap().unwrap();
        assert_eq!(found.id, tx.id);
        assert_eq!(found.record(), tx.record());
    }

    #[tokio::test]
    async fn recording_twice_keeps_one_copy() {
        let store = InMemoryRecordStore::new();
        let owner = Party::new("B");
        let tx = committed(&owner);

        store.record(owner.key(), &tx).await.unwrap();
        store.record(owner.key(), &tx).await.unwrap();

        assert_eq!(store.count_for(owner.key()).await, 1);
    }

    #[tokio::test]
    async fn vaults_are_per_party() {
        let store = InMemoryRecordStore::new();
        let a = Party::new("A");
        let b = Party::new("B");
        let tx = committed(&b);

        store.record(b.key(), &tx).await.unwrap();

        assert!(store.get(a.key(), tx.id).await.unwrap().is_none());
        assert!(store.get(b.key(), tx.id).await.unwrap().is_some());
        assert_eq!(store.count_for(a.key()).await, 0);
    }

    #[tokio::test]
    async fn missing_transaction_returns_none() {
        let store = InMemoryRecordStore::new();
        let b = Party::new("B");
        assert!(
            store
                .get(b.key(), TransactionId::new())
                .await
                .unwrap()
                .is_none()
        );
    }
}
