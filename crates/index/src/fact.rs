use chrono::{DateTime, Utc};
use common::TransactionId;
use ledger::{CommittedTransaction, LedgerRecord};
use serde::{Deserialize, Serialize};

/// A committed record as stored in the index, stamped on both time axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedFact {
    /// The commit id of the transaction that produced this record.
    pub transaction_id: TransactionId,

    /// When the index physically stored this fact (transaction-time).
    pub transaction_time: DateTime<Utc>,

    /// The point in modeled history the fact holds from (valid-time).
    /// Defaults to the notary's commit time.
    pub valid_time: DateTime<Utc>,

    /// The committed record itself.
    pub record: LedgerRecord,
}

impl IndexedFact {
    /// Builds a fact from a committed transaction, stamping transaction-time
    /// with the current instant.
    pub fn from_commit(tx: &CommittedTransaction) -> Self {
        Self {
            transaction_id: tx.id,
            transaction_time: Utc::now(),
            valid_time: tx.committed_at,
            record: tx.record().clone(),
        }
    }

    /// Returns true if this fact is visible at the given valid-time.
    pub fn valid_at(&self, as_of: DateTime<Utc>) -> bool {
        self.valid_time <= as_of
    }
}
