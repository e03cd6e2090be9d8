//! Notary collaborator: at-most-once commitment of transactions.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use common::{NotaryId, RecordId, TransactionId};

use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::transaction::{CommittedTransaction, SignedTransaction};

/// Proof that a transaction was irrevocably accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitment {
    /// The commit id assigned by the notary.
    pub transaction_id: TransactionId,
    /// The transaction-time stamped at finality.
    pub committed_at: DateTime<Utc>,
}

/// Errors a notary can return on submission.
#[derive(Debug, Error)]
pub enum NotaryError {
    /// The notary detected a conflicting commit for this record.
    #[error("conflicting commit for record {record_id}: {reason}")]
    Conflict { record_id: RecordId, reason: String },

    /// The transaction is missing a required signature.
    #[error("transaction for record {record_id} is not fully signed")]
    MissingSignatures { record_id: RecordId },

    /// The transaction is addressed to a different notary.
    #[error("transaction is not addressed to this notary")]
    WrongNotary,

    /// The notary could not be reached.
    #[error("notary unavailable: {0}")]
    Unavailable(String),

    /// Ledger error while recording the commit.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// The external authority that accepts a transaction at most once and stamps
/// the commit id and transaction-time.
///
/// Once a transaction has been submitted, the operation is atomic: it either
/// fully commits or fails; it cannot be cancelled.
#[async_trait]
pub trait Notary: Send + Sync {
    /// Returns this notary's identity.
    fn id(&self) -> NotaryId;

    /// Submits a signed transaction for finality.
    ///
    /// On acceptance the transaction is appended to the ledger and a
    /// [`Commitment`] is returned. Rejection reasons are conflicts
    /// (a record already committed), missing signatures, or a wrong
    /// notary reference.
    async fn submit(&self, tx: SignedTransaction) -> Result<Commitment, NotaryError>;
}

/// In-memory notary for tests and single-process deployments.
///
/// Tracks the set of record ids it has already committed and rejects any
/// resubmission of them. A failure knob forces the next submission to be
/// rejected as a conflict, simulating a concurrent consumption detected
/// elsewhere.
#[derive(Clone)]
pub struct InMemoryNotary {
    id: NotaryId,
    ledger: Ledger,
    state: Arc<Mutex<NotaryState>>,
}

#[derive(Default)]
struct NotaryState {
    seen_records: HashSet<RecordId>,
    reject_next: bool,
}

impl InMemoryNotary {
    /// Creates a notary writing commits to the given ledger.
    pub fn new(ledger: Ledger) -> Self {
        Self {
            id: NotaryId::new(),
            ledger,
            state: Arc::new(Mutex::new(NotaryState::default())),
        }
    }

    /// Forces the next submission to be rejected as a conflict.
    pub async fn set_reject_next(&self, reject: bool) {
        self.state.lock().await.reject_next = reject;
    }

    /// Returns the number of distinct records this notary has committed.
    pub async fn committed_record_count(&self) -> usize {
        self.state.lock().await.seen_records.len()
    }
}

#[async_trait]
impl Notary for InMemoryNotary {
    fn id(&self) -> NotaryId {
        self.id
    }

    #[tracing::instrument(skip(self, tx), fields(record_id = %tx.record().id()))]
    async fn submit(&self, tx: SignedTransaction) -> Result<Commitment, NotaryError> {
        let record_id = tx.record().id();

        if tx.proposal.notary() != Some(self.id) {
            return Err(NotaryError::WrongNotary);
        }
        if !tx.is_fully_signed() {
            return Err(NotaryError::MissingSignatures { record_id });
        }

        // The state lock spans the conflict check and the ledger append so
        // two submissions of the same record cannot interleave.
        let mut state = self.state.lock().await;

        if state.reject_next {
            state.reject_next = false;
            return Err(NotaryError::Conflict {
                record_id,
                reason: "conflicting consumption detected".to_string(),
            });
        }

        if !state.seen_records.insert(record_id) {
            return Err(NotaryError::Conflict {
                record_id,
                reason: "record already committed".to_string(),
            });
        }

        let commitment = Commitment {
            transaction_id: TransactionId::new(),
            committed_at: Utc::now(),
        };
        let committed = CommittedTransaction {
            id: commitment.transaction_id,
            committed_at: commitment.committed_at,
            transaction: tx,
        };

        if let Err(e) = self.ledger.append(committed).await {
            state.seen_records.remove(&record_id);
            return Err(e.into());
        }

        tracing::info!(transaction_id = %commitment.transaction_id, "transaction committed");
        Ok(commitment)
    }
}
