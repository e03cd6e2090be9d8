//! Ledger layer: immutable records, the transaction build/validate/sign
//! pipeline, the append-only commit log, and the notary collaborator.
//!
//! Records are facts produced by committed transactions and are never
//! mutated or removed. A transaction reaches the ledger only through a
//! [`Notary`], which guarantees at-most-once commitment and stamps the
//! commit id and transaction-time.

pub mod error;
pub mod ledger;
pub mod notary;
pub mod record;
pub mod store;
pub mod transaction;

pub use common::{NotaryId, Party, PartyKey, RecordId, TransactionId};
pub use error::{LedgerError, Result};
pub use ledger::{CommitStream, Ledger};
pub use notary::{Commitment, InMemoryNotary, Notary, NotaryError};
pub use record::{ItemRecord, LedgerRecord, LoanRecord, RecordKind};
pub use store::{InMemoryRecordStore, RecordStore};
pub use transaction::{
    CommandKind, CommittedTransaction, ProposalBuilder, ProposalViolation, Signature,
    SignedTransaction, TransactionProposal,
};
