//! Shared identifier types for the ledger issuance system.
//!
//! Every identity in the system is a UUID newtype so that party keys,
//! record ids, transaction ids, and flow ids cannot be mixed up.

pub mod types;

pub use types::{FlowId, NotaryId, Party, PartyKey, RecordId, TransactionId};
