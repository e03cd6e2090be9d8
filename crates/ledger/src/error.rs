use common::TransactionId;
use thiserror::Error;

/// Errors that can occur in the ledger layer.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A transaction with this id is already in the commit log.
    /// The ledger is append-only; a commit id is assigned exactly once.
    #[error("transaction {0} is already committed")]
    DuplicateTransaction(TransactionId),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
