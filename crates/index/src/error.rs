use thiserror::Error;

/// Errors that can occur when querying or feeding the aggregate index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The query oracle could not be reached.
    ///
    /// This is an infrastructure failure, distinct from any business-rule
    /// failure; callers may retry with backoff, but an issuance flow must
    /// restart from scratch rather than resume mid-sequence.
    #[error("aggregate index unavailable: {0}")]
    Unavailable(String),

    /// An error occurred reading the ledger during ingestion.
    #[error("ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
