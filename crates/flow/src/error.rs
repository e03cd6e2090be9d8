//! Issuance flow error taxonomy.

use index::IndexError;
use ledger::{LedgerError, NotaryError, ProposalViolation};
use thiserror::Error;

/// Errors that can occur during issuance flow execution.
///
/// Business failures (insufficient balance, contract violations, counterparty
/// rejections, notary conflicts) are final verdicts for the attempted request.
/// Infrastructure failures (index or notary unreachable) say nothing about
/// the request itself and are safe to retry as a fresh flow.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The requester's net balance does not cover the requested value.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: i64, requested: i64 },

    /// The proposal failed structural or domain validation.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// The counterparty declined to sign or returned an invalid signature.
    #[error("counterparty rejection: {0}")]
    CounterpartyRejection(String),

    /// The notary refused finality for a conflicting or malformed commit.
    #[error("notary rejection: {0}")]
    NotaryConflict(String),

    /// The query oracle could not be reached.
    #[error("aggregate index unavailable: {0}")]
    IndexUnavailable(String),

    /// The notary could not be reached.
    #[error("notary unavailable: {0}")]
    NotaryUnavailable(String),

    /// Ledger error while distributing or journaling.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Journal serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    /// Returns true if retrying the same request as a fresh flow may succeed
    /// without any world change.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FlowError::IndexUnavailable(_) | FlowError::NotaryUnavailable(_)
        )
    }
}

impl From<ProposalViolation> for FlowError {
    fn from(violation: ProposalViolation) -> Self {
        FlowError::ContractViolation(violation.to_string())
    }
}

impl From<IndexError> for FlowError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Unavailable(reason) => FlowError::IndexUnavailable(reason),
            IndexError::Ledger(e) => FlowError::Ledger(e),
        }
    }
}

impl From<NotaryError> for FlowError {
    fn from(err: NotaryError) -> Self {
        match err {
            NotaryError::Conflict { .. }
            | NotaryError::MissingSignatures { .. }
            | NotaryError::WrongNotary => FlowError::NotaryConflict(err.to_string()),
            NotaryError::Unavailable(reason) => FlowError::NotaryUnavailable(reason),
            NotaryError::Ledger(e) => FlowError::Ledger(e),
        }
    }
}

/// Convenience result type for flow operations.
pub type Result<T> = std::result::Result<T, FlowError>;
