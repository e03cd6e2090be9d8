//! Issuance flow state machine.

use serde::{Deserialize, Serialize};

/// The state of an issuance flow in its lifecycle.
///
/// State transitions:
/// ```text
/// Init ──► VerifyingBalance ──┬──► Building ──► Validating ──┬──► Signing ──┬──► Finalizing ──┬──► Done
///                             └──► Rejected                  └──► Failed    └──► Failed       └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FlowState {
    /// The flow has not started yet.
    #[default]
    Init,

    /// The requester's net balance is being evaluated against the request.
    VerifyingBalance,

    /// The output record and proposal are being constructed.
    Building,

    /// The proposal is running structural and domain checks.
    Validating,

    /// Signatures are being collected, including counterparty sessions.
    Signing,

    /// The fully signed transaction has been submitted for finality.
    Finalizing,

    /// The transaction committed and was distributed (terminal state).
    Done,

    /// The balance gate rejected the request (terminal state).
    Rejected,

    /// Validation, signing, or finality failed (terminal state).
    Failed,
}

impl FlowState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Done | FlowState::Rejected | FlowState::Failed)
    }

    /// Returns true if the flow ended with a committed transaction.
    pub fn is_committed(&self) -> bool {
        matches!(self, FlowState::Done)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Init => "Init",
            FlowState::VerifyingBalance => "VerifyingBalance",
            FlowState::Building => "Building",
            FlowState::Validating => "Validating",
            FlowState::Signing => "Signing",
            FlowState::Finalizing => "Finalizing",
            FlowState::Done => "Done",
            FlowState::Rejected => "Rejected",
            FlowState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
