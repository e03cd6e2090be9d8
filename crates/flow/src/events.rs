//! Issuance flow journal events.
//!
//! Every transition an [`crate::engine::IssuanceEngine`] makes is recorded as
//! one of these events before the flow proceeds, so a flow's full history can
//! be replayed from its journal.

use chrono::{DateTime, Utc};
use common::{FlowId, Party, RecordId, TransactionId};
use ledger::CommandKind;
use serde::{Deserialize, Serialize};

use crate::request::IssuanceRequest;

/// Events that can occur during issuance flow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FlowEvent {
    /// An issuance request was received and the flow began.
    FlowStarted(FlowStartedData),

    /// The balance gate passed.
    BalanceVerified(BalanceData),

    /// The balance gate rejected the request.
    BalanceRejected(BalanceData),

    /// The output record and proposal were constructed.
    ProposalBuilt(ProposalBuiltData),

    /// The proposal passed structural and domain validation.
    ProposalValidated(ProposalBuiltData),

    /// Validation or construction failed.
    ValidationFailed(FailureData),

    /// All required signatures were collected.
    SignaturesCollected(SignaturesData),

    /// A counterparty declined or returned an invalid signature.
    SigningFailed(FailureData),

    /// The notary committed the transaction and it was distributed.
    Committed(CommittedData),

    /// The notary refused finality.
    NotaryRejected(FailureData),
}

impl FlowEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            FlowEvent::FlowStarted(_) => "FlowStarted",
            FlowEvent::BalanceVerified(_) => "BalanceVerified",
            FlowEvent::BalanceRejected(_) => "BalanceRejected",
            FlowEvent::ProposalBuilt(_) => "ProposalBuilt",
            FlowEvent::ProposalValidated(_) => "ProposalValidated",
            FlowEvent::ValidationFailed(_) => "ValidationFailed",
            FlowEvent::SignaturesCollected(_) => "SignaturesCollected",
            FlowEvent::SigningFailed(_) => "SigningFailed",
            FlowEvent::Committed(_) => "Committed",
            FlowEvent::NotaryRejected(_) => "NotaryRejected",
        }
    }
}

/// Data for the FlowStarted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStartedData {
    /// The flow instance id.
    pub flow_id: FlowId,
    /// The party running the flow.
    pub requester: Party,
    /// The issuance command requested.
    pub command: CommandKind,
    /// The face value requested.
    pub requested_value: i64,
    /// The counterparty, for two-party constructs.
    pub counterparty: Option<Party>,
    /// When the flow started.
    pub started_at: DateTime<Utc>,
}

/// Data for balance gate events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BalanceData {
    /// The net balance observed at evaluation time.
    pub observed: i64,
    /// The balance the request required.
    pub required: i64,
}

/// Data for proposal construction and validation events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProposalBuiltData {
    /// The proposed output record's id.
    pub record_id: RecordId,
}

/// Data for failure events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureData {
    /// Reason for the failure.
    pub reason: String,
}

/// Data for the SignaturesCollected event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignaturesData {
    /// Number of signatures collected.
    pub signer_count: usize,
}

/// Data for the Committed event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CommittedData {
    /// The commit id stamped by the notary.
    pub transaction_id: TransactionId,
    /// The transaction-time stamped by the notary.
    pub committed_at: DateTime<Utc>,
}

// Convenience constructors
impl FlowEvent {
    /// Creates a FlowStarted event from a request.
    pub fn flow_started(flow_id: FlowId, requester: &Party, request: &IssuanceRequest) -> Self {
        FlowEvent::FlowStarted(FlowStartedData {
            flow_id,
            requester: requester.clone(),
            command: request.command,
            requested_value: request.requested_value,
            counterparty: request.counterparty.clone(),
            started_at: Utc::now(),
        })
    }

    /// Creates a BalanceVerified event.
    pub fn balance_verified(observed: i64, required: i64) -> Self {
        FlowEvent::BalanceVerified(BalanceData { observed, required })
    }

    /// Creates a BalanceRejected event.
    pub fn balance_rejected(observed: i64, required: i64) -> Self {
        FlowEvent::BalanceRejected(BalanceData { observed, required })
    }

    /// Creates a ProposalBuilt event.
    pub fn proposal_built(record_id: RecordId) -> Self {
        FlowEvent::ProposalBuilt(ProposalBuiltData { record_id })
    }

    /// Creates a ProposalValidated event.
    pub fn proposal_validated(record_id: RecordId) -> Self {
        FlowEvent::ProposalValidated(ProposalBuiltData { record_id })
    }

    /// Creates a ValidationFailed event.
    pub fn validation_failed(reason: impl Into<String>) -> Self {
        FlowEvent::ValidationFailed(FailureData {
            reason: reason.into(),
        })
    }

    /// Creates a SignaturesCollected event.
    pub fn signatures_collected(signer_count: usize) -> Self {
        FlowEvent::SignaturesCollected(SignaturesData { signer_count })
    }

    /// Creates a SigningFailed event.
    pub fn signing_failed(reason: impl Into<String>) -> Self {
        FlowEvent::SigningFailed(FailureData {
            reason: reason.into(),
        })
    }

    /// Creates a Committed event.
    pub fn committed(transaction_id: TransactionId, committed_at: DateTime<Utc>) -> Self {
        FlowEvent::Committed(CommittedData {
            transaction_id,
            committed_at,
        })
    }

    /// Creates a NotaryRejected event.
    pub fn notary_rejected(reason: impl Into<String>) -> Self {
        FlowEvent::NotaryRejected(FailureData {
            reason: reason.into(),
        })
    }
}
