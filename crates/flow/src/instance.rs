//! Event-sourced flow instance.

use chrono::{DateTime, Utc};
use common::{FlowId, Party, RecordId, TransactionId};
use ledger::CommandKind;
use serde::{Deserialize, Serialize};

use crate::events::FlowEvent;
use crate::state::FlowState;

/// An event-sourced issuance flow instance.
///
/// Built by replaying the flow's journal; each applied event advances the
/// state machine and accumulates context (observed balance, record id,
/// commit id).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowInstance {
    id: Option<FlowId>,
    requester: Option<Party>,
    command: Option<CommandKind>,
    requested_value: i64,
    state: FlowState,
    /// Net balance observed at the gate.
    observed_balance: Option<i64>,
    /// Proposed output record's id.
    record_id: Option<RecordId>,
    /// Commit id stamped by the notary.
    transaction_id: Option<TransactionId>,
    committed_at: Option<DateTime<Utc>>,
    /// Reason for rejection or failure, if any.
    failure_reason: Option<String>,
}

impl FlowInstance {
    /// Applies an event, advancing the state machine.
    pub fn apply(&mut self, event: FlowEvent) {
        match event {
            FlowEvent::FlowStarted(data) => {
                self.id = Some(data.flow_id);
                self.requester = Some(data.requester);
                self.command = Some(data.command);
                self.requested_value = data.requested_value;
                self.state = FlowState::VerifyingBalance;
            }
            FlowEvent::BalanceVerified(data) => {
                self.observed_balance = Some(data.observed);
                self.state = FlowState::Building;
            }
            FlowEvent::BalanceRejected(data) => {
                self.observed_balance = Some(data.observed);
                self.failure_reason = Some(format!(
                    "insufficient balance: available {}, requested {}",
                    data.observed, data.required
                ));
                self.state = FlowState::Rejected;
            }
            FlowEvent::ProposalBuilt(data) => {
                self.record_id = Some(data.record_id);
                self.state = FlowState::Validating;
            }
            FlowEvent::ProposalValidated(data) => {
                self.record_id = Some(data.record_id);
                self.state = FlowState::Signing;
            }
            FlowEvent::ValidationFailed(data) => {
                self.failure_reason = Some(data.reason);
                self.state = FlowState::Failed;
            }
            FlowEvent::SignaturesCollected(_) => {
                self.state = FlowState::Finalizing;
            }
            FlowEvent::SigningFailed(data) => {
                self.failure_reason = Some(data.reason);
                self.state = FlowState::Failed;
            }
            FlowEvent::Committed(data) => {
                self.transaction_id = Some(data.transaction_id);
                self.committed_at = Some(data.committed_at);
                self.state = FlowState::Done;
            }
            FlowEvent::NotaryRejected(data) => {
                self.failure_reason = Some(data.reason);
                self.state = FlowState::Failed;
            }
        }
    }
}

// Query methods
impl FlowInstance {
    /// Returns the flow id.
    pub fn id(&self) -> Option<FlowId> {
        self.id
    }

    /// Returns the requesting party.
    pub fn requester(&self) -> Option<&Party> {
        self.requester.as_ref()
    }

    /// Returns the issuance command.
    pub fn command(&self) -> Option<CommandKind> {
        self.command
    }

    /// Returns the requested face value.
    pub fn requested_value(&self) -> i64 {
        self.requested_value
    }

    /// Returns the flow state.
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Returns the net balance observed at the gate, if the gate ran.
    pub fn observed_balance(&self) -> Option<i64> {
        self.observed_balance
    }

    /// Returns the proposed record's id, if a proposal was built.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    /// Returns the commit id, if the flow committed.
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    /// Returns the commit time, if the flow committed.
    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        self.committed_at
    }

    /// Returns the rejection or failure reason, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::IssuanceRequest;

    fn start(instance: &mut FlowInstance) -> FlowId {
        let flow_id = FlowId::new();
        let requester = Party::new("B");
        let request = IssuanceRequest::item("house", 3);
        instance.apply(FlowEvent::flow_started(flow_id, &requester, &request));
        flow_id
    }

    #[test]
    fn default_instance_is_init() {
        let instance = FlowInstance::default();
        assert!(instance.id().is_none());
        assert_eq!(instance.state(), FlowState::Init);
        assert!(instance.observed_balance().is_none());
    }

    #[test]
    fn happy_path_reaches_done() {
        let mut instance = FlowInstance::default();
        let flow_id = start(&mut instance);
        assert_eq!(instance.state(), FlowState::VerifyingBalance);

        instance.apply(FlowEvent::balance_verified(5, 3));
        assert_eq!(instance.state(), FlowState::Building);
        assert_eq!(instance.observed_balance(), Some(5));

        let record_id = RecordId::new();
        instance.apply(FlowEvent::proposal_built(record_id));
        assert_eq!(instance.state(), FlowState::Validating);

        instance.apply(FlowEvent::proposal_validated(record_id));
        assert_eq!(instance.state(), FlowState::Signing);

        instance.apply(FlowEvent::signatures_collected(1));
        assert_eq!(instance.state(), FlowState::Finalizing);

        let tx_id = TransactionId::new();
        instance.apply(FlowEvent::committed(tx_id, Utc::now()));
        assert_eq!(instance.state(), FlowState::Done);
        assert_eq!(instance.id(), Some(flow_id));
        assert_eq!(instance.record_id(), Some(record_id));
        assert_eq!(instance.transaction_id(), Some(tx_id));
        assert!(instance.failure_reason().is_none());
    }

    #[test]
    fn balance_rejection_is_terminal() {
        let mut instance = FlowInstance::default();
        start(&mut instance);

        instance.apply(FlowEvent::balance_rejected(2, 3));
        assert_eq!(instance.state(), FlowState::Rejected);
        assert_eq!(instance.observed_balance(), Some(2));
        assert!(instance.failure_reason().unwrap().contains("insufficient"));
        assert!(instance.transaction_id().is_none());
    }

    #[test]
    fn validation_failure_records_the_reason() {
        let mut instance = FlowInstance::default();
        start(&mut instance);

        instance.apply(FlowEvent::balance_verified(5, 3));
        instance.apply(FlowEvent::validation_failed("record value must be positive"));
        assert_eq!(instance.state(), FlowState::Failed);
        assert_eq!(
            instance.failure_reason(),
            Some("record value must be positive")
        );
    }

    #[test]
    fn notary_rejection_fails_the_flow() {
        let mut instance = FlowInstance::default();
        start(&mut instance);

        instance.apply(FlowEvent::balance_verified(5, 3));
        let record_id = RecordId::new();
        instance.apply(FlowEvent::proposal_built(record_id));
        instance.apply(FlowEvent::proposal_validated(record_id));
        instance.apply(FlowEvent::signatures_collected(1));
        instance.apply(FlowEvent::notary_rejected("conflicting commit"));

        assert_eq!(instance.state(), FlowState::Failed);
        assert_eq!(instance.failure_reason(), Some("conflicting commit"));
        assert!(instance.transaction_id().is_none());
    }
}
