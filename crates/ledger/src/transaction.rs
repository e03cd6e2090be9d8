//! Pending transaction construction, validation, and signing.
//!
//! A [`TransactionProposal`] is the ephemeral candidate built by an issuance
//! flow. It exists only inside the flow until the notary finalizes it into a
//! [`CommittedTransaction`].

use chrono::{DateTime, Utc};
use common::{NotaryId, Party, PartyKey, RecordId, TransactionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{LedgerRecord, RecordKind};

/// The command descriptor paired with a proposed output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Issue a new loan between two parties.
    IssueLoan,
    /// Issue a new owned item.
    IssueItem,
}

impl CommandKind {
    /// Returns the descriptor name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::IssueLoan => "issue_loan",
            CommandKind::IssueItem => "issue_item",
        }
    }

    /// Returns true if this command may produce the given record kind.
    pub fn matches(&self, kind: RecordKind) -> bool {
        matches!(
            (self, kind),
            (CommandKind::IssueLoan, RecordKind::Loan) | (CommandKind::IssueItem, RecordKind::Item)
        )
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structural or domain violation found while validating a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProposalViolation {
    /// The record's face value must be strictly positive.
    #[error("record value must be positive, got {0}")]
    NonPositiveValue(i64),

    /// The required signer set is empty.
    #[error("participant set is empty")]
    NoSigners,

    /// The command descriptor does not match the output record kind.
    #[error("command {command} does not produce {kind} records")]
    CommandMismatch {
        command: CommandKind,
        kind: RecordKind,
    },

    /// A proposal must reference exactly one notary.
    #[error("expected exactly one notary, got {0}")]
    NotaryCount(usize),

    /// A loan's lender and borrower must be distinct parties.
    #[error("loan lender and borrower must differ")]
    SelfLoan,
}

/// An in-flight candidate transaction: one proposed output record, a command
/// descriptor, the keys that must sign, and the notary it is addressed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionProposal {
    pub record: LedgerRecord,
    pub command: CommandKind,
    pub required_signers: Vec<PartyKey>,
    pub notaries: Vec<NotaryId>,
}

impl TransactionProposal {
    /// Creates a new proposal builder.
    pub fn builder() -> ProposalBuilder {
        ProposalBuilder::default()
    }

    /// Returns the single referenced notary, if the proposal has exactly one.
    pub fn notary(&self) -> Option<NotaryId> {
        match self.notaries.as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }

    /// Runs the structural and domain checks on this proposal.
    ///
    /// Checks, in order: positive face value, non-empty signer set, command
    /// matching the record kind, exactly one notary, and distinct loan
    /// parties.
    pub fn validate(&self) -> Result<(), ProposalViolation> {
        if self.record.face_value() <= 0 {
            return Err(ProposalViolation::NonPositiveValue(
                self.record.face_value(),
            ));
        }
        if self.required_signers.is_empty() {
            return Err(ProposalViolation::NoSigners);
        }
        if !self.command.matches(self.record.kind()) {
            return Err(ProposalViolation::CommandMismatch {
                command: self.command,
                kind: self.record.kind(),
            });
        }
        if self.notaries.len() != 1 {
            return Err(ProposalViolation::NotaryCount(self.notaries.len()));
        }
        if let LedgerRecord::Loan(loan) = &self.record
            && loan.lender == loan.borrower
        {
            return Err(ProposalViolation::SelfLoan);
        }
        Ok(())
    }
}

/// Builder for constructing transaction proposals.
#[derive(Debug, Default)]
pub struct ProposalBuilder {
    record: Option<LedgerRecord>,
    command: Option<CommandKind>,
    required_signers: Vec<PartyKey>,
    notaries: Vec<NotaryId>,
}

impl ProposalBuilder {
    /// Sets the proposed output record.
    pub fn output(mut self, record: LedgerRecord) -> Self {
        self.record = Some(record);
        self
    }

    /// Sets the command descriptor.
    pub fn command(mut self, command: CommandKind) -> Self {
        self.command = Some(command);
        self
    }

    /// Adds a required signer key.
    pub fn signer(mut self, key: PartyKey) -> Self {
        self.required_signers.push(key);
        self
    }

    /// Adds the keys of all the record's participants as required signers.
    pub fn signers_from_participants(mut self, participants: &[&Party]) -> Self {
        for party in participants {
            self.required_signers.push(party.key());
        }
        self
    }

    /// Adds a notary reference. Validation requires exactly one.
    pub fn notary(mut self, notary: NotaryId) -> Self {
        self.notaries.push(notary);
        self
    }

    /// Builds the proposal.
    ///
    /// # Panics
    ///
    /// Panics if the output record or command is not set.
    pub fn build(self) -> TransactionProposal {
        TransactionProposal {
            record: self.record.expect("output record is required"),
            command: self.command.expect("command is required"),
            required_signers: self.required_signers,
            notaries: self.notaries,
        }
    }
}

/// A signature over a proposal's output record by a party key.
///
/// There is no real cryptography here; a signature binds a signer key to a
/// record id and verification checks both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signer: PartyKey,
    pub record_id: RecordId,
}

impl Signature {
    /// Creates a signature by `signer` over the given record.
    pub fn new(signer: PartyKey, record_id: RecordId) -> Self {
        Self { signer, record_id }
    }

    /// Returns true if this signature covers the proposal's output record.
    pub fn covers(&self, proposal: &TransactionProposal) -> bool {
        self.record_id == proposal.record.id()
    }
}

/// A proposal plus the signatures collected so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub proposal: TransactionProposal,
    pub signatures: Vec<Signature>,
}

impl SignedTransaction {
    /// Wraps a proposal with no signatures yet.
    pub fn new(proposal: TransactionProposal) -> Self {
        Self {
            proposal,
            signatures: Vec::new(),
        }
    }

    /// Adds a signature.
    pub fn add_signature(&mut self, signature: Signature) {
        self.signatures.push(signature);
    }

    /// Returns true if every required signer has a covering signature.
    pub fn is_fully_signed(&self) -> bool {
        self.proposal.required_signers.iter().all(|key| {
            self.signatures
                .iter()
                .any(|sig| sig.signer == *key && sig.covers(&self.proposal))
        })
    }

    /// Returns the proposed output record.
    pub fn record(&self) -> &LedgerRecord {
        &self.proposal.record
    }
}

/// A transaction the notary has irrevocably accepted.
///
/// Carries the commit id and transaction-time stamped by the notary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedTransaction {
    pub id: TransactionId,
    pub committed_at: DateTime<Utc>,
    pub transaction: SignedTransaction,
}

impl CommittedTransaction {
    /// Returns the committed output record.
    pub fn record(&self) -> &LedgerRecord {
        self.transaction.record()
    }

    /// Returns the committed record's id.
    pub fn record_id(&self) -> RecordId {
        self.transaction.record().id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ItemRecord, LoanRecord};

    fn item_proposal(value: i64) -> TransactionProposal {
        let owner = Party::new("B");
        let record = LedgerRecord::Item(ItemRecord::new(owner.clone(), "house", value));
        TransactionProposal::builder()
            .output(record)
            .command(CommandKind::IssueItem)
            .signer(owner.key())
            .notary(NotaryId::new())
            .build()
    }

    fn loan_proposal(lender: Party, borrower: Party, amount: i64) -> TransactionProposal {
        let record = LedgerRecord::Loan(LoanRecord::new(lender.clone(), borrower.clone(), amount));
        TransactionProposal::builder()
            .output(record)
            .command(CommandKind::IssueLoan)
            .signer(lender.key())
            .signer(borrower.key())
            .notary(NotaryId::new())
            .build()
    }

    #[test]
    fn valid_item_proposal_passes() {
        assert!(item_proposal(3).validate().is_ok());
    }

    #[test]
    fn zero_value_is_rejected() {
        assert_eq!(
            item_proposal(0).validate(),
            Err(ProposalViolation::NonPositiveValue(0))
        );
    }

    #[test]
    fn negative_value_is_rejected() {
        assert_eq!(
            item_proposal(-5).validate(),
            Err(ProposalViolation::NonPositiveValue(-5))
        );
    }

    #[test]
    fn empty_signer_set_is_rejected() {
        let record = LedgerRecord::Item(ItemRecord::new(Party::new("B"), "house", 3));
        let proposal = TransactionProposal::builder()
            .output(record)
            .command(CommandKind::IssueItem)
            .notary(NotaryId::new())
            .build();
        assert_eq!(proposal.validate(), Err(ProposalViolation::NoSigners));
    }

    #[test]
    fn command_must_match_record_kind() {
        let owner = Party::new("B");
        let record = LedgerRecord::Item(ItemRecord::new(owner.clone(), "house", 3));
        let proposal = TransactionProposal::builder()
            .output(record)
            .command(CommandKind::IssueLoan)
            .signer(owner.key())
            .notary(NotaryId::new())
            .build();
        assert!(matches!(
            proposal.validate(),
            Err(ProposalViolation::CommandMismatch { .. })
        ));
    }

    #[test]
    fn exactly_one_notary_is_required() {
        let owner = Party::new("B");
        let record = LedgerRecord::Item(ItemRecord::new(owner.clone(), "house", 3));

        let none = TransactionProposal::builder()
            .output(record.clone())
            .command(CommandKind::IssueItem)
            .signer(owner.key())
            .build();
        assert_eq!(none.validate(), Err(ProposalViolation::NotaryCount(0)));

        let two = TransactionProposal::builder()
            .output(record)
            .command(CommandKind::IssueItem)
            .signer(owner.key())
            .notary(NotaryId::new())
            .notary(NotaryId::new())
            .build();
        assert_eq!(two.validate(), Err(ProposalViolation::NotaryCount(2)));
        assert!(two.notary().is_none());
    }

    #[test]
    fn self_loan_is_rejected() {
        let party = Party::new("A");
        let proposal = loan_proposal(party.clone(), party, 10);
        assert_eq!(proposal.validate(), Err(ProposalViolation::SelfLoan));
    }

    #[test]
    fn fully_signed_requires_every_signer() {
        let lender = Party::new("A");
        let borrower = Party::new("B");
        let proposal = loan_proposal(lender.clone(), borrower.clone(), 10);
        let record_id = proposal.record.id();

        let mut tx = SignedTransaction::new(proposal);
        assert!(!tx.is_fully_signed());

        tx.add_signature(Signature::new(lender.key(), record_id));
        assert!(!tx.is_fully_signed());

        tx.add_signature(Signature::new(borrower.key(), record_id));
        assert!(tx.is_fully_signed());
    }

    #[test]
    fn signature_over_wrong_record_does_not_count() {
        let owner = Party::new("B");
        let record = LedgerRecord::Item(ItemRecord::new(owner.clone(), "house", 3));
        let proposal = TransactionProposal::builder()
            .output(record)
            .command(CommandKind::IssueItem)
            .signer(owner.key())
            .notary(NotaryId::new())
            .build();
        let mut tx = SignedTransaction::new(proposal);

        // Right signer, but over some other record id.
        tx.add_signature(Signature::new(owner.key(), RecordId::new()));
        assert!(!tx.is_fully_signed());
    }

    #[test]
    fn proposal_serialization_roundtrip() {
        let proposal = item_proposal(3);
        let json = serde_json::to_string(&proposal).unwrap();
        let deserialized: TransactionProposal = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.record, proposal.record);
        assert_eq!(deserialized.command, proposal.command);
    }
}
