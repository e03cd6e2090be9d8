//! Issuance requests.

use common::Party;
use ledger::CommandKind;
use serde::{Deserialize, Serialize};

/// A request to issue a new record onto the ledger.
///
/// Loans are the credit primitive: issuing one requires no prior balance, it
/// is what creates balance for the borrower. Items spend balance, so their
/// full face value must be covered at the balance gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceRequest {
    /// The issuance command.
    pub command: CommandKind,
    /// The face value of the requested record.
    pub requested_value: i64,
    /// The item name, for item issuance.
    pub item_name: Option<String>,
    /// The counterparty, for two-party constructs.
    pub counterparty: Option<Party>,
}

impl IssuanceRequest {
    /// Creates a request to lend `amount` to `counterparty`.
    pub fn loan(amount: i64, counterparty: Party) -> Self {
        Self {
            command: CommandKind::IssueLoan,
            requested_value: amount,
            item_name: None,
            counterparty: Some(counterparty),
        }
    }

    /// Creates a request to issue an owned item.
    pub fn item(name: impl Into<String>, value: i64) -> Self {
        Self {
            command: CommandKind::IssueItem,
            requested_value: value,
            item_name: Some(name.into()),
            counterparty: None,
        }
    }

    /// Returns the balance this request must be covered by at the gate.
    pub fn balance_cost(&self) -> i64 {
        match self.command {
            CommandKind::IssueLoan => 0,
            CommandKind::IssueItem => self.requested_value,
        }
    }
}
