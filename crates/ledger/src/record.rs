use common::{Party, RecordId};
use serde::{Deserialize, Serialize};

/// The kind of fact a ledger record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// A loan from a lender to a borrower.
    Loan,
    /// An item owned by a party.
    Item,
}

impl RecordKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Loan => "Loan",
            RecordKind::Item => "Item",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A loan of `amount` from `lender` to `borrower`. Immutable once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: RecordId,
    pub lender: Party,
    pub borrower: Party,
    pub amount: i64,
}

impl LoanRecord {
    /// Creates a new loan record with a fresh id.
    ///
    /// The amount is not checked here; non-positive values are rejected
    /// when the containing proposal is validated.
    pub fn new(lender: Party, borrower: Party, amount: i64) -> Self {
        Self {
            id: RecordId::new(),
            lender,
            borrower,
            amount,
        }
    }
}

/// An item of `value` owned by `owner`. Immutable once committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: RecordId,
    pub owner: Party,
    pub name: String,
    pub value: i64,
}

impl ItemRecord {
    /// Creates a new item record with a fresh id.
    pub fn new(owner: Party, name: impl Into<String>, value: i64) -> Self {
        Self {
            id: RecordId::new(),
            owner,
            name: name.into(),
            value,
        }
    }
}

/// An immutable ledger fact: either a loan or an owned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum LedgerRecord {
    Loan(LoanRecord),
    Item(ItemRecord),
}

impl LedgerRecord {
    /// Returns the record's unique id.
    pub fn id(&self) -> RecordId {
        match self {
            LedgerRecord::Loan(loan) => loan.id,
            LedgerRecord::Item(item) => item.id,
        }
    }

    /// Returns the record kind.
    pub fn kind(&self) -> RecordKind {
        match self {
            LedgerRecord::Loan(_) => RecordKind::Loan,
            LedgerRecord::Item(_) => RecordKind::Item,
        }
    }

    /// Returns the parties that participate in this record.
    ///
    /// A loan involves both lender and borrower; an item only its owner.
    pub fn participants(&self) -> Vec<&Party> {
        match self {
            LedgerRecord::Loan(loan) => vec![&loan.lender, &loan.borrower],
            LedgerRecord::Item(item) => vec![&item.owner],
        }
    }

    /// Returns the record's face value (loan amount or item value).
    pub fn face_value(&self) -> i64 {
        match self {
            LedgerRecord::Loan(loan) => loan.amount,
            LedgerRecord::Item(item) => item.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loan_participants_are_lender_and_borrower() {
        let lender = Party::new("A");
        let borrower = Party::new("B");
        let record = LedgerRecord::Loan(LoanRecord::new(lender.clone(), borrower.clone(), 10));

        assert_eq!(record.kind(), RecordKind::Loan);
        assert_eq!(record.participants(), vec![&lender, &borrower]);
        assert_eq!(record.face_value(), 10);
    }

    #[test]
    fn item_participant_is_owner() {
        let owner = Party::new("B");
        let record = LedgerRecord::Item(ItemRecord::new(owner.clone(), "house", 3));

        assert_eq!(record.kind(), RecordKind::Item);
        assert_eq!(record.participants(), vec![&owner]);
        assert_eq!(record.face_value(), 3);
    }

    #[test]
    fn record_ids_are_unique() {
        let owner = Party::new("B");
        let a = ItemRecord::new(owner.clone(), "house", 3);
        let b = ItemRecord::new(owner, "house", 3);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn record_serialization_roundtrip() {
        let record = LedgerRecord::Item(ItemRecord::new(Party::new("B"), "house", 3));
        let json = serde_json::to_string(&record).unwrap();
        let deserialized: LedgerRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, deserialized);
    }
}
