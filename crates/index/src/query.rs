//! Typed query construction for the aggregate index.
//!
//! Queries are structured values, never assembled text: a record-kind
//! filter, a list of field predicates, the fields to select, and an
//! optional sum aggregation, all evaluated against a snapshot handle.

use common::PartyKey;
use ledger::{LedgerRecord, RecordKind};
use serde::{Deserialize, Serialize};

/// A queryable field of a ledger record.
///
/// `Lender`, `Borrower`, and `Amount` exist on loans; `Owner`, `Name`, and
/// `Value` on items. A predicate over a field a record does not carry never
/// matches that record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordField {
    Lender,
    Borrower,
    Amount,
    Owner,
    Name,
    Value,
}

/// A bound value a predicate compares a field against, or a selected cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Party(PartyKey),
    Int(i64),
    Text(String),
}

impl FieldValue {
    /// Returns the party key, if this cell holds one.
    pub fn as_party(&self) -> Option<PartyKey> {
        match self {
            FieldValue::Party(key) => Some(*key),
            _ => None,
        }
    }

    /// Returns the integer, if this cell holds one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text, if this cell holds some.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<PartyKey> for FieldValue {
    fn from(key: PartyKey) -> Self {
        FieldValue::Party(key)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Comparison operator in a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Eq,
}

/// A single field predicate: `field <cmp> value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: RecordField,
    pub cmp: Comparison,
    pub value: FieldValue,
}

impl Predicate {
    /// Returns true if the record carries the field and the comparison holds.
    pub fn matches(&self, record: &LedgerRecord) -> bool {
        match extract(record, self.field) {
            Some(actual) => match self.cmp {
                Comparison::Eq => actual == self.value,
            },
            None => false,
        }
    }
}

/// A sum aggregation over a bound field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    Sum(RecordField),
}

/// A structured query over indexed records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordQuery {
    /// Restrict to one record kind.
    pub kind: Option<RecordKind>,

    /// Predicates a record must satisfy (all of them).
    pub predicates: Vec<Predicate>,

    /// Fields returned per matching record, in order.
    pub select: Vec<RecordField>,

    /// Optional aggregation over the matching records.
    pub aggregate: Option<Aggregation>,
}

impl RecordQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query over loan records.
    pub fn loans() -> Self {
        Self {
            kind: Some(RecordKind::Loan),
            ..Default::default()
        }
    }

    /// Creates a query over item records.
    pub fn items() -> Self {
        Self {
            kind: Some(RecordKind::Item),
            ..Default::default()
        }
    }

    /// Adds an equality predicate on a field.
    pub fn filter(mut self, field: RecordField, value: impl Into<FieldValue>) -> Self {
        self.predicates.push(Predicate {
            field,
            cmp: Comparison::Eq,
            value: value.into(),
        });
        self
    }

    /// Adds a field to the selected output row.
    pub fn select(mut self, field: RecordField) -> Self {
        self.select.push(field);
        self
    }

    /// Sets the query to sum the given field over matching records.
    pub fn sum(mut self, field: RecordField) -> Self {
        self.aggregate = Some(Aggregation::Sum(field));
        self
    }

    /// Returns true if the record matches the kind filter and all predicates.
    pub fn matches(&self, record: &LedgerRecord) -> bool {
        if let Some(kind) = self.kind
            && record.kind() != kind
        {
            return false;
        }
        self.predicates.iter().all(|p| p.matches(record))
    }
}

/// Extracts a field value from a record, if the record carries that field.
pub(crate) fn extract(record: &LedgerRecord, field: RecordField) -> Option<FieldValue> {
    match (record, field) {
        (LedgerRecord::Loan(loan), RecordField::Lender) => {
            Some(FieldValue::Party(loan.lender.key()))
        }
        (LedgerRecord::Loan(loan), RecordField::Borrower) => {
            Some(FieldValue::Party(loan.borrower.key()))
        }
        (LedgerRecord::Loan(loan), RecordField::Amount) => Some(FieldValue::Int(loan.amount)),
        (LedgerRecord::Item(item), RecordField::Owner) => Some(FieldValue::Party(item.owner.key())),
        (LedgerRecord::Item(item), RecordField::Name) => {
            Some(FieldValue::Text(item.name.clone()))
        }
        (LedgerRecord::Item(item), RecordField::Value) => Some(FieldValue::Int(item.value)),
        _ => None,
    }
}
