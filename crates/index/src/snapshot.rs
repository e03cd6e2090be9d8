//! Pinned point-in-time views of the index.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::TransactionId;

use crate::fact::IndexedFact;
use crate::query::{self, Aggregation, FieldValue, RecordQuery};

/// An immutable point-in-time view of the aggregate index.
///
/// A snapshot pins both time axes: it contains exactly the facts that were
/// ingested when it was taken and that are valid at its `as_of` instant.
/// Every query evaluated against the same snapshot observes the same state,
/// which is what lets a balance evaluation run several sub-queries without
/// read skew.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    facts: Arc<Vec<IndexedFact>>,
    as_of: DateTime<Utc>,
}

impl IndexSnapshot {
    /// Creates a snapshot over the given facts, valid as of `as_of`.
    ///
    /// Facts with a later valid-time are filtered out here, so the snapshot
    /// holds only what is visible at its instant.
    pub(crate) fn new(facts: Vec<IndexedFact>, as_of: DateTime<Utc>) -> Self {
        let visible = facts.into_iter().filter(|f| f.valid_at(as_of)).collect();
        Self {
            facts: Arc::new(visible),
            as_of,
        }
    }

    /// Returns the valid-time instant this snapshot targets.
    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    /// Returns the number of facts visible in this snapshot.
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Returns true if the given commit is visible in this snapshot.
    pub fn contains_transaction(&self, id: TransactionId) -> bool {
        self.facts.iter().any(|f| f.transaction_id == id)
    }

    /// Evaluates a query and returns one row of selected fields per match.
    ///
    /// A matching record that lacks one of the selected fields produces no
    /// row. The result is a set of tuples; no matches means an empty vec.
    pub fn rows(&self, query: &RecordQuery) -> Vec<Vec<FieldValue>> {
        self.facts
            .iter()
            .filter(|f| query.matches(&f.record))
            .filter_map(|f| {
                query
                    .select
                    .iter()
                    .map(|field| query::extract(&f.record, *field))
                    .collect::<Option<Vec<_>>>()
            })
            .collect()
    }

    /// Evaluates a sum aggregation over the matching records.
    ///
    /// Zero matching rows yield `0`, never an absent result. Fields that are
    /// not integers on a matching record contribute nothing.
    pub fn sum(&self, query: &RecordQuery) -> i64 {
        debug_assert!(query.aggregate.is_some(), "sum requires an aggregation");
        let Some(Aggregation::Sum(field)) = query.aggregate else {
            return 0;
        };

        self.facts
            .iter()
            .filter(|f| query.matches(&f.record))
            .filter_map(|f| match query::extract(&f.record, field) {
                Some(FieldValue::Int(v)) => Some(v),
                _ => None,
            })
            .sum()
    }
}
