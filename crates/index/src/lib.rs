//! The Aggregate Index: a bitemporal query oracle over committed records.
//!
//! Facts carry two independent time axes: transaction-time (when the fact
//! was ingested into the index) and valid-time (the "as of" instant a query
//! targets). Ingestion happens asynchronously relative to notary finality,
//! so there is a visibility window during which a just-committed record is
//! durable in the ledger but not yet queryable here. That gap is part of the
//! contract, not a bug; callers that need read-your-writes must run the
//! [`IngestionPipeline`] catch-up first.
//!
//! All queries are evaluated against a pinned [`IndexSnapshot`], so a set of
//! sub-queries issued against one snapshot observes one consistent state.

pub mod error;
pub mod fact;
pub mod ingest;
pub mod oracle;
pub mod query;
pub mod snapshot;

pub use error::{IndexError, Result};
pub use fact::IndexedFact;
pub use ingest::IngestionPipeline;
pub use oracle::{AggregateIndex, QueryOracle};
pub use query::{Aggregation, Comparison, FieldValue, Predicate, RecordField, RecordQuery};
pub use snapshot::IndexSnapshot;
