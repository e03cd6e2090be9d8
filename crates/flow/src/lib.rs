//! Balance-gated issuance flows.
//!
//! The [`engine::IssuanceEngine`] drives a request through the commit
//! protocol: the balance gate over the aggregate index, proposal
//! construction and validation, signature collection over counterparty
//! sessions, notary finality, and distribution to participant stores.
//! Every transition is journaled, so flows are event-sourced and can be
//! replayed into a [`instance::FlowInstance`] at any time.

pub mod balance;
pub mod engine;
pub mod error;
pub mod events;
pub mod instance;
pub mod journal;
pub mod request;
pub mod session;
pub mod state;

pub use balance::BalanceEvaluator;
pub use engine::{IssuanceEngine, IssuanceReceipt};
pub use error::{FlowError, Result};
pub use events::FlowEvent;
pub use instance::FlowInstance;
pub use journal::{FlowJournal, InMemoryFlowJournal};
pub use request::IssuanceRequest;
pub use session::{CounterpartyNetwork, InMemoryCounterpartyNetwork, SessionError};
pub use state::FlowState;

pub use common::{FlowId, NotaryId, Party, PartyKey, RecordId, TransactionId};
