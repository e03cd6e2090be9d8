//! Counterparty signing sessions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Party, PartyKey};
use ledger::{Signature, TransactionProposal};
use thiserror::Error;

/// Errors a counterparty session can return.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The counterparty reviewed the proposal and declined to sign.
    #[error("counterparty declined: {0}")]
    Declined(String),

    /// The counterparty could not be reached.
    #[error("counterparty unreachable: {0}")]
    Unreachable(String),
}

/// The interactive sub-protocol that collects a counterparty's signature.
///
/// Requesting a signature is a suspension point: the flow waits for the
/// counterparty's answer and nothing has been committed yet, so dropping
/// the flow here leaves no ledger side effects.
#[async_trait]
pub trait CounterpartyNetwork: Send + Sync {
    /// Asks `counterparty` to review and sign the proposal.
    async fn request_signature(
        &self,
        counterparty: &Party,
        proposal: &TransactionProposal,
    ) -> Result<Signature, SessionError>;
}

#[derive(Debug, Default)]
struct InMemoryNetworkState {
    decline: bool,
    forge_signature: bool,
    requests: HashMap<PartyKey, u32>,
}

/// In-memory counterparty network for testing.
///
/// Every counterparty signs whatever it is shown unless configured to
/// decline or to return a signature under a key it does not hold.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCounterpartyNetwork {
    state: Arc<RwLock<InMemoryNetworkState>>,
}

impl InMemoryCounterpartyNetwork {
    /// Creates a new in-memory counterparty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every counterparty to decline signing.
    pub fn set_decline(&self, decline: bool) {
        self.state.write().unwrap().decline = decline;
    }

    /// Configures counterparties to sign under a key they do not hold.
    pub fn set_forge_signature(&self, forge: bool) {
        self.state.write().unwrap().forge_signature = forge;
    }

    /// Returns the number of signature requests a party has received.
    pub fn request_count(&self, counterparty: PartyKey) -> u32 {
        self.state
            .read()
            .unwrap()
            .requests
            .get(&counterparty)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl CounterpartyNetwork for InMemoryCounterpartyNetwork {
    async fn request_signature(
        &self,
        counterparty: &Party,
        proposal: &TransactionProposal,
    ) -> Result<Signature, SessionError> {
        let mut state = self.state.write().unwrap();
        *state.requests.entry(counterparty.key()).or_default() += 1;

        if state.decline {
            return Err(SessionError::Declined(format!(
                "{} rejected the proposal",
                counterparty
            )));
        }

        let signer = if state.forge_signature {
            PartyKey::new()
        } else {
            counterparty.key()
        };
        Ok(Signature::new(signer, proposal.record.id()))
    }
}
