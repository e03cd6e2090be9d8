//! Flow journal persistence.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::FlowId;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::events::FlowEvent;

/// Append-only persistence for flow events.
///
/// The engine appends an event at every transition before acting on it, so a
/// flow's progress survives its instance and can be replayed at any time.
#[async_trait]
pub trait FlowJournal: Send + Sync {
    /// Appends an event to a flow's history.
    async fn append(&self, flow_id: FlowId, event: &FlowEvent) -> Result<()>;

    /// Returns a flow's full history in append order.
    async fn events(&self, flow_id: FlowId) -> Result<Vec<FlowEvent>>;
}

/// In-memory flow journal.
///
/// Events are stored serialized, so appends catch non-serializable payloads
/// the same way a durable journal would.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFlowJournal {
    entries: Arc<RwLock<HashMap<FlowId, Vec<serde_json::Value>>>>,
}

impl InMemoryFlowJournal {
    /// Creates a new empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of events journaled for a flow.
    pub async fn event_count(&self, flow_id: FlowId) -> usize {
        self.entries
            .read()
            .await
            .get(&flow_id)
            .map(|events| events.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl FlowJournal for InMemoryFlowJournal {
    async fn append(&self, flow_id: FlowId, event: &FlowEvent) -> Result<()> {
        let payload = serde_json::to_value(event)?;
        let mut entries = self.entries.write().await;
        entries.entry(flow_id).or_default().push(payload);
        Ok(())
    }

    async fn events(&self, flow_id: FlowId) -> Result<Vec<FlowEvent>> {
        let entries = self.entries.read().await;
        let Some(payloads) = entries.get(&flow_id) else {
            return Ok(Vec::new());
        };
        payloads
            .iter()
            .map(|payload| Ok(serde_json::from_value(payload.clone())?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::RecordId;

    #[tokio::test]
    async fn append_and_replay_in_order() {
        let journal = InMemoryFlowJournal::new();
        let flow_id = FlowId::new();
        let record_id = RecordId::new();

        journal
            .append(flow_id, &FlowEvent::balance_verified(5, 3))
            .await
            .unwrap();
        journal
            .append(flow_id, &FlowEvent::proposal_built(record_id))
            .await
            .unwrap();

        let events = journal.events(flow_id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "BalanceVerified");
        assert_eq!(events[1].event_type(), "ProposalBuilt");
    }

    #[tokio::test]
    async fn unknown_flow_has_no_events() {
        let journal = InMemoryFlowJournal::new();
        let events = journal.events(FlowId::new()).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn flows_are_isolated() {
        let journal = InMemoryFlowJournal::new();
        let first = FlowId::new();
        let second = FlowId::new();

        journal
            .append(first, &FlowEvent::balance_verified(5, 3))
            .await
            .unwrap();
        journal
            .append(second, &FlowEvent::balance_rejected(0, 3))
            .await
            .unwrap();

        assert_eq!(journal.event_count(first).await, 1);
        assert_eq!(journal.event_count(second).await, 1);
        let events = journal.events(second).await.unwrap();
        assert_eq!(events[0].event_type(), "BalanceRejected");
    }
}
