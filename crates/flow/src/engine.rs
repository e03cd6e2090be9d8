//! Issuance engine.
//!
//! Drives an issuance request through the full commit protocol: balance
//! gate, proposal construction, validation, signature collection, notary
//! finality, and distribution. Every transition is journaled before the
//! engine acts on it.

use std::collections::HashMap;
use std::sync::Arc;

use common::{FlowId, Party, PartyKey, RecordId, TransactionId};
use index::{IndexSnapshot, QueryOracle};
use ledger::{
    CommandKind, CommittedTransaction, ItemRecord, LedgerRecord, LoanRecord, Notary, RecordStore,
    Signature, SignedTransaction, TransactionProposal,
};
use tokio::sync::Mutex;

use crate::balance::BalanceEvaluator;
use crate::error::{FlowError, Result};
use crate::events::FlowEvent;
use crate::instance::FlowInstance;
use crate::journal::FlowJournal;
use crate::request::IssuanceRequest;
use crate::session::CounterpartyNetwork;

/// The outcome of a committed issuance flow.
#[derive(Debug, Clone, Copy)]
pub struct IssuanceReceipt {
    /// The flow that produced the commit.
    pub flow_id: FlowId,
    /// The issued record's id.
    pub record_id: RecordId,
    /// The commit id stamped by the notary.
    pub transaction_id: TransactionId,
}

/// A committed debit the index has not ingested yet.
#[derive(Debug, Clone, Copy)]
struct OutstandingDebit {
    transaction_id: TransactionId,
    amount: i64,
}

/// Drives balance-gated issuance flows to finality.
///
/// All collaborators are injected. The engine holds a per-party token from
/// the balance check through finality, so two flows for the same requester
/// cannot both pass the gate against the same balance. Committed debits are
/// tracked until the index has ingested them and are subtracted at the gate,
/// closing the window in which the index lags the ledger.
pub struct IssuanceEngine<O, N, C, S, J>
where
    O: QueryOracle,
    N: Notary,
    C: CounterpartyNetwork,
    S: RecordStore,
    J: FlowJournal,
{
    evaluator: BalanceEvaluator<O>,
    notary: N,
    network: C,
    stores: S,
    journal: J,
    tokens: Mutex<HashMap<PartyKey, Arc<Mutex<()>>>>,
    outstanding: Mutex<HashMap<PartyKey, Vec<OutstandingDebit>>>,
}

impl<O, N, C, S, J> IssuanceEngine<O, N, C, S, J>
where
    O: QueryOracle,
    N: Notary,
    C: CounterpartyNetwork,
    S: RecordStore,
    J: FlowJournal,
{
    /// Creates a new engine over the given collaborators.
    pub fn new(oracle: O, notary: N, network: C, stores: S, journal: J) -> Self {
        Self {
            evaluator: BalanceEvaluator::new(oracle),
            notary,
            network,
            stores,
            journal,
            tokens: Mutex::new(HashMap::new()),
            outstanding: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the balance evaluator backing the gate.
    pub fn evaluator(&self) -> &BalanceEvaluator<O> {
        &self.evaluator
    }

    /// Runs an issuance flow for `requester` under a fresh flow id.
    pub async fn issue(&self, requester: Party, request: IssuanceRequest) -> Result<IssuanceReceipt> {
        self.run(FlowId::new(), requester, request).await
    }

    /// Runs an issuance flow under an explicit flow id.
    ///
    /// Dropping the returned future before signature collection leaves no
    /// ledger side effects; once the notary has accepted, the commit stands.
    #[tracing::instrument(skip(self, request), fields(requester = %requester, command = %request.command))]
    pub async fn run(
        &self,
        flow_id: FlowId,
        requester: Party,
        request: IssuanceRequest,
    ) -> Result<IssuanceReceipt> {
        metrics::counter!("issuance_flows_total").increment(1);
        let flow_start = std::time::Instant::now();

        self.journal
            .append(flow_id, &FlowEvent::flow_started(flow_id, &requester, &request))
            .await?;

        // Held through finality: one gate-to-commit window per party.
        let requester_key = requester.key();
        let token = self.party_token(requester_key).await;
        let guard = token.lock().await;
        let result = self.run_gated(flow_id, requester, request, flow_start).await;
        drop(guard);
        self.release_token(requester_key, token).await;
        result
    }

    /// The gate-to-finality section of a flow, run under the party token.
    async fn run_gated(
        &self,
        flow_id: FlowId,
        requester: Party,
        request: IssuanceRequest,
        flow_start: std::time::Instant,
    ) -> Result<IssuanceReceipt> {
        // Balance gate. All three sums come from one pinned snapshot, and
        // committed-but-not-ingested debits are subtracted from it.
        let snapshot = self.evaluator.oracle().snapshot(None).await?;
        let observed = BalanceEvaluator::<O>::evaluate_on(&snapshot, requester.key());
        let pending = self.pending_debits(requester.key(), &snapshot).await;
        let available = observed - pending;
        let required = request.balance_cost();

        if available < required {
            self.journal
                .append(flow_id, &FlowEvent::balance_rejected(available, required))
                .await?;
            metrics::counter!("issuance_flows_rejected").increment(1);
            tracing::info!(%flow_id, available, required, "issuance rejected at the balance gate");
            return Err(FlowError::InsufficientBalance {
                available,
                requested: required,
            });
        }
        self.journal
            .append(flow_id, &FlowEvent::balance_verified(available, required))
            .await?;

        // Build the output record and proposal.
        let record = match self.build_record(&requester, &request) {
            Ok(record) => record,
            Err(reason) => {
                self.journal
                    .append(flow_id, &FlowEvent::validation_failed(&reason))
                    .await?;
                metrics::counter!("issuance_flows_failed").increment(1);
                return Err(FlowError::ContractViolation(reason));
            }
        };
        let record_id = record.id();
        let participants: Vec<PartyKey> = record.participants().iter().map(|p| p.key()).collect();
        let proposal = TransactionProposal::builder()
            .output(record)
            .command(request.command)
            .signers_from_participants(&proposal_participants(&requester, &request))
            .notary(self.notary.id())
            .build();
        self.journal
            .append(flow_id, &FlowEvent::proposal_built(record_id))
            .await?;

        // Validate.
        if let Err(violation) = proposal.validate() {
            self.journal
                .append(flow_id, &FlowEvent::validation_failed(violation.to_string()))
                .await?;
            metrics::counter!("issuance_flows_failed").increment(1);
            tracing::info!(%flow_id, %violation, "proposal validation failed");
            return Err(violation.into());
        }
        self.journal
            .append(flow_id, &FlowEvent::proposal_validated(record_id))
            .await?;

        // Collect signatures: the requester signs, then each counterparty
        // session runs as a suspension point.
        let mut signed = SignedTransaction::new(proposal.clone());
        signed.add_signature(Signature::new(requester.key(), record_id));

        if let LedgerRecord::Loan(loan) = &proposal.record {
            match self.network.request_signature(&loan.borrower, &proposal).await {
                Ok(signature) => {
                    if signature.signer != loan.borrower.key() || !signature.covers(&proposal) {
                        let reason = format!(
                            "signature from {} does not verify over record {}",
                            loan.borrower, record_id
                        );
                        self.journal
                            .append(flow_id, &FlowEvent::signing_failed(&reason))
                            .await?;
                        metrics::counter!("issuance_flows_failed").increment(1);
                        return Err(FlowError::CounterpartyRejection(reason));
                    }
                    signed.add_signature(signature);
                }
                Err(e) => {
                    self.journal
                        .append(flow_id, &FlowEvent::signing_failed(e.to_string()))
                        .await?;
                    metrics::counter!("issuance_flows_failed").increment(1);
                    tracing::info!(%flow_id, error = %e, "counterparty session failed");
                    return Err(FlowError::CounterpartyRejection(e.to_string()));
                }
            }
        }
        self.journal
            .append(flow_id, &FlowEvent::signatures_collected(signed.signatures.len()))
            .await?;

        // Finality. The notary accepts at most once per record; from here
        // the commit either fully lands or the flow fails.
        let commitment = match self.notary.submit(signed.clone()).await {
            Ok(commitment) => commitment,
            Err(e) => {
                self.journal
                    .append(flow_id, &FlowEvent::notary_rejected(e.to_string()))
                    .await?;
                metrics::counter!("issuance_flows_failed").increment(1);
                tracing::warn!(%flow_id, error = %e, "notary refused finality");
                return Err(e.into());
            }
        };

        let committed = CommittedTransaction {
            id: commitment.transaction_id,
            committed_at: commitment.committed_at,
            transaction: signed,
        };

        // The index has not seen this commit yet; keep its debit visible to
        // the gate until ingestion catches up.
        if let Some((debtor, amount)) = debit_of(committed.record()) {
            let mut outstanding = self.outstanding.lock().await;
            outstanding.entry(debtor).or_default().push(OutstandingDebit {
                transaction_id: committed.id,
                amount,
            });
        }

        // Distribute to every participant's store.
        for participant in participants {
            self.stores.record(participant, &committed).await?;
        }

        self.journal
            .append(
                flow_id,
                &FlowEvent::committed(committed.id, committed.committed_at),
            )
            .await?;

        let duration = flow_start.elapsed().as_secs_f64();
        metrics::histogram!("issuance_flow_duration_seconds").record(duration);
        metrics::counter!("issuance_flows_committed").increment(1);
        tracing::info!(%flow_id, %record_id, transaction_id = %committed.id, "issuance committed");

        Ok(IssuanceReceipt {
            flow_id,
            record_id,
            transaction_id: committed.id,
        })
    }

    /// Loads a flow instance by replaying its journal.
    pub async fn flow(&self, flow_id: FlowId) -> Result<Option<FlowInstance>> {
        let events = self.journal.events(flow_id).await?;
        if events.is_empty() {
            return Ok(None);
        }
        let mut instance = FlowInstance::default();
        for event in events {
            instance.apply(event);
        }
        Ok(Some(instance))
    }

    /// Builds the output record for a request.
    fn build_record(
        &self,
        requester: &Party,
        request: &IssuanceRequest,
    ) -> std::result::Result<LedgerRecord, String> {
        match request.command {
            CommandKind::IssueLoan => {
                let counterparty = request
                    .counterparty
                    .clone()
                    .ok_or("loan issuance requires a counterparty")?;
                Ok(LedgerRecord::Loan(LoanRecord::new(
                    requester.clone(),
                    counterparty,
                    request.requested_value,
                )))
            }
            CommandKind::IssueItem => {
                let name = request
                    .item_name
                    .clone()
                    .ok_or("item issuance requires a name")?;
                Ok(LedgerRecord::Item(ItemRecord::new(
                    requester.clone(),
                    name,
                    request.requested_value,
                )))
            }
        }
    }

    /// Returns the requester's issuance token, creating it on first use.
    async fn party_token(&self, party: PartyKey) -> Arc<Mutex<()>> {
        let mut tokens = self.tokens.lock().await;
        tokens
            .entry(party)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Returns a token after a flow and drops the map entry once no other
    /// flow holds a clone, so the map does not grow with every party seen.
    ///
    /// Tokens are only cloned out under the map lock, so a count of one on
    /// the map's own copy means no concurrent flow can still be waiting.
    async fn release_token(&self, party: PartyKey, token: Arc<Mutex<()>>) {
        let mut tokens = self.tokens.lock().await;
        drop(token);
        if let Some(entry) = tokens.get(&party)
            && Arc::strong_count(entry) == 1
        {
            tokens.remove(&party);
        }
    }

    /// Sums a party's committed debits the snapshot does not see yet,
    /// pruning the ones ingestion has caught up with.
    async fn pending_debits(&self, party: PartyKey, snapshot: &IndexSnapshot) -> i64 {
        let mut outstanding = self.outstanding.lock().await;
        let Some(debits) = outstanding.get_mut(&party) else {
            return 0;
        };
        debits.retain(|debit| !snapshot.contains_transaction(debit.transaction_id));
        let sum = debits.iter().map(|debit| debit.amount).sum();
        if debits.is_empty() {
            outstanding.remove(&party);
        }
        sum
    }
}

/// Returns the party whose balance a committed record reduces, if any.
///
/// Lending reduces the lender's balance by the amount; an issued item
/// reduces the owner's balance by its value.
fn debit_of(record: &LedgerRecord) -> Option<(PartyKey, i64)> {
    match record {
        LedgerRecord::Loan(loan) => Some((loan.lender.key(), loan.amount)),
        LedgerRecord::Item(item) => Some((item.owner.key(), item.value)),
    }
}

fn proposal_participants<'a>(
    requester: &'a Party,
    request: &'a IssuanceRequest,
) -> Vec<&'a Party> {
    let mut participants = vec![requester];
    if request.command == CommandKind::IssueLoan
        && let Some(counterparty) = &request.counterparty
    {
        participants.push(counterparty);
    }
    participants
}
