//! Net balance evaluation over the aggregate index.

use chrono::{DateTime, Utc};
use common::PartyKey;
use index::{IndexSnapshot, QueryOracle, RecordField, RecordQuery};

use crate::error::Result;

/// Computes a party's net balance from the aggregate index.
///
/// Net balance is `borrowed - lent - owned`: the sum of loan amounts where
/// the party is the borrower, minus the sum where it is the lender, minus
/// the total value of items it owns. All three sums are taken from one
/// pinned snapshot, so a concurrent ingestion is either fully visible in
/// the result or not at all.
pub struct BalanceEvaluator<O: QueryOracle> {
    oracle: O,
}

impl<O: QueryOracle> BalanceEvaluator<O> {
    /// Creates an evaluator backed by the given oracle.
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }

    /// Returns the underlying oracle.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Evaluates a party's net balance as of the given valid-time instant.
    ///
    /// `None` evaluates at the present. The result reflects only commits the
    /// index has ingested; a commit that has not been ingested yet does not
    /// move the balance.
    #[tracing::instrument(skip(self))]
    pub async fn evaluate(&self, party: PartyKey, as_of: Option<DateTime<Utc>>) -> Result<i64> {
        let snapshot = self.oracle.snapshot(as_of).await?;
        let balance = Self::evaluate_on(&snapshot, party);
        tracing::debug!(%party, balance, as_of = %snapshot.as_of(), "evaluated net balance");
        Ok(balance)
    }

    /// Evaluates a party's net balance on an already-pinned snapshot.
    pub fn evaluate_on(snapshot: &IndexSnapshot, party: PartyKey) -> i64 {
        let borrowed = snapshot.sum(
            &RecordQuery::loans()
                .filter(RecordField::Borrower, party)
                .sum(RecordField::Amount),
        );
        let lent = snapshot.sum(
            &RecordQuery::loans()
                .filter(RecordField::Lender, party)
                .sum(RecordField::Amount),
        );
        let owned = snapshot.sum(
            &RecordQuery::items()
                .filter(RecordField::Owner, party)
                .sum(RecordField::Value),
        );
        borrowed - lent - owned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::{NotaryId, Party, TransactionId};
    use index::AggregateIndex;
    use ledger::{
        CommandKind, CommittedTransaction, ItemRecord, LedgerRecord, LoanRecord, Signature,
        SignedTransaction, TransactionProposal,
    };

    fn commit(record: LedgerRecord, command: CommandKind) -> CommittedTransaction {
        let record_id = record.id();
        let signers: Vec<PartyKey> = record.participants().iter().map(|p| p.key()).collect();
        let mut builder = TransactionProposal::builder()
            .output(record)
            .command(command)
            .notary(NotaryId::new());
        for key in &signers {
            builder = builder.signer(*key);
        }
        let mut tx = SignedTransaction::new(builder.build());
        for key in signers {
            tx.add_signature(Signature::new(key, record_id));
        }
        CommittedTransaction {
            id: TransactionId::new(),
            committed_at: Utc::now(),
            transaction: tx,
        }
    }

    async fn seeded_index(a: &Party, b: &Party) -> AggregateIndex {
        let index = AggregateIndex::new();
        let loan = LedgerRecord::Loan(LoanRecord::new(a.clone(), b.clone(), 10));
        index.ingest(&commit(loan, CommandKind::IssueLoan)).await;
        let item = LedgerRecord::Item(ItemRecord::new(b.clone(), "house", 3));
        index.ingest(&commit(item, CommandKind::IssueItem)).await;
        index
    }

    #[tokio::test]
    async fn empty_index_balance_is_zero() {
        let evaluator = BalanceEvaluator::new(AggregateIndex::new());
        let balance = evaluator.evaluate(PartyKey::new(), None).await.unwrap();
        assert_eq!(balance, 0);
    }

    #[tokio::test]
    async fn borrowed_minus_lent_minus_owned() {
        let a = Party::new("A");
        let b = Party::new("B");
        let index = seeded_index(&a, &b).await;
        let evaluator = BalanceEvaluator::new(index);

        // B borrowed 10 and owns an item worth 3.
        assert_eq!(evaluator.evaluate(b.key(), None).await.unwrap(), 7);
        // A lent 10 and owns nothing.
        assert_eq!(evaluator.evaluate(a.key(), None).await.unwrap(), -10);
    }

    #[tokio::test]
    async fn past_instant_sees_an_empty_ledger() {
        let a = Party::new("A");
        let b = Party::new("B");
        let index = seeded_index(&a, &b).await;
        let evaluator = BalanceEvaluator::new(index);

        let before = Utc::now() - Duration::days(3);
        assert_eq!(evaluator.evaluate(b.key(), Some(before)).await.unwrap(), 0);

        let after = Utc::now() + Duration::days(3);
        assert_eq!(evaluator.evaluate(b.key(), Some(after)).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn pinned_snapshot_ignores_later_ingestion() {
        let a = Party::new("A");
        let b = Party::new("B");
        let index = seeded_index(&a, &b).await;

        let snapshot = index.snapshot(None).await.unwrap();
        let before = BalanceEvaluator::<AggregateIndex>::evaluate_on(&snapshot, b.key());

        let extra = LedgerRecord::Loan(LoanRecord::new(a.clone(), b.clone(), 100));
        index.ingest(&commit(extra, CommandKind::IssueLoan)).await;

        // The pinned snapshot does not move.
        let after = BalanceEvaluator::<AggregateIndex>::evaluate_on(&snapshot, b.key());
        assert_eq!(before, after);

        let evaluator = BalanceEvaluator::new(index);
        assert_eq!(evaluator.evaluate(b.key(), None).await.unwrap(), 107);
    }
}
