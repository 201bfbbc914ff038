use std::sync::Arc;

use tracing::{debug, info};

use clearline_cluster::ClusterManager;
use clearline_engine::{EngineError, LedgerEngine};
use clearline_types::{AccountId, CorrelationKey, Transfer, TransferId};

use crate::error::LedgerClientError;

/// Request to move value between two accounts.
#[derive(Clone, Debug)]
pub struct TransferSpec {
    pub debit_account_id: AccountId,
    pub credit_account_id: AccountId,
    pub amount: u128,
    pub ledger: u32,
    pub code: u16,
    pub correlation: Option<CorrelationKey>,
}

impl TransferSpec {
    pub fn new(
        debit_account_id: AccountId,
        credit_account_id: AccountId,
        amount: u128,
        ledger: u32,
        code: u16,
    ) -> Self {
        Self {
            debit_account_id,
            credit_account_id,
            amount,
            ledger,
            code,
            correlation: None,
        }
    }

    pub fn with_correlation(mut self, key: CorrelationKey) -> Self {
        self.correlation = Some(key);
        self
    }

    fn validate(&self) -> Result<(), LedgerClientError> {
        if self.amount == 0 {
            return Err(LedgerClientError::Validation(
                "amount must be greater than zero".into(),
            ));
        }
        if self.debit_account_id == self.credit_account_id {
            return Err(LedgerClientError::Validation(
                "debit and credit accounts must differ".into(),
            ));
        }
        if self.ledger == 0 {
            return Err(LedgerClientError::Validation("ledger must be non-zero".into()));
        }
        Ok(())
    }

    fn build(&self, timeout_secs: Option<u32>) -> Transfer {
        let transfer = match timeout_secs {
            None => Transfer::immediate(
                self.debit_account_id,
                self.credit_account_id,
                self.amount,
                self.ledger,
                self.code,
            ),
            Some(timeout) => Transfer::pending(
                self.debit_account_id,
                self.credit_account_id,
                self.amount,
                self.ledger,
                self.code,
                timeout,
            ),
        };
        match &self.correlation {
            Some(key) => transfer.with_correlation(key),
            None => transfer,
        }
    }
}

/// Issues immediate and two-phase transfers against the ledger engine.
///
/// Validation failures are fatal and never retried; transport failures go
/// through the cluster's bounded retry before surfacing.
pub struct TransferLedger {
    cluster: Arc<ClusterManager>,
}

impl TransferLedger {
    pub fn new(cluster: Arc<ClusterManager>) -> Self {
        Self { cluster }
    }

    /// Submit a single immediate transfer; returns the new transfer id.
    pub async fn create_transfer(&self, spec: &TransferSpec) -> Result<TransferId, LedgerClientError> {
        spec.validate()?;
        let id = self.submit(spec.build(None)).await?;
        info!(transfer = %id, amount = %spec.amount, "transfer posted");
        Ok(id)
    }

    /// Submit a two-phase transfer holding funds until posted, voided, or
    /// expired by the engine after `timeout_secs`.
    pub async fn create_pending_transfer(
        &self,
        spec: &TransferSpec,
        timeout_secs: u32,
    ) -> Result<TransferId, LedgerClientError> {
        spec.validate()?;
        let id = self.submit(spec.build(Some(timeout_secs))).await?;
        info!(transfer = %id, amount = %spec.amount, timeout_secs, "pending transfer created");
        Ok(id)
    }

    /// Convert a pending transfer to posted. Posting an already-resolved
    /// pending is a definite failure, not a silent no-op.
    pub async fn post_pending_transfer(
        &self,
        pending_id: TransferId,
    ) -> Result<TransferId, LedgerClientError> {
        let id = self.submit(Transfer::post_pending(pending_id)).await?;
        info!(transfer = %id, pending = %pending_id, "pending transfer posted");
        Ok(id)
    }

    /// Release a pending hold without moving posted balances.
    pub async fn void_pending_transfer(
        &self,
        pending_id: TransferId,
    ) -> Result<TransferId, LedgerClientError> {
        let id = self.submit(Transfer::void_pending(pending_id)).await?;
        info!(transfer = %id, pending = %pending_id, "pending transfer voided");
        Ok(id)
    }

    /// Submit a batch of immediate transfers. Each item is accepted or
    /// rejected independently; the batch is deliberately not atomic. The
    /// outer error covers transport only.
    pub async fn create_transfers(
        &self,
        specs: &[TransferSpec],
    ) -> Result<Vec<Result<TransferId, LedgerClientError>>, LedgerClientError> {
        self.submit_batch(specs, None).await
    }

    /// Batch variant of [`Self::create_pending_transfer`], one timeout for
    /// all items.
    pub async fn create_pending_transfers(
        &self,
        specs: &[TransferSpec],
        timeout_secs: u32,
    ) -> Result<Vec<Result<TransferId, LedgerClientError>>, LedgerClientError> {
        self.submit_batch(specs, Some(timeout_secs)).await
    }

    /// Look up a transfer by id.
    pub async fn get_transfer(
        &self,
        id: TransferId,
    ) -> Result<Option<Transfer>, LedgerClientError> {
        let mut found = self
            .cluster
            .execute(|engine| async move { engine.lookup_transfers(&[id]).await })
            .await?;
        Ok(found.pop().flatten())
    }

    async fn submit(&self, transfer: Transfer) -> Result<TransferId, LedgerClientError> {
        let id = transfer.id;
        let results = self
            .cluster
            .execute(|engine| {
                let transfer = transfer.clone();
                async move { engine.create_transfers(&[transfer]).await }
            })
            .await?;

        match results.into_iter().next() {
            Some(Ok(())) => Ok(id),
            // A duplicate of our own freshly generated id means an earlier
            // attempt of this submission already applied (e.g. a retry after
            // a timed-out but delivered request).
            Some(Err(EngineError::DuplicateId)) => {
                debug!(transfer = %id, "duplicate id on retry treated as applied");
                Ok(id)
            }
            Some(Err(e)) => Err(LedgerClientError::from_engine(id, e)),
            None => Err(LedgerClientError::Validation(
                "engine returned no result for transfer create".into(),
            )),
        }
    }

    async fn submit_batch(
        &self,
        specs: &[TransferSpec],
        timeout_secs: Option<u32>,
    ) -> Result<Vec<Result<TransferId, LedgerClientError>>, LedgerClientError> {
        // Client-side validation first; invalid items never reach the wire
        // but do not block their neighbors.
        let mut outcomes: Vec<Option<Result<TransferId, LedgerClientError>>> =
            Vec::with_capacity(specs.len());
        let mut built = Vec::new();
        for spec in specs {
            match spec.validate() {
                Ok(()) => {
                    built.push(spec.build(timeout_secs));
                    outcomes.push(None);
                }
                Err(e) => outcomes.push(Some(Err(e))),
            }
        }

        let results = if built.is_empty() {
            Vec::new()
        } else {
            self.cluster
                .execute(|engine| {
                    let built = built.clone();
                    async move { engine.create_transfers(&built).await }
                })
                .await?
        };

        let mut submitted = built.iter().zip(results);
        let merged = outcomes
            .into_iter()
            .map(|slot| match slot {
                Some(outcome) => outcome,
                None => {
                    let (transfer, result) = submitted
                        .next()
                        .expect("one engine result per submitted item");
                    match result {
                        Ok(()) => Ok(transfer.id),
                        Err(e) => Err(LedgerClientError::from_engine(transfer.id, e)),
                    }
                }
            })
            .collect();
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearline_cluster::{ClusterConfig, LoopbackConnector};
    use clearline_engine::InMemoryEngine;
    use clearline_types::{Account, TransferState};

    async fn harness() -> (Arc<InMemoryEngine>, TransferLedger, AccountId, AccountId) {
        let engine = Arc::new(InMemoryEngine::new());
        let cluster = Arc::new(ClusterManager::new(
            ClusterConfig::default(),
            Arc::new(LoopbackConnector::new(engine.clone())),
        ));
        cluster.connect().await.unwrap();
        let ledger = TransferLedger::new(cluster);

        let funding = Account::new(AccountId::generate(), 840, 99, None, false);
        let a = Account::new(AccountId::generate(), 840, 1, None, true);
        let b = Account::new(AccountId::generate(), 840, 1, None, true);
        engine
            .create_accounts(&[funding.clone(), a.clone(), b.clone()])
            .await;
        ledger
            .create_transfer(&TransferSpec::new(funding.id, a.id, 10_000, 840, 1))
            .await
            .unwrap();
        (engine, ledger, a.id, b.id)
    }

    async fn available(engine: &InMemoryEngine, id: AccountId) -> i128 {
        engine.lookup_accounts(&[id]).await.remove(0).unwrap().balance().available
    }

    #[tokio::test]
    async fn create_transfer_validates_before_the_wire() {
        let (_, ledger, a, b) = harness().await;

        let zero = TransferSpec::new(a, b, 0, 840, 1);
        assert!(matches!(
            ledger.create_transfer(&zero).await,
            Err(LedgerClientError::Validation(_))
        ));

        let same = TransferSpec::new(a, a, 100, 840, 1);
        assert!(matches!(
            ledger.create_transfer(&same).await,
            Err(LedgerClientError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn pending_round_trip_via_client() {
        let (engine, ledger, a, b) = harness().await;

        let hold = ledger
            .create_pending_transfer(&TransferSpec::new(a, b, 1_000, 840, 1), 5)
            .await
            .unwrap();
        assert_eq!(available(&engine, b).await, 0);

        ledger.post_pending_transfer(hold).await.unwrap();
        assert_eq!(available(&engine, a).await, 9_000);
        assert_eq!(available(&engine, b).await, 1_000);

        // Resolving twice is a definite failure.
        let err = ledger.post_pending_transfer(hold).await.unwrap_err();
        assert!(matches!(err, LedgerClientError::TransferFailed { .. }));
    }

    #[tokio::test]
    async fn void_releases_without_posting() {
        let (engine, ledger, a, b) = harness().await;

        let hold = ledger
            .create_pending_transfer(&TransferSpec::new(a, b, 1_000, 840, 1), 5)
            .await
            .unwrap();
        ledger.void_pending_transfer(hold).await.unwrap();

        assert_eq!(available(&engine, a).await, 10_000);
        assert_eq!(available(&engine, b).await, 0);
        let stored = ledger.get_transfer(hold).await.unwrap().unwrap();
        assert_eq!(stored.state, TransferState::Voided);
    }

    #[tokio::test]
    async fn batch_returns_per_item_results() {
        let (engine, ledger, a, b) = harness().await;

        let specs = vec![
            TransferSpec::new(a, b, 2_500, 840, 1),
            TransferSpec::new(a, a, 100, 840, 1), // invalid: same account
            TransferSpec::new(a, b, 500, 840, 1),
        ];
        let results = ledger.create_transfers(&specs).await.unwrap();
        assert_eq!(results.len(), 3);

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(LedgerClientError::Validation(_))));
        assert!(results[2].is_ok());

        // Valid items posted regardless of the invalid neighbor.
        assert_eq!(available(&engine, b).await, 3_000);
    }

    #[tokio::test]
    async fn insufficient_balance_maps_to_typed_error() {
        let (_, ledger, a, b) = harness().await;

        let too_much = TransferSpec::new(a, b, 20_000, 840, 1);
        let err = ledger.create_transfer(&too_much).await.unwrap_err();
        assert!(matches!(err, LedgerClientError::InsufficientBalance { .. }));
    }
}
