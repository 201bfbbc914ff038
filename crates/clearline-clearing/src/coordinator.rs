use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, warn};

use clearline_ledger::{TransferLedger, TransferSpec};
use clearline_types::{AccountId, ClearingIntent, ClearingStatus, TransferAudit, TransferId};

use crate::error::ClearingError;
use crate::fees::{ClearingType, FeeCalculator, FeeQuote, FeeRequest, RiskLevel};
use crate::honoring::{HonoringAdapter, HonoringRequest};
use crate::journal::{IntentJournal, RecoveredIntent};
use crate::queue::DispatchQueue;
use crate::review::{ReviewEntry, ReviewQueue};

/// What the caller gets back for a cleared obligation.
///
/// `success` refers strictly to the ledger clearing. A failed honoring
/// attempt still returns `success: true` with `ClearedNotHonored`; the
/// transfer is final either way.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearingResult {
    pub success: bool,
    pub clearing_status: ClearingStatus,
    pub transfer_id: TransferId,
    pub fees: FeeQuote,
    pub honoring_id: Option<String>,
}

/// A clearing result plus the leg details needed to replay idempotent
/// resubmissions and to derive counter-obligations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearingOutcome {
    pub result: ClearingResult,
    pub debit_account: AccountId,
    pub credit_account: AccountId,
    pub amount: u128,
}

/// Request to clear value back against a previously cleared obligation.
///
/// Never a reversal: the original transfer is untouched and a new forward
/// transfer moves value in the opposite direction, with its own idempotency
/// key and audit trail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterObligation {
    /// Fresh idempotency key for the counter-clearing itself.
    pub intent_id: String,
    /// Amount to clear back; `None` counters the full original amount.
    pub amount: Option<u128>,
    pub description: String,
    pub source: String,
    pub metadata: BTreeMap<String, String>,
}

impl CounterObligation {
    pub fn new(
        intent_id: impl Into<String>,
        description: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            intent_id: intent_id.into(),
            amount: None,
            description: description.into(),
            source: source.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn partial(mut self, amount: u128) -> Self {
        self.amount = Some(amount);
        self
    }
}

/// Static clearing parameters. One coordinator instance serves one ledger
/// namespace and one honoring currency.
#[derive(Clone, Debug)]
pub struct ClearingConfig {
    pub ledger: u32,
    pub transfer_code: u16,
    pub currency: String,
    pub honoring_method: String,
}

impl ClearingConfig {
    pub fn new(ledger: u32, transfer_code: u16) -> Self {
        Self {
            ledger,
            transfer_code,
            currency: "USD".to_string(),
            honoring_method: "standard".to_string(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_honoring_method(mut self, method: impl Into<String>) -> Self {
        self.honoring_method = method.into();
        self
    }
}

type Published = Option<Result<ClearingResult, String>>;

/// Per-intent idempotency slot.
enum SlotState {
    /// A submission holds the slot; duplicates await its published result.
    InFlight {
        payload_hash: [u8; 32],
        rx: watch::Receiver<Published>,
    },
    /// The intent cleared; resubmissions replay this outcome.
    Done {
        payload_hash: [u8; 32],
        outcome: ClearingOutcome,
    },
    /// Recovered reservation with no completion record. Frozen until
    /// reconciliation resolves it.
    Indeterminate { payload_hash: [u8; 32] },
}

/// Turns clearing intents into final ledger transfers, exactly once per
/// idempotency key.
///
/// The finality barrier sits immediately after the ledger accepts the
/// transfer: from that point the obligation is cleared and nothing
/// downstream (honoring, journaling of the upgraded status, mirroring) can
/// fail it or unwind it.
pub struct ClearingCoordinator {
    config: ClearingConfig,
    transfers: Arc<TransferLedger>,
    fees: Arc<dyn FeeCalculator>,
    honoring: Arc<dyn HonoringAdapter>,
    mirror_queue: Arc<DispatchQueue>,
    review: Arc<ReviewQueue>,
    journal: IntentJournal,
    slots: Mutex<HashMap<String, SlotState>>,
}

impl ClearingCoordinator {
    /// Open the coordinator, replaying the intent journal at `journal_path`
    /// into the idempotency slot map.
    pub fn open(
        config: ClearingConfig,
        transfers: Arc<TransferLedger>,
        fees: Arc<dyn FeeCalculator>,
        honoring: Arc<dyn HonoringAdapter>,
        mirror_queue: Arc<DispatchQueue>,
        review: Arc<ReviewQueue>,
        journal_path: &Path,
    ) -> Result<Self, ClearingError> {
        let (journal, recovered) = IntentJournal::open(journal_path)?;

        let mut slots = HashMap::with_capacity(recovered.len());
        let mut indeterminate = 0usize;
        for (intent_id, state) in recovered {
            let slot = match state {
                RecoveredIntent::Done {
                    payload_hash,
                    outcome,
                } => SlotState::Done {
                    payload_hash,
                    outcome,
                },
                RecoveredIntent::Indeterminate { payload_hash } => {
                    indeterminate += 1;
                    SlotState::Indeterminate { payload_hash }
                }
            };
            slots.insert(intent_id, slot);
        }
        if indeterminate > 0 {
            warn!(indeterminate, "recovered intents with unknown fate; reconciliation required");
        }

        Ok(Self {
            config,
            transfers,
            fees,
            honoring,
            mirror_queue,
            review,
            journal,
            slots: Mutex::new(slots),
        })
    }

    /// Clear an obligation: exactly one final transfer per intent id.
    ///
    /// Duplicate submissions with the same payload return the recorded
    /// result, whether the first submission already finished or is still in
    /// flight. The same intent id with a different payload is rejected.
    pub async fn submit_obligation(
        &self,
        intent: &ClearingIntent,
    ) -> Result<ClearingResult, ClearingError> {
        self.clear(intent, ClearingType::Standard).await
    }

    /// Clear value back against a previously cleared obligation as a new
    /// forward transfer in the opposite direction. The original transfer is
    /// never modified.
    pub async fn record_counter_obligation(
        &self,
        original_intent_id: &str,
        counter: CounterObligation,
    ) -> Result<ClearingResult, ClearingError> {
        let original = {
            let slots = self.slots.lock().expect("slot map lock poisoned");
            match slots.get(original_intent_id) {
                Some(SlotState::Done { outcome, .. }) => outcome.clone(),
                Some(SlotState::InFlight { .. }) => {
                    return Err(ClearingError::Failed {
                        intent_id: counter.intent_id,
                        reason: "original obligation is still in flight".to_string(),
                    })
                }
                Some(SlotState::Indeterminate { .. }) => {
                    return Err(ClearingError::IndeterminateIntent {
                        intent_id: original_intent_id.to_string(),
                    })
                }
                None => {
                    return Err(ClearingError::UnknownIntent {
                        intent_id: original_intent_id.to_string(),
                    })
                }
            }
        };

        let amount = counter.amount.unwrap_or(original.amount);
        if amount > original.amount {
            return Err(ClearingError::InvalidIntent(format!(
                "counter amount {amount} exceeds original amount {}",
                original.amount
            )));
        }

        // Legs swap: value flows back from the original credit side.
        let mut intent = ClearingIntent::new(
            counter.intent_id,
            original.credit_account,
            original.debit_account,
            amount,
            counter.description,
            counter.source,
        );
        intent.metadata = counter.metadata;
        intent
            .metadata
            .insert("counter_of".to_string(), original.result.transfer_id.to_hex());
        intent
            .metadata
            .insert("counter_of_intent".to_string(), original_intent_id.to_string());

        self.clear(&intent, ClearingType::Counter).await
    }

    async fn clear(
        &self,
        intent: &ClearingIntent,
        clearing_type: ClearingType,
    ) -> Result<ClearingResult, ClearingError> {
        validate_intent(intent)?;
        let payload_hash = intent.payload_hash();

        // Claim or observe the idempotency slot. The lock is never held
        // across an await.
        enum Claim {
            Owner(watch::Sender<Published>),
            Waiter(watch::Receiver<Published>),
        }
        let claim = {
            let mut slots = self.slots.lock().expect("slot map lock poisoned");
            match slots.get(&intent.intent_id) {
                Some(SlotState::Done {
                    payload_hash: recorded,
                    outcome,
                }) => {
                    if *recorded != payload_hash {
                        return Err(ClearingError::IdempotencyConflict {
                            intent_id: intent.intent_id.clone(),
                        });
                    }
                    info!(intent = %intent.intent_id, transfer = %outcome.result.transfer_id, "idempotent replay");
                    return Ok(outcome.result.clone());
                }
                Some(SlotState::Indeterminate {
                    payload_hash: recorded,
                }) => {
                    if *recorded != payload_hash {
                        return Err(ClearingError::IdempotencyConflict {
                            intent_id: intent.intent_id.clone(),
                        });
                    }
                    return Err(ClearingError::IndeterminateIntent {
                        intent_id: intent.intent_id.clone(),
                    });
                }
                Some(SlotState::InFlight {
                    payload_hash: recorded,
                    rx,
                }) => {
                    if *recorded != payload_hash {
                        return Err(ClearingError::IdempotencyConflict {
                            intent_id: intent.intent_id.clone(),
                        });
                    }
                    Claim::Waiter(rx.clone())
                }
                None => {
                    let (tx, rx) = watch::channel::<Published>(None);
                    slots.insert(
                        intent.intent_id.clone(),
                        SlotState::InFlight { payload_hash, rx },
                    );
                    Claim::Owner(tx)
                }
            }
        };
        let tx = match claim {
            Claim::Waiter(rx) => return self.await_in_flight(&intent.intent_id, rx).await,
            Claim::Owner(tx) => tx,
        };

        // This submission owns the slot from here on.
        if let Err(e) = self.journal.reserve(&intent.intent_id, payload_hash) {
            self.release_slot(&intent.intent_id);
            return Err(e.into());
        }

        let fees = self.fees.quote(&FeeRequest {
            clearing_type,
            amount_minor: intent.amount,
            risk_level: RiskLevel::Standard,
        });

        let spec = TransferSpec::new(
            intent.debit_account,
            intent.credit_account,
            intent.amount,
            self.config.ledger,
            self.config.transfer_code,
        )
        .with_correlation(intent.correlation());

        let transfer_id = match self.transfers.create_transfer(&spec).await {
            Ok(id) => id,
            Err(e) => {
                let reason = e.to_string();
                if let Err(je) = self.journal.fail(&intent.intent_id, payload_hash, &reason) {
                    warn!(intent = %intent.intent_id, error = %je, "failed to journal definite failure");
                }
                self.release_slot(&intent.intent_id);
                let _ = tx.send(Some(Err(reason)));
                return Err(ClearingError::Ledger(e));
            }
        };

        // Finality barrier: the obligation is cleared. Nothing below may
        // fail the submission or touch the transfer.
        let mut result = ClearingResult {
            success: true,
            clearing_status: ClearingStatus::ClearedNotHonored,
            transfer_id,
            fees,
            honoring_id: None,
        };
        let mut outcome = ClearingOutcome {
            result: result.clone(),
            debit_account: intent.debit_account,
            credit_account: intent.credit_account,
            amount: intent.amount,
        };
        if let Err(e) = self
            .journal
            .complete(&intent.intent_id, payload_hash, &outcome)
        {
            error!(intent = %intent.intent_id, error = %e, "journal write failed after finality");
        }
        info!(
            intent = %intent.intent_id,
            transfer = %transfer_id,
            amount = %intent.amount,
            "obligation cleared"
        );

        let request = HonoringRequest {
            amount: intent.amount,
            currency: self.config.currency.clone(),
            method: self.config.honoring_method.clone(),
            description: intent.description.clone(),
            metadata: intent.metadata.clone(),
            transfer_id,
        };
        match self.honoring.submit(&request).await {
            Ok(receipt) => {
                result.clearing_status = ClearingStatus::ClearedAndHonored;
                result.honoring_id = Some(receipt.id);
                outcome.result = result.clone();
                if let Err(e) = self
                    .journal
                    .complete(&intent.intent_id, payload_hash, &outcome)
                {
                    error!(intent = %intent.intent_id, error = %e, "journal write failed after honoring");
                }
            }
            Err(e) => {
                warn!(intent = %intent.intent_id, transfer = %transfer_id, error = %e, "honoring failed; queued for review");
                self.review.push(ReviewEntry {
                    intent_id: intent.intent_id.clone(),
                    transfer_id,
                    amount: intent.amount,
                    reason: e.to_string(),
                    queued_at: Utc::now(),
                });
            }
        }

        self.mirror_queue.push(TransferAudit::new(
            transfer_id,
            intent.intent_id.clone(),
            intent.amount,
            intent.description.clone(),
            result.clearing_status,
            result.honoring_id.clone(),
        ));

        {
            let mut slots = self.slots.lock().expect("slot map lock poisoned");
            slots.insert(
                intent.intent_id.clone(),
                SlotState::Done {
                    payload_hash,
                    outcome,
                },
            );
        }
        let _ = tx.send(Some(Ok(result.clone())));
        Ok(result)
    }

    async fn await_in_flight(
        &self,
        intent_id: &str,
        mut rx: watch::Receiver<Published>,
    ) -> Result<ClearingResult, ClearingError> {
        loop {
            if let Some(published) = rx.borrow_and_update().clone() {
                return match published {
                    Ok(result) => Ok(result),
                    Err(reason) => Err(ClearingError::Failed {
                        intent_id: intent_id.to_string(),
                        reason,
                    }),
                };
            }
            if rx.changed().await.is_err() {
                return Err(ClearingError::Failed {
                    intent_id: intent_id.to_string(),
                    reason: "originating submission dropped before publishing".to_string(),
                });
            }
        }
    }

    fn release_slot(&self, intent_id: &str) {
        self.slots
            .lock()
            .expect("slot map lock poisoned")
            .remove(intent_id);
    }
}

fn validate_intent(intent: &ClearingIntent) -> Result<(), ClearingError> {
    if intent.intent_id.trim().is_empty() {
        return Err(ClearingError::InvalidIntent(
            "intent id must not be empty".to_string(),
        ));
    }
    if intent.amount == 0 {
        return Err(ClearingError::InvalidIntent(
            "amount must be greater than zero".to_string(),
        ));
    }
    if intent.debit_account == intent.credit_account {
        return Err(ClearingError::InvalidIntent(
            "debit and credit accounts must differ".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use tempfile::TempDir;

    use clearline_cluster::{ClusterConfig, ClusterManager, LoopbackConnector};
    use clearline_engine::{InMemoryEngine, LedgerEngine};
    use clearline_types::{Account, CorrelationKey, TransferState};

    use crate::fees::StandardFeeCalculator;
    use crate::honoring::{HonoringError, HonoringReceipt};
    use crate::mirror::{InMemoryMirror, NarrativeMirror};

    struct OkAdapter;

    #[async_trait]
    impl HonoringAdapter for OkAdapter {
        async fn submit(&self, request: &HonoringRequest) -> Result<HonoringReceipt, HonoringError> {
            Ok(HonoringReceipt {
                id: format!("hon_{}", request.transfer_id.to_hex()),
                status: "settled".to_string(),
            })
        }
    }

    struct DownAdapter;

    #[async_trait]
    impl HonoringAdapter for DownAdapter {
        async fn submit(&self, _: &HonoringRequest) -> Result<HonoringReceipt, HonoringError> {
            Err(HonoringError::Unavailable("processor offline".to_string()))
        }
    }

    struct Harness {
        engine: Arc<InMemoryEngine>,
        coordinator: Arc<ClearingCoordinator>,
        mirror_queue: Arc<DispatchQueue>,
        review: Arc<ReviewQueue>,
        payer: AccountId,
        payee: AccountId,
        journal_path: PathBuf,
        _dir: TempDir,
    }

    async fn harness_with(adapter: Arc<dyn HonoringAdapter>) -> Harness {
        let engine = Arc::new(InMemoryEngine::new());
        let cluster = Arc::new(ClusterManager::new(
            ClusterConfig::default(),
            Arc::new(LoopbackConnector::new(engine.clone())),
        ));
        cluster.connect().await.unwrap();
        let transfers = Arc::new(TransferLedger::new(cluster));

        let funding = Account::new(AccountId::generate(), 840, 99, None, false);
        let payer = Account::new(AccountId::generate(), 840, 1, None, true);
        let payee = Account::new(AccountId::generate(), 840, 1, None, true);
        engine
            .create_accounts(&[funding.clone(), payer.clone(), payee.clone()])
            .await;
        transfers
            .create_transfer(&TransferSpec::new(funding.id, payer.id, 10_000, 840, 1))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let journal_path = dir.path().join("intents.journal");
        let mirror_queue = Arc::new(DispatchQueue::new(64));
        let review = Arc::new(ReviewQueue::new());
        let coordinator = Arc::new(
            ClearingCoordinator::open(
                ClearingConfig::new(840, 1),
                transfers,
                Arc::new(StandardFeeCalculator::default()),
                adapter,
                mirror_queue.clone(),
                review.clone(),
                &journal_path,
            )
            .unwrap(),
        );

        Harness {
            engine,
            coordinator,
            mirror_queue,
            review,
            payer: payer.id,
            payee: payee.id,
            journal_path,
            _dir: dir,
        }
    }

    async fn harness() -> Harness {
        harness_with(Arc::new(OkAdapter)).await
    }

    async fn available(engine: &InMemoryEngine, id: AccountId) -> i128 {
        engine.lookup_accounts(&[id]).await.remove(0).unwrap().balance().available
    }

    fn intent(h: &Harness, id: &str, amount: u128) -> ClearingIntent {
        ClearingIntent::new(id, h.payer, h.payee, amount, "invoice settlement", "billing")
    }

    #[tokio::test]
    async fn clears_and_honors_an_obligation() {
        let h = harness().await;

        let result = h
            .coordinator
            .submit_obligation(&intent(&h, "inv-1", 2_500))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.clearing_status, ClearingStatus::ClearedAndHonored);
        assert!(result.honoring_id.is_some());
        assert!(result.fees.total_fee > 0);

        assert_eq!(available(&h.engine, h.payer).await, 7_500);
        assert_eq!(available(&h.engine, h.payee).await, 2_500);
        assert!(h.review.is_empty());
    }

    #[tokio::test]
    async fn resubmission_replays_without_a_second_transfer() {
        let h = harness().await;
        let intent = intent(&h, "inv-2", 2_500);

        let first = h.coordinator.submit_obligation(&intent).await.unwrap();
        let second = h.coordinator.submit_obligation(&intent).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(available(&h.engine, h.payer).await, 7_500);
        assert_eq!(available(&h.engine, h.payee).await, 2_500);

        let matching = h
            .engine
            .lookup_transfers_by_correlation(CorrelationKey::intent_hash("inv-2"))
            .await;
        assert_eq!(matching.len(), 1);
    }

    #[tokio::test]
    async fn changed_payload_under_same_key_is_a_conflict() {
        let h = harness().await;

        h.coordinator
            .submit_obligation(&intent(&h, "inv-3", 2_500))
            .await
            .unwrap();

        let err = h
            .coordinator
            .submit_obligation(&intent(&h, "inv-3", 3_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ClearingError::IdempotencyConflict { .. }));

        // The conflicting submission moved nothing.
        assert_eq!(available(&h.engine, h.payer).await, 7_500);
    }

    #[tokio::test]
    async fn concurrent_duplicates_yield_one_transfer() {
        let h = harness().await;
        let intent = intent(&h, "inv-4", 1_000);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let coordinator = h.coordinator.clone();
            let intent = intent.clone();
            tasks.push(tokio::spawn(async move {
                coordinator.submit_obligation(&intent).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap().unwrap());
        }
        for result in &results[1..] {
            assert_eq!(*result, results[0]);
        }

        let matching = h
            .engine
            .lookup_transfers_by_correlation(CorrelationKey::intent_hash("inv-4"))
            .await;
        assert_eq!(matching.len(), 1);
        assert_eq!(available(&h.engine, h.payee).await, 1_000);
    }

    #[tokio::test]
    async fn honoring_failure_never_unwinds_the_clearing() {
        let h = harness_with(Arc::new(DownAdapter)).await;

        let result = h
            .coordinator
            .submit_obligation(&intent(&h, "inv-5", 2_500))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.clearing_status, ClearingStatus::ClearedNotHonored);
        assert!(result.honoring_id.is_none());

        // The transfer is final despite the honoring failure.
        assert_eq!(available(&h.engine, h.payee).await, 2_500);

        let entries = h.review.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].intent_id, "inv-5");
        assert_eq!(entries[0].transfer_id, result.transfer_id);
    }

    #[tokio::test]
    async fn finalized_clearings_reach_the_mirror() {
        let h = harness().await;

        let result = h
            .coordinator
            .submit_obligation(&intent(&h, "inv-6", 750))
            .await
            .unwrap();

        let mirror = Arc::new(InMemoryMirror::new());
        h.mirror_queue.close();
        h.mirror_queue
            .drain(mirror.clone() as Arc<dyn NarrativeMirror>)
            .await;

        let audit = mirror.get(result.transfer_id).unwrap();
        assert_eq!(audit.intent_id, "inv-6");
        assert_eq!(audit.amount, 750);
        assert_eq!(audit.clearing_status, ClearingStatus::ClearedAndHonored);
    }

    #[tokio::test]
    async fn counter_obligation_is_a_new_forward_transfer() {
        let h = harness().await;

        let original = h
            .coordinator
            .submit_obligation(&intent(&h, "inv-7", 2_500))
            .await
            .unwrap();

        let counter = h
            .coordinator
            .record_counter_obligation(
                "inv-7",
                CounterObligation::new("inv-7-counter", "billing dispute", "disputes"),
            )
            .await
            .unwrap();

        assert_ne!(counter.transfer_id, original.transfer_id);
        assert_eq!(available(&h.engine, h.payer).await, 10_000);
        assert_eq!(available(&h.engine, h.payee).await, 0);

        // The original transfer is untouched.
        let stored = h
            .engine
            .lookup_transfers(&[original.transfer_id])
            .await
            .remove(0)
            .unwrap();
        assert_eq!(stored.state, TransferState::Posted);
        assert_eq!(stored.amount, 2_500);
    }

    #[tokio::test]
    async fn partial_counter_clears_back_part_of_the_amount() {
        let h = harness().await;

        h.coordinator
            .submit_obligation(&intent(&h, "inv-8", 2_500))
            .await
            .unwrap();
        h.coordinator
            .record_counter_obligation(
                "inv-8",
                CounterObligation::new("inv-8-counter", "partial refund", "disputes").partial(1_000),
            )
            .await
            .unwrap();

        assert_eq!(available(&h.engine, h.payer).await, 8_500);
        assert_eq!(available(&h.engine, h.payee).await, 1_500);
    }

    #[tokio::test]
    async fn counter_rejects_unknown_and_oversized() {
        let h = harness().await;

        let err = h
            .coordinator
            .record_counter_obligation(
                "never-seen",
                CounterObligation::new("c-1", "dispute", "disputes"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClearingError::UnknownIntent { .. }));

        h.coordinator
            .submit_obligation(&intent(&h, "inv-9", 1_000))
            .await
            .unwrap();
        let err = h
            .coordinator
            .record_counter_obligation(
                "inv-9",
                CounterObligation::new("c-2", "dispute", "disputes").partial(5_000),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClearingError::InvalidIntent(_)));
    }

    #[tokio::test]
    async fn rejects_invalid_intents_before_touching_anything() {
        let h = harness().await;

        let empty_id = ClearingIntent::new("", h.payer, h.payee, 100, "x", "billing");
        assert!(matches!(
            h.coordinator.submit_obligation(&empty_id).await,
            Err(ClearingError::InvalidIntent(_))
        ));

        let zero = intent(&h, "inv-10", 0);
        assert!(matches!(
            h.coordinator.submit_obligation(&zero).await,
            Err(ClearingError::InvalidIntent(_))
        ));

        let same_legs = ClearingIntent::new("inv-11", h.payer, h.payer, 100, "x", "billing");
        assert!(matches!(
            h.coordinator.submit_obligation(&same_legs).await,
            Err(ClearingError::InvalidIntent(_))
        ));
    }

    #[tokio::test]
    async fn ledger_rejection_is_a_definite_failure_and_retryable() {
        let h = harness().await;

        // More than the payer holds.
        let big = intent(&h, "inv-12", 50_000);
        let err = h.coordinator.submit_obligation(&big).await.unwrap_err();
        assert!(matches!(err, ClearingError::Ledger(_)));

        // The key is released: a corrected submission under the same id
        // succeeds.
        let fixed = intent(&h, "inv-12", 1_000);
        let result = h.coordinator.submit_obligation(&fixed).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn restart_replays_completed_intents_from_the_journal() {
        let h = harness().await;
        let intent = intent(&h, "inv-13", 2_500);

        let first = h.coordinator.submit_obligation(&intent).await.unwrap();

        // Rebuild the coordinator over the same journal and ledger,
        // simulating a process restart.
        let cluster = Arc::new(ClusterManager::new(
            ClusterConfig::default(),
            Arc::new(LoopbackConnector::new(h.engine.clone())),
        ));
        cluster.connect().await.unwrap();
        let reopened = ClearingCoordinator::open(
            ClearingConfig::new(840, 1),
            Arc::new(TransferLedger::new(cluster)),
            Arc::new(StandardFeeCalculator::default()),
            Arc::new(OkAdapter),
            Arc::new(DispatchQueue::new(64)),
            Arc::new(ReviewQueue::new()),
            &h.journal_path,
        )
        .unwrap();

        let replayed = reopened.submit_obligation(&intent).await.unwrap();
        assert_eq!(replayed, first);

        let matching = h
            .engine
            .lookup_transfers_by_correlation(CorrelationKey::intent_hash("inv-13"))
            .await;
        assert_eq!(matching.len(), 1);
    }

    #[tokio::test]
    async fn bare_reservation_freezes_the_key_after_restart() {
        let h = harness().await;
        let intent = intent(&h, "inv-14", 2_500);

        // A reservation with no completion, as left behind by a crash
        // between the journal write and the ledger response.
        {
            let (journal, _) = IntentJournal::open(&h.journal_path).unwrap();
            journal.reserve("inv-14", intent.payload_hash()).unwrap();
        }

        let cluster = Arc::new(ClusterManager::new(
            ClusterConfig::default(),
            Arc::new(LoopbackConnector::new(h.engine.clone())),
        ));
        cluster.connect().await.unwrap();
        let reopened = ClearingCoordinator::open(
            ClearingConfig::new(840, 1),
            Arc::new(TransferLedger::new(cluster)),
            Arc::new(StandardFeeCalculator::default()),
            Arc::new(OkAdapter),
            Arc::new(DispatchQueue::new(64)),
            Arc::new(ReviewQueue::new()),
            &h.journal_path,
        )
        .unwrap();

        let err = reopened.submit_obligation(&intent).await.unwrap_err();
        assert!(matches!(err, ClearingError::IndeterminateIntent { .. }));
    }
}
