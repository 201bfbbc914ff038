use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use clearline_clearing::ReviewQueue;
use clearline_cluster::ClusterManager;
use clearline_engine::LedgerEngine;
use clearline_types::{TransferId, TransferState};

use crate::adapter::AdapterRecords;
use crate::error::ReconError;

/// One classified disagreement between the ledger and the adapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Discrepancy {
    /// Both sides saw the clearing but disagree on the amount.
    AmountMismatch {
        transfer_id: TransferId,
        adapter_id: String,
        ledger_amount: u128,
        adapter_amount: u128,
    },
    /// The adapter reports a settlement the ledger never cleared.
    MissingInLedger { adapter_id: String, correlation: u128 },
    /// A cleared transfer with no adapter record and no review entry
    /// explaining its absence.
    MissingInAdapter {
        transfer_id: TransferId,
        correlation: u128,
    },
    /// The adapter reports the same correlation more than once.
    DuplicateInAdapter { correlation: u128, count: usize },
}

/// Result of one reconciliation pass.
#[derive(Clone, Debug, Serialize)]
pub struct ReconReport {
    /// Correlation-tagged posted transfers examined.
    pub checked: usize,
    pub discrepancies: Vec<Discrepancy>,
    /// Honoring failures already queued for review; expected to be absent
    /// on the adapter side.
    pub pending_review: usize,
}

impl ReconReport {
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// Joins posted, correlation-tagged ledger transfers with adapter records
/// and reports every disagreement. Transfers whose honoring already failed
/// (present in the review queue) are expected to be missing on the adapter
/// side and are not flagged.
pub struct ReconciliationObserver {
    cluster: Arc<ClusterManager>,
    adapter: Arc<dyn AdapterRecords>,
    review: Arc<ReviewQueue>,
}

impl ReconciliationObserver {
    pub fn new(
        cluster: Arc<ClusterManager>,
        adapter: Arc<dyn AdapterRecords>,
        review: Arc<ReviewQueue>,
    ) -> Self {
        Self {
            cluster,
            adapter,
            review,
        }
    }

    /// Run one reconciliation pass. Reads both sides, mutates neither.
    pub async fn run(&self) -> Result<ReconReport, ReconError> {
        let transfers = self
            .cluster
            .execute(|engine| async move { engine.list_transfers().await })
            .await?;
        let records = self.adapter.records().await?;
        let review = self.review.snapshot();
        let under_review: HashSet<TransferId> =
            review.iter().map(|entry| entry.transfer_id).collect();

        // Only posted transfers carrying a correlation tag take part; holds,
        // voids, and internal movements have no adapter-side counterpart.
        let cleared: Vec<_> = transfers
            .iter()
            .filter(|t| t.state == TransferState::Posted && t.user_data_128 != 0)
            .collect();

        let mut by_correlation: HashMap<u128, Vec<&crate::adapter::AdapterRecord>> = HashMap::new();
        for record in &records {
            by_correlation.entry(record.correlation).or_default().push(record);
        }

        let mut discrepancies = Vec::new();

        for (correlation, matched) in &by_correlation {
            if matched.len() > 1 {
                discrepancies.push(Discrepancy::DuplicateInAdapter {
                    correlation: *correlation,
                    count: matched.len(),
                });
            }
        }

        let mut seen_correlations = HashSet::new();
        for transfer in &cleared {
            seen_correlations.insert(transfer.user_data_128);
            match by_correlation.get(&transfer.user_data_128).map(|m| m[0]) {
                Some(record) => {
                    if record.amount != transfer.amount {
                        discrepancies.push(Discrepancy::AmountMismatch {
                            transfer_id: transfer.id,
                            adapter_id: record.id.clone(),
                            ledger_amount: transfer.amount,
                            adapter_amount: record.amount,
                        });
                    }
                }
                None => {
                    if !under_review.contains(&transfer.id) {
                        discrepancies.push(Discrepancy::MissingInAdapter {
                            transfer_id: transfer.id,
                            correlation: transfer.user_data_128,
                        });
                    }
                }
            }
        }

        for record in &records {
            if !seen_correlations.contains(&record.correlation) {
                discrepancies.push(Discrepancy::MissingInLedger {
                    adapter_id: record.id.clone(),
                    correlation: record.correlation,
                });
            }
        }

        let report = ReconReport {
            checked: cleared.len(),
            discrepancies,
            pending_review: review.len(),
        };
        if report.is_clean() {
            info!(checked = report.checked, "reconciliation pass clean");
        } else {
            warn!(
                checked = report.checked,
                discrepancies = report.discrepancies.len(),
                "reconciliation pass found discrepancies"
            );
        }
        Ok(report)
    }
}
