use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use clearline_types::{TransferAudit, TransferId};

/// Mirror write failures. Logged by the dispatch worker, never retried
/// inline, and never visible to clearing callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MirrorError {
    #[error("narrative mirror unavailable: {0}")]
    Unavailable(String),
}

/// Read-oriented observation store receiving fire-and-forget copies of
/// finalized clearings. Writes are idempotent on the transfer id. The ledger
/// stays authoritative; a missing mirror record never implies a missing
/// transfer.
#[async_trait]
pub trait NarrativeMirror: Send + Sync {
    async fn record(&self, audit: &TransferAudit) -> Result<(), MirrorError>;
}

/// Process-local mirror for tests and embedding.
#[derive(Default)]
pub struct InMemoryMirror {
    records: RwLock<BTreeMap<TransferId, TransferAudit>>,
}

impl InMemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, transfer_id: TransferId) -> Option<TransferAudit> {
        self.records
            .read()
            .expect("mirror lock poisoned")
            .get(&transfer_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("mirror lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NarrativeMirror for InMemoryMirror {
    async fn record(&self, audit: &TransferAudit) -> Result<(), MirrorError> {
        let mut records = self.records.write().expect("mirror lock poisoned");
        // Idempotent on transfer id: the first write wins, replays are no-ops.
        records.entry(audit.transfer_id).or_insert_with(|| audit.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearline_types::ClearingStatus;

    fn audit(status: ClearingStatus) -> TransferAudit {
        TransferAudit::new(
            TransferId::from_raw(42),
            "inv-1",
            1_000,
            "first write",
            status,
            None,
        )
    }

    #[tokio::test]
    async fn writes_are_idempotent_on_transfer_id() {
        let mirror = InMemoryMirror::new();
        mirror.record(&audit(ClearingStatus::ClearedNotHonored)).await.unwrap();
        mirror.record(&audit(ClearingStatus::ClearedAndHonored)).await.unwrap();

        assert_eq!(mirror.len(), 1);
        let stored = mirror.get(TransferId::from_raw(42)).unwrap();
        assert_eq!(stored.clearing_status, ClearingStatus::ClearedNotHonored);
    }
}
