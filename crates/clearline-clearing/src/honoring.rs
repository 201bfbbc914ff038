use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use clearline_types::TransferId;

/// Request to honor a cleared obligation through an external processor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HonoringRequest {
    pub amount: u128,
    pub currency: String,
    pub method: String,
    pub description: String,
    pub metadata: BTreeMap<String, String>,
    /// Back-reference to the finalized ledger transfer.
    pub transfer_id: TransferId,
}

/// Adapter-side acknowledgement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HonoringReceipt {
    pub id: String,
    pub status: String,
}

/// Honoring failures. Non-fatal by design: the clearing remains valid and
/// the failure is queued for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HonoringError {
    #[error("honoring declined: {0}")]
    Declined(String),

    #[error("honoring adapter unavailable: {0}")]
    Unavailable(String),
}

/// External payment adapter (card, ACH, ...). Attempted only after clearing
/// finality; treated as best-effort everywhere.
#[async_trait]
pub trait HonoringAdapter: Send + Sync {
    async fn submit(&self, request: &HonoringRequest) -> Result<HonoringReceipt, HonoringError>;
}
