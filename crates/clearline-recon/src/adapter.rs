use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;

/// One settlement record as the external honoring side reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterRecord {
    /// Adapter-side identifier.
    pub id: String,
    /// Correlation value the clearing coordinator stamped on the transfer.
    pub correlation: u128,
    pub amount: u128,
    pub status: String,
}

/// Read-only source of external settlement records for one reconciliation
/// window.
#[async_trait]
pub trait AdapterRecords: Send + Sync {
    async fn records(&self) -> Result<Vec<AdapterRecord>, ReconError>;
}
