use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::TransferId;

/// Outcome of an obligation after clearing finality.
///
/// `success` on a clearing result refers strictly to the ledger clearing;
/// this status separately communicates whether the external honoring attempt
/// also succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearingStatus {
    ClearedAndHonored,
    ClearedNotHonored,
}

impl fmt::Display for ClearingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClearingStatus::ClearedAndHonored => "cleared_and_honored",
            ClearingStatus::ClearedNotHonored => "cleared_not_honored",
        };
        write!(f, "{s}")
    }
}

/// Immutable, append-only observation record of a finalized clearing.
///
/// Written asynchronously to the narrative mirror. The ledger is
/// authoritative: absence of an audit record never implies the transfer did
/// not happen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAudit {
    pub transfer_id: TransferId,
    pub intent_id: String,
    pub amount: u128,
    pub description: String,
    pub clearing_status: ClearingStatus,
    pub honoring_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TransferAudit {
    pub fn new(
        transfer_id: TransferId,
        intent_id: impl Into<String>,
        amount: u128,
        description: impl Into<String>,
        clearing_status: ClearingStatus,
        honoring_id: Option<String>,
    ) -> Self {
        Self {
            transfer_id,
            intent_id: intent_id.into(),
            amount,
            description: description.into(),
            clearing_status,
            honoring_id,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_matches_wire_form() {
        assert_eq!(
            ClearingStatus::ClearedAndHonored.to_string(),
            "cleared_and_honored"
        );
        assert_eq!(
            ClearingStatus::ClearedNotHonored.to_string(),
            "cleared_not_honored"
        );
    }

    #[test]
    fn audit_serde_roundtrip() {
        let audit = TransferAudit::new(
            TransferId::generate(),
            "inv-1",
            2_500,
            "invoice settlement",
            ClearingStatus::ClearedAndHonored,
            Some("hon_123".into()),
        );
        let json = serde_json::to_string(&audit).unwrap();
        let parsed: TransferAudit = serde_json::from_str(&json).unwrap();
        assert_eq!(audit, parsed);
    }
}
