use clearline_ledger::LedgerClientError;

/// Errors from the durable intent journal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal serialization error: {0}")]
    Serialization(String),
}

/// Errors surfaced by the clearing coordinator.
///
/// Idempotency conflicts fail fast with no retry. `Ledger` failures mean the
/// clearing itself did not happen; nothing downstream of finality ever
/// appears here; honoring and mirror failures are recorded, not raised.
#[derive(Debug, thiserror::Error)]
pub enum ClearingError {
    #[error("intent rejected: {0}")]
    InvalidIntent(String),

    #[error("idempotency conflict for intent {intent_id}: payload differs from the recorded submission")]
    IdempotencyConflict { intent_id: String },

    #[error("intent {intent_id} is indeterminate after recovery; resolve via reconciliation before resubmitting")]
    IndeterminateIntent { intent_id: String },

    #[error("unknown intent {intent_id}")]
    UnknownIntent { intent_id: String },

    #[error("clearing failed for intent {intent_id}: {reason}")]
    Failed { intent_id: String, reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerClientError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}
