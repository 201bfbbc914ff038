use clearline_types::{AccountId, TransferId, TransferState};

/// Per-item errors reported by the ledger engine.
///
/// Batch operations return one of these per rejected item; a rejection of one
/// item never affects the others.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("identifier already exists")]
    DuplicateId,

    #[error("ledger must be non-zero")]
    ZeroLedger,

    #[error("code must be non-zero")]
    ZeroCode,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("debit and credit accounts must differ")]
    AccountsMustDiffer,

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("debit and credit accounts must share a ledger")]
    LedgerMismatch,

    #[error("account {0} does not accept transfers")]
    AccountNotActive(AccountId),

    #[error("insufficient balance on account {account}: requested {requested}")]
    InsufficientBalance { account: AccountId, requested: u128 },

    #[error("resolution transfer requires a pending id")]
    MissingPendingId,

    #[error("pending transfer {0} not found")]
    PendingNotFound(TransferId),

    #[error("pending transfer {id} already resolved as {state:?}")]
    PendingAlreadyResolved { id: TransferId, state: TransferState },
}

impl EngineError {
    /// Whether the rejection is a malformed-request failure (as opposed to a
    /// state-dependent one). Callers never retry either kind; the distinction
    /// only drives how the client surfaces the error.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::ZeroLedger
                | EngineError::ZeroCode
                | EngineError::ZeroAmount
                | EngineError::AccountsMustDiffer
                | EngineError::LedgerMismatch
                | EngineError::MissingPendingId
        )
    }
}
