use clearline_cluster::ConnectionError;
use clearline_engine::EngineError;
use clearline_types::{AccountId, TransferId, TypeError};

/// Errors surfaced by the ledger client crates.
///
/// Propagation policy: `Validation` and `InvalidStatusTransition` fail fast
/// and are never retried; `Connection` has already been through the cluster
/// retry policy when it reaches a caller; `TransferFailed` wraps the engine's
/// per-item rejection payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerClientError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("invalid specification: {0}")]
    Validation(String),

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("account {0} already exists")]
    DuplicateAccount(AccountId),

    #[error("insufficient balance on account {account}: requested {requested}")]
    InsufficientBalance { account: AccountId, requested: u128 },

    #[error("transfer {transfer} rejected by engine: {source}")]
    TransferFailed {
        transfer: TransferId,
        source: EngineError,
    },

    #[error(transparent)]
    Status(#[from] TypeError),
}

impl LedgerClientError {
    /// Translate an engine rejection of the given transfer.
    pub(crate) fn from_engine(transfer: TransferId, err: EngineError) -> Self {
        match err {
            EngineError::InsufficientBalance { account, requested } => {
                LedgerClientError::InsufficientBalance { account, requested }
            }
            EngineError::AccountNotFound(id) => LedgerClientError::AccountNotFound(id),
            e if e.is_validation() => LedgerClientError::Validation(e.to_string()),
            e => LedgerClientError::TransferFailed {
                transfer,
                source: e,
            },
        }
    }
}
