use async_trait::async_trait;
use clearline_types::{Account, AccountId, AccountStatus, Transfer, TransferId};

use crate::error::EngineError;

/// The consumed wire contract of an authoritative double-entry ledger engine.
///
/// Batch operations are deliberately not atomic: each item is accepted or
/// rejected independently and callers receive a per-item result list. All
/// identifiers are 128-bit; amounts are unsigned integers in the ledger's
/// smallest unit.
#[async_trait]
pub trait LedgerEngine: std::fmt::Debug + Send + Sync {
    /// Create accounts. One result per input, in order.
    async fn create_accounts(&self, accounts: &[Account]) -> Vec<Result<(), EngineError>>;

    /// Look up accounts by id. `None` for unknown ids, in input order.
    async fn lookup_accounts(&self, ids: &[AccountId]) -> Vec<Option<Account>>;

    /// Status-only mutation; never touches balances.
    async fn set_account_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<(), EngineError>;

    /// Create transfers (immediate, pending, or resolutions). One result per
    /// input, in order.
    async fn create_transfers(&self, transfers: &[Transfer]) -> Vec<Result<(), EngineError>>;

    /// Look up transfers by id. `None` for unknown ids, in input order.
    async fn lookup_transfers(&self, ids: &[TransferId]) -> Vec<Option<Transfer>>;

    /// All transfers carrying the given 128-bit correlation value.
    async fn lookup_transfers_by_correlation(&self, key_128: u128) -> Vec<Transfer>;

    /// Every transfer known to the engine. Read-only; used by reconciliation.
    async fn list_transfers(&self) -> Vec<Transfer>;

    /// Liveness probe. Never mutates state.
    async fn ping(&self) -> bool;
}
