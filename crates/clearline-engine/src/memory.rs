use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use clearline_types::{
    Account, AccountId, AccountStatus, Transfer, TransferFlag, TransferId, TransferState,
};

use crate::error::EngineError;
use crate::traits::LedgerEngine;

/// In-memory ledger engine for tests, local demos, and embedding.
///
/// Enforces the engine-side invariants: distinct debit/credit accounts on a
/// shared ledger, positive amounts, closed/frozen account rejection, balance
/// limits, exactly-once resolution of pending transfers, and timeout-driven
/// expiry. Expiry is applied lazily before every operation, so a pending
/// transfer whose timeout has elapsed is observed as `Expired` with its hold
/// released.
#[derive(Debug)]
pub struct InMemoryEngine {
    inner: RwLock<EngineState>,
}

#[derive(Debug, Default)]
struct EngineState {
    accounts: HashMap<AccountId, Account>,
    transfers: HashMap<TransferId, Transfer>,
    /// Pending transfers not yet posted, voided, or expired.
    open_pendings: HashSet<TransferId>,
    /// Transfers indexed by their 128-bit correlation value.
    by_correlation: HashMap<u128, Vec<TransferId>>,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(EngineState::default()),
        }
    }

    /// Expire pending transfers whose timeout has elapsed as of `now`.
    ///
    /// Real engines drive this transition internally; the in-memory engine
    /// exposes it so tests can force the clock. Every mutating and reading
    /// operation also applies it with the current wall clock.
    pub fn expire_pending_due(&self, now: DateTime<Utc>) {
        let mut state = self.inner.write().expect("engine lock poisoned");
        Self::expire_due(&mut state, now);
    }

    fn expire_due(state: &mut EngineState, now: DateTime<Utc>) {
        let due: Vec<TransferId> = state
            .open_pendings
            .iter()
            .filter(|id| {
                state
                    .transfers
                    .get(id)
                    .and_then(Transfer::expires_at)
                    .is_some_and(|at| at <= now)
            })
            .copied()
            .collect();

        for id in due {
            state.open_pendings.remove(&id);
            let Some(pending) = state.transfers.get_mut(&id) else {
                continue;
            };
            pending.state = TransferState::Expired;
            let (debit, credit, amount) =
                (pending.debit_account_id, pending.credit_account_id, pending.amount);

            if let Some(account) = state.accounts.get_mut(&debit) {
                account.debits_pending = account.debits_pending.saturating_sub(amount);
            }
            if let Some(account) = state.accounts.get_mut(&credit) {
                account.credits_pending = account.credits_pending.saturating_sub(amount);
            }
            debug!(transfer = %id, "pending transfer expired");
        }
    }

    fn create_account(state: &mut EngineState, account: &Account) -> Result<(), EngineError> {
        if account.ledger == 0 {
            return Err(EngineError::ZeroLedger);
        }
        if account.code == 0 {
            return Err(EngineError::ZeroCode);
        }
        if state.accounts.contains_key(&account.id) {
            return Err(EngineError::DuplicateId);
        }
        state.accounts.insert(account.id, account.clone());
        Ok(())
    }

    /// Validate both legs of a new (non-resolution) transfer.
    fn check_legs(state: &EngineState, transfer: &Transfer) -> Result<(), EngineError> {
        if transfer.amount == 0 {
            return Err(EngineError::ZeroAmount);
        }
        if transfer.debit_account_id == transfer.credit_account_id {
            return Err(EngineError::AccountsMustDiffer);
        }

        let debit = state
            .accounts
            .get(&transfer.debit_account_id)
            .ok_or(EngineError::AccountNotFound(transfer.debit_account_id))?;
        let credit = state
            .accounts
            .get(&transfer.credit_account_id)
            .ok_or(EngineError::AccountNotFound(transfer.credit_account_id))?;

        if debit.ledger != credit.ledger || debit.ledger != transfer.ledger {
            return Err(EngineError::LedgerMismatch);
        }
        if !debit.status.accepts_transfers() {
            return Err(EngineError::AccountNotActive(debit.id));
        }
        if !credit.status.accepts_transfers() {
            return Err(EngineError::AccountNotActive(credit.id));
        }
        if debit.debits_must_not_exceed_credits && debit.spendable() < transfer.amount as i128 {
            return Err(EngineError::InsufficientBalance {
                account: debit.id,
                requested: transfer.amount,
            });
        }
        Ok(())
    }

    fn apply_transfer(state: &mut EngineState, transfer: &Transfer) -> Result<(), EngineError> {
        if state.transfers.contains_key(&transfer.id) {
            return Err(EngineError::DuplicateId);
        }

        match transfer.flags {
            TransferFlag::None => {
                Self::check_legs(state, transfer)?;
                let mut stored = transfer.clone();
                stored.state = TransferState::Posted;
                Self::post_amount(state, &stored);
                Self::store(state, stored);
            }
            TransferFlag::Pending => {
                Self::check_legs(state, transfer)?;
                let mut stored = transfer.clone();
                stored.state = TransferState::Pending;
                {
                    let debit = state
                        .accounts
                        .get_mut(&stored.debit_account_id)
                        .expect("debit account checked above");
                    debit.debits_pending += stored.amount;
                    debit.updated_at = stored.timestamp;
                }
                {
                    let credit = state
                        .accounts
                        .get_mut(&stored.credit_account_id)
                        .expect("credit account checked above");
                    credit.credits_pending += stored.amount;
                    credit.updated_at = stored.timestamp;
                }
                state.open_pendings.insert(stored.id);
                Self::store(state, stored);
            }
            TransferFlag::PostPending | TransferFlag::VoidPending => {
                Self::resolve_pending(state, transfer)?;
            }
        }
        Ok(())
    }

    fn resolve_pending(state: &mut EngineState, transfer: &Transfer) -> Result<(), EngineError> {
        let pending_id = transfer.pending_id.ok_or(EngineError::MissingPendingId)?;
        let pending = state
            .transfers
            .get(&pending_id)
            .cloned()
            .ok_or(EngineError::PendingNotFound(pending_id))?;

        if pending.state != TransferState::Pending {
            return Err(EngineError::PendingAlreadyResolved {
                id: pending_id,
                state: pending.state,
            });
        }

        let posting = transfer.flags == TransferFlag::PostPending;
        let amount = pending.amount;

        // Release the hold on both sides; posting then re-applies as posted.
        {
            let debit = state
                .accounts
                .get_mut(&pending.debit_account_id)
                .ok_or(EngineError::AccountNotFound(pending.debit_account_id))?;
            debit.debits_pending = debit.debits_pending.saturating_sub(amount);
            if posting {
                debit.debits_posted += amount;
            }
            debit.updated_at = transfer.timestamp;
        }
        {
            let credit = state
                .accounts
                .get_mut(&pending.credit_account_id)
                .ok_or(EngineError::AccountNotFound(pending.credit_account_id))?;
            credit.credits_pending = credit.credits_pending.saturating_sub(amount);
            if posting {
                credit.credits_posted += amount;
            }
            credit.updated_at = transfer.timestamp;
        }

        state.open_pendings.remove(&pending_id);
        let resolved_state = if posting {
            TransferState::Posted
        } else {
            TransferState::Voided
        };
        if let Some(p) = state.transfers.get_mut(&pending_id) {
            p.state = resolved_state;
        }

        // The resolution transfer inherits the pending transfer's legs.
        let mut stored = transfer.clone();
        stored.debit_account_id = pending.debit_account_id;
        stored.credit_account_id = pending.credit_account_id;
        stored.amount = amount;
        stored.ledger = pending.ledger;
        stored.code = pending.code;
        stored.state = resolved_state;
        Self::store(state, stored);
        Ok(())
    }

    fn post_amount(state: &mut EngineState, transfer: &Transfer) {
        if let Some(debit) = state.accounts.get_mut(&transfer.debit_account_id) {
            debit.debits_posted += transfer.amount;
            debit.updated_at = transfer.timestamp;
        }
        if let Some(credit) = state.accounts.get_mut(&transfer.credit_account_id) {
            credit.credits_posted += transfer.amount;
            credit.updated_at = transfer.timestamp;
        }
    }

    fn store(state: &mut EngineState, transfer: Transfer) {
        if transfer.user_data_128 != 0 {
            state
                .by_correlation
                .entry(transfer.user_data_128)
                .or_default()
                .push(transfer.id);
        }
        state.transfers.insert(transfer.id, transfer);
    }
}

#[async_trait]
impl LedgerEngine for InMemoryEngine {
    async fn create_accounts(&self, accounts: &[Account]) -> Vec<Result<(), EngineError>> {
        let mut state = self.inner.write().expect("engine lock poisoned");
        Self::expire_due(&mut state, Utc::now());
        accounts
            .iter()
            .map(|a| Self::create_account(&mut state, a))
            .collect()
    }

    async fn lookup_accounts(&self, ids: &[AccountId]) -> Vec<Option<Account>> {
        let mut state = self.inner.write().expect("engine lock poisoned");
        Self::expire_due(&mut state, Utc::now());
        ids.iter().map(|id| state.accounts.get(id).cloned()).collect()
    }

    async fn set_account_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<(), EngineError> {
        let mut state = self.inner.write().expect("engine lock poisoned");
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or(EngineError::AccountNotFound(id))?;
        account.status = status;
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn create_transfers(&self, transfers: &[Transfer]) -> Vec<Result<(), EngineError>> {
        let mut state = self.inner.write().expect("engine lock poisoned");
        Self::expire_due(&mut state, Utc::now());
        transfers
            .iter()
            .map(|t| Self::apply_transfer(&mut state, t))
            .collect()
    }

    async fn lookup_transfers(&self, ids: &[TransferId]) -> Vec<Option<Transfer>> {
        let mut state = self.inner.write().expect("engine lock poisoned");
        Self::expire_due(&mut state, Utc::now());
        ids.iter().map(|id| state.transfers.get(id).cloned()).collect()
    }

    async fn lookup_transfers_by_correlation(&self, key_128: u128) -> Vec<Transfer> {
        let mut state = self.inner.write().expect("engine lock poisoned");
        Self::expire_due(&mut state, Utc::now());
        state
            .by_correlation
            .get(&key_128)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.transfers.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn list_transfers(&self) -> Vec<Transfer> {
        let mut state = self.inner.write().expect("engine lock poisoned");
        Self::expire_due(&mut state, Utc::now());
        state.transfers.values().cloned().collect()
    }

    async fn ping(&self) -> bool {
        true
    }
}
