use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::balance::AccountBalance;
use crate::error::TypeError;
use crate::id::AccountId;

/// Lifecycle status of a ledger account.
///
/// Transitions are monotonic toward `Closed`, except that `Frozen` and
/// `Active` may alternate. A closed account never reopens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

impl AccountStatus {
    /// Whether a transition from `self` to `next` is permitted.
    pub fn can_transition_to(self, next: AccountStatus) -> bool {
        match (self, next) {
            (a, b) if a == b => true,
            (AccountStatus::Active, AccountStatus::Frozen) => true,
            (AccountStatus::Frozen, AccountStatus::Active) => true,
            (_, AccountStatus::Closed) => true,
            (AccountStatus::Closed, _) => false,
            _ => false,
        }
    }

    /// Accounts accept new transfers only while active.
    pub fn accepts_transfers(self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccountStatus::Active => "active",
            AccountStatus::Frozen => "frozen",
            AccountStatus::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// A balance-holding participant within a ledger namespace.
///
/// Posted and pending totals are unsigned integers in the ledger's smallest
/// currency unit. They are mutated exclusively by the ledger engine as a side
/// effect of transfers, never written directly by clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Currency/asset namespace. Double-entry balance holds per ledger.
    pub ledger: u32,
    /// Account category (user, merchant, treasury, escrow, obligation bucket).
    pub code: u16,
    /// External correlation to an application-level owner.
    pub owner_id: Option<String>,
    pub status: AccountStatus,
    /// When set, the engine rejects debits that would push the posted-plus-
    /// pending debit total past the posted credit total. Funding and treasury
    /// accounts leave this off so value can enter the ledger.
    pub debits_must_not_exceed_credits: bool,
    pub debits_posted: u128,
    pub credits_posted: u128,
    pub debits_pending: u128,
    pub credits_pending: u128,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with zeroed balances.
    pub fn new(
        id: AccountId,
        ledger: u32,
        code: u16,
        owner_id: Option<String>,
        debits_must_not_exceed_credits: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            ledger,
            code,
            owner_id,
            status: AccountStatus::Active,
            debits_must_not_exceed_credits,
            debits_posted: 0,
            credits_posted: 0,
            debits_pending: 0,
            credits_pending: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derive the available/pending/total balance view.
    pub fn balance(&self) -> AccountBalance {
        AccountBalance::from_account(self)
    }

    /// Posted credits minus posted and pending debits; what a debit may spend.
    pub fn spendable(&self) -> i128 {
        self.credits_posted as i128 - self.debits_posted as i128 - self.debits_pending as i128
    }

    /// Apply a status change, enforcing the monotonic transition rule.
    pub fn set_status(&mut self, next: AccountStatus) -> Result<(), TypeError> {
        if !self.status.can_transition_to(next) {
            return Err(TypeError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account::new(AccountId::generate(), 840, 1, Some("owner-1".into()), true)
    }

    #[test]
    fn new_account_is_active_with_zero_balances() {
        let a = account();
        assert_eq!(a.status, AccountStatus::Active);
        assert_eq!(a.debits_posted, 0);
        assert_eq!(a.credits_posted, 0);
        assert_eq!(a.balance().total, 0);
    }

    #[test]
    fn frozen_and_active_alternate() {
        let mut a = account();
        a.set_status(AccountStatus::Frozen).unwrap();
        a.set_status(AccountStatus::Active).unwrap();
        a.set_status(AccountStatus::Frozen).unwrap();
        assert_eq!(a.status, AccountStatus::Frozen);
    }

    #[test]
    fn closed_is_terminal() {
        let mut a = account();
        a.set_status(AccountStatus::Closed).unwrap();
        let err = a.set_status(AccountStatus::Active).unwrap_err();
        assert!(matches!(err, TypeError::InvalidStatusTransition { .. }));
        assert_eq!(a.status, AccountStatus::Closed);
    }

    #[test]
    fn only_active_accepts_transfers() {
        assert!(AccountStatus::Active.accepts_transfers());
        assert!(!AccountStatus::Frozen.accepts_transfers());
        assert!(!AccountStatus::Closed.accepts_transfers());
    }

    #[test]
    fn spendable_subtracts_pending_holds() {
        let mut a = account();
        a.credits_posted = 1_000;
        a.debits_posted = 300;
        a.debits_pending = 200;
        assert_eq!(a.spendable(), 500);
    }
}
