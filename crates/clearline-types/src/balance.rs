use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::id::AccountId;

/// Derived balance view of an account. Never stored; always recomputed from
/// the posted and pending totals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_id: AccountId,
    /// Posted credits minus posted debits.
    pub available: i128,
    /// Pending credits minus pending debits.
    pub pending: i128,
    /// Available plus pending.
    pub total: i128,
}

impl AccountBalance {
    pub fn from_account(account: &Account) -> Self {
        let available = account.credits_posted as i128 - account.debits_posted as i128;
        let pending = account.credits_pending as i128 - account.debits_pending as i128;
        Self {
            account_id: account.id,
            available,
            pending,
            total: available + pending,
        }
    }
}
