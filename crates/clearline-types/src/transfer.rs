use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{AccountId, TransferId};
use crate::intent::CorrelationKey;

/// Operation flag carried by a transfer when it is submitted to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferFlag {
    /// Immediate transfer: posts in one step.
    None,
    /// Two-phase transfer: holds funds until posted, voided, or expired.
    Pending,
    /// Post a previously created pending transfer (requires `pending_id`).
    PostPending,
    /// Void a previously created pending transfer (requires `pending_id`).
    VoidPending,
}

/// Terminal and intermediate states of a transfer.
///
/// Immediate transfers skip `Pending` and go directly to `Posted`. `Expired`
/// is reached by the engine when a pending transfer's timeout elapses without
/// an explicit post or void; it is a normal terminal state, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Pending,
    Posted,
    Voided,
    Expired,
}

/// One atomic movement of value between exactly two distinct accounts on the
/// same ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub debit_account_id: AccountId,
    pub credit_account_id: AccountId,
    /// Amount in the ledger's smallest unit. Zero is only legal on
    /// `PostPending`/`VoidPending`, where it means "the full pending amount".
    pub amount: u128,
    pub ledger: u32,
    pub code: u16,
    /// Set only when posting or voiding a pending transfer.
    pub pending_id: Option<TransferId>,
    /// Opaque correlation fields. Used to carry a hash of an application-level
    /// key (intent id, source tag); never meaningful business data.
    pub user_data_128: u128,
    pub user_data_64: u64,
    pub user_data_32: u32,
    /// Seconds before an unresolved pending transfer expires. Only meaningful
    /// when `flags` is `Pending`.
    pub timeout_secs: u32,
    pub flags: TransferFlag,
    pub state: TransferState,
    pub timestamp: DateTime<Utc>,
}

impl Transfer {
    fn base(
        debit_account_id: AccountId,
        credit_account_id: AccountId,
        amount: u128,
        ledger: u32,
        code: u16,
    ) -> Self {
        Self {
            id: TransferId::generate(),
            debit_account_id,
            credit_account_id,
            amount,
            ledger,
            code,
            pending_id: None,
            user_data_128: 0,
            user_data_64: 0,
            user_data_32: 0,
            timeout_secs: 0,
            flags: TransferFlag::None,
            state: TransferState::Posted,
            timestamp: Utc::now(),
        }
    }

    /// An immediate (single-phase) transfer.
    pub fn immediate(
        debit_account_id: AccountId,
        credit_account_id: AccountId,
        amount: u128,
        ledger: u32,
        code: u16,
    ) -> Self {
        Self::base(debit_account_id, credit_account_id, amount, ledger, code)
    }

    /// A two-phase transfer holding funds until resolved or expired.
    pub fn pending(
        debit_account_id: AccountId,
        credit_account_id: AccountId,
        amount: u128,
        ledger: u32,
        code: u16,
        timeout_secs: u32,
    ) -> Self {
        let mut t = Self::base(debit_account_id, credit_account_id, amount, ledger, code);
        t.flags = TransferFlag::Pending;
        t.state = TransferState::Pending;
        t.timeout_secs = timeout_secs;
        t
    }

    /// A resolution transfer converting a pending hold into a posted movement.
    ///
    /// Accounts, amount, and ledger are inherited from the pending transfer by
    /// the engine; the zero placeholders here are filled in on apply.
    pub fn post_pending(pending_id: TransferId) -> Self {
        let mut t = Self::base(AccountId::from_raw(0), AccountId::from_raw(0), 0, 0, 0);
        t.flags = TransferFlag::PostPending;
        t.pending_id = Some(pending_id);
        t
    }

    /// A resolution transfer releasing a pending hold without posting.
    pub fn void_pending(pending_id: TransferId) -> Self {
        let mut t = Self::post_pending(pending_id);
        t.flags = TransferFlag::VoidPending;
        t.state = TransferState::Voided;
        t
    }

    /// Tag this transfer with an application-level correlation key.
    pub fn with_correlation(mut self, key: &CorrelationKey) -> Self {
        self.user_data_128 = key.key_128;
        self.user_data_64 = key.key_64;
        self.user_data_32 = key.key_32;
        self
    }

    /// Whether this transfer resolves an earlier pending transfer.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self.flags,
            TransferFlag::PostPending | TransferFlag::VoidPending
        )
    }

    /// The instant at which a pending transfer expires, if it carries a timeout.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        if self.flags == TransferFlag::Pending && self.timeout_secs > 0 {
            Some(self.timestamp + chrono::Duration::seconds(self.timeout_secs as i64))
        } else {
            None
        }
    }
}
