//! Foundation types for the Clearline obligation clearing core.
//!
//! This crate provides the data model shared by every other Clearline crate:
//! identifiers, accounts, transfers, clearing intents, and derived balances.
//!
//! # Key Types
//!
//! - [`AccountId`] / [`TransferId`]: opaque 128-bit identifiers (UUIDv4-derived)
//! - [`Account`]: a balance-holding participant within a ledger namespace
//! - [`Transfer`]: an atomic, balanced movement of value between two accounts
//! - [`ClearingIntent`]: a caller-identified request to move money, keyed by
//!   an idempotency key
//! - [`AccountBalance`]: available/pending/total, derived from posted and
//!   pending totals
//! - [`TransferAudit`]: immutable observation record of a finalized clearing

pub mod account;
pub mod audit;
pub mod balance;
pub mod error;
pub mod id;
pub mod intent;
pub mod transfer;

pub use account::{Account, AccountStatus};
pub use audit::{ClearingStatus, TransferAudit};
pub use balance::AccountBalance;
pub use error::TypeError;
pub use id::{AccountId, TransferId};
pub use intent::{ClearingIntent, CorrelationKey};
pub use transfer::{Transfer, TransferFlag, TransferState};
