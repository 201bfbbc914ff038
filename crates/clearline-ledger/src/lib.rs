//! Ledger clients for the Clearline obligation clearing core.
//!
//! Three read/write surfaces over the cluster manager:
//! - [`AccountRegistry`]: creates and looks up accounts; maps external
//!   owners to ledger account identifiers via an [`OwnerDirectory`]
//! - [`TransferLedger`]: immediate and two-phase transfers, single and
//!   batch, with transfer-level validation
//! - [`BalanceQuery`]: derived available/pending/total balances

pub mod balance;
pub mod directory;
pub mod error;
pub mod registry;
pub mod transfers;

pub use balance::BalanceQuery;
pub use directory::{InMemoryOwnerDirectory, OwnerDirectory};
pub use error::LedgerClientError;
pub use registry::{AccountRegistry, AccountSpec};
pub use transfers::{TransferLedger, TransferSpec};
