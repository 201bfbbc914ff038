//! Ledger engine boundary for Clearline.
//!
//! The clearing core is a *client* of an authoritative double-entry ledger
//! engine. This crate defines that boundary:
//! - [`LedgerEngine`]: the consumed wire contract (batch account/transfer
//!   creation with per-item results, lookups, liveness probe)
//! - [`InMemoryEngine`]: a faithful in-process implementation for tests and
//!   embedding, including pending-transfer holds and timeout-driven expiry

pub mod error;
pub mod memory;
pub mod traits;

pub use error::EngineError;
pub use memory::InMemoryEngine;
pub use traits::LedgerEngine;
