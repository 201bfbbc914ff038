//! Clearing coordinator for the Clearline obligation clearing core.
//!
//! This crate is where an intent to move money becomes an irrevocable,
//! idempotent transfer. It provides:
//! - [`ClearingCoordinator`]: `submit_obligation` / `record_counter_obligation`
//!   with end-to-end idempotency and a hard finality barrier
//! - [`IntentJournal`]: durable dedup index for idempotency keys,
//!   write-ahead framed, surviving process restart
//! - [`FeeCalculator`]: pure fee composition consulted before clearing
//! - [`HonoringAdapter`]: best-effort external honoring, attempted only
//!   after finality and never able to unwind it
//! - [`DispatchQueue`] / [`NarrativeMirror`]: bounded fire-and-forget feed
//!   of finalized clearings with a drop-oldest overflow policy
//! - [`ReviewQueue`]: honoring failures queued for reconciliation

pub mod coordinator;
pub mod error;
pub mod fees;
pub mod honoring;
pub mod journal;
pub mod mirror;
pub mod queue;
pub mod review;

pub use coordinator::{
    ClearingConfig, ClearingCoordinator, ClearingOutcome, ClearingResult, CounterObligation,
};
pub use error::{ClearingError, JournalError};
pub use fees::{ClearingType, FeeCalculator, FeeLine, FeeQuote, FeeRequest, RiskLevel, StandardFeeCalculator};
pub use honoring::{HonoringAdapter, HonoringError, HonoringReceipt, HonoringRequest};
pub use journal::{IntentJournal, JournalRecord, RecoveredIntent};
pub use mirror::{InMemoryMirror, MirrorError, NarrativeMirror};
pub use queue::DispatchQueue;
pub use review::{ReviewEntry, ReviewQueue};
