//! Reconciliation observer for the Clearline obligation clearing core.
//!
//! Periodically compares correlation-tagged ledger transfers against the
//! records an external honoring adapter reports, and classifies every
//! disagreement. Strictly read-only: the observer never repairs, resubmits,
//! or mutates anything. Its output is a report for operators.

pub mod adapter;
pub mod error;
pub mod observer;

pub use adapter::{AdapterRecord, AdapterRecords};
pub use error::ReconError;
pub use observer::{Discrepancy, ReconReport, ReconciliationObserver};
