//! Cluster manager for the Clearline obligation clearing core.
//!
//! Owns a bounded pool of connections to ledger engine replicas, probes their
//! liveness, and hands healthy connections to callers round-robin. Transport
//! failures are retried with bounded backoff and then surfaced as typed
//! [`ConnectionError`]s. Nothing in this crate mutates ledger state.

pub mod config;
pub mod error;
pub mod loopback;
pub mod manager;
pub mod retry;

pub use config::ClusterConfig;
pub use error::ConnectionError;
pub use loopback::LoopbackConnector;
pub use manager::{ClusterManager, EngineConnector};
pub use retry::RetryPolicy;
