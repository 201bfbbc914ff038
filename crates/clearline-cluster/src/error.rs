/// Transport and availability failures. Retried with backoff up to the
/// configured bound, then surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("replica {addr} unreachable: {reason}")]
    Unreachable { addr: String, reason: String },

    #[error("request to {addr} timed out")]
    Timeout { addr: String },

    #[error("cluster manager is not connected")]
    NotConnected,

    #[error("no healthy connections in the pool")]
    PoolEmpty,

    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("invalid cluster configuration: {0}")]
    Config(String),
}
