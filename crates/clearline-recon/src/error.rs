use clearline_cluster::ConnectionError;

/// Errors from a reconciliation pass. Always about reading state, never
/// about mutating it.
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("adapter records unavailable: {0}")]
    Adapter(String),
}
