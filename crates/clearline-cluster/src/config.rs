use std::env;
use std::time::Duration;

use crate::error::ConnectionError;

/// Configuration for the cluster manager.
///
/// Built explicitly or from the environment; there is no process-wide
/// singleton. Recognized variables: `CLUSTER_ID`, `REPLICA_ADDRESSES`
/// (comma-separated), `MAX_CONNECTIONS`, `REQUEST_TIMEOUT_MS`,
/// `RETRY_DELAY_MS`, `MAX_RETRIES`.
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    pub cluster_id: u32,
    pub replica_addresses: Vec<String>,
    pub max_connections: usize,
    pub request_timeout: Duration,
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_id: 0,
            replica_addresses: vec!["127.0.0.1:3000".into()],
            max_connections: 4,
            request_timeout: Duration::from_millis(5_000),
            retry_delay: Duration::from_millis(250),
            max_retries: 3,
        }
    }
}

impl ClusterConfig {
    /// Read configuration from the environment, falling back to defaults for
    /// unset variables.
    pub fn from_env() -> Result<Self, ConnectionError> {
        let mut config = Self::default();

        if let Ok(v) = env::var("CLUSTER_ID") {
            config.cluster_id = parse(&v, "CLUSTER_ID")?;
        }
        if let Ok(v) = env::var("REPLICA_ADDRESSES") {
            let addresses: Vec<String> = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if addresses.is_empty() {
                return Err(ConnectionError::Config(
                    "REPLICA_ADDRESSES must list at least one address".into(),
                ));
            }
            config.replica_addresses = addresses;
        }
        if let Ok(v) = env::var("MAX_CONNECTIONS") {
            config.max_connections = parse(&v, "MAX_CONNECTIONS")?;
            if config.max_connections == 0 {
                return Err(ConnectionError::Config(
                    "MAX_CONNECTIONS must be at least 1".into(),
                ));
            }
        }
        if let Ok(v) = env::var("REQUEST_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(parse(&v, "REQUEST_TIMEOUT_MS")?);
        }
        if let Ok(v) = env::var("RETRY_DELAY_MS") {
            config.retry_delay = Duration::from_millis(parse(&v, "RETRY_DELAY_MS")?);
        }
        if let Ok(v) = env::var("MAX_RETRIES") {
            config.max_retries = parse(&v, "MAX_RETRIES")?;
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, ConnectionError> {
    value
        .parse()
        .map_err(|_| ConnectionError::Config(format!("{name}: cannot parse {value:?}")))
}
