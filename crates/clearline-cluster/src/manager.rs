use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use clearline_engine::LedgerEngine;

use crate::config::ClusterConfig;
use crate::error::ConnectionError;
use crate::retry::RetryPolicy;

/// Pluggable transport seam: how the cluster manager turns a replica address
/// into a live engine connection. Production connectors dial the network;
/// tests plug in fakes without touching the pool or retry logic.
#[async_trait]
pub trait EngineConnector: Send + Sync {
    async fn connect(&self, addr: &str) -> Result<Arc<dyn LedgerEngine>, ConnectionError>;
}

struct PoolMember {
    addr: String,
    engine: Arc<dyn LedgerEngine>,
    healthy: AtomicBool,
}

/// Owns a bounded pool of ledger connections and hands out healthy ones
/// round-robin.
///
/// The pool cursor is the only shared mutable resource here; ledger state is
/// mutated exclusively through the engine's own concurrency control. No lock
/// is held across a network call.
pub struct ClusterManager {
    config: ClusterConfig,
    connector: Arc<dyn EngineConnector>,
    retry: RetryPolicy,
    members: RwLock<Vec<Arc<PoolMember>>>,
    cursor: AtomicUsize,
}

impl ClusterManager {
    pub fn new(config: ClusterConfig, connector: Arc<dyn EngineConnector>) -> Self {
        let retry = RetryPolicy::new(config.max_retries, config.retry_delay);
        Self {
            config,
            connector,
            retry,
            members: RwLock::new(Vec::new()),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Establish the pool: up to `max_connections` connections spread across
    /// the replica addresses, each liveness-probed before admission.
    /// Connection failures are retried with backoff; exhaustion fails the
    /// whole call.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        if self.config.replica_addresses.is_empty() {
            return Err(ConnectionError::Config(
                "no replica addresses configured".into(),
            ));
        }

        let mut pool = Vec::with_capacity(self.config.max_connections);
        for slot in 0..self.config.max_connections {
            let addr = &self.config.replica_addresses[slot % self.config.replica_addresses.len()];
            let engine = self
                .retry
                .run(|_| async {
                    let engine = self.connector.connect(addr).await?;
                    let live = timeout(self.config.request_timeout, engine.ping())
                        .await
                        .unwrap_or(false);
                    if live {
                        Ok(engine)
                    } else {
                        Err(ConnectionError::Unreachable {
                            addr: addr.clone(),
                            reason: "liveness probe failed".into(),
                        })
                    }
                })
                .await?;

            debug!(slot, %addr, "pool member connected");
            pool.push(Arc::new(PoolMember {
                addr: addr.clone(),
                engine,
                healthy: AtomicBool::new(true),
            }));
        }

        let count = pool.len();
        *self.members.write().expect("pool lock poisoned") = pool;
        info!(
            cluster_id = self.config.cluster_id,
            connections = count,
            "cluster connected"
        );
        Ok(())
    }

    /// Probe every pool member. Returns `true` if at least one member is
    /// live. Never mutates ledger state.
    pub async fn health_check(&self) -> bool {
        let members: Vec<Arc<PoolMember>> = {
            let guard = self.members.read().expect("pool lock poisoned");
            guard.clone()
        };

        let mut any = false;
        for member in members {
            let live = timeout(self.config.request_timeout, member.engine.ping())
                .await
                .unwrap_or(false);
            member.healthy.store(live, Ordering::Relaxed);
            if !live {
                warn!(addr = %member.addr, "pool member failed health probe");
            }
            any |= live;
        }
        any
    }

    /// A healthy connection, chosen round-robin. Members that failed their
    /// last probe are skipped.
    pub fn get_connection(&self) -> Result<Arc<dyn LedgerEngine>, ConnectionError> {
        self.get_member().map(|m| m.engine.clone())
    }

    fn get_member(&self) -> Result<Arc<PoolMember>, ConnectionError> {
        let members = self.members.read().expect("pool lock poisoned");
        if members.is_empty() {
            return Err(ConnectionError::NotConnected);
        }

        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        for offset in 0..members.len() {
            let member = &members[(start + offset) % members.len()];
            if member.healthy.load(Ordering::Relaxed) {
                return Ok(member.clone());
            }
        }
        Err(ConnectionError::PoolEmpty)
    }

    /// Release every pool member.
    pub fn disconnect(&self) {
        self.members.write().expect("pool lock poisoned").clear();
        info!(cluster_id = self.config.cluster_id, "cluster disconnected");
    }

    /// Number of members currently in the pool.
    pub fn pool_size(&self) -> usize {
        self.members.read().expect("pool lock poisoned").len()
    }

    /// Run an engine operation against the pool with the configured request
    /// timeout and retry policy. Each attempt may land on a different member;
    /// a timed-out member is marked unhealthy until the next probe.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T, ConnectionError>
    where
        F: Fn(Arc<dyn LedgerEngine>) -> Fut + Send + Sync,
        Fut: Future<Output = T> + Send,
        T: Send,
    {
        self.retry
            .run(|_| async {
                let member = self.get_member()?;
                match timeout(self.config.request_timeout, op(member.engine.clone())).await {
                    Ok(value) => Ok(value),
                    Err(_) => {
                        member.healthy.store(false, Ordering::Relaxed);
                        Err(ConnectionError::Timeout {
                            addr: member.addr.clone(),
                        })
                    }
                }
            })
            .await
    }
}
