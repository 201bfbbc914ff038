use std::sync::Arc;

use async_trait::async_trait;

use clearline_engine::LedgerEngine;

use crate::error::ConnectionError;
use crate::manager::EngineConnector;

/// Connector that hands out an already-constructed engine for every address.
///
/// Used for embedding an in-process engine and for exercising the pool,
/// retry, and client layers against a real engine without a network.
pub struct LoopbackConnector {
    engine: Arc<dyn LedgerEngine>,
}

impl LoopbackConnector {
    pub fn new(engine: Arc<dyn LedgerEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EngineConnector for LoopbackConnector {
    async fn connect(&self, _addr: &str) -> Result<Arc<dyn LedgerEngine>, ConnectionError> {
        Ok(self.engine.clone())
    }
}
