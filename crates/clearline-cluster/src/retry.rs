use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::ConnectionError;

/// Bounded retry with linear backoff: the delay after failed attempt `n` is
/// the base delay multiplied by `n`.
///
/// Only transport failures go through this policy; validation and
/// idempotency-conflict errors are never retried.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay applied after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Run `op` until it succeeds or the attempt budget (1 initial try plus
    /// `max_retries` retries) is exhausted.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ConnectionError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ConnectionError>>,
    {
        let attempts = self.max_retries + 1;
        let mut last = None;
        for attempt in 1..=attempts {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "transport attempt failed");
                    last = Some(err);
                    if attempt < attempts {
                        sleep(self.delay_for(attempt)).await;
                    }
                }
            }
        }
        Err(ConnectionError::RetriesExhausted {
            attempts,
            last: last
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".into()),
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(250))
    }
}
