//! Generic bounded retry with exponential backoff.
//!
//! Detection needs to wait out a host page that renders its order UI
//! asynchronously. The policy is explicit configuration so the waiting
//! behavior can be tested on a paused clock, independent of what is being
//! retried.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::debug;

/// Errors produced when a retried operation never succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("timed out after {limit:?}")]
    TimedOut { limit: Duration },
}

/// Bounded retry schedule: capped exponential backoff under an overall
/// deadline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles each retry after that
    pub base_delay: Duration,
    /// Ceiling on any single backoff delay
    pub max_delay: Duration,
    /// Deadline across all attempts and delays
    pub overall_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_millis(2000),
            overall_timeout: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retry number `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op` until it yields a value, retrying per `policy`.
///
/// `op` signals "not ready yet" by returning `None`; any terminal failure
/// should be modeled inside the returned value instead.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let attempts = async {
        let mut attempt = 0;
        loop {
            if let Some(value) = op().await {
                return Ok(value);
            }
            if attempt >= policy.max_retries {
                return Err(RetryError::Exhausted {
                    attempts: attempt + 1,
                });
            }
            let delay = policy.backoff_delay(attempt);
            debug!(attempt, ?delay, "attempt failed, backing off");
            sleep(delay).await;
            attempt += 1;
        }
    };

    match timeout(policy.overall_timeout, attempts).await {
        Ok(outcome) => outcome,
        Err(_) => Err(RetryError::TimedOut {
            limit: policy.overall_timeout,
        }),
    }
}
