//! Bounded retry with exponential backoff for calls that cross a process or
//! network boundary.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::jitter;
use tokio_retry::RetryIf;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delays between attempts: `base * 2^n` capped at `max_delay`, with full jitter.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let base = self.base_delay;
        let max = self.max_delay;
        (0..self.max_attempts.saturating_sub(1) as u32)
            .map(move |n| base.saturating_mul(2u32.saturating_pow(n)).min(max))
            .map(jitter)
    }
}

/// Run `op` under `policy`, retrying only failures reported as transient.
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts;
    let mut attempt = 0usize;

    RetryIf::start(
        policy.delays(),
        || {
            attempt += 1;
            let current = attempt;
            let fut = op();
            async move {
                fut.await.map_err(|e| {
                    if e.is_transient() && current < max_attempts {
                        warn!(
                            "[{}] attempt {}/{} failed: {}. Will retry...",
                            label, current, max_attempts, e
                        );
                    }
                    e
                })
            }
        },
        |e: &Error| e.is_transient(),
    )
    .await
}
