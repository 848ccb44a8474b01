//! Timeout and retry policy for calls to external model providers.

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::llm::LlmError;
use crate::rate_limit::RateLimiter;

#[derive(Debug, Clone, Copy)]
pub struct CallPolicy {
    /// Upper bound on a single attempt.
    pub timeout: Duration,
    /// Retries after the first attempt, for transient failures only.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl CallPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(Duration::MAX)
    }
}

/// Run `op` under `policy`, passing through `limiter` before every attempt.
///
/// Timeouts, transport errors and 5xx responses are retried; quota and other
/// provider errors are returned as soon as they happen.
pub async fn call<T, F, Fut>(
    policy: &CallPolicy,
    limiter: Option<&RateLimiter>,
    label: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        if let Some(limiter) = limiter {
            limiter.acquire().await;
        }

        let err = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => Error::from(e),
            Err(_) => Error::Timeout(policy.timeout),
        };

        if attempt >= policy.max_retries || !err.is_transient() {
            return Err(err);
        }

        let delay = policy.backoff(attempt);
        tracing::warn!(
            call = label,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "provider call failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
