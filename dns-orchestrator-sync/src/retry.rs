//! Bounded retry with exponential backoff
//!
//! Transient failures (network, timeout, 429, 5xx) are retried; everything
//! else, including cancellation and rejected credentials, is returned at once.
//! Attempts are bounded both by count and by total elapsed time.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::context::CallContext;
use crate::error::{Result, SyncError};

/// Retry limits for calls routed through the authenticated transport.
///
/// # Default
///
/// 3 tries, 5 seconds total, backoff 100ms doubling up to 10 seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_tries: u32,
    /// Maximum wall time spent across all attempts and waits.
    #[serde(with = "crate::utils::serde_time::duration_millis")]
    pub max_elapsed: Duration,
    /// Wait before the second attempt.
    #[serde(with = "crate::utils::serde_time::duration_millis")]
    pub initial_interval: Duration,
    /// Upper bound for a single wait.
    #[serde(with = "crate::utils::serde_time::duration_millis")]
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 3,
            max_elapsed: Duration::from_secs(5),
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_tries: 1,
            ..Self::default()
        }
    }

    /// Exponential backoff: `initial_interval * 2^attempt`, capped at `max_interval`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let capped_attempt = attempt.min(20); // Prevent 2^attempt from overflowing
        self.initial_interval
            .saturating_mul(1_u32 << capped_attempt)
            .min(self.max_interval)
    }

    /// Wait before the next attempt after `error`.
    ///
    /// A `Retry-After` hint from a rate-limited response wins over the
    /// exponential schedule but is still capped at `max_interval`.
    fn retry_delay(&self, error: &SyncError, attempt: u32) -> Duration {
        if let SyncError::RateLimited {
            retry_after: Some(secs),
            ..
        } = error
        {
            Duration::from_secs(*secs).min(self.max_interval)
        } else {
            self.backoff_delay(attempt)
        }
    }
}

/// Run `op` under `policy`, stopping early when `ctx` is cancelled.
///
/// Each attempt is raced against the context, and so is every backoff wait:
/// a cancellation surfaces immediately as [`SyncError::Cancelled`] or
/// [`SyncError::DeadlineExceeded`].
pub async fn retry<T, F, Fut>(
    ctx: &CallContext,
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let max_tries = policy.max_tries.max(1);
    let mut attempt = 0;

    loop {
        let error = match ctx.run(op()).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        attempt += 1;

        if !error.is_retryable() {
            return Err(error);
        }
        if attempt >= max_tries {
            log::warn!("{what} failed after {attempt} attempt(s): {error}");
            return Err(error);
        }

        let delay = policy.retry_delay(&error, attempt - 1);
        if started.elapsed() + delay > policy.max_elapsed {
            log::warn!(
                "{what} failed, retry budget of {:.1}s exhausted: {error}",
                policy.max_elapsed.as_secs_f32()
            );
            return Err(error);
        }

        log::warn!(
            "{what} failed (attempt {attempt}/{max_tries}), retrying in {:.1}s: {error}",
            delay.as_secs_f32()
        );
        ctx.sleep(delay).await?;
    }
}
