//! Bounded retry for single-item lookups.
//!
//! A lookup can fail while the control plane is reissuing an instance's
//! handle. The failed call is retried on its own; every retry is logged.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

pub use crate::domain::config::Backoff;
use crate::domain::config::LookupConfig;
use crate::domain::error::LookupError;

/// How many times a lookup may be attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. `None` never gives up.
    pub max_attempts: Option<u32>,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: Option<u32>, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Whether another attempt is allowed after `failures` failed ones.
    #[must_use]
    pub fn should_retry(&self, failures: u32) -> bool {
        self.max_attempts.is_none_or(|max| failures < max)
    }

    /// Delay before the retry that follows the `failures`-th failure (1-based).
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        let n = failures.max(1);
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay.saturating_mul(n),
            Backoff::Exponential => self
                .delay
                .saturating_mul(2u32.saturating_pow(n.saturating_sub(1))),
        }
    }
}

impl Default for RetryPolicy {
    /// 40 attempts, one second apart.
    fn default() -> Self {
        Self::new(Some(40), Duration::from_secs(1))
    }
}

impl From<&LookupConfig> for RetryPolicy {
    fn from(cfg: &LookupConfig) -> Self {
        Self::new(cfg.max_attempts, Duration::from_millis(cfg.delay_ms)).with_backoff(cfg.backoff)
    }
}

/// Run `lookup` until it succeeds or the policy is exhausted.
///
/// # Errors
///
/// Returns [`LookupError::Exhausted`] carrying the last failure once
/// `policy.max_attempts` attempts have failed.
pub async fn retry_lookup<T, F, Fut>(target: &str, policy: &RetryPolicy, mut lookup: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut failures: u32 = 0;
    loop {
        match lookup().await {
            Ok(value) => {
                if failures > 0 {
                    tracing::debug!(item = target, failures, "lookup recovered");
                }
                return Ok(value);
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                if !policy.should_retry(failures) {
                    return Err(LookupError::Exhausted {
                        target: target.to_string(),
                        attempts: failures,
                        last_error: format!("{e:#}"),
                    }
                    .into());
                }
                let delay = policy.delay_for(failures);
                tracing::warn!(
                    item = target,
                    attempt = failures,
                    retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %format!("{e:#}"),
                    "lookup failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
