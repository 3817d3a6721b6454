//! Convergence poller: re-evaluate a live check until it holds.
//!
//! Cooperative: every wait is a `tokio::time::sleep` on the calling task.
//! Each round calls the check again so it always sees fresh data. Without a
//! timeout the poller waits forever; with one it raises
//! [`ConvergenceError::Timeout`] once the bound elapses.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;

use crate::domain::error::ConvergenceError;

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Condition holds; carries the observation that satisfied it.
    Ready(T),
    /// Not yet; carries a short description of what was observed.
    Pending(String),
}

/// Poll cadence and bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Option<Duration>,
    /// Sleep one interval before the first check.
    pub delay_first: bool,
}

impl PollOptions {
    #[must_use]
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
            delay_first: false,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn delay_first(mut self) -> Self {
        self.delay_first = true;
        self
    }
}

/// Block until `check` reports [`Probe::Ready`], re-checking no more often
/// than `opts.interval`.
///
/// # Errors
///
/// Propagates any error returned by `check`, and returns
/// [`ConvergenceError::Timeout`] if `opts.timeout` elapses first.
pub async fn wait_until<T, F, Fut>(what: &str, opts: &PollOptions, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>>>,
{
    let started = Instant::now();
    let deadline = opts.timeout.map(|t| started + t);
    let mut last_observed = String::from("no observation yet");

    if opts.delay_first {
        pause(what, opts, deadline, started, &last_observed).await?;
    }

    let mut round: u64 = 0;
    loop {
        round += 1;
        match check().await? {
            Probe::Ready(value) => {
                tracing::debug!(what, round, "condition met");
                return Ok(value);
            }
            Probe::Pending(observed) => {
                tracing::debug!(what, round, %observed, "condition pending");
                last_observed = observed;
            }
        }
        pause(what, opts, deadline, started, &last_observed).await?;
    }
}

/// Sleep one interval, clipped to the deadline. Fails once the deadline has
/// passed.
async fn pause(
    what: &str,
    opts: &PollOptions,
    deadline: Option<Instant>,
    started: Instant,
    last_observed: &str,
) -> Result<()> {
    let nap = match deadline {
        None => opts.interval,
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                return Err(ConvergenceError::Timeout {
                    what: what.to_string(),
                    waited: now - started,
                    last_observed: last_observed.to_string(),
                }
                .into());
            }
            opts.interval.min(deadline - now)
        }
    };
    tokio::time::sleep(nap).await;
    Ok(())
}
