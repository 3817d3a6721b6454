//! Batch state tracker.
//!
//! Tracks a batch by resource UID and re-resolves every member from the
//! control plane on each observation. Handles returned by one observation
//! are only valid until the next lifecycle action; nothing here keeps them.

use anyhow::{Context, Result};

use crate::application::ports::InstanceQuery;
use crate::application::services::poller::{PollOptions, Probe, wait_until};
use crate::application::services::retry::{RetryPolicy, retry_lookup};
use crate::domain::convergence::ConvergenceCondition;
use crate::domain::error::LookupError;
use crate::domain::instance::{Batch, CloudScope, Instance, InstanceState, ResourceUid};

/// Look up `uid` once, rejecting an answer for any other instance.
///
/// # Errors
///
/// Returns the port's error, or [`LookupError::Mismatch`] if the control
/// plane answered with a different resource UID.
pub async fn find_member(
    query: &impl InstanceQuery,
    cloud: &CloudScope,
    uid: &ResourceUid,
) -> Result<Instance> {
    let found = query
        .find_by_uid(cloud, uid)
        .await
        .with_context(|| format!("cannot look up {uid} in {cloud}"))?;
    if found.resource_uid != *uid {
        return Err(LookupError::Mismatch {
            requested: uid.to_string(),
            returned: found.resource_uid.to_string(),
        }
        .into());
    }
    Ok(found)
}

/// Re-resolves batch members by UID against the control plane.
pub struct BatchTracker<'a, Q> {
    query: &'a Q,
    batch: &'a Batch,
    retry: RetryPolicy,
}

impl<'a, Q: InstanceQuery> BatchTracker<'a, Q> {
    #[must_use]
    pub fn new(query: &'a Q, batch: &'a Batch, retry: RetryPolicy) -> Self {
        Self {
            query,
            batch,
            retry,
        }
    }

    /// One fresh observation of every member, in batch order.
    ///
    /// Each member is looked up independently; a failed lookup is retried
    /// under the tracker's [`RetryPolicy`] before the scan continues.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Exhausted`] if a member cannot be resolved
    /// within the retry budget.
    pub async fn snapshot(&self) -> Result<Vec<Instance>> {
        let cloud = self.batch.cloud();
        let mut observed = Vec::with_capacity(self.batch.size());
        for uid in self.batch.uids() {
            let query = self.query;
            let instance =
                retry_lookup(uid.as_str(), &self.retry, move || find_member(query, cloud, uid))
                    .await?;
            observed.push(instance);
        }
        Ok(observed)
    }

    /// Poll until `condition` holds over a fresh snapshot, checking
    /// immediately and then once per interval.
    ///
    /// # Errors
    ///
    /// Returns a lookup error from [`Self::snapshot`], or
    /// [`crate::domain::error::ConvergenceError::Timeout`] if `opts.timeout`
    /// elapses.
    pub async fn wait_for_state(
        &self,
        what: &str,
        condition: &ConvergenceCondition,
        opts: &PollOptions,
    ) -> Result<Vec<Instance>> {
        wait_until(what, opts, || async move {
            let instances = self.snapshot().await?;
            let tally = condition.evaluate(instances.iter().map(|i| &i.state));
            Ok::<_, anyhow::Error>(if tally.is_met() {
                Probe::Ready(instances)
            } else {
                Probe::Pending(tally.to_string())
            })
        })
        .await
    }

    /// Sleep, re-scan every member, keep those in `expected`; repeat until
    /// every member is kept. Each round starts from an empty set.
    ///
    /// # Errors
    ///
    /// Returns a lookup error from [`Self::snapshot`], or
    /// [`crate::domain::error::ConvergenceError::Timeout`] if `opts.timeout`
    /// elapses.
    pub async fn reconcile(
        &self,
        expected: &InstanceState,
        opts: &PollOptions,
    ) -> Result<Vec<Instance>> {
        let what = format!("batch to reach '{expected}'");
        let opts = opts.delay_first();
        let target = self.batch.size();
        wait_until(&what, &opts, || async move {
            let reached: Vec<Instance> = self
                .snapshot()
                .await?
                .into_iter()
                .filter(|i| i.state == *expected)
                .collect();
            Ok::<_, anyhow::Error>(if reached.len() == target {
                Probe::Ready(reached)
            } else {
                Probe::Pending(format!("{}/{target} {expected}", reached.len()))
            })
        })
        .await
    }
}
