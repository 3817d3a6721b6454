//! Application service: batch enablement use-case.
//!
//! Drives a batch through stop → configure → start. Each step is a barrier:
//! the next one begins only after the control plane reports the batch has
//! converged. Imports only from `crate::domain` and `crate::application`.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::Instant;

use crate::application::ports::{ControlPlane, InstanceQuery, PayloadBuilder, ProgressReporter};
use crate::application::services::injector::configure_batch;
use crate::application::services::poller::{PollOptions, Probe, wait_until};
use crate::application::services::retry::{RetryPolicy, retry_lookup};
use crate::application::services::tracker::{BatchTracker, find_member};
use crate::domain::config::{DEFAULT_POLL_INTERVAL_SECS, PollingConfig};
use crate::domain::convergence::ConvergenceCondition;
use crate::domain::enablement::{ApplyFailurePolicy, BatchPhase, EnableReport, PhaseLog, ServerReport};
use crate::domain::instance::{Batch, CloudScope, Instance, InstanceState, ResourceUid};

/// Poll cadence and optional bounds for each barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub interval: Duration,
    pub ready_timeout: Option<Duration>,
    pub stop_timeout: Option<Duration>,
    /// Shared by the registration and terminal-state waits.
    pub start_timeout: Option<Duration>,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            ready_timeout: None,
            stop_timeout: None,
            start_timeout: None,
        }
    }
}

impl From<&PollingConfig> for Timing {
    fn from(cfg: &PollingConfig) -> Self {
        Self {
            interval: cfg.interval(),
            ready_timeout: cfg.ready_timeout_secs.map(Duration::from_secs),
            stop_timeout: cfg.stop_timeout_secs.map(Duration::from_secs),
            start_timeout: cfg.start_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Inputs of one enablement run besides the ports.
#[derive(Debug, Clone)]
pub struct EnableOptions<'a> {
    /// Deployment whose servers the started instances register into.
    pub deployment: &'a str,
    /// Server template the enablement script registers against.
    pub template_ref: &'a str,
    /// Credential name of the token handed to the enablement script.
    pub auth_ref: &'a str,
    pub timing: Timing,
    pub retry: RetryPolicy,
    pub on_apply_failure: ApplyFailurePolicy,
}

/// Look up the current record of each uid in `cloud`.
///
/// # Errors
///
/// Returns [`crate::domain::error::LookupError::Exhausted`] if any uid cannot
/// be found within the retry policy.
pub async fn resolve_instances(
    query: &impl InstanceQuery,
    cloud: &CloudScope,
    uids: &[ResourceUid],
    retry: &RetryPolicy,
) -> Result<Vec<Instance>> {
    let mut instances = Vec::with_capacity(uids.len());
    for uid in uids {
        let instance =
            retry_lookup(uid.as_str(), retry, move || find_member(query, cloud, uid)).await?;
        tracing::debug!(uid = %uid, handle = %instance.handle, state = %instance.state, "resolved");
        instances.push(instance);
    }
    Ok(instances)
}

/// Enable every instance in `instances`.
///
/// The run converges once every registered server reaches a terminal state,
/// including `stranded`; the report carries per-member outcomes.
///
/// # Errors
///
/// Returns an error if the batch is empty or spans clouds, if a control-plane
/// call fails, if a lookup exhausts its retries, if a configured timeout
/// elapses, or if an apply failure occurs under
/// [`ApplyFailurePolicy::Abort`]. Nothing is rolled back.
pub async fn enable_batch(
    control_plane: &impl ControlPlane,
    builder: &impl PayloadBuilder,
    reporter: &impl ProgressReporter,
    instances: &[Instance],
    opts: &EnableOptions<'_>,
) -> Result<EnableReport> {
    let batch = Batch::capture(instances)?;
    let size = batch.size();
    let started_at = Utc::now();
    let mut phases = PhaseLog::start(started_at);
    let tracker = BatchTracker::new(control_plane, &batch, opts.retry);
    let poll = |timeout| PollOptions::every(opts.timing.interval).with_timeout(timeout);

    tracing::info!(
        size,
        cloud = %batch.cloud(),
        deployment = opts.deployment,
        "enablement started"
    );

    // Pre-check.
    enter(reporter, phases.current(), size);
    let ready = tracker
        .wait_for_state(
            "batch to become operational",
            &ConvergenceCondition::ready(size),
            &poll(opts.timing.ready_timeout),
        )
        .await?;

    // Stop.
    enter(reporter, phases.advance(Utc::now()), size);
    control_plane
        .stop(&ready)
        .await
        .context("stop request failed")?;
    let stopped = tracker
        .reconcile(&InstanceState::Provisioned, &poll(opts.timing.stop_timeout))
        .await?;
    enter(reporter, phases.advance(Utc::now()), size);
    reporter.success(&format!("{size} instance(s) stopped"));

    // Configure.
    enter(reporter, phases.advance(Utc::now()), size);
    let members = configure_batch(
        control_plane,
        builder,
        reporter,
        &stopped,
        opts.template_ref,
        opts.auth_ref,
        opts.on_apply_failure,
    )
    .await?;

    // Start. Handles seen before configuring may already be stale.
    enter(reporter, phases.advance(Utc::now()), size);
    let current = tracker.snapshot().await?;
    control_plane
        .start(&current)
        .await
        .context("start request failed")?;
    let start_clock = Instant::now();

    enter(reporter, phases.advance(Utc::now()), size);
    wait_until(
        "servers to register",
        &poll(opts.timing.start_timeout),
        move || async move {
            let servers = control_plane
                .list_servers(opts.deployment)
                .await
                .with_context(|| format!("cannot list servers of {}", opts.deployment))?;
            Ok::<_, anyhow::Error>(if servers.len() == size {
                Probe::Ready(())
            } else {
                Probe::Pending(format!("{}/{size} servers registered", servers.len()))
            })
        },
    )
    .await?;

    let remaining = opts
        .timing
        .start_timeout
        .map(|t| t.saturating_sub(start_clock.elapsed()));
    let terminal = &ConvergenceCondition::terminal(size);
    let servers: Vec<ServerReport> = wait_until(
        "servers to reach a terminal state",
        &poll(remaining),
        move || async move {
            let servers = control_plane
                .list_servers(opts.deployment)
                .await
                .with_context(|| format!("cannot list servers of {}", opts.deployment))?;
            let tally = terminal.evaluate(servers.iter().map(|s| &s.state));
            Ok::<_, anyhow::Error>(if tally.is_met() {
                Probe::Ready(servers)
            } else {
                Probe::Pending(tally.to_string())
            })
        },
    )
    .await?;
    enter(reporter, phases.advance(Utc::now()), size);

    let report = EnableReport {
        deployment: opts.deployment.to_string(),
        started_at,
        finished_at: Utc::now(),
        phases: phases.into_records(),
        members,
        servers,
    };

    let stranded = report.stranded();
    if stranded > 0 {
        tracing::warn!(stranded, "some servers ended stranded");
        reporter.warn(&format!("{stranded} server(s) ended stranded"));
    } else {
        reporter.success(&format!("{size} server(s) operational"));
    }
    tracing::info!(
        apply_failures = report.apply_failures(),
        stranded,
        "enablement finished"
    );
    Ok(report)
}

fn enter(reporter: &impl ProgressReporter, phase: BatchPhase, size: usize) {
    tracing::info!(%phase, size, "phase entered");
    if phase != BatchPhase::Stopped && phase != BatchPhase::Converged {
        reporter.step(&format!("{}...", phase.describe()));
    }
}
