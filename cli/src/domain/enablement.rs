//! Enablement run state machine and report types.
//!
//! Pure data: no I/O, no async.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::instance::{InstanceState, ResourceUid};

// ── Phases ────────────────────────────────────────────────────────────────────

/// Per-batch phase. Phases only ever advance, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    PendingReady,
    Stopping,
    Stopped,
    Configuring,
    Starting,
    AwaitingRegistration,
    Converged,
}

impl BatchPhase {
    /// The phase that follows this one, or `None` once converged.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::PendingReady => Some(Self::Stopping),
            Self::Stopping => Some(Self::Stopped),
            Self::Stopped => Some(Self::Configuring),
            Self::Configuring => Some(Self::Starting),
            Self::Starting => Some(Self::AwaitingRegistration),
            Self::AwaitingRegistration => Some(Self::Converged),
            Self::Converged => None,
        }
    }

    /// Short human description used in progress output.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::PendingReady => "waiting for instances to become operational",
            Self::Stopping => "stopping instances",
            Self::Stopped => "instances stopped",
            Self::Configuring => "installing enablement user-data",
            Self::Starting => "starting instances",
            Self::AwaitingRegistration => "waiting for servers to register",
            Self::Converged => "servers reached a terminal state",
        }
    }
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PendingReady => "pending_ready",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Configuring => "configuring",
            Self::Starting => "starting",
            Self::AwaitingRegistration => "awaiting_registration",
            Self::Converged => "converged",
        };
        f.write_str(s)
    }
}

/// One entry of the phase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase: BatchPhase,
    pub entered_at: DateTime<Utc>,
}

/// Phase history of a run. Starts in `PendingReady`; `advance` is the only
/// way to move, so out-of-order transitions cannot be expressed.
#[derive(Debug, Clone)]
pub struct PhaseLog {
    records: Vec<PhaseRecord>,
}

impl PhaseLog {
    #[must_use]
    pub fn start(at: DateTime<Utc>) -> Self {
        Self {
            records: vec![PhaseRecord {
                phase: BatchPhase::PendingReady,
                entered_at: at,
            }],
        }
    }

    #[must_use]
    pub fn current(&self) -> BatchPhase {
        self.records
            .last()
            .map_or(BatchPhase::PendingReady, |r| r.phase)
    }

    /// Move to the next phase. A converged log stays converged.
    pub fn advance(&mut self, at: DateTime<Utc>) -> BatchPhase {
        if let Some(next) = self.current().next() {
            self.records.push(PhaseRecord {
                phase: next,
                entered_at: at,
            });
        }
        self.current()
    }

    #[must_use]
    pub fn records(&self) -> &[PhaseRecord] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<PhaseRecord> {
        self.records
    }
}

// ── Apply failure policy ──────────────────────────────────────────────────────

/// What to do when writing user-data to one instance fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyFailurePolicy {
    /// Log the failure and keep going; the instance restarts without user-data.
    #[default]
    Log,
    /// Halt the run. Instances already stopped stay stopped.
    Abort,
}

impl FromStr for ApplyFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(Self::Log),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown apply-failure policy '{other}'")),
        }
    }
}

impl fmt::Display for ApplyFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Log => "log",
            Self::Abort => "abort",
        })
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Outcome of the configure step for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfigureStatus {
    Applied { payload_sha256: String },
    Failed { reason: String },
}

/// Per-member summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberReport {
    pub resource_uid: ResourceUid,
    pub display_name: String,
    pub configure: ConfigureStatus,
}

/// A server observed in the deployment at convergence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerReport {
    pub name: String,
    pub state: InstanceState,
}

/// Summary of one enablement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnableReport {
    pub deployment: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub phases: Vec<PhaseRecord>,
    pub members: Vec<MemberReport>,
    pub servers: Vec<ServerReport>,
}

impl EnableReport {
    /// Members whose user-data could not be applied.
    #[must_use]
    pub fn apply_failures(&self) -> usize {
        self.members
            .iter()
            .filter(|m| matches!(m.configure, ConfigureStatus::Failed { .. }))
            .count()
    }

    /// Servers that reached a failure-like terminal state.
    #[must_use]
    pub fn stranded(&self) -> usize {
        self.servers
            .iter()
            .filter(|s| {
                matches!(
                    s.state,
                    InstanceState::Stranded | InstanceState::StrandedInBooting
                )
            })
            .count()
    }

    /// `true` when every member was configured and every server is operational.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.apply_failures() == 0
            && self
                .servers
                .iter()
                .all(|s| s.state == InstanceState::Operational)
    }
}
