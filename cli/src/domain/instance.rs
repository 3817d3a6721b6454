//! Instance and batch domain types.
//!
//! An instance carries two identities: a stable `ResourceUid` that survives
//! stop/start, and a transient `InstanceHandle` that the control plane
//! reissues on every stop/start. Batches are keyed by uid only.

use std::fmt;
use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::BatchError;

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Provider identifier (e.g. `i-0abc123`). Stable across lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceUid(String);

impl ResourceUid {
    /// Parse and validate a resource UID.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidUid`] if the value contains whitespace,
    /// quotes, or other characters no provider uses in identifiers.
    #[allow(clippy::expect_used)] // Pattern is a compile-time constant
    pub fn parse(raw: &str) -> Result<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN
            .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:/-]*$").expect("valid pattern"));
        if !re.is_match(raw) {
            return Err(BatchError::InvalidUid(raw.to_string()).into());
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transient reference to an instance (an API href). Invalidated by stop/start.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceHandle(String);

impl InstanceHandle {
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self(href.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The cloud an instance belongs to (a cloud href such as `/api/clouds/1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CloudScope(String);

impl CloudScope {
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self(href.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CloudScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Provider-reported lifecycle state. Open-ended: states the workflow does not
/// act on are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InstanceState {
    Operational,
    /// The provider's at-rest designation for a stopped instance.
    Provisioned,
    Stranded,
    StrandedInBooting,
    Other(String),
}

impl InstanceState {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Operational => "operational",
            Self::Provisioned => "provisioned",
            Self::Stranded => "stranded",
            Self::StrandedInBooting => "stranded in booting",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for InstanceState {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "operational" => Self::Operational,
            "provisioned" => Self::Provisioned,
            "stranded" => Self::Stranded,
            "stranded in booting" => Self::StrandedInBooting,
            _ => Self::Other(raw.to_string()),
        }
    }
}

impl From<String> for InstanceState {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<InstanceState> for String {
    fn from(state: InstanceState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Instance ──────────────────────────────────────────────────────────────────

/// A point-in-time view of one cloud instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub resource_uid: ResourceUid,
    pub handle: InstanceHandle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub state: InstanceState,
    pub cloud: CloudScope,
}

impl Instance {
    /// `name` when present and non-blank, otherwise the resource UID.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => self.resource_uid.as_str(),
        }
    }
}

// ── Batch ─────────────────────────────────────────────────────────────────────

/// Membership of one enablement run: the resource UIDs captured at batch
/// start, in first-seen order and without duplicates, plus their cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    uids: Vec<ResourceUid>,
    cloud: CloudScope,
}

impl Batch {
    /// Capture membership from an initial instance listing.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Empty`] for an empty listing and
    /// [`BatchError::MixedClouds`] when instances span more than one cloud.
    pub fn capture(instances: &[Instance]) -> Result<Self> {
        let first = instances.first().ok_or(BatchError::Empty)?;
        let cloud = first.cloud.clone();
        let mut uids: Vec<ResourceUid> = Vec::with_capacity(instances.len());
        for instance in instances {
            if instance.cloud != cloud {
                return Err(BatchError::MixedClouds {
                    first: cloud.to_string(),
                    other: instance.cloud.to_string(),
                }
                .into());
            }
            if !uids.contains(&instance.resource_uid) {
                uids.push(instance.resource_uid.clone());
            }
        }
        Ok(Self { uids, cloud })
    }

    #[must_use]
    pub fn uids(&self) -> &[ResourceUid] {
        &self.uids
    }

    #[must_use]
    pub fn cloud(&self) -> &CloudScope {
        &self.cloud
    }

    /// Member count. Never zero: [`Self::capture`] rejects empty listings.
    #[must_use]
    pub fn size(&self) -> usize {
        self.uids.len()
    }
}
