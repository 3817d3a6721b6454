//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::PathBuf;

use anyhow::Result;

use crate::domain::config::EnablerConfig;
use crate::domain::enablement::ServerReport;
use crate::domain::identity::SessionIdentity;
use crate::domain::instance::{CloudScope, Instance, ResourceUid};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Raw response of an attribute update. Non-2xx statuses are returned, not
/// raised, so the caller's apply-failure policy decides what happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeResponse {
    pub status: u16,
    pub body: String,
}

impl AttributeResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ── Control-Plane Port Traits ─────────────────────────────────────────────────

/// Batch lifecycle actions. Fire-and-forget: a successful return means the
/// control plane accepted the request, not that the transition happened.
#[allow(async_fn_in_trait)]
pub trait InstanceControl {
    /// Request a stop for every instance.
    async fn stop(&self, instances: &[Instance]) -> Result<()>;
    /// Request a start for every instance.
    async fn start(&self, instances: &[Instance]) -> Result<()>;
}

/// Eventually-consistent reads.
#[allow(async_fn_in_trait)]
pub trait InstanceQuery {
    /// Look up the instance carrying `uid` within `cloud`.
    ///
    /// May fail transiently while the instance's handle is being reissued.
    async fn find_by_uid(&self, cloud: &CloudScope, uid: &ResourceUid) -> Result<Instance>;
    /// List every server registered in `deployment`.
    async fn list_servers(&self, deployment: &str) -> Result<Vec<ServerReport>>;
}

/// Instance attribute updates.
#[allow(async_fn_in_trait)]
pub trait AttributeWriter {
    /// Set `key` to `value` on the instance carrying `uid`. The value must
    /// already be transport-safe.
    async fn update_instance_attribute(
        &self,
        cloud: &CloudScope,
        uid: &ResourceUid,
        key: &str,
        value: &str,
    ) -> Result<AttributeResponse>;
}

/// Composite trait: any type implementing all three sub-traits is a `ControlPlane`.
pub trait ControlPlane: InstanceControl + InstanceQuery + AttributeWriter {}

/// Blanket implementation: any type implementing all three sub-traits is a `ControlPlane`.
impl<T> ControlPlane for T where T: InstanceControl + InstanceQuery + AttributeWriter {}

// ── Identity and Secrets ──────────────────────────────────────────────────────

/// Named secret lookup. Sync trait; secrets are local.
pub trait CredentialStore {
    /// Fetch the secret stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::error::CredentialError::NotFound`] if absent.
    fn get_secret(&self, name: &str) -> Result<String>;
}

/// Resolves who the API token belongs to.
#[allow(async_fn_in_trait)]
pub trait IdentityResolver {
    async fn whoami(&self) -> Result<SessionIdentity>;
}

/// Produces the per-instance configuration payload.
#[allow(async_fn_in_trait)]
pub trait PayloadBuilder {
    /// Build a transport-safe payload. Identical inputs yield identical output.
    async fn build_payload(
        &self,
        template_ref: &str,
        display_name: &str,
        auth_ref: &str,
    ) -> Result<String>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait; no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Configuration Port ────────────────────────────────────────────────────────

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when none is stored.
    fn load(&self) -> Result<EnablerConfig>;
    /// Persist the configuration.
    fn save(&self, config: &EnablerConfig) -> Result<()>;
    /// Location of the backing file.
    fn path(&self) -> Result<PathBuf>;
}
