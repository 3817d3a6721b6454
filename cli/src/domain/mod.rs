//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod convergence;
pub mod enablement;
pub mod error;
pub mod identity;
pub mod instance;
pub mod userdata;

pub use config::{EnablerConfig, apply_config_value, validate_config_key, validate_config_value};
pub use convergence::{ConvergenceCondition, Tally};
pub use enablement::{
    ApplyFailurePolicy, BatchPhase, ConfigureStatus, EnableReport, MemberReport, PhaseLog,
    PhaseRecord, ServerReport,
};
pub use error::{
    BatchError, ConfigError, ConvergenceError, CredentialError, EnableError, IdentityError,
    LookupError, UserDataError,
};
pub use identity::SessionIdentity;
pub use instance::{Batch, CloudScope, Instance, InstanceHandle, InstanceState, ResourceUid};
