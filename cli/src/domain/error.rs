//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::time::Duration;

use thiserror::Error;

// ── Batch errors ──────────────────────────────────────────────────────────────

/// Errors raised while capturing batch membership.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("Batch is empty. Pass at least one instance resource UID.")]
    Empty,

    #[error("Batch spans more than one cloud: '{first}' and '{other}'. Run one batch per cloud.")]
    MixedClouds { first: String, other: String },

    #[error("Invalid resource UID '{0}': must match ^[A-Za-z0-9][A-Za-z0-9._:/-]*$")]
    InvalidUid(String),
}

// ── Convergence errors ────────────────────────────────────────────────────────

/// Raised when an optional wait bound elapses before a condition holds.
#[derive(Debug, Error)]
pub enum ConvergenceError {
    #[error("Timed out after {}s waiting for {what} (last observed: {last_observed})", waited.as_secs())]
    Timeout {
        what: String,
        waited: Duration,
        last_observed: String,
    },
}

// ── Lookup errors ─────────────────────────────────────────────────────────────

/// Raised when a capped per-item lookup keeps failing.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Lookup of {target} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        target: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Lookup for '{requested}' returned a different instance '{returned}'")]
    Mismatch { requested: String, returned: String },
}

// ── Credential errors ─────────────────────────────────────────────────────────

/// Errors related to credential lookup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error(
        "Credential with name, {0}, was not found. Add it to the credentials file or set RLENABLE_CRED_<NAME>."
    )]
    NotFound(String),
}

// ── Identity errors ───────────────────────────────────────────────────────────

/// Errors resolving the calling session's identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Account is hosted on unknown shard '{0}'")]
    UnknownShard(String),

    #[error("Malformed session response: {0}")]
    Malformed(String),
}

// ── User-data errors ──────────────────────────────────────────────────────────

/// Errors rendering the enablement user-data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserDataError {
    #[error("Value for {field} contains characters that cannot be passed to the enablement script: {value:?}")]
    UnsafeValue { field: &'static str, value: String },

    #[error("Value for {field} must not be empty")]
    Empty { field: &'static str },
}

// ── Enablement errors ─────────────────────────────────────────────────────────

/// Errors that halt an enablement run.
#[derive(Debug, Error)]
pub enum EnableError {
    #[error("Applying user-data to {instance} failed: {reason}. Remaining instances were left stopped.")]
    ApplyFailed { instance: String, reason: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nExpected: {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}
