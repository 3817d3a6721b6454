//! Domain types and validators for rlenable configuration.
//!
//! Pure functions only; no I/O, no async, no filesystem access.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::enablement::ApplyFailurePolicy;
use crate::domain::error::ConfigError;
use crate::domain::userdata::{DEFAULT_CLOUD_TYPE, DEFAULT_SCRIPT_URL};

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "control_plane.endpoint",
    "control_plane.token_credential",
    "control_plane.request_timeout_secs",
    "polling.interval_secs",
    "polling.ready_timeout_secs",
    "polling.stop_timeout_secs",
    "polling.start_timeout_secs",
    "lookup.max_attempts",
    "lookup.delay_ms",
    "lookup.backoff",
    "enablement.on_apply_failure",
    "enablement.script_url",
    "enablement.cloud_type",
];

/// Poll interval observed in production runs.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Literal accepted by optional keys to clear them.
pub const NONE_VALUE: &str = "none";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.rlenable/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct EnablerConfig {
    pub control_plane: ControlPlaneConfig,
    pub polling: PollingConfig,
    pub lookup: LookupConfig,
    pub enablement: EnablementConfig,
}

/// Control-plane API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// API base URL, e.g. `https://us-3.rightscale.com`.
    pub endpoint: String,
    /// Name of the credential holding the API bearer token.
    pub token_credential: String,
    pub request_timeout_secs: u64,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://us-3.rightscale.com".to_string(),
            token_credential: "RS_ACCESS_TOKEN".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Convergence wait settings. Timeouts default to unbounded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timeout_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            ready_timeout_secs: None,
            stop_timeout_secs: None,
            start_timeout_secs: None,
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Per-item lookup retry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LookupConfig {
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    pub delay_ms: u64,
    pub backoff: Backoff,
}

/// Growth of the delay between lookup retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// `delay_ms` every time.
    #[default]
    Fixed,
    /// `delay_ms * n` before the n-th retry.
    Linear,
    /// `delay_ms * 2^(n-1)` before the n-th retry.
    Exponential,
}

impl FromStr for Backoff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            other => Err(format!("unknown backoff '{other}'")),
        }
    }
}

impl fmt::Display for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fixed => "fixed",
            Self::Linear => "linear",
            Self::Exponential => "exponential",
        })
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(40),
            delay_ms: 1000,
            backoff: Backoff::Fixed,
        }
    }
}

/// Enablement payload and policy settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnablementConfig {
    pub on_apply_failure: ApplyFailurePolicy,
    pub script_url: String,
    pub cloud_type: String,
}

impl Default for EnablementConfig {
    fn default() -> Self {
        Self {
            on_apply_failure: ApplyFailurePolicy::Log,
            script_url: DEFAULT_SCRIPT_URL.to_string(),
            cloud_type: DEFAULT_CLOUD_TYPE.to_string(),
        }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let invalid = |expected: &str| -> anyhow::Error {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
        .into()
    };
    match key {
        "control_plane.endpoint" | "enablement.script_url" => {
            if !value.starts_with("https://") || value.len() <= "https://".len() {
                return Err(invalid("an https:// URL"));
            }
        }
        "control_plane.token_credential" | "enablement.cloud_type" => {
            if value.trim().is_empty() || value.chars().any(char::is_whitespace) {
                return Err(invalid("a non-empty name without whitespace"));
            }
        }
        "control_plane.request_timeout_secs" | "polling.interval_secs" | "lookup.delay_ms" => {
            if !matches!(value.parse::<u64>(), Ok(n) if n > 0) {
                return Err(invalid("a positive integer"));
            }
        }
        "polling.ready_timeout_secs" | "polling.stop_timeout_secs" | "polling.start_timeout_secs" => {
            if value != NONE_VALUE && !matches!(value.parse::<u64>(), Ok(n) if n > 0) {
                return Err(invalid("a positive integer or 'none'"));
            }
        }
        "lookup.max_attempts" => {
            if value != NONE_VALUE && !matches!(value.parse::<u32>(), Ok(n) if n > 0) {
                return Err(invalid("a positive integer or 'none'"));
            }
        }
        "lookup.backoff" => {
            if value.parse::<Backoff>().is_err() {
                return Err(invalid("fixed, linear, exponential"));
            }
        }
        "enablement.on_apply_failure" => {
            if value.parse::<ApplyFailurePolicy>().is_err() {
                return Err(invalid("log, abort"));
            }
        }
        _ => validate_config_key(key)?,
    }
    Ok(())
}

/// Validate and store a value under a dotted key.
///
/// # Errors
///
/// Returns an error if the key or value is invalid.
pub fn apply_config_value(config: &mut EnablerConfig, key: &str, value: &str) -> Result<()> {
    validate_config_key(key)?;
    validate_config_value(key, value)?;

    let optional_u64 = |v: &str| (v != NONE_VALUE).then(|| v.parse::<u64>()).transpose();

    match key {
        "control_plane.endpoint" => config.control_plane.endpoint = value.to_string(),
        "control_plane.token_credential" => {
            config.control_plane.token_credential = value.to_string();
        }
        "control_plane.request_timeout_secs" => {
            config.control_plane.request_timeout_secs = value.parse()?;
        }
        "polling.interval_secs" => config.polling.interval_secs = value.parse()?,
        "polling.ready_timeout_secs" => config.polling.ready_timeout_secs = optional_u64(value)?,
        "polling.stop_timeout_secs" => config.polling.stop_timeout_secs = optional_u64(value)?,
        "polling.start_timeout_secs" => config.polling.start_timeout_secs = optional_u64(value)?,
        "lookup.max_attempts" => {
            config.lookup.max_attempts = (value != NONE_VALUE)
                .then(|| value.parse::<u32>())
                .transpose()?;
        }
        "lookup.delay_ms" => config.lookup.delay_ms = value.parse()?,
        "lookup.backoff" => {
            config.lookup.backoff = value.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }
        "enablement.on_apply_failure" => {
            config.enablement.on_apply_failure = value
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
        }
        "enablement.script_url" => config.enablement.script_url = value.to_string(),
        "enablement.cloud_type" => config.enablement.cloud_type = value.to_string(),
        _ => validate_config_key(key)?,
    }
    Ok(())
}

/// Flatten a config into `(key, value)` rows in whitelist order.
#[must_use]
pub fn config_entries(config: &EnablerConfig) -> Vec<(&'static str, String)> {
    let opt = |v: Option<u64>| v.map_or_else(|| NONE_VALUE.to_string(), |n| n.to_string());
    VALID_CONFIG_KEYS
        .iter()
        .map(|key| {
            let value = match *key {
                "control_plane.endpoint" => config.control_plane.endpoint.clone(),
                "control_plane.token_credential" => config.control_plane.token_credential.clone(),
                "control_plane.request_timeout_secs" => {
                    config.control_plane.request_timeout_secs.to_string()
                }
                "polling.interval_secs" => config.polling.interval_secs.to_string(),
                "polling.ready_timeout_secs" => opt(config.polling.ready_timeout_secs),
                "polling.stop_timeout_secs" => opt(config.polling.stop_timeout_secs),
                "polling.start_timeout_secs" => opt(config.polling.start_timeout_secs),
                "lookup.max_attempts" => opt(config.lookup.max_attempts.map(u64::from)),
                "lookup.delay_ms" => config.lookup.delay_ms.to_string(),
                "lookup.backoff" => config.lookup.backoff.to_string(),
                "enablement.on_apply_failure" => config.enablement.on_apply_failure.to_string(),
                "enablement.script_url" => config.enablement.script_url.clone(),
                "enablement.cloud_type" => config.enablement.cloud_type.clone(),
                _ => String::new(),
            };
            (*key, value)
        })
        .collect()
}

// ── Unit tests ───────────────────────────────────────────────────────────────
