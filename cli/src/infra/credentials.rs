//! Credential stores.
//!
//! The file store reads a flat YAML map of name → secret. An environment
//! variable `RLENABLE_CRED_<NAME>` overrides the file entry of the same name.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::CredentialStore;
use crate::domain::error::CredentialError;

/// Prefix of credential override environment variables.
pub const ENV_PREFIX: &str = "RLENABLE_CRED_";

/// Environment variable name that overrides credential `name`.
#[must_use]
pub fn env_var_for(name: &str) -> String {
    let suffix: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{ENV_PREFIX}{suffix}")
}

/// Credentials from `~/.rlenable/credentials.yaml` plus environment overrides.
#[derive(Debug, Default)]
pub struct FileCredentialStore {
    path: Option<PathBuf>,
    use_env: bool,
}

impl FileCredentialStore {
    /// Store at `$RLENABLE_CREDENTIALS` or the default location, with
    /// environment overrides enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: None,
            use_env: true,
        }
    }

    /// Store backed by a fixed file, ignoring the environment.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            use_env: false,
        }
    }

    /// Location of the credentials file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var("RLENABLE_CREDENTIALS") {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".rlenable").join("credentials.yaml"))
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }
}

impl CredentialStore for FileCredentialStore {
    fn get_secret(&self, name: &str) -> Result<String> {
        if self.use_env {
            match std::env::var(env_var_for(name)) {
                Ok(value) if !value.is_empty() => {
                    tracing::debug!(credential = name, "credential read from environment");
                    return Ok(value);
                }
                _ => {}
            }
        }
        self.load()?
            .remove(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CredentialError::NotFound(name.to_string()).into())
    }
}

/// Fixed in-memory credentials.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentialStore {
    secrets: BTreeMap<String, String>,
}

impl StaticCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

impl CredentialStore for StaticCredentialStore {
    fn get_secret(&self, name: &str) -> Result<String> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound(name.to_string()).into())
    }
}
