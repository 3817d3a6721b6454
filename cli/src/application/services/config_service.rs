//! Application service: configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::{EnablerConfig, apply_config_value};

/// Load configuration.
pub fn load_config(store: &impl ConfigStore) -> Result<EnablerConfig> {
    store.load()
}

/// Validate `value` for `key`, store it, and return the updated config.
///
/// # Errors
///
/// Returns an error if the key or value is invalid, or if the store fails.
/// Nothing is written when validation fails.
pub fn set_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<EnablerConfig> {
    let mut config = store.load()?;
    apply_config_value(&mut config, key, value)?;
    store.save(&config)?;
    Ok(config)
}
