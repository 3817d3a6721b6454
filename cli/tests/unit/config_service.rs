//! Tests for the `config_service` application service.

#![allow(clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use rlenable_cli::application::ports::ConfigStore;
use rlenable_cli::application::services::config_service::{load_config, set_value};
use rlenable_cli::domain::config::EnablerConfig;
use rlenable_cli::domain::enablement::ApplyFailurePolicy;
use rlenable_cli::infra::config::YamlConfigStore;

// ── Mock: in-memory config store ──────────────────────────────────────────────

#[derive(Default)]
struct MemoryConfigStore {
    stored: Mutex<Option<EnablerConfig>>,
    saves: Mutex<u32>,
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<EnablerConfig> {
        Ok(self.stored.lock().expect("lock").clone().unwrap_or_default())
    }

    fn save(&self, config: &EnablerConfig) -> Result<()> {
        *self.stored.lock().expect("lock") = Some(config.clone());
        *self.saves.lock().expect("lock") += 1;
        Ok(())
    }

    fn path(&self) -> Result<PathBuf> {
        Ok(PathBuf::from("/memory/config.yaml"))
    }
}

#[test]
fn set_value_persists_parsed_value() {
    let store = MemoryConfigStore::default();

    let cfg = set_value(&store, "enablement.on_apply_failure", "abort").expect("set");

    assert_eq!(cfg.enablement.on_apply_failure, ApplyFailurePolicy::Abort);
    assert_eq!(
        load_config(&store).expect("load").enablement.on_apply_failure,
        ApplyFailurePolicy::Abort
    );
}

#[test]
fn set_value_none_clears_optional_key() {
    let store = MemoryConfigStore::default();
    set_value(&store, "polling.stop_timeout_secs", "600").expect("set");

    let cfg = set_value(&store, "polling.stop_timeout_secs", "none").expect("clear");

    assert_eq!(cfg.polling.stop_timeout_secs, None);
}

#[test]
fn invalid_value_writes_nothing() {
    let store = MemoryConfigStore::default();

    assert!(set_value(&store, "polling.interval_secs", "0").is_err());
    assert!(set_value(&store, "no.such_key", "1").is_err());

    assert_eq!(*store.saves.lock().expect("lock"), 0);
}

#[test]
fn yaml_store_round_trips_through_service() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = YamlConfigStore::at(dir.path().join("config.yaml"));

    set_value(&store, "lookup.max_attempts", "none").expect("set");
    set_value(&store, "control_plane.endpoint", "https://us-4.rightscale.com").expect("set");

    let cfg = load_config(&store).expect("load");
    assert_eq!(cfg.lookup.max_attempts, None);
    assert_eq!(cfg.control_plane.endpoint, "https://us-4.rightscale.com");
}
