//! Integration tests for `rlenable simulate`: full runs against the
//! in-memory cloud.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn rlenable(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rlenable"));
    cmd.env("NO_COLOR", "1")
        .env("RLENABLE_CONFIG", dir.path().join("config.yaml"));
    cmd
}

#[test]
fn test_simulate_clean_run_succeeds() {
    let dir = TempDir::new().expect("temp dir");
    rlenable(&dir)
        .args(["simulate", "--instances", "3", "--interval-ms", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All servers enabled."));
}

#[test]
fn test_simulate_json_report_has_summary() {
    let dir = TempDir::new().expect("temp dir");
    let assert = rlenable(&dir)
        .args([
            "simulate",
            "--instances",
            "2",
            "--flaky-lookups",
            "3",
            "--interval-ms",
            "1",
            "--json",
        ])
        .assert()
        .success();
    let v: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid json");
    assert_eq!(v["summary"]["members"], 2);
    assert_eq!(v["summary"]["clean"], true);
    assert_eq!(
        v["report"]["phases"].as_array().expect("phases").len(),
        7
    );
}

#[test]
fn test_simulate_stranded_exits_two() {
    let dir = TempDir::new().expect("temp dir");
    rlenable(&dir)
        .args([
            "simulate",
            "--instances",
            "2",
            "--stranded",
            "1",
            "--interval-ms",
            "1",
        ])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("stranded in booting"));
}

#[test]
fn test_simulate_abort_on_rejected_update_fails() {
    let dir = TempDir::new().expect("temp dir");
    rlenable(&dir)
        .args([
            "simulate",
            "--rejected-updates",
            "1",
            "--abort-on-apply-failure",
            "--interval-ms",
            "1",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Remaining instances were left stopped"));
}

#[test]
fn test_simulate_rejects_more_stranded_than_instances() {
    let dir = TempDir::new().expect("temp dir");
    rlenable(&dir)
        .args(["simulate", "--instances", "1", "--stranded", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--stranded cannot exceed --instances"));
}
