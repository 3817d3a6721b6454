//! Integration tests for `rlenable payload`.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn rlenable(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rlenable"));
    cmd.env("NO_COLOR", "1")
        .env("RLENABLE_CONFIG", dir.path().join("config.yaml"))
        .env("RLENABLE_CREDENTIALS", dir.path().join("credentials.yaml"))
        .env_remove("RLENABLE_CRED_RS_REFRESH");
    cmd
}

const ARGS: [&str; 11] = [
    "payload",
    "--server-template",
    "Base ServerTemplate",
    "--server-name",
    "web-1",
    "--deployment",
    "Production",
    "--api-host",
    "us-3.rightscale.com",
    "--token-credential",
    "RS_REFRESH",
];

fn with_credentials(dir: &TempDir) {
    std::fs::write(
        dir.path().join("credentials.yaml"),
        "RS_REFRESH: file-refresh-token\n",
    )
    .expect("write credentials");
}

#[test]
fn test_payload_raw_renders_multipart_document() {
    let dir = TempDir::new().expect("temp dir");
    with_credentials(&dir);
    rlenable(&dir)
        .args(ARGS)
        .arg("--raw")
        .assert()
        .success()
        .stdout(predicate::str::contains("#cloud-config"))
        .stdout(predicate::str::contains("aaa_rlenable.sh"))
        .stdout(predicate::str::contains("-k \"file-refresh-token\""))
        .stdout(predicate::str::contains("-t \"Base ServerTemplate\""))
        .stdout(predicate::str::contains("-c \"amazon\""));
}

#[test]
fn test_payload_default_is_transport_safe() {
    let dir = TempDir::new().expect("temp dir");
    with_credentials(&dir);
    let assert = rlenable(&dir).args(ARGS).assert().success();
    let out = String::from_utf8_lossy(&assert.get_output().stdout)
        .trim()
        .to_string();
    assert!(!out.is_empty());
    assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || c == '%'));
}

#[test]
fn test_payload_env_credential_wins_over_file() {
    let dir = TempDir::new().expect("temp dir");
    with_credentials(&dir);
    rlenable(&dir)
        .args(ARGS)
        .arg("--raw")
        .env("RLENABLE_CRED_RS_REFRESH", "env-token")
        .assert()
        .success()
        .stdout(predicate::str::contains("-k \"env-token\""));
}

#[test]
fn test_payload_json_names_encoding() {
    let dir = TempDir::new().expect("temp dir");
    with_credentials(&dir);
    let assert = rlenable(&dir).args(ARGS).arg("--json").assert().success();
    let v: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid json");
    assert_eq!(v["encoding"], "base64");
}

#[test]
fn test_payload_missing_credential_fails() {
    let dir = TempDir::new().expect("temp dir");
    rlenable(&dir)
        .args(ARGS)
        .assert()
        .failure()
        .stderr(predicate::str::contains("was not found"));
}

#[test]
fn test_payload_rejects_shell_metacharacters() {
    let dir = TempDir::new().expect("temp dir");
    with_credentials(&dir);
    let mut args = ARGS;
    args[4] = "web-$(whoami)";
    rlenable(&dir)
        .args(args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("server name"));
}
