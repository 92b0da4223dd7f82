//! Integration tests for the berth CLI skeleton: help, version and the
//! input checks `init` performs before touching the network.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn berth() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("berth"));
    cmd.env("NO_COLOR", "1").env_remove("BERTH_CONFIG");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help() {
    // clap with arg_required_else_help shows help on stderr and exits 2
    berth()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Provision a VPS to host your apps"));
}

#[test]
fn test_cli_help_lists_commands() {
    berth()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    berth()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("berth"));
}

#[test]
fn test_init_help_shows_flags() {
    berth()
        .args(["init", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--server"))
        .stdout(predicate::str::contains("--email"))
        .stdout(predicate::str::contains("--name"))
        .stdout(predicate::str::contains("--yes"));
}

#[test]
fn test_unknown_command_fails() {
    berth().arg("launch").assert().failure();
}

// --- init input validation (fails before any SSH activity) ---

fn init_in(dir: &TempDir) -> Command {
    let mut cmd = berth();
    cmd.arg("init")
        .env("BERTH_CONFIG", dir.path().join("default.yaml"));
    cmd
}

#[test]
fn test_init_rejects_invalid_address() {
    let dir = TempDir::new().expect("temp dir");
    init_in(&dir)
        .args(["-y", "-n", "box1", "-s", "300.1.2.3", "-e", "a@b.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("incorrect IPv4 address - 300.1.2.3"));
    assert!(!dir.path().join("default.yaml").exists());
}

#[test]
fn test_init_rejects_invalid_email() {
    let dir = TempDir::new().expect("temp dir");
    init_in(&dir)
        .args(["-y", "-n", "box1", "-s", "203.0.113.5", "-e", "not-an-email"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid email address"));
}

#[test]
fn test_init_noninteractive_requires_server() {
    let dir = TempDir::new().expect("temp dir");
    init_in(&dir)
        .args(["-y", "-n", "box1", "-e", "a@b.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--server is required"));
}

#[test]
fn test_init_ci_env_is_noninteractive() {
    let dir = TempDir::new().expect("temp dir");
    init_in(&dir)
        .env("CI", "1")
        .args(["-n", "box1", "-s", "203.0.113.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--email is required"));
}

#[test]
fn test_init_rejects_outdated_config() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join("default.yaml"),
        "address: 198.51.100.4\ncertEmail: me@example.com\n",
    )
    .expect("write legacy");
    init_in(&dir)
        .args(["-y", "-n", "box1", "-s", "203.0.113.5", "-e", "a@b.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("berth config migrate"));
}

// --- Colour handling ---

const ONE_CONTEXT: &str = "\
version: '1'
currentContext: box1
contexts:
- name: box1
  server: box1
servers:
- name: box1
  address: 203.0.113.5
  certEmail: a@b.com
";

#[test]
fn test_no_color_env_accepts_any_value() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("default.yaml");
    std::fs::write(&path, ONE_CONTEXT).expect("write registry");
    for value in ["1", "true", "yes", ""] {
        berth()
            .env("NO_COLOR", value)
            .env("BERTH_CONFIG", &path)
            .args(["config", "current"])
            .assert()
            .success()
            .stdout("box1\n")
            .stderr(predicate::str::is_empty());
    }
}

#[test]
fn test_no_color_flag_combines_with_env() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("default.yaml");
    std::fs::write(&path, ONE_CONTEXT).expect("write registry");
    berth()
        .env("BERTH_CONFIG", &path)
        .args(["--no-color", "config", "current"])
        .assert()
        .success()
        .stdout("box1\n");
}
