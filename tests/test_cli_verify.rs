//! CLI contract tests
//!
//! Drives the hostwatch binary against temp config trees and checks exit
//! codes, error reporting, and summary output.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn write_tree(dir: &std::path::Path) -> std::path::PathBuf {
    fs::write(
        dir.join("objects.cfg"),
        "define host {\n\thost_name h1\n\taddress 10.0.0.1\n}\n\
         define host {\n\thost_name h2\n\taddress 10.0.0.2\n}\n\
         define hostgroup {\n\thostgroup_name all\n\tmembers *\n}\n\
         define service {\n\thostgroup_name all\n\tservice_description ping\n\tcheck_command check_ping\n}\n",
    )
    .unwrap();
    let root = dir.join("main.cfg");
    fs::write(&root, "cfg_file=objects.cfg\n").unwrap();
    root
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("hostwatch").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verify"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("hostwatch").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_requires_config() {
    let mut cmd = Command::cargo_bin("hostwatch").unwrap();
    cmd.assert().failure();
}

#[test]
fn test_verify_success_summary() {
    let dir = tempdir().unwrap();
    let root = write_tree(dir.path());

    let mut cmd = Command::cargo_bin("hostwatch").unwrap();
    cmd.args(["--config", root.to_str().unwrap(), "--verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"))
        .stdout(predicate::str::is_match(r"Hosts:\s+2").unwrap())
        .stdout(predicate::str::is_match(r"Services:\s+2").unwrap());
}

#[test]
fn test_verify_reports_file_and_line() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("objects.cfg"),
        "define host {\n\thost_name h1\n\twibble 1\n}\n",
    )
    .unwrap();
    let root = dir.path().join("main.cfg");
    fs::write(&root, "cfg_file=objects.cfg\n").unwrap();

    let mut cmd = Command::cargo_bin("hostwatch").unwrap();
    cmd.args(["--config", root.to_str().unwrap(), "--verify"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("objects.cfg:3"))
        .stderr(predicate::str::contains("wibble"));
}

#[test]
fn test_json_summary() {
    let dir = tempdir().unwrap();
    let root = write_tree(dir.path());

    let mut cmd = Command::cargo_bin("hostwatch").unwrap();
    let assert = cmd
        .args(["--config", root.to_str().unwrap(), "--json"])
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(report["registered"]["hosts"], 2);
    assert_eq!(report["registered"]["services"], 2);
    assert_eq!(report["registered"]["hostgroups"], 1);
    assert!(report["duration_ms"].is_number());
}

#[test]
fn test_objects_subset() {
    let dir = tempdir().unwrap();
    let root = write_tree(dir.path());

    // Only hosts and hostgroups requested: the service block is consumed
    // but never parsed or registered.
    let mut cmd = Command::cargo_bin("hostwatch").unwrap();
    let assert = cmd
        .args([
            "--config",
            root.to_str().unwrap(),
            "--objects",
            "hosts,hostgroups",
            "--json",
        ])
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(report["registered"]["hosts"], 2);
    assert_eq!(report["registered"]["services"], 0);
}

#[test]
fn test_unknown_objects_token_fails() {
    let mut cmd = Command::cargo_bin("hostwatch").unwrap();
    cmd.args(["--config", "whatever.cfg", "--objects", "gadgets"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown object kind"));
}

#[test]
fn test_cache_write_and_precached_reload() {
    let dir = tempdir().unwrap();
    let root = write_tree(dir.path());
    let cache = dir.path().join("objects.cache");

    let mut cmd = Command::cargo_bin("hostwatch").unwrap();
    cmd.args([
        "--config",
        root.to_str().unwrap(),
        "--cache",
        cache.to_str().unwrap(),
        "--quiet",
    ])
    .assert()
    .success();

    let cache_text = fs::read_to_string(&cache).unwrap();
    assert!(cache_text.contains("define host {"));
    assert!(cache_text.contains("host_name\th1"));

    // The cache reloads as flat pre-sorted input and registers the same
    // object counts.
    let mut cmd = Command::cargo_bin("hostwatch").unwrap();
    let assert = cmd
        .args([
            "--config",
            cache.to_str().unwrap(),
            "--precached",
            "--json",
        ])
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(report["registered"]["hosts"], 2);
    assert_eq!(report["registered"]["services"], 2);
    assert_eq!(report["registered"]["hostgroups"], 1);
}
