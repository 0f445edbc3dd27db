// crates/contract-gate-cli/tests/cli.rs
// ============================================================================
// Module: CLI Tests
// Description: End-to-end tests for the contract-gate binary.
// ============================================================================
//! ## Overview
//! Runs the compiled binary against temporary manifests and sources and
//! checks exit codes and output.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::path::Path;
use std::process::Command;
use std::process::Output;

const MANIFEST: &str = r"
manifest_version: '1.0'
contracts:
  - id: auth-token
    producer: auth-service
    consumer: web-client
    protocol: http
    endpoints:
      - path: /oauth/token
        method: POST
        request:
          fields:
            - { name: grant_type, type: string, required: true }
            - { name: client_id, type: string, required: true }
        response:
          fields:
            - { name: access_token, type: string, required: true }
        status_codes: [200]
";

const CLIENT: &str = "export async function token(id: string) {\n  const res = await fetch('/oauth/token', { method: 'POST', body: JSON.stringify({ client_id: id }) });\n  return res.status;\n}\n";

fn contract_gate(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_contract-gate"))
        .args(args)
        .current_dir(cwd)
        .env_remove("CONTRACT_GATE_CONFIG")
        .output()
        .expect("binary runs")
}

#[test]
fn check_exits_one_when_violations_are_found() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("contracts.yaml"), MANIFEST).unwrap();
    fs::create_dir_all(dir.path().join("web")).unwrap();
    fs::write(dir.path().join("web/api.ts"), CLIENT).unwrap();

    let output = contract_gate(&["check", "-m", "contracts.yaml", "web"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("error[CTR-request-shape]"));
    assert!(stdout.contains("grant_type"));
    assert!(stdout.contains("result: fail"));
}

#[test]
fn check_exits_two_on_invalid_manifest() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("contracts.yaml"), "contracts: [").unwrap();
    fs::write(dir.path().join("api.ts"), CLIENT).unwrap();

    let output = contract_gate(&["check", "-m", "contracts.yaml", "--format", "json", "api.ts"], dir.path());
    assert_eq!(output.status.code(), Some(2));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["outcome"], "error");
    assert_eq!(report["violations"].as_array().map(Vec::len), Some(0));
}

#[test]
fn manifest_and_config_validation_commands() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("contracts.yaml"), MANIFEST).unwrap();
    let output = contract_gate(&["manifest", "validate", "contracts.yaml"], dir.path());
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8(output.stdout).unwrap().contains("1 contracts, 1 endpoints"));

    fs::write(dir.path().join("bad.toml"), "[engine]\nmax_workers = 0\n").unwrap();
    let output = contract_gate(&["config", "validate", "--config", "bad.toml"], dir.path());
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8(output.stderr).unwrap().contains("engine.max_workers"));

    let output = contract_gate(&["config", "validate"], dir.path());
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn rules_list_applies_config_overrides() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("contract-gate.toml"), "[rules.\"TQ-negative-cases\"]\nseverity = \"off\"\n").unwrap();
    let output = contract_gate(&["rules", "list"], dir.path());
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let line = stdout.lines().find(|line| line.starts_with("TQ-negative-cases")).unwrap();
    assert!(line.split_whitespace().nth(1) == Some("off"));
    assert!(stdout.lines().any(|line| line.starts_with("CTR-request-shape")));
}
