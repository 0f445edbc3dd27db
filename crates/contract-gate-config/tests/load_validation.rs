//! Config load validation tests for contract-gate-config.
// crates/contract-gate-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards and limit checks.
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use contract_gate_config::AuditSinkKind;
use contract_gate_config::ConfigError;
use contract_gate_config::ContractGateConfig;
use contract_gate_core::rules::RuleLevel;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<ContractGateConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn write_config(text: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(text.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(ContractGateConfig::load(Some(path)), "config path component too long")
}

#[test]
fn load_rejects_missing_explicit_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("contract-gate.toml");
    assert_invalid(ContractGateConfig::load(Some(&path)), "config io error")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let file = write_config(&"#".repeat(1_048_577))?;
    assert_invalid(ContractGateConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(ContractGateConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_rejects_unknown_sections() -> TestResult {
    let file = write_config("[server]\nport = 1\n")?;
    assert_invalid(ContractGateConfig::load(Some(file.path())), "config parse error")
}

#[test]
fn load_rejects_out_of_range_limits() -> TestResult {
    let cases = [
        ("[engine]\nmax_workers = 0\n", "engine.max_workers"),
        ("[engine]\nmax_workers = 257\n", "engine.max_workers"),
        ("[engine]\nunit_timeout_ms = 5\n", "engine.unit_timeout_ms"),
        ("[engine]\nmax_unit_bytes = 16777217\n", "engine.max_unit_bytes"),
        ("[correlator]\nunit_mismatch_cutoff = 0.0\n", "unit_mismatch_cutoff"),
        ("[correlator]\nunit_mismatch_cutoff = 0.5\nadvisory_floor = 0.6\n", "advisory_floor"),
    ];
    for (text, needle) in cases {
        assert_invalid(ContractGateConfig::parse(text), needle)?;
    }
    Ok(())
}

#[test]
fn load_rejects_unknown_rules_and_bad_codebases() -> TestResult {
    assert_invalid(ContractGateConfig::parse("[rules.\"CTR-made-up\"]\nseverity = \"warn\"\n"), "unknown rule")?;
    assert_invalid(ContractGateConfig::parse("[rules.\"CTR-request-shape\"]\nseverity = \"loud\"\n"), "parse")?;
    assert_invalid(
        ContractGateConfig::parse("[[codebases]]\nid = \"web\"\npaths = []\n"),
        "codebases.web.paths must be non-empty",
    )?;
    assert_invalid(
        ContractGateConfig::parse(
            "[[codebases]]\nid = \"web\"\npaths = [\"a\"]\n[[codebases]]\nid = \"web\"\npaths = [\"b\"]\n",
        ),
        "duplicate id",
    )
}

#[test]
fn full_config_converts_into_engine_settings() -> TestResult {
    let file = write_config(
        r#"
[engine]
max_workers = 4
unit_timeout_ms = 250
max_unit_bytes = 2048
follow_symlinks = true

[correlator]
unit_mismatch_cutoff = 0.8
advisory_floor = 0.3

[suppression]
enabled = false

[audit]
sink = "stderr"

[rules."CTR-response-shape"]
severity = "warn"

[rules."TQ-negative-cases"]
severity = "off"

[[codebases]]
id = "auth-service"
paths = ["services/auth"]
"#,
    )?;
    let config = ContractGateConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    let settings = config.engine_settings();
    if settings.max_workers != 4
        || settings.unit_timeout != Duration::from_millis(250)
        || settings.max_unit_bytes != 2048
        || !settings.follow_symlinks
        || settings.suppression_enabled
    {
        return Err("engine limits were not carried over".to_string());
    }
    if (settings.correlator.unit_mismatch_cutoff - 0.8).abs() > f64::EPSILON {
        return Err("cutoff was not carried over".to_string());
    }
    if settings.rule_levels.get("CTR-response-shape") != Some(&RuleLevel::Warn)
        || settings.rule_levels.get("TQ-negative-cases") != Some(&RuleLevel::Off)
    {
        return Err("rule levels were not carried over".to_string());
    }
    if settings.codebases.len() != 1 || settings.codebases[0].paths != vec!["services/auth".to_string()] {
        return Err("codebases were not carried over".to_string());
    }
    if config.audit.sink != AuditSinkKind::Stderr {
        return Err("audit sink was not carried over".to_string());
    }
    Ok(())
}

#[test]
fn file_audit_sink_opens_configured_path() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let log = dir.path().join("audit.jsonl");
    let text = format!("[audit]\nsink = \"file\"\npath = \"{}\"\n", log.display());
    let config = ContractGateConfig::parse(&text).map_err(|err| err.to_string())?;
    config.audit.open_sink().map_err(|err| err.to_string())?;
    if !log.exists() {
        return Err("audit file was not created".to_string());
    }
    Ok(())
}
