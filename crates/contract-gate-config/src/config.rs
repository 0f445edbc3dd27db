// crates/contract-gate-config/src/config.rs
// ============================================================================
// Module: Contract Gate Configuration
// Description: Configuration loading and validation for Contract Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: contract-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from `contract-gate.toml`. The path comes from the
//! caller, the `CONTRACT_GATE_CONFIG` environment variable, or the default
//! file name, in that order. A missing default file yields defaults; a
//! missing explicit file is an error. Every limit is validated before the
//! config is converted into [`EngineSettings`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use contract_gate_core::CodebaseMapping;
use contract_gate_core::EngineSettings;
use contract_gate_core::FileAuditSink;
use contract_gate_core::NoopAuditSink;
use contract_gate_core::RunAuditSink;
use contract_gate_core::StderrAuditSink;
use contract_gate_core::builtin_catalog;
use contract_gate_core::rules::RuleLevel;
use contract_gate_core::runtime::CorrelatorSettings;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "contract-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CONTRACT_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum concurrent extractions.
pub(crate) const MAX_WORKERS: usize = 256;
/// Minimum per-unit timeout in milliseconds.
pub(crate) const MIN_UNIT_TIMEOUT_MS: u64 = 10;
/// Maximum per-unit timeout in milliseconds.
pub(crate) const MAX_UNIT_TIMEOUT_MS: u64 = 600_000;
/// Maximum unit size in bytes (16 MiB).
pub(crate) const MAX_UNIT_BYTES: usize = 16 * 1024 * 1024;
/// Maximum number of codebase mappings.
pub(crate) const MAX_CODEBASES: usize = 256;
/// Default audit log path.
const DEFAULT_AUDIT_PATH: &str = "contract-gate-audit.jsonl";

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Root `contract-gate.toml` model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractGateConfig {
    /// Engine limits.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Unit-mismatch thresholds.
    #[serde(default)]
    pub correlator: CorrelatorConfig,
    /// Inline suppression policy.
    #[serde(default)]
    pub suppression: SuppressionConfig,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Per-rule overrides keyed by rule id.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,
    /// Path-prefix codebase mappings.
    #[serde(default)]
    pub codebases: Vec<CodebaseMapping>,
}

impl ContractGateConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if !explicit && !resolved.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the text is malformed or invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.correlator.validate()?;
        self.audit.validate()?;
        let catalog = builtin_catalog();
        for rule_id in self.rules.keys() {
            if catalog.get(rule_id).is_none() {
                return Err(ConfigError::Invalid(format!("rules.{rule_id}: unknown rule")));
            }
        }
        validate_codebases(&self.codebases)
    }

    /// Converts the configuration into engine settings.
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_workers: self.engine.max_workers,
            unit_timeout: Duration::from_millis(self.engine.unit_timeout_ms),
            max_unit_bytes: self.engine.max_unit_bytes,
            follow_symlinks: self.engine.follow_symlinks,
            correlator: CorrelatorSettings {
                unit_mismatch_cutoff: self.correlator.unit_mismatch_cutoff,
                advisory_floor: self.correlator.advisory_floor,
            },
            suppression_enabled: self.suppression.enabled,
            rule_levels: self.rules.iter().map(|(id, rule)| (id.clone(), rule.severity)).collect(),
            codebases: self.codebases.clone(),
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Engine limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum concurrent extractions.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Per-unit extraction timeout in milliseconds.
    #[serde(default = "default_unit_timeout_ms")]
    pub unit_timeout_ms: u64,
    /// Maximum unit size in bytes.
    #[serde(default = "default_max_unit_bytes")]
    pub max_unit_bytes: usize,
    /// Follow symbolic links during discovery.
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            unit_timeout_ms: default_unit_timeout_ms(),
            max_unit_bytes: default_max_unit_bytes(),
            follow_symlinks: false,
        }
    }
}

impl EngineConfig {
    /// Validates engine limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1 ..= MAX_WORKERS).contains(&self.max_workers) {
            return Err(ConfigError::Invalid(format!("engine.max_workers must be between 1 and {MAX_WORKERS}")));
        }
        if !(MIN_UNIT_TIMEOUT_MS ..= MAX_UNIT_TIMEOUT_MS).contains(&self.unit_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "engine.unit_timeout_ms must be between {MIN_UNIT_TIMEOUT_MS} and {MAX_UNIT_TIMEOUT_MS}"
            )));
        }
        if !(1 ..= MAX_UNIT_BYTES).contains(&self.max_unit_bytes) {
            return Err(ConfigError::Invalid(format!("engine.max_unit_bytes must be between 1 and {MAX_UNIT_BYTES}")));
        }
        Ok(())
    }
}

/// Default worker count.
fn default_max_workers() -> usize {
    contract_gate_core::runtime::engine::DEFAULT_MAX_WORKERS
}

/// Default unit timeout.
fn default_unit_timeout_ms() -> u64 {
    u64::try_from(contract_gate_core::runtime::engine::DEFAULT_UNIT_TIMEOUT.as_millis()).unwrap_or(5_000)
}

/// Default unit size limit.
fn default_max_unit_bytes() -> usize {
    contract_gate_core::runtime::engine::DEFAULT_MAX_UNIT_BYTES
}

// ============================================================================
// SECTION: Correlator
// ============================================================================

/// Unit-mismatch thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorrelatorConfig {
    /// Minimum score reported as a violation.
    #[serde(default = "default_cutoff")]
    pub unit_mismatch_cutoff: f64,
    /// Minimum score reported as an advisory.
    #[serde(default = "default_floor")]
    pub advisory_floor: f64,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            unit_mismatch_cutoff: default_cutoff(),
            advisory_floor: default_floor(),
        }
    }
}

impl CorrelatorConfig {
    /// Validates threshold ordering.
    fn validate(&self) -> Result<(), ConfigError> {
        let cutoff = self.unit_mismatch_cutoff;
        let cutoff_valid = cutoff > 0.0 && cutoff <= 1.0;
        if !cutoff_valid {
            return Err(ConfigError::Invalid("correlator.unit_mismatch_cutoff must be in (0, 1]".to_string()));
        }
        let floor_valid = self.advisory_floor >= 0.0 && self.advisory_floor < cutoff;
        if !floor_valid {
            return Err(ConfigError::Invalid(
                "correlator.advisory_floor must be in [0, unit_mismatch_cutoff)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default violation cutoff.
fn default_cutoff() -> f64 {
    CorrelatorSettings::default().unit_mismatch_cutoff
}

/// Default advisory floor.
fn default_floor() -> f64 {
    CorrelatorSettings::default().advisory_floor
}

// ============================================================================
// SECTION: Suppression
// ============================================================================

/// Inline suppression policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuppressionConfig {
    /// Honor `contract-gate-disable` directives.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
        }
    }
}

/// Serde default for enabled flags.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Audit sink selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log path for the file sink.
    #[serde(default = "default_audit_path")]
    pub path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sink: AuditSinkKind::None,
            path: default_audit_path(),
        }
    }
}

impl AuditConfig {
    /// Validates the file sink path.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sink == AuditSinkKind::File {
            validate_path_string("audit.path", &self.path)?;
        }
        Ok(())
    }

    /// Opens the configured sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn open_sink(&self) -> Result<Arc<dyn RunAuditSink>, ConfigError> {
        Ok(match self.sink {
            AuditSinkKind::None => Arc::new(NoopAuditSink),
            AuditSinkKind::Stderr => Arc::new(StderrAuditSink),
            AuditSinkKind::File => {
                let sink = FileAuditSink::new(Path::new(self.path.trim()))
                    .map_err(|err| ConfigError::Io(format!("audit.path: {err}")))?;
                Arc::new(sink)
            }
        })
    }
}

/// Default audit log path.
fn default_audit_path() -> String {
    DEFAULT_AUDIT_PATH.to_string()
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Per-rule override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Level applied to the rule.
    pub severity: RuleLevel,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path; the flag is true when the path was requested.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates codebase mappings.
fn validate_codebases(codebases: &[CodebaseMapping]) -> Result<(), ConfigError> {
    if codebases.len() > MAX_CODEBASES {
        return Err(ConfigError::Invalid(format!("codebases exceeds {MAX_CODEBASES} entries")));
    }
    let mut ids = BTreeSet::new();
    for mapping in codebases {
        let id = mapping.id.as_str();
        if id.trim().is_empty() {
            return Err(ConfigError::Invalid("codebases.id must be non-empty".to_string()));
        }
        if !ids.insert(id) {
            return Err(ConfigError::Invalid(format!("codebases.{id}: duplicate id")));
        }
        if mapping.paths.is_empty() {
            return Err(ConfigError::Invalid(format!("codebases.{id}.paths must be non-empty")));
        }
        for path in &mapping.paths {
            validate_path_string(&format!("codebases.{id}.paths"), path)?;
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use super::*;

    #[test]
    fn defaults_match_engine_defaults() {
        let config = ContractGateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine_settings(), EngineSettings::default());
    }

    #[test]
    fn floor_must_stay_below_cutoff() {
        let config = CorrelatorConfig {
            unit_mismatch_cutoff: 0.5,
            advisory_floor: 0.5,
        };
        assert!(config.validate().is_err());
        let config = CorrelatorConfig {
            unit_mismatch_cutoff: 1.0,
            advisory_floor: 0.0,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_sink_requires_a_path() {
        let config = AuditConfig {
            sink: AuditSinkKind::File,
            path: "  ".to_string(),
        };
        assert!(config.validate().is_err());
    }
}
