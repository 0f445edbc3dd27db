// crates/contract-gate-cli/src/main.rs
// ============================================================================
// Module: Contract Gate CLI Entry Point
// Description: Command dispatcher for conformance checks and validation tools.
// Purpose: Run the engine from the shell and map outcomes to exit codes.
// Dependencies: clap, contract-gate-config, contract-gate-core, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! `contract-gate check` loads configuration, runs the engine over the given
//! source paths, prints the ordered report, and exits `0` on pass, `1` when
//! violations were found, and `2` on a fatal error. Ctrl-C stops dispatch of
//! further units; in-flight units still finish and the report is produced.
//! The remaining commands validate manifests and configuration and list the
//! rule catalog.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use contract_gate_config::ContractGateConfig;
use contract_gate_core::Engine;
use contract_gate_core::RunResult;
use contract_gate_core::Severity;
use contract_gate_core::runtime::load_manifest;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code for fatal errors.
const EXIT_FATAL: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "contract-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Check source code against a contract manifest.
    Check(CheckCommand),
    /// Manifest utilities.
    Manifest {
        /// Selected manifest subcommand.
        #[command(subcommand)]
        command: ManifestCommand,
    },
    /// Rule catalog utilities.
    Rules {
        /// Selected rules subcommand.
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Report output formats.
#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// JSON report.
    Json,
}

/// Arguments for `check`.
#[derive(Args, Debug)]
struct CheckCommand {
    /// Contract manifest (YAML or JSON).
    #[arg(long, short = 'm', value_name = "PATH")]
    manifest: PathBuf,
    /// Config file (overrides `CONTRACT_GATE_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Source files or directories to check.
    #[arg(required = true, value_name = "SOURCE")]
    sources: Vec<PathBuf>,
}

/// Manifest subcommands.
#[derive(Subcommand, Debug)]
enum ManifestCommand {
    /// Validate a manifest without running a check.
    Validate {
        /// Manifest path.
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

/// Rules subcommands.
#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// List every rule with its effective level.
    List {
        /// Config file whose overrides are applied.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate {
        /// Config path.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Check(command) => command_check(command).await,
        Commands::Manifest {
            command: ManifestCommand::Validate {
                path,
            },
        } => command_manifest_validate(&path),
        Commands::Rules {
            command: RulesCommand::List {
                config,
            },
        } => command_rules_list(config),
        Commands::Config {
            command: ConfigCommand::Validate {
                config,
            },
        } => command_config_validate(config),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Loads configuration, failing the command when it is invalid.
fn load_config(path: Option<PathBuf>) -> CliResult<ContractGateConfig> {
    ContractGateConfig::load(path.as_deref()).map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Executes `check`.
async fn command_check(command: CheckCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config)?;
    let audit = config.audit.open_sink().map_err(|err| CliError::new(err.to_string()))?;
    let engine = Engine::new(config.engine_settings()).with_audit(audit);
    let cancellation = engine.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancellation.cancel();
        }
    });
    let result = engine.run(&command.manifest, &command.sources).await;
    let rendered = match command.format {
        OutputFormat::Text => render_text(&result),
        OutputFormat::Json => serde_json::to_string_pretty(&result)
            .map_err(|err| CliError::new(format!("failed to encode report: {err}")))?,
    };
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::from(result.exit_code()))
}

/// Executes `manifest validate`.
fn command_manifest_validate(path: &std::path::Path) -> CliResult<ExitCode> {
    let manifest = load_manifest(path).map_err(|err| CliError::new(err.to_string()))?;
    let message = format!(
        "manifest ok: version {}, {} contracts, {} endpoints",
        manifest.version(),
        manifest.contracts().len(),
        manifest.endpoints().count()
    );
    write_stdout_line(&message).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `rules list`.
fn command_rules_list(config: Option<PathBuf>) -> CliResult<ExitCode> {
    let config = load_config(config)?;
    let settings = config.engine_settings();
    let engine = Engine::new(settings);
    let mut out = String::new();
    for rule in engine.catalog().rules() {
        let level = match engine.settings().rule_levels.get(rule.id) {
            Some(level) => level.severity().map_or("off", Severity::as_str),
            None => rule.severity.as_str(),
        };
        let _ = writeln!(out, "{:<32} {:<6} {:<22} {}", rule.id, level, rule.family.as_str(), rule.description);
    }
    write_stdout_line(out.trim_end()).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `config validate`.
fn command_config_validate(config: Option<PathBuf>) -> CliResult<ExitCode> {
    let _config = load_config(config)?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a run result as human-readable lines.
fn render_text(result: &RunResult) -> String {
    let mut out = String::new();
    for violation in &result.violations {
        let label = match violation.severity() {
            Severity::Error => "error",
            Severity::Warn => "warning",
        };
        let _ = writeln!(out, "{label}[{}] {}: {}", violation.rule_id(), violation.primary(), violation.message());
        for location in violation.locations().iter().skip(1) {
            let _ = writeln!(out, "    also: {location}");
        }
        if let Some(fix) = violation.suggested_fix() {
            let _ = writeln!(out, "    fix: {fix}");
        }
    }
    for diagnostic in &result.diagnostics {
        let _ = write!(out, "note[{}]", diagnostic.kind.as_str());
        if let Some(location) = &diagnostic.location {
            let _ = write!(out, " {location}");
        } else if let Some(unit) = &diagnostic.unit {
            let _ = write!(out, " {unit}");
        }
        let _ = writeln!(out, ": {}", diagnostic.message);
    }
    let summary = &result.summary;
    let _ = write!(
        out,
        "result: {} ({} violations, {} suppressed, {} diagnostics; {} units analyzed, {} degraded, {} skipped)",
        result.outcome.as_str(),
        summary.total,
        summary.suppressed,
        result.diagnostics.len(),
        summary.units.analyzed,
        summary.units.degraded,
        summary.units.skipped,
    );
    if let Some(digest) = &result.report_digest {
        let _ = write!(out, " digest {digest}");
    }
    out
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message and returns the fatal exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::from(EXIT_FATAL)
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

    use contract_gate_core::PipelineState;

    use super::*;

    #[test]
    fn fatal_results_render_the_reason_and_outcome() {
        let result = RunResult::fatal("manifest parse error: bad", vec![PipelineState::Idle, PipelineState::Fatal]);
        let text = render_text(&result);
        assert!(text.starts_with("note[fatal]: manifest parse error: bad"));
        assert!(text.contains("result: error (0 violations"));
    }

    #[test]
    fn check_requires_manifest_and_sources() {
        assert!(Cli::try_parse_from(["contract-gate", "check", "src"]).is_err());
        assert!(Cli::try_parse_from(["contract-gate", "check", "--manifest", "m.yaml"]).is_err());
        let cli = Cli::try_parse_from(["contract-gate", "check", "-m", "m.yaml", "--format", "json", "a", "b"]).unwrap();
        let Commands::Check(command) = cli.command else {
            panic!("expected check");
        };
        assert_eq!(command.format, OutputFormat::Json);
        assert_eq!(command.sources.len(), 2);
    }
}
