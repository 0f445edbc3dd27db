// crates/contract-gate-core/src/runtime/engine.rs
// ============================================================================
// Module: Contract Gate Engine
// Description: Pipeline driver from manifest load to final report.
// Purpose: Run extraction, evaluation, correlation, and reporting in order.
// Dependencies: thiserror, tokio, crate::core, crate::rules, crate::runtime
// ============================================================================

//! ## Overview
//! The engine owns one run at a time. It loads and validates the manifest,
//! discovers source units, extracts them through the worker pool, evaluates
//! the rule catalog, correlates both sides of every contract, and hands the
//! collected findings to the reporter.
//!
//! Every phase change goes through [`PipelineTracker`] and is recorded on the
//! audit sink. Fatal conditions (invalid manifest, unreadable inputs, no
//! processable units) stop the pipeline and produce an `error` result with
//! no violation list.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::manifest::ContractManifest;
use crate::core::manifest::ManifestError;
use crate::core::manifest::ManifestFormat;
use crate::core::observation::ObservationSet;
use crate::core::source::SourceUnit;
use crate::core::violation::DiagnosticKind;
use crate::interfaces::RunAuditSink;
use crate::rules::BOUNDARY_UNIT_MISMATCH;
use crate::rules::RuleCatalog;
use crate::rules::RuleLevel;
use crate::rules::builtin_catalog;
use crate::runtime::audit::NoopAuditSink;
use crate::runtime::audit::RunAuditDetail;
use crate::runtime::audit::RunAuditEvent;
use crate::runtime::audit::UnitAuditOutcome;
use crate::runtime::correlator::CorrelatorSettings;
use crate::runtime::correlator::correlate;
use crate::runtime::evaluator::EvaluationOutput;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::pool::PoolSettings;
use crate::runtime::pool::RunCancellation;
use crate::runtime::pool::UnitOutcome;
use crate::runtime::pool::WorkerPool;
use crate::runtime::reporter::Reporter;
use crate::runtime::reporter::RunResult;
use crate::runtime::reporter::UnitCounts;
use crate::runtime::sources::CodebaseMapping;
use crate::runtime::sources::Discovery;
use crate::runtime::sources::DiscoveryOptions;
use crate::runtime::sources::SourceError;
use crate::runtime::sources::discover;
use crate::runtime::state::PipelineState;
use crate::runtime::state::PipelineTracker;
use crate::runtime::state::TransitionError;
use crate::runtime::suppression::SuppressionIndex;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum concurrent extractions.
pub const DEFAULT_MAX_WORKERS: usize = 8;
/// Default per-unit extraction timeout.
pub const DEFAULT_UNIT_TIMEOUT: Duration = Duration::from_millis(5_000);
/// Default maximum unit size (1 MiB).
pub const DEFAULT_MAX_UNIT_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Conditions that stop a run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Manifest failed validation.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// Manifest file could not be read.
    #[error("failed to read manifest {path}: {message}")]
    ManifestIo {
        /// Manifest path.
        path: String,
        /// Underlying error.
        message: String,
    },
    /// Source inputs could not be walked.
    #[error(transparent)]
    Sources(#[from] SourceError),
    /// Nothing could be extracted.
    #[error("no source units could be processed")]
    NoUnits,
    /// Pipeline was driven out of order.
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// Report could not be canonicalized.
    #[error("report digest failed: {0}")]
    Hash(String),
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Engine limits and policy.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Maximum concurrent extractions.
    pub max_workers: usize,
    /// Per-unit extraction timeout.
    pub unit_timeout: Duration,
    /// Maximum unit size in bytes.
    pub max_unit_bytes: usize,
    /// Follow symbolic links during discovery.
    pub follow_symlinks: bool,
    /// Unit-mismatch scoring thresholds.
    pub correlator: CorrelatorSettings,
    /// Honor inline suppression directives.
    pub suppression_enabled: bool,
    /// Per-rule level overrides keyed by rule id.
    pub rule_levels: BTreeMap<String, RuleLevel>,
    /// Path-prefix codebase mappings.
    pub codebases: Vec<CodebaseMapping>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            unit_timeout: DEFAULT_UNIT_TIMEOUT,
            max_unit_bytes: DEFAULT_MAX_UNIT_BYTES,
            follow_symlinks: false,
            correlator: CorrelatorSettings::default(),
            suppression_enabled: true,
            rule_levels: BTreeMap::new(),
            codebases: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Manifest Loading
// ============================================================================

/// Reads and validates a manifest file; `.json` files are parsed as JSON.
///
/// # Errors
///
/// Returns [`PipelineError`] when the file cannot be read or is invalid.
pub fn load_manifest(path: &Path) -> Result<ContractManifest, PipelineError> {
    let shown = path.to_string_lossy().to_string();
    let raw = fs::read_to_string(path).map_err(|err| PipelineError::ManifestIo {
        path: shown.clone(),
        message: err.to_string(),
    })?;
    Ok(ContractManifest::load(&raw, ManifestFormat::from_path(&shown))?)
}

// ============================================================================
// SECTION: Run Driver
// ============================================================================

/// Per-run pipeline state plus the audit sink it reports to.
struct RunDriver<'a> {
    /// Phase tracker.
    tracker: PipelineTracker,
    /// Audit sink.
    audit: &'a dyn RunAuditSink,
}

impl<'a> RunDriver<'a> {
    /// Starts a run in `Idle`.
    fn new(audit: &'a dyn RunAuditSink) -> Self {
        Self {
            tracker: PipelineTracker::new(),
            audit,
        }
    }

    /// Records one audit payload.
    fn record(&self, detail: RunAuditDetail) {
        self.audit.record(&RunAuditEvent::new(detail));
    }

    /// Moves to the next phase and audits the transition.
    fn advance(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        let from = self.tracker.advance(next)?;
        self.record(RunAuditDetail::Transition {
            from,
            to: next,
        });
        Ok(())
    }

    /// Visited phases.
    fn history(&self) -> Vec<PipelineState> {
        self.tracker.history().to_vec()
    }

    /// Stops the run with a fatal result.
    fn abort(&mut self, error: &PipelineError) -> RunResult {
        let next = PipelineState::Fatal;
        if let Ok(from) = self.tracker.advance(next) {
            self.record(RunAuditDetail::Transition {
                from,
                to: next,
            });
        }
        self.finish(RunResult::fatal(error.to_string(), self.history()))
    }

    /// Audits the run summary and returns the result.
    fn finish(&self, result: RunResult) -> RunResult {
        self.record(RunAuditDetail::Summary {
            outcome: result.outcome,
            violations: result.violations.len(),
            suppressed: result.summary.suppressed,
            diagnostics: result.diagnostics.len(),
            report_digest: result.report_digest.clone(),
        });
        result
    }

    /// Audits rule faults from an evaluation pass.
    fn record_faults(&self, output: &EvaluationOutput) {
        for fault in &output.faults {
            self.record(RunAuditDetail::RuleFault {
                rule_id: fault.rule_id.clone(),
                unit: fault.unit.clone(),
                message: fault.message.clone(),
            });
        }
    }

    /// Audits discovery skips and every unit outcome.
    fn record_units(&self, discovery: &Discovery, outcomes: &[UnitOutcome]) {
        for diagnostic in &discovery.diagnostics {
            let Some(unit) = &diagnostic.unit else {
                continue;
            };
            let outcome = if diagnostic.kind == DiagnosticKind::Skipped {
                UnitAuditOutcome::Skipped
            } else {
                UnitAuditOutcome::Degraded
            };
            self.record(RunAuditDetail::Unit {
                unit: unit.clone(),
                language: None,
                outcome,
                observations: 0,
                reason: Some(diagnostic.message.clone()),
            });
        }
        for outcome in outcomes {
            self.record(RunAuditDetail::Unit {
                unit: outcome.observations.unit.clone(),
                language: Some(outcome.observations.language),
                outcome: outcome.audit,
                observations: outcome.observation_count(),
                reason: outcome.reason.clone(),
            });
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Contract-conformance engine.
pub struct Engine {
    /// Rules applied to every run.
    catalog: RuleCatalog,
    /// Limits and policy.
    settings: EngineSettings,
    /// Audit sink.
    audit: Arc<dyn RunAuditSink>,
    /// Operator cancellation handle.
    cancellation: RunCancellation,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("rules", &self.catalog.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine with the built-in catalog and no audit output.
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            catalog: builtin_catalog(),
            settings,
            audit: Arc::new(NoopAuditSink),
            cancellation: RunCancellation::new(),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn RunAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the rule catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: RuleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Handle that cancels dispatch of further units.
    #[must_use]
    pub fn cancellation(&self) -> RunCancellation {
        self.cancellation.clone()
    }

    /// Engine settings.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Rule catalog.
    #[must_use]
    pub const fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Checks every source unit under `source_paths` against the manifest.
    pub async fn run(&self, manifest_path: &Path, source_paths: &[PathBuf]) -> RunResult {
        let mut driver = RunDriver::new(self.audit.as_ref());
        let manifest = match load_manifest(manifest_path) {
            Ok(manifest) => manifest,
            Err(err) => return driver.abort(&err),
        };
        if let Err(err) = driver.advance(PipelineState::ManifestLoaded) {
            return driver.abort(&err);
        }
        if let Err(err) = driver.advance(PipelineState::Extracting) {
            return driver.abort(&err);
        }
        let options = DiscoveryOptions {
            follow_symlinks: self.settings.follow_symlinks,
            max_unit_bytes: self.settings.max_unit_bytes,
            codebases: self.settings.codebases.clone(),
        };
        let paths = source_paths.to_vec();
        let discovery = match tokio::task::spawn_blocking(move || discover(&paths, &options)).await {
            Ok(Ok(discovery)) => discovery,
            Ok(Err(err)) => return driver.abort(&err.into()),
            Err(err) => {
                return driver.abort(&PipelineError::Sources(SourceError::Io {
                    path: "<discovery>".to_string(),
                    message: err.to_string(),
                }));
            }
        };
        self.execute(driver, manifest, discovery).await
    }

    /// Checks already-loaded units against an already-validated manifest.
    pub async fn run_units(&self, manifest: ContractManifest, units: Vec<SourceUnit>) -> RunResult {
        let mut driver = RunDriver::new(self.audit.as_ref());
        for next in [PipelineState::ManifestLoaded, PipelineState::Extracting] {
            if let Err(err) = driver.advance(next) {
                return driver.abort(&err);
            }
        }
        let discovery = Discovery {
            units,
            ..Discovery::default()
        };
        self.execute(driver, manifest, discovery).await
    }

    /// Runs extraction through reporting, aborting on fatal conditions.
    async fn execute(&self, mut driver: RunDriver<'_>, manifest: ContractManifest, discovery: Discovery) -> RunResult {
        match self.pipeline(&mut driver, manifest, discovery).await {
            Ok(result) => driver.finish(result),
            Err(err) => driver.abort(&err),
        }
    }

    /// Pipeline body from `Extracting` to `Reported`.
    async fn pipeline(
        &self,
        driver: &mut RunDriver<'_>,
        manifest: ContractManifest,
        mut discovery: Discovery,
    ) -> Result<RunResult, PipelineError> {
        if discovery.units.is_empty() {
            return Err(PipelineError::NoUnits);
        }
        let manifest = Arc::new(manifest);
        let pool = WorkerPool::new(PoolSettings {
            max_workers: self.settings.max_workers,
            unit_timeout: self.settings.unit_timeout,
            max_unit_bytes: self.settings.max_unit_bytes,
        });
        let units = std::mem::take(&mut discovery.units);
        let outcomes = pool.run(Arc::clone(&manifest), units, &self.cancellation).await;
        driver.record_units(&discovery, &outcomes);

        let analyzed = outcomes.iter().filter(|outcome| outcome.audit == UnitAuditOutcome::Ok).count();
        if analyzed == 0 {
            return Err(PipelineError::NoUnits);
        }
        let counts = UnitCounts {
            analyzed,
            degraded: discovery.rejected
                + outcomes
                    .iter()
                    .filter(|outcome| matches!(outcome.audit, UnitAuditOutcome::Degraded | UnitAuditOutcome::TimedOut))
                    .count(),
            skipped: discovery.skipped
                + outcomes.iter().filter(|outcome| outcome.audit == UnitAuditOutcome::Skipped).count(),
        };

        let mut index = SuppressionIndex::new();
        let mut reporter_diagnostics = discovery.diagnostics;
        let mut units = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            if !outcome.suppressions.is_empty() {
                index.insert(outcome.observations.unit.clone(), outcome.suppressions);
            }
            reporter_diagnostics.extend(outcome.diagnostics);
            units.push(outcome.observations);
        }
        let mut reporter = Reporter::new(self.settings.suppression_enabled.then_some(index));
        reporter.extend_diagnostics(reporter_diagnostics);
        let observations = ObservationSet::new(units);

        driver.advance(PipelineState::Evaluating)?;
        let evaluator = Evaluator::new(&manifest, &self.catalog, &self.settings.rule_levels);
        let output = evaluator.evaluate_observations(&observations);
        driver.record_faults(&output);
        reporter.extend_violations(output.violations);
        reporter.extend_diagnostics(output.diagnostics);

        driver.advance(PipelineState::Correlating)?;
        let correlation = correlate(&manifest, &observations, &self.settings.correlator);
        let output = evaluator.evaluate_correlations(&correlation.correlations);
        driver.record_faults(&output);
        reporter.extend_violations(output.violations);
        reporter.extend_diagnostics(output.diagnostics);
        if evaluator.severity(BOUNDARY_UNIT_MISMATCH).is_some() {
            reporter.extend_diagnostics(correlation.advisories);
        }

        driver.advance(PipelineState::Reported)?;
        reporter.finish(counts, driver.history()).map_err(|err| PipelineError::Hash(err.to_string()))
    }
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

    use std::sync::Mutex;

    use super::*;
    use crate::core::source::Language;
    use crate::rules::fixtures;
    use crate::runtime::reporter::RunOutcome;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<&'static str>>,
    }

    impl RunAuditSink for Recorder {
        fn record(&self, event: &RunAuditEvent) {
            self.events.lock().unwrap().push(event.event);
        }
    }

    const CLIENT: &str = "export async function token(id: string) {\n  const res = await fetch('/oauth/token', { method: 'POST', headers: { 'X-Client-Version': '1' }, body: JSON.stringify({ client_id: id }) });\n  return res.status;\n}\n";

    #[tokio::test]
    async fn missing_manifest_is_fatal_before_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::default());
        let engine = Engine::new(EngineSettings::default()).with_audit(recorder.clone());
        let result = engine.run(&dir.path().join("absent.yaml"), &[dir.path().to_path_buf()]).await;

        assert_eq!(result.outcome, RunOutcome::Error);
        assert_eq!(result.exit_code(), 2);
        assert!(result.violations.is_empty());
        assert_eq!(result.pipeline, vec![PipelineState::Idle, PipelineState::Fatal]);
        assert_eq!(*recorder.events.lock().unwrap(), vec!["pipeline_transition", "run_summary"]);
    }

    #[tokio::test]
    async fn empty_source_tree_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("contracts.yaml");
        fs::write(&manifest, fixtures::MANIFEST).unwrap();
        let sources = dir.path().join("src");
        fs::create_dir_all(&sources).unwrap();

        let result = Engine::new(EngineSettings::default()).run(&manifest, &[sources]).await;
        assert_eq!(result.outcome, RunOutcome::Error);
        assert!(result.diagnostics[0].message.contains("no source units"));
        assert_eq!(result.pipeline.last(), Some(&PipelineState::Fatal));
    }

    #[tokio::test]
    async fn run_walks_every_phase_and_reports_missing_fields() {
        let engine = Engine::new(EngineSettings::default());
        let units = vec![SourceUnit::new("web/src/api.ts", Language::TypeScript, CLIENT.as_bytes().to_vec())];
        let result = engine.run_units(fixtures::manifest(), units).await;

        assert_eq!(
            result.pipeline,
            vec![
                PipelineState::Idle,
                PipelineState::ManifestLoaded,
                PipelineState::Extracting,
                PipelineState::Evaluating,
                PipelineState::Correlating,
                PipelineState::Reported,
            ]
        );
        assert_eq!(result.outcome, RunOutcome::Fail);
        assert!(result.violations.iter().any(|violation| violation.subject() == "grant_type"));
        assert!(result.report_digest.is_some());
    }

    #[tokio::test]
    async fn custom_catalog_replaces_builtin_rules() {
        let engine = Engine::new(EngineSettings::default()).with_catalog(RuleCatalog::new());
        let units = vec![SourceUnit::new("web/src/api.ts", Language::TypeScript, CLIENT.as_bytes().to_vec())];
        let result = engine.run_units(fixtures::manifest(), units).await;
        assert_eq!(result.outcome, RunOutcome::Pass);
        assert_eq!(engine.catalog().len(), 0);
    }

    #[tokio::test]
    async fn run_where_every_unit_fails_to_parse_is_fatal() {
        let engine = Engine::new(EngineSettings::default());
        let units = vec![
            SourceUnit::new("web/src/bad.ts", Language::TypeScript, b"function x( {\n".to_vec()),
            SourceUnit::new("web/src/worse.ts", Language::TypeScript, b"export function y(a: string {\n".to_vec()),
        ];
        let result = engine.run_units(fixtures::manifest(), units).await;

        assert_eq!(result.outcome, RunOutcome::Error);
        assert_eq!(result.exit_code(), 2);
        assert!(result.violations.is_empty());
        assert_eq!(result.pipeline.last(), Some(&PipelineState::Fatal));
        assert!(result.diagnostics.iter().any(|diagnostic| diagnostic.message.contains("no source units")));
    }

    #[tokio::test]
    async fn cancelled_run_with_nothing_processed_is_fatal() {
        let engine = Engine::new(EngineSettings::default());
        engine.cancellation().cancel();
        let units = vec![SourceUnit::new("web/src/api.ts", Language::TypeScript, CLIENT.as_bytes().to_vec())];
        let result = engine.run_units(fixtures::manifest(), units).await;
        assert_eq!(result.outcome, RunOutcome::Error);
    }
}
