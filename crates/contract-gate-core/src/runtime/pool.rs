// crates/contract-gate-core/src/runtime/pool.rs
// ============================================================================
// Module: Contract Gate Worker Pool
// Description: Bounded parallel extraction with per-unit timeouts.
// Purpose: Extract every unit concurrently and join results at one collector.
// Dependencies: tokio, crate::core, crate::extract, crate::interfaces
// ============================================================================

//! ## Overview
//! Each unit is extracted by [`extract_unit`], a pure function of the unit
//! bytes and the read-only manifest. The [`WorkerPool`] bounds concurrency
//! with a semaphore, runs extraction on blocking threads under a per-unit
//! timeout, and delivers every [`UnitOutcome`] through one channel to a
//! single collector. The collector is the only synchronized point; the
//! manifest is shared behind an `Arc` and never locked.
//!
//! Cancellation stops dispatch of new units. Units already dispatched finish
//! or time out on their own; units never dispatched are reported as skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::sync::mpsc;

use crate::core::manifest::ContractManifest;
use crate::core::naming::split_words;
use crate::core::observation::BoundarySide;
use crate::core::observation::Completeness;
use crate::core::observation::UnitObservations;
use crate::core::source::Language;
use crate::core::source::SourceLocation;
use crate::core::source::SourceUnit;
use crate::core::violation::Diagnostic;
use crate::core::violation::DiagnosticKind;
use crate::extract::Adapter;
use crate::extract::adapter_for;
use crate::extract::scan::ScannedUnit;
use crate::interfaces::ExtractionContext;
use crate::interfaces::ExtractionError;
use crate::interfaces::Extractor;
use crate::runtime::audit::UnitAuditOutcome;
use crate::runtime::suppression::FileSuppressions;

// ============================================================================
// SECTION: Side Hints
// ============================================================================

/// Path words suggesting a consumer unit.
const CONSUMER_HINTS: &[&str] = &["client", "consumer", "frontend", "sdk", "web", "ui"];
/// Path words suggesting a producer unit.
const PRODUCER_HINTS: &[&str] = &["server", "service", "backend", "producer", "api"];

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Operator-requested run cancellation.
#[derive(Debug, Clone, Default)]
pub struct RunCancellation {
    /// Shared flag.
    flag: Arc<AtomicBool>,
}

impl RunCancellation {
    /// Creates an uncancelled handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Unit Outcomes
// ============================================================================

/// Everything the collector receives for one unit.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    /// Observations, possibly partial.
    pub observations: UnitObservations,
    /// Inline suppression directives of the unit.
    pub suppressions: FileSuppressions,
    /// Unit diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// Audit classification.
    pub audit: UnitAuditOutcome,
    /// Reason for a non-ok outcome.
    pub reason: Option<String>,
}

impl UnitOutcome {
    /// Builds an outcome for a unit that produced no observations.
    fn empty(
        path: &str,
        language: Language,
        kind: DiagnosticKind,
        audit: UnitAuditOutcome,
        completeness: Completeness,
        reason: String,
    ) -> Self {
        let mut observations = UnitObservations::empty(path, language, BoundarySide::Unknown, false);
        observations.completeness = completeness;
        Self {
            observations,
            suppressions: FileSuppressions::default(),
            diagnostics: vec![Diagnostic::new(kind, reason.clone()).for_unit(path)],
            audit,
            reason: Some(reason),
        }
    }

    /// Outcome for a unit that exceeded the timeout.
    #[must_use]
    pub fn timed_out(path: &str, language: Language, timeout: Duration) -> Self {
        Self::empty(
            path,
            language,
            DiagnosticKind::Timeout,
            UnitAuditOutcome::TimedOut,
            Completeness::TimedOut,
            format!("extraction exceeded {} ms", timeout.as_millis()),
        )
    }

    /// Outcome for a unit that was never analyzed.
    #[must_use]
    pub fn skipped(path: &str, language: Language, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::empty(
            path,
            language,
            DiagnosticKind::Skipped,
            UnitAuditOutcome::Skipped,
            Completeness::Degraded(reason.clone()),
            reason,
        )
    }

    /// Outcome for a unit whose extraction failed outright.
    #[must_use]
    pub fn failed(path: &str, language: Language, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::empty(
            path,
            language,
            DiagnosticKind::DegradedCoverage,
            UnitAuditOutcome::Degraded,
            Completeness::Degraded(reason.clone()),
            reason,
        )
    }

    /// Number of observations extracted.
    #[must_use]
    pub fn observation_count(&self) -> usize {
        let obs = &self.observations;
        obs.requests.len()
            + obs.responses.len()
            + obs.errors.len()
            + obs.enums.len()
            + obs.tests.len()
            + obs.models.len()
    }
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Side implied by a codebase identifier in the manifest.
fn side_of_codebase(manifest: &ContractManifest, codebase: &str) -> Option<BoundarySide> {
    let produces = manifest
        .contracts()
        .iter()
        .any(|contract| contract.producer.as_ref().is_some_and(|id| id.as_str() == codebase));
    let consumes = manifest
        .contracts()
        .iter()
        .any(|contract| contract.consumer.as_ref().is_some_and(|id| id.as_str() == codebase));
    match (produces, consumes) {
        (true, false) => Some(BoundarySide::Producer),
        (false, true) => Some(BoundarySide::Consumer),
        _ => None,
    }
}

/// Side suggested by hint words in the unit's directories.
fn side_from_hints(path: &str) -> Option<BoundarySide> {
    let directories: Vec<&str> = path.split('/').collect();
    let words: Vec<String> = directories
        .split_last()
        .map(|(_, dirs)| dirs.iter().flat_map(|dir| split_words(dir)).collect())
        .unwrap_or_default();
    let consumer = words.iter().any(|word| CONSUMER_HINTS.contains(&word.as_str()));
    let producer = words.iter().any(|word| PRODUCER_HINTS.contains(&word.as_str()));
    match (producer, consumer) {
        (true, false) => Some(BoundarySide::Producer),
        (false, true) => Some(BoundarySide::Consumer),
        _ => None,
    }
}

/// Resolves the boundary side of a unit.
///
/// Order: configured codebase mapping, a path component naming a manifest
/// codebase, directory hint words, then the unit's own constructs.
#[must_use]
pub fn resolve_side(
    unit: &SourceUnit,
    manifest: &ContractManifest,
    adapter: &Adapter,
    scanned: &ScannedUnit,
) -> BoundarySide {
    if let Some(side) = unit.codebase.as_ref().and_then(|id| side_of_codebase(manifest, id.as_str())) {
        return side;
    }
    let codebases = manifest.codebases();
    let named = unit
        .path
        .split('/')
        .filter(|component| codebases.iter().any(|id| id.as_str() == *component))
        .find_map(|component| side_of_codebase(manifest, component));
    named.or_else(|| side_from_hints(&unit.path)).unwrap_or_else(|| adapter.infer_side(scanned))
}

/// Runs one extractor operation, recording failures.
fn collect<T>(result: Result<Vec<T>, ExtractionError>, operation: &str, failures: &mut Vec<String>) -> Vec<T> {
    result.unwrap_or_else(|err| {
        failures.push(format!("{operation}: {err}"));
        Vec::new()
    })
}

/// Extracts every observation from one unit.
///
/// Never fails: scan failures and per-operation failures degrade the unit
/// instead.
#[must_use]
pub fn extract_unit(unit: &SourceUnit, manifest: &ContractManifest, max_unit_bytes: usize) -> UnitOutcome {
    let Some(adapter) = adapter_for(unit.language) else {
        return UnitOutcome::skipped(&unit.path, unit.language, "no adapter for language");
    };
    let is_test = adapter.is_test_unit(&unit.path);
    let scanned = match adapter.scan(unit, max_unit_bytes) {
        Ok(scanned) => scanned,
        Err(err) => {
            let mut outcome = UnitOutcome::failed(&unit.path, unit.language, err.to_string());
            outcome.observations.is_test = is_test;
            if let Some(diagnostic) = outcome.diagnostics.first_mut() {
                diagnostic.location = Some(SourceLocation::new(&unit.path, error_line(&err)));
            }
            return outcome;
        }
    };
    let side = resolve_side(unit, manifest, &adapter, &scanned);
    let ctx = ExtractionContext {
        manifest,
        side,
    };

    let mut failures = Vec::new();
    let mut observations = UnitObservations::empty(&unit.path, unit.language, side, is_test);
    observations.requests = collect(adapter.extract_requests(&scanned, &ctx), "requests", &mut failures);
    observations.responses =
        collect(adapter.extract_response_handling(&scanned, &ctx), "responses", &mut failures);
    observations.errors = collect(adapter.extract_error_handling(&scanned, &ctx), "errors", &mut failures);
    observations.enums = collect(adapter.extract_enum_handling(&scanned, &ctx), "enums", &mut failures);
    observations.tests = collect(adapter.extract_tests(&scanned, &ctx), "tests", &mut failures);
    observations.models = collect(adapter.extract_models(&scanned, &ctx), "models", &mut failures);

    let suppressions = FileSuppressions::parse(&scanned.raw);
    if failures.is_empty() {
        return UnitOutcome {
            observations,
            suppressions,
            diagnostics: Vec::new(),
            audit: UnitAuditOutcome::Ok,
            reason: None,
        };
    }
    let reason = failures.join("; ");
    observations.completeness = Completeness::Degraded(reason.clone());
    UnitOutcome {
        observations,
        suppressions,
        diagnostics: vec![Diagnostic::new(DiagnosticKind::DegradedCoverage, reason.clone()).for_unit(&unit.path)],
        audit: UnitAuditOutcome::Degraded,
        reason: Some(reason),
    }
}

/// Line an extraction error points at.
const fn error_line(err: &ExtractionError) -> u32 {
    match err {
        ExtractionError::Unbalanced {
            line, ..
        }
        | ExtractionError::Unterminated {
            line, ..
        } => *line,
        ExtractionError::NotUtf8(_) | ExtractionError::TooLarge { .. } | ExtractionError::Failed(_) => 1,
    }
}

// ============================================================================
// SECTION: Pool
// ============================================================================

/// Worker pool limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum extraction threads running at once. A timed-out unit keeps
    /// its slot until its thread returns.
    pub max_workers: usize,
    /// Per-unit extraction timeout.
    pub unit_timeout: Duration,
    /// Maximum unit size in bytes.
    pub max_unit_bytes: usize,
}

/// Bounded extraction pool.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    /// Pool limits.
    settings: PoolSettings,
}

impl WorkerPool {
    /// Creates a pool.
    #[must_use]
    pub const fn new(settings: PoolSettings) -> Self {
        Self {
            settings,
        }
    }

    /// Extracts every unit and returns outcomes sorted by unit path.
    pub async fn run(
        &self,
        manifest: Arc<ContractManifest>,
        units: Vec<SourceUnit>,
        cancellation: &RunCancellation,
    ) -> Vec<UnitOutcome> {
        self.run_with(manifest, units, cancellation, extract_unit).await
    }

    /// Runs `extract` over every unit and returns outcomes sorted by unit path.
    ///
    /// A worker permit is held until the extraction thread returns, including
    /// after its unit has been reported as timed out.
    pub async fn run_with<F>(
        &self,
        manifest: Arc<ContractManifest>,
        units: Vec<SourceUnit>,
        cancellation: &RunCancellation,
        extract: F,
    ) -> Vec<UnitOutcome>
    where
        F: Fn(&SourceUnit, &ContractManifest, usize) -> UnitOutcome + Send + Sync + 'static,
    {
        let extract = Arc::new(extract);
        let semaphore = Arc::new(Semaphore::new(self.settings.max_workers.max(1)));
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut outcomes = Vec::with_capacity(units.len());

        for unit in units {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) if !cancellation.is_cancelled() => permit,
                _ => {
                    outcomes.push(UnitOutcome::skipped(&unit.path, unit.language, "run cancelled"));
                    continue;
                }
            };
            let sender = sender.clone();
            let manifest = Arc::clone(&manifest);
            let extract = Arc::clone(&extract);
            let PoolSettings {
                unit_timeout,
                max_unit_bytes,
                ..
            } = self.settings;
            tokio::spawn(async move {
                let path = unit.path.clone();
                let language = unit.language;
                let work = tokio::task::spawn_blocking(move || {
                    let outcome = (*extract)(&unit, manifest.as_ref(), max_unit_bytes);
                    drop(permit);
                    outcome
                });
                let outcome = match tokio::time::timeout(unit_timeout, work).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(err)) => UnitOutcome::failed(&path, language, format!("extraction worker failed: {err}")),
                    Err(_) => UnitOutcome::timed_out(&path, language, unit_timeout),
                };
                let _ = sender.send(outcome);
            });
        }
        drop(sender);
        while let Some(outcome) = receiver.recv().await {
            outcomes.push(outcome);
        }
        outcomes.sort_by(|left, right| left.observations.unit.cmp(&right.observations.unit));
        outcomes
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

    use super::*;
    use crate::core::identifiers::CodebaseId;
    use crate::rules::fixtures;

    const CLIENT: &str = "export async function token(id: string) {\n  const res = await fetch('/oauth/token', { method: 'POST', body: JSON.stringify({ client_id: id }) });\n  return res.json();\n}\n";

    fn unit(path: &str, text: &str) -> SourceUnit {
        SourceUnit::new(path, Language::TypeScript, text.as_bytes().to_vec())
    }

    #[test]
    fn side_follows_mapping_then_path_then_hints() {
        let manifest = fixtures::manifest();
        let adapter = adapter_for(Language::TypeScript).unwrap();

        let mapped = unit("repo/src/api.ts", CLIENT).with_codebase(CodebaseId::new("auth-service"));
        let scanned = adapter.scan(&mapped, 1 << 20).unwrap();
        assert_eq!(resolve_side(&mapped, &manifest, &adapter, &scanned), BoundarySide::Producer);

        let named = unit("storefront/src/api.ts", CLIENT);
        assert_eq!(resolve_side(&named, &manifest, &adapter, &scanned), BoundarySide::Consumer);

        let hinted = unit("apps/backend/api.ts", CLIENT);
        assert_eq!(resolve_side(&hinted, &manifest, &adapter, &scanned), BoundarySide::Producer);
    }

    #[test]
    fn unbalanced_unit_is_degraded_not_fatal() {
        let manifest = fixtures::manifest();
        let outcome = extract_unit(&unit("web/broken.ts", "function f() {\n  if (x) {\n"), &manifest, 1 << 20);
        assert_eq!(outcome.audit, UnitAuditOutcome::Degraded);
        assert!(matches!(outcome.observations.completeness, Completeness::Degraded(_)));
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::DegradedCoverage);
    }

    #[tokio::test]
    async fn pool_returns_sorted_outcomes_and_honors_cancellation() {
        let manifest = Arc::new(fixtures::manifest());
        let pool = WorkerPool::new(PoolSettings {
            max_workers: 2,
            unit_timeout: Duration::from_secs(5),
            max_unit_bytes: 1 << 20,
        });
        let units = vec![unit("web/b.ts", CLIENT), unit("web/a.ts", CLIENT), unit("web/c.ts", CLIENT)];
        let outcomes = pool.run(Arc::clone(&manifest), units.clone(), &RunCancellation::new()).await;
        let paths: Vec<&str> = outcomes.iter().map(|outcome| outcome.observations.unit.as_str()).collect();
        assert_eq!(paths, vec!["web/a.ts", "web/b.ts", "web/c.ts"]);
        assert!(outcomes.iter().all(|outcome| outcome.audit == UnitAuditOutcome::Ok));

        let cancelled = RunCancellation::new();
        cancelled.cancel();
        let outcomes = pool.run(manifest, units, &cancelled).await;
        assert!(outcomes.iter().all(|outcome| outcome.audit == UnitAuditOutcome::Skipped));
    }

    #[tokio::test]
    async fn slow_unit_times_out_while_the_rest_complete() {
        let manifest = Arc::new(fixtures::manifest());
        let pool = WorkerPool::new(PoolSettings {
            max_workers: 2,
            unit_timeout: Duration::from_millis(50),
            max_unit_bytes: 1 << 20,
        });
        let units = vec![unit("web/slow.ts", CLIENT), unit("web/a.ts", CLIENT), unit("web/b.ts", CLIENT)];
        let outcomes = pool
            .run_with(manifest, units, &RunCancellation::new(), |unit, manifest, max_unit_bytes| {
                if unit.path.ends_with("slow.ts") {
                    std::thread::sleep(Duration::from_millis(500));
                }
                extract_unit(unit, manifest, max_unit_bytes)
            })
            .await;

        let audits: Vec<(&str, UnitAuditOutcome)> =
            outcomes.iter().map(|outcome| (outcome.observations.unit.as_str(), outcome.audit)).collect();
        assert_eq!(
            audits,
            vec![
                ("web/a.ts", UnitAuditOutcome::Ok),
                ("web/b.ts", UnitAuditOutcome::Ok),
                ("web/slow.ts", UnitAuditOutcome::TimedOut),
            ]
        );
        let slow = &outcomes[2];
        assert_eq!(slow.observations.completeness, Completeness::TimedOut);
        assert_eq!(slow.diagnostics[0].kind, DiagnosticKind::Timeout);
        assert!(slow.reason.as_deref().unwrap().contains("50 ms"));
    }
}
