// crates/contract-gate-core/src/runtime/reporter.rs
// ============================================================================
// Module: Contract Gate Violation Reporter
// Description: Append-only violation collector, ordering, and run summary.
// Purpose: Turn rule output into a deterministic, digest-stamped run result.
// Dependencies: serde, crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! The [`Reporter`] accumulates violations and diagnostics append-only and
//! flushes them exactly once through [`Reporter::finish`]. Finishing
//! deduplicates by `(rule id, primary location, subject)`, drops suppressed
//! violations, sorts by `(severity desc, file, line, rule id, message)`, and
//! stamps the ordered list with a canonical SHA-256 digest so identical
//! inputs yield byte-identical reports.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::hashing::DigestError;
use crate::core::hashing::ReportDigest;
use crate::core::violation::Diagnostic;
use crate::core::violation::DiagnosticKind;
use crate::core::violation::Violation;
use crate::runtime::state::PipelineState;
use crate::runtime::suppression::SuppressionIndex;

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Overall run outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// No violations and no fatal diagnostics.
    Pass,
    /// One or more violations.
    Fail,
    /// A fatal diagnostic stopped the run.
    Error,
}

impl RunOutcome {
    /// Returns the process exit code for the outcome.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Fail => 1,
            Self::Error => 2,
        }
    }

    /// Returns the stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Error => "error",
        }
    }
}

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Unit-level counters gathered during extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitCounts {
    /// Units fully analyzed.
    pub analyzed: usize,
    /// Units analyzed with degraded coverage or a timeout.
    pub degraded: usize,
    /// Units not analyzed.
    pub skipped: usize,
}

/// Machine-readable run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Reported violations.
    pub total: usize,
    /// Reported violations per rule id.
    pub by_rule: BTreeMap<String, usize>,
    /// Reported violations per severity.
    pub by_severity: BTreeMap<String, usize>,
    /// Violations dropped by inline suppression.
    pub suppressed: usize,
    /// Unit counters.
    pub units: UnitCounts,
    /// Diagnostics per kind.
    pub diagnostics_by_kind: BTreeMap<String, usize>,
}

// ============================================================================
// SECTION: Run Result
// ============================================================================

/// Final, ordered result of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Overall outcome.
    pub outcome: RunOutcome,
    /// Ordered violations; empty when the outcome is `Error`.
    pub violations: Vec<Violation>,
    /// Diagnostics in deterministic order.
    pub diagnostics: Vec<Diagnostic>,
    /// Summary counters.
    pub summary: RunSummary,
    /// Canonical digest of the ordered violation list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_digest: Option<ReportDigest>,
    /// States the pipeline walked through.
    pub pipeline: Vec<PipelineState>,
}

impl RunResult {
    /// Builds the result of a run that stopped on a fatal condition.
    #[must_use]
    pub fn fatal(message: impl Into<String>, pipeline: Vec<PipelineState>) -> Self {
        let diagnostics = vec![Diagnostic::new(DiagnosticKind::Fatal, message)];
        let mut summary = RunSummary::default();
        summary.diagnostics_by_kind.insert(DiagnosticKind::Fatal.as_str().to_string(), 1);
        Self {
            outcome: RunOutcome::Error,
            violations: Vec::new(),
            diagnostics,
            summary,
            report_digest: None,
            pipeline,
        }
    }

    /// Returns the process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.outcome.exit_code()
    }
}

// ============================================================================
// SECTION: Ordering
// ============================================================================

/// Total order used for report output.
fn report_order(left: &Violation, right: &Violation) -> Ordering {
    let key = |violation: &Violation| {
        (
            Reverse(violation.severity()),
            violation.primary().file.clone(),
            violation.primary().line,
            violation.rule_id().as_str().to_string(),
            violation.message().to_string(),
            violation.subject().to_string(),
        )
    };
    key(left).cmp(&key(right))
}

/// Deterministic diagnostic order.
fn diagnostic_order(left: &Diagnostic, right: &Diagnostic) -> Ordering {
    (left.kind, &left.unit, &left.location, &left.rule_id, &left.message).cmp(&(
        right.kind,
        &right.unit,
        &right.location,
        &right.rule_id,
        &right.message,
    ))
}

// ============================================================================
// SECTION: Reporter
// ============================================================================

/// Append-only collector flushed once at run end.
#[derive(Debug, Default)]
pub struct Reporter {
    /// Collected violations.
    violations: Vec<Violation>,
    /// Collected diagnostics.
    diagnostics: Vec<Diagnostic>,
    /// Inline suppressions, when enabled.
    suppressions: Option<SuppressionIndex>,
}

impl Reporter {
    /// Creates a reporter; `None` disables inline suppression.
    #[must_use]
    pub fn new(suppressions: Option<SuppressionIndex>) -> Self {
        Self {
            violations: Vec::new(),
            diagnostics: Vec::new(),
            suppressions,
        }
    }

    /// Appends violations.
    pub fn extend_violations(&mut self, violations: impl IntoIterator<Item = Violation>) {
        self.violations.extend(violations);
    }

    /// Appends diagnostics.
    pub fn extend_diagnostics(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Appends one diagnostic.
    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Deduplicates, filters, orders, and summarizes everything collected.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] when the ordered report cannot be canonicalized.
    pub fn finish(self, units: UnitCounts, pipeline: Vec<PipelineState>) -> Result<RunResult, DigestError> {
        let mut seen = BTreeSet::new();
        let mut suppressed = 0;
        let mut violations = Vec::new();
        for violation in self.violations {
            let key = (
                violation.rule_id().as_str().to_string(),
                violation.primary().clone(),
                violation.subject().to_string(),
            );
            if !seen.insert(key) {
                continue;
            }
            if self.suppressions.as_ref().is_some_and(|index| index.suppresses(&violation)) {
                suppressed += 1;
                continue;
            }
            violations.push(violation);
        }
        violations.sort_by(report_order);

        let mut diagnostics = self.diagnostics;
        diagnostics.sort_by(diagnostic_order);
        diagnostics.dedup();

        let mut summary = RunSummary {
            total: violations.len(),
            suppressed,
            units,
            ..RunSummary::default()
        };
        for violation in &violations {
            *summary.by_rule.entry(violation.rule_id().as_str().to_string()).or_default() += 1;
            *summary.by_severity.entry(violation.severity().as_str().to_string()).or_default() += 1;
        }
        for diagnostic in &diagnostics {
            *summary.diagnostics_by_kind.entry(diagnostic.kind.as_str().to_string()).or_default() += 1;
        }

        let outcome = if diagnostics.iter().any(Diagnostic::is_fatal) {
            RunOutcome::Error
        } else if violations.is_empty() {
            RunOutcome::Pass
        } else {
            RunOutcome::Fail
        };
        if outcome == RunOutcome::Error {
            violations.clear();
        }
        let report_digest = Some(ReportDigest::of(&violations)?);
        Ok(RunResult {
            outcome,
            violations,
            diagnostics,
            summary,
            report_digest,
            pipeline,
        })
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
    use crate::core::identifiers::RuleId;
    use crate::core::source::SourceLocation;
    use crate::core::violation::Severity;
    use crate::runtime::suppression::FileSuppressions;

    fn violation(rule: &str, severity: Severity, file: &str, line: u32, subject: &str) -> Violation {
        Violation::new(
            RuleId::new(rule),
            severity,
            SourceLocation::new(file, line),
            subject,
            format!("{rule} at {file}:{line}"),
        )
    }

    #[test]
    fn orders_by_severity_then_location() {
        let mut reporter = Reporter::new(None);
        reporter.extend_violations([
            violation("TQ-negative-cases", Severity::Warn, "a.ts", 1, "negative-cases"),
            violation("CTR-request-shape", Severity::Error, "b.ts", 9, "sku"),
            violation("CTR-request-shape", Severity::Error, "b.ts", 2, "sku"),
            violation("CTR-request-shape", Severity::Error, "a.ts", 30, "sku"),
        ]);
        let result = reporter.finish(UnitCounts::default(), Vec::new()).unwrap();
        let order: Vec<String> = result.violations.iter().map(|v| v.primary().to_string()).collect();
        assert_eq!(order, vec!["a.ts:30", "b.ts:2", "b.ts:9", "a.ts:1"]);
        assert_eq!(result.outcome, RunOutcome::Fail);
        assert_eq!(result.summary.by_severity.get("error"), Some(&3));
    }

    #[test]
    fn duplicates_collapse_but_distinct_subjects_survive() {
        let mut reporter = Reporter::new(None);
        reporter.extend_violations([
            violation("CTR-request-shape", Severity::Error, "a.ts", 4, "grant_type"),
            violation("CTR-request-shape", Severity::Error, "a.ts", 4, "grant_type"),
            violation("CTR-request-shape", Severity::Error, "a.ts", 4, "client_id"),
        ]);
        let result = reporter.finish(UnitCounts::default(), Vec::new()).unwrap();
        assert_eq!(result.summary.total, 2);
        assert_eq!(result.summary.by_rule.get("CTR-request-shape"), Some(&2));
    }

    #[test]
    fn suppressed_violations_are_counted_not_reported() {
        let mut index = SuppressionIndex::new();
        index.insert("a.ts", FileSuppressions::parse("// contract-gate-disable-file CTR-request-shape\n"));
        let mut reporter = Reporter::new(Some(index));
        reporter.extend_violations([violation("CTR-request-shape", Severity::Error, "a.ts", 4, "sku")]);
        let result = reporter.finish(UnitCounts::default(), Vec::new()).unwrap();
        assert_eq!(result.outcome, RunOutcome::Pass);
        assert_eq!(result.summary.suppressed, 1);
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn digest_is_independent_of_insertion_order() {
        let first = [
            violation("CTR-request-shape", Severity::Error, "a.ts", 4, "sku"),
            violation("CTR-response-shape", Severity::Error, "b.ts", 1, "id"),
        ];
        let mut forward = Reporter::new(None);
        forward.extend_violations(first.clone());
        let mut backward = Reporter::new(None);
        backward.extend_violations(first.into_iter().rev());
        let left = forward.finish(UnitCounts::default(), Vec::new()).unwrap();
        let right = backward.finish(UnitCounts::default(), Vec::new()).unwrap();
        assert_eq!(left.report_digest, right.report_digest);
    }

    #[test]
    fn fatal_diagnostic_forces_error_and_drops_violations() {
        let mut reporter = Reporter::new(None);
        reporter.extend_violations([violation("CTR-request-shape", Severity::Error, "a.ts", 4, "sku")]);
        reporter.push_diagnostic(Diagnostic::new(DiagnosticKind::Fatal, "no units"));
        let result = reporter.finish(UnitCounts::default(), Vec::new()).unwrap();
        assert_eq!(result.outcome, RunOutcome::Error);
        assert!(result.violations.is_empty());
        assert_eq!(result.exit_code(), 2);
    }
}
