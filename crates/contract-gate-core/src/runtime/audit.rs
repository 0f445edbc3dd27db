// crates/contract-gate-core/src/runtime/audit.rs
// ============================================================================
// Module: Contract Gate Run Audit
// Description: Structured audit events for pipeline runs.
// Purpose: Emit JSON-line audit records without hard logging dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events record what a run did: state transitions, per-unit
//! extraction outcomes, rule faults, and the final summary with its report
//! digest. Events never carry source text. Sinks write one JSON object per
//! line so deployments can route them into any log pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::hashing::ReportDigest;
use crate::core::identifiers::RuleId;
use crate::core::source::Language;
use crate::interfaces::RunAuditSink;
use crate::runtime::reporter::RunOutcome;
use crate::runtime::state::PipelineState;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Extraction outcome label for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitAuditOutcome {
    /// All operations succeeded.
    Ok,
    /// Some or all operations failed.
    Degraded,
    /// Extraction exceeded the unit timeout.
    TimedOut,
    /// Unit was not analyzed.
    Skipped,
}

/// Event-specific payload.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunAuditDetail {
    /// Pipeline state transition.
    Transition {
        /// Previous state.
        from: PipelineState,
        /// New state.
        to: PipelineState,
    },
    /// Unit extraction result.
    Unit {
        /// Unit path.
        unit: String,
        /// Unit language, when known.
        language: Option<Language>,
        /// Outcome label.
        outcome: UnitAuditOutcome,
        /// Number of observations extracted.
        observations: usize,
        /// Failure reason for degraded or skipped units.
        reason: Option<String>,
    },
    /// Rule fault.
    RuleFault {
        /// Faulting rule.
        rule_id: RuleId,
        /// Unit being evaluated, if unit-scoped.
        unit: Option<String>,
        /// Fault description.
        message: String,
    },
    /// Run summary.
    Summary {
        /// Overall outcome.
        outcome: RunOutcome,
        /// Reported violations.
        violations: usize,
        /// Suppressed violations.
        suppressed: usize,
        /// Diagnostics recorded.
        diagnostics: usize,
        /// Canonical digest of the ordered report.
        report_digest: Option<ReportDigest>,
    },
}

impl RunAuditDetail {
    /// Returns the event identifier for the payload.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Transition { .. } => "pipeline_transition",
            Self::Unit { .. } => "unit_extracted",
            Self::RuleFault { .. } => "rule_fault",
            Self::Summary { .. } => "run_summary",
        }
    }
}

/// Run audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RunAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Event payload.
    #[serde(flatten)]
    pub detail: RunAuditDetail,
}

impl RunAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(detail: RunAuditDetail) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: detail.event_name(),
            timestamp_ms,
            detail,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl RunAuditSink for StderrAuditSink {
    fn record(&self, event: &RunAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RunAuditSink for FileAuditSink {
    fn record(&self, event: &RunAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl RunAuditSink for NoopAuditSink {
    fn record(&self, _event: &RunAuditEvent) {}
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

    use std::fs;

    use super::*;

    #[test]
    fn events_flatten_payload_next_to_event_name() {
        let event = RunAuditEvent::new(RunAuditDetail::Transition {
            from: PipelineState::Idle,
            to: PipelineState::ManifestLoaded,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "pipeline_transition");
        assert_eq!(value["from"], "idle");
        assert_eq!(value["to"], "manifest_loaded");
        assert!(value["timestamp_ms"].is_u64());
    }

    #[test]
    fn file_sink_appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = FileAuditSink::new(&path).unwrap();
        for unit in ["a.ts", "b.py"] {
            sink.record(&RunAuditEvent::new(RunAuditDetail::Unit {
                unit: unit.to_string(),
                language: None,
                outcome: UnitAuditOutcome::Ok,
                observations: 3,
                reason: None,
            }));
        }
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "unit_extracted");
        assert_eq!(first["outcome"], "ok");
    }
}
