// crates/contract-gate-core/src/core/violation.rs
// ============================================================================
// Module: Contract Gate Violations
// Description: Violation records, severities, and engine diagnostics.
// Purpose: Describe findings about analyzed code and about the run itself.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Violation`] is the engine's correct output: a located defect in the
//! analyzed code, tagged with the rule that found it. A [`Diagnostic`]
//! describes the run instead (degraded coverage, rule faults, advisories).
//! Violations are built once by rule functions and never mutated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RuleId;
use crate::core::source::SourceLocation;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Violation severity; `Error` orders above `Warn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Lower-priority finding.
    Warn,
    /// Contract breach.
    Error,
}

impl Severity {
    /// Returns the stable label for the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Violations
// ============================================================================

/// Located defect found by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Rule that produced the violation.
    rule_id: RuleId,
    /// Effective severity.
    severity: Severity,
    /// Locations; the first entry is the primary location.
    locations: Vec<SourceLocation>,
    /// Human-readable message.
    message: String,
    /// Optional fix hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suggested_fix: Option<String>,
    /// Stable subject (field path, code set) distinguishing findings that
    /// share a primary location.
    #[serde(skip)]
    subject: String,
}

impl Violation {
    /// Creates a violation at a primary location.
    #[must_use]
    pub fn new(
        rule_id: RuleId,
        severity: Severity,
        primary: SourceLocation,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id,
            severity,
            locations: vec![primary],
            message: message.into(),
            suggested_fix: None,
            subject: subject.into(),
        }
    }

    /// Adds a secondary location.
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        if !self.locations.contains(&location) {
            self.locations.push(location);
        }
        self
    }

    /// Attaches a fix hint.
    #[must_use]
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    /// Returns the rule identifier.
    #[must_use]
    pub const fn rule_id(&self) -> &RuleId {
        &self.rule_id
    }

    /// Returns the severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns every location, primary first.
    #[must_use]
    pub fn locations(&self) -> &[SourceLocation] {
        &self.locations
    }

    /// Returns the primary location.
    #[must_use]
    pub fn primary(&self) -> &SourceLocation {
        &self.locations[0]
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the fix hint.
    #[must_use]
    pub fn suggested_fix(&self) -> Option<&str> {
        self.suggested_fix.as_deref()
    }

    /// Returns the subject used for deduplication.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

// ============================================================================
// SECTION: Diagnostics
// ============================================================================

/// Category of an engine diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A unit could not be fully analyzed.
    DegradedCoverage,
    /// A unit exceeded the extraction timeout.
    Timeout,
    /// A unit was not analyzed (no adapter, cancelled).
    Skipped,
    /// A rule failed internally.
    RuleFault,
    /// Low-confidence heuristic finding.
    Advisory,
    /// A model matched several endpoint shapes equally well.
    AmbiguousBinding,
    /// A body was not a literal shape and could not be checked.
    PartialShape,
    /// The run could not proceed.
    Fatal,
}

impl DiagnosticKind {
    /// Returns the stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DegradedCoverage => "degraded-coverage",
            Self::Timeout => "timeout",
            Self::Skipped => "skipped",
            Self::RuleFault => "rule-fault",
            Self::Advisory => "advisory",
            Self::AmbiguousBinding => "ambiguous-binding",
            Self::PartialShape => "partial-shape",
            Self::Fatal => "fatal",
        }
    }
}

/// Diagnostic about the run rather than the analyzed code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Diagnostic category.
    pub kind: DiagnosticKind,
    /// Affected unit, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Rule involved, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<RuleId>,
    /// Location, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    /// Human-readable message.
    pub message: String,
    /// Heuristic confidence for advisories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Diagnostic {
    /// Creates a diagnostic with only a kind and message.
    #[must_use]
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            unit: None,
            rule_id: None,
            location: None,
            message: message.into(),
            confidence: None,
        }
    }

    /// Attaches the affected unit.
    #[must_use]
    pub fn for_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attaches the rule involved.
    #[must_use]
    pub fn for_rule(mut self, rule_id: RuleId) -> Self {
        self.rule_id = Some(rule_id);
        self
    }

    /// Attaches a location.
    #[must_use]
    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Attaches a heuristic confidence.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Returns true for fatal diagnostics.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind == DiagnosticKind::Fatal
    }
}
