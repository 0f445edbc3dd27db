// crates/contract-gate-core/src/rules/mod.rs
// ============================================================================
// Module: Contract Gate Rule Catalog
// Description: Rule descriptors, the append-only catalog, and rule context.
// Purpose: Register pure conformance rules as tagged data for one generic loop.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! Every rule is a [`RuleDescriptor`]: identifier, family, the subject kinds
//! it accepts, default severity, description, rationale, and a plain `fn`
//! pointer. Descriptors live in an append-only [`RuleCatalog`] built once at
//! startup; the evaluator walks the catalog with one generic loop and never
//! inspects rule types at runtime.
//!
//! Rule functions are pure: they read one [`RuleSubject`] and the manifest
//! through [`RuleContext`] and return violations or a [`RuleFault`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod boundary;
pub mod conformance;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod quality;
pub mod shape;
pub mod status;
pub mod subjects;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::RuleId;
use crate::core::manifest::ContractManifest;
use crate::core::manifest::EndpointRef;
use crate::core::manifest::ResolvedEndpoint;
use crate::core::source::SourceLocation;
use crate::core::violation::Severity;
use crate::core::violation::Violation;
pub use crate::rules::subjects::RuleSubject;
pub use crate::rules::subjects::SubjectKind;

// ============================================================================
// SECTION: Rule Identifiers
// ============================================================================

/// Missing or undeclared request fields and headers.
pub const REQUEST_SHAPE: &str = "CTR-request-shape";
/// Missing response fields, unread fields, and unguarded nullable access.
pub const RESPONSE_SHAPE: &str = "CTR-response-shape";
/// Declared status codes without handling.
pub const STATUS_CODE_HANDLING: &str = "CTR-status-code-handling";
/// Kind, format, enum-literal, and exact-name deviations.
pub const MANIFEST_CONFORMANCE: &str = "CTR-manifest-conformance";
/// Missing or partial enforcement of declared constraints.
pub const STRICTNESS_PARITY: &str = "CTR-strictness-parity";
/// Fallible calls without recovery or propagation.
pub const ERROR_PATH_COVERAGE: &str = "TQ-error-path-coverage";
/// Presence-only assertions on multi-valued fields.
pub const NO_SHALLOW_ASSERTIONS: &str = "TQ-no-shallow-assertions";
/// Endpoints whose tests exercise no failure status.
pub const NEGATIVE_CASES: &str = "TQ-negative-cases";
/// Field names that differ across the boundary.
pub const BOUNDARY_NAMING_DRIFT: &str = "CTR-boundary-naming-drift";
/// Numeric fields that likely disagree on units.
pub const BOUNDARY_UNIT_MISMATCH: &str = "CTR-boundary-unit-mismatch";
/// Enum values sent by one side and unhandled by the other.
pub const BOUNDARY_ENUM_DIVERGENCE: &str = "CTR-boundary-enum-divergence";

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleFamily {
    /// Request body and header shape.
    RequestShape,
    /// Response body shape and null safety.
    ResponseShape,
    /// Status code handling completeness.
    StatusCodeHandling,
    /// Declared kind and format conformance.
    ManifestConformance,
    /// Constraint enforcement parity.
    StrictnessParity,
    /// Error path coverage.
    ErrorPathCoverage,
    /// Test assertion depth.
    NoShallowAssertions,
    /// Negative test cases.
    NegativeCases,
    /// Cross-boundary consistency.
    Boundary,
}

impl RuleFamily {
    /// Returns the stable family label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestShape => "request-shape",
            Self::ResponseShape => "response-shape",
            Self::StatusCodeHandling => "status-code-handling",
            Self::ManifestConformance => "manifest-conformance",
            Self::StrictnessParity => "strictness-parity",
            Self::ErrorPathCoverage => "error-path-coverage",
            Self::NoShallowAssertions => "no-shallow-assertions",
            Self::NegativeCases => "negative-cases",
            Self::Boundary => "boundary",
        }
    }
}

impl fmt::Display for RuleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature shared by every rule function.
pub type RuleFn = fn(&RuleContext<'_>, &RuleSubject<'_>) -> Result<Vec<Violation>, RuleFault>;

/// Tagged rule descriptor.
#[derive(Clone, Copy)]
pub struct RuleDescriptor {
    /// Stable rule identifier.
    pub id: &'static str,
    /// Rule family.
    pub family: RuleFamily,
    /// Subject kinds the rule accepts.
    pub subjects: &'static [SubjectKind],
    /// Default severity.
    pub severity: Severity,
    /// One-line description.
    pub description: &'static str,
    /// Why the finding matters.
    pub rationale: &'static str,
    /// Rule function.
    pub evaluate: RuleFn,
}

impl fmt::Debug for RuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDescriptor")
            .field("id", &self.id)
            .field("family", &self.family)
            .field("subjects", &self.subjects)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

impl RuleDescriptor {
    /// Returns true when the rule accepts a subject kind.
    #[must_use]
    pub fn accepts(&self, kind: SubjectKind) -> bool {
        self.subjects.contains(&kind)
    }

    /// Returns the rule identifier as an owned id.
    #[must_use]
    pub fn rule_id(&self) -> RuleId {
        RuleId::new(self.id)
    }
}

/// Configured level for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleLevel {
    /// Report as error.
    Error,
    /// Report as warning.
    Warn,
    /// Do not run.
    Off,
}

impl RuleLevel {
    /// Returns the severity, or `None` when the rule is off.
    #[must_use]
    pub const fn severity(self) -> Option<Severity> {
        match self {
            Self::Error => Some(Severity::Error),
            Self::Warn => Some(Severity::Warn),
            Self::Off => None,
        }
    }
}

// ============================================================================
// SECTION: Faults
// ============================================================================

/// Internal rule failure.
///
/// Faults are caught per (rule, unit), surfaced as rule-fault diagnostics,
/// and never abort a run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleFault {
    /// Subject references an endpoint the manifest does not declare.
    #[error("endpoint not declared in manifest: {0}")]
    UnknownEndpoint(String),
    /// Rule received a subject kind it does not accept.
    #[error("rule does not accept {0} subjects")]
    UnexpectedSubject(String),
    /// Rule panicked.
    #[error("rule panicked: {0}")]
    Panicked(String),
}

/// Catalog registration failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A rule with the same identifier is already registered.
    #[error("duplicate rule identifier: {0}")]
    DuplicateRule(String),
    /// A descriptor accepts no subject kinds.
    #[error("rule {0} accepts no subjects")]
    NoSubjects(String),
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Read-only context passed to every rule invocation.
#[derive(Debug, Clone)]
pub struct RuleContext<'a> {
    /// Shared manifest.
    pub manifest: &'a ContractManifest,
    /// Rule being evaluated.
    pub rule_id: RuleId,
    /// Effective severity after configuration overrides.
    pub severity: Severity,
}

impl<'a> RuleContext<'a> {
    /// Builds a violation for the current rule.
    #[must_use]
    pub fn violation(
        &self,
        primary: SourceLocation,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Violation {
        Violation::new(self.rule_id.clone(), self.severity, primary, subject, message)
    }

    /// Looks up a bound endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RuleFault::UnknownEndpoint`] when the reference is not
    /// declared.
    pub fn endpoint(&self, reference: &EndpointRef) -> Result<ResolvedEndpoint<'a>, RuleFault> {
        self.manifest
            .endpoint(reference)
            .ok_or_else(|| RuleFault::UnknownEndpoint(reference.to_string()))
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Append-only rule registry.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    /// Registered rules in registration order.
    rules: Vec<RuleDescriptor>,
}

impl RuleCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rules: Vec::new(),
        }
    }

    /// Appends a rule.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the identifier is already registered or
    /// the descriptor accepts no subjects.
    pub fn register(&mut self, descriptor: RuleDescriptor) -> Result<(), CatalogError> {
        if descriptor.subjects.is_empty() {
            return Err(CatalogError::NoSubjects(descriptor.id.to_string()));
        }
        if self.get(descriptor.id).is_some() {
            return Err(CatalogError::DuplicateRule(descriptor.id.to_string()));
        }
        self.rules.push(descriptor);
        Ok(())
    }

    /// Returns every rule in registration order.
    #[must_use]
    pub fn rules(&self) -> &[RuleDescriptor] {
        &self.rules
    }

    /// Looks up a rule by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RuleDescriptor> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    /// Returns rules accepting a subject kind.
    pub fn accepting(&self, kind: SubjectKind) -> impl Iterator<Item = &RuleDescriptor> {
        self.rules.iter().filter(move |rule| rule.accepts(kind))
    }

    /// Returns the number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Built-in rule descriptors in catalog order.
const BUILTIN_RULES: &[RuleDescriptor] = &[
    RuleDescriptor {
        id: REQUEST_SHAPE,
        family: RuleFamily::RequestShape,
        subjects: &[SubjectKind::Request],
        severity: Severity::Error,
        description: "Requests carry every required field and header and nothing undeclared.",
        rationale: "A producer rejects or misreads bodies that omit required fields.",
        evaluate: shape::request_shape,
    },
    RuleDescriptor {
        id: RESPONSE_SHAPE,
        family: RuleFamily::ResponseShape,
        subjects: &[SubjectKind::Response, SubjectKind::Model, SubjectKind::Endpoint],
        severity: Severity::Error,
        description: "Responses carry required fields, consumers read them, nullable access is guarded.",
        rationale: "Unguarded access to nullable fields crashes consumers at runtime.",
        evaluate: shape::response_shape,
    },
    RuleDescriptor {
        id: STATUS_CODE_HANDLING,
        family: RuleFamily::StatusCodeHandling,
        subjects: &[SubjectKind::Endpoint],
        severity: Severity::Error,
        description: "Every declared status code is handled by some consumer branch.",
        rationale: "Unhandled failure statuses surface as decode errors or silent data loss.",
        evaluate: status::status_code_handling,
    },
    RuleDescriptor {
        id: MANIFEST_CONFORMANCE,
        family: RuleFamily::ManifestConformance,
        subjects: &[SubjectKind::Request, SubjectKind::Response, SubjectKind::Model],
        severity: Severity::Error,
        description: "Constructed values match declared kinds, formats, enum values, and names.",
        rationale: "Kind drift (integers as strings, raw decimals) breaks strict decoders.",
        evaluate: conformance::manifest_conformance,
    },
    RuleDescriptor {
        id: STRICTNESS_PARITY,
        family: RuleFamily::StrictnessParity,
        subjects: &[SubjectKind::Request, SubjectKind::Enum],
        severity: Severity::Error,
        description: "Declared ranges, formats, and enum values are enforced with the same cardinality.",
        rationale: "Looser client validation lets invalid values reach the producer.",
        evaluate: conformance::strictness_parity,
    },
    RuleDescriptor {
        id: ERROR_PATH_COVERAGE,
        family: RuleFamily::ErrorPathCoverage,
        subjects: &[SubjectKind::Error],
        severity: Severity::Error,
        description: "Network and decode calls have a reachable recovery or propagation path.",
        rationale: "Unhandled failures crash the caller or leave it in an undefined state.",
        evaluate: quality::error_path_coverage,
    },
    RuleDescriptor {
        id: NO_SHALLOW_ASSERTIONS,
        family: RuleFamily::NoShallowAssertions,
        subjects: &[SubjectKind::Test],
        severity: Severity::Warn,
        description: "Tests assert values, not mere presence, for multi-valued fields.",
        rationale: "Presence-only assertions pass when the value is wrong.",
        evaluate: quality::no_shallow_assertions,
    },
    RuleDescriptor {
        id: NEGATIVE_CASES,
        family: RuleFamily::NegativeCases,
        subjects: &[SubjectKind::Endpoint],
        severity: Severity::Warn,
        description: "Tested endpoints exercise at least one declared failure status.",
        rationale: "Happy-path-only suites leave error handling unverified.",
        evaluate: status::negative_cases,
    },
    RuleDescriptor {
        id: BOUNDARY_NAMING_DRIFT,
        family: RuleFamily::Boundary,
        subjects: &[SubjectKind::Correlation],
        severity: Severity::Error,
        description: "Producer and consumer use the manifest's exact field name.",
        rationale: "Case or spelling drift silently drops the field during decoding.",
        evaluate: boundary::naming_drift,
    },
    RuleDescriptor {
        id: BOUNDARY_UNIT_MISMATCH,
        family: RuleFamily::Boundary,
        subjects: &[SubjectKind::Correlation],
        severity: Severity::Warn,
        description: "Producer and consumer agree on the unit of numeric fields.",
        rationale: "Cents read as dollars or milliseconds read as seconds corrupt values.",
        evaluate: boundary::unit_mismatch,
    },
    RuleDescriptor {
        id: BOUNDARY_ENUM_DIVERGENCE,
        family: RuleFamily::Boundary,
        subjects: &[SubjectKind::Correlation],
        severity: Severity::Error,
        description: "Enum values one side sends are handled by the other side.",
        rationale: "An unhandled case on the receiver falls through to undefined behavior.",
        evaluate: boundary::enum_divergence,
    },
];

/// Builds the catalog of built-in rules.
#[must_use]
pub fn builtin_catalog() -> RuleCatalog {
    RuleCatalog {
        rules: BUILTIN_RULES.to_vec(),
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

    #[test]
    fn builtin_catalog_registers_eleven_unique_rules() {
        let catalog = builtin_catalog();
        assert_eq!(catalog.len(), 11);
        let mut ids: Vec<&str> = catalog.rules().iter().map(|rule| rule.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 11);
        assert!(ids.iter().all(|id| id.starts_with("CTR-") || id.starts_with("TQ-")));
    }

    #[test]
    fn catalog_is_append_only_and_rejects_duplicates() {
        let mut catalog = builtin_catalog();
        let descriptor = *catalog.get(REQUEST_SHAPE).unwrap();
        assert_eq!(
            catalog.register(descriptor),
            Err(CatalogError::DuplicateRule(REQUEST_SHAPE.to_string()))
        );
        let mut custom = descriptor;
        custom.id = "CTR-custom";
        catalog.register(custom).unwrap();
        assert_eq!(catalog.rules().last().map(|rule| rule.id), Some("CTR-custom"));
    }

    #[test]
    fn subject_filter_selects_endpoint_rules() {
        let catalog = builtin_catalog();
        let ids: Vec<&str> = catalog.accepting(SubjectKind::Endpoint).map(|rule| rule.id).collect();
        assert_eq!(ids, vec![RESPONSE_SHAPE, STATUS_CODE_HANDLING, NEGATIVE_CASES]);
        assert_eq!(RuleLevel::Off.severity(), None);
    }
}
