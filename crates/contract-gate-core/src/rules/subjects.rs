// crates/contract-gate-core/src/rules/subjects.rs
// ============================================================================
// Module: Contract Gate Rule Subjects
// Description: Subjects rules evaluate and helpers shared across families.
// Purpose: Give every rule one tagged input type.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! A [`RuleSubject`] is either one observation, an [`EndpointAggregate`]
//! (every bound observation of one endpoint), or a [`Correlation`] (the
//! producer and consumer views of one endpoint body). Aggregates and
//! correlations borrow observations; they exist only while rules run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::manifest::BodyDirection;
use crate::core::manifest::EndpointKey;
use crate::core::manifest::EndpointRef;
use crate::core::manifest::EndpointSpec;
use crate::core::manifest::FieldSpec;
use crate::core::manifest::ResolvedEndpoint;
use crate::core::manifest::find_field;
use crate::core::naming::names_match;
use crate::core::observation::BoundarySide;
use crate::core::observation::EnumObservation;
use crate::core::observation::ErrorHandlingObservation;
use crate::core::observation::ModelObservation;
use crate::core::observation::ObservedField;
use crate::core::observation::RequestObservation;
use crate::core::observation::ResponseObservation;
use crate::core::observation::ShapeBinding;
use crate::core::observation::TestObservation;
use crate::core::observation::ValueKind;
use crate::core::source::SourceLocation;
use crate::rules::RuleFault;

// ============================================================================
// SECTION: Subject Kinds
// ============================================================================

/// Kind of subject a rule accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// Request observation.
    Request,
    /// Response observation.
    Response,
    /// Error-handling observation.
    Error,
    /// Enum dispatch observation.
    Enum,
    /// Test observation.
    Test,
    /// Model observation.
    Model,
    /// Endpoint aggregate.
    Endpoint,
    /// Cross-boundary correlation.
    Correlation,
}

impl SubjectKind {
    /// Returns the stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Error => "error",
            Self::Enum => "enum",
            Self::Test => "test",
            Self::Model => "model",
            Self::Endpoint => "endpoint",
            Self::Correlation => "correlation",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged rule input.
#[derive(Debug, Clone, Copy)]
pub enum RuleSubject<'a> {
    /// One request.
    Request(&'a RequestObservation),
    /// One response.
    Response(&'a ResponseObservation),
    /// One fallible call.
    Error(&'a ErrorHandlingObservation),
    /// One enum dispatch.
    Enum(&'a EnumObservation),
    /// One test.
    Test(&'a TestObservation),
    /// One model.
    Model(&'a ModelObservation),
    /// Every observation bound to one endpoint.
    Endpoint(&'a EndpointAggregate<'a>),
    /// Producer and consumer views of one endpoint body.
    Correlation(&'a Correlation<'a>),
}

impl RuleSubject<'_> {
    /// Returns the subject kind.
    #[must_use]
    pub const fn kind(&self) -> SubjectKind {
        match self {
            Self::Request(_) => SubjectKind::Request,
            Self::Response(_) => SubjectKind::Response,
            Self::Error(_) => SubjectKind::Error,
            Self::Enum(_) => SubjectKind::Enum,
            Self::Test(_) => SubjectKind::Test,
            Self::Model(_) => SubjectKind::Model,
            Self::Endpoint(_) => SubjectKind::Endpoint,
            Self::Correlation(_) => SubjectKind::Correlation,
        }
    }

    /// Returns the fault raised when a rule receives this subject unexpectedly.
    #[must_use]
    pub fn unexpected(&self) -> RuleFault {
        RuleFault::UnexpectedSubject(self.kind().to_string())
    }
}

// ============================================================================
// SECTION: Endpoint Aggregates
// ============================================================================

/// Every non-test and test observation bound to one endpoint.
#[derive(Debug, Clone)]
pub struct EndpointAggregate<'a> {
    /// Resolved endpoint.
    pub endpoint: ResolvedEndpoint<'a>,
    /// Owned reference.
    pub reference: EndpointRef,
    /// Bound requests.
    pub requests: Vec<&'a RequestObservation>,
    /// Bound responses.
    pub responses: Vec<&'a ResponseObservation>,
    /// Bound enum dispatch.
    pub enums: Vec<&'a EnumObservation>,
    /// Tests mentioning the endpoint.
    pub tests: Vec<&'a TestObservation>,
    /// Non-test models bound to the endpoint, with the binding used.
    pub models: Vec<(&'a ModelObservation, &'a ShapeBinding)>,
}

impl EndpointAggregate<'_> {
    /// Returns consumer-side response observations that read the body.
    pub fn readers(&self) -> impl Iterator<Item = &ResponseObservation> {
        let read_side = receiver_side(&self.reference.key, self.reference.key.read_direction());
        self.responses.iter().copied().filter(move |obs| obs.side == read_side)
    }
}

// ============================================================================
// SECTION: Correlations
// ============================================================================

/// Where a boundary field was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldOrigin {
    /// Constructed in a body.
    Constructed,
    /// Read from a body.
    Read,
    /// Declared on a bound model.
    Model,
}

/// Field as one side of the boundary sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryField {
    /// Access path from the body root.
    pub path: Vec<String>,
    /// Inferred or declared kind.
    pub kind: ValueKind,
    /// Literal value, when constructed from a literal.
    pub literal: Option<String>,
    /// Extra naming hints (value reference, declared identifier).
    pub hints: Vec<String>,
    /// Observation site.
    pub location: SourceLocation,
    /// Origin of the observation.
    pub origin: FieldOrigin,
}

impl BoundaryField {
    /// Returns the last path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }
}

/// Scored unit-mismatch finding between the two sides of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitMismatchFinding {
    /// Dotted manifest path.
    pub field_path: String,
    /// Confidence score in `[0, 1]`.
    pub score: f64,
    /// Signals that contributed to the score.
    pub signals: Vec<String>,
    /// Producer-side site.
    pub producer: SourceLocation,
    /// Consumer-side site.
    pub consumer: SourceLocation,
}

/// Producer and consumer views of one endpoint body.
#[derive(Debug, Clone)]
pub struct Correlation<'a> {
    /// Resolved endpoint.
    pub endpoint: ResolvedEndpoint<'a>,
    /// Owned reference.
    pub reference: EndpointRef,
    /// Body direction being correlated.
    pub direction: BodyDirection,
    /// Producer-side fields.
    pub producer: Vec<BoundaryField>,
    /// Consumer-side fields.
    pub consumer: Vec<BoundaryField>,
    /// Producer-side enum dispatch for this body.
    pub producer_enums: Vec<&'a EnumObservation>,
    /// Consumer-side enum dispatch for this body.
    pub consumer_enums: Vec<&'a EnumObservation>,
    /// Unit-mismatch findings at or above the violation cutoff.
    pub unit_mismatches: Vec<UnitMismatchFinding>,
}

impl Correlation<'_> {
    /// Returns the side that sends the body.
    #[must_use]
    pub const fn sender(&self) -> BoundarySide {
        sender_side(&self.reference.key, self.direction)
    }

    /// Returns the fields of a side.
    #[must_use]
    pub fn fields(&self, side: BoundarySide) -> &[BoundaryField] {
        match side {
            BoundarySide::Producer => &self.producer,
            BoundarySide::Consumer => &self.consumer,
            BoundarySide::Unknown => &[],
        }
    }

    /// Returns the enum dispatch of a side.
    #[must_use]
    pub fn enums(&self, side: BoundarySide) -> &[&EnumObservation] {
        match side {
            BoundarySide::Producer => &self.producer_enums,
            BoundarySide::Consumer => &self.consumer_enums,
            BoundarySide::Unknown => &[],
        }
    }
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Returns the side that sends a body.
///
/// HTTP consumers send requests and producers send responses; message
/// publishers (producers) send the payload declared under `request`.
#[must_use]
pub const fn sender_side(key: &EndpointKey, direction: BodyDirection) -> BoundarySide {
    match (key, direction) {
        (EndpointKey::Http { .. }, BodyDirection::Request) => BoundarySide::Consumer,
        (EndpointKey::Http { .. } | EndpointKey::Message { .. }, _) => BoundarySide::Producer,
    }
}

/// Returns the side that receives a body.
#[must_use]
pub const fn receiver_side(key: &EndpointKey, direction: BodyDirection) -> BoundarySide {
    match sender_side(key, direction) {
        BoundarySide::Producer => BoundarySide::Consumer,
        BoundarySide::Consumer | BoundarySide::Unknown => BoundarySide::Producer,
    }
}

/// Returns the field list at a dotted prefix, or `None` when it does not resolve.
#[must_use]
pub fn shape_at<'a>(
    endpoint: &'a EndpointSpec,
    direction: BodyDirection,
    prefix: &str,
) -> Option<&'a [FieldSpec]> {
    let mut fields = endpoint.body(direction).fields.as_slice();
    for segment in prefix.split('.').filter(|segment| !segment.is_empty()) {
        fields = find_field(fields, segment)?.children();
    }
    Some(fields)
}

/// Splits a dotted path into owned segments.
#[must_use]
pub fn path_segments(path: &str) -> Vec<String> {
    path.split('.').filter(|segment| !segment.is_empty()).map(ToString::to_string).collect()
}

/// Joins a prefix and a name into a dotted path.
#[must_use]
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() { name.to_string() } else { format!("{prefix}.{name}") }
}

/// Required fields missing from an observed literal shape, recursing into
/// present object children that are themselves literal shapes.
///
/// Returns `(dotted path, spec)` pairs in declaration order. Children of an
/// absent parent are not reported separately.
#[must_use]
pub fn missing_required<'a>(
    declared: &'a [FieldSpec],
    observed: &[ObservedField],
    prefix: &str,
) -> Vec<(String, &'a FieldSpec)> {
    let mut missing = Vec::new();
    for spec in declared {
        let path = join_path(prefix, &spec.name);
        let present = observed.iter().find(|field| names_match(&field.name, &spec.name));
        match present {
            None if spec.required && spec.default.is_none() => missing.push((path, spec)),
            Some(field) => {
                if let Some(children) = &field.children {
                    missing.extend(missing_required(spec.children(), children, &path));
                }
            }
            None => {}
        }
    }
    missing
}

/// Observed fields the manifest does not declare, with dotted paths.
///
/// Opaque objects (declared without children) accept any nested keys.
#[must_use]
pub fn undeclared<'a>(
    declared: &[FieldSpec],
    observed: &'a [ObservedField],
    prefix: &str,
) -> Vec<(String, &'a ObservedField)> {
    let mut found = Vec::new();
    for field in observed {
        let path = join_path(prefix, &field.name);
        match find_field(declared, &field.name) {
            None => found.push((path, field)),
            Some(spec) => {
                if let Some(children) = &field.children
                    && !spec.children().is_empty()
                {
                    found.extend(undeclared(spec.children(), children, &path));
                }
            }
        }
    }
    found
}

/// Walks observed fields alongside their declared specs, depth first.
///
/// Calls `visit` with the dotted path, spec, and observed field for every
/// observed field the manifest declares.
pub fn visit_declared<'a, F>(
    declared: &'a [FieldSpec],
    observed: &'a [ObservedField],
    prefix: &str,
    visit: &mut F,
) where
    F: FnMut(&str, &'a FieldSpec, &'a ObservedField),
{
    for field in observed {
        let Some(spec) = find_field(declared, &field.name) else {
            continue;
        };
        let path = join_path(prefix, &spec.name);
        visit(&path, spec, field);
        if let Some(children) = &field.children {
            visit_declared(spec.children(), children, &path, visit);
        }
    }
}

/// Formats a list of values for messages.
#[must_use]
pub fn list(values: &[String]) -> String {
    values.join(", ")
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
    use crate::core::manifest::FieldKind;
    use crate::core::manifest::HttpMethod;
    use crate::core::manifest::MessageDirection;
    use crate::core::observation::Conversion;
    use crate::core::observation::NameSource;

    fn spec(name: &str, required: bool, fields: Vec<FieldSpec>) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            kind: if fields.is_empty() { FieldKind::String } else { FieldKind::Object },
            required,
            nullable: false,
            default: None,
            format: None,
            pattern: None,
            range: None,
            values: Vec::new(),
            fields,
            items: None,
            unit: None,
        }
    }

    fn observed(name: &str, children: Option<Vec<ObservedField>>) -> ObservedField {
        ObservedField {
            name: name.to_string(),
            source: NameSource::Wire,
            kind: ValueKind::String,
            conversion: Conversion::None,
            literal: None,
            value_ref: None,
            children,
            location: SourceLocation::new("a.ts", 1),
        }
    }

    #[test]
    fn missing_required_recurses_only_into_present_parents() {
        let declared = vec![
            spec("grant_type", true, Vec::new()),
            spec("client", true, vec![spec("id", true, Vec::new())]),
            spec("scope", false, Vec::new()),
        ];
        let body = vec![observed("client", Some(Vec::new()))];
        let missing: Vec<String> =
            missing_required(&declared, &body, "").into_iter().map(|(path, _)| path).collect();
        assert_eq!(missing, vec!["grant_type", "client.id"]);

        let absent: Vec<String> =
            missing_required(&declared, &[], "").into_iter().map(|(path, _)| path).collect();
        assert_eq!(absent, vec!["grant_type", "client"]);
    }

    #[test]
    fn undeclared_skips_opaque_objects() {
        let declared = vec![spec("meta", false, Vec::new()), spec("sku", true, Vec::new())];
        let body = vec![
            observed("meta", Some(vec![observed("anything", None)])),
            observed("sku", None),
            observed("extra", None),
        ];
        let paths: Vec<String> = undeclared(&declared, &body, "").into_iter().map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["extra"]);
    }

    #[test]
    fn sender_side_follows_protocol_and_direction() {
        let http = EndpointKey::Http {
            method: HttpMethod::Post,
            path: "/x".to_string(),
        };
        let message = EndpointKey::Message {
            topic: "orders.created".to_string(),
            direction: MessageDirection::Publish,
        };
        assert_eq!(sender_side(&http, BodyDirection::Request), BoundarySide::Consumer);
        assert_eq!(sender_side(&http, BodyDirection::Response), BoundarySide::Producer);
        assert_eq!(sender_side(&message, BodyDirection::Request), BoundarySide::Producer);
        assert_eq!(receiver_side(&message, BodyDirection::Request), BoundarySide::Consumer);
    }
}
