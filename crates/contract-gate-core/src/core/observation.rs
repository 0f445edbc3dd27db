// crates/contract-gate-core/src/core/observation.rs
// ============================================================================
// Module: Contract Gate Observation Model
// Description: Language-agnostic facts extracted from source units.
// Purpose: Give rules and the correlator one vocabulary for every adapter.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Observations describe what the code actually does: the requests it sends
//! or handles, the responses it produces or consumes, its fallible calls, its
//! enum dispatch, its tests, and its data models. Adapters create them once
//! per unit; nothing mutates them afterwards. Endpoint binding happens during
//! extraction against the read-only manifest, so every observation already
//! carries the [`EndpointRef`] it belongs to (or none).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::manifest::BodyDirection;
use crate::core::manifest::EndpointRef;
use crate::core::manifest::HttpMethod;
use crate::core::manifest::is_success;
use crate::core::source::Language;
use crate::core::source::SourceLocation;

// ============================================================================
// SECTION: Shared Vocabulary
// ============================================================================

/// Side of a contract boundary a unit or construct belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundarySide {
    /// Implements the endpoint.
    Producer,
    /// Calls the endpoint.
    Consumer,
    /// Could not be determined.
    Unknown,
}

/// Inferred kind of a value at a construction or declaration site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// String literal or string-typed value.
    String,
    /// Integer literal or integer-typed value.
    Integer,
    /// Fractional literal or float-typed value.
    Float,
    /// Numeric value of unknown precision.
    Number,
    /// Boolean.
    Boolean,
    /// Object or map.
    Object,
    /// Array or list.
    Array,
    /// Explicit null/nil/None.
    Null,
    /// Not inferable.
    Unknown,
}

impl ValueKind {
    /// Returns a short label for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true for numeric kinds.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Number)
    }
}

/// Conversion applied to a value before it crosses the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Conversion {
    /// No conversion observed.
    #[default]
    None,
    /// Raw conversion to string (`String(x)`, `str(x)`, `strconv.Itoa`).
    ToString,
    /// Fixed-precision formatting (`toFixed`, `%.2f`, `Decimal`).
    FixedPrecision,
}

/// How an observed field name was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
    /// Literal wire key (object literal key, json tag, alias).
    Wire,
    /// Derived from an accessor (getter, struct field, attribute).
    Accessor,
}

/// Field observed in a constructed or handled body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedField {
    /// Field name as written.
    pub name: String,
    /// How the name was obtained.
    pub source: NameSource,
    /// Inferred value kind.
    pub kind: ValueKind,
    /// Conversion applied to the value.
    pub conversion: Conversion,
    /// Literal value for string/number literals.
    pub literal: Option<String>,
    /// Last identifier of the value expression, when it is a plain reference.
    pub value_ref: Option<String>,
    /// Nested fields when the value is an object literal.
    pub children: Option<Vec<ObservedField>>,
    /// Site of the key.
    pub location: SourceLocation,
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Raw call or route target as written in code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTarget {
    /// HTTP method, when known.
    pub method: Option<HttpMethod>,
    /// Path template with interpolations rendered as `{}`.
    pub path: Option<String>,
}

/// Header attached by code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedHeader {
    /// Header name as written.
    pub name: String,
    /// Attachment site.
    pub location: SourceLocation,
}

/// Kind of client-side validation observed before a send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationKind {
    /// Numeric comparisons against the listed bounds.
    Range {
        /// Numbers compared against.
        bounds: Vec<f64>,
    },
    /// Regex or format validator.
    Format,
    /// Presence assertion.
    Required,
    /// Membership test against a literal set.
    OneOf {
        /// Literal members.
        values: Vec<String>,
    },
}

/// Validation performed on a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    /// Field or variable name the check applies to.
    pub field: String,
    /// Check kind.
    pub kind: ValidationKind,
    /// Check site.
    pub location: SourceLocation,
}

/// Request sent by a consumer or handled by a producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestObservation {
    /// Call or route site.
    pub location: SourceLocation,
    /// Boundary side.
    pub side: BoundarySide,
    /// Target as written.
    pub target: CallTarget,
    /// Bound endpoint.
    pub endpoint: Option<EndpointRef>,
    /// Fields sent (consumer) or required by the handler (producer).
    pub fields: Vec<ObservedField>,
    /// True when the body is a literal shape and `fields` is exhaustive.
    pub shape_known: bool,
    /// True when the call sends a body at all.
    pub has_body: bool,
    /// Headers attached.
    pub headers: Vec<ObservedHeader>,
    /// Validations performed before the send.
    pub validations: Vec<ValidationCheck>,
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Status branches observed at a consuming site, or codes produced by a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHandling {
    /// Exact codes branched on or produced.
    pub codes: BTreeSet<u16>,
    /// Status classes covered by range checks (4 covers 4xx).
    pub classes: BTreeSet<u16>,
    /// Generic success check (`ok`, `raise_for_status`).
    pub success_check: bool,
}

impl StatusHandling {
    /// Returns true when any status check exists.
    #[must_use]
    pub fn any_check(&self) -> bool {
        self.success_check || !self.codes.is_empty() || !self.classes.is_empty()
    }

    /// Returns true when `code` is covered by an exact branch, a class, or
    /// (for 2xx codes) a generic success check.
    #[must_use]
    pub fn covers(&self, code: u16) -> bool {
        self.codes.contains(&code)
            || self.classes.contains(&(code / 100))
            || (self.success_check && is_success(code))
    }
}

/// Field read at a consuming site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRead {
    /// Access path segments from the body root.
    pub path: Vec<String>,
    /// `guards[i]` is true when dereferencing `path[..=i]` is guarded.
    pub guards: Vec<bool>,
    /// Access site.
    pub location: SourceLocation,
}

/// Response consumed by a consumer or produced by a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseObservation {
    /// Consuming call site or producing send site.
    pub location: SourceLocation,
    /// Boundary side.
    pub side: BoundarySide,
    /// Target as written.
    pub target: CallTarget,
    /// Bound endpoint.
    pub endpoint: Option<EndpointRef>,
    /// Status handling (consumer) or produced status (producer).
    pub status: StatusHandling,
    /// Field reads (consumer).
    pub reads: Vec<FieldRead>,
    /// Fields constructed (producer).
    pub produced: Vec<ObservedField>,
    /// True when `produced` is a literal shape.
    pub shape_known: bool,
    /// Field names acknowledged as intentionally ignored.
    pub acknowledged: Vec<String>,
}

impl ResponseObservation {
    /// Returns true when the produced status is a success status (or default).
    #[must_use]
    pub fn produces_success(&self) -> bool {
        self.status.codes.is_empty() || self.status.codes.iter().any(|code| is_success(*code))
    }
}

// ============================================================================
// SECTION: Error Handling
// ============================================================================

/// Fallible operation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallibleOperation {
    /// Network call.
    Network,
    /// Body decode.
    Decode,
}

impl FallibleOperation {
    /// Returns a short label for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network call",
            Self::Decode => "decode",
        }
    }
}

/// How a fallible call's failure is handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "construct", rename_all = "snake_case")]
pub enum ErrorHandling {
    /// Caught and recovered (`try`/`catch`, `except`, `.catch`).
    Recovered(String),
    /// Explicitly propagated (`if err != nil { return }`, `throws`).
    Propagated(String),
    /// No reachable construct.
    Unhandled,
}

/// Fallible call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorHandlingObservation {
    /// Call site.
    pub location: SourceLocation,
    /// Boundary side.
    pub side: BoundarySide,
    /// Operation category.
    pub operation: FallibleOperation,
    /// Callee text.
    pub call: String,
    /// Handling construct.
    pub handling: ErrorHandling,
    /// Bound endpoint, when the call targets one.
    pub endpoint: Option<EndpointRef>,
}

// ============================================================================
// SECTION: Enum Handling
// ============================================================================

/// Switch or dispatch over a manifest enum field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumObservation {
    /// Dispatch site.
    pub location: SourceLocation,
    /// Boundary side.
    pub side: BoundarySide,
    /// Subject field name as written.
    pub subject: String,
    /// Bound endpoint.
    pub endpoint: Option<EndpointRef>,
    /// Body direction of the bound field.
    pub direction: Option<BodyDirection>,
    /// Dotted manifest path of the bound field.
    pub field_path: Option<String>,
    /// Values handled explicitly.
    pub handled: BTreeSet<String>,
    /// True when a default/else branch exists.
    pub has_default: bool,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Assertion depth classification.
///
/// Shallow means the only predicate is presence, truthiness, or non-null;
/// anything compared against a concrete value, pattern, or type is deep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionDepth {
    /// Presence/truthiness only.
    Shallow,
    /// Value, pattern, or type checked.
    Deep,
}

/// Single assertion in a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Target field name (last access segment), when identifiable.
    pub target: Option<String>,
    /// Asserted expression as written.
    pub subject: String,
    /// Depth classification.
    pub depth: AssertionDepth,
    /// Assertion site.
    pub location: SourceLocation,
}

/// One test function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestObservation {
    /// Test declaration site.
    pub location: SourceLocation,
    /// Test name.
    pub name: String,
    /// Endpoints referenced by path literal.
    pub endpoints: Vec<EndpointRef>,
    /// Assertions in source order.
    pub assertions: Vec<Assertion>,
    /// Status codes exercised.
    pub status_codes: BTreeSet<u16>,
}

// ============================================================================
// SECTION: Models
// ============================================================================

/// Field declared on a data model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelField {
    /// Identifier in code.
    pub declared_name: String,
    /// Serialized wire name (alias, tag, or property name).
    pub wire_name: String,
    /// True when the wire name comes from an explicit alias or tag.
    pub explicit_wire_name: bool,
    /// Declared kind.
    pub kind: ValueKind,
    /// True when the field is optional or nullable.
    pub optional: bool,
    /// Declaration site.
    pub location: SourceLocation,
}

/// Binding of a model to an endpoint body shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeBinding {
    /// Endpoint bound to.
    pub endpoint: EndpointRef,
    /// Body direction.
    pub direction: BodyDirection,
    /// Dotted path of the nested object, empty for the body root.
    pub prefix: String,
    /// Overlap score in `[0, 1]`.
    pub score: f64,
}

/// Declared data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelObservation {
    /// Declaration site.
    pub location: SourceLocation,
    /// Boundary side.
    pub side: BoundarySide,
    /// Model name.
    pub name: String,
    /// Declared fields.
    pub fields: Vec<ModelField>,
    /// Shapes the model binds to.
    pub bindings: Vec<ShapeBinding>,
    /// Endpoints whose differing shapes tied for the best score.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambiguous: Vec<EndpointRef>,
}

// ============================================================================
// SECTION: Unit Aggregates
// ============================================================================

/// Extraction completeness of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Completeness {
    /// Every operation succeeded.
    Complete,
    /// Some or all operations failed.
    Degraded(String),
    /// Extraction exceeded the unit timeout.
    TimedOut,
}

/// Every observation extracted from one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitObservations {
    /// Unit path.
    pub unit: String,
    /// Unit language.
    pub language: Language,
    /// Resolved boundary side.
    pub side: BoundarySide,
    /// True for test units.
    pub is_test: bool,
    /// Completeness marker.
    pub completeness: Completeness,
    /// Requests.
    pub requests: Vec<RequestObservation>,
    /// Responses.
    pub responses: Vec<ResponseObservation>,
    /// Fallible calls.
    pub errors: Vec<ErrorHandlingObservation>,
    /// Enum dispatch.
    pub enums: Vec<EnumObservation>,
    /// Tests.
    pub tests: Vec<TestObservation>,
    /// Models.
    pub models: Vec<ModelObservation>,
}

impl UnitObservations {
    /// Creates an empty aggregate for a unit.
    #[must_use]
    pub fn empty(
        unit: impl Into<String>,
        language: Language,
        side: BoundarySide,
        is_test: bool,
    ) -> Self {
        Self {
            unit: unit.into(),
            language,
            side,
            is_test,
            completeness: Completeness::Complete,
            requests: Vec::new(),
            responses: Vec::new(),
            errors: Vec::new(),
            enums: Vec::new(),
            tests: Vec::new(),
            models: Vec::new(),
        }
    }

    /// Returns true when the unit produced no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
            && self.responses.is_empty()
            && self.errors.is_empty()
            && self.enums.is_empty()
            && self.tests.is_empty()
            && self.models.is_empty()
    }
}

/// Observations for a whole run, ordered by unit path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationSet {
    /// Per-unit aggregates sorted by unit path.
    units: Vec<UnitObservations>,
}

impl ObservationSet {
    /// Builds a set, sorting units by path.
    #[must_use]
    pub fn new(mut units: Vec<UnitObservations>) -> Self {
        units.sort_by(|left, right| left.unit.cmp(&right.unit));
        Self {
            units,
        }
    }

    /// Returns units in path order.
    #[must_use]
    pub fn units(&self) -> &[UnitObservations] {
        &self.units
    }

    /// Iterates requests across units.
    pub fn requests(&self) -> impl Iterator<Item = &RequestObservation> {
        self.units.iter().flat_map(|unit| unit.requests.iter())
    }

    /// Iterates responses across units.
    pub fn responses(&self) -> impl Iterator<Item = &ResponseObservation> {
        self.units.iter().flat_map(|unit| unit.responses.iter())
    }

    /// Iterates enum observations across units.
    pub fn enums(&self) -> impl Iterator<Item = &EnumObservation> {
        self.units.iter().flat_map(|unit| unit.enums.iter())
    }

    /// Iterates tests across units.
    pub fn tests(&self) -> impl Iterator<Item = &TestObservation> {
        self.units.iter().flat_map(|unit| unit.tests.iter())
    }

    /// Iterates models across units.
    pub fn models(&self) -> impl Iterator<Item = &ModelObservation> {
        self.units.iter().flat_map(|unit| unit.models.iter())
    }
}
