// crates/contract-gate-core/src/core/manifest.rs
// ============================================================================
// Module: Contract Gate Manifest Model
// Description: Canonical contract manifest, field specs, and endpoint resolution.
// Purpose: Load, validate, and query the declared API contract.
// Dependencies: regex, serde, serde_json, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! The manifest is the declared side of every comparison. Serialized
//! manifests deserialize into [`RawManifest`]; [`ContractManifest::load`]
//! validates the raw document fail-closed and produces an immutable model that
//! every downstream component borrows read-only.
//!
//! Endpoint resolution is exact: manifest path segments written `{name}` or
//! `:name` are parameters, everything else must match literally.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::CodebaseId;
use crate::core::identifiers::ContractId;
use crate::core::naming::names_match;
use crate::core::naming::normalize_name;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Manifest loading and validation errors.
///
/// Every validation variant names the offending manifest path, for example
/// `contracts[auth-token].endpoints[POST /oauth/token].request.grant_type`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// Raw manifest text could not be parsed.
    #[error("manifest parse error: {0}")]
    Parse(String),
    /// Field is required and nullable but declares no default.
    #[error("{path}: required field is nullable without a default")]
    RequiredNullableWithoutDefault {
        /// Offending manifest path.
        path: String,
    },
    /// Two endpoints in one contract share a key.
    #[error("{path}: duplicate endpoint key")]
    DuplicateEndpoint {
        /// Offending manifest path.
        path: String,
    },
    /// Enum field declares no values.
    #[error("{path}: enum field declares no values")]
    EmptyEnum {
        /// Offending manifest path.
        path: String,
    },
    /// Two contracts share an identifier.
    #[error("{path}: duplicate contract identifier")]
    DuplicateContract {
        /// Offending manifest path.
        path: String,
    },
    /// Any other structural problem.
    #[error("{path}: {reason}")]
    Invalid {
        /// Offending manifest path.
        path: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl ManifestError {
    /// Returns the offending manifest path, if the error carries one.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Parse(_) => None,
            Self::RequiredNullableWithoutDefault {
                path,
            }
            | Self::DuplicateEndpoint {
                path,
            }
            | Self::EmptyEnum {
                path,
            }
            | Self::DuplicateContract {
                path,
            }
            | Self::Invalid {
                path, ..
            } => Some(path),
        }
    }

    /// Builds an [`ManifestError::Invalid`] error.
    fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Serialized manifest formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestFormat {
    /// YAML document.
    Yaml,
    /// JSON document.
    Json,
}

impl ManifestFormat {
    /// Selects a format from a file name; unknown extensions default to YAML.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        if path.to_ascii_lowercase().ends_with(".json") { Self::Json } else { Self::Yaml }
    }
}

/// Contract transport protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Request/response over HTTP.
    #[default]
    Http,
    /// Message topics (publish/subscribe).
    Message,
}

/// HTTP request methods recognized in manifests and source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpMethod {
    /// Parses a method name case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// Returns the canonical uppercase method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a message endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    /// Producer publishes to the topic.
    Publish,
    /// Consumer subscribes to the topic.
    Subscribe,
}

impl fmt::Display for MessageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publish => f.write_str("publish"),
            Self::Subscribe => f.write_str("subscribe"),
        }
    }
}

/// Declared field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// UTF-8 string.
    String,
    /// Whole number.
    Integer,
    /// Any number.
    Number,
    /// Boolean.
    Boolean,
    /// Nested object.
    Object,
    /// Array of `items`.
    Array,
    /// String restricted to `values`.
    Enum,
}

impl FieldKind {
    /// Returns the manifest spelling of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Enum => "enum",
        }
    }
}

/// Named string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamedFormat {
    /// RFC 5322 style address.
    Email,
    /// RFC 4122 UUID.
    Uuid,
    /// RFC 3339 timestamp.
    DateTime,
    /// RFC 3339 full date.
    Date,
    /// Absolute URI.
    Uri,
    /// Fixed-precision decimal string.
    Decimal,
}

impl NamedFormat {
    /// Returns the manifest spelling of the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Uuid => "uuid",
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Uri => "uri",
            Self::Decimal => "decimal",
        }
    }
}

/// Declared body direction of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyDirection {
    /// Request body (consumer to producer).
    Request,
    /// Response body (producer to consumer).
    Response,
}

impl BodyDirection {
    /// Returns the manifest spelling of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

/// Field requirement selector used by [`EndpointSpec::fields_requiring`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRequirement {
    /// `required: true`
    Required,
    /// `nullable: true`
    Nullable,
    /// `type: enum`
    Enum,
    /// Named format or pattern.
    Format,
    /// Declared `range`.
    Range,
}

// ============================================================================
// SECTION: Field Specifications
// ============================================================================

/// Declared numeric range; either bound may be omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeSpec {
    /// Inclusive lower bound.
    #[serde(default)]
    pub min: Option<f64>,
    /// Inclusive upper bound.
    #[serde(default)]
    pub max: Option<f64>,
}

impl RangeSpec {
    /// Returns the declared bounds in ascending order.
    #[must_use]
    pub fn bounds(&self) -> Vec<f64> {
        self.min.into_iter().chain(self.max).collect()
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min = self.min.map_or_else(|| "-inf".to_string(), |value| value.to_string());
        let max = self.max.map_or_else(|| "+inf".to_string(), |value| value.to_string());
        write!(f, "[{min}, {max}]")
    }
}

/// Recursive field specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    /// Canonical wire name.
    pub name: String,
    /// Declared kind.
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Whether the field must be present.
    #[serde(default)]
    pub required: bool,
    /// Whether the field may be `null`.
    #[serde(default)]
    pub nullable: bool,
    /// Default value applied when absent.
    #[serde(default)]
    pub default: Option<Value>,
    /// Named string format.
    #[serde(default)]
    pub format: Option<NamedFormat>,
    /// Regex string format.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Numeric range.
    #[serde(default)]
    pub range: Option<RangeSpec>,
    /// Enum values.
    #[serde(default)]
    pub values: Vec<String>,
    /// Object children.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// Array element spec.
    #[serde(default)]
    pub items: Option<Box<FieldSpec>>,
    /// Unit label (for example `cents`, `seconds`).
    #[serde(default)]
    pub unit: Option<String>,
}

impl FieldSpec {
    /// Returns true when the field declares a named format or pattern.
    #[must_use]
    pub const fn has_format(&self) -> bool {
        self.format.is_some() || self.pattern.is_some()
    }

    /// Returns the nested children, looking through array items.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match (&self.kind, &self.items) {
            (FieldKind::Array, Some(items)) => &items.fields,
            _ => &self.fields,
        }
    }

    /// Returns the number of distinguishing values, or `None` when unbounded.
    #[must_use]
    pub fn distinguishing_values(&self) -> Option<usize> {
        let base = match self.kind {
            FieldKind::Enum => self.values.len(),
            FieldKind::Boolean => 2,
            _ => return None,
        };
        Some(base + usize::from(self.nullable))
    }

    /// Returns a human label for the format constraint, if any.
    #[must_use]
    pub fn format_label(&self) -> Option<String> {
        match (&self.format, &self.pattern) {
            (Some(format), _) => Some(format.as_str().to_string()),
            (None, Some(pattern)) => Some(format!("pattern {pattern}")),
            (None, None) => None,
        }
    }

    /// Returns true when the field satisfies `requirement`.
    #[must_use]
    pub fn satisfies(&self, requirement: FieldRequirement) -> bool {
        match requirement {
            FieldRequirement::Required => self.required,
            FieldRequirement::Nullable => self.nullable,
            FieldRequirement::Enum => self.kind == FieldKind::Enum,
            FieldRequirement::Format => self.has_format(),
            FieldRequirement::Range => self.range.is_some(),
        }
    }

    /// Finds a direct child by normalized name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        find_field(self.children(), name)
    }
}

/// Finds a field in a list by normalized name, preferring an exact match.
#[must_use]
pub fn find_field<'a>(fields: &'a [FieldSpec], name: &str) -> Option<&'a FieldSpec> {
    fields
        .iter()
        .find(|field| field.name == name)
        .or_else(|| fields.iter().find(|field| names_match(&field.name, name)))
}

/// Request or response body declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BodySpec {
    /// Top-level body fields.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// Declared header requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderSpec {
    /// Header name (compared case-insensitively).
    pub name: String,
    /// Whether consumers must send the header.
    #[serde(default)]
    pub required: bool,
}

/// Declared status codes for an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCodeSet(BTreeSet<u16>);

impl StatusCodeSet {
    /// Creates a status code set.
    #[must_use]
    pub fn new(codes: impl IntoIterator<Item = u16>) -> Self {
        Self(codes.into_iter().collect())
    }

    /// Returns every declared code in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }

    /// Returns declared 2xx codes.
    pub fn success(&self) -> impl Iterator<Item = u16> + '_ {
        self.codes().filter(|code| is_success(*code))
    }

    /// Returns declared non-2xx codes.
    pub fn non_success(&self) -> impl Iterator<Item = u16> + '_ {
        self.codes().filter(|code| !is_success(*code))
    }

    /// Returns true when no codes are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true when `code` is declared.
    #[must_use]
    pub fn contains(&self, code: u16) -> bool {
        self.0.contains(&code)
    }
}

/// Returns true for 2xx status codes.
#[must_use]
pub const fn is_success(code: u16) -> bool {
    code >= 200 && code < 300
}

// ============================================================================
// SECTION: Raw Manifest Document
// ============================================================================

/// Serialized manifest document prior to validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawManifest {
    /// Manifest schema version.
    pub manifest_version: String,
    /// Declared contracts.
    #[serde(default)]
    pub contracts: Vec<RawContract>,
}

/// Serialized contract prior to validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawContract {
    /// Contract identifier.
    pub id: String,
    /// Producer codebase identifier.
    #[serde(default)]
    pub producer: Option<String>,
    /// Consumer codebase identifier.
    #[serde(default)]
    pub consumer: Option<String>,
    /// Transport protocol.
    #[serde(default)]
    pub protocol: Protocol,
    /// Declared endpoints.
    #[serde(default)]
    pub endpoints: Vec<RawEndpoint>,
}

/// Serialized endpoint prior to validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEndpoint {
    /// HTTP path template.
    #[serde(default)]
    pub path: Option<String>,
    /// HTTP method.
    #[serde(default)]
    pub method: Option<String>,
    /// Message topic.
    #[serde(default)]
    pub topic: Option<String>,
    /// Message direction.
    #[serde(default)]
    pub direction: Option<MessageDirection>,
    /// Request body.
    #[serde(default)]
    pub request: BodySpec,
    /// Response body.
    #[serde(default)]
    pub response: BodySpec,
    /// Declared status codes.
    #[serde(default)]
    pub status_codes: Vec<u16>,
    /// Declared headers.
    #[serde(default)]
    pub headers: Vec<HeaderSpec>,
    /// Auth scheme label.
    #[serde(default)]
    pub auth: Option<String>,
}

// ============================================================================
// SECTION: Endpoint Keys
// ============================================================================

/// Key identifying an endpoint within its contract.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndpointKey {
    /// HTTP endpoint.
    Http {
        /// Request method.
        method: HttpMethod,
        /// Path template as declared.
        path: String,
    },
    /// Message endpoint.
    Message {
        /// Topic name.
        topic: String,
        /// Direction.
        direction: MessageDirection,
    },
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http {
                method,
                path,
            } => write!(f, "{method} {path}"),
            Self::Message {
                topic,
                direction,
            } => write!(f, "{direction} {topic}"),
        }
    }
}

impl EndpointKey {
    /// Returns true for message endpoints.
    #[must_use]
    pub const fn is_message(&self) -> bool {
        matches!(self, Self::Message { .. })
    }

    /// Returns the body direction a consumer reads.
    ///
    /// HTTP consumers read the response; message subscribers read the
    /// published payload, which is declared under `request`.
    #[must_use]
    pub const fn read_direction(&self) -> BodyDirection {
        match self {
            Self::Http { .. } => BodyDirection::Response,
            Self::Message { .. } => BodyDirection::Request,
        }
    }
}

/// Owned reference to one endpoint of one contract.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointRef {
    /// Owning contract.
    pub contract: ContractId,
    /// Endpoint key.
    pub key: EndpointKey,
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contract, self.key)
    }
}

/// Segment of a declared path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// Literal segment.
    Literal(String),
    /// `{name}` or `:name` parameter.
    Param,
}

/// Segment of an observed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedSegment {
    /// Literal text.
    Literal(String),
    /// Interpolated or parameterized segment.
    Placeholder,
}

/// Normalized path observed in source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedPath {
    /// Path segments without empty parts.
    pub segments: Vec<ObservedSegment>,
}

impl ObservedPath {
    /// Normalizes a path template produced by an extraction adapter.
    ///
    /// Interpolations must already be rendered as `{...}`, `%s`, `%d`, or
    /// `%v`. Scheme and host, query strings, fragments, and a leading base-URL
    /// interpolation are stripped. Returns `None` when no absolute path
    /// remains.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let mut text = raw.trim().replace("%s", "{}").replace("%d", "{}").replace("%v", "{}");
        if let Some(index) = text.find(['?', '#']) {
            text.truncate(index);
        }
        let mut rest = text.as_str();
        if let Some(index) = rest.find("://") {
            let after = &rest[index + 3 ..];
            rest = after.find('/').map_or("/", |slash| &after[slash ..]);
        }
        if rest.starts_with('{') {
            rest = &rest[rest.find('/')? ..];
        }
        if !rest.starts_with('/') {
            return None;
        }
        let segments = rest
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                if segment.contains('{')
                    || segment.starts_with(':')
                    || segment.starts_with('<')
                    || segment.starts_with('$')
                {
                    ObservedSegment::Placeholder
                } else {
                    ObservedSegment::Literal(segment.to_string())
                }
            })
            .collect();
        Some(Self {
            segments,
        })
    }
}

/// Parses a declared path template into segments.
fn parse_template(path: &str) -> Vec<PathSegment> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if (segment.starts_with('{') && segment.ends_with('}')) || segment.starts_with(':') {
                PathSegment::Param
            } else {
                PathSegment::Literal(segment.to_string())
            }
        })
        .collect()
}

// ============================================================================
// SECTION: Validated Model
// ============================================================================

/// Flattened reference to a field within an endpoint body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRef<'a> {
    /// Dotted path from the body root.
    pub path: &'a str,
    /// Field specification.
    pub spec: &'a FieldSpec,
}

/// Owned flattened field path paired with its spec.
#[derive(Debug, Clone, PartialEq)]
struct FlatField {
    /// Dotted path from the body root.
    path: String,
    /// Direction of the body.
    direction: BodyDirection,
    /// Index chain from the body root.
    chain: Vec<usize>,
}

/// Validated endpoint specification.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSpec {
    /// Endpoint key.
    pub key: EndpointKey,
    /// Request body.
    pub request: BodySpec,
    /// Response body.
    pub response: BodySpec,
    /// Declared status codes.
    pub status_codes: StatusCodeSet,
    /// Declared headers.
    pub headers: Vec<HeaderSpec>,
    /// Auth scheme label.
    pub auth: Option<String>,
    /// Parsed path template (HTTP only).
    segments: Vec<PathSegment>,
    /// Flattened field index for both directions.
    flat: Vec<FlatField>,
}

impl EndpointSpec {
    /// Returns the body declaration for a direction.
    #[must_use]
    pub const fn body(&self, direction: BodyDirection) -> &BodySpec {
        match direction {
            BodyDirection::Request => &self.request,
            BodyDirection::Response => &self.response,
        }
    }

    /// Returns every flattened field of a body, parents before children.
    #[must_use]
    pub fn flattened(&self, direction: BodyDirection) -> Vec<FieldRef<'_>> {
        self.flat
            .iter()
            .filter(|flat| flat.direction == direction)
            .filter_map(|flat| {
                resolve_chain(&self.body(direction).fields, &flat.chain).map(|spec| FieldRef {
                    path: &flat.path,
                    spec,
                })
            })
            .collect()
    }

    /// Returns flattened fields satisfying a requirement.
    #[must_use]
    pub fn fields_requiring(
        &self,
        direction: BodyDirection,
        requirement: FieldRequirement,
    ) -> Vec<FieldRef<'_>> {
        self.flattened(direction).into_iter().filter(|field| field.spec.satisfies(requirement)).collect()
    }

    /// Walks an access path by normalized names.
    ///
    /// Returns the specs of every matched prefix; stops at the first segment
    /// the manifest does not declare.
    #[must_use]
    pub fn walk(&self, direction: BodyDirection, path: &[String]) -> Vec<&FieldSpec> {
        let mut matched = Vec::new();
        let mut fields = self.body(direction).fields.as_slice();
        for segment in path {
            let Some(spec) = find_field(fields, segment) else {
                break;
            };
            matched.push(spec);
            fields = spec.children();
        }
        matched
    }

    /// Finds any field (at any depth) with a normalized name.
    #[must_use]
    pub fn find_anywhere(&self, direction: BodyDirection, name: &str) -> Vec<FieldRef<'_>> {
        let normalized = normalize_name(name);
        self.flattened(direction)
            .into_iter()
            .filter(|field| normalize_name(&field.spec.name) == normalized)
            .collect()
    }

    /// Returns true when the endpoint is an HTTP endpoint whose template
    /// matches the observed path.
    #[must_use]
    pub fn matches_path(&self, observed: &ObservedPath) -> bool {
        if !matches!(self.key, EndpointKey::Http { .. }) {
            return false;
        }
        self.segments.len() == observed.segments.len()
            && self.segments.iter().zip(&observed.segments).all(|(declared, seen)| {
                match (declared, seen) {
                    (PathSegment::Param, _) => true,
                    (PathSegment::Literal(left), ObservedSegment::Literal(right)) => left == right,
                    (PathSegment::Literal(_), ObservedSegment::Placeholder) => false,
                }
            })
    }

    /// Number of literal segments; more literal templates win ties.
    fn literal_weight(&self) -> usize {
        self.segments.iter().filter(|segment| matches!(segment, PathSegment::Literal(_))).count()
    }
}

/// Resolves an index chain to a field spec.
fn resolve_chain<'a>(fields: &'a [FieldSpec], chain: &[usize]) -> Option<&'a FieldSpec> {
    let (first, rest) = chain.split_first()?;
    let spec = fields.get(*first)?;
    if rest.is_empty() { Some(spec) } else { resolve_chain(spec.children(), rest) }
}

/// Validated contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    /// Contract identifier.
    pub id: ContractId,
    /// Producer codebase.
    pub producer: Option<CodebaseId>,
    /// Consumer codebase.
    pub consumer: Option<CodebaseId>,
    /// Transport protocol.
    pub protocol: Protocol,
    /// Endpoints in declaration order.
    pub endpoints: Vec<EndpointSpec>,
}

/// Endpoint resolved within the manifest.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedEndpoint<'a> {
    /// Owning contract.
    pub contract: &'a Contract,
    /// Endpoint specification.
    pub endpoint: &'a EndpointSpec,
}

impl ResolvedEndpoint<'_> {
    /// Returns an owned reference to the endpoint.
    #[must_use]
    pub fn reference(&self) -> EndpointRef {
        EndpointRef {
            contract: self.contract.id.clone(),
            key: self.endpoint.key.clone(),
        }
    }
}

/// Canonical, immutable contract manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractManifest {
    /// Manifest schema version.
    version: String,
    /// Contracts in declaration order.
    contracts: Vec<Contract>,
}

impl ContractManifest {
    /// Parses and validates a serialized manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the text does not parse or the document
    /// is self-contradictory.
    pub fn load(raw: &str, format: ManifestFormat) -> Result<Self, ManifestError> {
        let document: RawManifest = match format {
            ManifestFormat::Yaml => {
                serde_yaml::from_str(raw).map_err(|err| ManifestError::Parse(err.to_string()))?
            }
            ManifestFormat::Json => {
                serde_json::from_str(raw).map_err(|err| ManifestError::Parse(err.to_string()))?
            }
        };
        Self::from_raw(document)
    }

    /// Validates a deserialized manifest document.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] naming the offending path.
    pub fn from_raw(raw: RawManifest) -> Result<Self, ManifestError> {
        if raw.manifest_version.trim().is_empty() {
            return Err(ManifestError::invalid("manifest_version", "must not be blank"));
        }
        if raw.contracts.is_empty() {
            return Err(ManifestError::invalid("contracts", "must declare at least one contract"));
        }
        let mut contracts: Vec<Contract> = Vec::with_capacity(raw.contracts.len());
        for contract in raw.contracts {
            let path = format!("contracts[{}]", contract.id);
            if contract.id.trim().is_empty() {
                return Err(ManifestError::invalid(path, "contract id must not be blank"));
            }
            if contracts.iter().any(|existing| existing.id.as_str() == contract.id) {
                return Err(ManifestError::DuplicateContract {
                    path,
                });
            }
            contracts.push(validate_contract(&path, contract)?);
        }
        Ok(Self {
            version: raw.manifest_version,
            contracts,
        })
    }

    /// Returns the manifest schema version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns contracts in declaration order.
    #[must_use]
    pub fn contracts(&self) -> &[Contract] {
        &self.contracts
    }

    /// Returns every endpoint in declaration order.
    pub fn endpoints(&self) -> impl Iterator<Item = ResolvedEndpoint<'_>> {
        self.contracts.iter().flat_map(|contract| {
            contract.endpoints.iter().map(move |endpoint| ResolvedEndpoint {
                contract,
                endpoint,
            })
        })
    }

    /// Resolves an observed HTTP path and method to an endpoint.
    ///
    /// Matching is exact apart from declared path parameters. When several
    /// templates match, the one with more literal segments wins.
    #[must_use]
    pub fn resolve(&self, path: &str, method: HttpMethod) -> Option<ResolvedEndpoint<'_>> {
        let observed = ObservedPath::parse(path)?;
        let mut best: Option<ResolvedEndpoint<'_>> = None;
        for candidate in self.endpoints() {
            let EndpointKey::Http {
                method: declared, ..
            } = &candidate.endpoint.key
            else {
                continue;
            };
            if *declared != method || !candidate.endpoint.matches_path(&observed) {
                continue;
            }
            let better = best.is_none_or(|current| {
                candidate.endpoint.literal_weight() > current.endpoint.literal_weight()
            });
            if better {
                best = Some(candidate);
            }
        }
        best
    }

    /// Resolves an observed path against every method.
    #[must_use]
    pub fn resolve_any_method(&self, path: &str) -> Vec<ResolvedEndpoint<'_>> {
        let Some(observed) = ObservedPath::parse(path) else {
            return Vec::new();
        };
        self.endpoints().filter(|candidate| candidate.endpoint.matches_path(&observed)).collect()
    }

    /// Resolves a message endpoint by topic and direction.
    #[must_use]
    pub fn resolve_topic(
        &self,
        topic: &str,
        direction: MessageDirection,
    ) -> Option<ResolvedEndpoint<'_>> {
        self.endpoints().find(|candidate| {
            matches!(
                &candidate.endpoint.key,
                EndpointKey::Message { topic: declared, direction: declared_direction }
                    if declared == topic && *declared_direction == direction
            )
        })
    }

    /// Looks up an endpoint by owned reference.
    #[must_use]
    pub fn endpoint(&self, reference: &EndpointRef) -> Option<ResolvedEndpoint<'_>> {
        self.endpoints().find(|candidate| {
            candidate.contract.id == reference.contract && candidate.endpoint.key == reference.key
        })
    }

    /// Returns every codebase identifier named by any contract.
    #[must_use]
    pub fn codebases(&self) -> BTreeSet<&CodebaseId> {
        self.contracts
            .iter()
            .flat_map(|contract| contract.producer.iter().chain(contract.consumer.iter()))
            .collect()
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Validates one raw contract.
fn validate_contract(path: &str, raw: RawContract) -> Result<Contract, ManifestError> {
    let mut endpoints: Vec<EndpointSpec> = Vec::with_capacity(raw.endpoints.len());
    for (index, endpoint) in raw.endpoints.into_iter().enumerate() {
        let key = endpoint_key(&format!("{path}.endpoints[{index}]"), &endpoint)?;
        let endpoint_path = format!("{path}.endpoints[{key}]");
        if endpoints.iter().any(|existing| existing.key == key) {
            return Err(ManifestError::DuplicateEndpoint {
                path: endpoint_path,
            });
        }
        endpoints.push(validate_endpoint(&endpoint_path, key, endpoint)?);
    }
    Ok(Contract {
        id: ContractId::new(raw.id),
        producer: raw.producer.filter(|id| !id.trim().is_empty()).map(CodebaseId::new),
        consumer: raw.consumer.filter(|id| !id.trim().is_empty()).map(CodebaseId::new),
        protocol: raw.protocol,
        endpoints,
    })
}

/// Derives the endpoint key from path+method or topic+direction.
fn endpoint_key(path: &str, raw: &RawEndpoint) -> Result<EndpointKey, ManifestError> {
    match (&raw.path, &raw.method, &raw.topic, &raw.direction) {
        (Some(template), Some(method), None, None) => {
            let method = HttpMethod::parse(method).ok_or_else(|| {
                ManifestError::invalid(path, format!("unknown http method: {method}"))
            })?;
            if !template.starts_with('/') {
                return Err(ManifestError::invalid(path, "endpoint path must start with '/'"));
            }
            Ok(EndpointKey::Http {
                method,
                path: template.clone(),
            })
        }
        (None, None, Some(topic), Some(direction)) if !topic.trim().is_empty() => {
            Ok(EndpointKey::Message {
                topic: topic.clone(),
                direction: *direction,
            })
        }
        _ => Err(ManifestError::invalid(
            path,
            "endpoint must declare either path+method or topic+direction",
        )),
    }
}

/// Validates one raw endpoint.
fn validate_endpoint(
    path: &str,
    key: EndpointKey,
    raw: RawEndpoint,
) -> Result<EndpointSpec, ManifestError> {
    if let Some(code) = raw.status_codes.iter().find(|code| !(100 ..= 599).contains(*code)) {
        return Err(ManifestError::invalid(
            format!("{path}.status_codes"),
            format!("status code {code} outside 100..=599"),
        ));
    }
    validate_fields(&format!("{path}.request"), &raw.request.fields)?;
    validate_fields(&format!("{path}.response"), &raw.response.fields)?;
    for header in &raw.headers {
        if header.name.trim().is_empty() {
            return Err(ManifestError::invalid(format!("{path}.headers"), "blank header name"));
        }
    }
    let segments = raw.path.as_deref().map(parse_template).unwrap_or_default();
    let mut flat = Vec::new();
    flatten(&raw.request.fields, BodyDirection::Request, "", &[], &mut flat);
    flatten(&raw.response.fields, BodyDirection::Response, "", &[], &mut flat);
    Ok(EndpointSpec {
        key,
        request: raw.request,
        response: raw.response,
        status_codes: StatusCodeSet::new(raw.status_codes),
        headers: raw.headers,
        auth: raw.auth,
        segments,
        flat,
    })
}

/// Builds the flattened field index.
fn flatten(
    fields: &[FieldSpec],
    direction: BodyDirection,
    prefix: &str,
    chain: &[usize],
    out: &mut Vec<FlatField>,
) {
    for (index, field) in fields.iter().enumerate() {
        let path =
            if prefix.is_empty() { field.name.clone() } else { format!("{prefix}.{}", field.name) };
        let mut next = chain.to_vec();
        next.push(index);
        out.push(FlatField {
            path: path.clone(),
            direction,
            chain: next.clone(),
        });
        flatten(field.children(), direction, &path, &next, out);
    }
}

/// Recursively validates a list of sibling fields.
fn validate_fields(path: &str, fields: &[FieldSpec]) -> Result<(), ManifestError> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for field in fields {
        let field_path = format!("{path}.{}", field.name);
        if field.name.trim().is_empty() {
            return Err(ManifestError::invalid(path, "field name must not be blank"));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(ManifestError::invalid(field_path, "duplicate field name"));
        }
        validate_field(&field_path, field)?;
    }
    Ok(())
}

/// Validates a single field and its children.
fn validate_field(path: &str, field: &FieldSpec) -> Result<(), ManifestError> {
    if field.required && field.nullable && field.default.is_none() {
        return Err(ManifestError::RequiredNullableWithoutDefault {
            path: path.to_string(),
        });
    }
    if field.kind == FieldKind::Enum && field.values.is_empty() {
        return Err(ManifestError::EmptyEnum {
            path: path.to_string(),
        });
    }
    if field.kind != FieldKind::Enum && !field.values.is_empty() {
        return Err(ManifestError::invalid(path, "values are only valid on enum fields"));
    }
    if let Some(range) = &field.range {
        if !matches!(field.kind, FieldKind::Integer | FieldKind::Number) {
            return Err(ManifestError::invalid(path, "range is only valid on numeric fields"));
        }
        if let (Some(min), Some(max)) = (range.min, range.max)
            && min > max
        {
            return Err(ManifestError::invalid(path, "range.min exceeds range.max"));
        }
    }
    if let Some(pattern) = &field.pattern {
        Regex::new(pattern)
            .map_err(|err| ManifestError::invalid(path, format!("invalid pattern: {err}")))?;
    }
    if field.items.is_some() && field.kind != FieldKind::Array {
        return Err(ManifestError::invalid(path, "items is only valid on array fields"));
    }
    if !field.fields.is_empty() && field.kind != FieldKind::Object {
        return Err(ManifestError::invalid(path, "fields is only valid on object fields"));
    }
    validate_fields(path, &field.fields)?;
    if let Some(items) = &field.items {
        validate_field(&format!("{path}[]"), items)?;
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
    fn observed_paths_strip_hosts_queries_and_bases() {
        let parsed = ObservedPath::parse("https://api.example.com/v1/items/{}?expand=1");
        assert_eq!(
            parsed.map(|path| path.segments),
            Some(vec![
                ObservedSegment::Literal("v1".to_string()),
                ObservedSegment::Literal("items".to_string()),
                ObservedSegment::Placeholder,
            ])
        );
        let based = ObservedPath::parse("{}/oauth/token");
        assert_eq!(based.map(|path| path.segments.len()), Some(2));
        assert_eq!(ObservedPath::parse("not a path"), None);
    }

    #[test]
    fn templates_treat_braces_and_colons_as_params() {
        assert_eq!(
            parse_template("/items/{id}/notes/:note"),
            vec![
                PathSegment::Literal("items".to_string()),
                PathSegment::Param,
                PathSegment::Literal("notes".to_string()),
                PathSegment::Param,
            ]
        );
    }

    #[test]
    fn distinguishing_values_count_enum_and_boolean() {
        let field = FieldSpec {
            name: "status".to_string(),
            kind: FieldKind::Enum,
            required: true,
            nullable: false,
            default: None,
            format: None,
            pattern: None,
            range: None,
            values: vec!["active".to_string()],
            fields: Vec::new(),
            items: None,
            unit: None,
        };
        assert_eq!(field.distinguishing_values(), Some(1));
    }
}
