// crates/contract-gate-core/src/extract/kinds.rs
// ============================================================================
// Module: Contract Gate Kind Inference
// Description: Value-kind inference, declared-type mapping, status constants.
// Purpose: Turn expressions and type annotations into comparable kinds.
// Dependencies: regex, crate::core
// ============================================================================

//! ## Overview
//! Construction sites are classified by the shape of their value expression:
//! literals, conversions (`String(x)`, `str(x)`, `strconv.Itoa`), and
//! fixed-precision formatting (`toFixed`, `%.2f`, `BigDecimal`). Declared
//! types on models map to the same [`ValueKind`] vocabulary. Symbolic status
//! constants (`http.StatusNotFound`, `HttpStatus.NOT_FOUND`,
//! `status.HTTP_404_NOT_FOUND`) resolve to numeric codes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;

use crate::core::observation::Conversion;
use crate::core::observation::ValueKind;
use crate::core::source::Language;

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// Compiles a fixed pattern.
#[allow(clippy::expect_used, reason = "Patterns are compile-time constants covered by tests.")]
pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern must compile")
}

/// Integer literal.
static INTEGER: LazyLock<Regex> = LazyLock::new(|| compile(r"^-?(?:0x[0-9a-fA-F_]+|[0-9][0-9_]*)[lLuU]?$"));
/// Fractional literal.
static FLOAT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^-?(?:[0-9][0-9_]*\.[0-9]+(?:[eE][-+]?[0-9]+)?|[0-9]+[eE][-+]?[0-9]+)[fFdD]?$"));
/// Raw string conversions.
static TO_STRING: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^(?:String|str|strconv\.Itoa|strconv\.FormatInt|strconv\.FormatFloat|String\.valueOf|Integer\.toString|Long\.toString|Double\.toString|fmt\.Sprint)\s*\(|\.toString\(\s*\)$|^`\$\{[^}]*\}`$",
    )
});
/// Fixed-precision formatting.
static FIXED_PRECISION: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"\.toFixed\(|%\.\d+f|:\.\d+f\}|^(?:Decimal|new\s+BigDecimal|BigDecimal\.valueOf|decimal\.NewFrom\w*)\s*\(|\.setScale\(|\.quantize\(|\.StringFixed\("#,
    )
});
/// Numeric parsing.
static TO_INTEGER: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^(?:parseInt|int|Integer\.parseInt|Long\.parseLong|strconv\.Atoi|Math\.(?:round|floor|ceil|trunc)|math\.(?:floor|ceil)|len)\s*\(|\.length$|\.size\(\)$",
    )
});
/// Float parsing.
static TO_FLOAT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^(?:parseFloat|float|Double\.parseDouble|strconv\.ParseFloat|float64)\s*\("));
/// Plain reference (identifier or member chain).
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[A-Za-z_$][\w$]*(?:\s*\??\.\s*[A-Za-z_$][\w$]*|\[[^\]]+\])*$"));
/// Trailing identifier of a reference.
static LAST_IDENT: LazyLock<Regex> = LazyLock::new(|| compile(r"([A-Za-z_$][\w$]*)\W*$"));

// ============================================================================
// SECTION: Value Inference
// ============================================================================

/// Inferred value at a construction site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredValue {
    /// Value kind.
    pub kind: ValueKind,
    /// Conversion applied.
    pub conversion: Conversion,
    /// Literal text for plain literals.
    pub literal: Option<String>,
    /// Last identifier of a plain reference.
    pub value_ref: Option<String>,
}

impl InferredValue {
    /// Builds an inferred value without literal or reference.
    const fn of(kind: ValueKind, conversion: Conversion) -> Self {
        Self {
            kind,
            conversion,
            literal: None,
            value_ref: None,
        }
    }
}

/// Infers the kind of a value expression.
///
/// `string_literal` is the unquoted content when the expression is exactly
/// one plain string literal; `is_string` is true when it is any string
/// literal (including interpolated templates).
#[must_use]
pub fn infer_value(expr: &str, string_literal: Option<String>, is_string: bool) -> InferredValue {
    let text = expr.trim();
    if let Some(literal) = string_literal {
        return InferredValue {
            literal: Some(literal),
            ..InferredValue::of(ValueKind::String, Conversion::None)
        };
    }
    if FIXED_PRECISION.is_match(text) {
        return InferredValue::of(ValueKind::String, Conversion::FixedPrecision);
    }
    if TO_STRING.is_match(text) {
        return InferredValue::of(ValueKind::String, Conversion::ToString);
    }
    if is_string {
        return InferredValue::of(ValueKind::String, Conversion::None);
    }
    match text {
        "true" | "false" | "True" | "False" => {
            return InferredValue {
                literal: Some(text.to_ascii_lowercase()),
                ..InferredValue::of(ValueKind::Boolean, Conversion::None)
            };
        }
        "null" | "undefined" | "None" | "nil" => {
            return InferredValue::of(ValueKind::Null, Conversion::None);
        }
        _ => {}
    }
    if INTEGER.is_match(text) {
        return InferredValue {
            literal: Some(text.to_string()),
            ..InferredValue::of(ValueKind::Integer, Conversion::None)
        };
    }
    if FLOAT.is_match(text) {
        return InferredValue {
            literal: Some(text.to_string()),
            ..InferredValue::of(ValueKind::Float, Conversion::None)
        };
    }
    if TO_INTEGER.is_match(text) {
        return InferredValue::of(ValueKind::Integer, Conversion::None);
    }
    if TO_FLOAT.is_match(text) {
        return InferredValue::of(ValueKind::Float, Conversion::None);
    }
    if text.starts_with('{')
        || text.starts_with("map[")
        || text.starts_with("dict(")
        || text.starts_with("Map.of(")
        || text.starts_with("new HashMap")
    {
        return InferredValue::of(ValueKind::Object, Conversion::None);
    }
    if text.starts_with('[')
        || text.starts_with("List.of(")
        || text.starts_with("Arrays.asList(")
        || text.starts_with("list(")
        || text.starts_with("new ArrayList")
    {
        return InferredValue::of(ValueKind::Array, Conversion::None);
    }
    if text.starts_with("!!") || text.starts_with("Boolean(") || text.starts_with("bool(") {
        return InferredValue::of(ValueKind::Boolean, Conversion::None);
    }
    if REFERENCE.is_match(text) {
        return InferredValue {
            value_ref: last_identifier(text),
            ..InferredValue::of(ValueKind::Unknown, Conversion::None)
        };
    }
    InferredValue::of(ValueKind::Unknown, Conversion::None)
}

/// Returns the last identifier of an expression.
#[must_use]
pub fn last_identifier(text: &str) -> Option<String> {
    LAST_IDENT.captures(text).and_then(|caps| caps.get(1)).map(|found| found.as_str().to_string())
}

// ============================================================================
// SECTION: Declared Types
// ============================================================================

/// Maps a declared type annotation to a kind and optionality.
#[must_use]
pub fn kind_from_type(language: Language, declared: &str) -> (ValueKind, bool) {
    let text = declared.trim().trim_end_matches(',').trim();
    match language {
        Language::TypeScript => typescript_kind(text),
        Language::Python => python_kind(text),
        Language::Go => go_kind(text),
        Language::Java => java_kind(text),
    }
}

/// TypeScript type mapping.
fn typescript_kind(text: &str) -> (ValueKind, bool) {
    let parts: Vec<&str> = text.split('|').map(str::trim).collect();
    let optional = parts.iter().any(|part| matches!(*part, "null" | "undefined"));
    let concrete: Vec<&str> =
        parts.into_iter().filter(|part| !matches!(*part, "null" | "undefined")).collect();
    let kind = match concrete.as_slice() {
        [single] => match *single {
            "string" => ValueKind::String,
            "number" => ValueKind::Number,
            "bigint" => ValueKind::Integer,
            "boolean" => ValueKind::Boolean,
            "Date" => ValueKind::String,
            other if other.ends_with("[]") || other.starts_with("Array<") => ValueKind::Array,
            other if other.starts_with('{') || other.starts_with("Record<") => ValueKind::Object,
            other if other.starts_with('\'') || other.starts_with('"') => ValueKind::String,
            other if other.chars().next().is_some_and(char::is_uppercase) => ValueKind::Object,
            _ => ValueKind::Unknown,
        },
        many if !many.is_empty()
            && many.iter().all(|part| part.starts_with('\'') || part.starts_with('"')) =>
        {
            ValueKind::String
        }
        _ => ValueKind::Unknown,
    };
    (kind, optional)
}

/// Python type mapping.
fn python_kind(text: &str) -> (ValueKind, bool) {
    let mut optional = false;
    let mut inner = text;
    if let Some(rest) = inner.strip_prefix("Optional[").and_then(|rest| rest.strip_suffix(']')) {
        optional = true;
        inner = rest;
    }
    let parts: Vec<&str> = inner.split('|').map(str::trim).collect();
    if parts.contains(&"None") {
        optional = true;
    }
    let concrete: Vec<&str> = parts.into_iter().filter(|part| *part != "None").collect();
    let kind = match concrete.as_slice() {
        [single] => {
            let base = single.split('[').next().unwrap_or(single);
            match base {
                "str" | "EmailStr" | "HttpUrl" | "AnyUrl" | "UUID" | "datetime" | "date" => {
                    ValueKind::String
                }
                "int" | "conint" | "PositiveInt" | "NonNegativeInt" => ValueKind::Integer,
                "float" | "confloat" => ValueKind::Float,
                "bool" => ValueKind::Boolean,
                "dict" | "Dict" | "Mapping" => ValueKind::Object,
                "list" | "List" | "Sequence" | "tuple" | "Tuple" | "set" | "Set" => {
                    ValueKind::Array
                }
                "Literal" => ValueKind::String,
                "Decimal" | "Any" => ValueKind::Unknown,
                other if other.chars().next().is_some_and(char::is_uppercase) => ValueKind::Object,
                _ => ValueKind::Unknown,
            }
        }
        _ => ValueKind::Unknown,
    };
    (kind, optional)
}

/// Go type mapping.
fn go_kind(text: &str) -> (ValueKind, bool) {
    let optional = text.starts_with('*');
    let base = text.trim_start_matches('*');
    let kind = match base {
        "string" | "time.Time" | "uuid.UUID" => ValueKind::String,
        "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32"
        | "uint64" => ValueKind::Integer,
        "float32" | "float64" => ValueKind::Float,
        "json.Number" => ValueKind::Number,
        "bool" => ValueKind::Boolean,
        other if other.starts_with("[]") => ValueKind::Array,
        other if other.starts_with("map[") => ValueKind::Object,
        "interface{}" | "any" | "decimal.Decimal" => ValueKind::Unknown,
        other if other.chars().next().is_some_and(char::is_uppercase) => ValueKind::Object,
        _ => ValueKind::Unknown,
    };
    (kind, optional || base.starts_with("[]") || base.starts_with("map["))
}

/// Java type mapping.
fn java_kind(text: &str) -> (ValueKind, bool) {
    let mut optional = false;
    let mut base = text.trim_start_matches("final ").trim();
    if let Some(rest) = base.strip_prefix("Optional<").and_then(|rest| rest.strip_suffix('>')) {
        optional = true;
        base = rest;
    }
    if base.starts_with("@Nullable") {
        optional = true;
        base = base.trim_start_matches("@Nullable").trim();
    }
    let kind = match base {
        "String" | "UUID" | "Instant" | "LocalDate" | "LocalDateTime" | "OffsetDateTime"
        | "ZonedDateTime" | "URI" | "char" | "Character" => ValueKind::String,
        "int" | "long" | "short" | "byte" | "Integer" | "Long" | "Short" | "BigInteger" => {
            ValueKind::Integer
        }
        "double" | "float" | "Double" | "Float" => ValueKind::Float,
        "boolean" | "Boolean" => ValueKind::Boolean,
        "BigDecimal" | "Object" => ValueKind::Unknown,
        other if other.ends_with("[]") || other.starts_with("List<") || other.starts_with("Set<") => {
            ValueKind::Array
        }
        other if other.starts_with("Map<") => ValueKind::Object,
        other if other.chars().next().is_some_and(char::is_uppercase) => ValueKind::Object,
        _ => ValueKind::Unknown,
    };
    (kind, optional)
}

// ============================================================================
// SECTION: Status Constants
// ============================================================================

/// Normalized status constant names and their codes.
const STATUS_NAMES: &[(&str, u16)] = &[
    ("OK", 200),
    ("CREATED", 201),
    ("ACCEPTED", 202),
    ("NOCONTENT", 204),
    ("MOVEDPERMANENTLY", 301),
    ("FOUND", 302),
    ("NOTMODIFIED", 304),
    ("BADREQUEST", 400),
    ("UNAUTHORIZED", 401),
    ("PAYMENTREQUIRED", 402),
    ("FORBIDDEN", 403),
    ("NOTFOUND", 404),
    ("METHODNOTALLOWED", 405),
    ("NOTACCEPTABLE", 406),
    ("REQUESTTIMEOUT", 408),
    ("CONFLICT", 409),
    ("GONE", 410),
    ("PRECONDITIONFAILED", 412),
    ("PAYLOADTOOLARGE", 413),
    ("REQUESTENTITYTOOLARGE", 413),
    ("UNSUPPORTEDMEDIATYPE", 415),
    ("UNPROCESSABLEENTITY", 422),
    ("UNPROCESSABLECONTENT", 422),
    ("TOOMANYREQUESTS", 429),
    ("INTERNALSERVERERROR", 500),
    ("NOTIMPLEMENTED", 501),
    ("BADGATEWAY", 502),
    ("SERVICEUNAVAILABLE", 503),
    ("GATEWAYTIMEOUT", 504),
];

/// Status code literal or symbolic constant.
pub(crate) static STATUS_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"\b(?:[1-5][0-9]{2}|http\.Status\w+|HttpStatus\.\w+|HTTPStatus\.\w+|status\.HTTP_\w+|HttpURLConnection\.HTTP_\w+|StatusCodes\.\w+|HttpStatusCode\.\w+)\b",
    )
});

/// HTTP method word leading a route pattern or test path (`"POST /orders"`).
pub(crate) static LEADING_METHOD: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^(?:GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\s+"));

/// Resolves a status token (literal or constant) to a code.
#[must_use]
pub fn status_code_of(token: &str) -> Option<u16> {
    let token = token.trim();
    if let Ok(code) = token.parse::<u16>() {
        return (100 ..= 599).contains(&code).then_some(code);
    }
    let name = token.rsplit('.').next().unwrap_or(token);
    let digits: String = name.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 3
        && let Ok(code) = digits.parse::<u16>()
    {
        return (100 ..= 599).contains(&code).then_some(code);
    }
    let normalized: String = name
        .trim_start_matches("Status")
        .trim_start_matches("HTTP_")
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    let normalized = normalized.strip_prefix("HTTP").unwrap_or(&normalized).to_string();
    STATUS_NAMES.iter().find(|(candidate, _)| *candidate == normalized).map(|(_, code)| *code)
}

/// Returns every status code mentioned in a text fragment.
#[must_use]
pub fn status_codes_in(text: &str) -> Vec<u16> {
    STATUS_TOKEN.find_iter(text).filter_map(|token| status_code_of(token.as_str())).collect()
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
    fn literals_and_conversions_are_classified() {
        assert_eq!(infer_value("3600", None, false).kind, ValueKind::Integer);
        assert_eq!(infer_value("19.99", None, false).kind, ValueKind::Float);
        assert_eq!(infer_value("String(expiresIn)", None, false).conversion, Conversion::ToString);
        assert_eq!(infer_value("str(total)", None, false).kind, ValueKind::String);
        assert_eq!(
            infer_value("amount.toFixed(2)", None, false).conversion,
            Conversion::FixedPrecision
        );
        assert_eq!(infer_value("null", None, false).kind, ValueKind::Null);
        let reference = infer_value("req.body.grantType", None, false);
        assert_eq!(reference.kind, ValueKind::Unknown);
        assert_eq!(reference.value_ref.as_deref(), Some("grantType"));
        let literal = infer_value("'x'", Some("x".to_string()), true);
        assert_eq!(literal.literal.as_deref(), Some("x"));
    }

    #[test]
    fn declared_types_map_to_kinds() {
        assert_eq!(kind_from_type(Language::TypeScript, "string | null"), (ValueKind::String, true));
        assert_eq!(kind_from_type(Language::Python, "Optional[int]"), (ValueKind::Integer, true));
        assert_eq!(kind_from_type(Language::Go, "*AppMetadata"), (ValueKind::Object, true));
        assert_eq!(kind_from_type(Language::Java, "long"), (ValueKind::Integer, false));
    }

    #[test]
    fn status_constants_resolve() {
        assert_eq!(status_code_of("http.StatusNotFound"), Some(404));
        assert_eq!(status_code_of("HttpStatus.UNPROCESSABLE_ENTITY"), Some(422));
        assert_eq!(status_code_of("status.HTTP_409_CONFLICT"), Some(409));
        assert_eq!(status_code_of("HTTPStatus.OK"), Some(200));
        assert_eq!(status_code_of("HttpURLConnection.HTTP_UNAVAILABLE"), None);
        assert_eq!(status_codes_in("if (res.status === 404 || res.status === 500)"), vec![404, 500]);
    }
}
