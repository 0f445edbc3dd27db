// crates/contract-gate-core/src/extract/sites.rs
// ============================================================================
// Module: Contract Gate Extraction Sites
// Description: Language-neutral site records and the observation builders
//              shared by every adapter.
// Purpose: Let adapters describe what they recognized (client calls, routes,
//          send sites, tests) and turn those sites into observations in one
//          place.
// Dependencies: regex, crate::core, crate::extract, crate::interfaces
// ============================================================================

//! ## Overview
//! Each language adapter implements [`Recognizer`]: a small set of hooks
//! that find client calls, route handlers, send sites, models, tests, and
//! assertions. The builders in this module are generic over the recognizer
//! and own everything else: endpoint binding, body shapes,
//! field reads and guards, status handling, error handling, enum dispatch,
//! and validations.
//!
//! Side assignment is fixed per construct: client calls and subscriptions
//! are consumer-side, routes and publishes are producer-side, and models,
//! enum dispatch, and decode calls take the unit's resolved side.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::manifest::EndpointRef;
use crate::core::manifest::HttpMethod;
use crate::core::manifest::MessageDirection;
use crate::core::manifest::ResolvedEndpoint;
use crate::core::observation::Assertion;
use crate::core::observation::AssertionDepth;
use crate::core::observation::BoundarySide;
use crate::core::observation::CallTarget;
use crate::core::observation::Conversion;
use crate::core::observation::EnumObservation;
use crate::core::observation::ErrorHandlingObservation;
use crate::core::observation::FallibleOperation;
use crate::core::observation::ModelObservation;
use crate::core::observation::NameSource;
use crate::core::observation::ObservedField;
use crate::core::observation::ObservedHeader;
use crate::core::observation::RequestObservation;
use crate::core::observation::ResponseObservation;
use crate::core::observation::StatusHandling;
use crate::core::observation::TestObservation;
use crate::core::observation::ValueKind;
use crate::core::source::Language;
use crate::core::source::SourceLocation;
use crate::extract::access::BodyRoot;
use crate::extract::access::body_reads;
use crate::extract::access::compact;
use crate::extract::binding::bind_call;
use crate::extract::binding::bind_enum;
use crate::extract::binding::bind_models;
use crate::extract::binding::bind_topic;
use crate::extract::binding::match_label;
use crate::extract::binding::paths_mentioned;
use crate::extract::control::decode_pattern;
use crate::extract::control::dispatches;
use crate::extract::control::error_handling;
use crate::extract::control::status_handling;
use crate::extract::control::subject_name;
use crate::extract::control::validations;
use crate::extract::kinds::compile;
use crate::extract::kinds::last_identifier;
use crate::extract::kinds::status_code_of;
use crate::extract::kinds::status_codes_in;
use crate::extract::scan::ScannedUnit;
use crate::extract::shapes::BodyShape;
use crate::extract::shapes::body_shape;
use crate::interfaces::ExtractionContext;

// ============================================================================
// SECTION: Site Records
// ============================================================================

/// Outgoing request or message publish recognized by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCall {
    /// Offset where the call expression starts.
    pub start: usize,
    /// Offset one past the call expression.
    pub end: usize,
    /// Callee text (`fetch`, `requests.post`, `client.Do`).
    pub callee: String,
    /// HTTP method, when known.
    pub method: Option<HttpMethod>,
    /// Rendered path template.
    pub path: Option<String>,
    /// Topic for message publishes.
    pub topic: Option<String>,
    /// Body expression.
    pub body: Option<Range<usize>>,
    /// Headers attached at the call site.
    pub headers: Vec<ObservedHeader>,
    /// Expressions holding the decoded response body.
    pub roots: Vec<BodyRoot>,
}

impl ClientCall {
    /// Creates a call with only its span and callee.
    #[must_use]
    pub fn new(start: usize, end: usize, callee: impl Into<String>) -> Self {
        Self {
            start,
            end,
            callee: callee.into(),
            method: None,
            path: None,
            topic: None,
            body: None,
            headers: Vec::new(),
            roots: Vec::new(),
        }
    }
}

/// Route handler or message subscription recognized by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHandler {
    /// Registration site.
    pub start: usize,
    /// HTTP method, when known.
    pub method: Option<HttpMethod>,
    /// Route path template or topic.
    pub path: String,
    /// True for message subscriptions.
    pub topic: bool,
    /// Handler body.
    pub body: Range<usize>,
    /// Expressions holding the decoded request body (or message payload).
    pub request_roots: Vec<BodyRoot>,
    /// Declared request model type.
    pub request_model: Option<String>,
    /// Declared response model type.
    pub response_model: Option<String>,
    /// Status declared on the handler (`status_code=`, `@ResponseStatus`).
    pub default_status: Option<u16>,
}

impl RouteHandler {
    /// Creates a handler with only its registration, path, and body.
    #[must_use]
    pub fn new(start: usize, method: Option<HttpMethod>, path: impl Into<String>, body: Range<usize>) -> Self {
        Self {
            start,
            method,
            path: path.into(),
            topic: false,
            body,
            request_roots: Vec::new(),
            request_model: None,
            response_model: None,
            default_status: None,
        }
    }
}

/// Response production site inside a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendSite {
    /// Site offset.
    pub at: usize,
    /// Explicit status, when written.
    pub status: Option<u16>,
    /// Body expression, when present.
    pub body: Option<Range<usize>>,
}

/// Test function recognized by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Declaration offset.
    pub start: usize,
    /// Test name.
    pub name: String,
    /// Test body.
    pub body: Range<usize>,
}

/// Function parameter as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Declared type text.
    pub type_text: String,
    /// Decorators or annotations preceding the parameter.
    pub annotations: String,
}

/// Local variables bound to a call result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultBinding {
    /// Plain assignment (`const res = ...`, `resp, err := ...`).
    Name(String),
    /// Destructuring (`const { data: order } = ...`) as `(key, local)` pairs.
    Destructure(Vec<(String, String)>),
}

/// Function found after a decorator or annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionParts {
    /// Function name.
    pub name: String,
    /// Parameter list range (inside the parentheses).
    pub params: Range<usize>,
    /// Text between the parameter list and the body (return type, `throws`).
    pub signature_tail: String,
    /// Body range.
    pub body: Range<usize>,
}

// ============================================================================
// SECTION: Recognizer
// ============================================================================

/// Language-specific hooks behind every adapter.
pub trait Recognizer {
    /// Language handled.
    fn language(&self) -> Language;

    /// Returns true when a path names a test unit.
    fn is_test_path(&self, path: &str) -> bool;

    /// Finds outgoing HTTP calls.
    fn client_calls(&self, unit: &ScannedUnit) -> Vec<ClientCall>;

    /// Finds route handlers.
    fn routes(&self, unit: &ScannedUnit) -> Vec<RouteHandler>;

    /// Finds response production sites within a route handler.
    fn send_sites(&self, unit: &ScannedUnit, route: &RouteHandler) -> Vec<SendSite>;

    /// Finds declared data models.
    fn models(&self, unit: &ScannedUnit, side: BoundarySide) -> Vec<ModelObservation>;

    /// Finds test functions.
    fn test_cases(&self, unit: &ScannedUnit) -> Vec<TestCase>;

    /// Classifies assertions within a test body.
    fn assertions(&self, unit: &ScannedUnit, body: Range<usize>) -> Vec<Assertion>;

    /// Parses a parameter list.
    fn params(&self, unit: &ScannedUnit, range: Range<usize>) -> Vec<Param>;
}

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// Header attachment calls with a literal name.
static HEADER_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"(?:Header\.(?:Set|Add)|\.(?:header|setHeader|set|append|add|defaultHeader|addHeader|put))\(\s*["']([A-Za-z][\w-]*)["']\s*,"#,
    )
});

/// Header object literals (`headers: {...}`, `headers={...}`).
static HEADER_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(?:headers|Headers|HEADERS)\s*(?:[:=]|\.update\()\s*\{([^{}]*)\}"));

/// Keys inside a header object literal.
static HEADER_KEY: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?:^|[,{\s])["']?([A-Za-z][\w-]*)["']?\s*:"#));

/// Indexed header assignment (`headers["X"] = ...`).
static HEADER_INDEX: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?i)headers(?:\.common)?\[\s*["']([A-Za-z][\w-]*)["']\s*\]\s*="#));

/// Helpers that set the `Authorization` header.
static AUTH_HELPER: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(?:setBearerAuth|setBasicAuth|SetBasicAuth|bearer_auth|BearerAuth|basic_auth)\b|\bauth\s*=\s*\("));

/// Statements that configure client-wide default headers.
const DEFAULT_HEADER_MARKERS: &[&str] = &[
    ".create(",
    "defaults.headers",
    "session.headers",
    "Session(",
    "Client(",
    "AsyncClient(",
    "defaultHeader",
    "defaultHeaders",
    "interceptors",
    "RoundTrip",
];

/// Acknowledged-but-unread response fields.
static IGNORE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| compile(r"contract-gate-ignore-field\s+([\w.,\s]+?)(?:\s+--|\*/|$)"));

/// Test lines that mention a response status or a mocked status.
static TEST_STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i:status)|\.code\b|\.Code\b|ResponseCode|Responder\(|\.reply\(|\.expect\(\s*[1-5][0-9]{2}|assertEquals\(\s*[1-5][0-9]{2}",
    )
});

/// Spring MockMvc status matchers (`status().isNotFound()`).
static STATUS_MATCHER: LazyLock<Regex> = LazyLock::new(|| compile(r"status\(\)\.is(\w+)\(\)"));

/// Literal-topic publish calls.
static PUBLISH_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"\.(?:publish|Publish|send|emit|produce|sendMessage|convertAndSend|produce_message)\(\s*["']([\w.\-/:]+)["']\s*,"#,
    )
});

/// Object-form publish (`producer.send({ topic: 'x', messages: [...] })`).
static PUBLISH_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"\.send\(\s*\{\s*topic\s*:\s*["']([\w.\-/:]+)["']"#));

/// Value key inside an object-form publish.
static PUBLISH_VALUE: LazyLock<Regex> = LazyLock::new(|| compile(r"\bvalue\s*:\s*"));

/// Literal-topic subscriptions with an inline handler.
static SUBSCRIBE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"\.(?:subscribe|Subscribe|QueueSubscribe|consume|listen)\(\s*["']([\w.\-/:]+)["']\s*,"#)
});

/// Decorator or annotation subscriptions.
static SUBSCRIBE_DECORATOR: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"@(?:\w+\.)?(?:subscriber|EventPattern|MessagePattern|KafkaListener|RabbitListener|JmsListener|SqsListener)\([^)]*?["']([\w.\-/:]+)["']"#,
    )
});

/// Assignment prefix before a call (`const res = await `, `resp, err := `).
static BINDING_NAME: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^\s*(?:(?:const|let|var|final|val)\s+)?(?:[\w<>\[\].?]+\s+)?([A-Za-z_$][\w$]*)(?:\s*,\s*[A-Za-z_]\w*)*\s*(?::\s*[^=]+)?\s*:?=\s*(?:await\s+)?$",
    )
});

/// Whole-line assignment (`const res = await request(app).get(...)`).
static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^\s*(?:(?:const|let|var|final|val)\s+)?(?:[\w<>\[\].?]+\s+)?([A-Za-z_$][\w$]*)(?:\s*,\s*[A-Za-z_]\w*)*\s*(?::\s*[^=]+?)?\s*:?=\s*(?:await\s+)?([^=].*)$",
    )
});

/// Locals that conventionally hold an HTTP response or test recorder.
const RESPONSE_RECEIVERS: &[&str] = &["res", "resp", "response", "rec", "recorder", "rr", "w"];

/// Destructuring prefix before a call (`const { data } = await `).
static DESTRUCTURE_BINDING: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*(?:const|let|var)\s*\{([^{}]*)\}\s*(?::[^=]+)?=\s*(?:await\s+)?$"));

/// Keyword argument prefix (`json=`).
static KEYWORD_PREFIX: LazyLock<Regex> = LazyLock::new(|| compile(r"^\s*[A-Za-z_]\w*\s*=[^=]"));

/// Text between a parameter list and a function body.
static BODY_LEAD: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*(?::[^{;()=]*|throws[^{;()]*|[\w.\[\]*]+(?:\s*,\s*[\w.\[\]*]+)*)?\s*(?:=>\s*)?\{"));

/// Python function definition line.
static PY_DEF: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^[ \t]*(?:async\s+)?def\s+(\w+)\s*\("));

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Returns the function-scope range containing `offset`.
#[must_use]
pub fn scope_of(unit: &ScannedUnit, offset: usize) -> Range<usize> {
    unit.function_scope(offset)
}

/// Finds the function following a decorator or annotation that ends at `from`.
#[must_use]
pub fn function_after(unit: &ScannedUnit, from: usize) -> Option<FunctionParts> {
    if unit.language == Language::Python {
        let found = PY_DEF.captures(unit.text(from .. unit.code.len()))?;
        let all = found.get(0)?;
        let name = found.get(1)?.as_str().to_string();
        let open = from + all.end() - 1;
        let close = unit.closing(open)?;
        let header_start = from + all.start();
        let colon = unit.python_header_colon(close)?;
        let tail = unit.text(close + 1 .. colon).trim().trim_start_matches("->").trim().to_string();
        return Some(FunctionParts {
            name,
            params: open + 1 .. close,
            signature_tail: tail,
            body: unit.python_block(header_start, colon),
        });
    }
    let mut index = from;
    let limit = unit.code.len();
    while index < limit {
        let relative = unit.text(index .. limit).find('(')?;
        let open = index + relative;
        if unit.in_string(open) {
            index = open + 1;
            continue;
        }
        let close = unit.closing(open)?;
        let rest = unit.text(close + 1 .. limit);
        if let Some(lead) = BODY_LEAD.find(rest) {
            let brace = close + lead.end();
            let body_close = unit.closing(brace)?;
            let name = last_identifier(unit.text(index .. open)).unwrap_or_default();
            let tail = rest[.. lead.end() - 1].trim().trim_end_matches("=>").trim().to_string();
            return Some(FunctionParts {
                name,
                params: open + 1 .. close,
                signature_tail: tail,
                body: brace + 1 .. body_close,
            });
        }
        index = open + 1;
    }
    None
}

/// Returns the local bound to the result of a call starting at `call_start`.
#[must_use]
pub fn result_binding(unit: &ScannedUnit, call_start: usize) -> Option<ResultBinding> {
    let line_start = unit.line_range(unit.line_of(call_start)).start;
    let prefix = unit.text(line_start .. call_start);
    if let Some(captures) = DESTRUCTURE_BINDING.captures(prefix)
        && let Some(entries) = captures.get(1)
    {
        let pairs = entries
            .as_str()
            .split(',')
            .filter_map(|entry| {
                let entry = entry.split('=').next()?.trim();
                if entry.is_empty() || entry.starts_with("...") {
                    return None;
                }
                Some(entry.split_once(':').map_or_else(
                    || (entry.to_string(), entry.to_string()),
                    |(key, local)| (key.trim().to_string(), local.trim().to_string()),
                ))
            })
            .collect();
        return Some(ResultBinding::Destructure(pairs));
    }
    BINDING_NAME
        .captures(prefix)
        .and_then(|captures| captures.get(1))
        .map(|name| ResultBinding::Name(name.as_str().to_string()))
}

/// Returns the value of `key` in an object literal (`{ key: value }`, or the
/// shorthand `{ key }`).
#[must_use]
pub fn object_entry(unit: &ScannedUnit, object: Range<usize>, key: &str) -> Option<Range<usize>> {
    let object = unit.trim(object);
    if unit.byte(object.start) != Some(b'{') {
        return None;
    }
    let close = unit.closing(object.start)?;
    for entry in unit.split_top_level(object.start + 1 .. close, b',') {
        let entry = unit.trim(entry);
        let text = unit.text(entry.clone());
        let name_end = text
            .find(|ch: char| !(ch.is_ascii_alphanumeric() || matches!(ch, '_' | '$' | '"' | '\'')))
            .unwrap_or(text.len());
        let name = text.get(.. name_end).unwrap_or("").trim_matches(['"', '\'']);
        if name != key {
            continue;
        }
        let rest = text.get(name_end ..).unwrap_or("").trim_start();
        if rest.is_empty() {
            return Some(entry);
        }
        if let Some(value) = rest.strip_prefix(':') {
            return Some(unit.trim(entry.end - value.len() .. entry.end));
        }
    }
    None
}

/// Returns the value of a keyword argument (`key=value`) among call arguments.
#[must_use]
pub fn keyword_arg(unit: &ScannedUnit, args: &[Range<usize>], key: &str) -> Option<Range<usize>> {
    args.iter().find_map(|arg| {
        let arg = unit.trim(arg.clone());
        let text = unit.text(arg.clone());
        let rest = text.strip_prefix(key)?.trim_start();
        let value = rest.strip_prefix('=').filter(|value| !value.starts_with('='))?;
        Some(unit.trim(arg.end - value.len() .. arg.end))
    })
}

/// Returns arguments that are not keyword arguments.
#[must_use]
pub fn positional_args(unit: &ScannedUnit, args: &[Range<usize>]) -> Vec<Range<usize>> {
    args.iter()
        .filter(|arg| !KEYWORD_PREFIX.is_match(unit.text((*arg).clone())))
        .cloned()
        .collect()
}

/// Builds an assertion on `subject`, targeting `key` when given or the
/// subject's last field otherwise.
#[must_use]
pub fn assertion(
    unit: &ScannedUnit,
    at: usize,
    subject: &str,
    depth: AssertionDepth,
    key: Option<String>,
) -> Assertion {
    let target = key.or_else(|| Some(subject_name(subject)).filter(|name| !name.is_empty()));
    Assertion {
        target,
        subject: compact(subject),
        depth,
        location: unit.location(at),
    }
}

/// Returns the locals in a test body that hold an HTTP response or recorder.
///
/// A local qualifies when it carries a conventional response name, or when
/// it is assigned the result of a call that neither decodes a body nor
/// derives from another response local.
#[must_use]
pub fn response_locals(unit: &ScannedUnit, body: Range<usize>) -> Vec<String> {
    let mut locals: Vec<String> = RESPONSE_RECEIVERS.iter().map(ToString::to_string).collect();
    let decode = decode_pattern(unit.language);
    for line in unit.line_of(body.start) ..= unit.line_of(body.end) {
        let Some(captures) = ASSIGNMENT.captures(unit.code_line(line)) else {
            continue;
        };
        let (Some(name), Some(value)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let value = value.as_str().trim();
        let root = value.split(['.', '(']).next().unwrap_or("").trim();
        let derived = locals.iter().any(|local| local == root);
        if value.contains('(') && !decode.is_match(value) && !derived {
            locals.push(name.as_str().to_string());
        } else {
            let name = name.as_str();
            locals.retain(|local| local != name);
        }
    }
    locals
}

/// Returns true when an assertion subject is the HTTP status of a response
/// held by one of `responses`.
#[must_use]
pub fn is_status_subject(subject: &str, responses: &[String]) -> bool {
    let text = compact(subject);
    let text = text.trim_end_matches("()");
    let Some((receiver, member)) = text.rsplit_once('.') else {
        return false;
    };
    matches!(member, "status" | "statusCode" | "status_code" | "StatusCode" | "Code" | "getStatusCode")
        && responses.iter().any(|local| local == receiver)
}

/// Collects headers attached within a range.
#[must_use]
pub fn headers_in(unit: &ScannedUnit, range: Range<usize>) -> Vec<ObservedHeader> {
    let mut headers = Vec::new();
    let text = unit.text(range.clone());
    let mut push = |name: &str, offset: usize| {
        if !headers.iter().any(|existing: &ObservedHeader| existing.name.eq_ignore_ascii_case(name)) {
            headers.push(ObservedHeader {
                name: name.to_string(),
                location: unit.location(offset),
            });
        }
    };
    for captures in HEADER_CALL.captures_iter(text) {
        if let Some(name) = captures.get(1) {
            push(name.as_str(), range.start + name.start());
        }
    }
    for captures in HEADER_INDEX.captures_iter(text) {
        if let Some(name) = captures.get(1) {
            push(name.as_str(), range.start + name.start());
        }
    }
    for captures in HEADER_OBJECT.captures_iter(text) {
        let Some(body) = captures.get(1) else {
            continue;
        };
        for key in HEADER_KEY.captures_iter(body.as_str()) {
            if let Some(name) = key.get(1) {
                push(name.as_str(), range.start + body.start() + name.start());
            }
        }
    }
    for found in AUTH_HELPER.find_iter(text) {
        push("Authorization", range.start + found.start());
    }
    headers
}

/// Collects client-wide default headers configured anywhere in the unit.
#[must_use]
pub fn default_headers(unit: &ScannedUnit) -> Vec<ObservedHeader> {
    let mut headers: Vec<ObservedHeader> = Vec::new();
    for line in 1 ..= unit.line_count() {
        let text = unit.code_line(line);
        if !DEFAULT_HEADER_MARKERS.iter().any(|marker| text.contains(marker)) {
            continue;
        }
        let start = unit.line_range(line).start;
        let end = unit.statement_end(start).max(unit.line_range(line).end);
        for header in headers_in(unit, start .. end) {
            if !headers.iter().any(|existing| existing.name.eq_ignore_ascii_case(&header.name)) {
                headers.push(header);
            }
        }
    }
    headers
}

/// Returns field names acknowledged via `contract-gate-ignore-field` in a range.
#[must_use]
pub fn acknowledged_fields(unit: &ScannedUnit, range: Range<usize>) -> Vec<String> {
    let first = unit.line_of(range.start).saturating_sub(1).max(1);
    let last = unit.line_of(range.end);
    let mut names = Vec::new();
    for line in first ..= last {
        for captures in IGNORE_FIELD.captures_iter(unit.raw_line(line)) {
            let Some(list) = captures.get(1) else {
                continue;
            };
            for name in list.as_str().split([',', ' ']) {
                let name = name.trim();
                if !name.is_empty() && !names.iter().any(|existing| existing == name) {
                    names.push(name.to_string());
                }
            }
        }
    }
    names
}

/// Returns status codes a test body exercises.
#[must_use]
pub fn test_status_codes(unit: &ScannedUnit, body: Range<usize>) -> BTreeSet<u16> {
    let mut codes = BTreeSet::new();
    let first = unit.line_of(body.start);
    let last = unit.line_of(body.end);
    for line in first ..= last {
        let text = unit.code_line(line);
        if TEST_STATUS_LINE.is_match(text) {
            codes.extend(status_codes_in(text));
        }
        for captures in STATUS_MATCHER.captures_iter(text) {
            if let Some(code) = captures.get(1).and_then(|name| status_code_of(name.as_str())) {
                codes.insert(code);
            }
        }
    }
    codes
}

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Finds literal-topic publish calls.
#[must_use]
pub fn message_publishes(unit: &ScannedUnit) -> Vec<ClientCall> {
    let mut calls = Vec::new();
    for captures in PUBLISH_CALL.captures_iter(&unit.code) {
        let (Some(all), Some(topic)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Some(open) = unit.code.get(.. all.end()).and_then(|text| text.rfind('(')) else {
            continue;
        };
        let Some(close) = unit.closing(open) else {
            continue;
        };
        let mut call = ClientCall::new(all.start() + 1, close + 1, "publish");
        call.topic = Some(topic.as_str().to_string());
        call.body = unit.call_args(open).into_iter().nth(1);
        calls.push(call);
    }
    for captures in PUBLISH_OBJECT.captures_iter(&unit.code) {
        let (Some(all), Some(topic)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let open = all.start() + ".send".len();
        let Some(close) = unit.closing(open) else {
            continue;
        };
        let mut call = ClientCall::new(all.start() + 1, close + 1, "send");
        call.topic = Some(topic.as_str().to_string());
        if let Some(value) = PUBLISH_VALUE.find(unit.text(open .. close)) {
            let start = open + value.end();
            call.body = Some(unit.trim(start .. unit.statement_end(start).min(close)));
        }
        calls.push(call);
    }
    calls
}

/// Finds literal-topic subscriptions with inline or decorated handlers.
pub fn message_subscriptions<R: Recognizer + ?Sized>(recognizer: &R, unit: &ScannedUnit) -> Vec<RouteHandler> {
    let mut handlers = Vec::new();
    for captures in SUBSCRIBE_CALL.captures_iter(&unit.code) {
        let (Some(all), Some(topic)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Some(parts) = function_after(unit, all.end()) else {
            continue;
        };
        handlers.push(subscription(recognizer, unit, all.start(), topic.as_str(), &parts));
    }
    for captures in SUBSCRIBE_DECORATOR.captures_iter(&unit.code) {
        let (Some(all), Some(topic)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Some(parts) = function_after(unit, all.end()) else {
            continue;
        };
        handlers.push(subscription(recognizer, unit, all.start(), topic.as_str(), &parts));
    }
    handlers
}

/// Builds a subscription handler whose first non-context parameter is the payload.
fn subscription<R: Recognizer + ?Sized>(
    recognizer: &R,
    unit: &ScannedUnit,
    start: usize,
    topic: &str,
    parts: &FunctionParts,
) -> RouteHandler {
    let params = recognizer.params(unit, parts.params.clone());
    let payload = params.iter().find(|param| !matches!(param.name.as_str(), "self" | "ctx" | "context"));
    let mut handler = RouteHandler::new(start, None, topic, parts.body.clone());
    handler.topic = true;
    if let Some(param) = payload {
        handler.request_roots.push(BodyRoot::new(param.name.clone(), parts.body.start));
        let type_name = param.type_text.trim_start_matches(['*', '&']).trim();
        if type_name.chars().next().is_some_and(char::is_uppercase) {
            handler.request_model = Some(type_name.to_string());
        }
    }
    handler.request_roots.extend(decode_roots(unit, parts.body.clone()));
    handler
}

/// Returns decode-call expressions and decode targets within a range as roots.
#[must_use]
pub fn decode_roots(unit: &ScannedUnit, range: Range<usize>) -> Vec<BodyRoot> {
    let mut roots = Vec::new();
    let pattern = decode_pattern(unit.language);
    for found in pattern.find_iter(unit.text(range.clone())) {
        let at = range.start + found.start();
        if unit.in_string(at) {
            continue;
        }
        let Some(open) = found.as_str().rfind('(').map(|index| range.start + found.start() + index) else {
            continue;
        };
        let Some(close) = unit.closing(open) else {
            continue;
        };
        if unit.language == Language::Go {
            let target = unit.call_args(open).into_iter().last();
            if let Some(target) = target {
                let name = unit.text(target).trim_start_matches('&').trim().to_string();
                if !name.is_empty() {
                    roots.push(BodyRoot::new(name, close + 1));
                }
            }
            continue;
        }
        let start = unit.statement_start(at).max(range.start);
        let expr = unit.text(unit.trim(start .. close + 1)).to_string();
        let expr = expr.split_once('=').map_or(expr.as_str(), |(_, rhs)| rhs).trim();
        let expr = expr.strip_prefix("await ").unwrap_or(expr).trim().to_string();
        if !expr.is_empty() {
            roots.push(BodyRoot::new(expr, start));
        }
    }
    roots
}

// ============================================================================
// SECTION: Observation Builders
// ============================================================================

/// Returns the boundary side for a call: publishes are producer-side.
const fn call_side(call: &ClientCall) -> BoundarySide {
    if call.topic.is_some() { BoundarySide::Producer } else { BoundarySide::Consumer }
}

/// Returns the side for a handler: subscriptions are consumer-side.
const fn handler_side(handler: &RouteHandler) -> BoundarySide {
    if handler.topic { BoundarySide::Consumer } else { BoundarySide::Producer }
}

/// Binds a client call.
fn bind_client<'a>(ctx: &ExtractionContext<'a>, call: &ClientCall) -> Option<ResolvedEndpoint<'a>> {
    if let Some(topic) = &call.topic {
        return bind_topic(ctx, topic, MessageDirection::Publish);
    }
    bind_call(ctx, call.method, call.path.as_deref()?)
}

/// Binds a route or subscription.
fn bind_handler<'a>(ctx: &ExtractionContext<'a>, handler: &RouteHandler) -> Option<ResolvedEndpoint<'a>> {
    if handler.topic {
        return bind_topic(ctx, &handler.path, MessageDirection::Subscribe);
    }
    bind_call(ctx, handler.method, &handler.path)
}

/// Returns client calls including message publishes, in source order.
fn all_calls<R: Recognizer + ?Sized>(recognizer: &R, unit: &ScannedUnit) -> Vec<ClientCall> {
    let mut calls = recognizer.client_calls(unit);
    calls.extend(message_publishes(unit));
    calls.sort_by_key(|call| call.start);
    calls.dedup_by_key(|call| call.start);
    calls
}

/// Returns routes including message subscriptions, in source order.
fn all_handlers<R: Recognizer + ?Sized>(recognizer: &R, unit: &ScannedUnit) -> Vec<RouteHandler> {
    let mut handlers = recognizer.routes(unit);
    handlers.extend(message_subscriptions(recognizer, unit));
    handlers.sort_by_key(|handler| handler.start);
    handlers.dedup_by_key(|handler| handler.start);
    handlers
}

/// Returns true when a method conventionally carries no request body.
const fn bodyless(method: Option<HttpMethod>) -> bool {
    matches!(
        method,
        None | Some(HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete | HttpMethod::Options)
    )
}

/// Builds request observations for a unit.
#[must_use]
pub fn build_requests<R: Recognizer + ?Sized>(
    recognizer: &R,
    unit: &ScannedUnit,
    ctx: &ExtractionContext<'_>,
) -> Vec<RequestObservation> {
    if unit.is_test {
        return Vec::new();
    }
    let models = recognizer.models(unit, ctx.side);
    let defaults = default_headers(unit);
    let mut observations = Vec::new();
    for call in all_calls(recognizer, unit) {
        let scope = scope_of(unit, call.start);
        let shape = call
            .body
            .clone()
            .map_or_else(BodyShape::unknown, |body| body_shape(unit, body, scope.clone(), &models));
        let has_body = call.body.is_some();
        let shape_known = if has_body { shape.known } else { call.topic.is_none() && !bodyless(call.method) };
        let mut headers = call.headers.clone();
        for header in headers_in(unit, scope.start .. call.end).into_iter().chain(defaults.iter().cloned()) {
            if !headers.iter().any(|existing| existing.name.eq_ignore_ascii_case(&header.name)) {
                headers.push(header);
            }
        }
        observations.push(RequestObservation {
            location: unit.location(call.start),
            side: call_side(&call),
            target: CallTarget {
                method: call.method,
                path: call.path.clone().or_else(|| call.topic.clone()),
            },
            endpoint: bind_client(ctx, &call).map(|resolved| resolved.reference()),
            fields: shape.fields,
            shape_known,
            has_body,
            headers,
            validations: validations(unit, scope.start .. call.start),
        });
    }
    for handler in all_handlers(recognizer, unit) {
        if handler.topic {
            continue;
        }
        let mut names: Vec<ObservedField> = Vec::new();
        for read in body_reads(unit, handler.request_roots.clone(), handler.body.clone()) {
            let Some(first) = read.path.first() else {
                continue;
            };
            if !names.iter().any(|field| &field.name == first) {
                names.push(accessor_field(first, read.location.clone()));
            }
        }
        if let Some(model) = handler.request_model.as_deref().and_then(|name| model_by_name(&models, name)) {
            for field in &model.fields {
                if !names.iter().any(|existing| existing.name == field.wire_name) {
                    names.push(ObservedField {
                        name: field.wire_name.clone(),
                        source: if field.explicit_wire_name { NameSource::Wire } else { NameSource::Accessor },
                        kind: field.kind,
                        conversion: Conversion::None,
                        literal: None,
                        value_ref: None,
                        children: None,
                        location: field.location.clone(),
                    });
                }
            }
        }
        observations.push(RequestObservation {
            location: unit.location(handler.start),
            side: handler_side(&handler),
            target: CallTarget {
                method: handler.method,
                path: Some(handler.path.clone()),
            },
            endpoint: bind_handler(ctx, &handler).map(|resolved| resolved.reference()),
            has_body: !names.is_empty(),
            fields: names,
            shape_known: false,
            headers: headers_in(unit, handler.body.clone()),
            validations: validations(unit, handler.body.clone()),
        });
    }
    observations
}

/// Builds a field observed through an accessor in a handler.
fn accessor_field(name: &str, location: SourceLocation) -> ObservedField {
    ObservedField {
        name: name.to_string(),
        source: NameSource::Accessor,
        kind: ValueKind::Unknown,
        conversion: Conversion::None,
        literal: None,
        value_ref: None,
        children: None,
        location,
    }
}

/// Finds a model by possibly generic or qualified type name.
fn model_by_name<'a>(models: &'a [ModelObservation], type_text: &str) -> Option<&'a ModelObservation> {
    let inner = type_text
        .rsplit(['<', '['])
        .next()
        .unwrap_or(type_text)
        .trim_end_matches(['>', ']', '?'])
        .trim();
    let short = inner.rsplit('.').next().unwrap_or(inner);
    models.iter().find(|model| model.name == short)
}

/// Builds response observations for a unit.
#[must_use]
pub fn build_responses<R: Recognizer + ?Sized>(
    recognizer: &R,
    unit: &ScannedUnit,
    ctx: &ExtractionContext<'_>,
) -> Vec<ResponseObservation> {
    if unit.is_test {
        return Vec::new();
    }
    let models = recognizer.models(unit, ctx.side);
    let mut observations = Vec::new();
    let calls = all_calls(recognizer, unit);
    for (index, call) in calls.iter().enumerate() {
        if call.topic.is_some() {
            continue;
        }
        let scope = scope_of(unit, call.start);
        let next_call = calls
            .get(index + 1)
            .map(|next| next.start)
            .filter(|next| scope.contains(next))
            .unwrap_or(scope.end);
        observations.push(ResponseObservation {
            location: unit.location(call.start),
            side: BoundarySide::Consumer,
            target: CallTarget {
                method: call.method,
                path: call.path.clone(),
            },
            endpoint: bind_client(ctx, call).map(|resolved| resolved.reference()),
            status: status_handling(unit, call.start .. next_call),
            reads: body_reads(unit, call.roots.clone(), scope.clone()),
            produced: Vec::new(),
            shape_known: false,
            acknowledged: acknowledged_fields(unit, scope),
        });
    }
    for handler in all_handlers(recognizer, unit) {
        let endpoint = bind_handler(ctx, &handler).map(|resolved| resolved.reference());
        let target = CallTarget {
            method: handler.method,
            path: Some(handler.path.clone()),
        };
        if handler.topic {
            observations.push(ResponseObservation {
                location: unit.location(handler.start),
                side: handler_side(&handler),
                target,
                endpoint,
                status: StatusHandling::default(),
                reads: body_reads(unit, handler.request_roots.clone(), handler.body.clone()),
                produced: Vec::new(),
                shape_known: false,
                acknowledged: acknowledged_fields(unit, handler.body.clone()),
            });
            continue;
        }
        let sites = recognizer.send_sites(unit, &handler);
        for site in &sites {
            let shape = site
                .body
                .clone()
                .map_or_else(BodyShape::unknown, |body| body_shape(unit, body, handler.body.clone(), &models));
            let mut status = StatusHandling::default();
            if let Some(code) = site.status.or(handler.default_status) {
                status.codes.insert(code);
            }
            observations.push(ResponseObservation {
                location: unit.location(site.at),
                side: BoundarySide::Producer,
                target: target.clone(),
                endpoint: endpoint.clone(),
                status,
                reads: Vec::new(),
                produced: shape.fields,
                shape_known: shape.known && site.body.is_some(),
                acknowledged: Vec::new(),
            });
        }
        let produces_body = sites.iter().any(|site| site.body.is_some());
        if !produces_body
            && let Some(model) = handler.response_model.as_deref().and_then(|name| model_by_name(&models, name))
        {
            let mut status = StatusHandling::default();
            if let Some(code) = handler.default_status {
                status.codes.insert(code);
            }
            observations.push(ResponseObservation {
                location: unit.location(handler.start),
                side: BoundarySide::Producer,
                target,
                endpoint,
                status,
                reads: Vec::new(),
                produced: model_fields(model),
                shape_known: true,
                acknowledged: Vec::new(),
            });
        }
    }
    observations
}

/// Converts a model's declared fields into produced fields.
fn model_fields(model: &ModelObservation) -> Vec<ObservedField> {
    model
        .fields
        .iter()
        .map(|field| ObservedField {
            name: field.wire_name.clone(),
            source: if field.explicit_wire_name { NameSource::Wire } else { NameSource::Accessor },
            kind: field.kind,
            conversion: Conversion::None,
            literal: None,
            value_ref: None,
            children: None,
            location: field.location.clone(),
        })
        .collect()
}

/// Builds error-handling observations for a unit.
#[must_use]
pub fn build_errors<R: Recognizer + ?Sized>(
    recognizer: &R,
    unit: &ScannedUnit,
    ctx: &ExtractionContext<'_>,
) -> Vec<ErrorHandlingObservation> {
    if unit.is_test {
        return Vec::new();
    }
    let calls: Vec<ClientCall> = all_calls(recognizer, unit).into_iter().filter(|call| call.topic.is_none()).collect();
    let mut observations = Vec::new();
    for call in &calls {
        observations.push(ErrorHandlingObservation {
            location: unit.location(call.start),
            side: BoundarySide::Consumer,
            operation: FallibleOperation::Network,
            call: call.callee.clone(),
            handling: error_handling(unit, call.start .. call.end),
            endpoint: bind_client(ctx, call).map(|resolved| resolved.reference()),
        });
    }
    for found in decode_pattern(unit.language).find_iter(&unit.code) {
        let at = found.start();
        if unit.in_string(at) {
            continue;
        }
        let end = found
            .as_str()
            .rfind('(')
            .and_then(|index| unit.closing(found.start() + index))
            .map_or(found.end(), |close| close + 1);
        let scope = scope_of(unit, at);
        let owner = calls.iter().rev().find(|call| call.start < at && scope.contains(&call.start));
        let callee = found
            .as_str()
            .trim_start_matches('.')
            .split('(')
            .next()
            .and_then(|name| name.rsplit('.').next())
            .unwrap_or_default()
            .to_string();
        observations.push(ErrorHandlingObservation {
            location: unit.location(at),
            side: ctx.side,
            operation: FallibleOperation::Decode,
            call: callee,
            handling: error_handling(unit, at .. end),
            endpoint: owner.and_then(|call| bind_client(ctx, call)).map(|resolved| resolved.reference()),
        });
    }
    observations
}

/// Builds enum dispatch observations for a unit.
#[must_use]
pub fn build_enums<R: Recognizer + ?Sized>(
    recognizer: &R,
    unit: &ScannedUnit,
    ctx: &ExtractionContext<'_>,
) -> Vec<EnumObservation> {
    if unit.is_test {
        return Vec::new();
    }
    let mut preferred: BTreeSet<EndpointRef> = BTreeSet::new();
    for call in all_calls(recognizer, unit) {
        if let Some(resolved) = bind_client(ctx, &call) {
            preferred.insert(resolved.reference());
        }
    }
    for handler in all_handlers(recognizer, unit) {
        if let Some(resolved) = bind_handler(ctx, &handler) {
            preferred.insert(resolved.reference());
        }
    }
    let mut observations = Vec::new();
    for dispatch in dispatches(unit) {
        let subject = dispatch.subject_name();
        let Some(binding) = bind_enum(ctx, &subject, &preferred) else {
            continue;
        };
        let handled: BTreeSet<String> =
            dispatch.labels.iter().filter_map(|label| match_label(&binding.values, label)).collect();
        if handled.is_empty() {
            continue;
        }
        observations.push(EnumObservation {
            location: unit.location(dispatch.at),
            side: ctx.side,
            subject,
            endpoint: Some(binding.endpoint),
            direction: Some(binding.direction),
            field_path: Some(binding.field_path),
            handled,
            has_default: dispatch.has_default,
        });
    }
    observations
}

/// Builds test observations for a test unit.
#[must_use]
pub fn build_tests<R: Recognizer + ?Sized>(
    recognizer: &R,
    unit: &ScannedUnit,
    ctx: &ExtractionContext<'_>,
) -> Vec<TestObservation> {
    if !unit.is_test {
        return Vec::new();
    }
    let unit_paths = paths_mentioned(unit, 0 .. unit.code.len(), ctx.manifest);
    recognizer
        .test_cases(unit)
        .into_iter()
        .map(|case| {
            let mut endpoints = paths_mentioned(unit, case.body.clone(), ctx.manifest);
            if endpoints.is_empty() {
                endpoints.clone_from(&unit_paths);
            }
            TestObservation {
                location: unit.location(case.start),
                name: case.name,
                endpoints,
                assertions: recognizer.assertions(unit, case.body.clone()),
                status_codes: test_status_codes(unit, case.body),
            }
        })
        .collect()
}

/// Builds and binds model observations for a unit.
#[must_use]
pub fn build_models<R: Recognizer + ?Sized>(
    recognizer: &R,
    unit: &ScannedUnit,
    ctx: &ExtractionContext<'_>,
) -> Vec<ModelObservation> {
    let mut models = recognizer.models(unit, ctx.side);
    bind_models(&mut models, ctx.manifest);
    models
}

/// Infers a unit's side from its constructs.
#[must_use]
pub fn infer_side<R: Recognizer + ?Sized>(recognizer: &R, unit: &ScannedUnit) -> BoundarySide {
    let has_routes = !recognizer.routes(unit).is_empty();
    let has_calls = !recognizer.client_calls(unit).is_empty();
    match (has_routes, has_calls) {
        (true, false) => BoundarySide::Producer,
        (false, true) => BoundarySide::Consumer,
        _ => BoundarySide::Unknown,
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
    use crate::extract::scan::scan_text;

    fn scan(language: Language, path: &str, text: &str) -> ScannedUnit {
        scan_text(path, language, false, text.to_string()).unwrap()
    }

    #[test]
    fn headers_are_collected_from_objects_and_calls() {
        let unit = scan(
            Language::TypeScript,
            "a.ts",
            "fetch('/x', { headers: { Authorization: token, 'X-Request-Id': id } });\nreq.setHeader('Accept', 'json');\n",
        );
        let names: Vec<String> = headers_in(&unit, 0 .. unit.code.len()).into_iter().map(|header| header.name).collect();
        assert_eq!(names, vec!["Accept", "Authorization", "X-Request-Id"]);
    }

    #[test]
    fn ignore_field_directives_are_acknowledged() {
        let unit = scan(
            Language::TypeScript,
            "a.ts",
            "async function f() {\n  // contract-gate-ignore-field scope, token_type -- unused\n  const res = await fetch('/x');\n}\n",
        );
        assert_eq!(acknowledged_fields(&unit, 0 .. unit.code.len()), vec!["scope", "token_type"]);
    }

    #[test]
    fn test_status_codes_cover_assertions_and_mocks() {
        let unit = scan(
            Language::TypeScript,
            "a.test.ts",
            "it('x', async () => {\n  nock(base).get('/x').reply(503);\n  expect(res.status).toBe(404);\n  const total = 200;\n});\n",
        );
        let codes: Vec<u16> = test_status_codes(&unit, 0 .. unit.code.len()).into_iter().collect();
        assert_eq!(codes, vec![404, 503]);
    }

    #[test]
    fn status_subjects_require_a_response_receiver() {
        let unit = scan(
            Language::TypeScript,
            "a.test.ts",
            "it('x', async () => {\n  const reply = await request(app).get('/orders/1');\n  const body = reply.body;\n  const data = await reply.json();\n  expect(reply.status).toBe(200);\n  expect(body.status).toBe('pending');\n});\n",
        );
        let responses = response_locals(&unit, 0 .. unit.code.len());
        assert!(responses.iter().any(|local| local == "reply"));
        assert!(!responses.iter().any(|local| local == "body" || local == "data"));
        assert!(is_status_subject("reply.status", &responses));
        assert!(is_status_subject("res.status", &responses));
        assert!(!is_status_subject("body.status", &responses));
        assert!(!is_status_subject("data.status", &responses));
        assert!(!is_status_subject("res.body.status", &responses));

        let go = scan(Language::Go, "a_test.go", "func TestX(t *testing.T) {\n\tout, err := client.Do(req)\n\tassert.Equal(t, 200, out.StatusCode)\n}\n");
        let responses = response_locals(&go, 0 .. go.code.len());
        assert!(is_status_subject("out.StatusCode", &responses));
    }

    #[test]
    fn publishes_capture_topic_and_payload() {
        let unit = scan(
            Language::TypeScript,
            "a.ts",
            "await bus.publish('orders.created', { order_id: id, total });\nawait producer.send({ topic: 'orders.shipped', messages: [{ value: JSON.stringify(evt) }] });\n",
        );
        let calls = message_publishes(&unit);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].topic.as_deref(), Some("orders.created"));
        assert!(calls[0].body.is_some());
        assert_eq!(calls[1].topic.as_deref(), Some("orders.shipped"));
        assert_eq!(unit.text(calls[1].body.clone().unwrap()), "JSON.stringify(evt)");
    }

    #[test]
    fn result_bindings_cover_assignments_and_destructuring() {
        let unit = scan(
            Language::TypeScript,
            "a.ts",
            "const res = await fetch(url);\nconst { data: order } = await api.get(url);\nreturn fetch(url);\n",
        );
        let first = unit.code.find("fetch").unwrap();
        assert_eq!(result_binding(&unit, first), Some(ResultBinding::Name("res".to_string())));
        let second = unit.code.find("api.get").unwrap();
        assert_eq!(
            result_binding(&unit, second),
            Some(ResultBinding::Destructure(vec![("data".to_string(), "order".to_string())]))
        );
        let third = unit.code.rfind("fetch").unwrap();
        assert_eq!(result_binding(&unit, third), None);
        let go = scan(Language::Go, "a.go", "resp, err := client.Do(req)\n");
        let call = go.code.find("client").unwrap();
        assert_eq!(result_binding(&go, call), Some(ResultBinding::Name("resp".to_string())));
    }

    #[test]
    fn object_entries_and_keyword_args_are_found() {
        let unit = scan(Language::TypeScript, "a.ts", "fetch(url, { method: 'POST', body });\n");
        let open = unit.code.find('(').unwrap();
        let args = unit.call_args(open);
        let method = object_entry(&unit, args[1].clone(), "method").unwrap();
        assert_eq!(unit.text(method), "'POST'");
        let body = object_entry(&unit, args[1].clone(), "body").unwrap();
        assert_eq!(unit.text(body), "body");
        let py = scan(Language::Python, "a.py", "requests.post(url, json=payload, timeout=5)\n");
        let open = py.code.find('(').unwrap();
        let args = py.call_args(open);
        assert_eq!(py.text(keyword_arg(&py, &args, "json").unwrap()), "payload");
        assert_eq!(positional_args(&py, &args).len(), 1);
    }

    #[test]
    fn function_after_finds_decorated_bodies() {
        let unit = scan(
            Language::Java,
            "A.java",
            "class A {\n  @KafkaListener(topics = \"orders.created\")\n  public void on(OrderEvent event) throws IOException {\n    handle(event);\n  }\n}\n",
        );
        let at = unit.code.find(")\n").unwrap() + 1;
        let parts = function_after(&unit, at).unwrap();
        assert_eq!(parts.name, "on");
        assert_eq!(unit.text(parts.params.clone()), "OrderEvent event");
        assert!(unit.text(parts.body).contains("handle(event)"));
    }
}
