// crates/contract-gate-core/src/extract/golang.rs
// ============================================================================
// Module: Contract Gate Go Adapter
// Description: Go site recognition.
// Purpose: Recognize net/http clients, net/http/chi/gorilla/gin/echo routes,
//          tagged structs, and `testing` tests with testify assertions.
// Dependencies: regex, crate::core, crate::extract
// ============================================================================

//! ## Overview
//! Go requests are usually built in two steps (`http.NewRequest` then
//! `client.Do`), so the request site carries method, URL, and body while
//! decode targets after the call become response roots. Handlers decode
//! into locals; the local's declared type is the request model.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::manifest::HttpMethod;
use crate::core::observation::Assertion;
use crate::core::observation::AssertionDepth;
use crate::core::observation::BoundarySide;
use crate::core::observation::ModelField;
use crate::core::observation::ModelObservation;
use crate::core::source::Language;
use crate::extract::access::BodyRoot;
use crate::extract::binding::path_of;
use crate::extract::binding::split_method_pattern;
use crate::extract::kinds::compile;
use crate::extract::kinds::kind_from_type;
use crate::extract::kinds::status_code_of;
use crate::extract::scan::ScannedUnit;
use crate::extract::scan::is_ident_byte;
use crate::extract::shapes::assignment_rhs;
use crate::extract::sites::ClientCall;
use crate::extract::sites::FunctionParts;
use crate::extract::sites::Param;
use crate::extract::sites::Recognizer;
use crate::extract::sites::RouteHandler;
use crate::extract::sites::SendSite;
use crate::extract::sites::TestCase;
use crate::extract::sites::assertion;
use crate::extract::sites::decode_roots;
use crate::extract::sites::function_after;
use crate::extract::sites::headers_in;
use crate::extract::sites::is_status_subject;
use crate::extract::sites::response_locals;
use crate::extract::sites::scope_of;

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// `http.NewRequest` and `http.NewRequestWithContext`.
static NEW_REQUEST: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\bhttp\.NewRequest(WithContext)?\("));

/// Shorthand client calls (`http.Get`, `client.Post`).
static SHORTHAND_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b((?:\w+\.)?(?:http|[cC]lient|httpClient|HTTPClient|DefaultClient))\.(Get|Post|Head)\(")
});

/// Router registrations by method name.
static ROUTE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"\b(\w+)\.(Get|Post|Put|Patch|Delete|Head|Options|GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\(\s*"([^"]*)""#,
    )
});

/// `HandleFunc` / `Handle` registrations.
static HANDLE_FUNC: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"\b(\w+)\.(?:HandleFunc|Handle)\(\s*"([^"]*)""#));

/// gorilla `.Methods("POST")` chained after a registration.
static METHODS_CHAIN: LazyLock<Regex> = LazyLock::new(|| compile(r#"^\s*\.Methods\(\s*"(\w+)""#));

/// chi `r.Route("/prefix", func(r chi.Router) { ... })`.
static ROUTE_GROUP: LazyLock<Regex> = LazyLock::new(|| compile(r#"\b\w+\.Route\(\s*"([^"]*)""#));

/// gin/echo groups (`api := r.Group("/api")`).
static GROUP_DECL: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"\b(\w+)\s*:?=\s*(\w+)\.Group\(\s*"([^"]*)""#));

/// Framework bind calls (`c.ShouldBindJSON(&req)`).
static BIND_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\.(?:ShouldBindJSON|BindJSON|ShouldBind|Bind|ShouldBindWith|BodyParser)\(\s*&?(\w+)")
});

/// `w.WriteHeader(N)`.
static WRITE_HEADER: LazyLock<Regex> = LazyLock::new(|| compile(r"\.WriteHeader\(\s*([^()]+?)\s*\)"));

/// `json.NewEncoder(w).Encode(x)`.
static ENCODE: LazyLock<Regex> = LazyLock::new(|| compile(r"\bjson\.NewEncoder\(\s*\w+\s*\)\.Encode\("));

/// `http.Error(w, msg, N)`.
static HTTP_ERROR: LazyLock<Regex> = LazyLock::new(|| compile(r"\bhttp\.Error\("));

/// gin/echo/fiber JSON responses with a status argument.
static CONTEXT_JSON: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b\w+\.(?:JSON|IndentedJSON|PureJSON|AbortWithStatusJSON|JSONPretty)\(")
});

/// gin/echo status-only responses.
static CONTEXT_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b\w+\.(?:Status|NoContent|AbortWithStatus|SendStatus)\(\s*([^()]+?)\s*\)")
});

/// chi render helpers.
static RENDER_JSON: LazyLock<Regex> = LazyLock::new(|| compile(r"\brender\.JSON\("));

/// Struct declarations.
static STRUCT_DECL: LazyLock<Regex> = LazyLock::new(|| compile(r"\btype\s+([A-Za-z_]\w*)\s+struct\s*\{"));

/// Struct field line: names, type, optional tag.
static STRUCT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^\s*([A-Za-z_]\w*(?:\s*,\s*[A-Za-z_]\w*)*)\s+([^\s`]+(?:\s+[^\s`]+)*?)\s*(?:`([^`]*)`)?\s*$")
});

/// `json:"name,omitempty"` tag.
static JSON_TAG: LazyLock<Regex> = LazyLock::new(|| compile(r#"json:"([^"]*)""#));

/// Test functions.
static TEST_FUNC: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\bfunc\s+(Test\w+)\s*\(\s*\w+\s+\*testing\.T\s*\)"));

/// testify assertions.
static TESTIFY: LazyLock<Regex> = LazyLock::new(|| compile(r"\b(?:assert|require)\.(\w+)\("));

/// Manual comparisons guarding a test failure.
static MANUAL_CHECK: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\bif\s+([^{;]+?)\s*(==|!=)\s*([^{;]+?)\s*\{"));

/// Failure calls inside a manual check.
static TEST_FAILURE: LazyLock<Regex> = LazyLock::new(|| compile(r"\bt\.(?:Error|Errorf|Fatal|Fatalf|Fail|FailNow)\b"));

/// testify assertions that only check presence or truthiness.
const SHALLOW_TESTIFY: &[&str] = &["NotNil", "NotEmpty", "True", "NotZero", "Contains", "IsType"];

/// testify assertions whose subject is the second argument after `t`.
const EXPECTED_FIRST: &[&str] = &["Equal", "EqualValues", "Exactly", "JSONEq", "NotEqual", "ElementsMatch", "Len"];

/// Receivers that look like routers but are clients or packages.
const NON_ROUTERS: &[&str] = &["http", "client", "Client", "httpClient", "strings", "os", "url", "json"];

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Go recognizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoAdapter;

impl Recognizer for GoAdapter {
    fn language(&self) -> Language {
        Language::Go
    }

    fn is_test_path(&self, path: &str) -> bool {
        path.ends_with("_test.go")
    }

    fn client_calls(&self, unit: &ScannedUnit) -> Vec<ClientCall> {
        let mut calls = Vec::new();
        for captures in NEW_REQUEST.captures_iter(&unit.code) {
            let Some(all) = captures.get(0) else {
                continue;
            };
            if unit.in_string(all.start()) {
                continue;
            }
            let open = all.end() - 1;
            let Some(close) = unit.closing(open) else {
                continue;
            };
            let args = unit.call_args(open);
            let skip = usize::from(captures.get(1).is_some());
            let scope = scope_of(unit, all.start());
            let mut call = ClientCall::new(all.start(), close + 1, "http.NewRequest");
            call.method = args.get(skip).and_then(|method| method_of(unit.text(method.clone())));
            call.path = args.get(skip + 1).and_then(|url| path_of(unit, url.clone(), scope.clone()));
            call.body = args.get(skip + 2).and_then(|body| unwrap_reader(unit, body.clone()));
            calls.push(call);
        }
        for captures in SHORTHAND_CALL.captures_iter(&unit.code) {
            let (Some(all), Some(receiver), Some(verb)) = (captures.get(0), captures.get(1), captures.get(2)) else {
                continue;
            };
            if unit.in_string(all.start()) {
                continue;
            }
            let open = all.end() - 1;
            let Some(close) = unit.closing(open) else {
                continue;
            };
            let args = unit.call_args(open);
            let scope = scope_of(unit, all.start());
            let mut call = ClientCall::new(all.start(), close + 1, format!("{}.{}", receiver.as_str(), verb.as_str()));
            call.method = HttpMethod::parse(verb.as_str());
            call.path = args.first().and_then(|url| path_of(unit, url.clone(), scope.clone()));
            if call.method == Some(HttpMethod::Post) {
                call.body = args.get(2).and_then(|body| unwrap_reader(unit, body.clone()));
            }
            calls.push(call);
        }
        calls.sort_by_key(|call| call.start);
        let starts: Vec<usize> = calls.iter().map(|call| call.start).collect();
        for (index, call) in calls.iter_mut().enumerate() {
            let scope = scope_of(unit, call.start);
            let until = starts.get(index + 1).copied().filter(|next| scope.contains(next)).unwrap_or(scope.end);
            call.headers = headers_in(unit, call.start .. until);
            call.roots = decode_roots(unit, call.end .. until);
        }
        calls
    }

    fn routes(&self, unit: &ScannedUnit) -> Vec<RouteHandler> {
        let groups = group_prefixes(unit);
        let mut handlers = Vec::new();
        for captures in ROUTE_CALL.captures_iter(&unit.code) {
            let (Some(all), Some(receiver), Some(verb), Some(path)) =
                (captures.get(0), captures.get(1), captures.get(2), captures.get(3))
            else {
                continue;
            };
            if unit.in_string(all.start()) || NON_ROUTERS.contains(&receiver.as_str()) {
                continue;
            }
            let open = all.start() + receiver.as_str().len() + 1 + verb.as_str().len();
            let prefix = route_prefix(unit, all.start(), groups.get(receiver.as_str()).map_or("", String::as_str));
            let path = join_path(&prefix, path.as_str());
            if let Some(handler) = self.handler(unit, all.start(), open, HttpMethod::parse(verb.as_str()), path) {
                handlers.push(handler);
            }
        }
        for captures in HANDLE_FUNC.captures_iter(&unit.code) {
            let (Some(all), Some(receiver), Some(pattern)) = (captures.get(0), captures.get(1), captures.get(2)) else {
                continue;
            };
            if unit.in_string(all.start()) {
                continue;
            }
            let Some(open) = all.as_str().find('(').map(|index| all.start() + index) else {
                continue;
            };
            let (mut method, path) = split_method_pattern(pattern.as_str());
            if method.is_none()
                && let Some(close) = unit.closing(open)
                && let Some(chain) = METHODS_CHAIN.captures(unit.text(close + 1 .. unit.code.len()))
            {
                method = chain.get(1).and_then(|verb| HttpMethod::parse(verb.as_str()));
            }
            let prefix = route_prefix(unit, all.start(), groups.get(receiver.as_str()).map_or("", String::as_str));
            let path = join_path(&prefix, &path);
            if let Some(handler) = self.handler(unit, all.start(), open, method, path) {
                handlers.push(handler);
            }
        }
        handlers.sort_by_key(|handler| handler.start);
        handlers
    }

    fn send_sites(&self, unit: &ScannedUnit, route: &RouteHandler) -> Vec<SendSite> {
        let body = route.body.clone();
        let text = unit.text(body.clone());
        let mut sites = Vec::new();
        let encodes: Vec<(usize, Option<Range<usize>>)> = ENCODE
            .find_iter(text)
            .map(|found| {
                let open = body.start + found.end() - 1;
                (body.start + found.start(), unit.call_args(open).into_iter().next())
            })
            .collect();
        let headers: Vec<(usize, Option<u16>)> = WRITE_HEADER
            .captures_iter(text)
            .filter_map(|captures| {
                let all = captures.get(0)?;
                Some((body.start + all.start(), captures.get(1).and_then(|status| status_code_of(status.as_str()))))
            })
            .collect();
        let mut paired = Vec::new();
        for (index, (at, status)) in headers.iter().enumerate() {
            let next_header = headers.get(index + 1).map_or(body.end, |(next, _)| *next);
            let block = innermost_block(unit, *at);
            let encode = encodes
                .iter()
                .find(|(encode_at, _)| *encode_at > *at && *encode_at < next_header && innermost_block(unit, *encode_at) == block);
            match encode {
                Some((encode_at, value)) => {
                    paired.push(*encode_at);
                    sites.push(SendSite {
                        at: *at,
                        status: *status,
                        body: value.clone(),
                    });
                }
                None => sites.push(SendSite {
                    at: *at,
                    status: *status,
                    body: None,
                }),
            }
        }
        for (at, value) in &encodes {
            if !paired.contains(at) {
                sites.push(SendSite {
                    at: *at,
                    status: None,
                    body: value.clone(),
                });
            }
        }
        for found in HTTP_ERROR.find_iter(text) {
            let open = body.start + found.end() - 1;
            let status = unit.call_args(open).get(2).and_then(|status| status_code_of(unit.text(status.clone())));
            sites.push(SendSite {
                at: body.start + found.start(),
                status,
                body: None,
            });
        }
        for found in CONTEXT_JSON.find_iter(text) {
            let at = body.start + found.start();
            if unit.in_string(at) || found.as_str().starts_with("render.") {
                continue;
            }
            let open = body.start + found.end() - 1;
            let args = unit.call_args(open);
            sites.push(SendSite {
                at,
                status: args.first().and_then(|status| status_code_of(unit.text(status.clone()))),
                body: args.get(1).cloned(),
            });
        }
        for captures in CONTEXT_STATUS.captures_iter(text) {
            let (Some(all), Some(status)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if all.as_str().starts_with("render.") {
                continue;
            }
            sites.push(SendSite {
                at: body.start + all.start(),
                status: status_code_of(status.as_str()),
                body: None,
            });
        }
        for found in RENDER_JSON.find_iter(text) {
            let open = body.start + found.end() - 1;
            sites.push(SendSite {
                at: body.start + found.start(),
                status: None,
                body: unit.call_args(open).get(2).cloned(),
            });
        }
        sites.sort_by_key(|site| site.at);
        sites.dedup_by_key(|site| site.at);
        sites
    }

    fn models(&self, unit: &ScannedUnit, side: BoundarySide) -> Vec<ModelObservation> {
        let mut models = Vec::new();
        for captures in STRUCT_DECL.captures_iter(&unit.code) {
            let (Some(all), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let open = all.end() - 1;
            let Some(close) = unit.closing(open) else {
                continue;
            };
            let fields = struct_fields(unit, open, close);
            if fields.is_empty() {
                continue;
            }
            models.push(ModelObservation {
                location: unit.location(name.start()),
                side,
                name: name.as_str().to_string(),
                fields,
                bindings: Vec::new(),
                ambiguous: Vec::new(),
            });
        }
        models
    }

    fn test_cases(&self, unit: &ScannedUnit) -> Vec<TestCase> {
        let mut cases = Vec::new();
        for captures in TEST_FUNC.captures_iter(&unit.code) {
            let (Some(all), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let Some(parts) = function_after(unit, all.start()) else {
                continue;
            };
            cases.push(TestCase {
                start: name.start(),
                name: name.as_str().to_string(),
                body: parts.body,
            });
        }
        cases
    }

    fn assertions(&self, unit: &ScannedUnit, body: Range<usize>) -> Vec<Assertion> {
        let responses = response_locals(unit, body.clone());
        let text = unit.text(body.clone());
        let mut found = Vec::new();
        for captures in TESTIFY.captures_iter(text) {
            let (Some(all), Some(method)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let method = method.as_str();
            let open = body.start + all.end() - 1;
            let args = unit.call_args(open);
            let subject_index = if EXPECTED_FIRST.contains(&method) { 2 } else { 1 };
            let Some(subject) = args.get(subject_index) else {
                continue;
            };
            let subject = unit.text(subject.clone()).trim().to_string();
            if is_status_subject(&subject, &responses) {
                continue;
            }
            let key = (method == "Contains").then(|| args.get(2).and_then(|key| unit.literal(key.clone()))).flatten();
            let depth = if SHALLOW_TESTIFY.contains(&method) { AssertionDepth::Shallow } else { AssertionDepth::Deep };
            found.push(assertion(unit, body.start + all.start(), &subject, depth, key));
        }
        for captures in MANUAL_CHECK.captures_iter(text) {
            let (Some(all), Some(left), Some(operator), Some(right)) =
                (captures.get(0), captures.get(1), captures.get(2), captures.get(3))
            else {
                continue;
            };
            let open = body.start + all.end() - 1;
            let Some(close) = unit.closing(open) else {
                continue;
            };
            if !TEST_FAILURE.is_match(unit.text(open .. close)) {
                continue;
            }
            let subject = left.as_str().trim();
            if subject == "err" || is_status_subject(subject, &responses) {
                continue;
            }
            let depth = if right.as_str().trim() == "nil" && operator.as_str() == "==" {
                AssertionDepth::Shallow
            } else if right.as_str().trim() == "nil" {
                continue;
            } else {
                AssertionDepth::Deep
            };
            found.push(assertion(unit, body.start + all.start(), subject, depth, None));
        }
        found.sort_by_key(|item| item.location.line);
        found
    }

    fn params(&self, unit: &ScannedUnit, range: Range<usize>) -> Vec<Param> {
        let mut params = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        for part in unit.split_top_level(range, b',') {
            let text = unit.text(part).trim();
            match text.split_once(char::is_whitespace) {
                Some((name, type_text)) => {
                    for name in pending.drain(..).chain(std::iter::once(name.to_string())) {
                        params.push(Param {
                            name,
                            type_text: type_text.trim().to_string(),
                            annotations: String::new(),
                        });
                    }
                }
                None => pending.push(text.to_string()),
            }
        }
        params
    }
}

impl GoAdapter {
    /// Builds a route handler for a registration whose `(` is at `open`.
    fn handler(
        &self,
        unit: &ScannedUnit,
        start: usize,
        open: usize,
        method: Option<HttpMethod>,
        path: String,
    ) -> Option<RouteHandler> {
        let parts = handler_function(unit, open)?;
        let mut handler = RouteHandler::new(start, method, path, parts.body.clone());
        let mut roots = decode_roots(unit, parts.body.clone());
        for captures in BIND_CALL.captures_iter(unit.text(parts.body.clone())) {
            if let Some(target) = captures.get(1) {
                roots.push(BodyRoot::new(target.as_str(), parts.body.start + target.end()));
            }
        }
        handler.request_model = roots.iter().find_map(|root| local_type(unit, &root.expr, parts.body.clone()));
        handler.request_roots = roots;
        Some(handler)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a Go method argument (`"POST"`, `http.MethodPost`).
fn method_of(text: &str) -> Option<HttpMethod> {
    let text = text.trim().trim_matches('"');
    let text = text.strip_prefix("http.").unwrap_or(text);
    HttpMethod::parse(text.strip_prefix("Method").unwrap_or(text))
}

/// Unwraps reader constructors around a request body.
fn unwrap_reader(unit: &ScannedUnit, body: Range<usize>) -> Option<Range<usize>> {
    let body = unit.trim(body);
    let text = unit.text(body.clone());
    if text == "nil" || text.is_empty() {
        return None;
    }
    for reader in ["bytes.NewBuffer(", "bytes.NewReader(", "strings.NewReader(", "bytes.NewBufferString("] {
        if text.starts_with(reader) {
            let open = body.start + reader.len() - 1;
            let inner = unit.call_args(open).into_iter().next()?;
            let inner_text = unit.text(inner.clone());
            if let Some(slice) = inner_text.strip_suffix("[:]") {
                return Some(inner.start .. inner.start + slice.len());
            }
            return Some(inner);
        }
    }
    Some(body)
}

/// Resolves the function handling a registration.
fn handler_function(unit: &ScannedUnit, open: usize) -> Option<FunctionParts> {
    let last = unit.trim(unit.call_args(open).last().cloned()?);
    let text = unit.text(last.clone());
    let text = text.strip_prefix("http.HandlerFunc(").and_then(|inner| inner.strip_suffix(')')).unwrap_or(text);
    if !text.is_empty() && text.bytes().all(|byte| is_ident_byte(byte) || byte == b'.') {
        let name = text.rsplit('.').next().unwrap_or(text);
        let definition =
            Regex::new(&format!(r"\bfunc\s+(?:\([^)]*\)\s*)?{}\s*\(", regex::escape(name))).ok()?;
        let found = definition.find(&unit.code)?;
        return function_after(unit, found.start());
    }
    function_after(unit, last.start)
}

/// Returns the declared type of a local inside a function body.
fn local_type(unit: &ScannedUnit, name: &str, body: Range<usize>) -> Option<String> {
    if !name.bytes().all(is_ident_byte) {
        return None;
    }
    let declaration = Regex::new(&format!(r"\bvar\s+{}\s+\*?([\w.]+)", regex::escape(name))).ok()?;
    let text = unit.text(body.clone());
    if let Some(found) = declaration.captures(text).and_then(|captures| captures.get(1)) {
        return Some(found.as_str().to_string());
    }
    let rhs = assignment_rhs(unit, name, body.end, body)?;
    let rhs = unit.text(rhs).trim_start_matches('&');
    let type_name = rhs.split(['{', '(']).next()?.trim();
    (!type_name.is_empty() && type_name.bytes().all(|byte| is_ident_byte(byte) || byte == b'.'))
        .then(|| type_name.to_string())
}

/// Returns the innermost brace block containing `offset`.
fn innermost_block(unit: &ScannedUnit, offset: usize) -> Option<(usize, usize)> {
    unit.enclosing_braces(offset).into_iter().next()
}

/// Returns gin/echo group prefixes by group variable.
fn group_prefixes(unit: &ScannedUnit) -> BTreeMap<String, String> {
    let mut prefixes: BTreeMap<String, String> = BTreeMap::new();
    for captures in GROUP_DECL.captures_iter(&unit.code) {
        let (Some(name), Some(parent), Some(prefix)) = (captures.get(1), captures.get(2), captures.get(3)) else {
            continue;
        };
        let parent_prefix = prefixes.get(parent.as_str()).cloned().unwrap_or_default();
        prefixes.insert(name.as_str().to_string(), join_path(&parent_prefix, prefix.as_str()));
    }
    prefixes
}

/// Returns the prefix for a registration: enclosing chi `Route` blocks,
/// outermost first, then the receiver's group prefix.
fn route_prefix(unit: &ScannedUnit, at: usize, group: &str) -> String {
    let mut prefix = String::new();
    for captures in ROUTE_GROUP.captures_iter(&unit.code) {
        let (Some(all), Some(segment)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Some(open) = unit.text(all.start() .. all.end()).find('(').map(|index| all.start() + index) else {
            continue;
        };
        if unit.closing(open).is_some_and(|close| open < at && at < close) {
            prefix = join_path(&prefix, segment.as_str());
        }
    }
    join_path(&prefix, group)
}

/// Joins a prefix with a route path.
fn join_path(prefix: &str, path: &str) -> String {
    let joined: Vec<&str> =
        prefix.split('/').chain(path.split('/')).filter(|segment| !segment.is_empty()).collect();
    format!("/{}", joined.join("/"))
}

/// Collects exported fields declared directly inside a struct body.
fn struct_fields(unit: &ScannedUnit, open: usize, close: usize) -> Vec<ModelField> {
    let mut fields = Vec::new();
    let first = unit.line_of(open) + 1;
    let last = unit.line_of(close);
    for line in first ..= last {
        let range = unit.line_range(line);
        let line_start = range.start;
        if innermost_block(unit, line_start) != Some((open, close)) || line_start >= close {
            continue;
        }
        let end = range.end.min(close);
        let text = unit.text(line_start .. end);
        let Some(captures) = STRUCT_FIELD.captures(text) else {
            continue;
        };
        let (Some(names), Some(declared)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let tag = captures
            .get(3)
            .and_then(|tag| JSON_TAG.captures(tag.as_str()))
            .and_then(|json| json.get(1))
            .map(|json| json.as_str().to_string());
        let (tag_name, omitempty) = match tag.as_deref() {
            Some("-") => continue,
            Some(tag) => {
                let mut parts = tag.split(',');
                let name = parts.next().unwrap_or_default().to_string();
                (Some(name).filter(|name| !name.is_empty()), parts.any(|option| option == "omitempty"))
            }
            None => (None, false),
        };
        let (kind, nullable) = kind_from_type(Language::Go, declared.as_str());
        for name in names.as_str().split(',').map(str::trim) {
            if !name.chars().next().is_some_and(char::is_uppercase) {
                continue;
            }
            fields.push(ModelField {
                declared_name: name.to_string(),
                wire_name: tag_name.clone().unwrap_or_else(|| name.to_string()),
                explicit_wire_name: tag_name.is_some(),
                kind,
                optional: nullable || omitempty,
                location: unit.location(line_start + names.start()),
            });
        }
    }
    fields
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

    fn scan(path: &str, text: &str) -> ScannedUnit {
        let is_test = GoAdapter.is_test_path(path);
        scan_text(path, Language::Go, is_test, text.to_string()).unwrap()
    }

    #[test]
    fn new_request_calls_carry_method_body_and_decode_targets() {
        let unit = scan(
            "client/orders.go",
            "func Create(c *http.Client, order Order) (*Created, error) {\n\tpayload, _ := json.Marshal(order)\n\treq, err := http.NewRequest(http.MethodPost, baseURL+\"/orders\", bytes.NewBuffer(payload))\n\treq.Header.Set(\"Authorization\", token)\n\tresp, err := c.Do(req)\n\tvar out Created\n\tjson.NewDecoder(resp.Body).Decode(&out)\n\treturn &out, err\n}\n",
        );
        let calls = GoAdapter.client_calls(&unit);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Some(HttpMethod::Post));
        assert_eq!(calls[0].path.as_deref(), Some("{}/orders"));
        assert_eq!(unit.text(calls[0].body.clone().unwrap()), "payload");
        assert_eq!(calls[0].headers[0].name, "Authorization");
        assert_eq!(calls[0].roots[0].expr, "out");
    }

    #[test]
    fn handle_func_patterns_and_named_handlers_resolve() {
        let unit = scan(
            "service/routes.go",
            "func Register(mux *http.ServeMux) {\n\tmux.HandleFunc(\"POST /orders\", createOrder)\n}\n\nfunc createOrder(w http.ResponseWriter, r *http.Request) {\n\tvar req CreateOrder\n\tif err := json.NewDecoder(r.Body).Decode(&req); err != nil {\n\t\thttp.Error(w, \"bad\", http.StatusBadRequest)\n\t\treturn\n\t}\n\tw.WriteHeader(http.StatusCreated)\n\tjson.NewEncoder(w).Encode(map[string]any{\"order_id\": id})\n}\n",
        );
        let routes = GoAdapter.routes(&unit);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].method, Some(HttpMethod::Post));
        assert_eq!(routes[0].path, "/orders");
        assert_eq!(routes[0].request_model.as_deref(), Some("CreateOrder"));
        let sites = GoAdapter.send_sites(&unit, &routes[0]);
        let statuses: Vec<Option<u16>> = sites.iter().map(|site| site.status).collect();
        assert_eq!(statuses, vec![Some(400), Some(201)]);
        assert!(sites[1].body.is_some());
    }

    #[test]
    fn gin_groups_prefix_routes_and_json_sends() {
        let unit = scan(
            "service/gin.go",
            "func Setup(r *gin.Engine) {\n\tapi := r.Group(\"/api\")\n\tapi.GET(\"/orders/:id\", func(c *gin.Context) {\n\t\tc.JSON(http.StatusOK, gin.H{\"order_id\": c.Param(\"id\")})\n\t})\n}\n",
        );
        let routes = GoAdapter.routes(&unit);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/api/orders/:id");
        let sites = GoAdapter.send_sites(&unit, &routes[0]);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].status, Some(200));
    }

    #[test]
    fn struct_tags_drive_wire_names_and_optionality() {
        let unit = scan(
            "client/models.go",
            "type Order struct {\n\tID    string  `json:\"order_id\"`\n\tStock *int    `json:\"stock,omitempty\"`\n\tNote  string  `json:\"-\"`\n\tinternal int\n}\n",
        );
        let models = GoAdapter.models(&unit, BoundarySide::Consumer);
        assert_eq!(models.len(), 1);
        let names: Vec<&str> = models[0].fields.iter().map(|field| field.wire_name.as_str()).collect();
        assert_eq!(names, vec!["order_id", "stock"]);
        assert!(models[0].fields[1].optional);
        assert!(!models[0].fields[0].optional);
    }

    #[test]
    fn testify_and_manual_checks_are_classified() {
        let unit = scan(
            "service/orders_test.go",
            "func TestGetOrder(t *testing.T) {\n\tassert.Equal(t, 200, resp.StatusCode)\n\tassert.NotNil(t, body.OrderID)\n\tassert.Equal(t, \"pending\", body.Status)\n\tif body.Total != 10 {\n\t\tt.Fatalf(\"total\")\n\t}\n}\n",
        );
        let cases = GoAdapter.test_cases(&unit);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "TestGetOrder");
        let found = GoAdapter.assertions(&unit, cases[0].body.clone());
        let depths: Vec<AssertionDepth> = found.iter().map(|item| item.depth).collect();
        assert_eq!(depths, vec![AssertionDepth::Shallow, AssertionDepth::Deep, AssertionDepth::Deep]);
    }
}
