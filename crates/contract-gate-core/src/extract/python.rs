// crates/contract-gate-core/src/extract/python.rs
// ============================================================================
// Module: Contract Gate Python Adapter
// Description: Python site recognition.
// Purpose: Recognize requests/httpx/aiohttp clients, FastAPI and Flask routes,
//          pydantic/dataclass/TypedDict models, and pytest/unittest tests.
// Dependencies: regex, crate::core, crate::extract
// ============================================================================

//! ## Overview
//! Python recognition follows indentation: decorated handlers and test
//! functions are `def` blocks, models are `class` blocks whose annotated
//! attributes are fields. Client receivers are the `requests`/`httpx`
//! modules plus sessions and clients created from them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
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
use crate::extract::kinds::compile;
use crate::extract::kinds::kind_from_type;
use crate::extract::kinds::status_code_of;
use crate::extract::scan::ScannedUnit;
use crate::extract::scan::is_ident_byte;
use crate::extract::shapes::assignment_rhs;
use crate::extract::sites::ClientCall;
use crate::extract::sites::Param;
use crate::extract::sites::Recognizer;
use crate::extract::sites::ResultBinding;
use crate::extract::sites::RouteHandler;
use crate::extract::sites::SendSite;
use crate::extract::sites::TestCase;
use crate::extract::sites::assertion;
use crate::extract::sites::function_after;
use crate::extract::sites::headers_in;
use crate::extract::sites::is_status_subject;
use crate::extract::sites::keyword_arg;
use crate::extract::sites::positional_args;
use crate::extract::sites::response_locals;
use crate::extract::sites::result_binding;
use crate::extract::sites::scope_of;

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// Method calls on a named receiver.
static CLIENT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"((?:self\.)?[A-Za-z_]\w*)\.(get|post|put|patch|delete|head|options|request)\(")
});

/// Sessions and clients created from a client library.
static CLIENT_FACTORY: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?:((?:self\.)?[A-Za-z_]\w*)\s*(?::[^=\n]+)?=\s*(?:requests\.Session|httpx\.(?:Async)?Client|aiohttp\.ClientSession)\(|(?:requests\.Session|httpx\.(?:Async)?Client|aiohttp\.ClientSession)\([^)]*\)\s+as\s+([A-Za-z_]\w*))",
    )
});

/// Context-managed response binding (`as resp`).
static AS_BINDING: LazyLock<Regex> = LazyLock::new(|| compile(r"^\s*as\s+([A-Za-z_]\w*)"));

/// FastAPI-style method decorators.
static METHOD_DECORATOR: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"@([A-Za-z_]\w*)\.(get|post|put|patch|delete|head|options)\(\s*["']([^"']*)["']"#)
});

/// Flask route decorators.
static ROUTE_DECORATOR: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"@([A-Za-z_]\w*)\.route\(\s*["']([^"']*)["']"#));

/// Router prefixes (`APIRouter(prefix=...)`, `Blueprint(..., url_prefix=...)`).
static ROUTER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"([A-Za-z_]\w*)\s*=\s*(?:APIRouter|Blueprint)\([^)]*?(?:url_)?prefix\s*=\s*["']([^"']+)["']"#)
});

/// Router inclusion with a prefix.
static INCLUDE_ROUTER: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"\.(?:include_router|register_blueprint)\(\s*(?:\w+\.)?([A-Za-z_]\w*)\s*,[^)]*?(?:url_)?prefix\s*=\s*["']([^"']+)["']"#)
});

/// Return statements.
static RETURN: LazyLock<Regex> = LazyLock::new(|| compile(r"\breturn\b"));

/// Raised HTTP errors.
static RAISE_HTTP: LazyLock<Regex> = LazyLock::new(|| compile(r"\braise\s+HTTPException\("));

/// Flask `abort`.
static ABORT: LazyLock<Regex> = LazyLock::new(|| compile(r"\babort\(\s*([^,()]+)"));

/// Response constructors with explicit content and status.
const RESPONSE_CONSTRUCTORS: &[&str] =
    &["JSONResponse(", "ORJSONResponse(", "UJSONResponse(", "Response(", "make_response("];

/// Class declarations.
static CLASS_DECL: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?m)^([ \t]*)class\s+([A-Za-z_]\w*)\s*(?:\(([^)]*)\))?\s*:"));

/// Annotated attribute.
static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[ \t]+([A-Za-z_]\w*)\s*:\s*([^=]+?)\s*(?:=\s*(.+?))?\s*$"));

/// Field alias (`Field(alias="x")`).
static FIELD_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?:Field|field)\([^)]*?\balias\s*=\s*["']([^"']+)["']"#));

/// Test function definitions.
static TEST_DEF: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?m)^[ \t]*(?:async\s+)?def\s+(test\w*)\s*\("));

/// Bare `assert` statements.
static ASSERT_STMT: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^[ \t]*assert\s+"));

/// unittest assertion methods.
static UNITTEST_ASSERT: LazyLock<Regex> = LazyLock::new(|| compile(r"\bself\.(assert\w+)\("));

/// Comparison operators in an assertion.
static COMPARISON: LazyLock<Regex> = LazyLock::new(|| compile(r"==|!=|>=|<=|\s>\s|\s<\s|\bisinstance\(|\bnot\s+in\b"));

/// Membership test (`"k" in x`).
static MEMBERSHIP: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"^["']([\w\-]+)["']\s+in\s+(.+)$"#));

/// Receivers treated as clients without a visible factory.
const DEFAULT_CLIENTS: &[&str] =
    &["requests", "httpx", "session", "client", "http", "self.session", "self.client", "self._client", "self._session", "self.http"];

/// Parameter types that are framework plumbing, not bodies.
const PLUMBING_TYPES: &[&str] = &["Request", "Response", "BackgroundTasks", "Session", "AsyncSession", "HTTPConnection"];

/// unittest assertions that only check presence or truthiness.
const SHALLOW_UNITTEST: &[&str] = &["assertIsNotNone", "assertTrue", "assertIn", "assertIsInstance"];

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Python recognizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonAdapter;

impl Recognizer for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn is_test_path(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        (name.starts_with("test_") && name.ends_with(".py")) || name.ends_with("_test.py")
    }

    fn client_calls(&self, unit: &ScannedUnit) -> Vec<ClientCall> {
        let clients = client_receivers(unit);
        let mut calls = Vec::new();
        for captures in CLIENT_CALL.captures_iter(&unit.code) {
            let (Some(all), Some(receiver), Some(verb)) = (captures.get(0), captures.get(1), captures.get(2)) else {
                continue;
            };
            let start = all.start();
            if unit.in_string(start)
                || !clients.contains(receiver.as_str())
                || (start > 0 && unit.byte(start - 1).is_some_and(|byte| byte == b'.' || byte == b'@' || is_ident_byte(byte)))
            {
                continue;
            }
            let open = all.end() - 1;
            if let Some(call) = client_call(unit, start, open, receiver.as_str(), verb.as_str()) {
                calls.push(call);
            }
        }
        calls
    }

    fn routes(&self, unit: &ScannedUnit) -> Vec<RouteHandler> {
        let prefixes = router_prefixes(unit);
        let mut handlers = Vec::new();
        for captures in METHOD_DECORATOR.captures_iter(&unit.code) {
            let (Some(all), Some(router), Some(verb), Some(path)) =
                (captures.get(0), captures.get(1), captures.get(2), captures.get(3))
            else {
                continue;
            };
            let open = all.start() + 1 + router.as_str().len() + 1 + verb.as_str().len();
            let path = join_path(prefixes.get(router.as_str()).map_or("", String::as_str), path.as_str());
            if let Some(handler) = self.handler(unit, all.start(), open, HttpMethod::parse(verb.as_str()), path) {
                handlers.push(handler);
            }
        }
        for captures in ROUTE_DECORATOR.captures_iter(&unit.code) {
            let (Some(all), Some(router), Some(path)) = (captures.get(0), captures.get(1), captures.get(2)) else {
                continue;
            };
            let open = all.start() + 1 + router.as_str().len() + ".route".len();
            let path = join_path(prefixes.get(router.as_str()).map_or("", String::as_str), path.as_str());
            let args = unit.call_args(open);
            let methods: Vec<HttpMethod> = keyword_arg(unit, &args, "methods")
                .map(|list| unit.strings_in(list).iter().filter_map(|span| HttpMethod::parse(unit.span_content(span))).collect())
                .unwrap_or_default();
            let methods = if methods.is_empty() { vec![HttpMethod::Get] } else { methods };
            for method in methods {
                if let Some(handler) = self.handler(unit, all.start(), open, Some(method), path.clone()) {
                    handlers.push(handler);
                }
            }
        }
        handlers.sort_by_key(|handler| handler.start);
        handlers
    }

    fn send_sites(&self, unit: &ScannedUnit, route: &RouteHandler) -> Vec<SendSite> {
        let body = route.body.clone();
        let text = unit.text(body.clone());
        let mut sites = Vec::new();
        for found in RETURN.find_iter(text) {
            let at = body.start + found.start();
            if unit.in_string(at) || scope_of(unit, at) != body {
                continue;
            }
            let start = body.start + found.end();
            let expr = unit.trim(start .. unit.statement_end(start));
            if expr.is_empty() {
                continue;
            }
            sites.push(return_site(unit, at, expr));
        }
        for found in RAISE_HTTP.find_iter(text) {
            let open = body.start + found.end() - 1;
            let args = unit.call_args(open);
            let status = keyword_arg(unit, &args, "status_code")
                .or_else(|| positional_args(unit, &args).into_iter().next())
                .and_then(|status| status_code_of(unit.text(status)));
            sites.push(SendSite {
                at: body.start + found.start(),
                status,
                body: None,
            });
        }
        for captures in ABORT.captures_iter(text) {
            let (Some(all), Some(status)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            sites.push(SendSite {
                at: body.start + all.start(),
                status: status_code_of(status.as_str()),
                body: None,
            });
        }
        sites.sort_by_key(|site| site.at);
        sites
    }

    fn models(&self, unit: &ScannedUnit, side: BoundarySide) -> Vec<ModelObservation> {
        let mut models = Vec::new();
        for captures in CLASS_DECL.captures_iter(&unit.code) {
            let (Some(all), Some(name)) = (captures.get(0), captures.get(2)) else {
                continue;
            };
            let bases = captures.get(3).map_or("", |bases| bases.as_str());
            if ["Enum", "Exception", "Error", "Protocol", "TestCase"].iter().any(|base| bases.contains(base)) {
                continue;
            }
            let colon = all.end() - 1;
            let block = unit.python_block(all.start(), colon);
            let fields = class_fields(unit, block);
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
        for captures in TEST_DEF.captures_iter(&unit.code) {
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
        for statement in ASSERT_STMT.find_iter(text) {
            let start = body.start + statement.end();
            let end = unit.statement_end(start);
            let expr = unit.text(start .. end).trim();
            let expr = expr.split_once(", ").map_or(expr, |(condition, _)| condition).trim();
            if let Some(captures) = MEMBERSHIP.captures(expr) {
                let (Some(key), Some(subject)) = (captures.get(1), captures.get(2)) else {
                    continue;
                };
                found.push(assertion(unit, start, subject.as_str(), AssertionDepth::Shallow, Some(key.as_str().to_string())));
                continue;
            }
            if expr.ends_with("is not None") {
                let subject = expr.trim_end_matches("is not None").trim();
                if !is_status_subject(subject, &responses) {
                    found.push(assertion(unit, start, subject, AssertionDepth::Shallow, None));
                }
                continue;
            }
            if let Some(operator) = COMPARISON.find(expr) {
                let subject = expr[.. operator.start()].trim().trim_start_matches("isinstance(");
                let subject = subject.split(',').next().unwrap_or(subject).trim();
                if !subject.is_empty() && !is_status_subject(subject, &responses) {
                    found.push(assertion(unit, start, subject, AssertionDepth::Deep, None));
                }
                continue;
            }
            let subject = expr.trim_start_matches("not ").trim();
            if !subject.is_empty() && !is_status_subject(subject, &responses) {
                found.push(assertion(unit, start, subject, AssertionDepth::Shallow, None));
            }
        }
        for captures in UNITTEST_ASSERT.captures_iter(text) {
            let (Some(all), Some(method)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let open = body.start + all.end() - 1;
            let args = unit.call_args(open);
            let method = method.as_str();
            let (subject, key) = if method == "assertIn" {
                let key = args.first().and_then(|first| unit.literal(first.clone()));
                (args.get(1).cloned(), key)
            } else {
                (args.first().cloned(), None)
            };
            let Some(subject) = subject else {
                continue;
            };
            let subject = unit.text(subject).trim().to_string();
            if is_status_subject(&subject, &responses) {
                continue;
            }
            let depth = if SHALLOW_UNITTEST.contains(&method) { AssertionDepth::Shallow } else { AssertionDepth::Deep };
            found.push(assertion(unit, body.start + all.start(), &subject, depth, key));
        }
        found.sort_by_key(|item| item.location.line);
        found
    }

    fn params(&self, unit: &ScannedUnit, range: Range<usize>) -> Vec<Param> {
        let mut params = Vec::new();
        for part in unit.split_top_level(range, b',') {
            let text = unit.text(part).trim().trim_start_matches('*');
            let (head, _default) = text.split_once('=').map_or((text, ""), |(head, default)| (head, default));
            let (name, type_text) = head.split_once(':').map_or((head.trim(), ""), |(name, ty)| (name.trim(), ty.trim()));
            if name.is_empty() || !name.bytes().all(is_ident_byte) {
                continue;
            }
            params.push(Param {
                name: name.to_string(),
                type_text: type_text.to_string(),
                annotations: String::new(),
            });
        }
        params
    }
}

impl PythonAdapter {
    /// Builds a route handler for a decorator whose `(` is at `open`.
    fn handler(
        &self,
        unit: &ScannedUnit,
        start: usize,
        open: usize,
        method: Option<HttpMethod>,
        path: String,
    ) -> Option<RouteHandler> {
        let close = unit.closing(open)?;
        let parts = function_after(unit, close + 1)?;
        let args = unit.call_args(open);
        let mut handler = RouteHandler::new(start, method, path, parts.body.clone());
        handler.default_status =
            keyword_arg(unit, &args, "status_code").and_then(|status| status_code_of(unit.text(status)));
        handler.response_model = keyword_arg(unit, &args, "response_model")
            .map(|model| unit.text(model).to_string())
            .or_else(|| (!parts.signature_tail.is_empty()).then(|| parts.signature_tail.clone()));
        for param in self.params(unit, parts.params.clone()) {
            let type_name = param.type_text.as_str();
            if type_name == "Request" {
                handler.request_roots.push(BodyRoot::new(format!("{}.json()", param.name), parts.body.start));
            } else if type_name.chars().next().is_some_and(char::is_uppercase)
                && !PLUMBING_TYPES.contains(&type_name)
                && !type_name.starts_with("Annotated")
            {
                handler.request_roots.push(BodyRoot::new(param.name.clone(), parts.body.start));
                handler.request_model = Some(type_name.to_string());
            } else if type_name.starts_with("dict") || type_name.starts_with("Dict") {
                handler.request_roots.push(BodyRoot::new(param.name.clone(), parts.body.start));
            }
        }
        for expr in ["request.json", "request.get_json()", "request.get_json(force=True)", "request.get_json(silent=True)"] {
            handler.request_roots.push(BodyRoot::new(expr, parts.body.start));
        }
        Some(handler)
    }
}

// ============================================================================
// SECTION: Clients
// ============================================================================

/// Returns receivers that issue HTTP calls.
fn client_receivers(unit: &ScannedUnit) -> BTreeSet<String> {
    let mut clients: BTreeSet<String> = DEFAULT_CLIENTS.iter().map(ToString::to_string).collect();
    for captures in CLIENT_FACTORY.captures_iter(&unit.code) {
        if let Some(name) = captures.get(1).or_else(|| captures.get(2)) {
            clients.insert(name.as_str().to_string());
        }
    }
    clients
}

/// Builds a client call.
fn client_call(unit: &ScannedUnit, start: usize, open: usize, receiver: &str, verb: &str) -> Option<ClientCall> {
    let close = unit.closing(open)?;
    let scope = scope_of(unit, start);
    let args = unit.call_args(open);
    let positional = positional_args(unit, &args);
    let mut call = ClientCall::new(start, close + 1, format!("{receiver}.{verb}"));
    let (method, url) = if verb == "request" {
        let method = positional.first().and_then(|method| unit.literal(method.clone())).and_then(|method| HttpMethod::parse(&method));
        (method, positional.get(1).cloned())
    } else {
        (HttpMethod::parse(verb), positional.first().cloned())
    };
    call.method = method;
    call.path = url
        .or_else(|| keyword_arg(unit, &args, "url"))
        .and_then(|url| path_of(unit, url, scope.clone()));
    call.body = keyword_arg(unit, &args, "json").or_else(|| keyword_arg(unit, &args, "data"));
    call.headers = headers_in(unit, start .. close + 1);
    if let Some(headers) = keyword_arg(unit, &args, "headers") {
        let text = unit.text(headers.clone());
        if text.bytes().all(is_ident_byte)
            && let Some(rhs) = assignment_rhs(unit, text, headers.start, scope)
        {
            let line_start = unit.line_range(unit.line_of(rhs.start)).start;
            call.headers.extend(headers_in(unit, line_start .. rhs.end));
        }
    }
    call.headers.sort_by(|left, right| left.name.cmp(&right.name));
    call.headers.dedup_by(|left, right| left.name.eq_ignore_ascii_case(&right.name));
    call.roots = client_roots(unit, start, close);
    Some(call)
}

/// Returns expressions holding the decoded response body.
fn client_roots(unit: &ScannedUnit, start: usize, close: usize) -> Vec<BodyRoot> {
    let after = close + 1;
    let rest = unit.text(after .. unit.code.len());
    if let Some(name) = AS_BINDING.captures(rest).and_then(|captures| captures.get(1)) {
        return vec![BodyRoot::new(format!("{}.json()", name.as_str()), after)];
    }
    let follows_json = rest.trim_start().starts_with(".json()");
    match result_binding(unit, start) {
        Some(ResultBinding::Name(name)) if follows_json => vec![BodyRoot::new(name, after)],
        Some(ResultBinding::Name(name)) => vec![BodyRoot::new(format!("{name}.json()"), after)],
        _ => Vec::new(),
    }
}

// ============================================================================
// SECTION: Routes
// ============================================================================

/// Returns router prefixes by router name.
fn router_prefixes(unit: &ScannedUnit) -> BTreeMap<String, String> {
    let mut prefixes: BTreeMap<String, String> = BTreeMap::new();
    for captures in ROUTER_PREFIX.captures_iter(&unit.code) {
        if let (Some(name), Some(prefix)) = (captures.get(1), captures.get(2)) {
            prefixes.insert(name.as_str().to_string(), prefix.as_str().to_string());
        }
    }
    for captures in INCLUDE_ROUTER.captures_iter(&unit.code) {
        if let (Some(name), Some(prefix)) = (captures.get(1), captures.get(2)) {
            let existing = prefixes.get(name.as_str()).cloned().unwrap_or_default();
            prefixes.insert(name.as_str().to_string(), join_path(prefix.as_str(), &existing));
        }
    }
    prefixes
}

/// Joins a router prefix with a route path.
fn join_path(prefix: &str, path: &str) -> String {
    let joined: Vec<&str> =
        prefix.split('/').chain(path.split('/')).filter(|segment| !segment.is_empty()).collect();
    format!("/{}", joined.join("/"))
}

/// Interprets a `return` expression in a handler.
fn return_site(unit: &ScannedUnit, at: usize, expr: Range<usize>) -> SendSite {
    let parts = unit.split_top_level(expr.clone(), b',');
    if parts.len() == 2
        && let Some(status) = status_code_of(unit.text(parts[1].clone()))
    {
        let inner = return_site(unit, at, parts[0].clone());
        return SendSite {
            at,
            status: Some(status),
            body: inner.body,
        };
    }
    let text = unit.text(expr.clone());
    for constructor in RESPONSE_CONSTRUCTORS {
        if !text.starts_with(constructor) {
            continue;
        }
        let open = expr.start + constructor.len() - 1;
        let args = unit.call_args(open);
        let positional = positional_args(unit, &args);
        let content = keyword_arg(unit, &args, "content").or_else(|| positional.first().cloned());
        let status = keyword_arg(unit, &args, "status_code")
            .or_else(|| keyword_arg(unit, &args, "status"))
            .or_else(|| positional.get(1).cloned())
            .and_then(|status| status_code_of(unit.text(status)));
        return SendSite {
            at,
            status,
            body: content,
        };
    }
    SendSite {
        at,
        status: None,
        body: Some(expr),
    }
}

// ============================================================================
// SECTION: Models
// ============================================================================

/// Collects annotated attributes directly inside a class block.
fn class_fields(unit: &ScannedUnit, block: Range<usize>) -> Vec<ModelField> {
    let first_line = unit.line_of(block.start) + 1;
    let last_line = unit.line_of(block.end);
    let mut body_indent = None;
    let mut fields = Vec::new();
    for line in first_line ..= last_line {
        let text = unit.code_line(line);
        if text.trim().is_empty() {
            continue;
        }
        let indent = unit.indent_of(line);
        let expected = *body_indent.get_or_insert(indent);
        if indent != expected {
            continue;
        }
        let Some(captures) = ATTRIBUTE.captures(text) else {
            continue;
        };
        let (Some(name), Some(declared)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let name_text = name.as_str();
        if name_text.starts_with('_') || name_text == "model_config" {
            continue;
        }
        let default = captures.get(3).map_or("", |default| default.as_str());
        let (kind, nullable) = kind_from_type(Language::Python, declared.as_str());
        let alias = FIELD_ALIAS.captures(default).and_then(|captures| captures.get(1)).map(|alias| alias.as_str().to_string());
        let has_default = !default.is_empty() && !default.starts_with("Field(...") && !default.starts_with("Field(..");
        fields.push(ModelField {
            declared_name: name_text.to_string(),
            wire_name: alias.clone().unwrap_or_else(|| name_text.to_string()),
            explicit_wire_name: alias.is_some(),
            kind,
            optional: nullable || (has_default && !default.starts_with("Field(")) || default.contains("default=None"),
            location: unit.location(unit.line_range(line).start + name.start()),
        });
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
        let is_test = PythonAdapter.is_test_path(path);
        scan_text(path, Language::Python, is_test, text.to_string()).unwrap()
    }

    #[test]
    fn requests_calls_capture_body_and_roots() {
        let unit = scan(
            "client/orders.py",
            "def create(sku):\n    resp = requests.post(f\"{BASE}/orders\", json={\"sku\": sku}, headers={\"Authorization\": token})\n    data = resp.json()\n    return data[\"order_id\"]\n",
        );
        let calls = PythonAdapter.client_calls(&unit);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Some(HttpMethod::Post));
        assert_eq!(calls[0].path.as_deref(), Some("{BASE}/orders"));
        assert_eq!(unit.text(calls[0].body.clone().unwrap()), "{\"sku\": sku}");
        assert_eq!(calls[0].headers[0].name, "Authorization");
        assert_eq!(calls[0].roots[0].expr, "resp.json()");
    }

    #[test]
    fn fastapi_routes_use_router_prefix_and_models() {
        let unit = scan(
            "service/api.py",
            "router = APIRouter(prefix=\"/orders\")\n\n@router.post(\"\", status_code=201, response_model=OrderOut)\nasync def create(order: OrderIn, db: Session = Depends(get_db)):\n    if not order.sku:\n        raise HTTPException(status_code=422, detail=\"sku\")\n    return {\"order_id\": 1, \"status\": \"pending\"}\n",
        );
        let routes = PythonAdapter.routes(&unit);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/orders");
        assert_eq!(routes[0].default_status, Some(201));
        assert_eq!(routes[0].request_model.as_deref(), Some("OrderIn"));
        assert_eq!(routes[0].response_model.as_deref(), Some("OrderOut"));
        let sites = PythonAdapter.send_sites(&unit, &routes[0]);
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].status, Some(422));
        assert!(sites[1].body.is_some());
    }

    #[test]
    fn flask_routes_expand_methods_and_status_tuples() {
        let unit = scan(
            "service/app.py",
            "@app.route(\"/orders/<int:order_id>\", methods=[\"GET\", \"DELETE\"])\ndef order(order_id):\n    return jsonify({\"order_id\": order_id}), 200\n",
        );
        let routes = PythonAdapter.routes(&unit);
        let methods: Vec<Option<HttpMethod>> = routes.iter().map(|route| route.method).collect();
        assert_eq!(methods, vec![Some(HttpMethod::Get), Some(HttpMethod::Delete)]);
        let sites = PythonAdapter.send_sites(&unit, &routes[0]);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].status, Some(200));
        assert_eq!(unit.text(sites[0].body.clone().unwrap()), "jsonify({\"order_id\": order_id})");
    }

    #[test]
    fn pydantic_models_honor_aliases_and_optionals() {
        let unit = scan(
            "client/models.py",
            "class Order(BaseModel):\n    order_id: str\n    stock: Optional[int] = None\n    total: float = Field(alias=\"totalAmount\")\n\n    def label(self) -> str:\n        return self.order_id\n",
        );
        let models = PythonAdapter.models(&unit, BoundarySide::Consumer);
        assert_eq!(models.len(), 1);
        let fields = &models[0].fields;
        assert_eq!(fields.len(), 3);
        assert!(fields[1].optional);
        assert_eq!(fields[2].wire_name, "totalAmount");
        assert!(fields[2].explicit_wire_name);
    }

    #[test]
    fn pytest_assertions_are_classified() {
        let unit = scan(
            "tests/test_orders.py",
            "def test_get_order(client):\n    resp = client.get(\"/orders/1\")\n    assert resp.status_code == 200\n    body = resp.json()\n    assert body[\"order_id\"]\n    assert \"status\" in body\n    assert body[\"total\"] == 10\n",
        );
        let cases = PythonAdapter.test_cases(&unit);
        assert_eq!(cases.len(), 1);
        let found = PythonAdapter.assertions(&unit, cases[0].body.clone());
        let summary: Vec<(Option<&str>, AssertionDepth)> =
            found.iter().map(|item| (item.target.as_deref(), item.depth)).collect();
        assert_eq!(
            summary,
            vec![
                (Some("order_id"), AssertionDepth::Shallow),
                (Some("status"), AssertionDepth::Shallow),
                (Some("total"), AssertionDepth::Deep),
            ]
        );
    }
}
