// crates/contract-gate-core/src/extract/java.rs
// ============================================================================
// Module: Contract Gate Java Adapter
// Description: Java site recognition.
// Purpose: Recognize RestTemplate/WebClient/RestClient calls, Spring MVC
//          controllers, records and Jackson-annotated classes, and JUnit tests.
// Dependencies: regex, crate::core, crate::extract
// ============================================================================

//! ## Overview
//! Spring routes are annotation driven: a class-level `@RequestMapping`
//! prefixes each `@XxxMapping` method, `@RequestBody` marks the request root
//! and model, and the declared return type is the response model. Fluent
//! clients are followed call by call along their chain.

// ============================================================================
// SECTION: Imports
// ============================================================================

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
use crate::extract::sites::FunctionParts;
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
use crate::extract::sites::response_locals;
use crate::extract::sites::result_binding;
use crate::extract::sites::scope_of;

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// RestTemplate operations.
static TEMPLATE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"\b(\w+)\.(getForObject|getForEntity|postForObject|postForEntity|patchForObject|put|delete|exchange)\(",
    )
});

/// WebClient / RestClient request chains.
static FLUENT_CALL: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(\w+)\s*\.\s*(get|post|put|patch|delete|method)\(([^()]*)\)\s*\.\s*uri\("));

/// Class-level `@RequestMapping`.
static CLASS_MAPPING: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"@RequestMapping\(([^)]*)\)\s*(?:@\w+(?:\([^)]*\))?\s*)*(?:public\s+|final\s+|abstract\s+)*class\s+\w+")
});

/// Method-level mapping annotations.
static METHOD_MAPPING: LazyLock<Regex> =
    LazyLock::new(|| compile(r"@(Get|Post|Put|Patch|Delete|Request)Mapping\b"));

/// `@ResponseStatus(HttpStatus.X)`.
static RESPONSE_STATUS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"@ResponseStatus\(\s*(?:(?:code|value)\s*=\s*)?([\w.]+)"));

/// `RequestMethod.POST`.
static REQUEST_METHOD: LazyLock<Regex> = LazyLock::new(|| compile(r"RequestMethod\.(\w+)"));

/// Leading modifiers and type parameters before a return type.
static MODIFIERS: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|private|protected|static|final|synchronized|abstract|default)\s+)*(?:<[^>]*>\s+)?")
});

/// `ResponseEntity` static builders.
static ENTITY_BUILDER: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"\bResponseEntity\s*\.\s*(status|ok|created|accepted|noContent|notFound|badRequest|unprocessableEntity|internalServerError)\(",
    )
});

/// `new ResponseEntity<>(body, status)`.
static ENTITY_NEW: LazyLock<Regex> = LazyLock::new(|| compile(r"\bnew\s+ResponseEntity\s*(?:<[^>]*>)?\("));

/// `throw new ResponseStatusException(HttpStatus.X, ...)`.
static STATUS_EXCEPTION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\bthrow\s+new\s+ResponseStatusException\("));

/// Return statements.
static RETURN: LazyLock<Regex> = LazyLock::new(|| compile(r"\breturn\b"));

/// Record declarations.
static RECORD_DECL: LazyLock<Regex> = LazyLock::new(|| compile(r"\brecord\s+([A-Z]\w*)\s*(?:<[^>]*>)?\("));

/// Class declarations.
static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| compile(r"\bclass\s+([A-Z]\w*)[^{;]*\{"));

/// Field declaration inside a class body.
static FIELD_DECL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^\s*((?:@[\w.]+(?:\([^)]*\))?\s+)*)((?:(?:private|protected|public|final|transient)\s+)*)([\w<>\[\],.?\s]+?)\s+(\w+)\s*(?:=[^;]*)?;")
});

/// `@JsonProperty("name")`.
static JSON_PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"@JsonProperty\(\s*(?:value\s*=\s*)?"([^"]+)""#));

/// JUnit test annotations.
static TEST_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| compile(r"@(?:Test|ParameterizedTest)\b"));

/// JUnit and AssertJ assertion entry points.
static ASSERT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(?:Assertions\.)?(assertEquals|assertNotNull|assertTrue|assertNotEquals|assertThat|assertSame)\(")
});

/// MockMvc `jsonPath("$.x")`.
static JSON_PATH: LazyLock<Regex> = LazyLock::new(|| compile(r#"\bjsonPath\(\s*"\$\.([\w.\[\]]+)""#));

/// Stereotype annotations marking non-model classes.
const STEREOTYPES: &[&str] =
    &["@RestController", "@Controller", "@Service", "@Component", "@Repository", "@Configuration", "@SpringBootApplication"];

/// AssertJ matchers that only check presence or truthiness.
const SHALLOW_MATCHERS: &[&str] = &["isNotNull", "isTrue", "isNotEmpty", "containsKey", "isInstanceOf", "hasFieldOrProperty"];

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Java recognizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaAdapter;

impl Recognizer for JavaAdapter {
    fn language(&self) -> Language {
        Language::Java
    }

    fn is_test_path(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        name.ends_with("Test.java") || name.ends_with("Tests.java") || name.ends_with("IT.java") || path.contains("src/test/")
    }

    fn client_calls(&self, unit: &ScannedUnit) -> Vec<ClientCall> {
        let mut calls = Vec::new();
        for captures in TEMPLATE_CALL.captures_iter(&unit.code) {
            let (Some(all), Some(receiver), Some(verb)) = (captures.get(0), captures.get(1), captures.get(2)) else {
                continue;
            };
            let verb = verb.as_str();
            let generic = matches!(verb, "put" | "delete" | "exchange");
            if unit.in_string(all.start()) || (generic && !receiver.as_str().to_ascii_lowercase().contains("template")) {
                continue;
            }
            let open = all.end() - 1;
            if let Some(call) = template_call(unit, all.start(), open, receiver.as_str(), verb) {
                calls.push(call);
            }
        }
        for captures in FLUENT_CALL.captures_iter(&unit.code) {
            let (Some(all), Some(receiver), Some(verb)) = (captures.get(0), captures.get(1), captures.get(2)) else {
                continue;
            };
            if unit.in_string(all.start()) {
                continue;
            }
            let method = if verb.as_str() == "method" {
                captures.get(3).and_then(|arg| arg.as_str().rsplit('.').next().and_then(HttpMethod::parse))
            } else {
                HttpMethod::parse(verb.as_str())
            };
            let open = all.end() - 1;
            if let Some(call) = fluent_call(unit, all.start(), open, receiver.as_str(), method) {
                calls.push(call);
            }
        }
        calls.sort_by_key(|call| call.start);
        calls
    }

    fn routes(&self, unit: &ScannedUnit) -> Vec<RouteHandler> {
        let prefixes: Vec<(usize, String)> = CLASS_MAPPING
            .captures_iter(&unit.code)
            .filter_map(|captures| {
                let all = captures.get(0)?;
                let args = captures.get(1)?;
                Some((all.start(), mapping_path(unit, args.start() .. args.end()).unwrap_or_default()))
            })
            .collect();
        let mut handlers = Vec::new();
        for captures in METHOD_MAPPING.captures_iter(&unit.code) {
            let (Some(all), Some(kind)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if unit.in_string(all.start()) || prefixes.iter().any(|(at, _)| *at == all.start()) {
                continue;
            }
            let (args, after) = match unit.next_non_ws(all.end()) {
                Some(open) if unit.byte(open) == Some(b'(') => match unit.closing(open) {
                    Some(close) => (Some(open + 1 .. close), close + 1),
                    None => continue,
                },
                _ => (None, all.end()),
            };
            let method = if kind.as_str() == "Request" {
                args.clone()
                    .and_then(|args| REQUEST_METHOD.captures(unit.text(args)).and_then(|found| found.get(1)))
                    .and_then(|verb| HttpMethod::parse(verb.as_str()))
            } else {
                HttpMethod::parse(kind.as_str())
            };
            let Some(parts) = function_after(unit, after) else {
                continue;
            };
            let prefix = prefixes
                .iter()
                .rev()
                .find(|(at, _)| *at < all.start())
                .map_or("", |(_, prefix)| prefix.as_str());
            let path = args.and_then(|args| mapping_path(unit, args)).unwrap_or_default();
            handlers.push(self.handler(unit, all.start(), method, join_path(prefix, &path), &parts));
        }
        handlers.sort_by_key(|handler| handler.start);
        handlers
    }

    fn send_sites(&self, unit: &ScannedUnit, route: &RouteHandler) -> Vec<SendSite> {
        let body = route.body.clone();
        let text = unit.text(body.clone());
        let mut sites = Vec::new();
        for captures in ENTITY_BUILDER.captures_iter(text) {
            let (Some(all), Some(builder)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let open = body.start + all.end() - 1;
            let Some(close) = unit.closing(open) else {
                continue;
            };
            let args = unit.call_args(open);
            let builder = builder.as_str();
            let status = if builder == "status" {
                args.first().and_then(|status| status_code_of(unit.text(status.clone())))
            } else {
                status_code_of(builder)
            };
            let chained_body = call_chain(unit, close + 1)
                .into_iter()
                .find(|(word, _)| word == "body")
                .and_then(|(_, open)| unit.call_args(open).into_iter().next());
            let direct_body = (builder == "ok").then(|| args.first().cloned()).flatten();
            sites.push(SendSite {
                at: body.start + all.start(),
                status,
                body: chained_body.or(direct_body),
            });
        }
        for found in ENTITY_NEW.find_iter(text) {
            let open = body.start + found.end() - 1;
            let args = unit.call_args(open);
            let status = args.last().and_then(|status| status_code_of(unit.text(status.clone())));
            sites.push(SendSite {
                at: body.start + found.start(),
                status,
                body: (args.len() > 1).then(|| args.first().cloned()).flatten(),
            });
        }
        for found in STATUS_EXCEPTION.find_iter(text) {
            let open = body.start + found.end() - 1;
            sites.push(SendSite {
                at: body.start + found.start(),
                status: unit.call_args(open).first().and_then(|status| status_code_of(unit.text(status.clone()))),
                body: None,
            });
        }
        for found in RETURN.find_iter(text) {
            let at = body.start + found.start();
            if unit.in_string(at) || scope_of(unit, at) != body {
                continue;
            }
            let start = body.start + found.end();
            let expr = unit.trim(start .. unit.statement_end(start));
            let expr_text = unit.text(expr.clone());
            if expr_text.is_empty() || expr_text.contains("ResponseEntity") || expr_text == "null" {
                continue;
            }
            sites.push(SendSite {
                at,
                status: None,
                body: Some(expr),
            });
        }
        sites.sort_by_key(|site| site.at);
        sites.dedup_by_key(|site| site.at);
        sites
    }

    fn models(&self, unit: &ScannedUnit, side: BoundarySide) -> Vec<ModelObservation> {
        let mut models = Vec::new();
        for captures in RECORD_DECL.captures_iter(&unit.code) {
            let (Some(all), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let open = all.end() - 1;
            let Some(close) = unit.closing(open) else {
                continue;
            };
            let fields: Vec<ModelField> = self
                .params(unit, open + 1 .. close)
                .into_iter()
                .map(|param| {
                    let location = unit.location(open);
                    model_field(&param.name, &param.type_text, &param.annotations, location)
                })
                .collect();
            if !fields.is_empty() {
                models.push(observation(unit, side, name.start(), name.as_str(), fields));
            }
        }
        for captures in CLASS_DECL.captures_iter(&unit.code) {
            let (Some(all), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if unit.in_string(all.start()) || is_stereotyped(unit, all.start()) {
                continue;
            }
            let open = all.end() - 1;
            let Some(close) = unit.closing(open) else {
                continue;
            };
            let fields = class_fields(unit, open, close);
            if !fields.is_empty() {
                models.push(observation(unit, side, name.start(), name.as_str(), fields));
            }
        }
        models.sort_by_key(|model| model.location.line);
        models
    }

    fn test_cases(&self, unit: &ScannedUnit) -> Vec<TestCase> {
        let mut cases = Vec::new();
        for found in TEST_ANNOTATION.find_iter(&unit.code) {
            if unit.in_string(found.start()) {
                continue;
            }
            let Some(parts) = function_after(unit, found.end()) else {
                continue;
            };
            let start = parts.params.start.saturating_sub(1 + parts.name.len());
            cases.push(TestCase {
                start,
                name: parts.name,
                body: parts.body,
            });
        }
        cases
    }

    fn assertions(&self, unit: &ScannedUnit, body: Range<usize>) -> Vec<Assertion> {
        let responses = response_locals(unit, body.clone());
        let text = unit.text(body.clone());
        let mut found = Vec::new();
        for captures in ASSERT_CALL.captures_iter(text) {
            let (Some(all), Some(method)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let at = body.start + all.start();
            let open = body.start + all.end() - 1;
            let args = unit.call_args(open);
            let (subject, depth, key) = match method.as_str() {
                "assertEquals" | "assertNotEquals" | "assertSame" => (args.get(1).cloned(), AssertionDepth::Deep, None),
                "assertThat" => {
                    let Some(close) = unit.closing(open) else {
                        continue;
                    };
                    let chain = call_chain(unit, close + 1);
                    let Some((matcher, matcher_open)) = chain.first() else {
                        continue;
                    };
                    let key = (matcher == "containsKey")
                        .then(|| unit.call_args(*matcher_open).first().and_then(|key| unit.literal(key.clone())))
                        .flatten();
                    let depth = if SHALLOW_MATCHERS.contains(&matcher.as_str()) {
                        AssertionDepth::Shallow
                    } else {
                        AssertionDepth::Deep
                    };
                    (args.first().cloned(), depth, key)
                }
                _ => (args.first().cloned(), AssertionDepth::Shallow, None),
            };
            let Some(subject) = subject else {
                continue;
            };
            let subject = unit.text(subject).trim().to_string();
            if is_status_subject(&subject, &responses) {
                continue;
            }
            found.push(assertion(unit, at, &subject, depth, key));
        }
        for captures in JSON_PATH.captures_iter(text) {
            let (Some(all), Some(path)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let Some(open) = all.as_str().find('(').map(|index| body.start + all.start() + index) else {
                continue;
            };
            let Some(close) = unit.closing(open) else {
                continue;
            };
            let chain = call_chain(unit, close + 1);
            let depth = match chain.first().map(|(word, _)| word.as_str()) {
                Some("exists" | "isNotEmpty" | "isNotNull") => AssertionDepth::Shallow,
                _ => AssertionDepth::Deep,
            };
            let key = path.as_str().rsplit('.').next().map(ToString::to_string);
            found.push(assertion(unit, body.start + all.start(), &format!("body.{}", path.as_str()), depth, key));
        }
        found.sort_by_key(|item| item.location.line);
        found
    }

    fn params(&self, unit: &ScannedUnit, range: Range<usize>) -> Vec<Param> {
        let mut params = Vec::new();
        for part in unit.split_top_level(range, b',') {
            let text = unit.text(part).trim();
            let annotations = MODIFIERS
                .find(text)
                .map_or("", |found| found.as_str())
                .trim();
            let rest = text[annotations.len() ..].trim();
            let rest = rest.strip_prefix("final ").unwrap_or(rest).trim();
            let Some((type_text, name)) = rest.rsplit_once(char::is_whitespace) else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() || !name.bytes().all(is_ident_byte) {
                continue;
            }
            params.push(Param {
                name: name.to_string(),
                type_text: type_text.trim().to_string(),
                annotations: annotations.to_string(),
            });
        }
        params
    }
}

impl JavaAdapter {
    /// Builds a route handler for a mapped controller method.
    fn handler(
        &self,
        unit: &ScannedUnit,
        start: usize,
        method: Option<HttpMethod>,
        path: String,
        parts: &FunctionParts,
    ) -> RouteHandler {
        let mut handler = RouteHandler::new(start, method, path, parts.body.clone());
        for param in self.params(unit, parts.params.clone()) {
            if param.annotations.contains("@RequestBody") || param.annotations.contains("@Payload") {
                handler.request_roots.push(BodyRoot::new(param.name.clone(), parts.body.start));
                handler.request_model = Some(param.type_text.clone());
            }
        }
        let name_start = parts.params.start.saturating_sub(1 + parts.name.len());
        let header = unit.text(start .. name_start);
        handler.default_status = RESPONSE_STATUS
            .captures(header)
            .and_then(|captures| captures.get(1))
            .and_then(|status| status_code_of(status.as_str()));
        let line_start = unit.line_range(unit.line_of(name_start)).start;
        let declaration = unit.text(line_start .. name_start).trim();
        let return_type = MODIFIERS.find(declaration).map_or(declaration, |found| &declaration[found.end() ..]).trim();
        if !return_type.is_empty() && return_type != "void" {
            handler.response_model = Some(return_type.to_string());
        }
        handler
    }
}

// ============================================================================
// SECTION: Clients
// ============================================================================

/// Builds a RestTemplate call.
fn template_call(unit: &ScannedUnit, start: usize, open: usize, receiver: &str, verb: &str) -> Option<ClientCall> {
    let close = unit.closing(open)?;
    let scope = scope_of(unit, start);
    let args = unit.call_args(open);
    let mut call = ClientCall::new(start, close + 1, format!("{receiver}.{verb}"));
    call.path = args.first().and_then(|url| path_of(unit, url.clone(), scope.clone()));
    let (method, body) = match verb {
        "getForObject" | "getForEntity" => (Some(HttpMethod::Get), None),
        "postForObject" | "postForEntity" => (Some(HttpMethod::Post), args.get(1).cloned()),
        "patchForObject" => (Some(HttpMethod::Patch), args.get(1).cloned()),
        "put" => (Some(HttpMethod::Put), args.get(1).cloned()),
        "delete" => (Some(HttpMethod::Delete), None),
        _ => {
            let method = args.get(1).and_then(|method| unit.text(method.clone()).rsplit('.').next().and_then(HttpMethod::parse));
            (method, args.get(2).cloned())
        }
    };
    call.method = method;
    call.body = body.and_then(|body| entity_body(unit, body, scope.clone()));
    call.headers = headers_in(unit, scope.start .. close + 1);
    if let Some(ResultBinding::Name(name)) = result_binding(unit, start) {
        let root = if verb.ends_with("ForObject") { name } else { format!("{name}.getBody()") };
        call.roots.push(BodyRoot::new(root, close + 1));
    }
    Some(call)
}

/// Unwraps `new HttpEntity<>(body, headers)` around a request body.
fn entity_body(unit: &ScannedUnit, body: Range<usize>, scope: Range<usize>) -> Option<Range<usize>> {
    let body = unit.trim(body);
    let text = unit.text(body.clone());
    if text == "null" || text.is_empty() {
        return None;
    }
    if text.bytes().all(is_ident_byte)
        && let Some(rhs) = assignment_rhs(unit, text, body.start, scope.clone())
        && unit.text(rhs.clone()).contains("HttpEntity")
    {
        return entity_body(unit, rhs, scope);
    }
    let Some(relative) = text.find("HttpEntity") else {
        return Some(body);
    };
    let open = body.start + relative + text[relative ..].find('(')?;
    unit.call_args(open).into_iter().next()
}

/// Builds a WebClient/RestClient call from its `.uri(` position.
fn fluent_call(
    unit: &ScannedUnit,
    start: usize,
    uri_open: usize,
    receiver: &str,
    method: Option<HttpMethod>,
) -> Option<ClientCall> {
    let uri_close = unit.closing(uri_open)?;
    let scope = scope_of(unit, start);
    let end = unit.statement_end(start);
    let mut call = ClientCall::new(start, end, format!("{receiver}.uri"));
    call.method = method;
    call.path = unit.call_args(uri_open).first().and_then(|url| path_of(unit, url.clone(), scope.clone()));
    for (word, open) in call_chain(unit, uri_close + 1) {
        if matches!(word.as_str(), "bodyValue" | "body" | "syncBody") && call.body.is_none() && open < end {
            let arg = unit.call_args(open).into_iter().next();
            if arg.as_ref().is_some_and(|arg| !unit.text(arg.clone()).ends_with(".class")) {
                call.body = arg;
            }
        }
    }
    call.headers = headers_in(unit, start .. end);
    if let Some(ResultBinding::Name(name)) = result_binding(unit, start) {
        call.roots.push(BodyRoot::new(name, end));
    }
    Some(call)
}

/// Returns the sequential `.word(` calls following `from`, with each call's
/// open parenthesis.
fn call_chain(unit: &ScannedUnit, from: usize) -> Vec<(String, usize)> {
    let mut chain = Vec::new();
    let mut cursor = from;
    while let Some(next) = unit.next_non_ws(cursor) {
        if unit.byte(next) != Some(b'.') {
            break;
        }
        let start = unit.next_non_ws(next + 1).unwrap_or(next + 1);
        let len = unit
            .code
            .as_bytes()
            .get(start ..)
            .map_or(0, |rest| rest.iter().take_while(|byte| is_ident_byte(**byte)).count());
        if len == 0 || unit.byte(start + len) != Some(b'(') {
            break;
        }
        let open = start + len;
        chain.push((unit.text(start .. open).to_string(), open));
        let Some(close) = unit.closing(open) else {
            break;
        };
        cursor = close + 1;
    }
    chain
}

// ============================================================================
// SECTION: Routes
// ============================================================================

/// Returns the path of a mapping annotation's arguments.
fn mapping_path(unit: &ScannedUnit, args: Range<usize>) -> Option<String> {
    let parts = unit.split_top_level(args, b',');
    let value = keyword_arg(unit, &parts, "value")
        .or_else(|| keyword_arg(unit, &parts, "path"))
        .or_else(|| parts.first().cloned().filter(|first| !unit.text(first.clone()).contains('=')))?;
    let value = unit.trim(value);
    let value = if unit.text(value.clone()).starts_with('{') {
        unit.strings_in(value).into_iter().next().map(|span| span.start .. span.end)?
    } else {
        value
    };
    unit.literal(value)
}

/// Joins a class prefix with a method path.
fn join_path(prefix: &str, path: &str) -> String {
    let joined: Vec<&str> =
        prefix.split('/').chain(path.split('/')).filter(|segment| !segment.is_empty()).collect();
    format!("/{}", joined.join("/"))
}

// ============================================================================
// SECTION: Models
// ============================================================================

/// Returns true when the class at `at` carries a stereotype annotation.
fn is_stereotyped(unit: &ScannedUnit, at: usize) -> bool {
    let mut line = unit.line_of(at);
    let mut header = unit.code_line(line).to_string();
    while line > 1 {
        line -= 1;
        let text = unit.code_line(line).trim();
        if !text.starts_with('@') {
            break;
        }
        header.push_str(text);
    }
    STEREOTYPES.iter().any(|stereotype| header.contains(stereotype))
}

/// Collects instance fields declared directly inside a class body.
fn class_fields(unit: &ScannedUnit, open: usize, close: usize) -> Vec<ModelField> {
    let mut fields = Vec::new();
    let mut pending_annotations = String::new();
    for line in unit.line_of(open) + 1 .. unit.line_of(close) {
        let line_start = unit.line_range(line).start;
        if unit.enclosing_braces(line_start).first() != Some(&(open, close)) {
            pending_annotations.clear();
            continue;
        }
        let text = unit.code_line(line);
        let trimmed = text.trim();
        if trimmed.starts_with('@') && !trimmed.ends_with(';') {
            pending_annotations.push_str(trimmed);
            pending_annotations.push(' ');
            continue;
        }
        let Some(captures) = FIELD_DECL.captures(text) else {
            pending_annotations.clear();
            continue;
        };
        let (Some(inline), Some(modifiers), Some(declared), Some(name)) =
            (captures.get(1), captures.get(2), captures.get(3), captures.get(4))
        else {
            continue;
        };
        let annotations = format!("{pending_annotations}{}", inline.as_str());
        pending_annotations.clear();
        if modifiers.as_str().contains("static") || declared.as_str().contains("static") || trimmed.starts_with("return") {
            continue;
        }
        fields.push(model_field(
            name.as_str(),
            declared.as_str().trim(),
            &annotations,
            unit.location(line_start + name.start()),
        ));
    }
    fields
}

/// Builds a model field from a declaration.
fn model_field(
    name: &str,
    declared: &str,
    annotations: &str,
    location: crate::core::source::SourceLocation,
) -> ModelField {
    let wire = JSON_PROPERTY
        .captures(annotations)
        .and_then(|captures| captures.get(1))
        .map(|wire| wire.as_str().to_string());
    let (kind, nullable) = kind_from_type(Language::Java, declared);
    ModelField {
        declared_name: name.to_string(),
        wire_name: wire.clone().unwrap_or_else(|| name.to_string()),
        explicit_wire_name: wire.is_some(),
        kind,
        optional: nullable || annotations.contains("@Nullable"),
        location,
    }
}

/// Builds a model observation.
fn observation(unit: &ScannedUnit, side: BoundarySide, at: usize, name: &str, fields: Vec<ModelField>) -> ModelObservation {
    ModelObservation {
        location: unit.location(at),
        side,
        name: name.to_string(),
        fields,
        bindings: Vec::new(),
        ambiguous: Vec::new(),
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

    fn scan(path: &str, text: &str) -> ScannedUnit {
        let is_test = JavaAdapter.is_test_path(path);
        scan_text(path, Language::Java, is_test, text.to_string()).unwrap()
    }

    #[test]
    fn rest_template_calls_unwrap_entities() {
        let unit = scan(
            "client/OrderClient.java",
            "class OrderClient {\n  Order create(CreateOrder order) {\n    HttpEntity<CreateOrder> entity = new HttpEntity<>(order, headers);\n    ResponseEntity<Order> resp = restTemplate.exchange(baseUrl + \"/orders\", HttpMethod.POST, entity, Order.class);\n    return resp.getBody();\n  }\n}\n",
        );
        let calls = JavaAdapter.client_calls(&unit);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Some(HttpMethod::Post));
        assert_eq!(calls[0].path.as_deref(), Some("{}/orders"));
        assert_eq!(unit.text(calls[0].body.clone().unwrap()), "order");
        assert_eq!(calls[0].roots[0].expr, "resp.getBody()");
    }

    #[test]
    fn web_client_chains_capture_body_values() {
        let unit = scan(
            "client/Orders.java",
            "class Orders {\n  Order create(CreateOrder order) {\n    Order created = webClient.post().uri(\"/orders\").bodyValue(order).retrieve().bodyToMono(Order.class).block();\n    return created;\n  }\n}\n",
        );
        let calls = JavaAdapter.client_calls(&unit);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Some(HttpMethod::Post));
        assert_eq!(calls[0].path.as_deref(), Some("/orders"));
        assert_eq!(unit.text(calls[0].body.clone().unwrap()), "order");
        assert_eq!(calls[0].roots[0].expr, "created");
    }

    #[test]
    fn spring_controllers_prefix_routes_and_read_models() {
        let unit = scan(
            "service/OrderController.java",
            "@RestController\n@RequestMapping(\"/api/orders\")\npublic class OrderController {\n  @PostMapping\n  @ResponseStatus(HttpStatus.CREATED)\n  public OrderView create(@Valid @RequestBody CreateOrder request) {\n    if (request.getSku() == null) {\n      throw new ResponseStatusException(HttpStatus.BAD_REQUEST, \"sku\");\n    }\n    return service.create(request);\n  }\n\n  @GetMapping(\"/{id}\")\n  public ResponseEntity<OrderView> get(@PathVariable String id) {\n    return ResponseEntity.ok(service.find(id));\n  }\n}\n",
        );
        let routes = JavaAdapter.routes(&unit);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].path, "/api/orders");
        assert_eq!(routes[0].method, Some(HttpMethod::Post));
        assert_eq!(routes[0].request_model.as_deref(), Some("CreateOrder"));
        assert_eq!(routes[0].response_model.as_deref(), Some("OrderView"));
        assert_eq!(routes[0].default_status, Some(201));
        assert_eq!(routes[1].path, "/api/orders/{id}");
        let create_sites = JavaAdapter.send_sites(&unit, &routes[0]);
        let statuses: Vec<Option<u16>> = create_sites.iter().map(|site| site.status).collect();
        assert_eq!(statuses, vec![Some(400), None]);
        let get_sites = JavaAdapter.send_sites(&unit, &routes[1]);
        assert_eq!(get_sites.len(), 1);
        assert_eq!(get_sites[0].status, Some(200));
        assert_eq!(unit.text(get_sites[0].body.clone().unwrap()), "service.find(id)");
    }

    #[test]
    fn records_and_jackson_classes_become_models() {
        let unit = scan(
            "client/Order.java",
            "public record Order(@JsonProperty(\"order_id\") String orderId, Optional<Integer> stock) {}\n\npublic class Line {\n  private static final long serialVersionUID = 1L;\n  @JsonProperty(\"unit_price\")\n  private double unitPrice;\n  private String sku;\n}\n",
        );
        let models = JavaAdapter.models(&unit, BoundarySide::Consumer);
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].fields[0].wire_name, "order_id");
        assert!(models[0].fields[1].optional);
        let line: Vec<&str> = models[1].fields.iter().map(|field| field.wire_name.as_str()).collect();
        assert_eq!(line, vec!["unit_price", "sku"]);
    }

    #[test]
    fn junit_and_mock_mvc_assertions_are_classified() {
        let unit = scan(
            "src/test/java/OrderControllerTest.java",
            "class OrderControllerTest {\n  @Test\n  void getsOrder() throws Exception {\n    mvc.perform(get(\"/api/orders/1\"))\n      .andExpect(status().isOk())\n      .andExpect(jsonPath(\"$.order_id\").exists())\n      .andExpect(jsonPath(\"$.status\").value(\"pending\"));\n    assertThat(order.getTotal()).isEqualTo(10);\n  }\n}\n",
        );
        let cases = JavaAdapter.test_cases(&unit);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "getsOrder");
        let found = JavaAdapter.assertions(&unit, cases[0].body.clone());
        let summary: Vec<(Option<&str>, AssertionDepth)> =
            found.iter().map(|item| (item.target.as_deref(), item.depth)).collect();
        assert_eq!(summary[0], (Some("order_id"), AssertionDepth::Shallow));
        assert_eq!(summary[1], (Some("status"), AssertionDepth::Deep));
        assert_eq!(summary[2].1, AssertionDepth::Deep);
    }
}
