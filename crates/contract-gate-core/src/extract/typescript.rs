// crates/contract-gate-core/src/extract/typescript.rs
// ============================================================================
// Module: Contract Gate TypeScript Adapter
// Description: TypeScript and JavaScript site recognition.
// Purpose: Recognize fetch/axios/ky/got clients, Express/Fastify/Nest routes,
//          interface and class models, and Jest/Vitest/Mocha tests.
// Dependencies: regex, crate::core, crate::extract
// ============================================================================

//! ## Overview
//! Client calls are recognized on well-known client entry points (`fetch`,
//! `axios`, `ky`, `got`) and on instances created from them or injected as
//! Angular `HttpClient`. Routes are recognized on router receivers (created
//! in the unit or conventionally named) and on Nest method decorators under
//! a `@Controller` prefix. Response bodies are followed from the binding of
//! the call result: `res.json()` for fetch, `res.data` for axios.

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
use crate::extract::sites::object_entry;
use crate::extract::sites::response_locals;
use crate::extract::sites::result_binding;
use crate::extract::sites::scope_of;

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// Module-level client entry points.
static CLIENT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(fetch|ofetch|axios|ky|got)(?:\.(get|post|put|patch|delete|head|options|request))?\s*(?:<[^()]*>)?\(")
});

/// Method calls on a named receiver.
static RECEIVER_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"((?:this\.)?[A-Za-z_$][\w$]*)\.(get|post|put|patch|delete|head|options|request)\s*(?:<[^()]*>)?\(")
});

/// Client instances created from a client library.
static CLIENT_FACTORY: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"([A-Za-z_$][\w$]*)\s*(?::[^=;]+)?=\s*(?:axios|ky|got)\.(?:create|extend)\(")
});

/// Angular `HttpClient` constructor injection.
static ANGULAR_CLIENT: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?:private|public|protected)\s+(?:readonly\s+)?([A-Za-z_$][\w$]*)\s*:\s*HttpClient\b")
});

/// Router or server instances created in the unit.
static ROUTER_FACTORY: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"([A-Za-z_$][\w$]*)\s*(?::[^=;]+)?=\s*(?:express\(\s*\)|express\.Router\(|Router\(|fastify\(|Fastify\(|new\s+Hono\(|new\s+Router\()",
    )
});

/// Router mounts (`app.use('/api', ordersRouter)`).
static ROUTER_MOUNT: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"\b([A-Za-z_$][\w$]*)\.use\(\s*["'`]([^"'`]+)["'`]\s*,\s*([A-Za-z_$][\w$]*)\s*\)"#));

/// Route registrations with a literal path.
static ROUTE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"\b([A-Za-z_$][\w$]*)\.(get|post|put|patch|delete|head|options|all)\(\s*["'`]([^"'`]*)["'`]\s*,"#)
});

/// Nest controller prefix.
static CONTROLLER: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"@Controller\(\s*(?:["'`]([^"'`]*)["'`])?[^)]*\)"#));

/// Nest route decorators.
static NEST_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"@(Get|Post|Put|Patch|Delete|Head|Options|All)\(\s*(?:["'`]([^"'`]*)["'`])?\s*\)"#)
});

/// Nest explicit status.
static HTTP_CODE: LazyLock<Regex> = LazyLock::new(|| compile(r"@HttpCode\(\s*([^()]+?)\s*\)"));

/// Status then send (`res.status(404).json(...)`, `reply.code(201).send(...)`).
static SEND_WITH_STATUS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\.(?:status|code)\(\s*([^()]+?)\s*\)\s*\.(?:json|send|end)\("));

/// Bare send on a response object.
static SEND_BARE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(?:res|response|reply|resp|c)\.(?:json|send)\("));

/// Status-only send.
static SEND_STATUS_ONLY: LazyLock<Regex> = LazyLock::new(|| compile(r"\.sendStatus\(\s*([^()]+?)\s*\)"));

/// Koa body assignment.
static KOA_BODY: LazyLock<Regex> = LazyLock::new(|| compile(r"\bctx\.body\s*=\s*"));

/// Thrown HTTP errors.
static THROW_HTTP: LazyLock<Regex> = LazyLock::new(|| compile(r"\bthrow\s+new\s+(\w+)\("));

/// Return statements.
static RETURN: LazyLock<Regex> = LazyLock::new(|| compile(r"\breturn\b"));

/// Model declarations with a brace body.
static MODEL_DECL: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"\b(?:interface|class)\s+([A-Za-z_$][\w$]*)(?:<[^>{]*>)?(?:\s+(?:extends|implements)\s+[^{]+)?\s*\{|\btype\s+([A-Za-z_$][\w$]*)(?:<[^>=]*>)?\s*=\s*\{",
    )
});

/// Model member line.
static MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"^\s*(?:@\w+(?:\([^)]*\))?\s*)*(?:(?:public|private|protected|readonly|declare)\s+)*["']?([A-Za-z_$][\w$]*)["']?\s*([?!])?\s*:\s*([^;=]+?)\s*(?:[;,=]|$)"#,
    )
});

/// class-transformer wire name.
static EXPOSE_NAME: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"@(?:Expose|JsonProperty)\(\s*\{?\s*(?:name\s*:\s*)?["']([^"']+)["']"#));

/// Jest, Vitest, and Mocha test declarations.
static TEST_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"\b(?:it|test)(?:\.only|\.skip|\.concurrent)?\(\s*(?:'([^']*)'|"([^"]*)"|`([^`]*)`)\s*,"#)
});

/// `expect(` assertion entry.
static EXPECT: LazyLock<Regex> = LazyLock::new(|| compile(r"\bexpect\("));

/// Node `assert` assertions.
static ASSERT: LazyLock<Regex> = LazyLock::new(|| compile(r"\bassert(?:\.(\w+))?\("));

/// Leading decorators on a parameter.
static PARAM_DECORATOR: LazyLock<Regex> = LazyLock::new(|| compile(r"^\s*(@\w+(?:\([^)]*\))?\s*)+"));

/// Receivers treated as routers without a visible factory.
const DEFAULT_ROUTERS: &[&str] = &["app", "router", "server", "fastify"];

/// Receivers treated as client instances without a visible factory.
const DEFAULT_CLIENTS: &[&str] = &["api", "client", "apiClient", "httpClient", "http", "instance", "this.http"];

/// Matchers that only check presence or truthiness.
const SHALLOW_MATCHERS: &[&str] = &["toBeDefined", "toBeTruthy", "exist", "ok", "toBeInstanceOf"];

/// Matchers that are shallow when negated.
const NEGATED_SHALLOW: &[&str] = &["toBeNull", "toBeUndefined", "toBeFalsy", "null", "undefined"];

/// Mock-interaction matchers that say nothing about a response.
const MOCK_MATCHERS: &[&str] = &["toHaveBeenCalled", "toHaveBeenCalledWith", "toHaveBeenCalledTimes"];

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// TypeScript and JavaScript recognizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScriptAdapter;

/// How a client library exposes the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientStyle {
    /// `Response` with `.json()`.
    Fetch,
    /// Response with `.data`.
    Axios,
    /// `ky`: `.json()` on the promise or the response.
    Ky,
    /// `got`: `.json()` on the promise or `.body`.
    Got,
    /// Body returned directly (`ofetch`).
    Direct,
}

impl Recognizer for TypeScriptAdapter {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn is_test_path(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        name.contains(".test.") || name.contains(".spec.") || path.split('/').any(|part| part == "__tests__")
    }

    fn client_calls(&self, unit: &ScannedUnit) -> Vec<ClientCall> {
        let routers = router_receivers(unit);
        let clients = client_receivers(unit, &routers);
        let mut calls = Vec::new();
        for captures in CLIENT_CALL.captures_iter(&unit.code) {
            let (Some(all), Some(library)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if unit.in_string(all.start()) || preceded_by_member(unit, all.start()) {
                continue;
            }
            let style = match library.as_str() {
                "fetch" => ClientStyle::Fetch,
                "ofetch" => ClientStyle::Direct,
                "ky" => ClientStyle::Ky,
                "got" => ClientStyle::Got,
                _ => ClientStyle::Axios,
            };
            let verb = captures.get(2).map(|verb| verb.as_str());
            if let Some(call) = client_call(unit, all.start(), all.end() - 1, library.as_str(), verb, style) {
                calls.push(call);
            }
        }
        for captures in RECEIVER_CALL.captures_iter(&unit.code) {
            let (Some(all), Some(receiver), Some(verb)) = (captures.get(0), captures.get(1), captures.get(2)) else {
                continue;
            };
            if unit.in_string(all.start())
                || preceded_by_member(unit, all.start())
                || !clients.contains(receiver.as_str())
                || routers.contains(receiver.as_str())
            {
                continue;
            }
            let open = all.end() - 1;
            if last_arg_is_function(unit, open) {
                continue;
            }
            if let Some(call) =
                client_call(unit, all.start(), open, receiver.as_str(), Some(verb.as_str()), ClientStyle::Axios)
            {
                calls.push(call);
            }
        }
        calls.sort_by_key(|call| call.start);
        calls
    }

    fn routes(&self, unit: &ScannedUnit) -> Vec<RouteHandler> {
        let routers = router_receivers(unit);
        let mounts = router_mounts(unit);
        let mut handlers = Vec::new();
        for captures in ROUTE_CALL.captures_iter(&unit.code) {
            let (Some(all), Some(receiver), Some(verb), Some(path)) =
                (captures.get(0), captures.get(1), captures.get(2), captures.get(3))
            else {
                continue;
            };
            if unit.in_string(all.start()) {
                continue;
            }
            let open = all.start() + receiver.as_str().len() + verb.as_str().len() + 1;
            let inline = last_arg_is_function(unit, open);
            if !routers.contains(receiver.as_str()) && !inline {
                continue;
            }
            let Some(parts) = handler_function(unit, open) else {
                continue;
            };
            let prefix = mounts.get(receiver.as_str()).map_or("", String::as_str);
            let method = if verb.as_str() == "all" { None } else { HttpMethod::parse(verb.as_str()) };
            let mut handler = RouteHandler::new(all.start(), method, join_path(prefix, path.as_str()), parts.body.clone());
            let params = self.params(unit, parts.params.clone());
            if let Some(first) = params.first() {
                let root = if first.name == "ctx" { "ctx.request.body".to_string() } else { format!("{}.body", first.name) };
                handler.request_roots.push(BodyRoot::new(root, parts.body.start));
            }
            handlers.push(handler);
        }
        handlers.extend(nest_routes(self, unit));
        handlers.sort_by_key(|handler| handler.start);
        handlers
    }

    fn send_sites(&self, unit: &ScannedUnit, route: &RouteHandler) -> Vec<SendSite> {
        let body = route.body.clone();
        let text = unit.text(body.clone());
        let mut sites = Vec::new();
        for captures in SEND_WITH_STATUS.captures_iter(text) {
            let (Some(all), Some(status)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let open = body.start + all.end() - 1;
            sites.push(SendSite {
                at: body.start + all.start(),
                status: status_code_of(status.as_str()),
                body: unit.call_args(open).into_iter().next(),
            });
        }
        for found in SEND_BARE.find_iter(text) {
            let open = body.start + found.end() - 1;
            let args = unit.call_args(open);
            let Some(first) = args.first().cloned() else {
                continue;
            };
            sites.push(SendSite {
                at: body.start + found.start(),
                status: args.get(1).and_then(|status| status_code_of(unit.text(status.clone()))),
                body: Some(first),
            });
        }
        for captures in SEND_STATUS_ONLY.captures_iter(text) {
            let (Some(all), Some(status)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            sites.push(SendSite {
                at: body.start + all.start(),
                status: status_code_of(status.as_str()),
                body: None,
            });
        }
        for found in KOA_BODY.find_iter(text) {
            let start = body.start + found.end();
            sites.push(SendSite {
                at: body.start + found.start(),
                status: None,
                body: Some(unit.trim(start .. unit.statement_end(start))),
            });
        }
        for captures in THROW_HTTP.captures_iter(text) {
            let (Some(all), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let open = body.start + all.end() - 1;
            let status = if name.as_str() == "HttpException" {
                unit.call_args(open).get(1).and_then(|status| status_code_of(unit.text(status.clone())))
            } else {
                name.as_str().strip_suffix("Exception").and_then(status_code_of)
            };
            if status.is_some() {
                sites.push(SendSite {
                    at: body.start + all.start(),
                    status,
                    body: None,
                });
            }
        }
        for found in RETURN.find_iter(text) {
            let at = body.start + found.start();
            if unit.in_string(at) || scope_of(unit, at) != body {
                continue;
            }
            let start = body.start + found.end();
            let expr = unit.trim(start .. unit.statement_end(start));
            let expr_text = unit.text(expr.clone());
            let expr_text = expr_text.strip_prefix("await ").unwrap_or(expr_text);
            if expr_text.is_empty()
                || ["res.", "reply.", "response.", "resp.", "c.", "next("].iter().any(|lead| expr_text.starts_with(lead))
            {
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
        for captures in MODEL_DECL.captures_iter(&unit.code) {
            let Some(all) = captures.get(0) else {
                continue;
            };
            let Some(name) = captures.get(1).or_else(|| captures.get(2)) else {
                continue;
            };
            if unit.in_string(all.start()) {
                continue;
            }
            let open = all.end() - 1;
            let Some(close) = unit.closing(open) else {
                continue;
            };
            let fields = model_fields(unit, open, close);
            if fields.is_empty() {
                continue;
            }
            models.push(ModelObservation {
                location: unit.location(all.start()),
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
        for captures in TEST_CALL.captures_iter(&unit.code) {
            let Some(all) = captures.get(0) else {
                continue;
            };
            let name = (1 ..= 3).find_map(|index| captures.get(index)).map_or("", |name| name.as_str());
            if unit.in_string(all.start()) {
                continue;
            }
            let Some(parts) = function_after(unit, all.end()) else {
                continue;
            };
            cases.push(TestCase {
                start: all.start(),
                name: name.to_string(),
                body: parts.body,
            });
        }
        cases
    }

    fn assertions(&self, unit: &ScannedUnit, body: Range<usize>) -> Vec<Assertion> {
        let responses = response_locals(unit, body.clone());
        let text = unit.text(body.clone());
        let mut found = Vec::new();
        for call in EXPECT.find_iter(text) {
            let at = body.start + call.start();
            let open = body.start + call.end() - 1;
            let Some(close) = unit.closing(open) else {
                continue;
            };
            let subject = unit.text(open + 1 .. close).trim();
            if subject.is_empty() || is_status_subject(subject, &responses) {
                continue;
            }
            let Some((words, key, arg_count)) = matcher_chain(unit, close + 1) else {
                continue;
            };
            if words.iter().any(|word| MOCK_MATCHERS.contains(&word.as_str())) {
                continue;
            }
            let negated = words.iter().any(|word| word == "not");
            let has_property = words.iter().any(|word| word == "toHaveProperty" || word == "property");
            let shallow = words.iter().any(|word| SHALLOW_MATCHERS.contains(&word.as_str()))
                || (negated && words.iter().any(|word| NEGATED_SHALLOW.contains(&word.as_str())))
                || (has_property && arg_count <= 1);
            let depth = if shallow { AssertionDepth::Shallow } else { AssertionDepth::Deep };
            let key = if has_property { key.map(|key| key.rsplit('.').next().unwrap_or(&key).to_string()) } else { None };
            found.push(assertion(unit, at, subject, depth, key));
        }
        for captures in ASSERT.captures_iter(text) {
            let Some(all) = captures.get(0) else {
                continue;
            };
            let at = body.start + all.start();
            if preceded_by_member(unit, at) {
                continue;
            }
            let open = body.start + all.end() - 1;
            let Some(first) = unit.call_args(open).into_iter().next() else {
                continue;
            };
            let subject = unit.text(first).trim().to_string();
            if is_status_subject(&subject, &responses) {
                continue;
            }
            let depth = match captures.get(1).map(|name| name.as_str()) {
                None | Some("ok" | "exists") => AssertionDepth::Shallow,
                Some(_) => AssertionDepth::Deep,
            };
            found.push(assertion(unit, at, &subject, depth, None));
        }
        found.sort_by_key(|item| item.location.line);
        found
    }

    fn params(&self, unit: &ScannedUnit, range: Range<usize>) -> Vec<Param> {
        let mut params = Vec::new();
        for part in unit.split_top_level(range, b',') {
            let text = unit.text(part).trim();
            let annotations = PARAM_DECORATOR.find(text).map_or("", |found| found.as_str());
            let rest = text[annotations.len() ..].trim();
            let rest = ["public ", "private ", "protected ", "readonly "]
                .iter()
                .fold(rest, |acc, modifier| acc.strip_prefix(modifier).unwrap_or(acc))
                .trim();
            let rest = rest.split('=').next().unwrap_or(rest).trim();
            let (name, type_text) = rest.split_once(':').map_or((rest, ""), |(name, ty)| (name.trim(), ty.trim()));
            let name = name.trim_end_matches('?');
            if name.is_empty() || !name.bytes().all(is_ident_byte) {
                continue;
            }
            params.push(Param {
                name: name.to_string(),
                type_text: type_text.to_string(),
                annotations: annotations.trim().to_string(),
            });
        }
        params
    }
}

// ============================================================================
// SECTION: Clients
// ============================================================================

/// Returns true when the match is a member of another object (`obj.fetch`).
fn preceded_by_member(unit: &ScannedUnit, at: usize) -> bool {
    at > 0 && unit.byte(at - 1).is_some_and(|byte| byte == b'.' || is_ident_byte(byte) || byte == b'$')
}

/// Returns receivers that register routes.
fn router_receivers(unit: &ScannedUnit) -> BTreeSet<String> {
    let mut routers: BTreeSet<String> = DEFAULT_ROUTERS.iter().map(ToString::to_string).collect();
    for captures in ROUTER_FACTORY.captures_iter(&unit.code) {
        if let Some(name) = captures.get(1) {
            routers.insert(name.as_str().to_string());
        }
    }
    for captures in ROUTER_MOUNT.captures_iter(&unit.code) {
        if let Some(name) = captures.get(3) {
            routers.insert(name.as_str().to_string());
        }
    }
    routers
}

/// Returns receivers that issue HTTP calls.
fn client_receivers(unit: &ScannedUnit, routers: &BTreeSet<String>) -> BTreeSet<String> {
    let mut clients: BTreeSet<String> = DEFAULT_CLIENTS.iter().map(ToString::to_string).collect();
    for captures in CLIENT_FACTORY.captures_iter(&unit.code) {
        if let Some(name) = captures.get(1) {
            clients.insert(name.as_str().to_string());
            clients.insert(format!("this.{}", name.as_str()));
        }
    }
    for captures in ANGULAR_CLIENT.captures_iter(&unit.code) {
        if let Some(name) = captures.get(1) {
            clients.insert(format!("this.{}", name.as_str()));
        }
    }
    clients.retain(|name| !routers.contains(name));
    clients
}

/// Returns true when the last argument of the call at `open` is a function.
fn last_arg_is_function(unit: &ScannedUnit, open: usize) -> bool {
    unit.call_args(open).last().is_some_and(|arg| {
        let text = unit.text(arg.clone()).trim();
        text.starts_with("function") || text.starts_with("async") || text.contains("=>")
    })
}

/// Builds a client call for a recognized entry point.
fn client_call(
    unit: &ScannedUnit,
    start: usize,
    open: usize,
    callee: &str,
    verb: Option<&str>,
    style: ClientStyle,
) -> Option<ClientCall> {
    let close = unit.closing(open)?;
    let scope = scope_of(unit, start);
    let args = unit.call_args(open);
    let mut call = ClientCall::new(start, close + 1, verb.map_or_else(|| callee.to_string(), |verb| format!("{callee}.{verb}")));
    let config_only = matches!(verb, None | Some("request"))
        && style == ClientStyle::Axios
        && args.first().is_some_and(|first| unit.byte(unit.trim(first.clone()).start) == Some(b'{'));
    let (url, options) = if config_only {
        let config = args.first().cloned()?;
        (object_entry(unit, config.clone(), "url"), Some(config))
    } else {
        let options_index = match (style, verb) {
            (ClientStyle::Axios, Some("post" | "put" | "patch")) => 2,
            _ => 1,
        };
        (args.first().cloned(), args.get(options_index).cloned())
    };
    let options = options.map(|options| resolve_object(unit, options, scope.clone()));
    let method_entry = options
        .clone()
        .and_then(|options| object_entry(unit, options, "method"))
        .and_then(|method| unit.literal(method))
        .and_then(|method| HttpMethod::parse(&method));
    call.method = match verb {
        Some(verb) if verb != "request" => HttpMethod::parse(verb),
        _ => method_entry.or(Some(HttpMethod::Get)),
    };
    call.path = url.and_then(|url| path_of(unit, url, scope.clone()));
    call.body = match (style, verb) {
        (ClientStyle::Axios, Some("post" | "put" | "patch")) if !config_only => args.get(1).cloned(),
        (ClientStyle::Axios, _) => options.clone().and_then(|options| object_entry(unit, options, "data")),
        (ClientStyle::Ky | ClientStyle::Got, _) => options.clone().and_then(|options| object_entry(unit, options, "json")),
        _ => options.clone().and_then(|options| object_entry(unit, options, "body")),
    };
    call.headers = headers_in(unit, start .. close + 1);
    call.roots = client_roots(unit, start, close, style);
    Some(call)
}

/// Resolves an identifier argument to its object-literal assignment.
fn resolve_object(unit: &ScannedUnit, range: Range<usize>, scope: Range<usize>) -> Range<usize> {
    let trimmed = unit.trim(range.clone());
    let text = unit.text(trimmed.clone());
    if !text.is_empty() && text.bytes().all(is_ident_byte) {
        return assignment_rhs(unit, text, trimmed.start, scope).unwrap_or(range);
    }
    range
}

/// Returns expressions holding the decoded response body.
fn client_roots(unit: &ScannedUnit, start: usize, close: usize, style: ClientStyle) -> Vec<BodyRoot> {
    let after = close + 1;
    let follows_json = unit
        .next_non_ws(after)
        .is_some_and(|next| unit.text(next .. unit.code.len()).starts_with(".json()"));
    let direct = follows_json || style == ClientStyle::Direct;
    match result_binding(unit, start) {
        Some(ResultBinding::Name(name)) => {
            let expr = match style {
                _ if direct => name,
                ClientStyle::Axios => format!("{name}.data"),
                ClientStyle::Got => format!("{name}.body"),
                ClientStyle::Fetch | ClientStyle::Ky | ClientStyle::Direct => format!("{name}.json()"),
            };
            vec![BodyRoot::new(expr, after)]
        }
        Some(ResultBinding::Destructure(pairs)) if style == ClientStyle::Axios => pairs
            .into_iter()
            .filter(|(key, _)| key == "data")
            .map(|(_, local)| BodyRoot::new(local, after))
            .collect(),
        _ => Vec::new(),
    }
}

// ============================================================================
// SECTION: Routes
// ============================================================================

/// Returns router mount prefixes by router name.
fn router_mounts(unit: &ScannedUnit) -> BTreeMap<String, String> {
    let mut mounts = BTreeMap::new();
    for captures in ROUTER_MOUNT.captures_iter(&unit.code) {
        if let (Some(prefix), Some(router)) = (captures.get(2), captures.get(3)) {
            mounts.insert(router.as_str().to_string(), prefix.as_str().to_string());
        }
    }
    mounts
}

/// Joins a mount or controller prefix with a route path.
fn join_path(prefix: &str, path: &str) -> String {
    let joined: Vec<&str> =
        prefix.split('/').chain(path.split('/')).filter(|segment| !segment.is_empty()).collect();
    format!("/{}", joined.join("/"))
}

/// Locates the handler function for a route call whose `(` is at `open`.
fn handler_function(unit: &ScannedUnit, open: usize) -> Option<FunctionParts> {
    let last = unit.call_args(open).last().cloned()?;
    let last = unit.trim(last);
    let text = unit.text(last.clone());
    if text.bytes().all(|byte| is_ident_byte(byte) || byte == b'.') {
        let name = text.rsplit('.').next().unwrap_or(text);
        let definition = Regex::new(&format!(
            r"(?m)\bfunction\s+{0}\s*\(|\b{0}\s*(?::[^=;]+)?=\s*(?:async\s*)?(?:function\s*)?\(|^\s*(?:async\s+)?{0}\s*\(",
            regex::escape(name)
        ))
        .ok()?;
        let found = definition.find(&unit.code)?;
        return function_after(unit, found.start());
    }
    function_after(unit, last.start)
}

/// Recognizes Nest controller methods.
fn nest_routes(adapter: &TypeScriptAdapter, unit: &ScannedUnit) -> Vec<RouteHandler> {
    let controllers: Vec<(usize, String)> = CONTROLLER
        .captures_iter(&unit.code)
        .filter_map(|captures| {
            let all = captures.get(0)?;
            Some((all.start(), captures.get(1).map_or_else(String::new, |prefix| prefix.as_str().to_string())))
        })
        .collect();
    let mut handlers = Vec::new();
    for captures in NEST_ROUTE.captures_iter(&unit.code) {
        let (Some(all), Some(verb)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if unit.in_string(all.start()) {
            continue;
        }
        let Some(parts) = function_after(unit, all.end()) else {
            continue;
        };
        let prefix = controllers
            .iter()
            .rev()
            .find(|(at, _)| *at < all.start())
            .map_or("", |(_, prefix)| prefix.as_str());
        let path = captures.get(2).map_or("", |path| path.as_str());
        let method = if verb.as_str() == "All" { None } else { HttpMethod::parse(verb.as_str()) };
        let mut handler = RouteHandler::new(all.start(), method, join_path(prefix, path), parts.body.clone());
        let between = unit.text(all.end() .. parts.params.start);
        handler.default_status = HTTP_CODE
            .captures(between)
            .and_then(|code| code.get(1))
            .and_then(|code| status_code_of(code.as_str()));
        for param in adapter.params(unit, parts.params.clone()) {
            if param.annotations.starts_with("@Body") {
                handler.request_roots.push(BodyRoot::new(param.name.clone(), parts.body.start));
                if !param.type_text.is_empty() {
                    handler.request_model = Some(param.type_text.clone());
                }
            }
        }
        let tail = parts.signature_tail.trim_start_matches(':').trim();
        if !tail.is_empty() {
            handler.response_model = Some(tail.to_string());
        }
        handlers.push(handler);
    }
    handlers
}

// ============================================================================
// SECTION: Models
// ============================================================================

/// Collects member declarations directly inside a model body.
fn model_fields(unit: &ScannedUnit, open: usize, close: usize) -> Vec<ModelField> {
    let mut fields = Vec::new();
    let first = unit.line_of(open);
    let last = unit.line_of(close);
    let mut pending_wire: Option<String> = None;
    for line in first ..= last {
        let range = unit.line_range(line);
        let start = range.start.max(open + 1);
        let end = range.end.min(close);
        if start >= end {
            continue;
        }
        if unit.enclosing_braces(start).first().is_some_and(|(brace, _)| *brace != open) {
            continue;
        }
        let text = unit.text(start .. end);
        let wire = EXPOSE_NAME.captures(text).and_then(|captures| captures.get(1)).map(|name| name.as_str().to_string());
        let Some(captures) = MEMBER.captures(text) else {
            if wire.is_some() {
                pending_wire = wire;
            }
            continue;
        };
        let (Some(name), Some(declared)) = (captures.get(1), captures.get(3)) else {
            continue;
        };
        let (kind, nullable) = kind_from_type(Language::TypeScript, declared.as_str());
        let optional = nullable || captures.get(2).is_some_and(|mark| mark.as_str() == "?");
        let wire = wire.or_else(|| pending_wire.take());
        fields.push(ModelField {
            declared_name: name.as_str().to_string(),
            wire_name: wire.clone().unwrap_or_else(|| name.as_str().to_string()),
            explicit_wire_name: wire.is_some(),
            kind,
            optional,
            location: unit.location(start + name.start()),
        });
    }
    fields
}

// ============================================================================
// SECTION: Assertions
// ============================================================================

/// Parses the matcher chain after `expect(...)`.
///
/// Returns the chain words, the first literal argument of the last call,
/// and that call's argument count.
fn matcher_chain(unit: &ScannedUnit, from: usize) -> Option<(Vec<String>, Option<String>, usize)> {
    let mut words = Vec::new();
    let mut key = None;
    let mut arg_count = 0;
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
        if len == 0 {
            break;
        }
        words.push(unit.text(start .. start + len).to_string());
        cursor = start + len;
        if unit.byte(cursor) == Some(b'(') {
            let args = unit.call_args(cursor);
            arg_count = args.len();
            key = args.first().and_then(|first| unit.literal(first.clone()));
            let Some(close) = unit.closing(cursor) else {
                break;
            };
            cursor = close + 1;
        }
    }
    (!words.is_empty()).then_some((words, key, arg_count))
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
        let is_test = TypeScriptAdapter.is_test_path(path);
        scan_text(path, Language::TypeScript, is_test, text.to_string()).unwrap()
    }

    #[test]
    fn fetch_calls_capture_method_path_and_body_root() {
        let unit = scan(
            "web/src/api.ts",
            "export async function create(order: Order) {\n  const res = await fetch(`/orders/${order.id}`, { method: 'PUT', body: JSON.stringify(order) });\n  const data = await res.json();\n  return data.status;\n}\n",
        );
        let calls = TypeScriptAdapter.client_calls(&unit);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Some(HttpMethod::Put));
        assert_eq!(calls[0].path.as_deref(), Some("/orders/{order.id}"));
        assert_eq!(unit.text(calls[0].body.clone().unwrap()), "JSON.stringify(order)");
        assert_eq!(calls[0].roots[0].expr, "res.json()");
    }

    #[test]
    fn axios_instances_and_destructuring_are_followed() {
        let unit = scan(
            "web/src/api.ts",
            "const api = axios.create({ baseURL });\nexport async function load() {\n  const { data: order } = await api.get('/orders/1');\n  await api.post('/orders', { sku, quantity: 2 });\n  return order;\n}\n",
        );
        let calls = TypeScriptAdapter.client_calls(&unit);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, Some(HttpMethod::Get));
        assert_eq!(calls[0].roots[0].expr, "order");
        assert_eq!(calls[1].method, Some(HttpMethod::Post));
        assert!(calls[1].body.is_some());
    }

    #[test]
    fn express_routes_and_send_sites_are_recognized() {
        let unit = scan(
            "server/routes.ts",
            "const router = express.Router();\nrouter.post('/orders', async (req, res) => {\n  const { sku } = req.body;\n  if (!sku) {\n    return res.status(400).json({ error: 'sku' });\n  }\n  res.status(201).json({ order_id: id, status: 'pending' });\n});\napp.use('/api', router);\n",
        );
        let routes = TypeScriptAdapter.routes(&unit);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/api/orders");
        assert_eq!(routes[0].request_roots[0].expr, "req.body");
        let sites = TypeScriptAdapter.send_sites(&unit, &routes[0]);
        let statuses: Vec<Option<u16>> = sites.iter().map(|site| site.status).collect();
        assert_eq!(statuses, vec![Some(400), Some(201)]);
    }

    #[test]
    fn nest_controllers_prefix_routes_and_read_body_models() {
        let unit = scan(
            "server/orders.controller.ts",
            "@Controller('orders')\nexport class OrdersController {\n  @Post()\n  @HttpCode(201)\n  async create(@Body() dto: CreateOrderDto): Promise<OrderDto> {\n    return this.service.create(dto);\n  }\n}\n",
        );
        let routes = TypeScriptAdapter.routes(&unit);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/orders");
        assert_eq!(routes[0].method, Some(HttpMethod::Post));
        assert_eq!(routes[0].default_status, Some(201));
        assert_eq!(routes[0].request_model.as_deref(), Some("CreateOrderDto"));
        assert_eq!(routes[0].response_model.as_deref(), Some("Promise<OrderDto>"));
    }

    #[test]
    fn interface_members_become_model_fields() {
        let unit = scan(
            "web/src/types.ts",
            "export interface Order {\n  orderId: string;\n  stock_count?: number;\n  meta: {\n    role: string;\n  };\n}\n",
        );
        let models = TypeScriptAdapter.models(&unit, BoundarySide::Consumer);
        assert_eq!(models.len(), 1);
        let names: Vec<&str> = models[0].fields.iter().map(|field| field.wire_name.as_str()).collect();
        assert_eq!(names, vec!["orderId", "stock_count", "meta"]);
        assert!(models[0].fields[1].optional);
    }

    #[test]
    fn assertions_are_classified_by_depth() {
        let unit = scan(
            "web/src/api.test.ts",
            "it('loads', async () => {\n  expect(body.order_id).toBeDefined();\n  expect(body.status).toEqual('pending');\n  expect(body).toHaveProperty('total');\n  expect(res.status).toBe(200);\n});\n",
        );
        let cases = TypeScriptAdapter.test_cases(&unit);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "loads");
        let found = TypeScriptAdapter.assertions(&unit, cases[0].body.clone());
        let summary: Vec<(Option<&str>, AssertionDepth)> =
            found.iter().map(|item| (item.target.as_deref(), item.depth)).collect();
        assert_eq!(
            summary,
            vec![
                (Some("order_id"), AssertionDepth::Shallow),
                (Some("status"), AssertionDepth::Deep),
                (Some("total"), AssertionDepth::Shallow),
            ]
        );
    }

    #[test]
    fn body_status_fields_read_through_an_alias_stay_assertions() {
        let unit = scan(
            "web/src/orders.test.ts",
            "it('ships', async () => {\n  const res = await request(app).get('/orders/1');\n  const body = res.body;\n  expect(res.status).toBe(200);\n  expect(body.status).toBeDefined();\n});\n",
        );
        let cases = TypeScriptAdapter.test_cases(&unit);
        let found = TypeScriptAdapter.assertions(&unit, cases[0].body.clone());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].target.as_deref(), Some("status"));
        assert_eq!(found[0].depth, AssertionDepth::Shallow);
        assert_eq!(found[0].location.line, 5);
    }
}
