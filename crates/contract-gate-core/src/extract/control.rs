// crates/contract-gate-core/src/extract/control.rs
// ============================================================================
// Module: Contract Gate Control-Flow Recognition
// Description: Status branches, error-handling constructs, enum dispatch, and
//              pre-send validations.
// Purpose: Share the language-neutral control-flow recognizers used by every
//          adapter.
// Dependencies: regex, crate::core, crate::extract
// ============================================================================

//! ## Overview
//! These recognizers work on the comment-blanked text of a [`ScannedUnit`]
//! and know the handful of spellings each supported language uses for the
//! same construct: a status comparison, a `try` block, an `if err != nil`
//! check, a `switch` over a string field, a regex test before a send.
//! Results are plain data; binding them to manifest endpoints happens in the
//! adapters and in [`crate::extract::binding`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::observation::ErrorHandling;
use crate::core::observation::StatusHandling;
use crate::core::observation::ValidationCheck;
use crate::core::observation::ValidationKind;
use crate::core::source::Language;
use crate::core::source::SourceLocation;
use crate::extract::access::compact;
use crate::extract::access::decapitalize;
use crate::extract::kinds::compile;
use crate::extract::kinds::status_code_of;
use crate::extract::kinds::status_codes_in;
use crate::extract::scan::ScannedUnit;

// ============================================================================
// SECTION: Status Patterns
// ============================================================================

/// Status subject accessors.
static STATUS_SUBJECT: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"\.(?:getStatusCode\(\)(?:\.value\(\))?|getStatusCodeValue\(\)|getRawStatusCode\(\)|statusCode\(\)(?:\.value\(\))?|status_code|statusCode|StatusCode|status)\b",
    )
});

/// Literal status compared before the subject (`404 === res.status`).
static REVERSED_COMPARISON: LazyLock<Regex> =
    LazyLock::new(|| compile(r"([1-5][0-9]{2}|[\w.]*Status[\w.]*)\s*(?:===|!==|==|!=)\s*$"));

/// Boolean success accessors.
static SUCCESS_CHECK: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\.(?:ok\b|raise_for_status\(|isSuccessful\(|is2xxSuccessful\(|isSuccess\(|is_success\b)")
});

/// Status class predicates (`is4xxClientError`).
static CLASS_PREDICATE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(?:is([1-5])xx\w*|isError|is_error|is_client_error|is_server_error)\b")
});

/// Exception types carrying status classes.
static STATUS_EXCEPTION: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"\b(HttpClientErrorException|HttpServerErrorException|HttpStatusCodeException|RestClientResponseException|WebClientResponseException|HTTPError|HTTPStatusError)(?:\.(\w+))?",
    )
});

/// `case` labels in brace languages.
static CASE_LABEL: LazyLock<Regex> = LazyLock::new(|| compile(r"\bcase\s+([^:\n]+?)\s*(?::|->)"));

/// `case` labels in Python `match` blocks.
static PY_CASE_LABEL: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^\s*case\s+(.+?)\s*(?:if\s+[^:]+)?:\s*$"));

/// Default branches in brace languages.
static DEFAULT_LABEL: LazyLock<Regex> = LazyLock::new(|| compile(r"\bdefault\s*(?::|->)"));

/// Quoted literal.
static QUOTED: LazyLock<Regex> = LazyLock::new(|| compile(r#"["'`]([^"'`]*)["'`]"#));

// ============================================================================
// SECTION: Status Handling
// ============================================================================

/// Collects status checks within a consuming range.
#[must_use]
pub fn status_handling(unit: &ScannedUnit, range: Range<usize>) -> StatusHandling {
    let mut handling = StatusHandling::default();
    let text = unit.text(range.clone());
    for found in STATUS_SUBJECT.find_iter(text) {
        let at = range.start + found.start();
        let end = range.start + found.end();
        if unit.in_string(at) {
            continue;
        }
        if unit.byte(end) == Some(b'(') {
            continue;
        }
        let line_start = unit.line_range(unit.line_of(at)).start;
        let prefix = unit.text(line_start .. at);
        if let Some(captures) = REVERSED_COMPARISON.captures(prefix)
            && let Some(code) = captures.get(1).and_then(|token| status_code_of(token.as_str()))
        {
            handling.codes.insert(code);
        }
        let subject_start = expression_start(prefix);
        let before_subject = prefix.get(.. subject_start).unwrap_or("").trim_end();
        if before_subject.ends_with("switch (")
            || before_subject.ends_with("switch(")
            || before_subject.ends_with("switch")
            || before_subject.ends_with("match")
        {
            collect_case_labels(unit, end, &mut handling);
            continue;
        }
        apply_comparison(&comparison_tail(unit, end), &mut handling);
    }
    if SUCCESS_CHECK.is_match(text) {
        handling.success_check = true;
    }
    for captures in CLASS_PREDICATE.captures_iter(text) {
        match captures.get(1).and_then(|digit| digit.as_str().parse::<u16>().ok()) {
            Some(2) => handling.success_check = true,
            Some(class) => {
                handling.classes.insert(class);
            }
            None => {
                let name = captures.get(0).map_or("", |all| all.as_str());
                if name.contains("client") || name == "isError" || name == "is_error" {
                    handling.classes.insert(4);
                }
                if name.contains("server") || name == "isError" || name == "is_error" {
                    handling.classes.insert(5);
                }
            }
        }
    }
    for captures in STATUS_EXCEPTION.captures_iter(text) {
        let base = captures.get(1).map_or("", |base| base.as_str());
        if let Some(code) = captures.get(2).and_then(|name| status_code_of(name.as_str())) {
            handling.codes.insert(code);
            continue;
        }
        match base {
            "HttpClientErrorException" => {
                handling.classes.insert(4);
            }
            "HttpServerErrorException" => {
                handling.classes.insert(5);
            }
            _ => {
                handling.classes.insert(4);
                handling.classes.insert(5);
            }
        }
    }
    handling
}

/// Returns the offset within `prefix` where the trailing expression starts.
fn expression_start(prefix: &str) -> usize {
    let bytes = prefix.as_bytes();
    let mut index = bytes.len();
    let mut depth = 0_i32;
    while index > 0 {
        let byte = bytes[index - 1];
        match byte {
            b')' | b']' => depth += 1,
            b'(' | b'[' if depth > 0 => depth -= 1,
            _ if depth > 0 => {}
            b'.' | b'_' | b'$' | b'?' | b'!' => {}
            _ if byte.is_ascii_alphanumeric() => {}
            _ => break,
        }
        index -= 1;
    }
    index
}

/// Returns the comparison text following a status subject.
fn comparison_tail(unit: &ScannedUnit, from: usize) -> String {
    let mut out = String::new();
    let mut depth = 0_i32;
    let mut index = from;
    while let Some(byte) = unit.byte(index) {
        if let Some(span) = unit.string_containing(index)
            && span.start == index
        {
            out.push_str(unit.text(span.start .. span.end));
            index = span.end;
            continue;
        }
        let next = unit.byte(index + 1);
        match byte {
            b'(' | b'[' => depth += 1,
            b')' | b']' if depth == 0 => break,
            b')' | b']' => depth -= 1,
            b'&' if next == Some(b'&') => break,
            b'|' if next == Some(b'|') => break,
            b'{' | b'\n' | b';' | b'?' => break,
            b':' if depth == 0 => break,
            _ => {}
        }
        out.push(char::from(byte));
        index += 1;
    }
    out
}

/// Interprets a comparison against a status subject.
fn apply_comparison(tail: &str, handling: &mut StatusHandling) {
    let tail = tail.trim();
    for op in ["===", "!==", "==", "!=", " in ", "in ", "not in "] {
        if let Some(rest) = tail.strip_prefix(op.trim_start()) {
            handling.codes.extend(status_codes_in(rest));
            return;
        }
    }
    let (op, rest) = if let Some(rest) = tail.strip_prefix(">=") {
        (">=", rest)
    } else if let Some(rest) = tail.strip_prefix("<=") {
        ("<=", rest)
    } else if let Some(rest) = tail.strip_prefix('>') {
        (">", rest)
    } else if let Some(rest) = tail.strip_prefix('<') {
        ("<", rest)
    } else if tail.starts_with(".equals(") || tail.starts_with(".Equals(") {
        handling.codes.extend(status_codes_in(tail));
        return;
    } else {
        return;
    };
    let digits: String = rest.trim().chars().take_while(char::is_ascii_digit).collect();
    let Ok(bound) = digits.parse::<u16>() else {
        return;
    };
    match op {
        ">=" | ">" => {
            let lower = if op == ">" { bound + 1 } else { bound };
            if lower % 100 == 0 {
                handling.classes.extend(lower / 100 ..= 5);
            } else {
                handling.classes.extend(lower / 100 + 1 ..= 5);
            }
        }
        _ => {
            let upper = if op == "<" { bound.saturating_sub(1) } else { bound };
            if upper >= 299 {
                handling.success_check = true;
            }
            let top_class = (upper + 1) / 100;
            handling.classes.extend((3 .. top_class).filter(|class| *class <= 5));
        }
    }
}

/// Collects status case labels from a `switch`/`match` on a status subject.
fn collect_case_labels(unit: &ScannedUnit, subject_end: usize, handling: &mut StatusHandling) {
    let Some(body) = dispatch_body(unit, subject_end) else {
        return;
    };
    let text = unit.text(body);
    let pattern = if unit.language == Language::Python { &*PY_CASE_LABEL } else { &*CASE_LABEL };
    for captures in pattern.captures_iter(text) {
        if let Some(label) = captures.get(1) {
            handling.codes.extend(status_codes_in(label.as_str()));
        }
    }
}

/// Returns the body range of a `switch`/`match` whose subject ends at `from`.
fn dispatch_body(unit: &ScannedUnit, from: usize) -> Option<Range<usize>> {
    if unit.language == Language::Python {
        let line_start = unit.line_range(unit.line_of(from)).start;
        let colon = unit.python_header_colon(line_start)?;
        return Some(unit.python_block(line_start, colon));
    }
    let mut index = from;
    while let Some(byte) = unit.byte(index) {
        match byte {
            b'{' => return unit.closing(index).map(|close| index + 1 .. close),
            b'(' | b'[' => index = unit.closing(index)? + 1,
            b';' => return None,
            _ => index += 1,
        }
    }
    None
}

// ============================================================================
// SECTION: Error Handling
// ============================================================================

/// Decode call patterns per language.
static DECODE_TS: LazyLock<Regex> = LazyLock::new(|| compile(r"(?:\.json\(\s*\)|\bJSON\.parse\()"));
/// Decode call patterns per language.
static DECODE_PY: LazyLock<Regex> = LazyLock::new(|| compile(r"(?:\.json\(\s*\)|\bjson\.loads\(|\.model_validate(?:_json)?\(|\.parse_obj\()"));
/// Decode call patterns per language.
static DECODE_GO: LazyLock<Regex> = LazyLock::new(|| compile(r"(?:\bjson\.Unmarshal\(|\.Decode\()"));
/// Decode call patterns per language.
static DECODE_JAVA: LazyLock<Regex> = LazyLock::new(|| compile(r"\.(?:readValue|readTree|fromJson)\("));

/// Reactive or promise-chained recovery operators.
static CHAINED_RECOVERY: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\.(?:catch|onStatus|onErrorResume|onErrorReturn|onErrorMap|doOnError|exceptionally|handle)\(")
});

/// Go error assignment (`x, err :=`, `err =`).
static GO_ERR_ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?:^|[\s,(])(err|_)\s*:?=\s*[^=]"));

/// Returns the decode call pattern for a language.
#[must_use]
pub fn decode_pattern(language: Language) -> &'static Regex {
    match language {
        Language::TypeScript => &*DECODE_TS,
        Language::Python => &*DECODE_PY,
        Language::Go => &*DECODE_GO,
        Language::Java => &*DECODE_JAVA,
    }
}

/// Classifies how a fallible call spanning `call` is handled.
#[must_use]
pub fn error_handling(unit: &ScannedUnit, call: Range<usize>) -> ErrorHandling {
    match unit.language {
        Language::Python => python_handling(unit, call.start),
        Language::Go => go_handling(unit, call),
        Language::TypeScript | Language::Java => brace_handling(unit, call),
    }
}

/// TypeScript and Java handling: enclosing `try`, chained recovery, `throws`.
fn brace_handling(unit: &ScannedUnit, call: Range<usize>) -> ErrorHandling {
    for (open, _) in unit.enclosing_braces(call.start) {
        let header = unit.block_header(open);
        if header == "try" || header.starts_with("try (") || header.starts_with("try(") {
            return ErrorHandling::Recovered("try/catch".to_string());
        }
        if unit.is_function_header(header) {
            if unit.language == Language::Java && header.contains(" throws ") {
                return ErrorHandling::Propagated("throws clause".to_string());
            }
            break;
        }
    }
    let chain_end = chain_end(unit, call.end);
    if let Some(found) = CHAINED_RECOVERY.find(unit.text(call.start .. chain_end)) {
        let name = found.as_str().trim_start_matches('.').trim_end_matches('(');
        return ErrorHandling::Recovered(format!(".{name}"));
    }
    let statement = unit.statement_start(call.start);
    let line_start = unit.line_range(unit.line_of(call.start)).start;
    let lead = unit.text(statement.min(line_start) .. call.start).trim_start();
    if lead.starts_with("return ") {
        return ErrorHandling::Propagated("returned to caller".to_string());
    }
    ErrorHandling::Unhandled
}

/// Returns the end of a method chain continuing past `from`.
fn chain_end(unit: &ScannedUnit, from: usize) -> usize {
    let mut end = from;
    loop {
        let Some(next) = unit.next_non_ws(end) else {
            return end;
        };
        if unit.byte(next) != Some(b'.') {
            return end;
        }
        let mut index = next + 1;
        while unit.byte(index).is_some_and(|byte| byte.is_ascii_alphanumeric() || byte == b'_') {
            index += 1;
        }
        if unit.byte(index) == Some(b'(') {
            let Some(close) = unit.closing(index) else {
                return index;
            };
            end = close + 1;
        } else {
            end = index;
        }
    }
}

/// Python handling: enclosing `try` header.
fn python_handling(unit: &ScannedUnit, at: usize) -> ErrorHandling {
    for line in unit.python_enclosing_headers(at) {
        let text = unit.code_line(line).trim();
        if text == "try:" {
            return ErrorHandling::Recovered("try/except".to_string());
        }
        if text.starts_with("with ") && text.contains("suppress(") {
            return ErrorHandling::Recovered("contextlib.suppress".to_string());
        }
        if text.starts_with("def ") || text.starts_with("async def ") {
            break;
        }
    }
    let line_start = unit.line_range(unit.line_of(at)).start;
    if unit.text(line_start .. at).trim_start().starts_with("return ") {
        return ErrorHandling::Propagated("returned to caller".to_string());
    }
    ErrorHandling::Unhandled
}

/// Go handling: the error result must be checked.
fn go_handling(unit: &ScannedUnit, call: Range<usize>) -> ErrorHandling {
    let line = unit.line_of(call.start);
    let line_range = unit.line_range(line);
    let lead = unit.text(line_range.start .. call.start);
    let trimmed = lead.trim_start();
    if trimmed.starts_with("return ") {
        return ErrorHandling::Propagated("returned to caller".to_string());
    }
    if trimmed.starts_with("if ") {
        let rest = unit.text(call.end .. line_range.end);
        if rest.contains("err != nil") || rest.contains("; err != nil") {
            return go_check_body(unit, call.end);
        }
    }
    let Some(captures) = GO_ERR_ASSIGN.captures(lead) else {
        return ErrorHandling::Unhandled;
    };
    if captures.get(1).is_some_and(|name| name.as_str() == "_") && !lead.contains("err") {
        return ErrorHandling::Unhandled;
    }
    let scope = unit.function_scope(call.start);
    let after = call.end .. scope.end;
    let text = unit.text(after.clone());
    let Some(relative) = text.find("err != nil") else {
        return ErrorHandling::Unhandled;
    };
    go_check_body(unit, after.start + relative)
}

/// Classifies the body of an `if err != nil` check.
fn go_check_body(unit: &ScannedUnit, from: usize) -> ErrorHandling {
    let mut index = from;
    while let Some(byte) = unit.byte(index) {
        if byte == b'{' {
            let Some(close) = unit.closing(index) else {
                break;
            };
            let body = unit.text(index + 1 .. close);
            if body.contains("return") || body.contains("panic(") || body.contains("log.Fatal") || body.contains("t.Fatal") {
                return ErrorHandling::Propagated("if err != nil".to_string());
            }
            return ErrorHandling::Recovered("if err != nil".to_string());
        }
        if byte == b'\n' {
            break;
        }
        index += 1;
    }
    ErrorHandling::Recovered("if err != nil".to_string())
}

// ============================================================================
// SECTION: Enum Dispatch
// ============================================================================

/// Switch, match, or if-chain dispatch over a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Offset of the dispatch keyword.
    pub at: usize,
    /// Subject expression in compact form.
    pub subject: String,
    /// Case labels with quotes and qualifiers removed.
    pub labels: BTreeSet<String>,
    /// True when a default/else branch exists.
    pub has_default: bool,
}

impl Dispatch {
    /// Returns the field name the subject refers to (`order.getStatus()` gives `status`).
    #[must_use]
    pub fn subject_name(&self) -> String {
        subject_name(&self.subject)
    }
}

/// `switch` keyword.
static SWITCH: LazyLock<Regex> = LazyLock::new(|| compile(r"\bswitch\b"));
/// Python `match` statement.
static PY_MATCH: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^\s*match\s+(.+?):\s*$"));
/// `if` keyword.
static IF_KEYWORD: LazyLock<Regex> = LazyLock::new(|| compile(r"\bif\b"));
/// Equality against a literal or qualified constant, subject first.
static EQUALS_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"^\(?\s*([\w$.?\[\]"'()]+?)\s*(?:===|==)\s*(["'`][^"'`]*["'`]|[A-Z][\w]*\.[A-Za-z_]\w*)\s*\)?$"#)
});
/// Java `.equals` against a literal, either side.
static EQUALS_CALL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r#"^\(?\s*(?:([\w$.()]+?)\.equals\(\s*("[^"]*"|[A-Z]\w*\.\w+)\s*\)|("[^"]*"|[A-Z]\w*\.\w+)\.equals\(\s*([\w$.()]+?)\s*\))\s*\)?$"#)
});

/// Finds every dispatch construct in a unit.
#[must_use]
pub fn dispatches(unit: &ScannedUnit) -> Vec<Dispatch> {
    let mut found = if unit.language == Language::Python {
        python_matches(unit)
    } else {
        brace_switches(unit)
    };
    found.extend(if_chains(unit));
    found.retain(|dispatch| !dispatch.labels.is_empty());
    found.sort_by_key(|dispatch| dispatch.at);
    found
}

/// Returns the field name an expression refers to.
#[must_use]
pub fn subject_name(expr: &str) -> String {
    let text = compact(expr);
    let text = text.trim_end_matches("()").trim_end_matches(".value").trim_end_matches("()");
    let last = text.rsplit(['.', '>']).next().unwrap_or(text);
    let last = last.trim_matches(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_');
    for prefix in ["get", "is"] {
        if let Some(rest) = last.strip_prefix(prefix)
            && rest.chars().next().is_some_and(char::is_uppercase)
        {
            return decapitalize(rest);
        }
    }
    last.to_string()
}

/// Normalizes a case label (`"shipped"`, `Status.SHIPPED`, `'a' | 'b'`).
fn labels_of(label: &str) -> Vec<String> {
    label
        .split([',', '|'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            QUOTED.captures(part).and_then(|captures| captures.get(1)).map_or_else(
                || part.rsplit('.').next().unwrap_or(part).trim().to_string(),
                |literal| literal.as_str().to_string(),
            )
        })
        .filter(|part| !part.is_empty() && part != "_")
        .collect()
}

/// Recognizes `switch` statements in brace languages.
fn brace_switches(unit: &ScannedUnit) -> Vec<Dispatch> {
    let mut found = Vec::new();
    for keyword in SWITCH.find_iter(&unit.code) {
        let at = keyword.start();
        if unit.in_string(at) {
            continue;
        }
        let Some(start) = unit.next_non_ws(keyword.end()) else {
            continue;
        };
        let (subject, after) = if unit.byte(start) == Some(b'(') {
            let Some(close) = unit.closing(start) else {
                continue;
            };
            (unit.text(start + 1 .. close).to_string(), close + 1)
        } else {
            let Some(open) = unit.text(start .. unit.code.len()).find('{').map(|relative| start + relative)
            else {
                continue;
            };
            (unit.text(start .. open).to_string(), open)
        };
        let Some(body) = dispatch_body(unit, after) else {
            continue;
        };
        let text = unit.text(body);
        let mut labels = BTreeSet::new();
        for captures in CASE_LABEL.captures_iter(text) {
            if let Some(label) = captures.get(1) {
                labels.extend(labels_of(label.as_str()));
            }
        }
        found.push(Dispatch {
            at,
            subject: compact(subject.trim()),
            labels,
            has_default: DEFAULT_LABEL.is_match(text),
        });
    }
    found
}

/// Recognizes Python `match` statements.
fn python_matches(unit: &ScannedUnit) -> Vec<Dispatch> {
    let mut found = Vec::new();
    for captures in PY_MATCH.captures_iter(&unit.code) {
        let (Some(all), Some(subject)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let line_start = all.start() + (all.as_str().len() - all.as_str().trim_start().len());
        let Some(colon) = unit.python_header_colon(line_start) else {
            continue;
        };
        let body = unit.python_block(line_start, colon);
        let mut labels = BTreeSet::new();
        let mut has_default = false;
        for case in PY_CASE_LABEL.captures_iter(unit.text(body)) {
            let Some(label) = case.get(1) else {
                continue;
            };
            if label.as_str().trim() == "_" {
                has_default = true;
            }
            labels.extend(labels_of(label.as_str()));
        }
        found.push(Dispatch {
            at: line_start,
            subject: compact(subject.as_str()),
            labels,
            has_default,
        });
    }
    found
}

/// One arm of an if-chain.
struct Arm {
    /// Compact subject.
    subject: String,
    /// Label compared against.
    label: String,
}

/// Parses an `if` condition of the form `subject == literal`.
fn arm_of(condition: &str) -> Option<Arm> {
    let condition = condition.trim();
    if condition.contains("&&") || condition.contains("||") || condition.contains(" and ") || condition.contains(" or ") {
        return None;
    }
    if let Some(captures) = EQUALS_LITERAL.captures(condition) {
        let subject = captures.get(1)?.as_str();
        let label = labels_of(captures.get(2)?.as_str()).into_iter().next()?;
        return Some(Arm {
            subject: compact(subject),
            label,
        });
    }
    let captures = EQUALS_CALL.captures(condition)?;
    let (subject, label) = match (captures.get(1), captures.get(2), captures.get(3), captures.get(4)) {
        (Some(subject), Some(label), _, _) | (_, _, Some(label), Some(subject)) => {
            (subject.as_str(), label.as_str())
        }
        _ => return None,
    };
    Some(Arm {
        subject: compact(subject),
        label: labels_of(label).into_iter().next()?,
    })
}

/// Recognizes `if`/`else if`/`else` chains comparing one subject to literals.
fn if_chains(unit: &ScannedUnit) -> Vec<Dispatch> {
    if unit.language == Language::Python {
        return python_if_chains(unit);
    }
    let mut found = Vec::new();
    let mut consumed: BTreeSet<usize> = BTreeSet::new();
    for keyword in IF_KEYWORD.find_iter(&unit.code) {
        let at = keyword.start();
        if unit.in_string(at) || consumed.contains(&at) {
            continue;
        }
        let mut arms = Vec::new();
        let mut has_default = false;
        let mut cursor = at;
        loop {
            consumed.insert(cursor);
            let Some((condition, body_end)) = if_parts(unit, cursor) else {
                break;
            };
            let Some(arm) = arm_of(&condition) else {
                break;
            };
            arms.push(arm);
            let Some(next) = unit.next_non_ws(body_end) else {
                break;
            };
            let rest = unit.text(next .. unit.code.len());
            let Some(after_else) = rest.strip_prefix("else") else {
                break;
            };
            let Some(following) = unit.next_non_ws(next + 4) else {
                break;
            };
            if after_else.trim_start().starts_with("if") {
                cursor = following;
                continue;
            }
            has_default = true;
            break;
        }
        let Some(first) = arms.first() else {
            continue;
        };
        if arms.len() < 2 || arms.iter().any(|arm| arm.subject != first.subject) {
            continue;
        }
        found.push(Dispatch {
            at,
            subject: first.subject.clone(),
            labels: arms.iter().map(|arm| arm.label.clone()).collect(),
            has_default,
        });
    }
    found
}

/// Returns the condition and body end of a brace-language `if` at `at`.
fn if_parts(unit: &ScannedUnit, at: usize) -> Option<(String, usize)> {
    let start = unit.next_non_ws(at + 2)?;
    let (condition, after) = if unit.byte(start) == Some(b'(') && unit.language != Language::Go {
        let close = unit.closing(start)?;
        (unit.text(start + 1 .. close).to_string(), close + 1)
    } else {
        let open = start + unit.text(start .. unit.code.len()).find('{')?;
        (unit.text(start .. open).to_string(), open)
    };
    let body_start = unit.next_non_ws(after)?;
    let body_end = if unit.byte(body_start) == Some(b'{') {
        unit.closing(body_start)? + 1
    } else {
        unit.statement_end(body_start) + 1
    };
    Some((condition, body_end))
}

/// Recognizes Python `if`/`elif`/`else` chains.
fn python_if_chains(unit: &ScannedUnit) -> Vec<Dispatch> {
    let mut found = Vec::new();
    let mut line = 1;
    let total = unit.line_count();
    while line <= total {
        let text = unit.code_line(line).trim_start();
        let Some(condition) = text.strip_prefix("if ") else {
            line += 1;
            continue;
        };
        let indent = unit.indent_of(line);
        let start = unit.line_range(line).start;
        let mut arms: Vec<Arm> = arm_of(condition.trim_end().trim_end_matches(':')).into_iter().collect();
        let mut has_default = false;
        let mut next = line + 1;
        while next <= total && !arms.is_empty() {
            let candidate = unit.code_line(next);
            if candidate.trim().is_empty() || unit.indent_of(next) > indent {
                next += 1;
                continue;
            }
            if unit.indent_of(next) < indent {
                break;
            }
            let trimmed = candidate.trim_start();
            if let Some(condition) = trimmed.strip_prefix("elif ") {
                match arm_of(condition.trim_end().trim_end_matches(':')) {
                    Some(arm) => arms.push(arm),
                    None => break,
                }
                next += 1;
                continue;
            }
            if trimmed.starts_with("else:") {
                has_default = true;
            }
            break;
        }
        if let Some(first) = arms.first()
            && arms.len() >= 2
            && arms.iter().all(|arm| arm.subject == first.subject)
        {
            found.push(Dispatch {
                at: start,
                subject: first.subject.clone(),
                labels: arms.iter().map(|arm| arm.label.clone()).collect(),
                has_default,
            });
        }
        line = next.max(line + 1);
    }
    found
}

// ============================================================================
// SECTION: Validations
// ============================================================================

/// Numeric comparison with the subject first.
static RANGE_FORWARD: LazyLock<Regex> =
    LazyLock::new(|| compile(r"([A-Za-z_$][\w$.]*(?:\(\))?)\s*(?:<=|>=|<|>)\s*(-?[0-9]+(?:\.[0-9]+)?)\b"));
/// Numeric comparison with the number first.
static RANGE_REVERSED: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(-?[0-9]+(?:\.[0-9]+)?)\s*(?:<=|>=|<|>)\s*([A-Za-z_$][\w$.]*(?:\(\))?)"));
/// Format validators and the value they test.
static FORMAT_CHECKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\.test\(\s*([\w$.()]+?)\s*\)",
        r"\bre\.(?:match|fullmatch|search)\([^,]+,\s*([\w.()]+?)\s*[,)]",
        r"\.(?:match|fullmatch|search)\(\s*([\w.()]+?)\s*\)",
        r"\.MatchString\(\s*([\w.()]+?)\s*\)",
        r"\.matcher\(\s*([\w.()]+?)\s*\)\.matches\(\)",
        r"\bPattern\.matches\([^,]+,\s*([\w.()]+?)\s*\)",
        r"\b(?:isEmail|isUUID|isURL|isISO8601|isDate|validate_email|is_valid_email|isValidEmail|isValidUuid)\(\s*([\w$.()]+?)\s*[,)]",
        r"\b(?:validator|EmailValidator|z\.string\(\)\.\w+\(\))\.\w+\(\s*([\w$.()]+?)\s*[,)]",
        r"\buuid\.(?:Parse|MustParse|UUID)\(\s*([\w.()]+?)\s*\)",
        r"\bUUID\.fromString\(\s*([\w.()]+?)\s*\)",
        r"\bDate\.parse\(\s*([\w$.()]+?)\s*\)",
        r"\bfromisoformat\(\s*([\w.()]+?)\s*\)",
        r"\btime\.Parse\([^,]+,\s*([\w.()]+?)\s*\)",
        r"\b(?:LocalDate|LocalDateTime|OffsetDateTime|Instant)\.parse\(\s*([\w.()]+?)\s*\)",
        r"\bmail\.ParseAddress\(\s*([\w.()]+?)\s*\)",
        r"\burl\.Parse(?:RequestURI)?\(\s*([\w.()]+?)\s*\)",
        r"\bURI\.create\(\s*([\w.()]+?)\s*\)",
    ]
    .into_iter()
    .map(compile)
    .collect()
});
/// Presence checks.
static REQUIRED_CHECKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bif\s*\(\s*!\s*([\w$.()]+?)\s*\)",
        r"\bif\s+not\s+([\w.()]+?)\s*:",
        r#"\b([\w$.()]+?)\s*(?:===|==)\s*(?:""|''|null|undefined|None|nil)\b"#,
        r"\b([\w.()]+?)\s+is\s+None\b",
        r"\bObjects\.requireNonNull\(\s*([\w.()]+?)\s*[,)]",
        r"\bassert\s+([\w.()]+?)\s*(?:,|$)",
    ]
    .into_iter()
    .map(compile)
    .collect()
});
/// Membership checks: (values, subject) capture order.
static ONE_OF_CHECKS: LazyLock<Vec<(Regex, usize, usize)>> = LazyLock::new(|| {
    vec![
        (compile(r"\[([^\[\]]*)\]\.includes\(\s*([\w$.()]+?)\s*\)"), 1, 2),
        (compile(r"\b([\w.()]+?)\s+in\s+[\(\[\{]([^()\[\]{}]*)[\)\]\}]"), 2, 1),
        (compile(r"\b(?:Set|List)\.of\(([^()]*)\)\.contains\(\s*([\w.()]+?)\s*\)"), 1, 2),
        (compile(r"\bslices\.Contains\(\s*\[\]string\{([^{}]*)\},\s*([\w.()]+?)\s*\)"), 1, 2),
    ]
});

/// Collects validations performed within a range before a send.
#[must_use]
pub fn validations(unit: &ScannedUnit, range: Range<usize>) -> Vec<ValidationCheck> {
    let mut checks: Vec<ValidationCheck> = Vec::new();
    let first = unit.line_of(range.start);
    let last = unit.line_of(range.end);
    for line in first ..= last {
        let text = unit.code_line(line);
        let trimmed = text.trim_start();
        let conditional = trimmed.starts_with("if")
            || trimmed.starts_with("elif")
            || trimmed.starts_with("} else if")
            || trimmed.starts_with("assert")
            || trimmed.starts_with("require")
            || trimmed.starts_with("Objects.")
            || trimmed.contains("throw ")
            || trimmed.contains("raise ");
        let location = unit.location(unit.line_range(line).start);
        if conditional {
            collect_ranges(text, &location, &mut checks);
            for pattern in REQUIRED_CHECKS.iter() {
                for captures in pattern.captures_iter(text) {
                    if let Some(subject) = captures.get(1) {
                        push_check(&mut checks, subject.as_str(), ValidationKind::Required, &location);
                    }
                }
            }
        }
        for pattern in FORMAT_CHECKS.iter() {
            for captures in pattern.captures_iter(text) {
                if let Some(subject) = captures.get(1) {
                    push_check(&mut checks, subject.as_str(), ValidationKind::Format, &location);
                }
            }
        }
        for (pattern, values_group, subject_group) in ONE_OF_CHECKS.iter() {
            for captures in pattern.captures_iter(text) {
                let (Some(values), Some(subject)) = (captures.get(*values_group), captures.get(*subject_group))
                else {
                    continue;
                };
                let members: Vec<String> = QUOTED
                    .captures_iter(values.as_str())
                    .filter_map(|member| member.get(1).map(|found| found.as_str().to_string()))
                    .collect();
                if !members.is_empty() {
                    push_check(&mut checks, subject.as_str(), ValidationKind::OneOf {
                        values: members,
                    }, &location);
                }
            }
        }
    }
    checks
}

/// Collects numeric range comparisons from one line.
fn collect_ranges(text: &str, location: &SourceLocation, checks: &mut Vec<ValidationCheck>) {
    let mut pairs: Vec<(String, f64)> = Vec::new();
    for captures in RANGE_FORWARD.captures_iter(text) {
        if let (Some(subject), Some(bound)) = (captures.get(1), captures.get(2))
            && let Ok(value) = bound.as_str().parse::<f64>()
        {
            pairs.push((subject.as_str().to_string(), value));
        }
    }
    for captures in RANGE_REVERSED.captures_iter(text) {
        if let (Some(bound), Some(subject)) = (captures.get(1), captures.get(2))
            && let Ok(value) = bound.as_str().parse::<f64>()
        {
            pairs.push((subject.as_str().to_string(), value));
        }
    }
    for (subject, bound) in pairs {
        let field = subject_name(&subject);
        if field.is_empty() || field == "length" || field == "len" || field == "size" {
            continue;
        }
        if let Some(existing) = checks.iter_mut().find(|check| {
            check.field == field && matches!(check.kind, ValidationKind::Range { .. })
        }) && let ValidationKind::Range {
            bounds,
        } = &mut existing.kind
        {
            if !bounds.contains(&bound) {
                bounds.push(bound);
            }
            continue;
        }
        checks.push(ValidationCheck {
            field,
            kind: ValidationKind::Range {
                bounds: vec![bound],
            },
            location: location.clone(),
        });
    }
}

/// Appends a check unless an identical one exists.
fn push_check(
    checks: &mut Vec<ValidationCheck>,
    subject: &str,
    kind: ValidationKind,
    location: &SourceLocation,
) {
    let field = subject_name(subject);
    if field.is_empty() {
        return;
    }
    let check = ValidationCheck {
        field,
        kind,
        location: location.clone(),
    };
    if !checks.contains(&check) {
        checks.push(check);
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

    fn scan(language: Language, text: &str) -> ScannedUnit {
        scan_text("unit", language, false, text.to_string()).unwrap()
    }

    fn whole(unit: &ScannedUnit) -> Range<usize> {
        0 .. unit.code.len()
    }

    #[test]
    fn status_comparisons_collect_codes_and_classes() {
        let unit = scan(
            Language::TypeScript,
            "async function f() {\n  const res = await fetch('/x');\n  if (res.status === 404) { return null; }\n  if (res.status >= 500) { throw new Error('x'); }\n  if (!res.ok) { throw new Error('y'); }\n}\n",
        );
        let handling = status_handling(&unit, whole(&unit));
        assert!(handling.codes.contains(&404));
        assert!(handling.classes.contains(&5));
        assert!(handling.success_check);
        assert!(!handling.covers(401));
    }

    #[test]
    fn status_switch_and_python_membership() {
        let unit = scan(
            Language::Go,
            "func f(resp *http.Response) {\n\tswitch resp.StatusCode {\n\tcase http.StatusOK:\n\t\treturn\n\tcase 401, 403:\n\t\treturn\n\t}\n}\n",
        );
        let handling = status_handling(&unit, whole(&unit));
        assert_eq!(handling.codes.iter().copied().collect::<Vec<_>>(), vec![200, 401, 403]);

        let unit = scan(
            Language::Python,
            "def f():\n    r = requests.get(url)\n    if r.status_code in (400, 422):\n        return None\n",
        );
        let handling = status_handling(&unit, whole(&unit));
        assert!(handling.codes.contains(&400) && handling.codes.contains(&422));
    }

    #[test]
    fn java_exceptions_and_predicates_cover_classes() {
        let unit = scan(
            Language::Java,
            "class C {\n  void f() {\n    try {\n      rest.getForObject(url, T.class);\n    } catch (HttpClientErrorException.NotFound e) {\n    } catch (HttpServerErrorException e) {\n    }\n  }\n}\n",
        );
        let handling = status_handling(&unit, whole(&unit));
        assert!(handling.codes.contains(&404));
        assert!(handling.classes.contains(&5));
    }

    #[test]
    fn error_handling_constructs_are_classified() {
        let unit = scan(
            Language::TypeScript,
            "async function f() {\n  try {\n    await fetch('/a');\n  } catch (e) {}\n  await fetch('/b');\n  return fetch('/c');\n}\n",
        );
        let call = |needle: &str| {
            let start = unit.code.find(needle).unwrap();
            start .. start + needle.len()
        };
        assert_eq!(error_handling(&unit, call("fetch('/a')")), ErrorHandling::Recovered("try/catch".to_string()));
        assert_eq!(error_handling(&unit, call("fetch('/b')")), ErrorHandling::Unhandled);
        assert!(matches!(error_handling(&unit, call("fetch('/c')")), ErrorHandling::Propagated(_)));
    }

    #[test]
    fn go_error_checks_are_classified() {
        let unit = scan(
            Language::Go,
            "func f() error {\n\tresp, err := client.Do(req)\n\tif err != nil {\n\t\treturn err\n\t}\n\tdata, _ := io.ReadAll(resp.Body)\n\t_ = data\n\treturn nil\n}\n",
        );
        let start = unit.code.find("client.Do(req)").unwrap();
        let handling = error_handling(&unit, start .. start + "client.Do(req)".len());
        assert!(matches!(handling, ErrorHandling::Propagated(_)));
    }

    #[test]
    fn switch_and_if_chain_dispatch_are_found() {
        let unit = scan(
            Language::TypeScript,
            "function f(order) {\n  switch (order.status) {\n    case 'pending': return 1;\n    case 'shipped': return 2;\n  }\n  if (order.kind === 'a') { x(); } else if (order.kind === 'b') { y(); } else { z(); }\n}\n",
        );
        let found = dispatches(&unit);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].subject_name(), "status");
        assert!(!found[0].has_default);
        assert_eq!(found[0].labels.len(), 2);
        assert_eq!(found[1].subject_name(), "kind");
        assert!(found[1].has_default);
    }

    #[test]
    fn python_match_reports_default() {
        let unit = scan(
            Language::Python,
            "def f(order):\n    match order[\"status\"]:\n        case \"pending\":\n            return 1\n        case _:\n            return 0\n",
        );
        let found = dispatches(&unit);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].subject_name(), "status");
        assert!(found[0].has_default);
        assert!(found[0].labels.contains("pending"));
    }

    #[test]
    fn validations_are_recognized() {
        let unit = scan(
            Language::TypeScript,
            "function f(quantity, email, kind) {\n  if (quantity < 1 || quantity > 100) throw new Error('q');\n  if (!/^[^@]+@[^@]+$/.test(email)) throw new Error('e');\n  if (!['a', 'b'].includes(kind)) throw new Error('k');\n}\n",
        );
        let checks = validations(&unit, whole(&unit));
        let range = checks.iter().find(|check| check.field == "quantity").unwrap();
        assert_eq!(range.kind, ValidationKind::Range {
            bounds: vec![1.0, 100.0]
        });
        assert!(checks.iter().any(|check| check.field == "email" && check.kind == ValidationKind::Format));
        assert!(checks.iter().any(|check| check.field == "kind"
            && check.kind
                == ValidationKind::OneOf {
                    values: vec!["a".to_string(), "b".to_string()]
                }));
    }
}
