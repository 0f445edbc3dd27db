// crates/contract-gate-core/src/extract/access.rs
// ============================================================================
// Module: Contract Gate Field Access Analysis
// Description: Access-chain parsing, body-root aliasing, and null-guard detection.
// Purpose: Record which response fields a consumer reads and whether each
//          dereference of a nullable prefix is guarded.
// Dependencies: regex, crate::core, crate::extract
// ============================================================================

//! ## Overview
//! A *body root* is an expression known to hold a decoded body (`data`,
//! `res.data`, `r.json()`, `resp.getBody()`). Every occurrence of a root in
//! scope is followed by an access chain (`.x`, `?.x`, `["x"]`, `.get("x")`,
//! `getX()`), which becomes a [`FieldRead`]. Simple aliases
//! (`const meta = data.app_metadata`) and destructuring become new roots.
//!
//! A dereference of prefix `E` is guarded when:
//! - it uses optional chaining or a defaulted `.get("k", {})`;
//! - `E` is tested positively earlier in the same statement (`E && E.x`);
//! - an enclosing `if`/`while` condition tests `E` positively;
//! - an earlier `if` in the same or an outer block exits when `E` is absent.
//!
//! Expressions are compared in a compact form: insignificant whitespace is
//! dropped, `?.` becomes `.`, and `["k"]`/`.get("k")` become `.k`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::observation::FieldRead;
use crate::core::source::Language;
use crate::extract::kinds::compile;
use crate::extract::scan::ScannedUnit;
use crate::extract::scan::is_ident_byte;

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// Java methods that are never record accessors.
const JAVA_NON_ACCESSORS: &[&str] = &[
    "toString",
    "hashCode",
    "size",
    "length",
    "isEmpty",
    "isPresent",
    "stream",
    "iterator",
    "keySet",
    "values",
    "entrySet",
    "orElseThrow",
    "block",
    "build",
    "trim",
    "toLowerCase",
    "toUpperCase",
    "asText",
    "asInt",
    "asLong",
    "asDouble",
    "asBoolean",
];

/// Alias assignment left-hand side (line prefix before the root).
static ALIAS_LHS: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"^\s*(?:(?:const|let|var|final|val)\s+)?(?:[\w<>\[\].?]+\s+)?([A-Za-z_$][\w$]*)\s*(?::\s*[^=]+)?\s*:?=\s*(?:await\s+)?$",
    )
});

/// Destructuring left-hand side (line prefix before the root).
static DESTRUCTURE_LHS: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^\s*(?:const|let|var)\s*\{([^{}]*)\}\s*(?::[^=]+)?=\s*(?:await\s+)?$")
});

/// Bracketed string key.
static BRACKET_KEY: LazyLock<Regex> = LazyLock::new(|| compile(r#"\[["']([\w\-]+)["']\]"#));

/// `.get("k")` with or without a default.
static GET_KEY: LazyLock<Regex> = LazyLock::new(|| compile(r#"\.get\(["']([\w\-]+)["'](?:,[^()]*(?:\([^()]*\))?)?\)"#));

/// Python `is not None` / `is None` / `not`.
static PY_IS_NOT_NONE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+is\s+not\s+None\b"));
/// Python `is None`.
static PY_IS_NONE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+is\s+None\b"));
/// Python `not` prefix.
static PY_NOT: LazyLock<Regex> = LazyLock::new(|| compile(r"\bnot\s+"));
/// Python boolean operators.
static PY_AND: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+and\s+"));
/// Python boolean operators.
static PY_OR: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+or\s+"));

/// Statements that leave the current block.
static EXIT: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(?:return|throw|raise|continue|break|panic|abort|os\.Exit|log\.Fatal\w*|t\.Fatal\w*|t\.Skip\w*)\b")
});

/// `if` keyword.
static IF_KEYWORD: LazyLock<Regex> = LazyLock::new(|| compile(r"\bif\b"));

/// Null-sentinel comparisons that negate a test.
const NULL_TESTS: &[&str] =
    &["==null", "===null", "==undefined", "===undefined", "==None", "==nil", "==NULL"];

/// Operators after a positive test that guard a later dereference.
const GUARD_FOLLOWERS: &[&str] = &["&&", "!=", ")", ":", "?"];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Expression known to hold a decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyRoot {
    /// Root expression as written (`data`, `res.data`, `r.json()`).
    pub expr: String,
    /// Field path the root already points at.
    pub base: Vec<String>,
    /// Reads count only after this offset.
    pub from: usize,
    /// True when the root itself is known non-null (alias with a default).
    pub guarded: bool,
}

impl BodyRoot {
    /// Creates a root for a whole body.
    #[must_use]
    pub fn new(expr: impl Into<String>, from: usize) -> Self {
        Self {
            expr: expr.into(),
            base: Vec::new(),
            from,
            guarded: false,
        }
    }
}

/// One segment of an access chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Field name.
    pub name: String,
    /// Offset one past the segment text.
    pub end: usize,
    /// True when the segment is reached through optional chaining.
    pub optional: bool,
    /// True when the segment's value is defaulted (`.get("k", {})`, `.path("k")`).
    pub defaulted: bool,
}

// ============================================================================
// SECTION: Chain Parsing
// ============================================================================

/// Parses an access chain starting right after a root expression.
#[must_use]
pub fn parse_chain(unit: &ScannedUnit, from: usize) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = from;
    loop {
        let Some(next) = unit.next_non_ws(cursor) else {
            break;
        };
        if next != cursor && unit.byte(next) != Some(b'.') && unit.byte(next) != Some(b'?') {
            break;
        }
        let (optional, start) = match (unit.byte(next), unit.byte(next + 1)) {
            (Some(b'?'), Some(b'.')) => (true, next + 2),
            (Some(b'!'), Some(b'.')) => (false, next + 2),
            (Some(b'.'), Some(byte)) if byte != b'.' => (false, next + 1),
            (Some(b'['), _) if next == cursor => (false, next),
            _ => break,
        };
        if unit.byte(start) == Some(b'[') {
            let Some(close) = unit.closing(start) else {
                break;
            };
            let inner = start + 1 .. close;
            if let Some(key) = unit.literal(inner.clone()) {
                segments.push(Segment {
                    name: key,
                    end: close + 1,
                    optional,
                    defaulted: false,
                });
            } else if !unit.text(inner).trim().chars().all(|ch| ch.is_ascii_digit()) {
                break;
            }
            cursor = close + 1;
            continue;
        }
        let len = unit.code.as_bytes().get(start ..).map_or(0, |rest| {
            rest.iter().take_while(|byte| is_ident_byte(**byte)).count()
        });
        if len == 0 {
            break;
        }
        let ident = unit.text(start .. start + len).to_string();
        let after = start + len;
        if unit.byte(after) == Some(b'(') {
            let Some(segment) = method_segment(unit, &ident, after, optional) else {
                break;
            };
            cursor = segment.end;
            segments.push(segment);
            continue;
        }
        segments.push(Segment {
            name: ident,
            end: after,
            optional,
            defaulted: false,
        });
        cursor = after;
    }
    segments
}

/// Interprets a method call inside an access chain.
fn method_segment(unit: &ScannedUnit, ident: &str, open: usize, optional: bool) -> Option<Segment> {
    let close = unit.closing(open)?;
    let args = unit.call_args(open);
    let segment = |name: String, defaulted: bool| Segment {
        name,
        end: close + 1,
        optional,
        defaulted,
    };
    match unit.language {
        Language::Python if ident == "get" => {
            let key = unit.literal(args.first()?.clone())?;
            Some(segment(key, args.len() >= 2))
        }
        Language::Java => {
            if (ident == "get" || ident == "path") && args.len() == 1 {
                let key = unit.literal(args.first()?.clone())?;
                return Some(segment(key, ident == "path"));
            }
            if !args.is_empty() {
                return None;
            }
            if let Some(rest) = accessor_suffix(ident, "get").or_else(|| accessor_suffix(ident, "is")) {
                return Some(segment(decapitalize(rest), false));
            }
            let is_accessor = ident.chars().next().is_some_and(char::is_lowercase)
                && !JAVA_NON_ACCESSORS.contains(&ident);
            is_accessor.then(|| segment(ident.to_string(), false))
        }
        _ => None,
    }
}

/// Returns the property part of a `getX`/`isX` accessor.
fn accessor_suffix<'a>(ident: &'a str, prefix: &str) -> Option<&'a str> {
    ident.strip_prefix(prefix).filter(|rest| rest.chars().next().is_some_and(char::is_uppercase))
}

/// Lowercases the first character.
#[must_use]
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| first.to_ascii_lowercase().to_string() + chars.as_str())
}

// ============================================================================
// SECTION: Reads
// ============================================================================

/// Collects field reads through the given roots within a scope.
///
/// Aliases and destructured locals discovered along the way become
/// additional roots; expansion stops after a few rounds.
#[must_use]
pub fn body_reads(unit: &ScannedUnit, roots: Vec<BodyRoot>, scope: Range<usize>) -> Vec<FieldRead> {
    let mut reads: Vec<FieldRead> = Vec::new();
    let mut seen_roots: BTreeSet<String> = roots.iter().map(|root| root.expr.clone()).collect();
    let mut pending = roots;
    for _ in 0 .. 4 {
        let mut discovered = Vec::new();
        for root in &pending {
            collect_root(unit, root, scope.clone(), &mut reads, &mut discovered);
        }
        discovered.retain(|root| seen_roots.insert(root.expr.clone()));
        if discovered.is_empty() {
            break;
        }
        pending = discovered;
    }
    let mut seen = BTreeSet::new();
    reads.retain(|read| seen.insert((read.path.clone(), read.location.line)));
    reads
}

/// Collects reads through one root.
fn collect_root(
    unit: &ScannedUnit,
    root: &BodyRoot,
    scope: Range<usize>,
    reads: &mut Vec<FieldRead>,
    discovered: &mut Vec<BodyRoot>,
) {
    let start = scope.start.max(root.from);
    if start >= scope.end || root.expr.is_empty() {
        return;
    }
    let expr_len = root.expr.len();
    let occurrences: Vec<usize> = unit
        .text(start .. scope.end)
        .match_indices(root.expr.as_str())
        .map(|(relative, _)| start + relative)
        .collect();
    for at in occurrences {
        if unit.in_string(at) || !root_boundary(unit, at, expr_len) {
            continue;
        }
        let chain_start = at + expr_len;
        let segments = parse_chain(unit, chain_start);
        let chain_end = segments.last().map_or(chain_start, |segment| segment.end);
        let mut path = root.base.clone();
        path.extend(segments.iter().map(|segment| segment.name.clone()));
        detect_alias(unit, at, chain_end, &path, discovered, reads);
        if segments.is_empty() || is_assignment_target(unit, chain_end) {
            continue;
        }
        let guards = chain_guards(unit, root, at, &segments, &path);
        reads.push(FieldRead {
            path,
            guards,
            location: unit.location(at),
        });
    }
}

/// Returns true when the root occurrence is not part of a longer identifier.
fn root_boundary(unit: &ScannedUnit, at: usize, len: usize) -> bool {
    let last_is_ident = unit.byte(at + len - 1).is_some_and(is_ident_byte);
    let after_ok = !last_is_ident || unit.byte(at + len).is_none_or(|byte| !is_ident_byte(byte));
    let before_ok =
        at == 0 || unit.byte(at - 1).is_none_or(|byte| !is_ident_byte(byte) && byte != b'.');
    before_ok && after_ok
}

/// Returns true when a chain is the target of an assignment.
fn is_assignment_target(unit: &ScannedUnit, chain_end: usize) -> bool {
    let Some(next) = unit.next_non_ws(chain_end) else {
        return false;
    };
    unit.byte(next) == Some(b'=') && !matches!(unit.byte(next + 1), Some(b'=' | b'>'))
}

/// Computes per-prefix guard flags for one read.
fn chain_guards(
    unit: &ScannedUnit,
    root: &BodyRoot,
    at: usize,
    segments: &[Segment],
    path: &[String],
) -> Vec<bool> {
    let base = root.base.len();
    let scope = unit.function_scope(at);
    (0 .. path.len())
        .map(|index| {
            if index + 1 == path.len() {
                return false;
            }
            if index + 1 < base {
                return true;
            }
            if index + 1 == base {
                return root.guarded || is_guarded(unit, at, &root.expr, scope.clone());
            }
            let offset = index - base;
            let Some(segment) = segments.get(offset) else {
                return false;
            };
            if segment.defaulted || segments.get(offset + 1).is_some_and(|next| next.optional) {
                return true;
            }
            is_guarded(unit, at, unit.text(at .. segment.end), scope.clone())
        })
        .collect()
}

/// Registers aliases and destructured locals bound to a chain.
fn detect_alias(
    unit: &ScannedUnit,
    at: usize,
    chain_end: usize,
    path: &[String],
    discovered: &mut Vec<BodyRoot>,
    reads: &mut Vec<FieldRead>,
) {
    let line = unit.line_of(at);
    let line_range = unit.line_range(line);
    let prefix = unit.text(line_range.start .. at);
    let tail = unit.text(chain_end .. line_range.end.max(chain_end)).trim();
    let defaulted = tail.starts_with("??") || tail.starts_with("||") || tail.starts_with("or ");
    if !(tail.is_empty() || tail == ";" || defaulted) {
        return;
    }
    if let Some(captures) = DESTRUCTURE_LHS.captures(prefix)
        && let Some(entries) = captures.get(1)
    {
        for entry in entries.as_str().split(',') {
            let entry = entry.split('=').next().unwrap_or(entry).trim();
            if entry.is_empty() || entry.starts_with("...") {
                continue;
            }
            let (key, local) = entry.split_once(':').map_or((entry, entry), |(key, local)| (key.trim(), local.trim()));
            let mut field_path = path.to_vec();
            field_path.push(key.to_string());
            reads.push(FieldRead {
                path: field_path.clone(),
                guards: vec![false; field_path.len()],
                location: unit.location(at),
            });
            discovered.push(BodyRoot {
                expr: local.to_string(),
                base: field_path,
                from: chain_end,
                guarded: false,
            });
        }
        return;
    }
    if let Some(captures) = ALIAS_LHS.captures(prefix)
        && let Some(name) = captures.get(1)
    {
        discovered.push(BodyRoot {
            expr: name.as_str().to_string(),
            base: path.to_vec(),
            from: chain_end,
            guarded: defaulted,
        });
    }
}

// ============================================================================
// SECTION: Guards
// ============================================================================

/// Returns true when dereferencing `prefix` at `access` is guarded.
#[must_use]
pub fn is_guarded(unit: &ScannedUnit, access: usize, prefix: &str, scope: Range<usize>) -> bool {
    let target = compact(prefix);
    if target.is_empty() {
        return false;
    }
    let statement = compact(unit.text(unit.statement_start(access) .. access));
    if guarded_in_statement(&statement, &target) {
        return true;
    }
    let tail = compact(unit.text(access .. unit.statement_end(access)));
    if let Some(index) = tail.find(" if ")
        && has_positive(&tail[index + 4 ..], &target)
    {
        return true;
    }
    if enclosing_conditions(unit, access).iter().any(|condition| has_positive(&compact(condition), &target)) {
        return true;
    }
    exits_early(unit, access, scope, &target)
}

/// Compacts an expression for textual comparison.
#[must_use]
pub fn compact(text: &str) -> String {
    let text = PY_IS_NOT_NONE.replace_all(text, "!=None");
    let text = PY_IS_NONE.replace_all(&text, "==None");
    let text = PY_NOT.replace_all(&text, "!");
    let text = PY_AND.replace_all(&text, "&&");
    let text = PY_OR.replace_all(&text, "||");
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space
            && out.chars().last().is_some_and(is_ident_char)
            && is_ident_char(ch)
        {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    let out = out.replace("?.", ".").replace("!.", ".");
    let out = BRACKET_KEY.replace_all(&out, ".$1");
    GET_KEY.replace_all(&out, ".$1").into_owned()
}

/// Identifier character test for compacted text.
fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

/// Returns the offsets where `target` occurs on an identifier boundary.
fn occurrences(text: &str, target: &str) -> Vec<usize> {
    text.match_indices(target)
        .map(|(index, _)| index)
        .filter(|index| {
            *index == 0
                || text[.. *index]
                    .chars()
                    .last()
                    .is_none_or(|ch| !is_ident_char(ch) && ch != '.')
        })
        .filter(|index| {
            text[index + target.len() ..].chars().next().is_none_or(|ch| !is_ident_char(ch))
        })
        .collect()
}

/// Returns true when an occurrence is negated (`!E`, `E == null`).
fn is_negated(text: &str, index: usize, target: &str) -> bool {
    let before = &text[.. index];
    let after = &text[index + target.len() ..];
    let bang = before.ends_with('!') && !before.ends_with("!!");
    bang || NULL_TESTS.iter().any(|test| after.starts_with(test))
}

/// Returns true when `text` tests `target` positively.
fn has_positive(text: &str, target: &str) -> bool {
    occurrences(text, target).into_iter().any(|index| !is_negated(text, index, target))
}

/// Returns true when `text` tests `target` negatively.
fn has_negative(text: &str, target: &str) -> bool {
    occurrences(text, target).into_iter().any(|index| is_negated(text, index, target))
        || text.contains(&format!("isNull({target})"))
}

/// Returns true when the statement prefix guards `target`.
fn guarded_in_statement(statement: &str, target: &str) -> bool {
    occurrences(statement, target).into_iter().any(|index| {
        if is_negated(statement, index, target) {
            return false;
        }
        let after = &statement[index + target.len() ..];
        let follows = GUARD_FOLLOWERS.iter().any(|op| after.starts_with(op)) && !after.starts_with("??");
        follows || after.starts_with('.')
    })
}

/// Returns the conditions of enclosing `if`/`while` blocks, innermost first.
fn enclosing_conditions(unit: &ScannedUnit, access: usize) -> Vec<String> {
    let mut conditions = Vec::new();
    if unit.language == Language::Python {
        for line in unit.python_enclosing_headers(access) {
            let text = unit.code_line(line).trim();
            if text.starts_with("def ") || text.starts_with("async def ") {
                break;
            }
            for keyword in ["if ", "elif ", "while "] {
                if let Some(rest) = text.strip_prefix(keyword) {
                    conditions.push(rest.trim_end_matches(':').to_string());
                }
            }
        }
        return conditions;
    }
    for (open, _) in unit.enclosing_braces(access) {
        let header = unit.block_header(open);
        if unit.is_function_header(header) {
            break;
        }
        let header = header.trim_start_matches('}').trim_start();
        let header = header.strip_prefix("else").map_or(header, str::trim_start);
        for keyword in ["if", "while"] {
            if let Some(rest) = header.strip_prefix(keyword)
                && rest.starts_with([' ', '('])
            {
                conditions.push(rest.to_string());
            }
        }
    }
    conditions
}

/// Returns true when an earlier `if` exits the scope when `target` is absent.
fn exits_early(unit: &ScannedUnit, access: usize, scope: Range<usize>, target: &str) -> bool {
    let limit = unit.statement_start(access).min(access);
    if scope.start >= limit {
        return false;
    }
    if unit.language == Language::Python {
        return python_exits_early(unit, access, scope.start .. limit, target);
    }
    let access_blocks = unit.enclosing_braces(access);
    for found in IF_KEYWORD.find_iter(unit.text(scope.start .. limit)) {
        let at = scope.start + found.start();
        if unit.in_string(at) {
            continue;
        }
        let Some((condition, body)) = brace_if(unit, at) else {
            continue;
        };
        if body.end > access || !has_negative(&compact(unit.text(condition)), target) {
            continue;
        }
        let nested_ok = unit.enclosing_braces(at).iter().all(|block| access_blocks.contains(block));
        if nested_ok && EXIT.is_match(unit.text(body)) {
            return true;
        }
    }
    false
}

/// Splits a brace-language `if` at `at` into condition and body ranges.
fn brace_if(unit: &ScannedUnit, at: usize) -> Option<(Range<usize>, Range<usize>)> {
    let start = unit.next_non_ws(at + 2)?;
    let (condition, after) = if unit.byte(start) == Some(b'(') && unit.language != Language::Go {
        let close = unit.closing(start)?;
        (start + 1 .. close, close + 1)
    } else {
        let open = next_open_brace(unit, start)?;
        (start .. open, open)
    };
    let body_start = unit.next_non_ws(after)?;
    let body = if unit.byte(body_start) == Some(b'{') {
        body_start .. unit.closing(body_start)? + 1
    } else {
        body_start .. unit.statement_end(body_start)
    };
    Some((condition, body))
}

/// Finds the next block-opening brace on the same logical line.
fn next_open_brace(unit: &ScannedUnit, from: usize) -> Option<usize> {
    let mut index = from;
    while let Some(byte) = unit.byte(index) {
        if let Some(span) = unit.string_containing(index)
            && span.start == index
        {
            index = span.end;
            continue;
        }
        match byte {
            b'{' => return Some(index),
            b'\n' => return None,
            b'(' | b'[' => index = unit.closing(index)? + 1,
            _ => index += 1,
        }
    }
    None
}

/// Python variant of [`exits_early`].
fn python_exits_early(unit: &ScannedUnit, access: usize, range: Range<usize>, target: &str) -> bool {
    let access_headers: BTreeSet<u32> = unit.python_enclosing_headers(access).into_iter().collect();
    let first = unit.line_of(range.start);
    let last = unit.line_of(range.end);
    for line in first ..= last {
        let text = unit.code_line(line).trim_start();
        let line_start = unit.line_range(line).start;
        if let Some(condition) = text.strip_prefix("assert ") {
            let headers: BTreeSet<u32> = unit.python_enclosing_headers(line_start).into_iter().collect();
            if headers.is_subset(&access_headers) && has_positive(&compact(condition), target) {
                return true;
            }
            continue;
        }
        if !text.starts_with("if ") {
            continue;
        }
        let Some(colon) = unit.python_header_colon(line_start) else {
            continue;
        };
        let condition = unit.text(line_start .. colon).trim_start().trim_start_matches("if ").to_string();
        let body = unit.python_block(line_start, colon);
        if body.end > access || !has_negative(&compact(&condition), target) {
            continue;
        }
        let headers: BTreeSet<u32> = unit.python_enclosing_headers(line_start).into_iter().collect();
        if headers.is_subset(&access_headers) && EXIT.is_match(unit.text(body)) {
            return true;
        }
    }
    false
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

    fn reads(language: Language, root: &str, text: &str) -> Vec<FieldRead> {
        let unit = scan_text("unit", language, false, text.to_string()).unwrap();
        let scope = 0 .. unit.code.len();
        body_reads(&unit, vec![BodyRoot::new(root, 0)], scope)
    }

    fn nested<'a>(reads: &'a [FieldRead], path: &[&str]) -> &'a FieldRead {
        reads.iter().find(|read| read.path == path).unwrap()
    }

    #[test]
    fn unguarded_nested_access_is_recorded() {
        let found = reads(
            Language::TypeScript,
            "data",
            "function f(data) {\n  const role = data.app_metadata.role;\n}\n",
        );
        let read = nested(&found, &["app_metadata", "role"]);
        assert_eq!(read.guards, vec![false, false]);
    }

    #[test]
    fn optional_chaining_and_conditions_guard() {
        let found = reads(
            Language::TypeScript,
            "data",
            "function f(data) {\n  const a = data.meta?.role;\n  if (data.info) {\n    use(data.info.name);\n  }\n}\n",
        );
        assert_eq!(nested(&found, &["meta", "role"]).guards[0], true);
        assert_eq!(nested(&found, &["info", "name"]).guards[0], true);
    }

    #[test]
    fn early_return_guards_later_access() {
        let found = reads(
            Language::Go,
            "resp",
            "func f(resp *T) string {\n\tif resp.Meta == nil {\n\t\treturn \"\"\n\t}\n\treturn resp.Meta.Role\n}\n",
        );
        assert_eq!(nested(&found, &["Meta", "Role"]).guards[0], true);
    }

    #[test]
    fn python_get_default_and_aliases() {
        let found = reads(
            Language::Python,
            "body",
            "def f(body):\n    meta = body[\"app_metadata\"]\n    role = meta[\"role\"]\n    plan = body.get(\"plan\", {}).get(\"tier\")\n",
        );
        assert_eq!(nested(&found, &["app_metadata", "role"]).guards[0], false);
        assert_eq!(nested(&found, &["plan", "tier"]).guards[0], true);
    }

    #[test]
    fn destructuring_creates_roots() {
        let found = reads(
            Language::TypeScript,
            "data",
            "async function f(data) {\n  const { user, token: t } = data;\n  console.log(user.email, t);\n}\n",
        );
        assert!(found.iter().any(|read| read.path == ["token"]));
        assert!(found.iter().any(|read| read.path == ["user", "email"]));
    }

    #[test]
    fn java_getters_become_segments() {
        let found = reads(
            Language::Java,
            "body",
            "class C {\n  String f(Token body) {\n    if (body.getAppMetadata() != null) {\n      return body.getAppMetadata().getRole();\n    }\n    return null;\n  }\n}\n",
        );
        let read = nested(&found, &["appMetadata", "role"]);
        assert_eq!(read.guards[0], true);
    }

    #[test]
    fn compaction_normalizes_accessors() {
        assert_eq!(compact("data [\"meta\"] ?. role"), "data.meta.role");
        assert_eq!(compact("x is not None and not y"), "x!=None&&!y");
        assert_eq!(compact("body.get('plan', {})"), "body.plan");
    }
}
