// crates/contract-gate-core/src/extract/shapes.rs
// ============================================================================
// Module: Contract Gate Body Shapes
// Description: Object-literal, composite, and constructor body recognition.
// Purpose: Turn a request or response body expression into observed fields.
// Dependencies: regex, crate::core, crate::extract
// ============================================================================

//! ## Overview
//! A body expression is recognized as a literal shape when it is an object
//! literal, a dict or map literal, a Go composite literal, a builder chain, or
//! a constructor call on a model declared in the same unit. Serialization
//! wrappers (`JSON.stringify`, `json.dumps`, `json.Marshal`) are looked
//! through, and bare identifiers are resolved through their last local
//! assignment. Anything else yields an unknown shape: the body exists, but
//! its field set is not exhaustive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::observation::ModelObservation;
use crate::core::observation::NameSource;
use crate::core::observation::ObservedField;
use crate::core::observation::ValueKind;
use crate::core::source::Language;
use crate::extract::kinds::InferredValue;
use crate::extract::kinds::compile;
use crate::extract::kinds::infer_value;
use crate::extract::scan::ScannedUnit;
use crate::extract::scan::is_ident_byte;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum indirection depth when resolving identifiers and wrappers.
const MAX_DEPTH: usize = 6;

/// Calls whose first argument is the serialized body.
const WRAPPERS: &[&str] = &[
    "JSON.stringify",
    "json.dumps",
    "jsonify",
    "json.Marshal",
    "json.MarshalIndent",
    "URLSearchParams",
    "bytes.NewReader",
    "bytes.NewBuffer",
    "strings.NewReader",
    "BodyInserters.fromValue",
    "Mono.just",
    "HttpEntity",
    "ResponseEntity.ok",
    "objectMapper.writeValueAsString",
    "mapper.writeValueAsString",
    "gson.toJson",
    "BodyPublishers.ofString",
    "HttpRequest.BodyPublishers.ofString",
    "Response.json",
    "NextResponse.json",
];

/// Go map-typed composite literal prefixes.
const GO_MAP_TYPES: &[&str] = &["map[", "gin.H", "fiber.Map", "echo.Map", "bson.M", "H"];

/// Line prefix allowed before an assigned identifier.
static DECLARATION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^\s*(?:(?:export|const|let|var|final|val|private|public|protected|static)\s+)*[\w<>\[\],.?\s]*$")
});

/// Tail between an assigned identifier and its `=`.
static ASSIGNMENT_TAIL: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*(?:,\s*[A-Za-z_]\w*\s*)*(?::\s*[^=\n]+?)?\s*:?="));

/// Callee at the start of an expression.
static LEADING_CALLEE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^(?:await\s+)?(?:new\s+)?([A-Za-z_$][\w$.]*)(?:<[^()]*>)?\s*\("));

/// Plain identifier.
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| compile(r"^[A-Za-z_$][\w$]*$"));

// ============================================================================
// SECTION: Types
// ============================================================================

/// Fields recognized in a body expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyShape {
    /// Fields in source order.
    pub fields: Vec<ObservedField>,
    /// True when `fields` is exhaustive.
    pub known: bool,
}

impl BodyShape {
    /// Returns a shape whose fields are not known.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            fields: Vec::new(),
            known: false,
        }
    }
}

/// How object-literal keys are interpreted.
#[derive(Debug, Clone, Copy)]
enum KeyStyle<'a> {
    /// Keys are wire names (JS objects, dict and map literals).
    Wire,
    /// Keys are declared names mapped through a model (Go structs).
    Declared(Option<&'a ModelObservation>),
}

/// Shared lookup state for one unit.
struct ShapeContext<'a> {
    /// Scanned unit.
    unit: &'a ScannedUnit,
    /// Scope used for identifier resolution.
    scope: Range<usize>,
    /// Models declared in the unit.
    models: &'a [ModelObservation],
}

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Recognizes the shape of a body expression.
#[must_use]
pub fn body_shape(
    unit: &ScannedUnit,
    range: Range<usize>,
    scope: Range<usize>,
    models: &[ModelObservation],
) -> BodyShape {
    let ctx = ShapeContext {
        unit,
        scope,
        models,
    };
    ctx.shape_of(range, 0)
}

/// Returns the right-hand side of the last assignment to `name` before `before`.
#[must_use]
pub fn assignment_rhs(
    unit: &ScannedUnit,
    name: &str,
    before: usize,
    scope: Range<usize>,
) -> Option<Range<usize>> {
    let end = before.min(scope.end);
    if name.is_empty() || scope.start >= end {
        return None;
    }
    let mut found = None;
    for (relative, _) in unit.text(scope.start .. end).match_indices(name) {
        let at = scope.start + relative;
        if !is_word_at(unit, at, name.len()) || unit.in_string(at) || unit.inside_group(at) {
            continue;
        }
        let line_start = unit.line_range(unit.line_of(at)).start;
        if !DECLARATION_PREFIX.is_match(unit.text(line_start .. at)) {
            continue;
        }
        let tail_start = at + name.len();
        let tail = unit.text(tail_start .. unit.statement_end(tail_start));
        let Some(matched) = ASSIGNMENT_TAIL.find(tail) else {
            continue;
        };
        let rhs_start = tail_start + matched.end();
        if matches!(unit.byte(rhs_start), Some(b'=' | b'>')) {
            continue;
        }
        let rhs_end = unit.statement_end(rhs_start);
        let rhs = unit.trim(rhs_start .. rhs_end);
        if !rhs.is_empty() {
            found = Some(rhs);
        }
    }
    found
}

/// Returns true when `name` occurs at `at` as a whole word.
#[must_use]
pub fn is_word_at(unit: &ScannedUnit, at: usize, len: usize) -> bool {
    let before_ok = at == 0 || unit.byte(at - 1).is_none_or(|byte| !is_ident_byte(byte) && byte != b'.');
    let after_ok = unit.byte(at + len).is_none_or(|byte| !is_ident_byte(byte));
    before_ok && after_ok
}

/// Finds a model declared in the unit by name.
#[must_use]
pub fn model_named<'a>(models: &'a [ModelObservation], name: &str) -> Option<&'a ModelObservation> {
    let short = name.rsplit('.').next().unwrap_or(name);
    models.iter().find(|model| model.name == short)
}

// ============================================================================
// SECTION: Shape Recognition
// ============================================================================

impl ShapeContext<'_> {
    /// Recognizes a body shape, looking through wrappers and identifiers.
    fn shape_of(&self, range: Range<usize>, depth: usize) -> BodyShape {
        let range = self.strip_await(self.unit.trim(range));
        if depth > MAX_DEPTH || range.is_empty() {
            return BodyShape::unknown();
        }
        if let Some(inner) = self.unwrap_wrapper(range.clone()) {
            return self.shape_of(inner, depth + 1);
        }
        if let Some(shape) = self.literal_shape(range.clone(), depth) {
            return shape;
        }
        let text = self.unit.text(range.clone());
        if IDENTIFIER.is_match(text)
            && let Some(rhs) = assignment_rhs(self.unit, text, range.start, self.scope.clone())
        {
            return self.shape_of(rhs, depth + 1);
        }
        BodyShape::unknown()
    }

    /// Drops a leading `await`.
    fn strip_await(&self, range: Range<usize>) -> Range<usize> {
        let text = self.unit.text(range.clone());
        text.strip_prefix("await ")
            .map_or(range.clone(), |rest| self.unit.trim(range.end - rest.len() .. range.end))
    }

    /// Returns the first argument of a serialization wrapper call.
    fn unwrap_wrapper(&self, range: Range<usize>) -> Option<Range<usize>> {
        let text = self.unit.text(range.clone());
        let captures = LEADING_CALLEE.captures(text)?;
        let callee = captures.get(1)?.as_str();
        let known = WRAPPERS.iter().any(|wrapper| callee == *wrapper || callee.ends_with(&format!(".{wrapper}")));
        if !known {
            return None;
        }
        let open = range.start + captures.get(0)?.end() - 1;
        let close = self.unit.closing(open)?;
        if close + 1 != range.end {
            return None;
        }
        self.unit.call_args(open).into_iter().next()
    }

    /// Recognizes literal object constructions.
    fn literal_shape(&self, range: Range<usize>, depth: usize) -> Option<BodyShape> {
        let unit = self.unit;
        let text = unit.text(range.clone());
        if unit.byte(range.start) == Some(b'{') && unit.closing(range.start) == Some(range.end - 1) {
            return Some(self.object_entries(range.start, KeyStyle::Wire, depth));
        }
        if unit.language == Language::Go && text.ends_with('}') {
            return self.go_composite(range, depth);
        }
        if text.starts_with("dict(") {
            let open = range.start + "dict".len();
            return (unit.closing(open) == Some(range.end - 1))
                .then(|| self.keyword_entries(open, None, depth));
        }
        if text.starts_with("Map.of(") {
            let open = range.start + "Map.of".len();
            return (unit.closing(open) == Some(range.end - 1)).then(|| self.pair_entries(open, depth));
        }
        if text.ends_with(".build()") && text.contains(".builder()") {
            return self.builder_chain(range, depth);
        }
        let captures = LEADING_CALLEE.captures(text)?;
        let callee = captures.get(1)?.as_str();
        let open = range.start + captures.get(0)?.end() - 1;
        if unit.closing(open) != Some(range.end - 1) {
            return None;
        }
        let model = model_named(self.models, callee)?;
        let args = unit.call_args(open);
        match unit.language {
            Language::Python => Some(self.keyword_entries(open, Some(model), depth)),
            Language::TypeScript => {
                let first = args.into_iter().next()?;
                self.literal_shape(first, depth + 1)
            }
            _ => self.positional_entries(&args, model, depth),
        }
    }

    /// Parses a Go composite literal (`T{...}`, `&T{...}`, `map[..]..{...}`).
    fn go_composite(&self, range: Range<usize>, depth: usize) -> Option<BodyShape> {
        let unit = self.unit;
        let open = unit.opening(range.end - 1)?;
        let type_text = unit.text(range.start .. open).trim().trim_start_matches('&').trim();
        if type_text.is_empty() || type_text.starts_with("[]") || type_text.starts_with("func") {
            return None;
        }
        if GO_MAP_TYPES.iter().any(|prefix| type_text.starts_with(prefix)) {
            return Some(self.object_entries(open, KeyStyle::Wire, depth));
        }
        let name = type_text.rsplit('.').next().unwrap_or(type_text);
        Some(self.object_entries(open, KeyStyle::Declared(model_named(self.models, name)), depth))
    }

    /// Parses `{ key: value, ... }` entries.
    fn object_entries(&self, open: usize, style: KeyStyle<'_>, depth: usize) -> BodyShape {
        let unit = self.unit;
        let Some(close) = unit.closing(open) else {
            return BodyShape::unknown();
        };
        let mut shape = BodyShape {
            fields: Vec::new(),
            known: true,
        };
        for entry in unit.split_top_level(open + 1 .. close, b',') {
            let text = unit.text(entry.clone());
            if text.starts_with("...") || text.starts_with("**") {
                shape.known = false;
                continue;
            }
            let Some(colon) = unit.find_top_level(entry.clone(), b':') else {
                if unit.language == Language::TypeScript && IDENTIFIER.is_match(text) {
                    shape.fields.push(self.field(text.to_string(), NameSource::Wire, entry.clone(), entry, depth));
                } else if !text.contains('(') {
                    shape.known = false;
                }
                continue;
            };
            let key = unit.trim(entry.start .. colon);
            let value = unit.trim(colon + 1 .. entry.end);
            let key_text = unit.text(key.clone());
            let (name, source) = if let Some(literal) = unit.literal(key.clone()) {
                (literal, NameSource::Wire)
            } else if IDENTIFIER.is_match(key_text) && unit.language != Language::Python {
                match style {
                    KeyStyle::Wire => (key_text.to_string(), NameSource::Wire),
                    KeyStyle::Declared(model) => declared_to_wire(model, key_text),
                }
            } else {
                shape.known = false;
                continue;
            };
            shape.fields.push(self.field(name, source, key, value, depth));
        }
        shape
    }

    /// Parses `name=value` keyword arguments (`dict(...)`, model constructors).
    fn keyword_entries(
        &self,
        open: usize,
        model: Option<&ModelObservation>,
        depth: usize,
    ) -> BodyShape {
        let unit = self.unit;
        let mut shape = BodyShape {
            fields: Vec::new(),
            known: true,
        };
        for entry in unit.call_args(open) {
            let Some(equals) = unit.find_top_level(entry.clone(), b'=') else {
                shape.known = false;
                continue;
            };
            let key = unit.trim(entry.start .. equals);
            let key_text = unit.text(key.clone());
            if !IDENTIFIER.is_match(key_text) {
                shape.known = false;
                continue;
            }
            let (name, source) = match model {
                Some(model) => declared_to_wire(Some(model), key_text),
                None => (key_text.to_string(), NameSource::Wire),
            };
            shape.fields.push(self.field(name, source, key, equals + 1 .. entry.end, depth));
        }
        shape
    }

    /// Parses alternating `"key", value` arguments (`Map.of`).
    fn pair_entries(&self, open: usize, depth: usize) -> BodyShape {
        let unit = self.unit;
        let args = unit.call_args(open);
        let mut shape = BodyShape {
            fields: Vec::new(),
            known: args.len() % 2 == 0,
        };
        for pair in args.chunks(2) {
            let [key, value] = pair else {
                continue;
            };
            match unit.literal(key.clone()) {
                Some(name) => {
                    shape.fields.push(self.field(name, NameSource::Wire, key.clone(), value.clone(), depth));
                }
                None => shape.known = false,
            }
        }
        shape
    }

    /// Maps positional constructor arguments onto a model's fields.
    fn positional_entries(
        &self,
        args: &[Range<usize>],
        model: &ModelObservation,
        depth: usize,
    ) -> Option<BodyShape> {
        if args.len() != model.fields.len() {
            return None;
        }
        let fields = args
            .iter()
            .zip(&model.fields)
            .map(|(arg, declared)| {
                self.field(declared.wire_name.clone(), NameSource::Wire, arg.clone(), arg.clone(), depth)
            })
            .collect();
        Some(BodyShape {
            fields,
            known: true,
        })
    }

    /// Parses `Type.builder().a(x).b(y).build()` chains.
    fn builder_chain(&self, range: Range<usize>, depth: usize) -> Option<BodyShape> {
        let unit = self.unit;
        let text = unit.text(range.clone());
        let builder_at = text.find(".builder()")?;
        let model = model_named(self.models, &text[.. builder_at]);
        let mut cursor = range.start + builder_at + ".builder()".len();
        let mut shape = BodyShape {
            fields: Vec::new(),
            known: true,
        };
        while cursor < range.end {
            let dot = unit.next_non_ws(cursor)?;
            if unit.byte(dot) != Some(b'.') {
                break;
            }
            let name_start = dot + 1;
            let name_len = unit.code.as_bytes()[name_start ..].iter().take_while(|byte| is_ident_byte(**byte)).count();
            let name = unit.text(name_start .. name_start + name_len).to_string();
            let open = name_start + name_len;
            let close = unit.closing(open)?;
            if name == "build" {
                break;
            }
            let arg = unit.call_args(open).into_iter().next().unwrap_or(open + 1 .. close);
            let (wire, source) = declared_to_wire(model, &name);
            shape.fields.push(self.field(wire, source, name_start .. open, arg, depth));
            cursor = close + 1;
        }
        Some(shape)
    }

    /// Builds one observed field from a key and value range.
    fn field(
        &self,
        name: String,
        source: NameSource,
        key: Range<usize>,
        value: Range<usize>,
        depth: usize,
    ) -> ObservedField {
        let (inferred, children) = self.value_of(value, depth + 1);
        ObservedField {
            name,
            source,
            kind: inferred.kind,
            conversion: inferred.conversion,
            literal: inferred.literal,
            value_ref: inferred.value_ref,
            children,
            location: self.unit.location(key.start),
        }
    }

    /// Infers a value and any nested object fields.
    fn value_of(&self, range: Range<usize>, depth: usize) -> (InferredValue, Option<Vec<ObservedField>>) {
        let unit = self.unit;
        let range = self.strip_await(unit.trim(range));
        if depth <= MAX_DEPTH
            && let Some(shape) = self.literal_shape(range.clone(), depth)
        {
            let inferred = infer_value("{}", None, false);
            return (inferred, Some(shape.fields));
        }
        let text = unit.text(range.clone());
        let is_string = unit.exact_string(range.clone()).is_some();
        let inferred = infer_value(text, unit.literal(range.clone()), is_string);
        if inferred.kind != ValueKind::Unknown || depth > MAX_DEPTH || !IDENTIFIER.is_match(text) {
            return (inferred, None);
        }
        let Some(rhs) = assignment_rhs(unit, text, range.start, self.scope.clone()) else {
            return (inferred, None);
        };
        let (resolved, children) = self.value_of(rhs, depth + 1);
        (
            InferredValue {
                value_ref: inferred.value_ref,
                ..resolved
            },
            children,
        )
    }
}

/// Maps a declared member name to its wire name through a model.
fn declared_to_wire(model: Option<&ModelObservation>, declared: &str) -> (String, NameSource) {
    model
        .and_then(|model| model.fields.iter().find(|field| field.declared_name == declared))
        .map_or_else(
            || (declared.to_string(), NameSource::Accessor),
            |field| (field.wire_name.clone(), NameSource::Wire),
        )
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
    use crate::core::observation::Conversion;
    use crate::extract::scan::scan_text;

    fn scan(language: Language, text: &str) -> ScannedUnit {
        scan_text("unit", language, false, text.to_string()).unwrap()
    }

    #[test]
    fn object_literal_fields_are_exhaustive() {
        let unit = scan(
            Language::TypeScript,
            "const body = { grant_type: 'client_credentials', scope, expires_in: String(ttl) };\n",
        );
        let start = unit.code.find('{').unwrap();
        let end = unit.closing(start).unwrap() + 1;
        let shape = body_shape(&unit, start .. end, 0 .. unit.code.len(), &[]);
        assert!(shape.known);
        let names: Vec<&str> = shape.fields.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(names, vec!["grant_type", "scope", "expires_in"]);
        assert_eq!(shape.fields[0].literal.as_deref(), Some("client_credentials"));
        assert_eq!(shape.fields[2].conversion, Conversion::ToString);
    }

    #[test]
    fn identifiers_resolve_through_wrappers() {
        let unit = scan(
            Language::TypeScript,
            "function send() {\n  const payload = { a: 1, ...rest };\n  return fetch(u, { body: JSON.stringify(payload) });\n}\n",
        );
        let at = unit.code.find("JSON.stringify").unwrap();
        let end = unit.code.find(") });").unwrap() + 1;
        let shape = body_shape(&unit, at .. end, 0 .. unit.code.len(), &[]);
        assert!(!shape.known);
        assert_eq!(shape.fields.len(), 1);
        assert_eq!(shape.fields[0].kind, ValueKind::Integer);
    }

    #[test]
    fn python_dict_requires_string_keys() {
        let unit = scan(Language::Python, "payload = {\"email\": email, \"age\": 3}\n");
        let start = unit.code.find('{').unwrap();
        let end = unit.closing(start).unwrap() + 1;
        let shape = body_shape(&unit, start .. end, 0 .. unit.code.len(), &[]);
        assert!(shape.known);
        assert_eq!(shape.fields.len(), 2);
        assert_eq!(shape.fields[0].value_ref.as_deref(), Some("email"));
    }

    #[test]
    fn assignment_lookup_ignores_keyword_arguments() {
        let unit = scan(Language::Python, "call(\n    total=5,\n)\ntotal = 7\nuse(total)\n");
        let before = unit.code.find("use(").unwrap();
        let rhs = assignment_rhs(&unit, "total", before, 0 .. unit.code.len()).unwrap();
        assert_eq!(unit.text(rhs), "7");
    }
}
