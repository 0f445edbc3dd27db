// crates/contract-gate-core/src/extract/binding.rs
// ============================================================================
// Module: Contract Gate Endpoint Binding
// Description: Binds call sites, routes, tests, models, and enum dispatch to
//              manifest endpoints.
// Purpose: Give every observation the contract identifier the correlator and
//          the rules key on.
// Dependencies: crate::core, crate::extract, crate::interfaces
// ============================================================================

//! ## Overview
//! Binding is read-only against the manifest:
//! - call sites and routes resolve through [`ContractManifest::resolve`];
//!   without a method, a path binds only when exactly one endpoint matches;
//! - test units bind to every endpoint whose path literal they mention;
//! - models bind to the endpoint body shape with the best normalized-name
//!   overlap, and ties between different shapes stay unbound;
//! - enum dispatch binds to a manifest enum field with the subject's name,
//!   preferring endpoints already bound in the same unit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::ops::Range;

use crate::core::manifest::BodyDirection;
use crate::core::manifest::ContractManifest;
use crate::core::manifest::EndpointRef;
use crate::core::manifest::FieldKind;
use crate::core::manifest::FieldSpec;
use crate::core::manifest::HttpMethod;
use crate::core::manifest::MessageDirection;
use crate::core::manifest::ResolvedEndpoint;
use crate::core::naming::normalize_name;
use crate::core::observation::BoundarySide;
use crate::core::observation::ModelObservation;
use crate::core::observation::ShapeBinding;
use crate::extract::kinds::LEADING_METHOD;
use crate::extract::scan::ScannedUnit;
use crate::extract::shapes::assignment_rhs;
use crate::interfaces::ExtractionContext;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum overlap score for a model binding.
pub const MODEL_BINDING_THRESHOLD: f64 = 0.5;

/// Maximum identifier indirections followed when rendering a URL.
const MAX_URL_DEPTH: usize = 4;

/// Calls whose first argument is the URL or path template.
const FORMAT_CALLS: &[&str] = &["fmt.Sprintf(", "String.format(", "format!(", "util.format(", "new URL("];

// ============================================================================
// SECTION: Calls and Routes
// ============================================================================

/// Binds an observed HTTP target to an endpoint.
#[must_use]
pub fn bind_call<'a>(
    ctx: &ExtractionContext<'a>,
    method: Option<HttpMethod>,
    path: &str,
) -> Option<ResolvedEndpoint<'a>> {
    if let Some(method) = method {
        return ctx.manifest.resolve(path, method);
    }
    let mut candidates = ctx.manifest.resolve_any_method(path);
    if candidates.len() == 1 { candidates.pop() } else { None }
}

/// Binds a message topic, trying the preferred direction first.
#[must_use]
pub fn bind_topic<'a>(
    ctx: &ExtractionContext<'a>,
    topic: &str,
    preferred: MessageDirection,
) -> Option<ResolvedEndpoint<'a>> {
    let other = match preferred {
        MessageDirection::Publish => MessageDirection::Subscribe,
        MessageDirection::Subscribe => MessageDirection::Publish,
    };
    ctx.manifest.resolve_topic(topic, preferred).or_else(|| ctx.manifest.resolve_topic(topic, other))
}

/// Renders a URL expression as a path template.
///
/// String literals keep their content, interpolations become `{}`, and
/// identifiers are followed through local assignments within `scope`.
#[must_use]
pub fn path_of(unit: &ScannedUnit, range: Range<usize>, scope: Range<usize>) -> Option<String> {
    render_path(unit, unit.trim(range), scope, 0)
}

/// Recursive worker for [`path_of`].
fn render_path(unit: &ScannedUnit, range: Range<usize>, scope: Range<usize>, depth: usize) -> Option<String> {
    if depth > MAX_URL_DEPTH || range.is_empty() {
        return None;
    }
    if let Some(span) = unit.exact_string(range.clone()) {
        return Some(template_text(unit.span_content(&span)));
    }
    let text = unit.text(range.clone());
    for call in FORMAT_CALLS {
        if text.starts_with(call) {
            let open = range.start + call.len() - 1;
            let first = unit.call_args(open).into_iter().next()?;
            return render_path(unit, first, scope, depth + 1);
        }
    }
    if text.starts_with("urljoin(") || text.starts_with("urllib.parse.urljoin(") || text.ends_with(".resolve(") {
        let open = range.start + text.find('(')?;
        let last = unit.call_args(open).into_iter().last()?;
        return render_path(unit, last, scope, depth + 1);
    }
    let parts = unit.split_top_level(range.clone(), b'+');
    if parts.len() > 1 {
        let mut out = String::new();
        for part in parts {
            match unit.exact_string(part.clone()) {
                Some(span) => out.push_str(&template_text(unit.span_content(&span))),
                None => out.push_str(&render_path(unit, part, scope.clone(), depth + 1).unwrap_or_else(|| "{}".to_string())),
            }
        }
        return Some(out);
    }
    let is_identifier = text.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' || ch == '.');
    if is_identifier && !text.is_empty() {
        let rhs = assignment_rhs(unit, text, range.start, scope.clone())
            .or_else(|| assignment_rhs(unit, text, range.start, 0 .. unit.code.len()))?;
        return render_path(unit, rhs, scope, depth + 1);
    }
    None
}

/// Normalizes interpolation syntax inside a string template.
fn template_text(content: &str) -> String {
    let mut out = content.replace("${", "{").replace("#{", "{");
    if let Some(found) = LEADING_METHOD.find(&out) {
        out = out[found.end() ..].to_string();
    }
    out
}

/// Splits a route pattern such as `"POST /orders"` into method and path.
#[must_use]
pub fn split_method_pattern(pattern: &str) -> (Option<HttpMethod>, String) {
    let trimmed = pattern.trim();
    if let Some((first, rest)) = trimmed.split_once(' ')
        && let Some(method) = HttpMethod::parse(first)
    {
        return (Some(method), rest.trim().to_string());
    }
    (None, trimmed.to_string())
}

// ============================================================================
// SECTION: Test Mentions
// ============================================================================

/// Returns every endpoint whose path is mentioned by a string literal in `range`.
#[must_use]
pub fn paths_mentioned(unit: &ScannedUnit, range: Range<usize>, manifest: &ContractManifest) -> Vec<EndpointRef> {
    let mut found = BTreeSet::new();
    for span in unit.strings_in(range) {
        let content = template_text(unit.span_content(&span));
        if !content.starts_with('/') && !content.starts_with('{') && !content.contains("://") {
            continue;
        }
        for resolved in manifest.resolve_any_method(&content) {
            found.insert(resolved.reference());
        }
    }
    found.into_iter().collect()
}

// ============================================================================
// SECTION: Models
// ============================================================================

/// Candidate body shape a model can bind to.
struct CandidateShape {
    /// Endpoint owning the shape.
    endpoint: EndpointRef,
    /// Body direction.
    direction: BodyDirection,
    /// Dotted prefix of the nested object, empty for the root.
    prefix: String,
    /// Normalized field names.
    names: BTreeSet<String>,
}

/// Collects every candidate shape in the manifest.
fn candidate_shapes(manifest: &ContractManifest) -> Vec<CandidateShape> {
    let mut shapes = Vec::new();
    for resolved in manifest.endpoints() {
        let reference = resolved.reference();
        for direction in [BodyDirection::Request, BodyDirection::Response] {
            let root = &resolved.endpoint.body(direction).fields;
            if !root.is_empty() {
                shapes.push(CandidateShape {
                    endpoint: reference.clone(),
                    direction,
                    prefix: String::new(),
                    names: names_of(root),
                });
            }
            for field in resolved.endpoint.flattened(direction) {
                let children = field.spec.children();
                if !children.is_empty() {
                    shapes.push(CandidateShape {
                        endpoint: reference.clone(),
                        direction,
                        prefix: field.path.to_string(),
                        names: names_of(children),
                    });
                }
            }
        }
    }
    shapes
}

/// Normalized names of a field list.
fn names_of(fields: &[FieldSpec]) -> BTreeSet<String> {
    fields.iter().map(|field| normalize_name(&field.name)).collect()
}

/// Computes the overlap score of a model against a shape, if it qualifies.
#[must_use]
pub fn overlap_score(model: &BTreeSet<String>, shape: &BTreeSet<String>) -> Option<f64> {
    let overlap = model.intersection(shape).count();
    let denominator = model.len().max(shape.len());
    if denominator == 0 || overlap == 0 {
        return None;
    }
    if overlap < 2 && shape.len() != 1 {
        return None;
    }
    #[allow(clippy::cast_precision_loss, reason = "Field counts are far below 2^52.")]
    let score = overlap as f64 / denominator as f64;
    (score >= MODEL_BINDING_THRESHOLD).then_some(score)
}

/// Binds each model to its best-scoring endpoint shapes.
///
/// Ties between equivalent shapes bind to all of them; ties between
/// different shapes leave the model unbound and record the candidates in
/// [`ModelObservation::ambiguous`].
pub fn bind_models(models: &mut [ModelObservation], manifest: &ContractManifest) {
    let shapes = candidate_shapes(manifest);
    for model in models.iter_mut() {
        let names: BTreeSet<String> =
            model.fields.iter().map(|field| normalize_name(&field.wire_name)).collect();
        let scored: Vec<(&CandidateShape, f64)> = shapes
            .iter()
            .filter_map(|shape| overlap_score(&names, &shape.names).map(|score| (shape, score)))
            .collect();
        let Some(best) = scored.iter().map(|(_, score)| *score).reduce(f64::max) else {
            continue;
        };
        let tied: Vec<&CandidateShape> = scored
            .iter()
            .filter(|(_, score)| (best - score).abs() < f64::EPSILON)
            .map(|(shape, _)| *shape)
            .collect();
        let Some(first) = tied.first() else {
            continue;
        };
        if tied.iter().all(|shape| shape.names == first.names) {
            model.bindings = tied
                .iter()
                .map(|shape| ShapeBinding {
                    endpoint: shape.endpoint.clone(),
                    direction: shape.direction,
                    prefix: shape.prefix.clone(),
                    score: best,
                })
                .collect();
        } else {
            let ambiguous: BTreeSet<EndpointRef> = tied.iter().map(|shape| shape.endpoint.clone()).collect();
            model.ambiguous = ambiguous.into_iter().collect();
        }
    }
}

// ============================================================================
// SECTION: Enums
// ============================================================================

/// Manifest enum field bound to a dispatch subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumBinding {
    /// Owning endpoint.
    pub endpoint: EndpointRef,
    /// Body direction.
    pub direction: BodyDirection,
    /// Dotted field path.
    pub field_path: String,
    /// Declared values.
    pub values: Vec<String>,
}

/// Binds a dispatch subject name to a unique manifest enum field.
///
/// Endpoints in `preferred` win over others, then the direction matching
/// the side (consumers dispatch on responses, producers on requests).
/// Candidates with identical value sets count as one.
#[must_use]
pub fn bind_enum(
    ctx: &ExtractionContext<'_>,
    subject: &str,
    preferred: &BTreeSet<EndpointRef>,
) -> Option<EnumBinding> {
    let wanted = normalize_name(subject);
    if wanted.is_empty() {
        return None;
    }
    let mut candidates: Vec<EnumBinding> = Vec::new();
    for resolved in ctx.manifest.endpoints() {
        for direction in [BodyDirection::Request, BodyDirection::Response] {
            for field in resolved.endpoint.flattened(direction) {
                if field.spec.kind == FieldKind::Enum && normalize_name(&field.spec.name) == wanted {
                    candidates.push(EnumBinding {
                        endpoint: resolved.reference(),
                        direction,
                        field_path: field.path.to_string(),
                        values: field.spec.values.clone(),
                    });
                }
            }
        }
    }
    if candidates.iter().any(|candidate| preferred.contains(&candidate.endpoint)) {
        candidates.retain(|candidate| preferred.contains(&candidate.endpoint));
    }
    let side_direction = match ctx.side {
        BoundarySide::Consumer => Some(BodyDirection::Response),
        BoundarySide::Producer => Some(BodyDirection::Request),
        BoundarySide::Unknown => None,
    };
    if let Some(direction) = side_direction
        && candidates.iter().any(|candidate| candidate.direction == direction)
    {
        candidates.retain(|candidate| candidate.direction == direction);
    }
    let first = candidates.first()?;
    let first_values: BTreeSet<&String> = first.values.iter().collect();
    let same_values = candidates
        .iter()
        .all(|candidate| candidate.values.iter().collect::<BTreeSet<_>>() == first_values);
    same_values.then(|| first.clone())
}

/// Maps a case label to the declared value it names.
///
/// Matches by normalized equality first, then by normalized suffix
/// (`ORDER_STATUS_SHIPPED` names `shipped`).
#[must_use]
pub fn match_label(values: &[String], label: &str) -> Option<String> {
    let normalized = normalize_name(label);
    if normalized.is_empty() {
        return None;
    }
    values
        .iter()
        .find(|value| normalize_name(value) == normalized)
        .or_else(|| {
            values
                .iter()
                .filter(|value| !normalize_name(value).is_empty())
                .max_by_key(|value| {
                    let value = normalize_name(value);
                    if normalized.ends_with(&value) { value.len() } else { 0 }
                })
                .filter(|value| normalized.ends_with(&normalize_name(value)))
        })
        .cloned()
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
    use crate::core::manifest::ManifestFormat;
    use crate::core::observation::ModelField;
    use crate::core::observation::ValueKind;
    use crate::core::source::Language;
    use crate::core::source::SourceLocation;
    use crate::extract::scan::scan_text;

    const MANIFEST: &str = r"
manifest_version: '1.0'
contracts:
  - id: shop
    producer: api
    consumer: web
    protocol: http
    endpoints:
      - path: /orders/{id}
        method: GET
        response:
          fields:
            - { name: order_id, type: string, required: true }
            - { name: status, type: enum, values: [pending, shipped] }
            - { name: stock_count, type: integer }
      - path: /orders
        method: POST
        request:
          fields:
            - { name: sku, type: string, required: true }
            - { name: quantity, type: integer, required: true }
";

    fn manifest() -> ContractManifest {
        ContractManifest::load(MANIFEST, ManifestFormat::Yaml).unwrap()
    }

    fn model(names: &[&str]) -> ModelObservation {
        ModelObservation {
            location: SourceLocation::new("m.ts", 1),
            side: BoundarySide::Consumer,
            name: "Model".to_string(),
            fields: names
                .iter()
                .map(|name| ModelField {
                    declared_name: (*name).to_string(),
                    wire_name: (*name).to_string(),
                    explicit_wire_name: false,
                    kind: ValueKind::Unknown,
                    optional: false,
                    location: SourceLocation::new("m.ts", 2),
                })
                .collect(),
            bindings: Vec::new(),
            ambiguous: Vec::new(),
        }
    }

    #[test]
    fn calls_bind_with_and_without_method() {
        let manifest = manifest();
        let ctx = ExtractionContext {
            manifest: &manifest,
            side: BoundarySide::Consumer,
        };
        assert!(bind_call(&ctx, Some(HttpMethod::Get), "/orders/{}").is_some());
        assert!(bind_call(&ctx, Some(HttpMethod::Delete), "/orders/{}").is_none());
        assert!(bind_call(&ctx, None, "https://api.example.com/orders").is_some());
    }

    #[test]
    fn url_expressions_render_as_templates() {
        let unit = scan_text(
            "u.ts",
            Language::TypeScript,
            false,
            "const base = process.env.API;\nconst url = `${base}/orders/${id}`;\nfetch(url);\nfetch(base + '/orders/' + id);\n"
                .to_string(),
        )
        .unwrap();
        let whole = 0 .. unit.code.len();
        let first = unit.code.find("fetch(url)").unwrap() + 6;
        assert_eq!(path_of(&unit, first .. first + 3, whole.clone()).as_deref(), Some("{base}/orders/{id}"));
        let second = unit.code.find("base + '/orders/'").unwrap();
        let end = unit.code[second ..].find(");").unwrap() + second;
        assert_eq!(path_of(&unit, second .. end, whole).as_deref(), Some("{}/orders/{}"));
    }

    #[test]
    fn models_bind_to_best_shape() {
        let manifest = manifest();
        let mut models = vec![model(&["orderId", "status", "stockCount"]), model(&["sku", "quantity"])];
        bind_models(&mut models, &manifest);
        assert_eq!(models[0].bindings.len(), 1);
        assert_eq!(models[0].bindings[0].direction, BodyDirection::Response);
        assert_eq!(models[1].bindings[0].direction, BodyDirection::Request);
    }

    #[test]
    fn weak_overlap_does_not_bind() {
        let manifest = manifest();
        let mut models = vec![model(&["sku", "name", "price", "color"])];
        bind_models(&mut models, &manifest);
        assert!(models[0].bindings.is_empty());
    }

    #[test]
    fn enum_labels_match_by_suffix() {
        let values = vec!["pending".to_string(), "shipped".to_string()];
        assert_eq!(match_label(&values, "ORDER_STATUS_SHIPPED").as_deref(), Some("shipped"));
        assert_eq!(match_label(&values, "Pending").as_deref(), Some("pending"));
        assert_eq!(match_label(&values, "cancelled"), None);
    }

    #[test]
    fn enum_subjects_bind_to_unique_fields() {
        let manifest = manifest();
        let ctx = ExtractionContext {
            manifest: &manifest,
            side: BoundarySide::Consumer,
        };
        let binding = bind_enum(&ctx, "status", &BTreeSet::new()).unwrap();
        assert_eq!(binding.field_path, "status");
        assert!(bind_enum(&ctx, "color", &BTreeSet::new()).is_none());
    }
}
