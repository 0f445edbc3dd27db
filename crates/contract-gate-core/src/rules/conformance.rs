// crates/contract-gate-core/src/rules/conformance.rs
// ============================================================================
// Module: Contract Gate Conformance Rules
// Description: Manifest conformance and strictness parity.
// Purpose: Compare constructed values and enforced constraints with the
//          declared field specifications.
// Dependencies: regex, crate::core, crate::extract, crate::rules
// ============================================================================

//! ## Overview
//! `CTR-manifest-conformance` looks at every value a site constructs or a
//! model declares: inferred kind against declared kind, raw number-to-string
//! conversions of fixed-precision decimals, literal values against enum
//! values, named formats, patterns, and ranges, and wire names that only
//! match the manifest after normalization.
//!
//! `CTR-strictness-parity` looks at what a sender enforces before it sends:
//! range checks with the declared bounds, format validation, and enum
//! membership checks or dispatch that cover every declared value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;

use crate::core::manifest::BodyDirection;
use crate::core::manifest::EndpointSpec;
use crate::core::manifest::FieldKind;
use crate::core::manifest::FieldSpec;
use crate::core::manifest::NamedFormat;
use crate::core::manifest::find_field;
use crate::core::naming::names_match;
use crate::core::observation::Conversion;
use crate::core::observation::EnumObservation;
use crate::core::observation::FieldRead;
use crate::core::observation::ModelObservation;
use crate::core::observation::NameSource;
use crate::core::observation::ObservedField;
use crate::core::observation::RequestObservation;
use crate::core::observation::ResponseObservation;
use crate::core::observation::ValidationKind;
use crate::core::observation::ValueKind;
use crate::core::source::SourceLocation;
use crate::core::violation::Violation;
use crate::extract::kinds::compile;
use crate::rules::RuleContext;
use crate::rules::RuleFault;
use crate::rules::RuleSubject;
use crate::rules::subjects::join_path;
use crate::rules::subjects::list;
use crate::rules::subjects::path_segments;
use crate::rules::subjects::receiver_side;
use crate::rules::subjects::sender_side;
use crate::rules::subjects::shape_at;
use crate::rules::subjects::visit_declared;

// ============================================================================
// SECTION: Named Formats
// ============================================================================

/// RFC 5322-ish address.
static EMAIL: LazyLock<Regex> = LazyLock::new(|| compile(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"));
/// Hyphenated UUID.
static UUID: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
});
/// RFC 3339 timestamp.
static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^\d{4}-\d{2}-\d{2}[Tt ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:[Zz]|[+-]\d{2}:?\d{2})$")
});
/// Calendar date.
static DATE: LazyLock<Regex> = LazyLock::new(|| compile(r"^\d{4}-\d{2}-\d{2}$"));
/// Absolute URI.
static URI: LazyLock<Regex> = LazyLock::new(|| compile(r"^[A-Za-z][A-Za-z0-9+.-]*://\S+$"));
/// Decimal string.
static DECIMAL: LazyLock<Regex> = LazyLock::new(|| compile(r"^-?\d+(?:\.\d+)?$"));

/// Returns true when `value` satisfies a named format.
fn format_matches(format: NamedFormat, value: &str) -> bool {
    let pattern = match format {
        NamedFormat::Email => &EMAIL,
        NamedFormat::Uuid => &UUID,
        NamedFormat::DateTime => &DATE_TIME,
        NamedFormat::Date => &DATE,
        NamedFormat::Uri => &URI,
        NamedFormat::Decimal => &DECIMAL,
    };
    pattern.is_match(value)
}

/// Parses a numeric literal, ignoring digit separators and type suffixes.
fn numeric_literal(literal: &str) -> Option<f64> {
    literal.trim_end_matches(['l', 'L', 'u', 'U', 'f', 'F', 'd', 'D']).replace('_', "").parse().ok()
}

// ============================================================================
// SECTION: Manifest Conformance
// ============================================================================

/// Evaluates `CTR-manifest-conformance` for a request, response, or model.
///
/// # Errors
///
/// Returns [`RuleFault`] for unsupported subjects or unknown endpoints.
pub fn manifest_conformance(
    ctx: &RuleContext<'_>,
    subject: &RuleSubject<'_>,
) -> Result<Vec<Violation>, RuleFault> {
    match subject {
        RuleSubject::Request(obs) => request_conformance(ctx, obs),
        RuleSubject::Response(obs) => response_conformance(ctx, obs),
        RuleSubject::Model(model) => model_conformance(ctx, model),
        _ => Err(subject.unexpected()),
    }
}

/// Checks fields a request sends or a handler reads.
fn request_conformance(ctx: &RuleContext<'_>, obs: &RequestObservation) -> Result<Vec<Violation>, RuleFault> {
    let Some(reference) = &obs.endpoint else {
        return Ok(Vec::new());
    };
    let spec = ctx.endpoint(reference)?.endpoint;
    let mut violations = Vec::new();
    visit_declared(&spec.body(BodyDirection::Request).fields, &obs.fields, "", &mut |path, declared, field| {
        check_field(ctx, path, declared, field, &mut violations);
    });
    Ok(violations)
}

/// Checks fields a producer constructs and names a consumer reads.
fn response_conformance(
    ctx: &RuleContext<'_>,
    obs: &ResponseObservation,
) -> Result<Vec<Violation>, RuleFault> {
    let Some(reference) = &obs.endpoint else {
        return Ok(Vec::new());
    };
    let spec = ctx.endpoint(reference)?.endpoint;
    let mut violations = Vec::new();
    if obs.side == sender_side(&spec.key, BodyDirection::Response) && !spec.key.is_message() {
        visit_declared(&spec.body(BodyDirection::Response).fields, &obs.produced, "", &mut |path, declared, field| {
            check_field(ctx, path, declared, field, &mut violations);
        });
    }
    let read_direction = spec.key.read_direction();
    if obs.side == receiver_side(&spec.key, read_direction) {
        for read in &obs.reads {
            if let Some(violation) = read_name_drift(ctx, spec, read) {
                violations.push(violation);
            }
        }
    }
    Ok(violations)
}

/// Returns a violation when a read chain uses a non-canonical spelling.
fn read_name_drift(ctx: &RuleContext<'_>, spec: &EndpointSpec, read: &FieldRead) -> Option<Violation> {
    let matched = spec.walk(spec.key.read_direction(), &read.path);
    let (index, declared) =
        matched.iter().enumerate().find(|(index, declared)| read.path[*index] != declared.name)?;
    let canonical: Vec<&str> = matched[..= index].iter().map(|field| field.name.as_str()).collect();
    let canonical = canonical.join(".");
    Some(
        ctx.violation(
            read.location.clone(),
            format!("name:{canonical}"),
            format!(
                "reads `{}` but the manifest names the field `{}`",
                read.path[index], declared.name
            ),
        )
        .with_fix(format!("read `{}` exactly as declared", declared.name)),
    )
}

/// Checks model fields against every shape the model is bound to.
fn model_conformance(ctx: &RuleContext<'_>, model: &ModelObservation) -> Result<Vec<Violation>, RuleFault> {
    let mut violations = Vec::new();
    for binding in &model.bindings {
        let spec = ctx.endpoint(&binding.endpoint)?.endpoint;
        let Some(declared) = shape_at(spec, binding.direction, &binding.prefix) else {
            continue;
        };
        for field in &model.fields {
            let Some(field_spec) = find_field(declared, &field.wire_name) else {
                continue;
            };
            let path = join_path(&binding.prefix, &field_spec.name);
            if let Some(message) = kind_mismatch(&path, field_spec, field.kind, Conversion::None) {
                violations.push(ctx.violation(field.location.clone(), path.clone(), message));
            }
            if field.explicit_wire_name && field.wire_name != field_spec.name {
                violations.push(name_violation(ctx, &field.location, &path, &field.wire_name, &field_spec.name));
            }
        }
    }
    Ok(violations)
}

/// Checks one constructed field against its spec.
fn check_field(
    ctx: &RuleContext<'_>,
    path: &str,
    spec: &FieldSpec,
    field: &ObservedField,
    violations: &mut Vec<Violation>,
) {
    if let Some(message) = kind_mismatch(path, spec, field.kind, field.conversion) {
        violations.push(ctx.violation(field.location.clone(), path, message));
    }
    if spec.format == Some(NamedFormat::Decimal) && field.conversion == Conversion::ToString {
        violations.push(
            ctx.violation(
                field.location.clone(),
                format!("format:{path}"),
                format!("fixed-precision decimal `{path}` is produced by a raw number-to-string conversion"),
            )
            .with_fix("format the value with explicit fixed precision"),
        );
    }
    if field.source == NameSource::Wire && field.name != spec.name {
        violations.push(name_violation(ctx, &field.location, path, &field.name, &spec.name));
    }
    if let Some(literal) = &field.literal {
        check_literal(ctx, path, spec, field, literal, violations);
    }
}

/// Checks a literal value against enum, format, pattern, and range
/// constraints.
fn check_literal(
    ctx: &RuleContext<'_>,
    path: &str,
    spec: &FieldSpec,
    field: &ObservedField,
    literal: &str,
    violations: &mut Vec<Violation>,
) {
    if field.kind == ValueKind::String {
        if spec.kind == FieldKind::Enum && !spec.values.iter().any(|value| value == literal) {
            violations.push(ctx.violation(
                field.location.clone(),
                format!("enum:{path}"),
                format!("`{literal}` is not a declared value of `{path}` ({})", list(&spec.values)),
            ));
        }
        let format_ok = spec.format.is_none_or(|format| format_matches(format, literal));
        let pattern_ok = spec
            .pattern
            .as_deref()
            .and_then(|pattern| Regex::new(pattern).ok())
            .is_none_or(|pattern| pattern.is_match(literal));
        if !format_ok || !pattern_ok {
            let label = spec.format_label().unwrap_or_default();
            violations.push(ctx.violation(
                field.location.clone(),
                format!("format:{path}"),
                format!("`{literal}` does not satisfy the declared {label} format of `{path}`"),
            ));
        }
    }
    if field.kind.is_numeric()
        && let Some(range) = &spec.range
        && let Some(value) = numeric_literal(literal)
    {
        let below = range.min.is_some_and(|min| value < min);
        let above = range.max.is_some_and(|max| value > max);
        if below || above {
            violations.push(ctx.violation(
                field.location.clone(),
                format!("range:{path}"),
                format!("`{literal}` is outside the declared range {range} of `{path}`"),
            ));
        }
    }
}

/// Builds an exact-name violation.
fn name_violation(
    ctx: &RuleContext<'_>,
    location: &SourceLocation,
    path: &str,
    observed: &str,
    declared: &str,
) -> Violation {
    ctx.violation(
        location.clone(),
        format!("name:{path}"),
        format!("uses wire name `{observed}` but the manifest names the field `{declared}`"),
    )
    .with_fix(format!("rename the wire field to `{declared}`"))
}

/// Returns a message when an inferred kind is incompatible with the declared field.
fn kind_mismatch(path: &str, spec: &FieldSpec, kind: ValueKind, conversion: Conversion) -> Option<String> {
    let effective = if conversion == Conversion::None { kind } else { ValueKind::String };
    let compatible = match (spec.kind, effective) {
        (_, ValueKind::Unknown)
        | (FieldKind::String | FieldKind::Enum, ValueKind::String)
        | (FieldKind::Integer, ValueKind::Integer | ValueKind::Number)
        | (FieldKind::Number, ValueKind::Integer | ValueKind::Float | ValueKind::Number)
        | (FieldKind::Boolean, ValueKind::Boolean)
        | (FieldKind::Object, ValueKind::Object)
        | (FieldKind::Array, ValueKind::Array) => true,
        (_, ValueKind::Null) => spec.nullable,
        _ => false,
    };
    if compatible {
        return None;
    }
    Some(match (effective, conversion) {
        (ValueKind::Null, _) => format!("`{path}` is not nullable but is set to null"),
        (_, Conversion::ToString | Conversion::FixedPrecision) => {
            format!("`{path}` is declared {} but is converted to a string", spec.kind.as_str())
        }
        _ => format!("`{path}` is declared {} but is constructed as {}", spec.kind.as_str(), effective.as_str()),
    })
}

// ============================================================================
// SECTION: Strictness Parity
// ============================================================================

/// Evaluates `CTR-strictness-parity` for a request or enum dispatch.
///
/// # Errors
///
/// Returns [`RuleFault`] for unsupported subjects or unknown endpoints.
pub fn strictness_parity(
    ctx: &RuleContext<'_>,
    subject: &RuleSubject<'_>,
) -> Result<Vec<Violation>, RuleFault> {
    match subject {
        RuleSubject::Request(obs) => request_parity(ctx, obs),
        RuleSubject::Enum(obs) => enum_parity(ctx, obs),
        _ => Err(subject.unexpected()),
    }
}

/// Checks that a sender enforces declared constraints on variable values.
fn request_parity(ctx: &RuleContext<'_>, obs: &RequestObservation) -> Result<Vec<Violation>, RuleFault> {
    let Some(reference) = &obs.endpoint else {
        return Ok(Vec::new());
    };
    let spec = ctx.endpoint(reference)?.endpoint;
    if obs.side != sender_side(&spec.key, BodyDirection::Request) {
        return Ok(Vec::new());
    }
    let mut violations = Vec::new();
    visit_declared(&spec.body(BodyDirection::Request).fields, &obs.fields, "", &mut |path, declared, field| {
        if field.literal.is_none() {
            field_parity(ctx, obs, path, declared, field, &mut violations);
        }
    });
    Ok(violations)
}

/// Returns true when a validation subject names the field or its source.
fn checks_field(check_field: &str, spec: &FieldSpec, field: &ObservedField) -> bool {
    names_match(check_field, &spec.name)
        || names_match(check_field, &field.name)
        || field.value_ref.as_deref().is_some_and(|value_ref| names_match(check_field, value_ref))
}

/// Checks range, format, and membership enforcement for one field.
fn field_parity(
    ctx: &RuleContext<'_>,
    obs: &RequestObservation,
    path: &str,
    spec: &FieldSpec,
    field: &ObservedField,
    violations: &mut Vec<Violation>,
) {
    let checks: Vec<&ValidationKind> = obs
        .validations
        .iter()
        .filter(|check| checks_field(&check.field, spec, field))
        .map(|check| &check.kind)
        .collect();

    if let Some(range) = &spec.range {
        let checked: Vec<f64> = checks
            .iter()
            .filter_map(|kind| match kind {
                ValidationKind::Range {
                    bounds,
                } => Some(bounds.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect();
        let has_range = checks.iter().any(|kind| matches!(kind, ValidationKind::Range { .. }));
        if has_range {
            let missing: Vec<String> = range
                .bounds()
                .into_iter()
                .filter(|bound| !checked.iter().any(|seen| (seen - bound).abs() < f64::EPSILON))
                .map(|bound| bound.to_string())
                .collect();
            if !missing.is_empty() {
                violations.push(ctx.violation(
                    field.location.clone(),
                    format!("range:{path}"),
                    format!(
                        "range check on `{path}` does not enforce declared bounds {range}; mismatched: {}",
                        list(&missing)
                    ),
                ));
            }
        } else {
            violations.push(
                ctx.violation(
                    field.location.clone(),
                    format!("range:{path}"),
                    format!("`{path}` is sent without a range check; declared range {range}"),
                )
                .with_fix(format!("reject values of `{path}` outside {range} before sending")),
            );
        }
    }

    if let Some(label) = spec.format_label()
        && !checks.iter().any(|kind| matches!(kind, ValidationKind::Format))
    {
        violations.push(
            ctx.violation(
                field.location.clone(),
                format!("format:{path}"),
                format!("`{path}` is sent without {label} validation"),
            )
            .with_fix(format!("validate `{path}` as {label} before sending")),
        );
    }

    if spec.kind == FieldKind::Enum {
        let allowed: Vec<&String> = checks
            .iter()
            .filter_map(|kind| match kind {
                ValidationKind::OneOf {
                    values,
                } => Some(values.iter()),
                _ => None,
            })
            .flatten()
            .collect();
        if !allowed.is_empty() {
            let missing: Vec<String> = spec
                .values
                .iter()
                .filter(|value| !allowed.iter().any(|seen| names_match(seen, value)))
                .cloned()
                .collect();
            if !missing.is_empty() {
                violations.push(ctx.violation(
                    field.location.clone(),
                    format!("enum:{path}"),
                    format!("membership check on `{path}` omits declared values: {}", list(&missing)),
                ));
            }
        }
    }
}

/// Checks that enum dispatch covers every declared value or has a default.
fn enum_parity(ctx: &RuleContext<'_>, obs: &EnumObservation) -> Result<Vec<Violation>, RuleFault> {
    let (Some(reference), Some(field_path)) = (&obs.endpoint, &obs.field_path) else {
        return Ok(Vec::new());
    };
    let spec = ctx.endpoint(reference)?.endpoint;
    let direction = obs.direction.unwrap_or_else(|| spec.key.read_direction());
    let segments = path_segments(field_path);
    let matched = spec.walk(direction, &segments);
    let Some(declared) = matched.last().filter(|field| matched.len() == segments.len() && field.kind == FieldKind::Enum)
    else {
        return Ok(Vec::new());
    };
    if obs.has_default {
        return Ok(Vec::new());
    }
    let missing: Vec<String> = declared
        .values
        .iter()
        .filter(|value| !obs.handled.iter().any(|handled| handled == *value || names_match(handled, value)))
        .cloned()
        .collect();
    if missing.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![
        ctx.violation(
            obs.location.clone(),
            format!("enum:{field_path}"),
            format!(
                "dispatch on `{}` handles {} of {} declared values of `{field_path}` with no default; missing: {}",
                obs.subject,
                declared.values.len() - missing.len(),
                declared.values.len(),
                list(&missing)
            ),
        )
        .with_fix("handle the missing values or add a safe default branch"),
    ])
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

    use std::collections::BTreeSet;

    use super::*;
    use crate::core::observation::BoundarySide;
    use crate::core::observation::ValidationCheck;
    use crate::rules::MANIFEST_CONFORMANCE;
    use crate::rules::STRICTNESS_PARITY;
    use crate::rules::fixtures;

    fn variable(name: &str, value_ref: &str, line: u32) -> ObservedField {
        ObservedField {
            value_ref: Some(value_ref.to_string()),
            ..fixtures::field(name, ValueKind::Unknown, line)
        }
    }

    fn check(field: &str, kind: ValidationKind) -> ValidationCheck {
        ValidationCheck {
            field: field.to_string(),
            kind,
            location: fixtures::at("src/orders.ts", 3),
        }
    }

    fn subjects(violations: &[Violation]) -> Vec<&str> {
        violations.iter().map(Violation::subject).collect()
    }

    #[test]
    fn integer_returned_as_string_is_one_violation() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, MANIFEST_CONFORMANCE);
        let mut expires = fixtures::field("expires_in", ValueKind::String, 22);
        expires.conversion = Conversion::ToString;
        let obs = fixtures::produced(
            fixtures::token(&manifest),
            vec![fixtures::field("access_token", ValueKind::String, 21), expires],
        );
        let violations = manifest_conformance(&ctx, &RuleSubject::Response(&obs)).unwrap();
        assert_eq!(subjects(&violations), vec!["expires_in"]);
        assert!(violations[0].message().contains("declared integer"));
    }

    #[test]
    fn raw_decimal_conversion_and_bad_literals_are_flagged() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, MANIFEST_CONFORMANCE);
        let mut price = fixtures::field("price", ValueKind::String, 24);
        price.conversion = Conversion::ToString;
        let obs = fixtures::produced(
            fixtures::orders(&manifest),
            vec![
                fixtures::literal("order_id", ValueKind::String, "not-a-uuid", 21),
                fixtures::literal("status", ValueKind::String, "refunded", 22),
                fixtures::field("stock_count", ValueKind::Integer, 23),
                price,
            ],
        );
        let violations = manifest_conformance(&ctx, &RuleSubject::Response(&obs)).unwrap();
        assert_eq!(subjects(&violations), vec!["format:order_id", "enum:status", "format:price"]);
    }

    #[test]
    fn wire_name_drift_is_flagged_on_constructions_and_reads() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, MANIFEST_CONFORMANCE);
        let obs = fixtures::produced(
            fixtures::orders(&manifest),
            vec![fixtures::field("stockCount", ValueKind::Integer, 23)],
        );
        let violations = manifest_conformance(&ctx, &RuleSubject::Response(&obs)).unwrap();
        assert_eq!(subjects(&violations), vec!["name:stock_count"]);

        let mut reader = fixtures::consumed(fixtures::orders(&manifest), 40);
        reader.reads = vec![FieldRead {
            path: vec!["stockCount".to_string()],
            guards: vec![false],
            location: fixtures::at("src/orders.ts", 41),
        }];
        let violations = manifest_conformance(&ctx, &RuleSubject::Response(&reader)).unwrap();
        assert_eq!(subjects(&violations), vec!["name:stock_count"]);
        assert_eq!(violations[0].primary().line, 41);
    }

    #[test]
    fn conformant_request_is_clean() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, MANIFEST_CONFORMANCE);
        let obs = fixtures::sent(
            fixtures::orders(&manifest),
            vec![
                fixtures::literal("sku", ValueKind::String, "A-1", 11),
                fixtures::literal("quantity", ValueKind::Integer, "3", 12),
                fixtures::literal("contact_email", ValueKind::String, "a@b.io", 13),
                fixtures::literal("priority", ValueKind::String, "high", 14),
            ],
        );
        assert!(manifest_conformance(&ctx, &RuleSubject::Request(&obs)).unwrap().is_empty());
    }

    #[test]
    fn out_of_range_literal_is_flagged() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, MANIFEST_CONFORMANCE);
        let obs = fixtures::sent(
            fixtures::orders(&manifest),
            vec![fixtures::literal("quantity", ValueKind::Integer, "150", 12)],
        );
        let violations = manifest_conformance(&ctx, &RuleSubject::Request(&obs)).unwrap();
        assert_eq!(subjects(&violations), vec!["range:quantity"]);
    }

    #[test]
    fn missing_and_mismatched_range_checks() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, STRICTNESS_PARITY);
        let mut obs = fixtures::sent(
            fixtures::orders(&manifest),
            vec![variable("quantity", "qty", 12), variable("contact_email", "email", 13)],
        );
        let violations = strictness_parity(&ctx, &RuleSubject::Request(&obs)).unwrap();
        assert_eq!(subjects(&violations), vec!["range:quantity", "format:contact_email"]);

        obs.validations = vec![
            check("qty", ValidationKind::Range {
                bounds: vec![1.0, 50.0],
            }),
            check("email", ValidationKind::Format),
        ];
        let violations = strictness_parity(&ctx, &RuleSubject::Request(&obs)).unwrap();
        assert_eq!(subjects(&violations), vec!["range:quantity"]);
        assert!(violations[0].message().contains("mismatched: 100"));
    }

    #[test]
    fn partial_membership_check_lists_missing_values() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, STRICTNESS_PARITY);
        let mut obs = fixtures::sent(fixtures::orders(&manifest), vec![variable("priority", "priority", 14)]);
        obs.validations = vec![check("priority", ValidationKind::OneOf {
            values: vec!["low".to_string(), "normal".to_string()],
        })];
        let violations = strictness_parity(&ctx, &RuleSubject::Request(&obs)).unwrap();
        assert_eq!(subjects(&violations), vec!["enum:priority"]);
        assert!(violations[0].message().ends_with("high"));
    }

    #[test]
    fn partial_enum_dispatch_without_default_lists_missing_values() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, STRICTNESS_PARITY);
        let mut obs = EnumObservation {
            location: fixtures::at("src/orders.ts", 50),
            side: BoundarySide::Consumer,
            subject: "order.status".to_string(),
            endpoint: Some(fixtures::orders(&manifest)),
            direction: Some(BodyDirection::Response),
            field_path: Some("status".to_string()),
            handled: BTreeSet::from(["pending".to_string()]),
            has_default: false,
        };
        let violations = strictness_parity(&ctx, &RuleSubject::Enum(&obs)).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message().contains("handles 1 of 3"));
        assert!(violations[0].message().ends_with("missing: shipped, cancelled"));

        obs.has_default = true;
        assert!(strictness_parity(&ctx, &RuleSubject::Enum(&obs)).unwrap().is_empty());
    }
}
