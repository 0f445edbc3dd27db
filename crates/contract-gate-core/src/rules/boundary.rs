// crates/contract-gate-core/src/rules/boundary.rs
// ============================================================================
// Module: Contract Gate Boundary Rules
// Description: Naming drift, unit mismatch, and enum divergence across the
//              producer/consumer boundary.
// Purpose: Compare two independently written views of one endpoint body.
// Dependencies: crate::core, crate::rules
// ============================================================================

//! ## Overview
//! Boundary rules run over a [`Correlation`]: the producer's and the
//! consumer's view of one endpoint body. Every finding names a site on each
//! side.
//!
//! Unit mismatch is a heuristic. [`assess_units`] scores each numeric
//! manifest field from unit words in names, the manifest `unit` label,
//! integer/float disagreement, and literal magnitudes:
//!
//! | Signal | Weight |
//! |--------|--------|
//! | sides name different units of one dimension | 0.6 |
//! | a side contradicts the manifest unit | 0.3 |
//! | integer on one side, float on the other | 0.2 |
//! | literal magnitudes differ by ~10x, ~100x or ~1000x | 0.3 |
//!
//! Scores are clamped to `[0, 1]`. The correlator keeps findings at or above
//! the configured cutoff for [`unit_mismatch`] and turns lower findings above
//! the advisory floor into advisory diagnostics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::manifest::FieldKind;
use crate::core::manifest::FieldRef;
use crate::core::manifest::FieldSpec;
use crate::core::naming::normalize_name;
use crate::core::naming::split_words;
use crate::core::observation::BoundarySide;
use crate::core::observation::EnumObservation;
use crate::core::observation::ValueKind;
use crate::core::source::SourceLocation;
use crate::core::violation::Violation;
use crate::rules::RuleContext;
use crate::rules::RuleFault;
use crate::rules::RuleSubject;
use crate::rules::subjects::BoundaryField;
use crate::rules::subjects::Correlation;
use crate::rules::subjects::UnitMismatchFinding;
use crate::rules::subjects::list;
use crate::rules::subjects::path_segments;

// ============================================================================
// SECTION: Unit Vocabulary
// ============================================================================

/// Unit word with its dimension and scale relative to the dimension's base.
#[derive(Debug, Clone, Copy, PartialEq)]
struct UnitWord {
    /// Word as it appears in identifiers.
    word: &'static str,
    /// Physical or monetary dimension.
    dimension: &'static str,
    /// Scale relative to the dimension's base unit.
    scale: f64,
}

/// Builds a unit word entry.
const fn unit(word: &'static str, dimension: &'static str, scale: f64) -> UnitWord {
    UnitWord {
        word,
        dimension,
        scale,
    }
}

/// Recognized unit words. Single letters are excluded; they collide with
/// ordinary identifiers.
const UNIT_WORDS: &[UnitWord] = &[
    unit("cents", "money", 0.01),
    unit("cent", "money", 0.01),
    unit("pennies", "money", 0.01),
    unit("dollars", "money", 1.0),
    unit("dollar", "money", 1.0),
    unit("euros", "money", 1.0),
    unit("ns", "time", 1e-9),
    unit("nanos", "time", 1e-9),
    unit("nanoseconds", "time", 1e-9),
    unit("micros", "time", 1e-6),
    unit("microseconds", "time", 1e-6),
    unit("ms", "time", 1e-3),
    unit("millis", "time", 1e-3),
    unit("milliseconds", "time", 1e-3),
    unit("sec", "time", 1.0),
    unit("secs", "time", 1.0),
    unit("seconds", "time", 1.0),
    unit("mins", "time", 60.0),
    unit("minutes", "time", 60.0),
    unit("hours", "time", 3600.0),
    unit("hrs", "time", 3600.0),
    unit("days", "time", 86_400.0),
    unit("mg", "mass", 1e-3),
    unit("milligrams", "mass", 1e-3),
    unit("grams", "mass", 1.0),
    unit("kg", "mass", 1000.0),
    unit("kilograms", "mass", 1000.0),
    unit("mm", "length", 1e-3),
    unit("cm", "length", 1e-2),
    unit("meters", "length", 1.0),
    unit("metres", "length", 1.0),
    unit("km", "length", 1000.0),
    unit("percent", "ratio", 0.01),
    unit("pct", "ratio", 0.01),
    unit("percentage", "ratio", 0.01),
    unit("ratio", "ratio", 1.0),
    unit("fraction", "ratio", 1.0),
    unit("bytes", "size", 1.0),
    unit("kb", "size", 1024.0),
    unit("kib", "size", 1024.0),
    unit("mb", "size", 1_048_576.0),
    unit("mib", "size", 1_048_576.0),
];

/// Weight for conflicting unit words across sides.
const CROSS_SIDE_WEIGHT: f64 = 0.6;
/// Weight for a side contradicting the manifest unit.
const MANIFEST_WEIGHT: f64 = 0.3;
/// Weight for integer/float disagreement.
const PRECISION_WEIGHT: f64 = 0.2;
/// Weight for literal magnitudes a power of ten apart.
const MAGNITUDE_WEIGHT: f64 = 0.3;
/// Relative tolerance for magnitude ratios.
const MAGNITUDE_TOLERANCE: f64 = 0.05;

/// Looks up a unit word.
fn unit_word(word: &str) -> Option<UnitWord> {
    UNIT_WORDS.iter().copied().find(|entry| entry.word == word)
}

/// Unit words found in a name.
fn units_in(name: &str) -> Vec<UnitWord> {
    split_words(name).iter().filter_map(|word| unit_word(word)).collect()
}

/// Unit words a boundary field carries through its name and hints.
fn field_units(field: &BoundaryField) -> Vec<UnitWord> {
    let mut units = units_in(field.name());
    for hint in &field.hints {
        for found in units_in(hint) {
            if !units.contains(&found) {
                units.push(found);
            }
        }
    }
    units
}

/// Normalized name with unit words removed.
fn strip_units(name: &str) -> String {
    split_words(name).into_iter().filter(|word| unit_word(word).is_none()).collect()
}

/// First pair of units sharing a dimension but differing in scale.
fn conflict(left: &[UnitWord], right: &[UnitWord]) -> Option<(UnitWord, UnitWord)> {
    left.iter().find_map(|a| {
        right
            .iter()
            .find(|b| a.dimension == b.dimension && (a.scale - b.scale).abs() > f64::EPSILON * a.scale.abs())
            .map(|b| (*a, *b))
    })
}

// ============================================================================
// SECTION: Field Matching
// ============================================================================

/// Normalizes every segment of a path.
fn normalized(path: &[String]) -> Vec<String> {
    path.iter().map(|segment| normalize_name(segment)).collect()
}

/// Side fields whose normalized path equals the manifest path.
fn exact_matches<'f>(fields: &'f [BoundaryField], manifest_path: &[String]) -> Vec<&'f BoundaryField> {
    let wanted = normalized(manifest_path);
    fields.iter().filter(|field| normalized(&field.path) == wanted).collect()
}

/// Side fields matching the manifest path, also accepting a leaf that only
/// differs by unit words.
fn unit_matches<'f>(fields: &'f [BoundaryField], manifest_path: &[String]) -> Vec<&'f BoundaryField> {
    let Some((leaf, parents)) = manifest_path.split_last() else {
        return Vec::new();
    };
    let parents = normalized(parents);
    let stripped = strip_units(leaf);
    fields
        .iter()
        .filter(|field| {
            let Some((field_leaf, field_parents)) = field.path.split_last() else {
                return false;
            };
            normalized(field_parents) == parents
                && (normalize_name(field_leaf) == normalize_name(leaf)
                    || (!stripped.is_empty() && strip_units(field_leaf) == stripped))
        })
        .collect()
}

/// Earliest field by location.
fn representative<'f>(fields: &[&'f BoundaryField]) -> Option<&'f BoundaryField> {
    fields.iter().copied().min_by(|left, right| left.location.cmp(&right.location))
}

/// Returns the opposite side.
const fn other(side: BoundarySide) -> BoundarySide {
    match side {
        BoundarySide::Producer => BoundarySide::Consumer,
        BoundarySide::Consumer | BoundarySide::Unknown => BoundarySide::Producer,
    }
}

/// Returns a label for a side.
const fn side_label(side: BoundarySide) -> &'static str {
    match side {
        BoundarySide::Producer => "producer",
        BoundarySide::Consumer => "consumer",
        BoundarySide::Unknown => "unknown side",
    }
}

// ============================================================================
// SECTION: Naming Drift
// ============================================================================

/// Evaluates `CTR-boundary-naming-drift` for one correlation.
///
/// # Errors
///
/// Returns [`RuleFault`] for non-correlation subjects.
pub fn naming_drift(ctx: &RuleContext<'_>, subject: &RuleSubject<'_>) -> Result<Vec<Violation>, RuleFault> {
    let RuleSubject::Correlation(correlation) = subject else {
        return Err(subject.unexpected());
    };
    let mut violations = Vec::new();
    for field in correlation.endpoint.endpoint.flattened(correlation.direction) {
        let manifest_path = path_segments(field.path);
        let producer = representative(&exact_matches(&correlation.producer, &manifest_path));
        let consumer = representative(&exact_matches(&correlation.consumer, &manifest_path));
        let (Some(producer), Some(consumer)) = (producer, consumer) else {
            continue;
        };
        let canonical = field.spec.name.as_str();
        let (deviating, conforming, side) = match (producer.name() == canonical, consumer.name() == canonical) {
            (true, false) => (consumer, producer, BoundarySide::Consumer),
            (false, true) => (producer, consumer, BoundarySide::Producer),
            _ => continue,
        };
        violations.push(
            ctx.violation(
                deviating.location.clone(),
                field.path,
                format!(
                    "{} uses `{}` for `{}` while the {} and the manifest use `{canonical}`",
                    side_label(side),
                    deviating.name(),
                    field.path,
                    side_label(other(side))
                ),
            )
            .with_location(conforming.location.clone())
            .with_fix(format!("rename `{}` to `{canonical}`", deviating.name())),
        );
    }
    Ok(violations)
}

// ============================================================================
// SECTION: Unit Mismatch
// ============================================================================

/// Scores every numeric manifest field of a correlation for unit
/// disagreement.
///
/// Returns findings with a positive score in manifest order.
#[must_use]
pub fn assess_units(correlation: &Correlation<'_>) -> Vec<UnitMismatchFinding> {
    let mut findings = Vec::new();
    for field in correlation.endpoint.endpoint.flattened(correlation.direction) {
        if !matches!(field.spec.kind, FieldKind::Integer | FieldKind::Number) {
            continue;
        }
        let manifest_path = path_segments(field.path);
        let producer = representative(&unit_matches(&correlation.producer, &manifest_path));
        let consumer = representative(&unit_matches(&correlation.consumer, &manifest_path));
        let (Some(producer), Some(consumer)) = (producer, consumer) else {
            continue;
        };
        if let Some(finding) = score_pair(field, producer, consumer) {
            findings.push(finding);
        }
    }
    findings
}

/// Scores one producer/consumer pair.
fn score_pair(field: FieldRef<'_>, producer: &BoundaryField, consumer: &BoundaryField) -> Option<UnitMismatchFinding> {
    let mut score = 0.0;
    let mut signals = Vec::new();
    let producer_units = field_units(producer);
    let consumer_units = field_units(consumer);

    if let Some((left, right)) = conflict(&producer_units, &consumer_units) {
        score += CROSS_SIDE_WEIGHT;
        signals.push(format!(
            "producer `{}` is in {} but consumer `{}` is in {}",
            producer.name(),
            left.word,
            consumer.name(),
            right.word
        ));
    }
    if let Some(signal) = manifest_conflict(field.spec, &producer_units, &consumer_units) {
        score += MANIFEST_WEIGHT;
        signals.push(signal);
    }
    match (producer.kind, consumer.kind) {
        (ValueKind::Integer, ValueKind::Float) | (ValueKind::Float, ValueKind::Integer) => {
            score += PRECISION_WEIGHT;
            signals.push(format!(
                "producer treats it as {} but consumer as {}",
                producer.kind.as_str(),
                consumer.kind.as_str()
            ));
        }
        _ => {}
    }
    if let Some(factor) = magnitude_factor(producer, consumer) {
        score += MAGNITUDE_WEIGHT;
        signals.push(format!("literal magnitudes differ by about {factor}x"));
    }

    (score > 0.0).then(|| UnitMismatchFinding {
        field_path: field.path.to_string(),
        score: f64::min(score, 1.0),
        signals,
        producer: producer.location.clone(),
        consumer: consumer.location.clone(),
    })
}

/// Returns a signal when a side names a unit contradicting the manifest.
fn manifest_conflict(spec: &FieldSpec, producer: &[UnitWord], consumer: &[UnitWord]) -> Option<String> {
    let declared = units_in(spec.unit.as_deref().unwrap_or_default());
    [(BoundarySide::Producer, producer), (BoundarySide::Consumer, consumer)].into_iter().find_map(
        |(side, units)| {
            conflict(&declared, units).map(|(expected, found)| {
                format!("manifest declares {} but the {} names {}", expected.word, side_label(side), found.word)
            })
        },
    )
}

/// Returns the power-of-ten factor between two numeric literals.
fn magnitude_factor(producer: &BoundaryField, consumer: &BoundaryField) -> Option<u32> {
    let left: f64 = producer.literal.as_deref()?.parse().ok()?;
    let right: f64 = consumer.literal.as_deref()?.parse().ok()?;
    let (small, large) = if left.abs() < right.abs() { (left.abs(), right.abs()) } else { (right.abs(), left.abs()) };
    if small <= 0.0 {
        return None;
    }
    let ratio = large / small;
    [10_u32, 100, 1000]
        .into_iter()
        .find(|factor| (ratio - f64::from(*factor)).abs() <= f64::from(*factor) * MAGNITUDE_TOLERANCE)
}

/// Evaluates `CTR-boundary-unit-mismatch` for one correlation.
///
/// # Errors
///
/// Returns [`RuleFault`] for non-correlation subjects.
pub fn unit_mismatch(ctx: &RuleContext<'_>, subject: &RuleSubject<'_>) -> Result<Vec<Violation>, RuleFault> {
    let RuleSubject::Correlation(correlation) = subject else {
        return Err(subject.unexpected());
    };
    let receiver_is_consumer = correlation.sender() == BoundarySide::Producer;
    Ok(correlation
        .unit_mismatches
        .iter()
        .map(|finding| {
            let (primary, secondary) = if receiver_is_consumer {
                (&finding.consumer, &finding.producer)
            } else {
                (&finding.producer, &finding.consumer)
            };
            ctx.violation(
                primary.clone(),
                finding.field_path.clone(),
                format!(
                    "`{}` likely disagrees on units across the boundary (confidence {:.2}): {}",
                    finding.field_path,
                    finding.score,
                    list(&finding.signals)
                ),
            )
            .with_location(secondary.clone())
            .with_fix("agree on one unit and encode it in the field name or manifest `unit`")
        })
        .collect())
}

// ============================================================================
// SECTION: Enum Divergence
// ============================================================================

/// Returns true when an enum dispatch targets the manifest path.
fn dispatches_on(obs: &EnumObservation, manifest_path: &[String]) -> bool {
    obs.field_path.as_deref().is_some_and(|path| normalized(&path_segments(path)) == normalized(manifest_path))
}

/// Evaluates `CTR-boundary-enum-divergence` for one correlation.
///
/// # Errors
///
/// Returns [`RuleFault`] for non-correlation subjects.
pub fn enum_divergence(ctx: &RuleContext<'_>, subject: &RuleSubject<'_>) -> Result<Vec<Violation>, RuleFault> {
    let RuleSubject::Correlation(correlation) = subject else {
        return Err(subject.unexpected());
    };
    let sender = correlation.sender();
    let receiver = other(sender);
    let mut violations = Vec::new();
    for field in correlation.endpoint.endpoint.flattened(correlation.direction) {
        if field.spec.kind != FieldKind::Enum {
            continue;
        }
        let manifest_path = path_segments(field.path);
        let receiving: Vec<&EnumObservation> = correlation
            .enums(receiver)
            .iter()
            .copied()
            .filter(|obs| dispatches_on(obs, &manifest_path))
            .collect();
        let Some(dispatch) = receiving.iter().map(|obs| &obs.location).min() else {
            continue;
        };
        if receiving.iter().any(|obs| obs.has_default) {
            continue;
        }

        let mut sent: BTreeSet<&str> = BTreeSet::new();
        let mut sites: Vec<&SourceLocation> = Vec::new();
        for boundary in exact_matches(correlation.fields(sender), &manifest_path) {
            if let Some(literal) = &boundary.literal {
                sent.insert(literal.as_str());
                sites.push(&boundary.location);
            }
        }
        for obs in correlation.enums(sender).iter().filter(|obs| dispatches_on(obs, &manifest_path)) {
            sent.extend(obs.handled.iter().map(String::as_str));
            sites.push(&obs.location);
        }
        let handled: BTreeSet<&str> =
            receiving.iter().flat_map(|obs| obs.handled.iter().map(String::as_str)).collect();
        let missing: Vec<String> = field
            .spec
            .values
            .iter()
            .filter(|value| sent.contains(value.as_str()) && !handled.contains(value.as_str()))
            .cloned()
            .collect();
        let Some(site) = sites.into_iter().min() else {
            continue;
        };
        if missing.is_empty() {
            continue;
        }
        violations.push(
            ctx.violation(
                dispatch.clone(),
                format!("enum:{}", field.path),
                format!(
                    "{} sends {} for `{}` but the {} dispatch does not handle {}",
                    side_label(sender),
                    list(&missing),
                    field.path,
                    side_label(receiver),
                    if missing.len() == 1 { "it" } else { "them" }
                ),
            )
            .with_location(site.clone())
            .with_fix("handle every value the other side sends or add a safe default branch"),
        );
    }
    Ok(violations)
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
    use crate::core::manifest::BodyDirection;
    use crate::core::manifest::ContractManifest;
    use crate::rules::BOUNDARY_ENUM_DIVERGENCE;
    use crate::rules::BOUNDARY_NAMING_DRIFT;
    use crate::rules::BOUNDARY_UNIT_MISMATCH;
    use crate::rules::fixtures;
    use crate::rules::subjects::FieldOrigin;

    fn boundary(name: &str, kind: ValueKind, literal: Option<&str>, file: &str, line: u32) -> BoundaryField {
        BoundaryField {
            path: vec![name.to_string()],
            kind,
            literal: literal.map(ToString::to_string),
            hints: Vec::new(),
            location: fixtures::at(file, line),
            origin: FieldOrigin::Constructed,
        }
    }

    fn correlation<'a>(
        manifest: &'a ContractManifest,
        producer: Vec<BoundaryField>,
        consumer: Vec<BoundaryField>,
    ) -> Correlation<'a> {
        let resolved = manifest.endpoint(&fixtures::orders(manifest)).unwrap();
        Correlation {
            endpoint: resolved,
            reference: resolved.reference(),
            direction: BodyDirection::Response,
            producer,
            consumer,
            producer_enums: Vec::new(),
            consumer_enums: Vec::new(),
            unit_mismatches: Vec::new(),
        }
    }

    #[test]
    fn drift_names_both_sites_and_blames_the_deviating_side() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, BOUNDARY_NAMING_DRIFT);
        let correlation = correlation(
            &manifest,
            vec![boundary("stock_count", ValueKind::Integer, None, "svc/orders.py", 12)],
            vec![boundary("stockCount", ValueKind::Integer, None, "web/orders.ts", 30)],
        );
        let violations = naming_drift(&ctx, &RuleSubject::Correlation(&correlation)).unwrap();
        assert_eq!(violations.len(), 1);
        let files: Vec<&str> = violations[0].locations().iter().map(|location| location.file.as_str()).collect();
        assert_eq!(files, vec!["web/orders.ts", "svc/orders.py"]);
        assert!(violations[0].message().starts_with("consumer uses `stockCount`"));
    }

    #[test]
    fn matching_names_are_not_drift() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, BOUNDARY_NAMING_DRIFT);
        let correlation = correlation(
            &manifest,
            vec![boundary("stock_count", ValueKind::Integer, None, "svc/orders.py", 12)],
            vec![boundary("stock_count", ValueKind::Integer, None, "web/orders.ts", 30)],
        );
        assert!(naming_drift(&ctx, &RuleSubject::Correlation(&correlation)).unwrap().is_empty());
    }

    #[test]
    fn cents_versus_dollars_scores_above_cutoff() {
        let manifest = fixtures::manifest();
        let correlation = correlation(
            &manifest,
            vec![boundary("total_cents", ValueKind::Integer, Some("1999"), "svc/orders.py", 14)],
            vec![boundary("total_dollars", ValueKind::Float, Some("19.99"), "web/orders.ts", 31)],
        );
        let findings = assess_units(&correlation);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field_path, "total_cents");
        assert!(findings[0].score >= 0.7);
        assert!((findings[0].score - 1.0).abs() < 1e-9);

        let mut flagged = correlation.clone();
        flagged.unit_mismatches = findings;
        let ctx = fixtures::context(&manifest, BOUNDARY_UNIT_MISMATCH);
        let violations = unit_mismatch(&ctx, &RuleSubject::Correlation(&flagged)).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].primary().file, "web/orders.ts");
    }

    #[test]
    fn precision_alone_stays_below_advisory_floor() {
        let manifest = fixtures::manifest();
        let correlation = correlation(
            &manifest,
            vec![boundary("stock_count", ValueKind::Integer, None, "svc/orders.py", 14)],
            vec![boundary("stock_count", ValueKind::Float, None, "web/orders.ts", 31)],
        );
        let findings = assess_units(&correlation);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].score < 0.4);
    }

    #[test]
    fn receiver_dispatch_missing_sent_value() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, BOUNDARY_ENUM_DIVERGENCE);
        let dispatch = EnumObservation {
            location: fixtures::at("web/orders.ts", 50),
            side: BoundarySide::Consumer,
            subject: "order.status".to_string(),
            endpoint: Some(fixtures::orders(&manifest)),
            direction: Some(BodyDirection::Response),
            field_path: Some("status".to_string()),
            handled: BTreeSet::from(["pending".to_string(), "shipped".to_string()]),
            has_default: false,
        };
        let mut correlation = correlation(
            &manifest,
            vec![
                boundary("status", ValueKind::String, Some("cancelled"), "svc/orders.py", 18),
                boundary("status", ValueKind::String, Some("shipped"), "svc/orders.py", 16),
            ],
            Vec::new(),
        );
        correlation.consumer_enums = vec![&dispatch];
        let violations = enum_divergence(&ctx, &RuleSubject::Correlation(&correlation)).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message().contains("sends cancelled"));
        assert_eq!(violations[0].locations().len(), 2);
        assert_eq!(violations[0].locations()[1].line, 16);
    }
}
