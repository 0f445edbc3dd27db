// crates/contract-gate-core/src/runtime/correlator.rs
// ============================================================================
// Module: Contract Gate Cross-Boundary Correlator
// Description: Pairs producer and consumer views of each endpoint body.
// Purpose: Build transient correlations for the boundary rules.
// Dependencies: crate::core, crate::rules
// ============================================================================

//! ## Overview
//! For every endpoint of a contract that names both a producer and a
//! consumer codebase, the correlator gathers each side's view of every body
//! direction: fields constructed or read at call and handler sites, fields
//! declared on bound models, and enum dispatch. A [`Correlation`] is built
//! when both sides contributed something. Correlations borrow the
//! observation set and are dropped once boundary rules have run.
//!
//! Unit-mismatch scoring happens here so the evaluator sees only findings at
//! or above the cutoff; findings between the advisory floor and the cutoff
//! become advisory diagnostics instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::RuleId;
use crate::core::manifest::BodyDirection;
use crate::core::manifest::ContractManifest;
use crate::core::manifest::EndpointRef;
use crate::core::observation::BoundarySide;
use crate::core::observation::EnumObservation;
use crate::core::observation::FieldRead;
use crate::core::observation::ObservationSet;
use crate::core::observation::ObservedField;
use crate::core::observation::UnitObservations;
use crate::core::observation::ValueKind;
use crate::core::violation::Diagnostic;
use crate::core::violation::DiagnosticKind;
use crate::rules::BOUNDARY_UNIT_MISMATCH;
use crate::rules::boundary::assess_units;
use crate::rules::subjects::BoundaryField;
use crate::rules::subjects::Correlation;
use crate::rules::subjects::FieldOrigin;
use crate::rules::subjects::path_segments;
use crate::rules::subjects::sender_side;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Unit-mismatch thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelatorSettings {
    /// Minimum score reported as a violation.
    pub unit_mismatch_cutoff: f64,
    /// Minimum score reported as an advisory.
    pub advisory_floor: f64,
}

impl Default for CorrelatorSettings {
    fn default() -> Self {
        Self {
            unit_mismatch_cutoff: 0.7,
            advisory_floor: 0.4,
        }
    }
}

/// Correlations plus advisory diagnostics.
#[derive(Debug, Clone, Default)]
pub struct CorrelationSet<'a> {
    /// Correlations in manifest order.
    pub correlations: Vec<Correlation<'a>>,
    /// Low-confidence unit findings.
    pub advisories: Vec<Diagnostic>,
}

// ============================================================================
// SECTION: Field Gathering
// ============================================================================

/// Flattens an observed body into boundary fields.
fn flatten_observed(fields: &[ObservedField], prefix: &[String], origin: FieldOrigin, out: &mut Vec<BoundaryField>) {
    for field in fields {
        let mut path = prefix.to_vec();
        path.push(field.name.clone());
        out.push(BoundaryField {
            path: path.clone(),
            kind: field.kind,
            literal: field.literal.clone(),
            hints: field.value_ref.iter().cloned().collect(),
            location: field.location.clone(),
            origin,
        });
        if let Some(children) = &field.children {
            flatten_observed(children, &path, origin, out);
        }
    }
}

/// Converts a consumer read into a boundary field.
fn read_field(read: &FieldRead) -> BoundaryField {
    BoundaryField {
        path: read.path.clone(),
        kind: ValueKind::Unknown,
        literal: None,
        hints: Vec::new(),
        location: read.location.clone(),
        origin: FieldOrigin::Read,
    }
}

/// One side's view of one endpoint body.
#[derive(Debug, Default)]
struct SideView<'a> {
    /// Fields observed on the side.
    fields: Vec<BoundaryField>,
    /// Enum dispatch on the side.
    enums: Vec<&'a EnumObservation>,
}

impl SideView<'_> {
    /// Returns true when the side contributed nothing.
    fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.enums.is_empty()
    }
}

/// Gathers one side's view of one endpoint body from non-test units.
fn gather<'a>(
    units: &[&'a UnitObservations],
    reference: &EndpointRef,
    direction: BodyDirection,
    side: BoundarySide,
) -> SideView<'a> {
    let key = &reference.key;
    let bound = |endpoint: Option<&EndpointRef>| endpoint == Some(reference);
    let sending = sender_side(key, direction) == side;
    let mut view = SideView::default();
    for unit in units.iter().copied() {
        if direction == BodyDirection::Request {
            for obs in unit.requests.iter().filter(|obs| obs.side == side && bound(obs.endpoint.as_ref())) {
                let origin = if sending { FieldOrigin::Constructed } else { FieldOrigin::Read };
                flatten_observed(&obs.fields, &[], origin, &mut view.fields);
            }
        }
        if direction == key.read_direction() {
            for obs in unit.responses.iter().filter(|obs| obs.side == side && bound(obs.endpoint.as_ref())) {
                if sending {
                    if obs.produces_success() {
                        flatten_observed(&obs.produced, &[], FieldOrigin::Constructed, &mut view.fields);
                    }
                } else {
                    view.fields.extend(obs.reads.iter().map(read_field));
                }
            }
        }
        for model in unit.models.iter().filter(|model| model.side == side) {
            for binding in &model.bindings {
                if &binding.endpoint != reference || binding.direction != direction {
                    continue;
                }
                let prefix = path_segments(&binding.prefix);
                view.fields.extend(model.fields.iter().map(|field| {
                    let mut path = prefix.clone();
                    path.push(field.wire_name.clone());
                    BoundaryField {
                        path,
                        kind: field.kind,
                        literal: None,
                        hints: vec![field.declared_name.clone()],
                        location: field.location.clone(),
                        origin: FieldOrigin::Model,
                    }
                }));
            }
        }
        view.enums.extend(unit.enums.iter().filter(|obs| {
            obs.side == side
                && bound(obs.endpoint.as_ref())
                && obs.direction.unwrap_or_else(|| key.read_direction()) == direction
        }));
    }
    view
}

// ============================================================================
// SECTION: Correlation
// ============================================================================

/// Builds correlations for every two-sided contract endpoint.
#[must_use]
pub fn correlate<'a>(
    manifest: &'a ContractManifest,
    observations: &'a ObservationSet,
    settings: &CorrelatorSettings,
) -> CorrelationSet<'a> {
    let units: Vec<&UnitObservations> = observations.units().iter().filter(|unit| !unit.is_test).collect();
    let mut set = CorrelationSet::default();
    for resolved in manifest.endpoints() {
        if resolved.contract.producer.is_none() || resolved.contract.consumer.is_none() {
            continue;
        }
        let reference = resolved.reference();
        let directions: &[BodyDirection] = if reference.key.is_message() {
            &[BodyDirection::Request]
        } else {
            &[BodyDirection::Request, BodyDirection::Response]
        };
        for direction in directions {
            let producer = gather(&units, &reference, *direction, BoundarySide::Producer);
            let consumer = gather(&units, &reference, *direction, BoundarySide::Consumer);
            if producer.is_empty() || consumer.is_empty() {
                continue;
            }
            let mut correlation = Correlation {
                endpoint: resolved,
                reference: reference.clone(),
                direction: *direction,
                producer: producer.fields,
                consumer: consumer.fields,
                producer_enums: producer.enums,
                consumer_enums: consumer.enums,
                unit_mismatches: Vec::new(),
            };
            for finding in assess_units(&correlation) {
                if finding.score >= settings.unit_mismatch_cutoff {
                    correlation.unit_mismatches.push(finding);
                } else if finding.score >= settings.advisory_floor {
                    set.advisories.push(
                        Diagnostic::new(
                            DiagnosticKind::Advisory,
                            format!(
                                "`{}` of {} may disagree on units across the boundary: {}",
                                finding.field_path,
                                reference.key,
                                finding.signals.join(", ")
                            ),
                        )
                        .for_rule(RuleId::new(BOUNDARY_UNIT_MISMATCH))
                        .at(finding.consumer.clone())
                        .with_confidence(finding.score),
                    );
                }
            }
            set.correlations.push(correlation);
        }
    }
    set
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
    use crate::core::observation::ModelField;
    use crate::core::observation::ModelObservation;
    use crate::core::observation::ShapeBinding;
    use crate::core::source::Language;
    use crate::core::source::SourceLocation;
    use crate::rules::fixtures;

    fn unit(path: &str, side: BoundarySide) -> UnitObservations {
        UnitObservations::empty(path, Language::TypeScript, side, false)
    }

    fn consumer_model(reference: EndpointRef, fields: &[(&str, ValueKind)]) -> ModelObservation {
        ModelObservation {
            location: SourceLocation::new("web/types.ts", 1),
            side: BoundarySide::Consumer,
            name: "Order".to_string(),
            fields: fields
                .iter()
                .enumerate()
                .map(|(index, (name, kind))| ModelField {
                    declared_name: (*name).to_string(),
                    wire_name: (*name).to_string(),
                    explicit_wire_name: false,
                    kind: *kind,
                    optional: false,
                    location: SourceLocation::new("web/types.ts", u32::try_from(index).unwrap() + 2),
                })
                .collect(),
            bindings: vec![ShapeBinding {
                endpoint: reference,
                direction: BodyDirection::Response,
                prefix: String::new(),
                score: 1.0,
            }],
            ambiguous: Vec::new(),
        }
    }

    #[test]
    fn response_views_pair_producer_sends_with_consumer_models() {
        let manifest = fixtures::manifest();
        let reference = fixtures::orders(&manifest);
        let mut server = unit("svc/routes.ts", BoundarySide::Producer);
        server.responses.push(fixtures::produced(
            reference.clone(),
            vec![fixtures::field("stock_count", ValueKind::Integer, 7)],
        ));
        let mut client = unit("web/types.ts", BoundarySide::Consumer);
        client.models.push(consumer_model(reference, &[("stockCount", ValueKind::Integer)]));
        let observations = ObservationSet::new(vec![server, client]);

        let set = correlate(&manifest, &observations, &CorrelatorSettings::default());
        assert_eq!(set.correlations.len(), 1);
        let correlation = &set.correlations[0];
        assert_eq!(correlation.direction, BodyDirection::Response);
        assert_eq!(correlation.producer[0].name(), "stock_count");
        assert_eq!(correlation.consumer[0].name(), "stockCount");
        assert!(set.advisories.is_empty());
    }

    #[test]
    fn one_sided_endpoints_are_not_correlated() {
        let manifest = fixtures::manifest();
        let mut server = unit("svc/routes.ts", BoundarySide::Producer);
        server.responses.push(fixtures::produced(
            fixtures::orders(&manifest),
            vec![fixtures::field("stock_count", ValueKind::Integer, 7)],
        ));
        let observations = ObservationSet::new(vec![server]);
        assert!(correlate(&manifest, &observations, &CorrelatorSettings::default()).correlations.is_empty());
    }

    #[test]
    fn findings_below_the_cutoff_become_advisories() {
        let manifest = fixtures::manifest();
        let reference = fixtures::orders(&manifest);
        let mut server = unit("svc/routes.ts", BoundarySide::Producer);
        server.responses.push(fixtures::produced(
            reference.clone(),
            vec![fixtures::field("total_cents", ValueKind::Integer, 7)],
        ));
        let mut client = unit("web/types.ts", BoundarySide::Consumer);
        client.models.push(consumer_model(reference, &[("total_dollars", ValueKind::Integer)]));
        let observations = ObservationSet::new(vec![server, client]);

        let set = correlate(&manifest, &observations, &CorrelatorSettings::default());
        assert_eq!(set.correlations[0].unit_mismatches.len(), 1);
        assert!(set.advisories.is_empty());

        let strict = CorrelatorSettings {
            unit_mismatch_cutoff: 0.95,
            advisory_floor: 0.5,
        };
        let set = correlate(&manifest, &observations, &strict);
        assert_eq!(set.advisories.len(), 1);
        assert!(set.correlations[0].unit_mismatches.is_empty());
        assert!(set.advisories[0].confidence.is_some_and(|score| (score - 0.9).abs() < 1e-9));
    }
}
