// crates/contract-gate-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Contract Gate Rule Evaluator
// Description: Generic evaluation loop over the rule catalog.
// Purpose: Apply every enabled rule to every subject with fault isolation.
// Dependencies: crate::core, crate::rules
// ============================================================================

//! ## Overview
//! One loop evaluates every catalog entry against every subject kind it
//! accepts. Each (rule, subject) call is isolated: a returned
//! [`RuleFault`] or a panic discards that call's output, records a
//! `rule-fault` diagnostic naming the rule, and the loop continues.
//!
//! Subjects come in three passes: per-observation subjects of non-test
//! units (plus tests from test units), endpoint aggregates built for every
//! manifest endpoint, and correlations from the correlator.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;

use crate::core::identifiers::RuleId;
use crate::core::manifest::BodyDirection;
use crate::core::manifest::ContractManifest;
use crate::core::manifest::EndpointRef;
use crate::core::observation::ObservationSet;
use crate::core::observation::UnitObservations;
use crate::core::violation::Diagnostic;
use crate::core::violation::DiagnosticKind;
use crate::core::violation::Severity;
use crate::core::violation::Violation;
use crate::rules::REQUEST_SHAPE;
use crate::rules::RuleCatalog;
use crate::rules::RuleContext;
use crate::rules::RuleDescriptor;
use crate::rules::RuleFault;
use crate::rules::RuleLevel;
use crate::rules::RuleSubject;
use crate::rules::subjects::Correlation;
use crate::rules::subjects::EndpointAggregate;
use crate::rules::subjects::sender_side;

// ============================================================================
// SECTION: Output
// ============================================================================

/// Rule fault attributed to a rule and, when known, a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFaultRecord {
    /// Failing rule.
    pub rule_id: RuleId,
    /// Unit being evaluated, if any.
    pub unit: Option<String>,
    /// Fault description.
    pub message: String,
}

/// Violations, diagnostics, and faults from one evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct EvaluationOutput {
    /// Violations produced.
    pub violations: Vec<Violation>,
    /// Diagnostics produced.
    pub diagnostics: Vec<Diagnostic>,
    /// Faults caught.
    pub faults: Vec<RuleFaultRecord>,
}

/// Extracts a message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

// ============================================================================
// SECTION: Aggregates
// ============================================================================

/// Builds one aggregate per manifest endpoint.
///
/// Requests, responses, enum dispatch, and models come from non-test units;
/// tests come from test units.
#[must_use]
pub fn endpoint_aggregates<'a>(
    manifest: &'a ContractManifest,
    observations: &'a ObservationSet,
) -> Vec<EndpointAggregate<'a>> {
    let units = observations.units();
    manifest
        .endpoints()
        .map(|resolved| {
            let reference = resolved.reference();
            let bound = |endpoint: Option<&EndpointRef>| endpoint == Some(&reference);
            let code = || units.iter().filter(|unit| !unit.is_test);
            let requests = code().flat_map(|unit| &unit.requests).filter(|obs| bound(obs.endpoint.as_ref())).collect();
            let responses =
                code().flat_map(|unit| &unit.responses).filter(|obs| bound(obs.endpoint.as_ref())).collect();
            let enums = code().flat_map(|unit| &unit.enums).filter(|obs| bound(obs.endpoint.as_ref())).collect();
            let models = code()
                .flat_map(|unit| &unit.models)
                .flat_map(|model| model.bindings.iter().map(move |binding| (model, binding)))
                .filter(|(_, binding)| binding.endpoint == reference)
                .collect();
            let tests = units
                .iter()
                .filter(|unit| unit.is_test)
                .flat_map(|unit| &unit.tests)
                .filter(|test| test.endpoints.contains(&reference))
                .collect();
            EndpointAggregate {
                endpoint: resolved,
                reference: reference.clone(),
                requests,
                responses,
                enums,
                tests,
                models,
            }
        })
        .collect()
}

// ============================================================================
// SECTION: Evaluator
// ============================================================================

/// Generic rule evaluation loop.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    /// Shared manifest.
    manifest: &'a ContractManifest,
    /// Rules to apply.
    catalog: &'a RuleCatalog,
    /// Configured levels keyed by rule id.
    levels: &'a BTreeMap<String, RuleLevel>,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator.
    #[must_use]
    pub const fn new(
        manifest: &'a ContractManifest,
        catalog: &'a RuleCatalog,
        levels: &'a BTreeMap<String, RuleLevel>,
    ) -> Self {
        Self {
            manifest,
            catalog,
            levels,
        }
    }

    /// Effective severity of a rule; `None` when the rule is off.
    #[must_use]
    pub fn severity(&self, rule_id: &str) -> Option<Severity> {
        match self.levels.get(rule_id) {
            Some(level) => level.severity(),
            None => self.catalog.get(rule_id).map(|descriptor| descriptor.severity),
        }
    }

    /// Applies every enabled rule accepting the subject.
    pub fn evaluate_subject(&self, subject: &RuleSubject<'_>, unit: Option<&str>, out: &mut EvaluationOutput) {
        for descriptor in self.catalog.accepting(subject.kind()) {
            let Some(severity) = self.severity(descriptor.id) else {
                continue;
            };
            self.apply(descriptor, severity, subject, unit, out);
        }
    }

    /// Runs one rule on one subject with fault isolation.
    fn apply(
        &self,
        descriptor: &RuleDescriptor,
        severity: Severity,
        subject: &RuleSubject<'_>,
        unit: Option<&str>,
        out: &mut EvaluationOutput,
    ) {
        let ctx = RuleContext {
            manifest: self.manifest,
            rule_id: descriptor.rule_id(),
            severity,
        };
        let result = catch_unwind(AssertUnwindSafe(|| (descriptor.evaluate)(&ctx, subject)))
            .unwrap_or_else(|payload| Err(RuleFault::Panicked(panic_message(payload.as_ref()))));
        match result {
            Ok(violations) => out.violations.extend(violations),
            Err(fault) => {
                let message = fault.to_string();
                let mut diagnostic = Diagnostic::new(
                    DiagnosticKind::RuleFault,
                    format!("rule {} failed on a {} subject: {message}", descriptor.id, subject.kind()),
                )
                .for_rule(descriptor.rule_id());
                if let Some(unit) = unit {
                    diagnostic = diagnostic.for_unit(unit);
                }
                out.diagnostics.push(diagnostic);
                out.faults.push(RuleFaultRecord {
                    rule_id: descriptor.rule_id(),
                    unit: unit.map(ToString::to_string),
                    message,
                });
            }
        }
    }

    /// Evaluates every per-observation subject of one unit.
    fn evaluate_unit(&self, unit: &UnitObservations, out: &mut EvaluationOutput) {
        let name = Some(unit.unit.as_str());
        if unit.is_test {
            for test in &unit.tests {
                self.evaluate_subject(&RuleSubject::Test(test), name, out);
            }
            return;
        }
        for obs in &unit.requests {
            self.evaluate_subject(&RuleSubject::Request(obs), name, out);
        }
        for obs in &unit.responses {
            self.evaluate_subject(&RuleSubject::Response(obs), name, out);
        }
        for obs in &unit.errors {
            self.evaluate_subject(&RuleSubject::Error(obs), name, out);
        }
        for obs in &unit.enums {
            self.evaluate_subject(&RuleSubject::Enum(obs), name, out);
        }
        for obs in &unit.models {
            self.evaluate_subject(&RuleSubject::Model(obs), name, out);
        }
        self.coverage_diagnostics(unit, out);
    }

    /// Records partial-shape and ambiguous-binding diagnostics for a unit.
    fn coverage_diagnostics(&self, unit: &UnitObservations, out: &mut EvaluationOutput) {
        if self.severity(REQUEST_SHAPE).is_some() {
            for obs in unit.requests.iter().filter(|obs| obs.has_body && !obs.shape_known) {
                let Some(resolved) = obs.endpoint.as_ref().and_then(|reference| self.manifest.endpoint(reference))
                else {
                    continue;
                };
                let key = &resolved.endpoint.key;
                let requires = resolved.endpoint.request.fields.iter().any(|field| field.required);
                if obs.side != sender_side(key, BodyDirection::Request) || !requires {
                    continue;
                }
                out.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::PartialShape,
                        format!("request body for {key} is not a literal shape; required fields were not checked"),
                    )
                    .for_unit(&unit.unit)
                    .for_rule(RuleId::new(REQUEST_SHAPE))
                    .at(obs.location.clone()),
                );
            }
        }
        for model in unit.models.iter().filter(|model| !model.ambiguous.is_empty()) {
            let candidates: Vec<String> = model.ambiguous.iter().map(ToString::to_string).collect();
            out.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::AmbiguousBinding,
                    format!(
                        "model `{}` matches {} equally well and was left unbound",
                        model.name,
                        candidates.join(", ")
                    ),
                )
                .for_unit(&unit.unit)
                .at(model.location.clone()),
            );
        }
    }

    /// Evaluates per-observation subjects and endpoint aggregates.
    #[must_use]
    pub fn evaluate_observations(&self, observations: &ObservationSet) -> EvaluationOutput {
        let mut out = EvaluationOutput::default();
        for unit in observations.units() {
            self.evaluate_unit(unit, &mut out);
        }
        for aggregate in endpoint_aggregates(self.manifest, observations) {
            self.evaluate_subject(&RuleSubject::Endpoint(&aggregate), None, &mut out);
        }
        out
    }

    /// Evaluates boundary rules over correlations.
    #[must_use]
    pub fn evaluate_correlations(&self, correlations: &[Correlation<'_>]) -> EvaluationOutput {
        let mut out = EvaluationOutput::default();
        for correlation in correlations {
            self.evaluate_subject(&RuleSubject::Correlation(correlation), None, &mut out);
        }
        out
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
    use crate::core::observation::BoundarySide;
    use crate::core::observation::ValueKind;
    use crate::core::source::Language;
    use crate::rules::RESPONSE_SHAPE;
    use crate::rules::RuleFamily;
    use crate::rules::SubjectKind;
    use crate::rules::builtin_catalog;
    use crate::rules::fixtures;

    #[allow(clippy::panic, reason = "Exercises panic isolation in the evaluation loop.")]
    fn exploding(_: &RuleContext<'_>, _: &RuleSubject<'_>) -> Result<Vec<Violation>, RuleFault> {
        panic!("boom")
    }

    fn observations(manifest: &ContractManifest) -> ObservationSet {
        let mut unit = UnitObservations::empty("src/api.ts", Language::TypeScript, BoundarySide::Consumer, false);
        unit.requests.push(fixtures::sent(
            fixtures::token(manifest),
            vec![fixtures::literal("client_id", ValueKind::String, "web", 11)],
        ));
        ObservationSet::new(vec![unit])
    }

    #[test]
    fn panicking_rule_is_isolated_as_a_fault() {
        let manifest = fixtures::manifest();
        let mut catalog = builtin_catalog();
        catalog
            .register(RuleDescriptor {
                id: "CTR-exploding",
                family: RuleFamily::RequestShape,
                subjects: &[SubjectKind::Request],
                severity: Severity::Error,
                description: "always panics",
                rationale: "test",
                evaluate: exploding,
            })
            .unwrap();
        let levels = BTreeMap::new();
        let output = Evaluator::new(&manifest, &catalog, &levels).evaluate_observations(&observations(&manifest));

        assert_eq!(output.faults.len(), 1);
        assert_eq!(output.faults[0].rule_id.as_str(), "CTR-exploding");
        assert_eq!(output.faults[0].unit.as_deref(), Some("src/api.ts"));
        assert!(output.faults[0].message.contains("boom"));
        let missing: Vec<&str> = output
            .violations
            .iter()
            .filter(|violation| violation.rule_id().as_str() == REQUEST_SHAPE)
            .map(Violation::subject)
            .collect();
        assert!(missing.contains(&"grant_type"));
    }

    #[test]
    fn rules_turned_off_do_not_run() {
        let manifest = fixtures::manifest();
        let catalog = builtin_catalog();
        let levels = BTreeMap::from([(REQUEST_SHAPE.to_string(), RuleLevel::Off)]);
        let evaluator = Evaluator::new(&manifest, &catalog, &levels);
        assert_eq!(evaluator.severity(REQUEST_SHAPE), None);
        assert_eq!(evaluator.severity(RESPONSE_SHAPE), Some(Severity::Error));
        let output = evaluator.evaluate_observations(&observations(&manifest));
        assert!(output.violations.iter().all(|violation| violation.rule_id().as_str() != REQUEST_SHAPE));
    }

    #[test]
    fn aggregates_exist_for_every_endpoint() {
        let manifest = fixtures::manifest();
        let set = observations(&manifest);
        let aggregates = endpoint_aggregates(&manifest, &set);
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].requests.len(), 1);
        assert!(aggregates[1].requests.is_empty());
    }
}
