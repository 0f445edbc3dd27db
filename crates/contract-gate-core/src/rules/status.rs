// crates/contract-gate-core/src/rules/status.rs
// ============================================================================
// Module: Contract Gate Status Rules
// Description: Status-code handling and negative-case test coverage.
// Purpose: Compare declared status codes with consumer branches and tests.
// Dependencies: crate::core, crate::rules
// ============================================================================

//! ## Overview
//! Both rules run once per endpoint aggregate so they can see every consumer
//! branch and every test bound to the endpoint together. A consumer that
//! never checks the status at all gets one blanket finding instead of one per
//! declared code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::manifest::BodyDirection;
use crate::core::violation::Violation;
use crate::rules::RuleContext;
use crate::rules::RuleFault;
use crate::rules::RuleSubject;
use crate::rules::subjects::EndpointAggregate;
use crate::rules::subjects::sender_side;

// ============================================================================
// SECTION: Status Code Handling
// ============================================================================

/// Evaluates `CTR-status-code-handling` for one endpoint.
///
/// # Errors
///
/// Returns [`RuleFault`] for non-endpoint subjects.
pub fn status_code_handling(
    ctx: &RuleContext<'_>,
    subject: &RuleSubject<'_>,
) -> Result<Vec<Violation>, RuleFault> {
    let RuleSubject::Endpoint(aggregate) = subject else {
        return Err(subject.unexpected());
    };
    let spec = aggregate.endpoint.endpoint;
    if spec.key.is_message() {
        return Ok(Vec::new());
    }
    let mut violations = undeclared_statuses(ctx, aggregate);

    let readers: Vec<_> = aggregate.readers().collect();
    let Some(anchor) = readers.iter().map(|reader| &reader.location).min() else {
        return Ok(violations);
    };
    if !readers.iter().any(|reader| reader.status.any_check()) {
        violations.push(
            ctx.violation(
                anchor.clone(),
                "status:*",
                format!("responses from {} are consumed without any status check", spec.key),
            )
            .with_fix("branch on the response status before decoding the body"),
        );
        return Ok(violations);
    }
    for code in spec.status_codes.codes() {
        if !readers.iter().any(|reader| reader.status.covers(code)) {
            violations.push(
                ctx.violation(
                    anchor.clone(),
                    format!("status:{code}"),
                    format!("declared status {code} of {} is not handled by any consumer branch", spec.key),
                )
                .with_fix(format!("add a branch for status {code}")),
            );
        }
    }
    Ok(violations)
}

/// Producer sites returning codes the manifest does not declare.
fn undeclared_statuses(ctx: &RuleContext<'_>, aggregate: &EndpointAggregate<'_>) -> Vec<Violation> {
    let spec = aggregate.endpoint.endpoint;
    if spec.status_codes.is_empty() {
        return Vec::new();
    }
    let producer = sender_side(&spec.key, BodyDirection::Response);
    let mut violations = Vec::new();
    for obs in aggregate.responses.iter().filter(|obs| obs.side == producer) {
        for code in obs.status.codes.iter().filter(|code| !spec.status_codes.contains(**code)) {
            violations.push(ctx.violation(
                obs.location.clone(),
                format!("undeclared-status:{code}"),
                format!("handler for {} returns status {code}, which the manifest does not declare", spec.key),
            ));
        }
    }
    violations
}

// ============================================================================
// SECTION: Negative Cases
// ============================================================================

/// Evaluates `TQ-negative-cases` for one endpoint.
///
/// # Errors
///
/// Returns [`RuleFault`] for non-endpoint subjects.
pub fn negative_cases(
    ctx: &RuleContext<'_>,
    subject: &RuleSubject<'_>,
) -> Result<Vec<Violation>, RuleFault> {
    let RuleSubject::Endpoint(aggregate) = subject else {
        return Err(subject.unexpected());
    };
    let spec = aggregate.endpoint.endpoint;
    let Some(anchor) = aggregate.tests.iter().map(|test| &test.location).min() else {
        return Ok(Vec::new());
    };
    let failures: Vec<u16> = spec.status_codes.non_success().collect();
    if failures.is_empty() {
        return Ok(Vec::new());
    }
    let exercised: BTreeSet<u16> =
        aggregate.tests.iter().flat_map(|test| test.status_codes.iter().copied()).collect();
    if failures.iter().any(|code| exercised.contains(code)) {
        return Ok(Vec::new());
    }
    let missing: Vec<String> = failures.iter().map(ToString::to_string).collect();
    Ok(vec![
        ctx.violation(
            anchor.clone(),
            "negative-cases",
            format!(
                "tests for {} exercise none of the {} declared failure statuses: {}",
                spec.key,
                failures.len(),
                missing.join(", ")
            ),
        )
        .with_fix("add tests that drive the endpoint into at least one declared failure status"),
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

    use super::*;
    use crate::core::manifest::ContractManifest;
    use crate::core::manifest::EndpointRef;
    use crate::core::observation::ResponseObservation;
    use crate::core::observation::TestObservation;
    use crate::rules::NEGATIVE_CASES;
    use crate::rules::STATUS_CODE_HANDLING;
    use crate::rules::fixtures;

    fn aggregate<'a>(
        manifest: &'a ContractManifest,
        reference: &EndpointRef,
        responses: Vec<&'a ResponseObservation>,
        tests: Vec<&'a TestObservation>,
    ) -> EndpointAggregate<'a> {
        let resolved = manifest.endpoint(reference).unwrap();
        EndpointAggregate {
            endpoint: resolved,
            reference: resolved.reference(),
            requests: Vec::new(),
            responses,
            enums: Vec::new(),
            tests,
            models: Vec::new(),
        }
    }

    fn test_case(reference: &EndpointRef, codes: &[u16], line: u32) -> TestObservation {
        TestObservation {
            location: fixtures::at("tests/orders.test.ts", line),
            name: format!("case at {line}"),
            endpoints: vec![reference.clone()],
            assertions: Vec::new(),
            status_codes: codes.iter().copied().collect(),
        }
    }

    #[test]
    fn unchecked_consumer_gets_one_blanket_violation() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, STATUS_CODE_HANDLING);
        let reference = fixtures::token(&manifest);
        let consumer = fixtures::consumed(reference.clone(), 12);
        let aggregate = aggregate(&manifest, &reference, vec![&consumer], Vec::new());
        let violations = status_code_handling(&ctx, &RuleSubject::Endpoint(&aggregate)).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].subject(), "status:*");
    }

    #[test]
    fn each_unhandled_code_is_reported() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, STATUS_CODE_HANDLING);
        let reference = fixtures::token(&manifest);
        let mut consumer = fixtures::consumed(reference.clone(), 12);
        consumer.status = fixtures::codes(&[401]);
        consumer.status.success_check = true;
        consumer.status.classes.insert(5);
        let aggregate = aggregate(&manifest, &reference, vec![&consumer], Vec::new());
        let violations = status_code_handling(&ctx, &RuleSubject::Endpoint(&aggregate)).unwrap();
        let subjects: Vec<&str> = violations.iter().map(Violation::subject).collect();
        assert_eq!(subjects, vec!["status:400"]);
    }

    #[test]
    fn producer_returning_undeclared_status_is_flagged() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, STATUS_CODE_HANDLING);
        let reference = fixtures::token(&manifest);
        let mut producer = fixtures::produced(reference.clone(), Vec::new());
        producer.status = fixtures::codes(&[418]);
        let aggregate = aggregate(&manifest, &reference, vec![&producer], Vec::new());
        let violations = status_code_handling(&ctx, &RuleSubject::Endpoint(&aggregate)).unwrap();
        let subjects: Vec<&str> = violations.iter().map(Violation::subject).collect();
        assert_eq!(subjects, vec!["undeclared-status:418"]);
    }

    #[test]
    fn happy_path_suite_lists_every_failure_status() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, NEGATIVE_CASES);
        let reference = fixtures::orders(&manifest);
        let first = test_case(&reference, &[201], 8);
        let second = test_case(&reference, &[201], 3);
        let aggregate = aggregate(&manifest, &reference, Vec::new(), vec![&first, &second]);
        let violations = negative_cases(&ctx, &RuleSubject::Endpoint(&aggregate)).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].primary().line, 3);
        assert!(violations[0].message().contains("400, 404, 409, 422, 500, 502, 503"));
    }

    #[test]
    fn one_failure_case_satisfies_negative_coverage() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, NEGATIVE_CASES);
        let reference = fixtures::orders(&manifest);
        let case = test_case(&reference, &[201, 422], 8);
        let aggregate = aggregate(&manifest, &reference, Vec::new(), vec![&case]);
        assert!(negative_cases(&ctx, &RuleSubject::Endpoint(&aggregate)).unwrap().is_empty());
    }
}
