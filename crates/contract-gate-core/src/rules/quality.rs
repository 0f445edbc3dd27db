// crates/contract-gate-core/src/rules/quality.rs
// ============================================================================
// Module: Contract Gate Quality Rules
// Description: Error-path coverage and assertion depth.
// Purpose: Flag unhandled fallible calls and presence-only test assertions.
// Dependencies: crate::core, crate::rules
// ============================================================================

//! ## Overview
//! Test-quality rules. Shallow assertions are only a finding when the
//! asserted field can take more than one distinguishing value; a presence
//! check on a single-valued enum already pins the value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::manifest::BodyDirection;
use crate::core::manifest::ResolvedEndpoint;
use crate::core::observation::AssertionDepth;
use crate::core::observation::ErrorHandling;
use crate::core::violation::Violation;
use crate::rules::RuleContext;
use crate::rules::RuleFault;
use crate::rules::RuleSubject;

// ============================================================================
// SECTION: Error Path Coverage
// ============================================================================

/// Evaluates `TQ-error-path-coverage` for one fallible call.
///
/// # Errors
///
/// Returns [`RuleFault`] for non-error subjects.
pub fn error_path_coverage(
    ctx: &RuleContext<'_>,
    subject: &RuleSubject<'_>,
) -> Result<Vec<Violation>, RuleFault> {
    let RuleSubject::Error(obs) = subject else {
        return Err(subject.unexpected());
    };
    if obs.handling != ErrorHandling::Unhandled {
        return Ok(Vec::new());
    }
    let target = obs.endpoint.as_ref().map(|reference| format!(" to {}", reference.key)).unwrap_or_default();
    Ok(vec![
        ctx.violation(
            obs.location.clone(),
            format!("{}:{}", obs.operation.as_str(), obs.call),
            format!(
                "{} `{}`{target} has no reachable recovery or propagation path",
                obs.operation.as_str(),
                obs.call
            ),
        )
        .with_fix("catch the failure and recover, or propagate it to the caller"),
    ])
}

// ============================================================================
// SECTION: Assertion Depth
// ============================================================================

/// Evaluates `TQ-no-shallow-assertions` for one test.
///
/// # Errors
///
/// Returns [`RuleFault`] for non-test subjects.
pub fn no_shallow_assertions(
    ctx: &RuleContext<'_>,
    subject: &RuleSubject<'_>,
) -> Result<Vec<Violation>, RuleFault> {
    let RuleSubject::Test(test) = subject else {
        return Err(subject.unexpected());
    };
    let endpoints: Vec<ResolvedEndpoint<'_>> = if test.endpoints.is_empty() {
        ctx.manifest.endpoints().collect()
    } else {
        test.endpoints.iter().filter_map(|reference| ctx.manifest.endpoint(reference)).collect()
    };

    let mut violations = Vec::new();
    for assertion in test.assertions.iter().filter(|assertion| assertion.depth == AssertionDepth::Shallow) {
        let Some(target) = &assertion.target else {
            continue;
        };
        let mut cardinality = endpoints
            .iter()
            .flat_map(|resolved| {
                [BodyDirection::Request, BodyDirection::Response]
                    .into_iter()
                    .flat_map(move |direction| resolved.endpoint.find_anywhere(direction, target))
            })
            .map(|field| field.spec.distinguishing_values())
            .peekable();
        if cardinality.peek().is_none() {
            continue;
        }
        let multi = cardinality.any(|count| count.is_none_or(|count| count > 1));
        if multi {
            violations.push(
                ctx.violation(
                    assertion.location.clone(),
                    format!("shallow:{target}"),
                    format!(
                        "test `{}` only asserts that `{}` is present; `{target}` can take more than one value",
                        test.name, assertion.subject
                    ),
                )
                .with_fix(format!("assert the expected value of `{target}`")),
            );
        }
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

    use std::collections::BTreeSet;

    use super::*;
    use crate::core::observation::Assertion;
    use crate::core::observation::BoundarySide;
    use crate::core::observation::ErrorHandlingObservation;
    use crate::core::observation::FallibleOperation;
    use crate::core::observation::TestObservation;
    use crate::rules::ERROR_PATH_COVERAGE;
    use crate::rules::NO_SHALLOW_ASSERTIONS;
    use crate::rules::fixtures;

    fn shallow(target: &str, line: u32) -> Assertion {
        Assertion {
            target: Some(target.to_string()),
            subject: format!("body.{target}"),
            depth: AssertionDepth::Shallow,
            location: fixtures::at("tests/token.test.ts", line),
        }
    }

    #[test]
    fn unhandled_network_call_is_flagged() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, ERROR_PATH_COVERAGE);
        let mut obs = ErrorHandlingObservation {
            location: fixtures::at("src/api.ts", 10),
            side: BoundarySide::Consumer,
            operation: FallibleOperation::Network,
            call: "fetch".to_string(),
            handling: ErrorHandling::Unhandled,
            endpoint: Some(fixtures::token(&manifest)),
        };
        let violations = error_path_coverage(&ctx, &RuleSubject::Error(&obs)).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message().contains("POST /oauth/token"));

        obs.handling = ErrorHandling::Recovered("try/catch".to_string());
        assert!(error_path_coverage(&ctx, &RuleSubject::Error(&obs)).unwrap().is_empty());
    }

    #[test]
    fn presence_only_assertions_on_multi_valued_fields() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, NO_SHALLOW_ASSERTIONS);
        let test = TestObservation {
            location: fixtures::at("tests/token.test.ts", 5),
            name: "issues a token".to_string(),
            endpoints: vec![fixtures::token(&manifest)],
            assertions: vec![
                shallow("access_token", 8),
                shallow("unknown_field", 9),
                Assertion {
                    depth: AssertionDepth::Deep,
                    ..shallow("expires_in", 10)
                },
            ],
            status_codes: BTreeSet::from([200]),
        };
        let violations = no_shallow_assertions(&ctx, &RuleSubject::Test(&test)).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].subject(), "shallow:access_token");
        assert_eq!(violations[0].primary().line, 8);
    }
}
