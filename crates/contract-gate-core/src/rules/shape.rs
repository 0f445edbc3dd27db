// crates/contract-gate-core/src/rules/shape.rs
// ============================================================================
// Module: Contract Gate Shape Rules
// Description: Request and response body shape rules.
// Purpose: Flag missing, undeclared, unread, and unguarded body fields.
// Dependencies: crate::core, crate::rules
// ============================================================================

//! ## Overview
//! `CTR-request-shape` checks what a sender puts on the wire and what a
//! receiving handler pulls out of it. `CTR-response-shape` checks producer
//! constructions and bound models for required fields, every consumer read
//! chain for unguarded nullable dereferences, and, per endpoint, required
//! fields the consumer never reads or acknowledges.
//!
//! Missing-field findings are reported once per field per call site.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::manifest::BodyDirection;
use crate::core::manifest::EndpointSpec;
use crate::core::manifest::find_field;
use crate::core::naming::names_match;
use crate::core::observation::FieldRead;
use crate::core::observation::ModelObservation;
use crate::core::observation::RequestObservation;
use crate::core::observation::ResponseObservation;
use crate::core::violation::Violation;
use crate::rules::RuleContext;
use crate::rules::RuleFault;
use crate::rules::RuleSubject;
use crate::rules::subjects::EndpointAggregate;
use crate::rules::subjects::join_path;
use crate::rules::subjects::missing_required;
use crate::rules::subjects::receiver_side;
use crate::rules::subjects::sender_side;
use crate::rules::subjects::shape_at;
use crate::rules::subjects::undeclared;

// ============================================================================
// SECTION: Request Shape
// ============================================================================

/// Evaluates `CTR-request-shape` for one request observation.
///
/// # Errors
///
/// Returns [`RuleFault`] for non-request subjects or unknown endpoints.
pub fn request_shape(
    ctx: &RuleContext<'_>,
    subject: &RuleSubject<'_>,
) -> Result<Vec<Violation>, RuleFault> {
    let RuleSubject::Request(obs) = subject else {
        return Err(subject.unexpected());
    };
    let Some(reference) = &obs.endpoint else {
        return Ok(Vec::new());
    };
    let spec = ctx.endpoint(reference)?.endpoint;
    let declared = &spec.body(BodyDirection::Request).fields;
    let mut violations = Vec::new();

    if obs.side == sender_side(&spec.key, BodyDirection::Request) {
        if obs.shape_known {
            for (path, field) in missing_required(declared, &obs.fields, "") {
                violations.push(
                    ctx.violation(
                        obs.location.clone(),
                        path.clone(),
                        format!("request to {} omits required field `{path}`", spec.key),
                    )
                    .with_fix(format!("add `{}` ({}) to the request body", field.name, field.kind.as_str())),
                );
            }
        }
        if !declared.is_empty() {
            for (path, field) in undeclared(declared, &obs.fields, "") {
                violations.push(
                    ctx.violation(
                        field.location.clone(),
                        format!("undeclared:{path}"),
                        format!("request to {} sends `{path}`, which the manifest does not declare", spec.key),
                    )
                    .with_location(obs.location.clone()),
                );
            }
        }
        if !spec.key.is_message() {
            missing_headers(ctx, obs, spec, &mut violations);
        }
    } else if obs.side == receiver_side(&spec.key, BodyDirection::Request) && !declared.is_empty() {
        for field in &obs.fields {
            if find_field(declared, &field.name).is_none() {
                violations.push(ctx.violation(
                    field.location.clone(),
                    format!("undeclared:{}", field.name),
                    format!(
                        "handler for {} reads request field `{}`, which the manifest does not declare",
                        spec.key, field.name
                    ),
                ));
            }
        }
    }
    Ok(violations)
}

/// Appends violations for required headers the call never attaches.
fn missing_headers(
    ctx: &RuleContext<'_>,
    obs: &RequestObservation,
    spec: &EndpointSpec,
    violations: &mut Vec<Violation>,
) {
    let attached = |name: &str| obs.headers.iter().any(|header| header.name.eq_ignore_ascii_case(name));
    for header in spec.headers.iter().filter(|header| header.required) {
        if !attached(&header.name) {
            violations.push(
                ctx.violation(
                    obs.location.clone(),
                    format!("header:{}", header.name),
                    format!("request to {} omits required header `{}`", spec.key, header.name),
                )
                .with_fix(format!("attach the `{}` header", header.name)),
            );
        }
    }
    let declares_authorization =
        spec.headers.iter().any(|header| header.name.eq_ignore_ascii_case("authorization"));
    if let Some(auth) = &spec.auth
        && !declares_authorization
        && !attached("authorization")
    {
        violations.push(ctx.violation(
            obs.location.clone(),
            "header:Authorization",
            format!("request to {} omits the Authorization header required by `{auth}` auth", spec.key),
        ));
    }
}

// ============================================================================
// SECTION: Response Shape
// ============================================================================

/// Evaluates `CTR-response-shape` for a response, model, or endpoint.
///
/// # Errors
///
/// Returns [`RuleFault`] for unsupported subjects or unknown endpoints.
pub fn response_shape(
    ctx: &RuleContext<'_>,
    subject: &RuleSubject<'_>,
) -> Result<Vec<Violation>, RuleFault> {
    match subject {
        RuleSubject::Response(obs) => response_site(ctx, obs),
        RuleSubject::Model(model) => model_shape(ctx, model),
        RuleSubject::Endpoint(aggregate) => Ok(unread_fields(ctx, aggregate)),
        _ => Err(subject.unexpected()),
    }
}

/// Checks one producer construction or consumer read site.
fn response_site(ctx: &RuleContext<'_>, obs: &ResponseObservation) -> Result<Vec<Violation>, RuleFault> {
    let Some(reference) = &obs.endpoint else {
        return Ok(Vec::new());
    };
    let spec = ctx.endpoint(reference)?.endpoint;
    let read_direction = spec.key.read_direction();
    let mut violations = Vec::new();

    let producer = sender_side(&spec.key, BodyDirection::Response);
    if !spec.key.is_message() && obs.side == producer && obs.shape_known && obs.produces_success() {
        let declared = &spec.body(BodyDirection::Response).fields;
        for (path, field) in missing_required(declared, &obs.produced, "") {
            violations.push(
                ctx.violation(
                    obs.location.clone(),
                    path.clone(),
                    format!("response for {} omits required field `{path}`", spec.key),
                )
                .with_fix(format!("include `{}` ({}) in the response body", field.name, field.kind.as_str())),
            );
        }
    }

    if obs.side == receiver_side(&spec.key, read_direction) {
        for read in &obs.reads {
            if let Some(violation) = unguarded_access(ctx, spec, read) {
                violations.push(violation);
            }
        }
    }
    Ok(violations)
}

/// Returns a violation when a read chain dereferences a nullable field
/// without a guard.
fn unguarded_access(ctx: &RuleContext<'_>, spec: &EndpointSpec, read: &FieldRead) -> Option<Violation> {
    let matched = spec.walk(spec.key.read_direction(), &read.path);
    let (index, _) = matched.iter().enumerate().find(|(index, field)| {
        field.nullable && read.path.len() > index + 1 && !read.guards.get(*index).copied().unwrap_or(false)
    })?;
    let nullable = read.path[..= index].join(".");
    let full = read.path.join(".");
    Some(
        ctx.violation(
            read.location.clone(),
            full.clone(),
            format!(
                "`{full}` dereferences nullable `{nullable}` without a null guard; crash-prone when \
                 {} returns null",
                spec.key
            ),
        )
        .with_fix(format!("guard `{nullable}` before reading `{full}`")),
    )
}

/// Checks a model that sends a read-direction body for required fields.
fn model_shape(ctx: &RuleContext<'_>, model: &ModelObservation) -> Result<Vec<Violation>, RuleFault> {
    let mut violations = Vec::new();
    for binding in &model.bindings {
        let spec = ctx.endpoint(&binding.endpoint)?.endpoint;
        if binding.direction != spec.key.read_direction()
            || model.side != sender_side(&spec.key, binding.direction)
        {
            continue;
        }
        let Some(declared) = shape_at(spec, binding.direction, &binding.prefix) else {
            continue;
        };
        for field in declared.iter().filter(|field| field.required && field.default.is_none()) {
            let present = model.fields.iter().any(|model_field| names_match(&model_field.wire_name, &field.name));
            if !present {
                let path = join_path(&binding.prefix, &field.name);
                violations.push(
                    ctx.violation(
                        model.location.clone(),
                        path.clone(),
                        format!(
                            "model `{}` bound to {} {} lacks required field `{path}`",
                            model.name,
                            spec.key,
                            binding.direction.as_str()
                        ),
                    )
                    .with_fix(format!("add a `{}` field to `{}`", field.name, model.name)),
                );
            }
        }
    }
    Ok(violations)
}

/// Required read-direction fields that no consumer site reads or
/// acknowledges.
fn unread_fields(ctx: &RuleContext<'_>, aggregate: &EndpointAggregate<'_>) -> Vec<Violation> {
    let spec = aggregate.endpoint.endpoint;
    let direction = spec.key.read_direction();
    let reader_side = receiver_side(&spec.key, direction);
    let readers: Vec<&ResponseObservation> = aggregate.readers().collect();
    if readers.iter().all(|reader| reader.reads.is_empty()) {
        return Vec::new();
    }
    let Some(anchor) = readers.iter().map(|reader| &reader.location).min() else {
        return Vec::new();
    };

    let mut violations = Vec::new();
    for field in spec.body(direction).fields.iter().filter(|field| field.required) {
        let read = readers.iter().any(|reader| {
            reader.reads.iter().any(|read| read.path.first().is_some_and(|first| names_match(first, &field.name)))
                || reader.acknowledged.iter().any(|name| names_match(name, &field.name))
        });
        let modeled = aggregate.models.iter().any(|(model, binding)| {
            model.side == reader_side
                && binding.direction == direction
                && binding.prefix.is_empty()
                && model.fields.iter().any(|model_field| names_match(&model_field.wire_name, &field.name))
        });
        if !read && !modeled {
            violations.push(
                ctx.violation(
                    anchor.clone(),
                    format!("unread:{}", field.name),
                    format!("required field `{}` of {} is never read by the consumer", field.name, spec.key),
                )
                .with_fix(format!(
                    "read `{0}` or acknowledge it with `contract-gate-ignore-field {0}`",
                    field.name
                )),
            );
        }
    }
    violations
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
    use crate::core::observation::ModelField;
    use crate::core::observation::ObservedHeader;
    use crate::core::observation::ShapeBinding;
    use crate::core::observation::ValueKind;
    use crate::rules::REQUEST_SHAPE;
    use crate::rules::RESPONSE_SHAPE;
    use crate::rules::fixtures;

    fn header(name: &str) -> ObservedHeader {
        ObservedHeader {
            name: name.to_string(),
            location: fixtures::at("src/api.ts", 9),
        }
    }

    #[test]
    fn missing_grant_type_is_reported_once_per_site() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, REQUEST_SHAPE);
        let mut obs = fixtures::sent(
            fixtures::token(&manifest),
            vec![fixtures::literal("client_id", ValueKind::String, "web", 11)],
        );
        obs.headers.push(header("x-client-version"));
        let violations = request_shape(&ctx, &RuleSubject::Request(&obs)).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].subject(), "grant_type");
        assert!(violations[0].message().contains("grant_type"));
    }

    #[test]
    fn unknown_request_shapes_skip_missing_field_checks() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, REQUEST_SHAPE);
        let mut obs = fixtures::sent(fixtures::token(&manifest), Vec::new());
        obs.shape_known = false;
        let violations = request_shape(&ctx, &RuleSubject::Request(&obs)).unwrap();
        let subjects: Vec<&str> = violations.iter().map(Violation::subject).collect();
        assert_eq!(subjects, vec!["header:X-Client-Version"]);
    }

    #[test]
    fn undeclared_fields_are_flagged_at_the_field() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, REQUEST_SHAPE);
        let mut obs = fixtures::sent(
            fixtures::token(&manifest),
            vec![
                fixtures::literal("grant_type", ValueKind::String, "client_credentials", 11),
                fixtures::literal("client_id", ValueKind::String, "web", 12),
                fixtures::literal("audience", ValueKind::String, "api", 13),
            ],
        );
        obs.headers.push(header("X-Client-Version"));
        let violations = request_shape(&ctx, &RuleSubject::Request(&obs)).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].subject(), "undeclared:audience");
        assert_eq!(violations[0].primary().line, 13);
    }

    #[test]
    fn unguarded_nullable_read_is_crash_prone() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, RESPONSE_SHAPE);
        let mut obs = fixtures::consumed(fixtures::token(&manifest), 30);
        obs.reads = vec![
            FieldRead {
                path: vec!["app_metadata".to_string(), "role".to_string()],
                guards: vec![false, false],
                location: fixtures::at("src/api.ts", 31),
            },
            FieldRead {
                path: vec!["app_metadata".to_string(), "role".to_string()],
                guards: vec![true, false],
                location: fixtures::at("src/api.ts", 35),
            },
        ];
        let violations = response_shape(&ctx, &RuleSubject::Response(&obs)).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].primary().line, 31);
        assert!(violations[0].message().contains("crash-prone"));
    }

    #[test]
    fn producer_response_missing_required_field() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, RESPONSE_SHAPE);
        let obs = fixtures::produced(
            fixtures::token(&manifest),
            vec![fixtures::field("access_token", ValueKind::String, 21)],
        );
        let violations = response_shape(&ctx, &RuleSubject::Response(&obs)).unwrap();
        let subjects: Vec<&str> = violations.iter().map(Violation::subject).collect();
        assert_eq!(subjects, vec!["expires_in"]);
    }

    #[test]
    fn error_responses_are_not_checked_for_success_fields() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, RESPONSE_SHAPE);
        let mut obs = fixtures::produced(fixtures::token(&manifest), Vec::new());
        obs.status = fixtures::codes(&[400]);
        assert!(response_shape(&ctx, &RuleSubject::Response(&obs)).unwrap().is_empty());
    }

    #[test]
    fn producer_model_lacking_required_field() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, RESPONSE_SHAPE);
        let model = ModelObservation {
            location: fixtures::at("svc/models.py", 4),
            side: BoundarySide::Producer,
            name: "TokenResponse".to_string(),
            fields: vec![ModelField {
                declared_name: "access_token".to_string(),
                wire_name: "access_token".to_string(),
                explicit_wire_name: false,
                kind: ValueKind::String,
                optional: false,
                location: fixtures::at("svc/models.py", 5),
            }],
            bindings: vec![ShapeBinding {
                endpoint: fixtures::token(&manifest),
                direction: BodyDirection::Response,
                prefix: String::new(),
                score: 0.6,
            }],
            ambiguous: Vec::new(),
        };
        let violations = response_shape(&ctx, &RuleSubject::Model(&model)).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].subject(), "expires_in");
    }

    #[test]
    fn unread_required_fields_respect_acknowledgement() {
        let manifest = fixtures::manifest();
        let ctx = fixtures::context(&manifest, RESPONSE_SHAPE);
        let mut obs = fixtures::consumed(fixtures::token(&manifest), 40);
        obs.reads = vec![FieldRead {
            path: vec!["access_token".to_string()],
            guards: vec![false],
            location: fixtures::at("src/api.ts", 41),
        }];
        obs.acknowledged = vec!["expiresIn".to_string()];
        let resolved = manifest.endpoint(&fixtures::token(&manifest)).unwrap();
        let aggregate_for = |obs| EndpointAggregate {
            endpoint: resolved,
            reference: resolved.reference(),
            requests: Vec::new(),
            responses: vec![obs],
            enums: Vec::new(),
            tests: Vec::new(),
            models: Vec::new(),
        };
        let acknowledged = aggregate_for(&obs);
        assert!(response_shape(&ctx, &RuleSubject::Endpoint(&acknowledged)).unwrap().is_empty());

        let mut silent = obs.clone();
        silent.acknowledged.clear();
        let aggregate = aggregate_for(&silent);
        let violations = response_shape(&ctx, &RuleSubject::Endpoint(&aggregate)).unwrap();
        let subjects: Vec<&str> = violations.iter().map(Violation::subject).collect();
        assert_eq!(subjects, vec!["unread:expires_in"]);
    }
}
