// crates/contract-gate-core/tests/conformance_scenarios.rs
// ============================================================================
// Module: Conformance Scenario Tests
// Description: End-to-end engine runs over small multi-codebase fixtures.
// ============================================================================
//! ## Overview
//! Each scenario feeds in-memory source units through [`Engine::run_units`]
//! and checks the violations a reviewer would expect at the call site.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;

use contract_gate_core::ContractManifest;
use contract_gate_core::Engine;
use contract_gate_core::EngineSettings;
use contract_gate_core::Language;
use contract_gate_core::ManifestFormat;
use contract_gate_core::PipelineState;
use contract_gate_core::RunOutcome;
use contract_gate_core::RunResult;
use contract_gate_core::SourceUnit;
use contract_gate_core::Violation;
use contract_gate_core::rules::MANIFEST_CONFORMANCE;
use contract_gate_core::rules::NEGATIVE_CASES;
use contract_gate_core::rules::NO_SHALLOW_ASSERTIONS;
use contract_gate_core::rules::REQUEST_SHAPE;
use contract_gate_core::rules::RESPONSE_SHAPE;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const TOKEN_MANIFEST: &str = r"
manifest_version: '1.0'
contracts:
  - id: auth-token
    producer: auth-service
    consumer: web-client
    protocol: http
    endpoints:
      - path: /oauth/token
        method: POST
        request:
          fields:
            - { name: grant_type, type: string, required: true }
            - { name: client_id, type: string, required: true }
        response:
          fields:
            - { name: access_token, type: string, required: true }
            - { name: expires_in, type: integer, required: true }
            - name: app_metadata
              type: object
              nullable: true
              fields:
                - { name: role, type: string }
        status_codes: [200, 400]
";

const HEALTH_MANIFEST: &str = r"
manifest_version: '1.0'
contracts:
  - id: health
    producer: api
    consumer: web
    protocol: http
    endpoints:
      - path: /health
        method: GET
        response:
          fields:
            - { name: status, type: string, required: true }
        status_codes: [200]
";

const CLIENTS_MANIFEST: &str = r"
manifest_version: '1.0'
contracts:
  - id: clients
    producer: registry
    consumer: console
    protocol: http
    endpoints:
      - path: /clients
        method: POST
        request:
          fields:
            - { name: name, type: string, required: true }
        status_codes: [200, 201, 400, 401, 403, 404, 409, 500]
";

const ORDERS_MANIFEST: &str = r"
manifest_version: '1.0'
contracts:
  - id: orders
    producer: order-service
    consumer: shop
    protocol: http
    endpoints:
      - path: /orders/{id}
        method: GET
        response:
          fields:
            - { name: order_id, type: string, required: true }
            - { name: status, type: enum, required: true, values: [pending, shipped, cancelled] }
        status_codes: [200, 404]
";

fn manifest(text: &str) -> ContractManifest {
    ContractManifest::load(text, ManifestFormat::Yaml).unwrap()
}

fn unit(path: &str, text: &str) -> SourceUnit {
    let language = Language::from_path(path).unwrap();
    SourceUnit::new(path, language, text.as_bytes().to_vec())
}

async fn run(manifest_text: &str, units: Vec<SourceUnit>) -> RunResult {
    Engine::new(EngineSettings::default()).run_units(manifest(manifest_text), units).await
}

fn by_rule<'a>(result: &'a RunResult, rule: &str) -> Vec<&'a Violation> {
    result.violations.iter().filter(|violation| violation.rule_id().as_str() == rule).collect()
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

#[tokio::test]
async fn client_omitting_a_required_field_is_flagged_at_the_call_site() {
    let client = unit(
        "web/src/auth.ts",
        "export async function token(clientId: string) {\n  const res = await fetch('/oauth/token', { method: 'POST', body: JSON.stringify({ client_id: clientId }) });\n  return res.status;\n}\n",
    );
    let result = run(TOKEN_MANIFEST, vec![client]).await;

    assert_eq!(result.outcome, RunOutcome::Fail);
    let request = by_rule(&result, REQUEST_SHAPE);
    assert_eq!(request.len(), 1);
    assert_eq!(request[0].subject(), "grant_type");
    assert_eq!(request[0].primary().to_string(), "web/src/auth.ts:2");
    assert!(request[0].message().contains("grant_type"));
    assert_eq!(result.exit_code(), 1);
}

#[tokio::test]
async fn producer_stringifying_an_integer_is_a_conformance_violation() {
    let service = unit(
        "auth/app.py",
        "@app.route(\"/oauth/token\", methods=[\"POST\"])\ndef token():\n    ttl = 3600\n    return jsonify({\"access_token\": issue(), \"expires_in\": str(ttl)}), 200\n",
    );
    let result = run(TOKEN_MANIFEST, vec![service]).await;

    let conformance = by_rule(&result, MANIFEST_CONFORMANCE);
    let expires: Vec<_> = conformance.iter().filter(|violation| violation.subject() == "expires_in").collect();
    assert_eq!(expires.len(), 1);
    assert!(expires[0].message().contains("declared integer"));
    assert!(expires[0].primary().to_string().starts_with("auth/app.py:"));
}

#[tokio::test]
async fn unguarded_nullable_read_is_a_response_shape_violation() {
    let client = unit(
        "web/src/role.ts",
        "export async function role(clientId: string) {\n  const res = await fetch('/oauth/token', { method: 'POST', body: JSON.stringify({ grant_type: 'client_credentials', client_id: clientId }) });\n  const data = await res.json();\n  return data.app_metadata.role;\n}\n",
    );
    let result = run(TOKEN_MANIFEST, vec![client]).await;

    let unguarded: Vec<_> = by_rule(&result, RESPONSE_SHAPE)
        .into_iter()
        .filter(|violation| violation.subject() == "app_metadata.role")
        .collect();
    assert_eq!(unguarded.len(), 1);
    assert!(unguarded[0].message().contains("crash-prone"));
    assert_eq!(unguarded[0].primary().to_string(), "web/src/role.ts:4");
}

#[tokio::test]
async fn conforming_producer_and_consumer_pass() {
    let service = unit(
        "api/app.py",
        "@app.route(\"/health\", methods=[\"GET\"])\ndef health():\n    return jsonify({\"status\": \"ok\"}), 200\n",
    );
    let client = unit(
        "web/src/health.ts",
        "export async function health() {\n  try {\n    const res = await fetch('/health');\n    if (res.status !== 200) {\n      return null;\n    }\n    const data = await res.json();\n    return data.status;\n  } catch (e) {\n    return null;\n  }\n}\n",
    );
    let result = run(HEALTH_MANIFEST, vec![service, client]).await;

    assert!(result.violations.is_empty(), "unexpected violations: {:?}", result.violations);
    assert_eq!(result.outcome, RunOutcome::Pass);
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.summary.units.analyzed + result.summary.units.degraded, 2);
    assert!(result.report_digest.is_some());
    assert_eq!(result.pipeline.last(), Some(&PipelineState::Reported));
}

#[tokio::test]
async fn tests_without_failure_statuses_list_the_missing_codes() {
    let suite = unit(
        "console/src/clients.test.ts",
        "it('registers a client', async () => {\n  const res = await request(app).post('/clients').send({ name: 'web' });\n  expect(res.status).toBe(201);\n});\n\nit('returns the existing client', async () => {\n  const res = await request(app).post('/clients').send({ name: 'web' });\n  expect(res.status).toBe(200);\n});\n",
    );
    let result = run(CLIENTS_MANIFEST, vec![suite]).await;

    let negative = by_rule(&result, NEGATIVE_CASES);
    assert_eq!(negative.len(), 1);
    assert_eq!(negative[0].subject(), "negative-cases");
    assert!(negative[0].message().contains("400, 401, 403, 404, 409, 500"));
    assert!(negative[0].message().contains("6 declared failure statuses"));
}

#[tokio::test]
async fn inline_directive_suppresses_the_next_line() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("contracts.yaml"), TOKEN_MANIFEST).unwrap();
    fs::create_dir_all(dir.path().join("web")).unwrap();
    fs::write(
        dir.path().join("web/auth.ts"),
        "export async function token(clientId: string) {\n  // contract-gate-disable-next-line CTR-request-shape -- migrating\n  const res = await fetch('/oauth/token', { method: 'POST', body: JSON.stringify({ client_id: clientId }) });\n  return res.status;\n}\n",
    )
    .unwrap();

    let engine = Engine::new(EngineSettings::default());
    let result = engine.run(&dir.path().join("contracts.yaml"), &[dir.path().join("web")]).await;

    assert_ne!(result.outcome, RunOutcome::Error);
    assert!(by_rule(&result, REQUEST_SHAPE).is_empty());
    assert!(result.summary.suppressed >= 1);

    let engine = Engine::new(EngineSettings {
        suppression_enabled: false,
        ..EngineSettings::default()
    });
    let result = engine.run(&dir.path().join("contracts.yaml"), &[dir.path().join("web")]).await;
    assert_eq!(by_rule(&result, REQUEST_SHAPE).len(), 1);
    assert_eq!(result.summary.suppressed, 0);
}

#[tokio::test]
async fn presence_check_on_an_aliased_enum_field_is_shallow() {
    let suite = unit(
        "shop/src/orders.test.ts",
        "it('loads an order', async () => {\n  const res = await request(app).get('/orders/1');\n  const body = res.body;\n  expect(res.status).toBe(200);\n  expect(body.status).toBeDefined();\n});\n",
    );
    let result = run(ORDERS_MANIFEST, vec![suite]).await;

    let shallow = by_rule(&result, NO_SHALLOW_ASSERTIONS);
    assert_eq!(shallow.len(), 1);
    assert_eq!(shallow[0].subject(), "shallow:status");
    assert_eq!(shallow[0].primary().to_string(), "shop/src/orders.test.ts:5");
    assert_eq!(result.outcome, RunOutcome::Fail);
}
