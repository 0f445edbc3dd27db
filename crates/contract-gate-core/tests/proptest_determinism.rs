// crates/contract-gate-core/tests/proptest_determinism.rs
// ============================================================================
// Module: Report Determinism Property Tests
// Description: Property tests for report ordering and digest stability.
// Purpose: Detect scheduling-dependent output across unit orders and pool sizes.
// ============================================================================

//! Property-based tests for run determinism.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use contract_gate_core::ContractManifest;
use contract_gate_core::Engine;
use contract_gate_core::EngineSettings;
use contract_gate_core::Language;
use contract_gate_core::ManifestFormat;
use contract_gate_core::RunResult;
use contract_gate_core::SourceUnit;
use proptest::prelude::*;

const MANIFEST: &str = r"
manifest_version: '1.0'
contracts:
  - id: orders
    producer: order-service
    consumer: storefront
    protocol: http
    endpoints:
      - path: /orders
        method: POST
        request:
          fields:
            - { name: sku, type: string, required: true }
            - { name: quantity, type: integer, required: true, range: { min: 1, max: 100 } }
        response:
          fields:
            - { name: order_id, type: string, required: true }
            - { name: total_cents, type: integer, required: true, unit: cents }
        status_codes: [201, 400, 409]
";

fn units() -> Vec<SourceUnit> {
    let files = [
        (
            "storefront/src/orders.ts",
            "export async function place(sku: string, quantity: number) {\n  const res = await fetch('/orders', { method: 'POST', body: JSON.stringify({ sku, quantity }) });\n  const data = await res.json();\n  return data.order_id;\n}\n",
        ),
        (
            "storefront/src/cart.ts",
            "export async function reorder(sku: string) {\n  const res = await fetch('/orders', { method: 'POST', body: JSON.stringify({ sku }) });\n  return res.status;\n}\n",
        ),
        (
            "orders/app.py",
            "@app.route(\"/orders\", methods=[\"POST\"])\ndef create():\n    return jsonify({\"order_id\": new_id(), \"total_cents\": str(total)}), 201\n",
        ),
        (
            "orders/tests/test_orders.py",
            "def test_create(client):\n    resp = client.post(\"/orders\", json={\"sku\": \"a\", \"quantity\": 1})\n    assert resp.status_code == 201\n    assert resp.json()[\"order_id\"]\n",
        ),
        ("orders/notes.py", "def helper(value):\n    return value\n"),
    ];
    files
        .iter()
        .map(|(path, text)| SourceUnit::new(*path, Language::from_path(path).unwrap(), text.as_bytes().to_vec()))
        .collect()
}

fn run(units: Vec<SourceUnit>, max_workers: usize) -> RunResult {
    let manifest = ContractManifest::load(MANIFEST, ManifestFormat::Yaml).unwrap();
    let engine = Engine::new(EngineSettings {
        max_workers,
        ..EngineSettings::default()
    });
    let runtime = tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build().unwrap();
    runtime.block_on(engine.run_units(manifest, units))
}

fn rendered(result: &RunResult) -> Vec<String> {
    result
        .violations
        .iter()
        .map(|violation| format!("{} {} {}", violation.rule_id(), violation.primary(), violation.subject()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn unit_order_and_pool_size_do_not_change_the_report(
        shuffled in Just(units()).prop_shuffle(),
        max_workers in 1usize ..= 8,
    ) {
        let baseline = run(units(), 1);
        let candidate = run(shuffled, max_workers);
        prop_assert!(!baseline.violations.is_empty());
        prop_assert_eq!(rendered(&baseline), rendered(&candidate));
        prop_assert_eq!(&baseline.report_digest, &candidate.report_digest);
        prop_assert_eq!(&baseline.diagnostics, &candidate.diagnostics);
        prop_assert_eq!(baseline.summary, candidate.summary);
    }
}
