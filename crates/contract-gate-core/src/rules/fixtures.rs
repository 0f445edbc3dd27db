// crates/contract-gate-core/src/rules/fixtures.rs
// ============================================================================
// Module: Contract Gate Rule Fixtures
// Description: Shared manifest and observation builders for rule tests.
// Purpose: Keep rule unit tests short and focused on the rule under test.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Test-only builders. The manifest declares an OAuth token endpoint and an
//! orders contract with enum, range, format, nullable, and unit-labelled
//! fields so every rule family has something to bite on.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test fixtures fail loudly on malformed inputs."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::identifiers::RuleId;
use crate::core::manifest::ContractManifest;
use crate::core::manifest::EndpointRef;
use crate::core::manifest::HttpMethod;
use crate::core::manifest::ManifestFormat;
use crate::core::observation::BoundarySide;
use crate::core::observation::CallTarget;
use crate::core::observation::Conversion;
use crate::core::observation::NameSource;
use crate::core::observation::ObservedField;
use crate::core::observation::RequestObservation;
use crate::core::observation::ResponseObservation;
use crate::core::observation::StatusHandling;
use crate::core::observation::ValueKind;
use crate::core::source::SourceLocation;
use crate::core::violation::Severity;
use crate::rules::RuleContext;

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// Manifest shared by rule tests.
pub const MANIFEST: &str = r#"
manifest_version: "1.0"
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
            - { name: grant_type, type: enum, required: true, values: [client_credentials, refresh_token] }
            - { name: client_id, type: string, required: true }
            - { name: scope, type: string }
        response:
          fields:
            - { name: access_token, type: string, required: true }
            - { name: expires_in, type: integer, required: true, range: { min: 0, max: 86400 }, unit: seconds }
            - name: app_metadata
              type: object
              nullable: true
              fields:
                - { name: role, type: string }
        status_codes: [200, 400, 401, 500]
        headers:
          - { name: X-Client-Version, required: true }
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
            - { name: contact_email, type: string, format: email }
            - { name: priority, type: enum, values: [low, normal, high] }
        response:
          fields:
            - { name: order_id, type: string, required: true, format: uuid }
            - { name: status, type: enum, required: true, values: [pending, shipped, cancelled] }
            - { name: stock_count, type: integer, required: true }
            - { name: price, type: string, format: decimal }
            - { name: total_cents, type: integer, unit: cents }
        status_codes: [201, 400, 404, 409, 422, 500, 502, 503]
"#;

/// Parses the shared manifest.
pub fn manifest() -> ContractManifest {
    ContractManifest::load(MANIFEST, ManifestFormat::Yaml).unwrap()
}

/// Resolves an HTTP endpoint reference.
pub fn endpoint(manifest: &ContractManifest, method: HttpMethod, path: &str) -> EndpointRef {
    manifest.resolve(path, method).unwrap().reference()
}

/// Token endpoint reference.
pub fn token(manifest: &ContractManifest) -> EndpointRef {
    endpoint(manifest, HttpMethod::Post, "/oauth/token")
}

/// Orders endpoint reference.
pub fn orders(manifest: &ContractManifest) -> EndpointRef {
    endpoint(manifest, HttpMethod::Post, "/orders")
}

/// Builds a rule context using the rule's default severity.
pub fn context<'a>(manifest: &'a ContractManifest, rule_id: &str) -> RuleContext<'a> {
    RuleContext {
        manifest,
        rule_id: RuleId::new(rule_id),
        severity: Severity::Error,
    }
}

// ============================================================================
// SECTION: Observations
// ============================================================================

/// Location in a fixed file.
pub fn at(file: &str, line: u32) -> SourceLocation {
    SourceLocation::new(file, line)
}

/// Observed wire field with an inferred kind.
pub fn field(name: &str, kind: ValueKind, line: u32) -> ObservedField {
    ObservedField {
        name: name.to_string(),
        source: NameSource::Wire,
        kind,
        conversion: Conversion::None,
        literal: None,
        value_ref: None,
        children: None,
        location: at("src/api.ts", line),
    }
}

/// Observed wire field with a literal value.
pub fn literal(name: &str, kind: ValueKind, value: &str, line: u32) -> ObservedField {
    ObservedField {
        literal: Some(value.to_string()),
        ..field(name, kind, line)
    }
}

/// Consumer request sending a literal body.
pub fn sent(endpoint: EndpointRef, fields: Vec<ObservedField>) -> RequestObservation {
    RequestObservation {
        location: at("src/api.ts", 10),
        side: BoundarySide::Consumer,
        target: CallTarget {
            method: None,
            path: None,
        },
        endpoint: Some(endpoint),
        fields,
        shape_known: true,
        has_body: true,
        headers: Vec::new(),
        validations: Vec::new(),
    }
}

/// Producer response constructing a literal body.
pub fn produced(endpoint: EndpointRef, fields: Vec<ObservedField>) -> ResponseObservation {
    ResponseObservation {
        location: at("svc/routes.py", 20),
        side: BoundarySide::Producer,
        target: CallTarget {
            method: None,
            path: None,
        },
        endpoint: Some(endpoint),
        status: StatusHandling::default(),
        reads: Vec::new(),
        produced: fields,
        shape_known: true,
        acknowledged: Vec::new(),
    }
}

/// Consumer response site with no reads and no status checks.
pub fn consumed(endpoint: EndpointRef, line: u32) -> ResponseObservation {
    ResponseObservation {
        location: at("src/api.ts", line),
        side: BoundarySide::Consumer,
        target: CallTarget {
            method: None,
            path: None,
        },
        endpoint: Some(endpoint),
        status: StatusHandling::default(),
        reads: Vec::new(),
        produced: Vec::new(),
        shape_known: false,
        acknowledged: Vec::new(),
    }
}

/// Status handling covering exact codes.
pub fn codes(values: &[u16]) -> StatusHandling {
    StatusHandling {
        codes: values.iter().copied().collect::<BTreeSet<u16>>(),
        classes: BTreeSet::new(),
        success_check: false,
    }
}
