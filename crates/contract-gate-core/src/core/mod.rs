// crates/contract-gate-core/src/core/mod.rs
// ============================================================================
// Module: Contract Gate Core Types
// Description: Canonical data model shared by every pipeline stage.
// Purpose: Group manifest, observation, and violation types.
// Dependencies: serde, serde_json, serde_yaml, serde_jcs, sha2, regex
// ============================================================================

//! ## Overview
//! Core types are plain data: the immutable [`manifest::ContractManifest`],
//! the language-agnostic observations adapters produce, and the violations
//! and diagnostics the run reports.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod hashing;
pub mod identifiers;
pub mod manifest;
pub mod naming;
pub mod observation;
pub mod source;
pub mod violation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use hashing::DigestError;
pub use hashing::ReportDigest;
pub use identifiers::CodebaseId;
pub use identifiers::ContractId;
pub use identifiers::RuleId;
pub use manifest::BodyDirection;
pub use manifest::ContractManifest;
pub use manifest::EndpointKey;
pub use manifest::EndpointRef;
pub use manifest::EndpointSpec;
pub use manifest::FieldKind;
pub use manifest::FieldSpec;
pub use manifest::HttpMethod;
pub use manifest::ManifestError;
pub use manifest::ManifestFormat;
pub use observation::BoundarySide;
pub use observation::ObservationSet;
pub use observation::UnitObservations;
pub use source::Language;
pub use source::SourceLocation;
pub use source::SourceUnit;
pub use violation::Diagnostic;
pub use violation::DiagnosticKind;
pub use violation::Severity;
pub use violation::Violation;
