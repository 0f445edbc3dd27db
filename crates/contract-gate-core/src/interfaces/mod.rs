// crates/contract-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Contract Gate Interfaces
// Description: Capability interfaces for extraction adapters and audit sinks.
// Purpose: Define the seams the conformance pipeline integrates through.
// Dependencies: crate::core, crate::extract, crate::runtime
// ============================================================================

//! ## Overview
//! Interfaces define how the pipeline reaches language adapters and audit
//! sinks without knowing their internals. Extractors are pure: they never
//! mutate the source unit and return immutable observations. Every call
//! receives an explicit [`ExtractionContext`] instead of reaching for shared
//! global state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::manifest::ContractManifest;
use crate::core::observation::BoundarySide;
use crate::core::observation::EnumObservation;
use crate::core::observation::ErrorHandlingObservation;
use crate::core::observation::ModelObservation;
use crate::core::observation::RequestObservation;
use crate::core::observation::ResponseObservation;
use crate::core::observation::TestObservation;
use crate::core::source::Language;
use crate::core::source::SourceUnit;
use crate::extract::scan::ScannedUnit;
use crate::runtime::audit::RunAuditEvent;

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Errors raised while extracting a single source unit.
///
/// Extraction errors are isolated to their unit and surface as degraded
/// coverage; they never abort a run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// Unit bytes are not valid UTF-8.
    #[error("unit is not valid utf-8: {0}")]
    NotUtf8(String),
    /// Unit exceeds the configured size limit.
    #[error("unit exceeds size limit ({size} > {limit} bytes)")]
    TooLarge {
        /// Unit size in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
    /// Brackets do not balance.
    #[error("unbalanced bracket at line {line}: {detail}")]
    Unbalanced {
        /// 1-based line of the offending bracket.
        line: u32,
        /// Description of the mismatch.
        detail: String,
    },
    /// A comment or multi-line string never terminates.
    #[error("unterminated {construct} starting at line {line}")]
    Unterminated {
        /// Construct kind (comment, string).
        construct: String,
        /// 1-based start line.
        line: u32,
    },
    /// Adapter-specific failure.
    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Read-only context threaded through every extractor call.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    /// Manifest used for endpoint binding.
    pub manifest: &'a ContractManifest,
    /// Boundary side resolved for the unit.
    pub side: BoundarySide,
}

/// Language adapter capability.
///
/// One implementation exists per supported language; the pipeline selects it
/// through the static extension table in [`crate::extract`].
pub trait Extractor: Send + Sync {
    /// Language handled by the adapter.
    fn language(&self) -> Language;

    /// Returns true when a path names a test unit for this language.
    fn is_test_unit(&self, path: &str) -> bool;

    /// Decodes and lexically scans a unit.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when the unit is too large, not UTF-8, or
    /// structurally unbalanced.
    fn scan(&self, unit: &SourceUnit, max_bytes: usize) -> Result<ScannedUnit, ExtractionError>;

    /// Infers the boundary side from the unit's own constructs.
    fn infer_side(&self, unit: &ScannedUnit) -> BoundarySide;

    /// Recognizes request construction (consumer) and request handling (producer).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when the unit cannot be analyzed.
    fn extract_requests(
        &self,
        unit: &ScannedUnit,
        ctx: &ExtractionContext<'_>,
    ) -> Result<Vec<RequestObservation>, ExtractionError>;

    /// Recognizes response consumption (consumer) and production (producer).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when the unit cannot be analyzed.
    fn extract_response_handling(
        &self,
        unit: &ScannedUnit,
        ctx: &ExtractionContext<'_>,
    ) -> Result<Vec<ResponseObservation>, ExtractionError>;

    /// Recognizes fallible network and decode calls.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when the unit cannot be analyzed.
    fn extract_error_handling(
        &self,
        unit: &ScannedUnit,
        ctx: &ExtractionContext<'_>,
    ) -> Result<Vec<ErrorHandlingObservation>, ExtractionError>;

    /// Recognizes switch/dispatch constructs over manifest enum fields.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when the unit cannot be analyzed.
    fn extract_enum_handling(
        &self,
        unit: &ScannedUnit,
        ctx: &ExtractionContext<'_>,
    ) -> Result<Vec<EnumObservation>, ExtractionError>;

    /// Recognizes tests and classifies their assertions.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when the unit cannot be analyzed.
    fn extract_tests(
        &self,
        unit: &ScannedUnit,
        ctx: &ExtractionContext<'_>,
    ) -> Result<Vec<TestObservation>, ExtractionError>;

    /// Recognizes declared data models.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when the unit cannot be analyzed.
    fn extract_models(
        &self,
        unit: &ScannedUnit,
        ctx: &ExtractionContext<'_>,
    ) -> Result<Vec<ModelObservation>, ExtractionError>;
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Sink for structured run audit events.
pub trait RunAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &RunAuditEvent);
}
