// crates/contract-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Contract Gate Runtime
// Description: Pipeline machinery from source discovery to the final report.
// Purpose: Group the engine, worker pool, evaluator, correlator, and reporter.
// Dependencies: tokio, serde_json, crate::core, crate::rules
// ============================================================================

//! ## Overview
//! Runtime modules drive a run: [`sources`] discovers units, [`pool`]
//! extracts them concurrently, [`evaluator`] applies the rule catalog,
//! [`correlator`] pairs producer and consumer views, and [`reporter`] orders
//! and digests the findings. [`engine`] ties the phases together under the
//! [`state`] machine and reports progress on an [`audit`] sink.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod correlator;
pub mod engine;
pub mod evaluator;
pub mod pool;
pub mod reporter;
pub mod sources;
pub mod state;
pub mod suppression;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RunAuditEvent;
pub use audit::StderrAuditSink;
pub use correlator::CorrelatorSettings;
pub use engine::Engine;
pub use engine::EngineSettings;
pub use engine::PipelineError;
pub use engine::load_manifest;
pub use pool::RunCancellation;
pub use reporter::RunOutcome;
pub use reporter::RunResult;
pub use reporter::RunSummary;
pub use sources::CodebaseMapping;
pub use sources::SourceError;
pub use state::PipelineState;
