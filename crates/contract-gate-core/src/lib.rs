// crates/contract-gate-core/src/lib.rs
// ============================================================================
// Module: Contract Gate Core
// Description: Contract-conformance engine for producer and consumer code.
// Purpose: Extract behavioral facts from source and check them against a manifest.
// Dependencies: regex, serde, serde_json, serde_yaml, serde_jcs, sha2, thiserror, tokio
// ============================================================================

//! ## Overview
//! Contract Gate loads a contract manifest once, extracts normalized
//! observations from every source unit through per-language adapters,
//! evaluates the rule catalog against them, correlates producer and consumer
//! sides of each contract, and reports a deterministic, digest-stamped list
//! of violations. The entry point is [`runtime::engine::Engine::run`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod extract;
pub mod interfaces;
pub mod rules;
pub mod runtime;

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions and debug output.
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
}

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use extract::Adapter;
pub use extract::adapter_for;
pub use interfaces::ExtractionContext;
pub use interfaces::ExtractionError;
pub use interfaces::Extractor;
pub use interfaces::RunAuditSink;
pub use rules::RuleCatalog;
pub use rules::RuleDescriptor;
pub use rules::RuleFault;
pub use rules::builtin_catalog;
pub use runtime::CodebaseMapping;
pub use runtime::Engine;
pub use runtime::EngineSettings;
pub use runtime::FileAuditSink;
pub use runtime::NoopAuditSink;
pub use runtime::PipelineError;
pub use runtime::PipelineState;
pub use runtime::RunAuditEvent;
pub use runtime::RunCancellation;
pub use runtime::RunOutcome;
pub use runtime::RunResult;
pub use runtime::RunSummary;
pub use runtime::SourceError;
pub use runtime::StderrAuditSink;
