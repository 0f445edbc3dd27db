// crates/contract-gate-config/src/lib.rs
// ============================================================================
// Module: Contract Gate Config Library
// Description: Canonical config model and fail-closed validation.
// Purpose: Single source of truth for contract-gate.toml semantics.
// Dependencies: contract-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `contract-gate-config` defines the `contract-gate.toml` model, validates
//! every limit before use, and converts the result into core
//! [`contract_gate_core::EngineSettings`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
