// crates/contract-gate-core/src/runtime/state.rs
// ============================================================================
// Module: Contract Gate Pipeline State
// Description: Pipeline-level state machine and transition tracking.
// Purpose: Make phase ordering explicit and auditable.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A run walks `Idle -> ManifestLoaded -> Extracting -> Evaluating ->
//! Correlating -> Reported -> Idle`. A manifest error moves `Idle -> Fatal`
//! directly, and a run with no processable units moves `Extracting -> Fatal`.
//! [`PipelineTracker`] rejects any other transition so phase ordering cannot
//! drift silently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: States
// ============================================================================

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No run in progress.
    Idle,
    /// Manifest parsed and validated.
    ManifestLoaded,
    /// Units are being extracted.
    Extracting,
    /// Rules are being evaluated.
    Evaluating,
    /// Boundary rules are being evaluated.
    Correlating,
    /// Report finalized.
    Reported,
    /// Run aborted.
    Fatal,
}

impl PipelineState {
    /// Returns the stable label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ManifestLoaded => "manifest_loaded",
            Self::Extracting => "extracting",
            Self::Evaluating => "evaluating",
            Self::Correlating => "correlating",
            Self::Reported => "reported",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true when `next` is a legal successor.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle | Self::Extracting, Self::Fatal)
                | (Self::Idle, Self::ManifestLoaded)
                | (Self::ManifestLoaded, Self::Extracting)
                | (Self::Extracting, Self::Evaluating)
                | (Self::Evaluating, Self::Correlating)
                | (Self::Correlating, Self::Reported)
                | (Self::Reported | Self::Fatal, Self::Idle)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tracker
// ============================================================================

/// Illegal transition attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("illegal pipeline transition {from} -> {to}")]
pub struct TransitionError {
    /// Current state.
    pub from: PipelineState,
    /// Requested state.
    pub to: PipelineState,
}

/// Tracks the current state and the transitions taken.
#[derive(Debug, Clone)]
pub struct PipelineTracker {
    /// Current state.
    current: PipelineState,
    /// Visited states in order, starting with `Idle`.
    history: Vec<PipelineState>,
}

impl Default for PipelineTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineTracker {
    /// Creates a tracker in `Idle`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: PipelineState::Idle,
            history: vec![PipelineState::Idle],
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn current(&self) -> PipelineState {
        self.current
    }

    /// Returns every visited state in order.
    #[must_use]
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Moves to `next`, returning the previous state.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the transition is not legal.
    pub fn advance(&mut self, next: PipelineState) -> Result<PipelineState, TransitionError> {
        if !self.current.can_transition_to(next) {
            return Err(TransitionError {
                from: self.current,
                to: next,
            });
        }
        let previous = self.current;
        self.current = next;
        self.history.push(next);
        Ok(previous)
    }
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

    #[test]
    fn happy_path_reaches_reported_and_returns_idle() {
        let mut tracker = PipelineTracker::new();
        for next in [
            PipelineState::ManifestLoaded,
            PipelineState::Extracting,
            PipelineState::Evaluating,
            PipelineState::Correlating,
            PipelineState::Reported,
            PipelineState::Idle,
        ] {
            tracker.advance(next).unwrap();
        }
        assert_eq!(tracker.history().len(), 7);
    }

    #[test]
    fn manifest_failure_goes_straight_to_fatal() {
        let mut tracker = PipelineTracker::new();
        assert_eq!(tracker.advance(PipelineState::Fatal), Ok(PipelineState::Idle));
        let err = tracker.advance(PipelineState::Reported).unwrap_err();
        assert_eq!(err.from, PipelineState::Fatal);
    }

    #[test]
    fn phases_cannot_be_skipped() {
        let mut tracker = PipelineTracker::new();
        tracker.advance(PipelineState::ManifestLoaded).unwrap();
        assert!(tracker.advance(PipelineState::Evaluating).is_err());
        assert!(!PipelineState::Evaluating.can_transition_to(PipelineState::Fatal));
    }
}
