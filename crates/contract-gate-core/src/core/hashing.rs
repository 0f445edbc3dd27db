// crates/contract-gate-core/src/core/hashing.rs
// ============================================================================
// Module: Contract Gate Report Digest
// Description: SHA-256 digest over RFC 8785 canonical JSON.
// Purpose: Let repeated runs over the same inputs be compared byte-for-byte.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! The ordered violation list is canonicalized with JCS (RFC 8785) before
//! hashing, so the digest does not depend on serializer map ordering or
//! float formatting. Only SHA-256 is produced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Report Digest
// ============================================================================

/// Lowercase hex SHA-256 of a value's canonical JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportDigest(String);

impl ReportDigest {
    /// Canonicalizes `value` and hashes the resulting bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError`] when `value` cannot be serialized.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self, DigestError> {
        let bytes = serde_jcs::to_vec(value).map_err(|err| DigestError(err.to_string()))?;
        let hash = Sha256::digest(&bytes);
        let hex = hash.iter().fold(String::with_capacity(64), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        });
        Ok(Self(hex))
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical JSON serialization failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to canonicalize report: {0}")]
pub struct DigestError(String);

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

    use serde_json::json;

    use super::*;

    #[test]
    fn digest_ignores_key_order() {
        let left = ReportDigest::of(&json!({"b": 1, "a": [1, 2]})).unwrap();
        let right = ReportDigest::of(&json!({"a": [1, 2], "b": 1})).unwrap();
        assert_eq!(left, right);
        assert_eq!(left.as_str().len(), 64);
    }

    #[test]
    fn empty_list_has_a_known_digest() {
        // sha256("[]")
        let digest = ReportDigest::of(&Vec::<u8>::new()).unwrap();
        assert_eq!(digest.to_string(), "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945");
    }
}
