// crates/contract-gate-core/src/core/naming.rs
// ============================================================================
// Module: Contract Gate Field Naming
// Description: Name normalization and case-style detection for wire fields.
// Purpose: Compare field names across codebases that disagree on casing.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Wire field names drift between `stock_count`, `stockCount`, and
//! `StockCount` as a contract crosses language boundaries. Normalization
//! lowercases ASCII alphanumerics and drops separators so that all three
//! compare equal, while [`CaseStyle`] keeps the original spelling explainable
//! in violation messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Case Styles
// ============================================================================

/// Casing convention detected on a field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStyle {
    /// `stock_count`
    Snake,
    /// `stockCount`
    Camel,
    /// `StockCount`
    Pascal,
    /// `stock-count`
    Kebab,
    /// Single lowercase word (`stock`).
    Flat,
    /// Anything else, including mixed separators.
    Mixed,
}

impl CaseStyle {
    /// Returns a short human label for messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Snake => "snake_case",
            Self::Camel => "camelCase",
            Self::Pascal => "PascalCase",
            Self::Kebab => "kebab-case",
            Self::Flat => "lowercase",
            Self::Mixed => "mixed case",
        }
    }
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Normalizes a field name to lowercase ASCII alphanumerics.
///
/// `stock_count`, `stockCount`, `StockCount` and `stock-count` all normalize
/// to `stockcount`.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).map(|ch| ch.to_ascii_lowercase()).collect()
}

/// Returns true when two names are equal after normalization.
#[must_use]
pub fn names_match(left: &str, right: &str) -> bool {
    !left.is_empty() && normalize_name(left) == normalize_name(right)
}

/// Detects the casing convention of a name.
#[must_use]
pub fn case_style(name: &str) -> CaseStyle {
    let has_underscore = name.contains('_');
    let has_dash = name.contains('-');
    let has_upper = name.chars().any(|ch| ch.is_ascii_uppercase());
    let first_upper = name.chars().next().is_some_and(|ch| ch.is_ascii_uppercase());
    match (has_underscore, has_dash, has_upper) {
        (true, false, false) => CaseStyle::Snake,
        (false, true, false) => CaseStyle::Kebab,
        (false, false, true) if first_upper => CaseStyle::Pascal,
        (false, false, true) => CaseStyle::Camel,
        (false, false, false) => CaseStyle::Flat,
        _ => CaseStyle::Mixed,
    }
}

/// Splits a name into lowercase words across separators and case changes.
///
/// `amountCents` yields `["amount", "cents"]`; `HTTPTimeout_ms` yields
/// `["http", "timeout", "ms"]`.
#[must_use]
pub fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (index, ch) in chars.iter().enumerate() {
        if !ch.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let boundary = ch.is_ascii_uppercase()
            && index > 0
            && (chars[index - 1].is_ascii_lowercase()
                || chars[index - 1].is_ascii_digit()
                || (chars[index - 1].is_ascii_uppercase()
                    && chars.get(index + 1).is_some_and(char::is_ascii_lowercase)));
        if boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(ch.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
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
    fn normalization_erases_casing_and_separators() {
        assert_eq!(normalize_name("stock_count"), "stockcount");
        assert_eq!(normalize_name("stockCount"), "stockcount");
        assert_eq!(normalize_name("Stock-Count"), "stockcount");
        assert!(names_match("warehouse_id", "WarehouseID"));
        assert!(!names_match("", ""));
    }

    #[test]
    fn case_style_detection() {
        assert_eq!(case_style("stock_count"), CaseStyle::Snake);
        assert_eq!(case_style("stockCount"), CaseStyle::Camel);
        assert_eq!(case_style("StockCount"), CaseStyle::Pascal);
        assert_eq!(case_style("stock-count"), CaseStyle::Kebab);
        assert_eq!(case_style("stock"), CaseStyle::Flat);
        assert_eq!(case_style("Stock_count"), CaseStyle::Mixed);
    }

    #[test]
    fn word_splitting_handles_acronyms() {
        assert_eq!(split_words("amountCents"), vec!["amount", "cents"]);
        assert_eq!(split_words("HTTPTimeout_ms"), vec!["http", "timeout", "ms"]);
        assert_eq!(split_words("expires_in"), vec!["expires", "in"]);
    }
}
