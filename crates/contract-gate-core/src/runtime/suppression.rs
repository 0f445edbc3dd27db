// crates/contract-gate-core/src/runtime/suppression.rs
// ============================================================================
// Module: Contract Gate Inline Suppression
// Description: Parses inline suppression directives and filters violations.
// Purpose: Let authors silence specific findings next to the code they concern.
// Dependencies: regex, crate::core, crate::extract
// ============================================================================

//! ## Overview
//! Four directives are recognized anywhere on a line, normally inside a
//! comment:
//!
//! - `contract-gate-disable-next-line <ids> -- reason`
//! - `contract-gate-disable <ids>` / `contract-gate-enable <ids>`
//! - `contract-gate-disable-file <ids>`
//!
//! Rule ids are separated by commas or whitespace and end at `--` or `*/`.
//! A directive without ids applies to every rule. Suppression is keyed by a
//! violation's primary location only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::violation::Violation;
use crate::extract::kinds::compile;

// ============================================================================
// SECTION: Directives
// ============================================================================

/// Directive pattern; longer keywords come first in the alternation.
static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"contract-gate-(disable-next-line|disable-file|disable|enable)\b(.*)$"));

/// Rules a directive applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSelector {
    /// Every rule.
    All,
    /// Listed rule ids.
    Rules(BTreeSet<String>),
}

impl RuleSelector {
    /// Parses the id list that follows a directive keyword.
    fn parse(tail: &str) -> Self {
        let end = [tail.find("--"), tail.find("*/")].into_iter().flatten().min().unwrap_or(tail.len());
        let ids: BTreeSet<String> = tail[.. end]
            .split(|ch: char| ch == ',' || ch.is_whitespace())
            .filter(|id| !id.is_empty())
            .map(ToString::to_string)
            .collect();
        if ids.is_empty() { Self::All } else { Self::Rules(ids) }
    }

    /// Returns true when the selector covers a rule.
    #[must_use]
    pub fn covers(&self, rule_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Rules(ids) => ids.contains(rule_id),
        }
    }
}

/// Line range covered by a `disable` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SuppressedRange {
    /// First suppressed line.
    start: u32,
    /// Last suppressed line; `None` runs to the end of the file.
    end: Option<u32>,
    /// Rules suppressed.
    selector: RuleSelector,
}

// ============================================================================
// SECTION: Per-File Suppressions
// ============================================================================

/// Parsed suppression directives of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSuppressions {
    /// File-wide selectors.
    file: Vec<RuleSelector>,
    /// Selectors keyed by the line they suppress.
    lines: BTreeMap<u32, Vec<RuleSelector>>,
    /// Closed and open ranges.
    ranges: Vec<SuppressedRange>,
}

impl FileSuppressions {
    /// Parses every directive in a file's text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut parsed = Self::default();
        let mut open: Vec<SuppressedRange> = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line_no = u32::try_from(index + 1).unwrap_or(u32::MAX);
            let Some(captures) = DIRECTIVE.captures(line) else {
                continue;
            };
            let keyword = captures.get(1).map_or("", |m| m.as_str());
            let selector = RuleSelector::parse(captures.get(2).map_or("", |m| m.as_str()));
            match keyword {
                "disable-next-line" => {
                    parsed.lines.entry(line_no.saturating_add(1)).or_default().push(selector);
                }
                "disable-file" => parsed.file.push(selector),
                "disable" => open.push(SuppressedRange {
                    start: line_no,
                    end: None,
                    selector,
                }),
                _ => {
                    let mut still_open = Vec::new();
                    for range in open.drain(..) {
                        close(range, &selector, line_no, &mut parsed.ranges, &mut still_open);
                    }
                    open = still_open;
                }
            }
        }
        parsed.ranges.extend(open);
        parsed
    }

    /// Returns true when a rule is suppressed at a line.
    #[must_use]
    pub fn suppresses(&self, rule_id: &str, line: u32) -> bool {
        self.file.iter().any(|selector| selector.covers(rule_id))
            || self.lines.get(&line).is_some_and(|selectors| selectors.iter().any(|s| s.covers(rule_id)))
            || self.ranges.iter().any(|range| {
                range.start <= line && range.end.is_none_or(|end| line <= end) && range.selector.covers(rule_id)
            })
    }

    /// Returns true when the file carries no directives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file.is_empty() && self.lines.is_empty() && self.ranges.is_empty()
    }
}

/// Applies an `enable` directive to one open range.
///
/// Enabling a subset of a listed range closes it and reopens the remainder.
fn close(
    range: SuppressedRange,
    enable: &RuleSelector,
    line: u32,
    closed: &mut Vec<SuppressedRange>,
    still_open: &mut Vec<SuppressedRange>,
) {
    match (&range.selector, enable) {
        (_, RuleSelector::All) => closed.push(SuppressedRange {
            end: Some(line),
            ..range
        }),
        (RuleSelector::All, RuleSelector::Rules(_)) => still_open.push(range),
        (RuleSelector::Rules(ids), RuleSelector::Rules(enabled)) => {
            if ids.is_disjoint(enabled) {
                still_open.push(range);
                return;
            }
            let remaining: BTreeSet<String> = ids.difference(enabled).cloned().collect();
            if !remaining.is_empty() {
                still_open.push(SuppressedRange {
                    start: line,
                    end: None,
                    selector: RuleSelector::Rules(remaining),
                });
            }
            closed.push(SuppressedRange {
                end: Some(line),
                ..range
            });
        }
    }
}

// ============================================================================
// SECTION: Index
// ============================================================================

/// Suppressions for every analyzed file.
#[derive(Debug, Clone, Default)]
pub struct SuppressionIndex {
    /// Parsed directives keyed by file path.
    files: BTreeMap<String, FileSuppressions>,
}

impl SuppressionIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a file's directives; files without directives are skipped.
    pub fn insert(&mut self, file: impl Into<String>, suppressions: FileSuppressions) {
        if !suppressions.is_empty() {
            self.files.insert(file.into(), suppressions);
        }
    }

    /// Returns true when a violation's primary location is suppressed.
    #[must_use]
    pub fn suppresses(&self, violation: &Violation) -> bool {
        let primary = violation.primary();
        self.files
            .get(&primary.file)
            .is_some_and(|file| file.suppresses(violation.rule_id().as_str(), primary.line))
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
    use crate::core::identifiers::RuleId;
    use crate::core::source::SourceLocation;
    use crate::core::violation::Severity;

    const TEXT: &str = "\
// contract-gate-disable-next-line CTR-request-shape -- legacy client
post('/oauth/token', body)
fetch(a)
/* contract-gate-disable CTR-status-code-handling, TQ-error-path-coverage */
fetch(b)
// contract-gate-enable TQ-error-path-coverage
fetch(c)
// contract-gate-enable
fetch(d)
";

    #[test]
    fn next_line_applies_to_one_line_and_listed_rules() {
        let parsed = FileSuppressions::parse(TEXT);
        assert!(parsed.suppresses("CTR-request-shape", 2));
        assert!(!parsed.suppresses("CTR-request-shape", 3));
        assert!(!parsed.suppresses("CTR-response-shape", 2));
    }

    #[test]
    fn partial_enable_reopens_the_remaining_rules() {
        let parsed = FileSuppressions::parse(TEXT);
        assert!(parsed.suppresses("TQ-error-path-coverage", 5));
        assert!(!parsed.suppresses("TQ-error-path-coverage", 7));
        assert!(parsed.suppresses("CTR-status-code-handling", 7));
        assert!(!parsed.suppresses("CTR-status-code-handling", 9));
    }

    #[test]
    fn bare_file_directive_covers_every_rule() {
        let parsed = FileSuppressions::parse("# contract-gate-disable-file\nx = 1\n");
        assert!(parsed.suppresses("CTR-boundary-naming-drift", 2));
        assert!(!FileSuppressions::parse("x = 1\n").suppresses("CTR-request-shape", 1));
    }

    #[test]
    fn index_matches_on_primary_location() {
        let mut index = SuppressionIndex::new();
        index.insert("src/api.ts", FileSuppressions::parse(TEXT));
        let violation = Violation::new(
            RuleId::new("CTR-request-shape"),
            Severity::Error,
            SourceLocation::new("src/api.ts", 2),
            "grant_type",
            "missing",
        );
        assert!(index.suppresses(&violation));
        let elsewhere = Violation::new(
            RuleId::new("CTR-request-shape"),
            Severity::Error,
            SourceLocation::new("src/other.ts", 2),
            "grant_type",
            "missing",
        );
        assert!(!index.suppresses(&elsewhere));
    }
}
