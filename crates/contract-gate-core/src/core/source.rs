// crates/contract-gate-core/src/core/source.rs
// ============================================================================
// Module: Contract Gate Source Units
// Description: Source unit, language tag, and source location types.
// Purpose: Describe the files handed to extraction adapters.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`SourceUnit`] is one file of one codebase: its normalized path, detected
//! language, and raw bytes. Decoding happens inside extraction so that a
//! non-UTF-8 file degrades only its own unit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CodebaseId;

// ============================================================================
// SECTION: Languages
// ============================================================================

/// Source languages with a registered extraction adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// TypeScript and JavaScript.
    TypeScript,
    /// Python.
    Python,
    /// Go.
    Go,
    /// Java.
    Java,
}

/// Extension table mapping file extensions to languages.
pub const LANGUAGE_EXTENSIONS: &[(&str, Language)] = &[
    ("ts", Language::TypeScript),
    ("tsx", Language::TypeScript),
    ("js", Language::TypeScript),
    ("jsx", Language::TypeScript),
    ("mjs", Language::TypeScript),
    ("cjs", Language::TypeScript),
    ("py", Language::Python),
    ("go", Language::Go),
    ("java", Language::Java),
];

impl Language {
    /// Resolves a language from a file path by extension.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let file = path.rsplit('/').next().unwrap_or(path);
        if file.ends_with(".d.ts") {
            return None;
        }
        let (_, extension) = file.rsplit_once('.')?;
        LANGUAGE_EXTENSIONS
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(extension))
            .map(|(_, language)| *language)
    }

    /// Returns the stable label for the language.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Python => "python",
            Self::Go => "go",
            Self::Java => "java",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Locations
// ============================================================================

/// File and 1-based line of a finding or observation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Slash-normalized file path.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

impl SourceLocation {
    /// Creates a new source location.
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

// ============================================================================
// SECTION: Source Units
// ============================================================================

/// One file submitted for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Slash-normalized path, relative to the scan root when possible.
    pub path: String,
    /// Detected language.
    pub language: Language,
    /// Codebase the unit was discovered under, when mapped by configuration.
    pub codebase: Option<CodebaseId>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl SourceUnit {
    /// Creates a source unit, normalizing path separators.
    #[must_use]
    pub fn new(path: impl Into<String>, language: Language, bytes: Vec<u8>) -> Self {
        Self {
            path: normalize_path(&path.into()),
            language,
            codebase: None,
            bytes,
        }
    }

    /// Tags the unit with the codebase it belongs to.
    #[must_use]
    pub fn with_codebase(mut self, codebase: CodebaseId) -> Self {
        self.codebase = Some(codebase);
        self
    }
}

/// Normalizes a path to forward slashes without a leading `./`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    replaced.strip_prefix("./").map_or(replaced.clone(), ToString::to_string)
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
    fn extension_table_resolves_languages() {
        assert_eq!(Language::from_path("src/api/client.ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_path("web/app.MJS"), Some(Language::TypeScript));
        assert_eq!(Language::from_path("svc/handlers.go"), Some(Language::Go));
        assert_eq!(Language::from_path("types/global.d.ts"), None);
        assert_eq!(Language::from_path("README.md"), None);
        assert_eq!(Language::from_path("Makefile"), None);
    }

    #[test]
    fn paths_are_slash_normalized() {
        let unit = SourceUnit::new(".\\src\\client.py", Language::Python, Vec::new());
        assert_eq!(unit.path, "src/client.py");
    }
}
