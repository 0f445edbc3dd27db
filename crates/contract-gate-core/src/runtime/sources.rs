// crates/contract-gate-core/src/runtime/sources.rs
// ============================================================================
// Module: Contract Gate Source Discovery
// Description: Deterministic discovery of source units under input paths.
// Purpose: Turn CLI paths into tagged source units without silent drops.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! Discovery walks every input path in sorted order. Hidden directories and
//! dependency/build output directories are never entered. Symlinks are only
//! followed when configured, and followed directories are visited once.
//! Every file that is not turned into a [`SourceUnit`] is recorded as a
//! diagnostic so no unit disappears without a reason.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::CodebaseId;
use crate::core::source::Language;
use crate::core::source::SourceLocation;
use crate::core::source::SourceUnit;
use crate::core::source::normalize_path;
use crate::core::violation::Diagnostic;
use crate::core::violation::DiagnosticKind;
use crate::extract::adapter_for;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Directory names never entered.
const SKIPPED_DIRECTORIES: &[&str] = &["node_modules", "vendor", "target", "dist", "build"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Source discovery failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// An input path does not exist.
    #[error("source path not found: {0}")]
    NotFound(String),
    /// An input path could not be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying error.
        message: String,
    },
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// Maps source path prefixes to a manifest codebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebaseMapping {
    /// Codebase identifier used in the manifest.
    pub id: CodebaseId,
    /// Slash-separated path prefixes belonging to the codebase.
    pub paths: Vec<String>,
}

/// Discovery limits and mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Follow symbolic links.
    pub follow_symlinks: bool,
    /// Files larger than this are not loaded.
    pub max_unit_bytes: usize,
    /// Codebase mappings.
    pub codebases: Vec<CodebaseMapping>,
}

/// Discovered units plus the files that were not loaded.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Loaded units in path order.
    pub units: Vec<SourceUnit>,
    /// Files skipped or rejected, with reasons.
    pub diagnostics: Vec<Diagnostic>,
    /// Files without an adapter or behind an unfollowed symlink.
    pub skipped: usize,
    /// Files rejected for size or read errors.
    pub rejected: usize,
}

// ============================================================================
// SECTION: Codebase Resolution
// ============================================================================

/// Returns true when `prefix` is a path-component prefix of `path`.
fn has_prefix(path: &str, prefix: &str) -> bool {
    let prefix = normalize_path(prefix);
    let prefix = prefix.trim_end_matches('/');
    !prefix.is_empty() && (path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/')))
}

/// Resolves the codebase of a path by its longest mapped prefix.
#[must_use]
pub fn codebase_for(path: &str, mappings: &[CodebaseMapping]) -> Option<CodebaseId> {
    mappings
        .iter()
        .flat_map(|mapping| mapping.paths.iter().map(move |prefix| (mapping, prefix)))
        .filter(|(_, prefix)| has_prefix(path, prefix))
        .max_by_key(|(_, prefix)| prefix.trim_end_matches('/').len())
        .map(|(mapping, _)| mapping.id.clone())
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Discovers source units under every input path.
///
/// # Errors
///
/// Returns [`SourceError`] when an input path is missing or a directory
/// cannot be listed.
pub fn discover(paths: &[PathBuf], options: &DiscoveryOptions) -> Result<Discovery, SourceError> {
    let mut discovery = Discovery::default();
    let mut visited = BTreeSet::new();
    let mut roots = paths.to_vec();
    roots.sort();
    roots.dedup();
    for root in &roots {
        if fs::symlink_metadata(root).is_err() {
            return Err(SourceError::NotFound(display(root)));
        }
        visit(root, options, &mut visited, &mut discovery, true)?;
    }
    discovery.units.sort_by(|left, right| left.path.cmp(&right.path));
    discovery.units.dedup_by(|left, right| left.path == right.path);
    Ok(discovery)
}

/// Slash-normalized display form of a path.
fn display(path: &Path) -> String {
    normalize_path(&path.to_string_lossy())
}

/// Visits one path.
fn visit(
    path: &Path,
    options: &DiscoveryOptions,
    visited: &mut BTreeSet<PathBuf>,
    discovery: &mut Discovery,
    is_root: bool,
) -> Result<(), SourceError> {
    let shown = display(path);
    let io_error = |err: std::io::Error| SourceError::Io {
        path: shown.clone(),
        message: err.to_string(),
    };
    let link = fs::symlink_metadata(path).map_err(io_error)?;
    if link.file_type().is_symlink() && !options.follow_symlinks {
        discovery.skipped += 1;
        discovery.diagnostics.push(
            Diagnostic::new(DiagnosticKind::Skipped, "symlink not followed").for_unit(shown.clone()),
        );
        return Ok(());
    }
    let metadata = fs::metadata(path).map_err(io_error)?;
    if metadata.is_dir() {
        if !is_root && is_skipped_directory(path) {
            return Ok(());
        }
        let canonical = fs::canonicalize(path).map_err(io_error)?;
        if !visited.insert(canonical) {
            return Ok(());
        }
        let mut children: Vec<PathBuf> = fs::read_dir(path)
            .map_err(io_error)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .collect();
        children.sort();
        for child in children {
            visit(&child, options, visited, discovery, false)?;
        }
        return Ok(());
    }
    load_file(path, &shown, metadata.len(), options, discovery);
    Ok(())
}

/// Returns true for hidden and dependency/build directories.
fn is_skipped_directory(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') || SKIPPED_DIRECTORIES.contains(&name))
}

/// Loads one file as a unit or records why it was not loaded.
fn load_file(path: &Path, shown: &str, size: u64, options: &DiscoveryOptions, discovery: &mut Discovery) {
    let Some(language) = Language::from_path(shown).filter(|language| adapter_for(*language).is_some()) else {
        discovery.skipped += 1;
        discovery
            .diagnostics
            .push(Diagnostic::new(DiagnosticKind::Skipped, "no adapter for file type").for_unit(shown));
        return;
    };
    if !usize::try_from(size).is_ok_and(|size| size <= options.max_unit_bytes) {
        discovery.rejected += 1;
        discovery.diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::DegradedCoverage,
                format!("unit exceeds size limit ({size} > {} bytes)", options.max_unit_bytes),
            )
            .for_unit(shown)
            .at(SourceLocation::new(shown, 1)),
        );
        return;
    }
    match fs::read(path) {
        Ok(bytes) => {
            let mut unit = SourceUnit::new(shown, language, bytes);
            if let Some(codebase) = codebase_for(&unit.path, &options.codebases) {
                unit = unit.with_codebase(codebase);
            }
            discovery.units.push(unit);
        }
        Err(err) => {
            discovery.rejected += 1;
            discovery.diagnostics.push(
                Diagnostic::new(DiagnosticKind::DegradedCoverage, format!("unit could not be read: {err}"))
                    .for_unit(shown),
            );
        }
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

    fn options() -> DiscoveryOptions {
        DiscoveryOptions {
            follow_symlinks: false,
            max_unit_bytes: 64,
            codebases: vec![
                CodebaseMapping {
                    id: CodebaseId::new("monorepo"),
                    paths: vec!["apps".to_string()],
                },
                CodebaseMapping {
                    id: CodebaseId::new("web-client"),
                    paths: vec!["apps/web/".to_string()],
                },
            ],
        }
    }

    #[test]
    fn longest_prefix_wins_on_component_boundaries() {
        let mappings = options().codebases;
        assert_eq!(codebase_for("apps/web/src/api.ts", &mappings), Some(CodebaseId::new("web-client")));
        assert_eq!(codebase_for("apps/worker/main.go", &mappings), Some(CodebaseId::new("monorepo")));
        assert_eq!(codebase_for("apps-legacy/x.ts", &mappings), None);
    }

    #[test]
    fn walk_is_sorted_and_skips_dependency_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("src/b.py"), "x = 1\n").unwrap();
        fs::write(root.join("src/a.ts"), "const x = 1;\n").unwrap();
        fs::write(root.join("node_modules/lib/index.js"), "module.exports = {};\n").unwrap();
        fs::write(root.join(".git/config.py"), "x = 1\n").unwrap();
        fs::write(root.join("README.md"), "# readme\n").unwrap();
        fs::write(root.join("src/huge.go"), "package main\n".repeat(10)).unwrap();

        let discovery = discover(&[root.to_path_buf()], &options()).unwrap();
        let names: Vec<&str> =
            discovery.units.iter().map(|unit| unit.path.rsplit('/').next().unwrap_or_default()).collect();
        assert_eq!(names, vec!["a.ts", "b.py"]);
        assert_eq!(discovery.skipped, 1);
        assert_eq!(discovery.rejected, 1);
    }

    #[test]
    fn missing_input_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        assert!(matches!(discover(&[missing], &options()), Err(SourceError::NotFound(_))));
    }
}
