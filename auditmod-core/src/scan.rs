//! Corpus discovery and loading.
//!
//! Performance optimizations:
//! - Early directory pruning via `WalkDir::filter_entry` (O(1) subtree skip)
//! - Parallel file reading via Rayon
//!
//! A unit that cannot be read or is not UTF-8 is skipped and recorded in
//! [`Corpus::skipped`]; it never aborts the load.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{AuditError, AuditResult, IoResultExt};

/// Directories to exclude by default (standard Rust project conventions).
pub const EXCLUDED_DIRS: &[&str] = &["target", ".git", "node_modules", ".cargo"];

/// Directory names that mark everything below them as test code.
const TEST_DIRS: &[&str] = &["tests", "test", "benches"];

/// Whether a unit is test code or production code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Test,
    Production,
}

impl UnitKind {
    pub fn is_test(self) -> bool {
        self == Self::Test
    }

    /// Bracketed tag used in plain-text reports.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Test => "[TEST]",
            Self::Production => "[PROD]",
        }
    }
}

/// One source unit: a file's full text tagged with its root-relative path.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Path relative to the corpus root, `/`-separated
    pub path: PathBuf,
    pub text: String,
    pub kind: UnitKind,
}

impl SourceUnit {
    /// Build an in-memory unit; the kind is derived from the path.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let kind = unit_kind(&path);
        Self {
            path,
            text: text.into(),
            kind,
        }
    }
}

/// A unit that was left out of the corpus.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedUnit {
    pub path: PathBuf,
    pub reason: String,
}

/// All readable units under a root, sorted by path.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub root: PathBuf,
    pub units: Vec<SourceUnit>,
    pub skipped: Vec<SkippedUnit>,
}

impl Corpus {
    /// Corpus built from already-loaded units (sorted by path).
    pub fn from_units(root: impl Into<PathBuf>, mut units: Vec<SourceUnit>) -> Self {
        units.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            root: root.into(),
            units,
            skipped: Vec::new(),
        }
    }

    pub fn test_count(&self) -> usize {
        self.units.iter().filter(|u| u.kind.is_test()).count()
    }

    pub fn production_count(&self) -> usize {
        self.units.len() - self.test_count()
    }
}

/// Classify a root-relative path as test or production code.
///
/// Test when any directory segment is `tests`, `test` or `benches`, or the
/// file name is `tests.rs`, ends in `_test.rs` / `_tests.rs`, or starts with
/// `test_`.
pub fn unit_kind(path: &Path) -> UnitKind {
    let mut components: Vec<&str> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();

    let file_name = components.pop().unwrap_or_default();

    let in_test_dir = components.iter().any(|c| TEST_DIRS.contains(c));
    let test_name = file_name == "tests.rs"
        || file_name.ends_with("_test.rs")
        || file_name.ends_with("_tests.rs")
        || file_name.starts_with("test_");

    if in_test_dir || test_name {
        UnitKind::Test
    } else {
        UnitKind::Production
    }
}

#[inline]
fn is_excluded_dir(entry: &walkdir::DirEntry, excludes: &HashSet<&str>) -> bool {
    entry.file_type().is_dir()
        && entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| excludes.contains(name))
}

/// Gathers all .rs files recursively, sorted by path.
///
/// Automatically excludes `target/`, `.git/`, `node_modules/`, and `.cargo/`.
pub fn gather_rs_files(root: &Path) -> Result<Vec<PathBuf>> {
    gather_rs_files_with_excludes(root, &[])
}

/// Walks `root` with early pruning, yielding `.rs` paths and walk errors.
fn walk_rs_files(root: &Path, excludes: &[&str]) -> Vec<walkdir::Result<PathBuf>> {
    let all_excludes: HashSet<&str> = EXCLUDED_DIRS
        .iter()
        .copied()
        .chain(excludes.iter().copied())
        .collect();

    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e, &all_excludes))
        .par_bridge()
        .filter_map(|entry| match entry {
            Ok(e) => {
                let path = e.path();
                if e.file_type().is_file() && path.extension().is_some_and(|ext| ext == "rs") {
                    Some(Ok(path.to_path_buf()))
                } else {
                    None
                }
            }
            Err(e) => Some(Err(e)),
        })
        .collect()
}

/// Gathers all .rs files with custom exclusion patterns using early pruning.
///
/// Strict: any walk error fails the whole gather.
pub fn gather_rs_files_with_excludes(root: &Path, excludes: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = walk_rs_files(root, excludes)
        .into_iter()
        .collect::<walkdir::Result<Vec<_>>>()
        .with_context(|| format!("Failed to gather .rs files from {}", root.display()))?;

    files.sort();
    Ok(files)
}

/// Lenient gather for corpus loading.
///
/// An error on the root itself is fatal. Any error below it (an unreadable
/// directory, a symlink loop) is logged and returned as a skipped entry.
fn gather_corpus_files(
    root: &Path,
    excludes: &[&str],
) -> Result<(Vec<PathBuf>, Vec<SkippedUnit>)> {
    let mut files = Vec::new();
    let mut skipped = Vec::new();

    for entry in walk_rs_files(root, excludes) {
        match entry {
            Ok(path) => files.push(path),
            Err(e) if e.depth() == 0 => {
                return Err(e).with_context(|| {
                    format!("Failed to gather .rs files from {}", root.display())
                });
            }
            Err(e) => {
                let path = e.path().unwrap_or(root);
                warn!(path = %path.display(), error = %e, "skipping unwalkable entry");
                skipped.push(SkippedUnit {
                    path: relative_path(root, path),
                    reason: e.to_string(),
                });
            }
        }
    }

    files.sort();
    Ok((files, skipped))
}

/// Root-relative, `/`-separated form of a walked path.
fn relative_path(root: &Path, path: &Path) -> PathBuf {
    let rel = path.strip_prefix(root).unwrap_or(path);
    PathBuf::from(rel.to_string_lossy().replace('\\', "/"))
}

/// Read one file as a unit. Fails on I/O errors and non-UTF-8 content.
pub fn read_unit(root: &Path, path: &Path) -> AuditResult<SourceUnit> {
    let bytes = fs::read(path).with_path(path)?;
    let text = String::from_utf8(bytes).map_err(|e| AuditError::decode(path, e.to_string()))?;
    Ok(SourceUnit::new(relative_path(root, path), text))
}

/// Load every eligible unit under `root`.
///
/// Only a missing or unwalkable root is an error; unreadable directories and
/// units below it are logged and skipped.
pub fn load_corpus(root: &Path, excludes: &[&str]) -> Result<Corpus> {
    if !root.is_dir() {
        return Err(AuditError::invalid_argument(format!(
            "corpus root is not a directory: {}",
            root.display()
        ))
        .into());
    }

    let (files, mut skipped) = gather_corpus_files(root, excludes)?;

    let results: Vec<(PathBuf, AuditResult<SourceUnit>)> = files
        .par_iter()
        .map(|path| (path.clone(), read_unit(root, path)))
        .collect();

    let mut units = Vec::with_capacity(results.len());
    for (path, result) in results {
        match result {
            Ok(unit) => units.push(unit),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable unit");
                skipped.push(SkippedUnit {
                    path: relative_path(root, &path),
                    reason: e.to_string(),
                });
            }
        }
    }

    skipped.sort_by(|a, b| a.path.cmp(&b.path));
    let mut corpus = Corpus::from_units(root, units);
    corpus.skipped = skipped;

    info!(
        root = %root.display(),
        units = corpus.units.len(),
        skipped = corpus.skipped.len(),
        "corpus loaded"
    );
    Ok(corpus)
}
