// src/archive/exclude.rs
//! Exclusion rules applied during the package walk
//!
//! The excluded-path set is an explicit, documented policy value rather than
//! a constant buried in the builder. Callers can extend it per invocation.

use crate::error::{Error, Result};
use glob::Pattern;

/// Paths excluded from every archive, matched against normalized relative
/// paths and against bare file names:
///
/// - version-control metadata (`.git`, `.svn`, `.hg`)
/// - registry credential and config files (`.porterrc`, `.registry-token`)
/// - editor/OS noise (`.DS_Store`)
/// - previously produced archives (`*.tgz`), so repeated pack invocations
///   never swallow their own output
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".porterrc",
    ".registry-token",
    ".DS_Store",
    "*.tgz",
];

/// Glob-based exclusion policy for the archive walk
#[derive(Debug, Clone)]
pub struct ExcludePolicy {
    patterns: Vec<Pattern>,
}

impl Default for ExcludePolicy {
    fn default() -> Self {
        let patterns = DEFAULT_EXCLUDES
            .iter()
            .map(|p| Pattern::new(p).expect("default exclude patterns are valid globs"))
            .collect();
        Self { patterns }
    }
}

impl ExcludePolicy {
    /// A policy that excludes nothing
    pub fn empty() -> Self {
        Self { patterns: Vec::new() }
    }

    /// Add a caller-supplied glob pattern to the policy
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let compiled = Pattern::new(pattern)
            .map_err(|e| Error::InitError(format!("invalid exclude pattern '{pattern}': {e}")))?;
        self.patterns.push(compiled);
        Ok(self)
    }

    /// Check a normalized relative path against the policy
    ///
    /// A pattern matches if it matches the full relative path or its final
    /// component, so `.DS_Store` excludes the file at any depth and `.git`
    /// excludes the directory (and with it the whole subtree, since the
    /// walker prunes excluded directories).
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
        self.patterns
            .iter()
            .any(|p| p.matches(rel_path) || p.matches(file_name))
    }
}
