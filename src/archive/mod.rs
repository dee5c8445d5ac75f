// src/archive/mod.rs

//! Deterministic archive construction
//!
//! Walks a package directory, applies exclusion rules, and serializes a
//! compressed tar archive whose bytes are identical for semantically
//! identical input trees, regardless of host platform. All host-specific
//! metadata (owners, timestamps, permission noise) is normalized away at
//! entry construction time; `normalize_rel_path` is the single boundary
//! where path separators are unified.

mod builder;
mod exclude;

pub use builder::{Archive, ArchiveBuilder, PackedArchive};
pub use exclude::ExcludePolicy;

use crate::error::{Error, Result};
use std::path::{Component, Path};

/// Fixed modification timestamp for archive entries: 2024-01-01 00:00:00 UTC.
/// Overridable via SOURCE_DATE_EPOCH for reproducible-build tooling.
pub const FIXED_MTIME: u64 = 1704067200;

/// Normalized mode for regular file entries
pub const FILE_MODE: u32 = 0o644;

/// Normalized mode for directory entries
pub const DIR_MODE: u32 = 0o755;

/// Resolve the entry timestamp, honoring SOURCE_DATE_EPOCH when set
pub fn archive_mtime() -> u64 {
    std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(FIXED_MTIME)
}

/// One record inside a built archive, already normalized
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Relative path with forward-slash separators
    pub path: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone)]
pub enum EntryKind {
    File { data: Vec<u8> },
    Directory,
    Symlink { target: String },
}

impl ArchiveEntry {
    /// Normalized mode for this entry kind
    pub fn mode(&self) -> u32 {
        match self.kind {
            EntryKind::File { .. } => FILE_MODE,
            EntryKind::Directory => DIR_MODE,
            EntryKind::Symlink { .. } => 0o777,
        }
    }
}

/// Convert a host-relative path into the archive's canonical form
///
/// Forward-slash separators regardless of host, no `..` or root components.
/// This is the only place separators are translated; everything downstream
/// works with the normalized string form.
pub fn normalize_rel_path(rel: &Path) -> Result<String> {
    let mut parts: Vec<&str> = Vec::new();

    for component in rel.components() {
        match component {
            Component::Normal(c) => {
                let part = c.to_str().ok_or_else(|| {
                    Error::IoError(format!("non-UTF-8 path in package: {}", rel.display()))
                })?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::UnsafePath(format!(
                    "path escapes package root: {}",
                    rel.display()
                )));
            }
        }
    }

    if parts.is_empty() {
        return Err(Error::UnsafePath("empty entry path".to_string()));
    }

    Ok(parts.join("/"))
}
