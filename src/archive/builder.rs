// src/archive/builder.rs
//! Archive builder
//!
//! Builds `{name}-{version}.tgz` from a validated manifest and a package
//! directory. Two runs over semantically identical trees produce
//! byte-identical archives: the walk order is sorted, entry metadata is
//! normalized to fixed sentinels, and the manifest is always the first entry.

use crate::archive::{
    archive_mtime, normalize_rel_path, ArchiveEntry, EntryKind, ExcludePolicy,
};
use crate::digest::ArchiveDigest;
use crate::error::{Error, Result};
use crate::manifest::{PackageManifest, MANIFEST_FILE};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// A finished archive: ordered entries, serialized bytes, and their digest.
/// Never mutated after construction.
#[derive(Debug)]
pub struct Archive {
    pub entries: Vec<ArchiveEntry>,
    pub bytes: Vec<u8>,
    pub digest: ArchiveDigest,
}

/// Result of writing an archive to disk
#[derive(Debug)]
pub struct PackedArchive {
    pub path: PathBuf,
    pub digest: ArchiveDigest,
    pub entry_count: usize,
}

/// Builds deterministic package archives
pub struct ArchiveBuilder {
    manifest: PackageManifest,
    root: PathBuf,
    policy: ExcludePolicy,
    mtime: u64,
}

impl ArchiveBuilder {
    /// Create a builder for a validated manifest and its package directory
    pub fn new(manifest: PackageManifest, root: &Path) -> Self {
        Self {
            manifest,
            root: root.to_path_buf(),
            policy: ExcludePolicy::default(),
            mtime: archive_mtime(),
        }
    }

    /// Replace the exclusion policy
    pub fn with_policy(mut self, policy: ExcludePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the fixed entry timestamp
    pub fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }

    /// Build the archive in memory
    pub fn build(&self) -> Result<Archive> {
        let mut entries = self.collect_entries()?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        // The manifest file is always the first entry so consumers can read
        // the package identity without scanning the whole stream.
        let manifest_path = self.root.join(MANIFEST_FILE);
        let manifest_bytes = fs::read(&manifest_path).map_err(|e| {
            Error::ManifestNotFound(format!("{}: {e}", manifest_path.display()))
        })?;
        entries.insert(
            0,
            ArchiveEntry {
                path: MANIFEST_FILE.to_string(),
                kind: EntryKind::File {
                    data: manifest_bytes,
                },
            },
        );

        let bytes = self.serialize(&entries)?;
        let digest = ArchiveDigest::of_bytes(&bytes);

        debug!(
            "built archive for {} v{}: {} entries, {} bytes, sha256 {}",
            self.manifest.name,
            self.manifest.version,
            entries.len(),
            digest.size,
            digest.sha256
        );

        Ok(Archive {
            entries,
            bytes,
            digest,
        })
    }

    /// Build the archive and write `{name}-{version}.tgz` into `out_dir`
    ///
    /// The bytes go to a temporary file in the same directory first and are
    /// renamed into place on success, so a failed build never leaves a
    /// partial archive behind.
    pub fn write_to(&self, out_dir: &Path) -> Result<PackedArchive> {
        let archive = self.build()?;

        let dest = out_dir.join(self.manifest.archive_file_name());
        if dest.is_dir() {
            return Err(Error::WriteFailed(format!(
                "{} already exists as a directory",
                dest.display()
            )));
        }

        let mut tmp = tempfile::NamedTempFile::new_in(out_dir).map_err(|e| {
            Error::WriteFailed(format!("cannot create file in {}: {e}", out_dir.display()))
        })?;
        tmp.write_all(&archive.bytes)
            .map_err(|e| Error::WriteFailed(format!("{}: {e}", dest.display())))?;
        tmp.persist(&dest)
            .map_err(|e| Error::WriteFailed(format!("{}: {e}", dest.display())))?;

        info!(
            "packed {} v{} -> {} ({} bytes)",
            self.manifest.name,
            self.manifest.version,
            dest.display(),
            archive.digest.size
        );

        Ok(PackedArchive {
            path: dest,
            digest: archive.digest,
            entry_count: archive.entries.len(),
        })
    }

    /// Walk the package directory and collect normalized entries
    ///
    /// Excluded directories are pruned so their subtrees are never read.
    /// The manifest file is skipped here and added separately up front.
    fn collect_entries(&self) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::new();

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let rel = e.path().strip_prefix(&self.root).unwrap_or(e.path());
                match normalize_rel_path(rel) {
                    Ok(p) => !self.policy.is_excluded(&p),
                    // Path problems surface as errors in the loop below.
                    Err(_) => true,
                }
            });

        for entry in walker {
            let entry = entry
                .map_err(|e| Error::IoError(format!("failed to walk {}: {e}", self.root.display())))?;
            let rel = entry.path().strip_prefix(&self.root).map_err(|_| {
                Error::UnsafePath(format!(
                    "entry outside package root: {}",
                    entry.path().display()
                ))
            })?;
            let rel_path = normalize_rel_path(rel)?;

            if rel_path == MANIFEST_FILE {
                continue;
            }

            let file_type = entry.file_type();
            let kind = if file_type.is_symlink() {
                let target = fs::read_link(entry.path())
                    .map_err(|e| Error::IoError(format!("{}: {e}", entry.path().display())))?;
                self.check_symlink(&rel_path, &target)?;
                let target = target.to_str().ok_or_else(|| {
                    Error::IoError(format!("non-UTF-8 symlink target: {rel_path}"))
                })?;
                EntryKind::Symlink {
                    target: target.to_string(),
                }
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else {
                let data = fs::read(entry.path())
                    .map_err(|e| Error::IoError(format!("{}: {e}", entry.path().display())))?;
                EntryKind::File { data }
            };

            entries.push(ArchiveEntry {
                path: rel_path,
                kind,
            });
        }

        Ok(entries)
    }

    /// Reject symlinks whose targets resolve outside the package root
    ///
    /// Targets are resolved lexically against the link's directory, so the
    /// check works for dangling links too. Absolute targets are always
    /// rejected: they cannot survive relocation on the consumer side.
    fn check_symlink(&self, rel_path: &str, target: &Path) -> Result<()> {
        let escapes = |msg: &str| {
            Err(Error::UnsafePath(format!(
                "symlink {rel_path} {msg} (-> {})",
                target.display()
            )))
        };

        if target.is_absolute() {
            return escapes("has an absolute target");
        }

        // Directory depth of the link below the root.
        let mut depth = rel_path.split('/').count() as i64 - 1;
        for component in target.components() {
            match component {
                Component::Normal(_) => depth += 1,
                Component::CurDir => {}
                Component::ParentDir => {
                    depth -= 1;
                    if depth < 0 {
                        return escapes("escapes the package root");
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return escapes("has an absolute target");
                }
            }
        }

        Ok(())
    }

    /// Serialize entries into a gzip-compressed tar stream
    ///
    /// GNU headers, uid/gid 0, empty user/group names, fixed mtime and
    /// normalized modes. Compatible with standard tar+gzip consumers.
    fn serialize(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for entry in entries {
            let mut header = tar::Header::new_gnu();
            header.set_mode(entry.mode());
            header.set_mtime(self.mtime);
            header.set_uid(0);
            header.set_gid(0);

            match &entry.kind {
                EntryKind::File { data } => {
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_size(data.len() as u64);
                    builder
                        .append_data(&mut header, &entry.path, data.as_slice())
                        .map_err(|e| Error::IoError(format!("failed to add {}: {e}", entry.path)))?;
                }
                EntryKind::Directory => {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_size(0);
                    builder
                        .append_data(&mut header, &entry.path, std::io::empty())
                        .map_err(|e| Error::IoError(format!("failed to add {}: {e}", entry.path)))?;
                }
                EntryKind::Symlink { target } => {
                    header.set_entry_type(tar::EntryType::Symlink);
                    header.set_size(0);
                    builder
                        .append_link(&mut header, &entry.path, target)
                        .map_err(|e| Error::IoError(format!("failed to add {}: {e}", entry.path)))?;
                }
            }
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| Error::IoError(format!("failed to finish tar stream: {e}")))?;
        encoder
            .finish()
            .map_err(|e| Error::IoError(format!("failed to finish gzip stream: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_package(name: &str, version: &str) -> (TempDir, PackageManifest) {
        let dir = TempDir::new().unwrap();
        let manifest = PackageManifest::new_minimal(name, version);
        fs::write(
            dir.path().join(MANIFEST_FILE),
            manifest.to_json().unwrap(),
        )
        .unwrap();
        (dir, manifest)
    }

    #[test]
    fn test_build_empty_package() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        let archive = ArchiveBuilder::new(manifest, dir.path()).build().unwrap();

        assert_eq!(archive.entries.len(), 1);
        assert_eq!(archive.entries[0].path, MANIFEST_FILE);
        assert_eq!(archive.digest.size, archive.bytes.len() as u64);
    }

    #[test]
    fn test_manifest_is_first_entry() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        // "AAA.txt" sorts before "package.json"; the manifest must still win.
        fs::write(dir.path().join("AAA.txt"), b"x").unwrap();

        let archive = ArchiveBuilder::new(manifest, dir.path()).build().unwrap();
        assert_eq!(archive.entries[0].path, MANIFEST_FILE);
        assert_eq!(archive.entries[1].path, "AAA.txt");
    }

    #[test]
    fn test_entries_sorted_lexicographically() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        fs::create_dir(dir.path().join("Runtime")).unwrap();
        fs::write(dir.path().join("Runtime/z.txt"), b"z").unwrap();
        fs::write(dir.path().join("Runtime/a.txt"), b"a").unwrap();
        fs::write(dir.path().join("README.md"), b"readme").unwrap();

        let archive = ArchiveBuilder::new(manifest, dir.path()).build().unwrap();
        let paths: Vec<&str> = archive.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                MANIFEST_FILE,
                "README.md",
                "Runtime",
                "Runtime/a.txt",
                "Runtime/z.txt",
            ]
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        fs::create_dir(dir.path().join("Runtime")).unwrap();
        fs::write(dir.path().join("Runtime/core.txt"), b"content").unwrap();

        let builder =
            ArchiveBuilder::new(manifest, dir.path()).with_mtime(crate::archive::FIXED_MTIME);
        let first = builder.build().unwrap();
        let second = builder.build().unwrap();
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(first.digest, second.digest);
    }

    #[test]
    fn test_excludes_vcs_and_previous_archives() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), b"ref: x").unwrap();
        fs::write(dir.path().join("com.example.pkg-0.9.0.tgz"), b"old").unwrap();
        fs::write(dir.path().join(".porterrc"), b"token").unwrap();
        fs::write(dir.path().join("kept.txt"), b"keep me").unwrap();

        let archive = ArchiveBuilder::new(manifest, dir.path()).build().unwrap();
        let paths: Vec<&str> = archive.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec![MANIFEST_FILE, "kept.txt"]);
    }

    #[test]
    fn test_empty_directory_has_marker_entry() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        fs::create_dir(dir.path().join("Runtime")).unwrap();

        let archive = ArchiveBuilder::new(manifest, dir.path()).build().unwrap();
        assert!(archive
            .entries
            .iter()
            .any(|e| e.path == "Runtime" && matches!(e.kind, EntryKind::Directory)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_root_is_kept() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        fs::write(dir.path().join("real.txt"), b"real").unwrap();
        std::os::unix::fs::symlink("real.txt", dir.path().join("alias.txt")).unwrap();

        let archive = ArchiveBuilder::new(manifest, dir.path()).build().unwrap();
        let link = archive.entries.iter().find(|e| e.path == "alias.txt").unwrap();
        assert!(matches!(&link.kind, EntryKind::Symlink { target } if target == "real.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_rejected() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        std::os::unix::fs::symlink("../../etc/passwd", dir.path().join("evil")).unwrap();

        let err = ArchiveBuilder::new(manifest, dir.path()).build().unwrap_err();
        assert!(matches!(err, Error::UnsafePath(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_symlink_rejected() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        std::os::unix::fs::symlink("/etc/passwd", dir.path().join("abs")).unwrap();

        let err = ArchiveBuilder::new(manifest, dir.path()).build().unwrap_err();
        assert!(matches!(err, Error::UnsafePath(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_up_and_back_is_allowed() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("top.txt"), b"top").unwrap();
        std::os::unix::fs::symlink("../top.txt", dir.path().join("a/up.txt")).unwrap();

        assert!(ArchiveBuilder::new(manifest, dir.path()).build().is_ok());
    }

    #[test]
    fn test_write_to_creates_named_file() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        let out = TempDir::new().unwrap();

        let packed = ArchiveBuilder::new(manifest, dir.path())
            .write_to(out.path())
            .unwrap();
        assert_eq!(
            packed.path.file_name().unwrap().to_str().unwrap(),
            "com.example.pkg-1.0.0.tgz"
        );
        assert!(packed.path.is_file());
        assert_eq!(
            std::fs::metadata(&packed.path).unwrap().len(),
            packed.digest.size
        );
    }

    #[test]
    fn test_write_fails_when_dest_is_directory() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        let out = TempDir::new().unwrap();
        fs::create_dir(out.path().join("com.example.pkg-1.0.0.tgz")).unwrap();

        let err = ArchiveBuilder::new(manifest, dir.path())
            .write_to(out.path())
            .unwrap_err();
        assert!(matches!(err, Error::WriteFailed(_)));
    }

    #[test]
    fn test_archive_is_readable_by_standard_tar() {
        let (dir, manifest) = setup_package("com.example.pkg", "1.0.0");
        fs::create_dir(dir.path().join("Runtime")).unwrap();
        fs::write(dir.path().join("Runtime/core.txt"), b"content").unwrap();

        let archive = ArchiveBuilder::new(manifest, dir.path()).build().unwrap();

        let decoder = flate2::read::GzDecoder::new(archive.bytes.as_slice());
        let mut reader = tar::Archive::new(decoder);
        let paths: Vec<String> = reader
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(paths, vec!["package.json", "Runtime", "Runtime/core.txt"]);
    }
}
