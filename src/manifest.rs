// src/manifest.rs
//! Package manifest (package.json) parsing and validation
//!
//! The manifest identifies a package by a reverse-domain name and a semantic
//! version. Validation runs before any archival work begins and is a pure
//! read-and-check operation with no side effects.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

/// File name of the package descriptor inside a package directory
pub const MANIFEST_FILE: &str = "package.json";

/// Reverse-domain name pattern: lowercase alphanumeric segments separated by
/// dots, at least two segments. Segments may contain `-` and `_` after the
/// first character, so names like `com.example.my-pkg` are accepted while
/// anything with path separators or traversal is not.
fn name_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^[a-z0-9]+(\.[a-z0-9][a-z0-9_-]*)+$")
            .expect("name pattern is a valid regex")
    })
}

/// A validated package descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Absent fields deserialize as empty so that a missing name or version
    /// reports as an invalid manifest rather than a JSON shape error.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Opaque compatibility field (e.g. minimum target platform version).
    /// Carried through to the registry unvalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
}

impl PackageManifest {
    /// Load and validate the manifest from a package directory
    pub fn from_dir(root: &Path) -> Result<Self> {
        let manifest_path = root.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(Error::ManifestNotFound(format!(
                "no {} in {}",
                MANIFEST_FILE,
                root.display()
            )));
        }

        let content = std::fs::read_to_string(&manifest_path)
            .map_err(|e| Error::IoError(format!("{}: {e}", manifest_path.display())))?;
        Self::parse(&content)
    }

    /// Parse and validate a manifest from a JSON string
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: PackageManifest =
            serde_json::from_str(content).map_err(|e| Error::ManifestMalformed(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read the manifest back out of a built archive
    ///
    /// Used by `publish <tarball>` to recover the package identity without a
    /// side channel: the manifest is always the first entry of the archive,
    /// but any entry named `package.json` is accepted.
    pub fn from_archive(tarball: &Path) -> Result<Self> {
        let file = std::fs::File::open(tarball)
            .map_err(|e| Error::IoError(format!("{}: {e}", tarball.display())))?;
        let decoder = flate2::read::GzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);

        for entry in archive
            .entries()
            .map_err(|e| Error::IoError(format!("failed to read archive: {e}")))?
        {
            let mut entry =
                entry.map_err(|e| Error::IoError(format!("failed to read archive entry: {e}")))?;
            let is_manifest = entry
                .path()
                .map_err(|e| Error::IoError(format!("bad entry path in archive: {e}")))?
                .as_os_str()
                == MANIFEST_FILE;

            if is_manifest {
                let mut content = String::new();
                entry
                    .read_to_string(&mut content)
                    .map_err(|e| Error::IoError(format!("failed to read manifest entry: {e}")))?;
                return Self::parse(&content);
            }
        }

        Err(Error::ManifestNotFound(format!(
            "no {} entry in {}",
            MANIFEST_FILE,
            tarball.display()
        )))
    }

    /// Validate required fields and formats
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::ManifestInvalid("missing field: name".to_string()));
        }
        if self.version.is_empty() {
            return Err(Error::ManifestInvalid("missing field: version".to_string()));
        }

        // The name later becomes part of a filesystem path for the output
        // archive, so path-unsafe characters are rejected outright even
        // though the reverse-domain pattern would catch them anyway.
        if self.name.contains('/') || self.name.contains('\\') || self.name.contains("..") {
            return Err(Error::ManifestInvalid(format!(
                "name contains path-unsafe characters: {}",
                self.name
            )));
        }

        if !name_pattern().is_match(&self.name) {
            return Err(Error::ManifestInvalid(format!(
                "name is not a reverse-domain identifier (e.g. com.example.pkg): {}",
                self.name
            )));
        }

        semver::Version::parse(&self.version).map_err(|e| {
            Error::ManifestInvalid(format!("version '{}' is not valid semver: {e}", self.version))
        })?;

        Ok(())
    }

    /// Generate a minimal manifest for a new package
    pub fn new_minimal(name: &str, version: &str) -> Self {
        PackageManifest {
            name: name.to_string(),
            version: version.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            license: None,
            platform_version: None,
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::ManifestMalformed(e.to_string()))
    }

    /// Archive file name for this package: `{name}-{version}.tgz`
    pub fn archive_file_name(&self) -> String {
        format!("{}-{}.tgz", self.name, self.version)
    }
}
