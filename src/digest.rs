// src/digest.rs

//! SHA-256 integrity computation for built archives
//!
//! The digest travels with the publish request so the registry can verify the
//! artifact was not corrupted in transit, and lets it deduplicate identical
//! re-uploads of the same version. Pure functions, no side effects.

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};
use std::path::Path;

/// Content digest plus total size of a finished archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDigest {
    /// SHA-256 of the archive bytes, lowercase hex
    pub sha256: String,
    /// Total archive size in bytes
    pub size: u64,
}

impl ArchiveDigest {
    /// Compute the digest of in-memory archive bytes
    pub fn of_bytes(data: &[u8]) -> Self {
        Self {
            sha256: sha256_bytes(data),
            size: data.len() as u64,
        }
    }

    /// Compute the digest of a file, streaming its content
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut file = std::fs::File::open(path)?;
        let (sha256, size) = sha256_reader(&mut file)?;
        Ok(Self { sha256, size })
    }

    /// Format as a prefixed string (e.g. "sha256:abc123...") for headers
    pub fn to_prefixed_string(&self) -> String {
        format!("sha256:{}", self.sha256)
    }
}

impl fmt::Display for ArchiveDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sha256)
    }
}

/// Compute the SHA-256 hex digest of a byte slice
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 hex digest and byte count of a reader
pub fn sha256_reader<R: Read>(reader: &mut R) -> io::Result<(String, u64)> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    let mut total: u64 = 0;

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        total += n as u64;
    }

    Ok((format!("{:x}", hasher.finalize()), total))
}

/// Verify a file on disk matches an expected digest
///
/// Comparison is case-insensitive on the expected side, since registries and
/// humans disagree about hex casing.
pub fn verify_file(path: &Path, expected: &str) -> io::Result<bool> {
    let actual = ArchiveDigest::of_file(path)?;
    Ok(actual.sha256 == expected.to_lowercase())
}
