// src/error.rs

//! Crate-wide error type for pack and publish operations
//!
//! Every failure path maps to a distinct variant so the CLI layer can
//! translate each one into a specific exit code and message.

use thiserror::Error;

/// Errors produced while validating, packing, or publishing a package
#[derive(Error, Debug)]
pub enum Error {
    /// No package.json found in the package directory
    #[error("Manifest not found: {0}")]
    ManifestNotFound(String),

    /// The manifest file exists but is not valid JSON
    #[error("Manifest is not valid JSON: {0}")]
    ManifestMalformed(String),

    /// The manifest parsed but a required field is missing or invalid
    #[error("Invalid manifest: {0}")]
    ManifestInvalid(String),

    /// An entry resolves outside the package root, or contains traversal
    #[error("Unsafe path in package: {0}")]
    UnsafePath(String),

    /// The output archive could not be written
    #[error("Failed to write archive: {0}")]
    WriteFailed(String),

    /// Filesystem I/O failure during traversal or read
    #[error("I/O error: {0}")]
    IoError(String),

    /// Failure constructing a client or policy before any work began
    #[error("Initialization error: {0}")]
    InitError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e.to_string())
    }
}
