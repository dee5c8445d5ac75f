// src/lib.rs

//! Porter
//!
//! Client-side archive producer and registry publisher. Packs a directory of
//! source assets into a versioned, content-addressed `.tgz` and uploads it to
//! a remote package registry.
//!
//! # Pipeline
//!
//! Manifest Validator → Archive Builder → Integrity Computer → Registry
//! Publisher. Each stage is a pure transformation of the previous stage's
//! output:
//!
//! - `manifest` validates `package.json` before any archival work begins
//! - `archive` builds deterministic, byte-reproducible tar+gzip archives
//! - `digest` computes the SHA-256 content digest of the finished artifact
//! - `registry` performs the authenticated upload with conflict and
//!   transient-failure handling

pub mod archive;
pub mod digest;
mod error;
pub mod manifest;
pub mod registry;

pub use archive::{Archive, ArchiveBuilder, ArchiveEntry, EntryKind, ExcludePolicy, PackedArchive};
pub use digest::ArchiveDigest;
pub use error::{Error, Result};
pub use manifest::{PackageManifest, MANIFEST_FILE};
pub use registry::{
    PublishOutcome, PublishRequest, Publisher, RegistryClient, RegistryConfig,
};
