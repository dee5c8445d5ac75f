// src/commands/pack.rs
//! The `pack` command: validate, build, write, report

use anyhow::{Context, Result};
use porter::{ArchiveBuilder, ExcludePolicy, PackageManifest};
use std::path::Path;
use tracing::info;

pub fn cmd_pack(path: &str, out_dir: &str, excludes: &[String]) -> Result<()> {
    let root = Path::new(path);
    let manifest = PackageManifest::from_dir(root)
        .with_context(|| format!("failed to validate package at {path}"))?;

    info!("packing {} v{}", manifest.name, manifest.version);

    let mut policy = ExcludePolicy::default();
    for pattern in excludes {
        policy = policy.with_pattern(pattern)?;
    }

    let packed = ArchiveBuilder::new(manifest.clone(), root)
        .with_policy(policy)
        .write_to(Path::new(out_dir))?;

    println!("Packed {} v{}", manifest.name, manifest.version);
    println!("  Archive: {}", packed.path.display());
    println!("  Entries: {}", packed.entry_count);
    println!("  Size:    {} bytes", packed.digest.size);
    println!("  SHA-256: {}", packed.digest.sha256);

    Ok(())
}
