// src/commands/publish.rs
//! The `publish` command: read a built tarball, upload, report the outcome

use anyhow::Result;
use porter::{PublishOutcome, PublishRequest, Publisher, RegistryConfig};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub fn cmd_publish(
    tarball: &str,
    registry: &str,
    token: &str,
    timeout_secs: u64,
    probe: bool,
) -> Result<()> {
    let config = RegistryConfig::new(registry, token)
        .with_timeout(Duration::from_secs(timeout_secs));
    let publisher = Publisher::new(config)?;

    if probe {
        if !publisher.client().healthz()? {
            anyhow::bail!("registry at {registry} did not answer the healthz probe");
        }
        info!("registry healthz probe succeeded");
    }

    let request = PublishRequest::from_tarball(Path::new(tarball))?;
    println!(
        "Publishing {} v{} ({} bytes, sha256 {})",
        request.manifest.name, request.manifest.version, request.digest.size, request.digest.sha256
    );

    let outcome = publisher.publish(&request)?;
    match outcome {
        PublishOutcome::Created => {
            println!(
                "Published {} v{} to {}",
                request.manifest.name, request.manifest.version, registry
            );
            Ok(())
        }
        other => anyhow::bail!("{other}"),
    }
}
