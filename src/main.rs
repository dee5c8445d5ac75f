// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack {
            path,
            out_dir,
            excludes,
        } => commands::cmd_pack(&path, &out_dir, &excludes),
        Commands::Publish {
            tarball,
            registry,
            token,
            timeout_secs,
            probe,
        } => commands::cmd_publish(&tarball, &registry, &token, timeout_secs, probe),
    }
}
