// src/cli.rs
//! CLI definitions for porter
//!
//! Command-line interface definitions using clap. The command
//! implementations live in the `commands` module; the core pipeline never
//! reads CLI state directly.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "porter")]
#[command(author = "Porter Project")]
#[command(version)]
#[command(about = "Pack and publish versioned package archives", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a deterministic {name}-{version}.tgz from a package directory
    Pack {
        /// Package directory containing package.json
        #[arg(default_value = ".")]
        path: String,

        /// Directory to write the archive into
        #[arg(short, long, default_value = ".")]
        out_dir: String,

        /// Additional glob patterns to exclude (repeatable)
        #[arg(long = "exclude", value_name = "PATTERN")]
        excludes: Vec<String>,
    },

    /// Upload a previously built archive to the registry
    Publish {
        /// Path to the .tgz produced by `porter pack`
        tarball: String,

        /// Registry base URL
        #[arg(long, env = "PORTER_REGISTRY")]
        registry: String,

        /// Registry auth token
        #[arg(long, env = "PORTER_TOKEN", hide_env_values = true)]
        token: String,

        /// Timeout per upload attempt, in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// Probe the registry healthz endpoint before uploading
        #[arg(long)]
        probe: bool,
    },
}
