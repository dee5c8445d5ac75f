// src/registry/mod.rs

//! Registry upload protocol
//!
//! Client-side half of the registry contract: a single authenticated
//! `PUT {base}/packages/{name}/{version}` carrying the archive bytes and its
//! digest, with conflict, auth, and transient-failure semantics handled by an
//! explicit retry state machine. The registry stores immutable versions, so a
//! version can never be republished; the digest header lets it deduplicate
//! identical re-uploads, which is what makes retrying safe.

mod client;
mod publisher;

pub use client::RegistryClient;
pub use publisher::{PublishOutcome, PublishRequest, Publisher, MAX_ATTEMPTS};

use std::time::Duration;

/// Default bound on one publish attempt (connect + upload + response)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Registry endpoint configuration, passed in explicitly at call time
///
/// The base URL and token are opaque strings supplied by the caller; the
/// core never parses or persists them.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

impl RegistryConfig {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            // Normalized once so URL construction never doubles slashes.
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
