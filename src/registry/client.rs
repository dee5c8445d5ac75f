// src/registry/client.rs

//! HTTP client for registry operations
//!
//! Thin wrapper around a blocking reqwest client. The caller-supplied
//! timeout bounds every attempt; retry policy lives in the publisher, not
//! here.

use crate::digest::ArchiveDigest;
use crate::error::{Error, Result};
use crate::registry::RegistryConfig;
use reqwest::blocking::{Client, Response};
use tracing::debug;

/// Header carrying the archive digest for server-side verification
pub const DIGEST_HEADER: &str = "X-Archive-Digest";

/// HTTP client bound to one registry
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    /// Create a client for the given registry configuration
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::InitError(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// URL of the versioned package endpoint
    pub fn package_url(&self, name: &str, version: &str) -> String {
        format!("{}/packages/{}/{}", self.base_url, name, version)
    }

    /// Issue one upload attempt; the response is classified by the publisher
    pub fn put_package(
        &self,
        name: &str,
        version: &str,
        digest: &ArchiveDigest,
        token: &str,
        body: Vec<u8>,
    ) -> reqwest::Result<Response> {
        let url = self.package_url(name, version);
        debug!("PUT {} ({} bytes)", url, body.len());

        self.client
            .put(&url)
            .bearer_auth(token)
            .header(DIGEST_HEADER, digest.to_prefixed_string())
            .header(reqwest::header::CONTENT_TYPE, "application/gzip")
            .body(body)
            .send()
    }

    /// Probe registry availability via `GET {base}/healthz`
    pub fn healthz(&self) -> Result<bool> {
        let url = format!("{}/healthz", self.base_url);
        debug!("GET {}", url);

        match self.client.get(&url).send() {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}
