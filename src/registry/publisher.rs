// src/registry/publisher.rs
//! Publish state machine with retry and backoff
//!
//! One upload runs as an explicit state machine:
//!
//! ```text
//! Attempting -> Success | Conflict | Unauthorized | Fatal
//!            -> RetryScheduled -> Attempting
//!            -> Exhausted (TransientFailure)
//! ```
//!
//! Only the transient class (5xx, network errors, timeouts) is retried, up
//! to a fixed budget with exponential backoff. Conflict, Unauthorized, and
//! Fatal end the machine immediately; only the terminal outcome is surfaced.

use crate::digest::ArchiveDigest;
use crate::error::{Error, Result};
use crate::manifest::PackageManifest;
use crate::registry::{RegistryClient, RegistryConfig};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Maximum upload attempts for transient failures
pub const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between attempts
const BACKOFF_BASE_MS: u64 = 500;

/// Everything one upload needs: manifest identity, archive bytes, digest.
/// Owned by the publisher for the duration of the upload (including
/// retries) and discarded afterward.
#[derive(Debug)]
pub struct PublishRequest {
    pub manifest: PackageManifest,
    pub archive: Vec<u8>,
    pub digest: ArchiveDigest,
}

impl PublishRequest {
    /// Build a request from a previously packed tarball
    ///
    /// Recovers the package identity from the manifest entry inside the
    /// archive and recomputes the digest over the exact bytes to be sent.
    pub fn from_tarball(path: &Path) -> Result<Self> {
        let manifest = PackageManifest::from_archive(path)?;
        let archive =
            std::fs::read(path).map_err(|e| Error::IoError(format!("{}: {e}", path.display())))?;
        let digest = ArchiveDigest::of_bytes(&archive);

        Ok(Self {
            manifest,
            archive,
            digest,
        })
    }
}

/// Terminal outcome of one publish invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Registry accepted a new version
    Created,
    /// Version already exists; registry versions are immutable
    Conflict,
    /// Token rejected; caller must refresh credentials
    Unauthorized,
    /// Retry budget exhausted against an unavailable registry
    TransientFailure { attempts: u32 },
    /// Non-retryable server rejection, message passed through verbatim
    Fatal { status: u16, message: String },
}

impl PublishOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, PublishOutcome::Created)
    }
}

impl std::fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishOutcome::Created => write!(f, "published"),
            PublishOutcome::Conflict => {
                write!(f, "version already exists in the registry (bump the version)")
            }
            PublishOutcome::Unauthorized => {
                write!(f, "registry rejected the credentials (re-authenticate)")
            }
            PublishOutcome::TransientFailure { attempts } => {
                write!(f, "registry unavailable after {attempts} attempts")
            }
            PublishOutcome::Fatal { status, message } => {
                write!(f, "registry rejected the publish (HTTP {status}): {message}")
            }
        }
    }
}

/// Non-terminal response classes, used to drive the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusClass {
    Created,
    Conflict,
    Unauthorized,
    Transient,
    Fatal,
}

/// Map an HTTP status to its protocol class
pub(crate) fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Created,
        409 => StatusClass::Conflict,
        401 | 403 => StatusClass::Unauthorized,
        500..=599 => StatusClass::Transient,
        _ => StatusClass::Fatal,
    }
}

/// Backoff delay before the retry following `attempt` (1-based)
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BACKOFF_BASE_MS << (attempt - 1))
}

/// States of the publish machine
enum PublishState {
    Attempting { attempt: u32 },
    RetryScheduled { attempt: u32, delay: Duration },
    Done(PublishOutcome),
}

/// Uploads archives to a registry with retry semantics
pub struct Publisher {
    client: RegistryClient,
    config: RegistryConfig,
    max_attempts: u32,
}

impl Publisher {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let client = RegistryClient::new(&config)?;
        Ok(Self {
            client,
            config,
            max_attempts: MAX_ATTEMPTS,
        })
    }

    /// Access the underlying client (for availability probes)
    pub fn client(&self) -> &RegistryClient {
        &self.client
    }

    /// Run the upload to its terminal outcome
    pub fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome> {
        let name = &request.manifest.name;
        let version = &request.manifest.version;
        info!(
            "publishing {} v{} ({} bytes, sha256 {})",
            name, version, request.digest.size, request.digest.sha256
        );

        let mut state = PublishState::Attempting { attempt: 1 };

        loop {
            state = match state {
                PublishState::Attempting { attempt } => {
                    self.run_attempt(request, attempt)
                }
                PublishState::RetryScheduled { attempt, delay } => {
                    warn!(
                        "publish attempt {} of {} failed, retrying in {:?}",
                        attempt, self.max_attempts, delay
                    );
                    std::thread::sleep(delay);
                    PublishState::Attempting {
                        attempt: attempt + 1,
                    }
                }
                PublishState::Done(outcome) => {
                    info!("publish of {} v{} finished: {}", name, version, outcome);
                    return Ok(outcome);
                }
            };
        }
    }

    /// One attempt: send the request and classify the response
    fn run_attempt(&self, request: &PublishRequest, attempt: u32) -> PublishState {
        let response = self.client.put_package(
            &request.manifest.name,
            &request.manifest.version,
            &request.digest,
            &self.config.token,
            request.archive.clone(),
        );

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                match classify_status(status) {
                    StatusClass::Created => PublishState::Done(PublishOutcome::Created),
                    StatusClass::Conflict => PublishState::Done(PublishOutcome::Conflict),
                    StatusClass::Unauthorized => PublishState::Done(PublishOutcome::Unauthorized),
                    StatusClass::Transient => {
                        warn!("registry returned HTTP {status} on attempt {attempt}");
                        self.schedule_retry(attempt)
                    }
                    StatusClass::Fatal => {
                        let message = response.text().unwrap_or_default();
                        PublishState::Done(PublishOutcome::Fatal { status, message })
                    }
                }
            }
            // Timeouts and connection failures are transient by definition.
            Err(e) => {
                warn!("publish attempt {attempt} failed: {e}");
                self.schedule_retry(attempt)
            }
        }
    }

    fn schedule_retry(&self, attempt: u32) -> PublishState {
        if attempt >= self.max_attempts {
            PublishState::Done(PublishOutcome::TransientFailure { attempts: attempt })
        } else {
            PublishState::RetryScheduled {
                attempt,
                delay: backoff_delay(attempt),
            }
        }
    }
}
