//! Per-request access decisions.
//!
//! Every retrieval request is classified exactly once by [`AccessGate::evaluate`],
//! which walks these checks in order and stops at the first rejection:
//!
//! | Step | Rejects with | Counts as failure |
//! |------|--------------|-------------------|
//! | method is `GET` | [`Error::MethodNotAllowed`] | no |
//! | global rate budget | [`Error::RateLimited`] | no |
//! | client under attempt limit | [`Error::Banned`] | no |
//! | token known | [`Error::LinkNotFound`] | yes |
//! | link active | [`Error::LinkExpired`] | yes |
//! | file present | [`Error::FileMissing`] (entry deleted) | yes |
//!
//! Any other filesystem error while checking the file is reported as
//! [`Error::Internal`] without counting against the client, since the fault
//! may not be theirs. Storage failures surface as [`Error::Storage`] and are
//! logged at `error` with the client and token.
//!
//! The store calls made here are individually atomic but not as a group:
//! two requests for the same client or token may interleave between them.

use std::io::ErrorKind;
use std::sync::Arc;

use axum::http::Method;

use crate::error::{Error, Result};
use crate::rate_limit::RateLimiter;
use crate::store::{AttemptTracker, LinkEntry, LinkStore, Lookup};

/// Decides whether a retrieval request is served.
#[derive(Debug, Clone)]
pub struct AccessGate {
    limiter: Arc<RateLimiter>,
    attempts: AttemptTracker,
    links: LinkStore,
    failed_attempt_limit: u32,
}

impl AccessGate {
    /// Assemble a gate from its collaborators.
    #[must_use]
    pub fn new(
        limiter: Arc<RateLimiter>,
        attempts: AttemptTracker,
        links: LinkStore,
        failed_attempt_limit: u32,
    ) -> Self {
        Self {
            limiter,
            attempts,
            links,
            failed_attempt_limit,
        }
    }

    /// The shared rate limiter.
    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Classify one request from `client` for request path `target`.
    ///
    /// On success returns the link whose file should be streamed.
    /// This performs blocking I/O; call it off the async executor.
    pub fn evaluate(&self, method: &Method, client: &str, target: &str) -> Result<LinkEntry> {
        if *method != Method::GET {
            tracing::debug!(client, %method, "Rejected non-GET request");
            return Err(Error::MethodNotAllowed(method.to_string()));
        }

        if !self.limiter.try_acquire() {
            tracing::warn!(client, "Rate limit exceeded");
            return Err(Error::RateLimited);
        }

        let token = token_from_target(target);
        let failures = self
            .attempts
            .get_count(client)
            .inspect_err(|e| log_storage_error(client, token, "read failed attempts", e))?;
        if failures >= self.failed_attempt_limit {
            tracing::warn!(client, failures, "Banned client attempted access");
            return Err(Error::Banned(client.to_string()));
        }

        let lookup = self
            .links
            .lookup(token)
            .inspect_err(|e| log_storage_error(client, token, "look up link", e))?;
        let entry = match lookup {
            Lookup::NotFound => {
                self.record_failure(client, token)?;
                tracing::warn!(client, token, "Unknown token");
                return Err(Error::LinkNotFound);
            }
            Lookup::Found { active: false, .. } => {
                self.record_failure(client, token)?;
                tracing::warn!(client, token, "Attempted access of expired link");
                return Err(Error::LinkExpired);
            }
            Lookup::Found { entry, active: true } => entry,
        };

        match std::fs::metadata(&entry.path) {
            Ok(meta) if meta.is_file() => {
                tracing::info!(client, token, path = %entry.path.display(), "Serving file");
                Ok(entry)
            }
            Ok(_) => {
                tracing::error!(
                    client,
                    token,
                    path = %entry.path.display(),
                    "Link target is not a regular file"
                );
                Err(Error::Internal(format!(
                    "link target is not a regular file: {}",
                    entry.path.display()
                )))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(self.remove_stale(client, &entry)),
            Err(e) => {
                tracing::error!(
                    client,
                    token,
                    path = %entry.path.display(),
                    error = %e,
                    "Error accessing file"
                );
                Err(Error::Internal(format!(
                    "failed to access {}: {e}",
                    entry.path.display()
                )))
            }
        }
    }

    /// Handle an active link whose file has disappeared.
    ///
    /// Counts a failure against `client` and deletes the link. Returns
    /// [`Error::FileMissing`], or the storage error if either write fails.
    pub fn remove_stale(&self, client: &str, entry: &LinkEntry) -> Error {
        let token = entry.token.as_str();
        if let Err(e) = self.record_failure(client, token) {
            return e;
        }
        if let Err(e) = self
            .links
            .delete(token)
            .inspect_err(|e| log_storage_error(client, token, "delete stale link", e))
        {
            return e;
        }

        tracing::warn!(
            client,
            token,
            path = %entry.path.display(),
            "File missing, removed stale link"
        );
        Error::FileMissing(entry.path.display().to_string())
    }

    fn record_failure(&self, client: &str, token: &str) -> Result<u32> {
        self.attempts
            .increment(client)
            .inspect_err(|e| log_storage_error(client, token, "record failed attempt", e))
    }
}

fn log_storage_error(client: &str, token: &str, action: &str, err: &Error) {
    tracing::error!(client, token, action, error = %err, "Storage failure");
}

/// The token is the final segment of the request path.
#[must_use]
pub fn token_from_target(target: &str) -> &str {
    target.rsplit('/').next().unwrap_or_default()
}
