//! Link issuance.
//!
//! [`LinkIssuer`] turns a local path into a stored link and a shareable URL:
//!
//! 1. Resolve the path (absolute, relative to the working directory, or a
//!    program name found on `$PATH`).
//! 2. Zip directories into the archive directory; the archive is what gets
//!    linked.
//! 3. Derive a token for the resolved path.
//! 4. Upsert `(token, now + expiration, path)` into the link store.
//! 5. Format the public URL from the configured host and port.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::archive::Archiver;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::LinkStore;
use crate::token::TokenCodec;

/// A freshly issued link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedLink {
    /// Capability token
    pub token: String,
    /// Public URL for the link
    pub url: String,
    /// File the link serves (the archive, for directories)
    pub path: PathBuf,
    /// Absolute deadline, Unix seconds
    pub expiration: i64,
    /// Whether `path` is an archive built from a directory
    pub archived: bool,
}

/// Creates links for local files and directories.
#[derive(Debug, Clone)]
pub struct LinkIssuer {
    codec: TokenCodec,
    links: LinkStore,
    archiver: Archiver,
    expiration: Duration,
    host: String,
    port: u16,
    template_includes_port: bool,
}

impl LinkIssuer {
    /// Create an issuer from configuration, writing into `links`.
    #[must_use]
    pub fn new(config: &Config, links: LinkStore) -> Self {
        Self {
            codec: TokenCodec::new(config.links.token_strategy, config.links.secret.as_deref()),
            links,
            archiver: Archiver::from_config(&config.archive, config.archive_dir()),
            expiration: config.links.expiration,
            host: config.server.host.clone(),
            port: config.server.port,
            template_includes_port: config.server.template_includes_port,
        }
    }

    /// Override the link lifetime for links issued by this issuer.
    #[must_use]
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Issue a link for `path` at the current time.
    pub fn issue(&self, path: impl AsRef<Path>) -> Result<IssuedLink> {
        self.issue_at(path.as_ref(), crate::unix_now())
    }

    /// Issue a link for `path` as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// [`Error::PathNotFound`] if the path cannot be resolved, archive errors
    /// for directories, [`Error::Entropy`] from token derivation, and
    /// [`Error::Storage`] if the upsert fails. Nothing is stored on error.
    pub fn issue_at(&self, path: &Path, now: i64) -> Result<IssuedLink> {
        let resolved = resolve_path(path)?;

        let (target, archived) = if resolved.is_dir() {
            (self.archiver.archive(&resolved)?, true)
        } else {
            (resolved, false)
        };

        let token = self.codec.derive(&target, now)?;
        let lifetime = i64::try_from(self.expiration.as_secs()).unwrap_or(i64::MAX);
        let expiration = now.saturating_add(lifetime);

        self.links.upsert(token.as_str(), expiration, &target)?;

        let url = format_url(&self.host, self.port, self.template_includes_port, token.as_str());
        tracing::info!(
            token = token.as_str(),
            path = %target.display(),
            expiration,
            "Issued link"
        );

        Ok(IssuedLink {
            token: token.to_string(),
            url,
            path: target,
            expiration,
            archived,
        })
    }
}

/// Resolve user input to an absolute path that exists.
///
/// Tried in order: the path as given (absolute, or relative to the working
/// directory), then a bare name looked up on `$PATH`.
pub fn resolve_path(input: &Path) -> Result<PathBuf> {
    if input.as_os_str().is_empty() {
        return Err(Error::PathNotFound(String::new()));
    }

    if let Ok(path) = std::fs::canonicalize(input) {
        return Ok(path);
    }

    let is_bare_name = input.components().count() == 1 && !input.is_absolute();
    if is_bare_name {
        if let Some(found) = search_path(input.as_os_str()) {
            return Ok(found);
        }
    }

    Err(Error::PathNotFound(input.display().to_string()))
}

fn search_path(name: &OsStr) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .and_then(|candidate| std::fs::canonicalize(candidate).ok())
}

/// Format the public URL for `token`.
///
/// `{host}:{port}/{token}` when `include_port` is set, otherwise
/// `{host}/{token}`. A trailing slash on `host` is not doubled.
#[must_use]
pub fn format_url(host: &str, port: u16, include_port: bool, token: &str) -> String {
    let host = host.trim_end_matches('/');
    if include_port {
        format!("{host}:{port}/{token}")
    } else {
        format!("{host}/{token}")
    }
}
