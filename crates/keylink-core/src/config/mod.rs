//! Configuration management for Keylink.
//!
//! This module handles loading and validating Keylink configuration. The
//! configuration is read once at startup and then shared read-only by every
//! component.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/keylink/config.toml` |
//! | macOS | `~/Library/Application Support/Keylink/config.toml` |
//! | Windows | `%APPDATA%\Keylink\config.toml` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use keylink_core::config::Config;
//!
//! let config = Config::load()?;
//! println!("Serving on port {}", config.server.port);
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::token::TokenStrategy;

/// Main configuration struct for Keylink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP endpoint settings
    pub server: ServerConfig,
    /// Link issuance settings
    pub links: LinksConfig,
    /// Abuse protection settings
    pub security: SecurityConfig,
    /// Directory archiving settings
    pub archive: ArchiveConfig,
    /// Persistence settings
    pub storage: StorageConfig,
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port the retrieval endpoint listens on
    pub port: u16,
    /// Address to bind
    pub bind_address: IpAddr,
    /// Public host used when formatting links (e.g. `https://files.example.com`)
    pub host: String,
    /// Whether formatted links include `:port` after the host
    pub template_includes_port: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            host: String::new(),
            template_includes_port: true,
        }
    }
}

/// Link issuance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// How long a newly issued link stays active
    #[serde(with = "humantime_serde")]
    pub expiration: Duration,
    /// Token derivation strategy
    pub token_strategy: TokenStrategy,
    /// Shared secret mixed into deterministic tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            expiration: Duration::from_secs(crate::DEFAULT_EXPIRATION_SECS),
            token_strategy: TokenStrategy::default(),
            secret: None,
        }
    }
}

/// Abuse protection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Failed attempts before a client is locked out
    pub failed_attempt_limit: u32,
    /// Requests admitted server-wide per window
    pub rate_limit: u32,
    /// Length of the rate window
    #[serde(with = "humantime_serde")]
    pub rate_window: Duration,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            failed_attempt_limit: crate::DEFAULT_FAILED_ATTEMPT_LIMIT,
            rate_limit: crate::DEFAULT_RATE_LIMIT,
            rate_window: Duration::from_secs(crate::DEFAULT_RATE_WINDOW_SECS),
        }
    }
}

/// Directory archiving configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Deepest directory level included in an archive
    pub max_depth: usize,
    /// Largest uncompressed size accepted, in bytes
    pub max_size: u64,
    /// Where archives are kept (defaults to the data directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_depth: crate::DEFAULT_ARCHIVE_MAX_DEPTH,
            max_size: crate::DEFAULT_ARCHIVE_MAX_SIZE,
            directory: None,
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file (defaults to the data directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file.
    ///
    /// A missing file yields the default configuration; a present but
    /// unreadable or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Check that the configuration can drive a server.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "must be between 1 and 65535"));
        }
        if self.links.expiration.is_zero() {
            return Err(invalid("links.expiration", "must be greater than zero"));
        }
        if self.security.rate_window.is_zero() {
            return Err(invalid("security.rate_window", "must be greater than zero"));
        }
        if self.links.token_strategy == TokenStrategy::Deterministic
            && self.links.secret.as_deref().is_none_or(str::is_empty)
        {
            return Err(invalid(
                "links.secret",
                "deterministic tokens require a non-empty secret",
            ));
        }
        Ok(())
    }

    /// Socket address the retrieval endpoint binds to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.bind_address, self.server.port)
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn data_dir() -> PathBuf {
        project_dirs().map_or_else(|| PathBuf::from("."), |dirs| dirs.data_dir().to_path_buf())
    }

    /// SQLite database location, explicit or under the data directory.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("keylink.db"))
    }

    /// Archive directory, explicit or under the data directory.
    #[must_use]
    pub fn archive_dir(&self) -> PathBuf {
        self.archive
            .directory
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("archives"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "keylink", "Keylink")
}

fn invalid(key: &str, reason: &str) -> Error {
    Error::InvalidConfig {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a duration string like `"30s"`, `"5m"`, `"24h"`, or `"7d"`.
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (digits, unit) = match s.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => (&s[..i], c),
        _ => (s, 's'),
    };
    let value: u64 = digits.trim().parse().ok()?;
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return None,
    };
    value.checked_mul(multiplier).map(Duration::from_secs)
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration format: {s}")))
    }
}
