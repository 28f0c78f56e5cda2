//! # Keylink Core Library
//!
//! `keylink-core` provides the core functionality for Keylink, a small server
//! that hands out time-limited, unguessable download links for local files.
//!
//! ## Features
//!
//! - **Capability tokens**: 64-character hex tokens that never reveal the path
//! - **Persistent links**: SQLite-backed link store with lazy expiry and self-healing
//! - **Abuse protection**: global rate limiting plus per-client lockout
//! - **Directory links**: directories are zipped under a depth and size bound
//!
//! ## Modules
//!
//! - [`archive`] - Bounded directory archiving
//! - [`config`] - Configuration management
//! - [`crypto`] - Hashing primitives used by token derivation
//! - [`gate`] - Per-request access decision state machine
//! - [`issue`] - Link issuance
//! - [`rate_limit`] - Global request admission
//! - [`store`] - Link and attempt persistence
//! - [`token`] - Token derivation strategies
//! - [`web`] - HTTP retrieval endpoint
//!
//! ## Example
//!
//! ```rust,ignore
//! use keylink_core::{config::Config, issue::LinkIssuer, store::Database};
//!
//! let config = Config::load()?;
//! let db = Database::open(&config.database_path())?;
//! let issuer = LinkIssuer::new(&config, db.links());
//! let link = issuer.issue("./report.pdf")?;
//! println!("{}", link.url);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]

pub mod archive;
pub mod config;
pub mod crypto;
pub mod error;
pub mod gate;
pub mod issue;
pub mod rate_limit;
pub mod store;
pub mod token;
pub mod web;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default port for the retrieval endpoint
pub const DEFAULT_PORT: u16 = 8080;

/// Default link lifetime in seconds (24 hours)
pub const DEFAULT_EXPIRATION_SECS: u64 = 86_400;

/// Default number of failed attempts before a client is locked out
pub const DEFAULT_FAILED_ATTEMPT_LIMIT: u32 = 5;

/// Default number of requests admitted per rate window
pub const DEFAULT_RATE_LIMIT: u32 = 30;

/// Default rate window length in seconds
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 60;

/// Default maximum directory depth included in an archive
pub const DEFAULT_ARCHIVE_MAX_DEPTH: usize = 2;

/// Default maximum uncompressed archive size (1 GiB)
pub const DEFAULT_ARCHIVE_MAX_SIZE: u64 = 1024 * 1024 * 1024;

/// Current time as whole seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    i64::try_from(secs).unwrap_or(i64::MAX)
}
