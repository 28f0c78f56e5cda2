//! Persistent storage for links and failed-attempt counters.
//!
//! Both stores share one SQLite [`Database`] handle. The handle is opened
//! once and kept for the life of the process; every store operation takes
//! the connection lock, runs inside its own transaction, commits, and
//! releases the lock. Each operation is therefore atomic on its own, but
//! sequences of operations are not.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS entries (
//!     token TEXT PRIMARY KEY,
//!     expiration INTEGER NOT NULL,
//!     path TEXT NOT NULL
//! );
//! CREATE TABLE IF NOT EXISTS attempts (
//!     client_id TEXT PRIMARY KEY,
//!     failed_count INTEGER NOT NULL DEFAULT 0
//! );
//! ```

mod attempts;
mod links;

pub use attempts::{AttemptRecord, AttemptTracker};
pub use links::{EntryFilter, LinkEntry, LinkStore, Lookup};

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rusqlite::{Connection, Transaction};

use crate::error::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entries (
    token TEXT PRIMARY KEY,
    expiration INTEGER NOT NULL,
    path TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS attempts (
    client_id TEXT PRIMARY KEY,
    failed_count INTEGER NOT NULL DEFAULT 0
);
";

/// Shared SQLite handle backing [`LinkStore`] and [`AttemptTracker`].
///
/// Cloning is cheap; all clones use the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("conn", &"<sqlite>")
            .finish()
    }
}

impl Database {
    /// Open (or create) the database file at `path`.
    ///
    /// The parent directory is created if needed and the schema is applied.
    /// The journal runs in WAL mode so CLI invocations can read while the
    /// server writes.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            Error::Storage(format!(
                "failed to open database at {}: {e}",
                path.display()
            ))
        })?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })
        .map_err(|e| Error::Storage(format!("failed to set WAL mode: {e}")))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| Error::Storage(format!("failed to set busy timeout: {e}")))?;

        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::Storage(format!("failed to create schema: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Link store over this database.
    #[must_use]
    pub fn links(&self) -> LinkStore {
        LinkStore::new(self.clone())
    }

    /// Attempt tracker over this database.
    #[must_use]
    pub fn attempts(&self) -> AttemptTracker {
        AttemptTracker::new(self.clone())
    }

    /// Run `f` inside a single transaction, committing on success.
    ///
    /// The connection lock is held for the whole call.
    pub(crate) fn with_transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}
