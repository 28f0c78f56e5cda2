//! Token → (expiration, path) persistence.

use std::path::{Path, PathBuf};

use rusqlite::OptionalExtension;
use serde::Serialize;

use super::Database;
use crate::error::Result;

/// A persisted link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry {
    /// Capability token
    pub token: String,
    /// Absolute deadline, Unix seconds
    pub expiration: i64,
    /// File served for this token
    pub path: PathBuf,
}

impl LinkEntry {
    /// Whether the link is still active at `now` (Unix seconds).
    #[must_use]
    pub fn is_active_at(&self, now: i64) -> bool {
        self.expiration > now
    }

    /// Get the expiration as a human-readable string.
    #[must_use]
    pub fn formatted_expiration(&self) -> String {
        use chrono::{DateTime, Utc};
        DateTime::<Utc>::from_timestamp(self.expiration, 0).map_or_else(
            || "Unknown".to_string(),
            |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
    }
}

/// Result of looking a token up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// No entry for the token
    NotFound,
    /// Entry exists; `active` is false once its deadline has passed
    Found {
        /// The stored entry
        entry: LinkEntry,
        /// Whether `expiration > now` at lookup time
        active: bool,
    },
}

/// Which entries an administrative listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryFilter {
    /// Every entry
    #[default]
    All,
    /// Entries whose deadline has not passed
    Active,
    /// Entries whose deadline has passed
    Expired,
}

/// Durable link storage.
#[derive(Debug, Clone)]
pub struct LinkStore {
    db: Database,
}

impl LinkStore {
    pub(super) fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a link, or overwrite the expiration and path of an existing one.
    pub fn upsert(&self, token: &str, expiration: i64, path: &Path) -> Result<()> {
        let path = path.to_string_lossy().into_owned();
        self.db.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO entries (token, expiration, path) VALUES (?1, ?2, ?3)
                 ON CONFLICT(token) DO UPDATE SET
                     expiration = excluded.expiration,
                     path = excluded.path",
                rusqlite::params![token, expiration, path],
            )
        })?;
        Ok(())
    }

    /// Look a token up against the current time.
    pub fn lookup(&self, token: &str) -> Result<Lookup> {
        self.lookup_at(token, crate::unix_now())
    }

    /// Look a token up against an explicit clock value.
    ///
    /// Never mutates the store; expired entries are reported, not removed.
    pub fn lookup_at(&self, token: &str, now: i64) -> Result<Lookup> {
        let row = self.db.with_transaction(|tx| {
            tx.query_row(
                "SELECT expiration, path FROM entries WHERE token = ?1",
                rusqlite::params![token],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
        })?;

        Ok(match row {
            None => Lookup::NotFound,
            Some((expiration, path)) => {
                let entry = LinkEntry {
                    token: token.to_string(),
                    expiration,
                    path: PathBuf::from(path),
                };
                let active = entry.is_active_at(now);
                Lookup::Found { entry, active }
            }
        })
    }

    /// Remove a link. Returns whether a row was removed; absent tokens are not an error.
    pub fn delete(&self, token: &str) -> Result<bool> {
        let removed = self.db.with_transaction(|tx| {
            tx.execute(
                "DELETE FROM entries WHERE token = ?1",
                rusqlite::params![token],
            )
        })?;
        Ok(removed > 0)
    }

    /// List links matching `filter`, soonest expiration first.
    pub fn enumerate(&self, filter: EntryFilter) -> Result<Vec<LinkEntry>> {
        self.enumerate_at(filter, crate::unix_now())
    }

    /// List links matching `filter` against an explicit clock value.
    pub fn enumerate_at(&self, filter: EntryFilter, now: i64) -> Result<Vec<LinkEntry>> {
        let entries = self.db.with_transaction(|tx| {
            let mut stmt = tx.prepare(
                "SELECT token, expiration, path FROM entries
                 ORDER BY expiration ASC, token ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(LinkEntry {
                    token: row.get(0)?,
                    expiration: row.get(1)?,
                    path: PathBuf::from(row.get::<_, String>(2)?),
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;

        Ok(entries
            .into_iter()
            .filter(|entry| match filter {
                EntryFilter::All => true,
                EntryFilter::Active => entry.is_active_at(now),
                EntryFilter::Expired => !entry.is_active_at(now),
            })
            .collect())
    }
}
