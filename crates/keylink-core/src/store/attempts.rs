//! Per-client failed-attempt counters.

use rusqlite::OptionalExtension;
use serde::Serialize;

use super::Database;
use crate::error::Result;

/// Failed-attempt count for one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// Client network address
    pub client_id: String,
    /// Failures since the last reset
    pub failed_count: u32,
}

/// Durable failed-attempt tracking. An absent record means zero failures.
#[derive(Debug, Clone)]
pub struct AttemptTracker {
    db: Database,
}

impl AttemptTracker {
    pub(super) fn new(db: Database) -> Self {
        Self { db }
    }

    /// Current failure count for `client_id`; 0 for unseen clients.
    pub fn get_count(&self, client_id: &str) -> Result<u32> {
        let count = self.db.with_transaction(|tx| {
            tx.query_row(
                "SELECT failed_count FROM attempts WHERE client_id = ?1",
                rusqlite::params![client_id],
                |row| row.get::<_, u32>(0),
            )
            .optional()
        })?;
        Ok(count.unwrap_or(0))
    }

    /// Record one more failure and return the new count.
    pub fn increment(&self, client_id: &str) -> Result<u32> {
        let count = self.db.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO attempts (client_id, failed_count) VALUES (?1, 1)
                 ON CONFLICT(client_id) DO UPDATE SET failed_count = failed_count + 1",
                rusqlite::params![client_id],
            )?;
            tx.query_row(
                "SELECT failed_count FROM attempts WHERE client_id = ?1",
                rusqlite::params![client_id],
                |row| row.get::<_, u32>(0),
            )
        })?;
        Ok(count)
    }

    /// Forget all failures for `client_id`. Returns whether a record existed.
    pub fn reset(&self, client_id: &str) -> Result<bool> {
        let removed = self.db.with_transaction(|tx| {
            tx.execute(
                "DELETE FROM attempts WHERE client_id = ?1",
                rusqlite::params![client_id],
            )
        })?;
        Ok(removed > 0)
    }

    /// All recorded clients, ordered by address.
    pub fn list(&self) -> Result<Vec<AttemptRecord>> {
        let records = self.db.with_transaction(|tx| {
            let mut stmt = tx.prepare(
                "SELECT client_id, failed_count FROM attempts ORDER BY client_id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(AttemptRecord {
                    client_id: row.get(0)?,
                    failed_count: row.get(1)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(records)
    }
}
