use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{Connection, OptionalExtension, Result, params};

use crate::row_factories::datetime_from_column;

/// TTL key-value rows backing the ephemeral game-session store.
/// Expiry is enforced by the callers (see `session_store`); this repository
/// only reads and writes rows.
pub struct SessionsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SessionsRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        SessionsRepository { conn }
    }

    pub fn put(&self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (key, value, expires_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 expires_at = excluded.expires_at",
            params![key, value, expires_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Returns the raw value and expiry for a key, expired or not
    pub fn get(&self, key: &str) -> Result<Option<(String, DateTime<Utc>)>> {
        self.conn
            .query_row(
                "SELECT value, expires_at FROM sessions WHERE key = ?1",
                [key],
                |row| {
                    let value: String = row.get(0)?;
                    let expires_at = datetime_from_column(1, row.get(1)?)?;
                    Ok((value, expires_at))
                },
            )
            .optional()
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Maintenance sweep; lazy expiry in `get` covers the common path
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let purged = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            [now.to_rfc3339()],
        )?;
        if purged > 0 {
            debug!("Purged {purged} expired session(s)");
        }
        Ok(purged)
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count)
    }
}
