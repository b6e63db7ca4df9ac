use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{Connection, Result, params};

use crate::row_factories::ReviewStateRowFactory;
use crate::scheduler::ReviewState;

pub struct ReviewStatesRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ReviewStatesRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        ReviewStatesRepository { conn }
    }

    pub fn get(&self, user_id: i64, item_id: i64) -> Result<Option<ReviewState>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, item_id, repetitions, interval, ease_factor,
                    next_review_at, last_reviewed_at
             FROM review_states WHERE user_id = ?1 AND item_id = ?2",
        )?;

        let mut rows = stmt.query(params![user_id, item_id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(ReviewStateRowFactory::from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Inserts or replaces the scheduling record for (user, item)
    pub fn upsert(&self, state: &ReviewState) -> Result<()> {
        debug!(
            "Upserting review state user={} item={}: reps={}, interval={} days, ease={:.2}",
            state.user_id, state.item_id, state.repetitions, state.interval, state.ease_factor
        );

        self.conn.execute(
            "INSERT INTO review_states
                 (user_id, item_id, repetitions, interval, ease_factor,
                  next_review_at, last_reviewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id, item_id) DO UPDATE SET
                 repetitions = excluded.repetitions,
                 interval = excluded.interval,
                 ease_factor = excluded.ease_factor,
                 next_review_at = excluded.next_review_at,
                 last_reviewed_at = excluded.last_reviewed_at",
            params![
                state.user_id,
                state.item_id,
                state.repetitions,
                state.interval,
                state.ease_factor,
                state.next_review_at.map(|d| d.to_rfc3339()),
                state.last_reviewed_at.map(|d| d.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn count_due(&self, user_id: i64, before_date: DateTime<Utc>) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM review_states
             WHERE user_id = ?1
               AND (next_review_at IS NULL OR next_review_at <= ?2)",
            params![user_id, before_date.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM review_states", [], |row| row.get(0))?;
        Ok(count)
    }
}
