use chrono::{DateTime, Utc};
use rusqlite::{Connection, Result, params};

use crate::row_factories::datetime_from_column;

/// One row of the append-only grading log
#[derive(Debug, Clone, PartialEq)]
pub struct GradeEventRecord {
    pub id: i64,
    pub user_id: i64,
    pub item_id: i64,
    pub grade: String,
    pub direction: String,
    pub created_at: DateTime<Utc>,
}

pub struct GradeEventsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> GradeEventsRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        GradeEventsRepository { conn }
    }

    pub fn append(
        &self,
        user_id: i64,
        item_id: i64,
        grade: &str,
        direction: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO grade_events (user_id, item_id, grade, direction, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, item_id, grade, direction, created_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_for_item(&self, user_id: i64, item_id: i64) -> Result<Vec<GradeEventRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, item_id, grade, direction, created_at
             FROM grade_events
             WHERE user_id = ?1 AND item_id = ?2
             ORDER BY id ASC",
        )?;

        let events = stmt.query_map(params![user_id, item_id], |row| {
            Ok(GradeEventRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                item_id: row.get(2)?,
                grade: row.get(3)?,
                direction: row.get(4)?,
                created_at: datetime_from_column(5, row.get(5)?)?,
            })
        })?;

        events.collect()
    }

    pub fn count_for_user(&self, user_id: i64) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM grade_events WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
