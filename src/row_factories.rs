use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use crate::catalog::{ItemKind, ReviewableItem};
use crate::scheduler::ReviewState;

/// Parses an RFC 3339 text column into a UTC timestamp
fn parse_datetime(column: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

/// Factory for creating ReviewableItem objects from database rows
pub struct ItemRowFactory;

impl ItemRowFactory {
    /// Expected columns: id, kind, prompt, answer, level, category,
    ///                   definition, example, tense
    pub fn from_row(row: &Row) -> rusqlite::Result<ReviewableItem> {
        let kind_str: String = row.get(1)?;
        let kind = ItemKind::from(&kind_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Text,
                format!("unknown item kind: {kind_str}").into(),
            )
        })?;

        Ok(ReviewableItem {
            id: row.get(0)?,
            kind,
            prompt: row.get(2)?,
            answer: row.get(3)?,
            level: row.get(4)?,
            category: row.get(5)?,
            definition: row.get(6)?,
            example: row.get(7)?,
            tense: row.get(8)?,
        })
    }
}

/// Factory for creating ReviewState objects from database rows
pub struct ReviewStateRowFactory;

impl ReviewStateRowFactory {
    /// Expected columns: id, user_id, item_id, repetitions, interval,
    ///                   ease_factor, next_review_at, last_reviewed_at
    pub fn from_row(row: &Row) -> rusqlite::Result<ReviewState> {
        Ok(ReviewState {
            id: Some(row.get(0)?),
            user_id: row.get(1)?,
            item_id: row.get(2)?,
            repetitions: row.get(3)?,
            interval: row.get(4)?,
            ease_factor: row.get(5)?,
            next_review_at: row
                .get::<_, Option<String>>(6)?
                .map(|s| parse_datetime(6, s))
                .transpose()?,
            last_reviewed_at: row
                .get::<_, Option<String>>(7)?
                .map(|s| parse_datetime(7, s))
                .transpose()?,
        })
    }
}

pub(crate) fn datetime_from_column(column: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    parse_datetime(column, value)
}
