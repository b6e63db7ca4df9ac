use chrono::{DateTime, Utc};
use rusqlite::{Connection, Result, params};

use crate::catalog::{ItemFilter, ItemKind, ReviewableItem};
use crate::row_factories::ItemRowFactory;

const ITEM_COLUMNS: &str =
    "i.id, i.kind, i.prompt, i.answer, i.level, i.category, i.definition, i.example, i.tense";

/// Insert payload for a catalog item. Fields are enumerated explicitly;
/// there is no by-name partial update path.
#[derive(Debug, Clone, Default)]
pub struct NewItem<'a> {
    pub kind: ItemKind,
    pub prompt: &'a str,
    pub answer: &'a str,
    pub level: Option<&'a str>,
    pub category: Option<&'a str>,
    pub definition: Option<&'a str>,
    pub example: Option<&'a str>,
    pub tense: Option<&'a str>,
}

pub struct ItemsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ItemsRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        ItemsRepository { conn }
    }

    pub fn insert(&self, item: &NewItem) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO items (kind, prompt, answer, level, category, definition, example, tense)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                item.kind.as_str(),
                item.prompt,
                item.answer,
                item.level,
                item.category,
                item.definition,
                item.example,
                item.tense
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get(&self, item_id: i64) -> Result<Option<ReviewableItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items i WHERE i.id = ?1"
        ))?;
        let mut rows = stmt.query([item_id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(ItemRowFactory::from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Items with a review state for this user that is due at `now`.
    /// Ordered most-overdue first; a NULL next_review_at sorts as "due now".
    pub fn get_due_for_user(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        kind: Option<ItemKind>,
        filter: &ItemFilter,
        limit: i64,
    ) -> Result<Vec<ReviewableItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS}
             FROM items i
             JOIN review_states r ON r.item_id = i.id AND r.user_id = ?1
             WHERE (r.next_review_at IS NULL OR r.next_review_at <= ?2)
               AND (?3 IS NULL OR i.kind = ?3)
               AND (?4 IS NULL OR i.level = ?4)
               AND (?5 IS NULL OR i.category = ?5)
               AND (?6 IS NULL OR i.tense = ?6)
             ORDER BY r.next_review_at ASC
             LIMIT ?7"
        ))?;

        let items = stmt.query_map(
            params![
                user_id,
                now.to_rfc3339(),
                kind.map(|k| k.as_str()),
                filter.level,
                filter.category,
                filter.tense,
                limit
            ],
            ItemRowFactory::from_row,
        )?;

        items.collect()
    }

    /// Items this user has never been graded on, easier levels first with a
    /// random tiebreak.
    pub fn get_new_for_user(
        &self,
        user_id: i64,
        kind: Option<ItemKind>,
        filter: &ItemFilter,
        limit: i64,
    ) -> Result<Vec<ReviewableItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS}
             FROM items i
             LEFT JOIN review_states r ON r.item_id = i.id AND r.user_id = ?1
             WHERE r.id IS NULL
               AND (?2 IS NULL OR i.kind = ?2)
               AND (?3 IS NULL OR i.level = ?3)
               AND (?4 IS NULL OR i.category = ?4)
               AND (?5 IS NULL OR i.tense = ?5)
             ORDER BY COALESCE(i.level, 'Z9') ASC, RANDOM()
             LIMIT ?6"
        ))?;

        let items = stmt.query_map(
            params![
                user_id,
                kind.map(|k| k.as_str()),
                filter.level,
                filter.category,
                filter.tense,
                limit
            ],
            ItemRowFactory::from_row,
        )?;

        items.collect()
    }

    /// Random catalog sample, for game setup and fallback pool fills
    pub fn get_random(
        &self,
        kind: Option<ItemKind>,
        filter: &ItemFilter,
        limit: i64,
    ) -> Result<Vec<ReviewableItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS}
             FROM items i
             WHERE (?1 IS NULL OR i.kind = ?1)
               AND (?2 IS NULL OR i.level = ?2)
               AND (?3 IS NULL OR i.category = ?3)
               AND (?4 IS NULL OR i.tense = ?4)
             ORDER BY RANDOM()
             LIMIT ?5"
        ))?;

        let items = stmt.query_map(
            params![
                kind.map(|k| k.as_str()),
                filter.level,
                filter.category,
                filter.tense,
                limit
            ],
            ItemRowFactory::from_row,
        )?;

        items.collect()
    }

    /// Distinct answers usable as quiz distractors, excluding one item
    pub fn get_answer_pool(
        &self,
        exclude_item_id: i64,
        kind: Option<ItemKind>,
        limit: i64,
    ) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT answer FROM items
             WHERE id != ?1 AND (?2 IS NULL OR kind = ?2)
             ORDER BY RANDOM()
             LIMIT ?3",
        )?;

        let answers = stmt.query_map(
            params![exclude_item_id, kind.map(|k| k.as_str()), limit],
            |row| row.get(0),
        )?;

        answers.collect()
    }

    pub fn count_new_for_user(&self, user_id: i64) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items i
             LEFT JOIN review_states r ON r.item_id = i.id AND r.user_id = ?1
             WHERE r.id IS NULL",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
