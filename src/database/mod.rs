pub mod connection;
pub mod grade_events;
pub mod items;
pub mod results;
pub mod review_states;
pub mod sessions;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Result};

use crate::catalog::{ItemFilter, ItemKind, ReviewableItem};
use crate::date_provider::{DateProvider, SystemDateProvider};
use crate::scheduler::ReviewState;

pub use grade_events::{GradeEventRecord, GradeEventsRepository};
pub use items::{ItemsRepository, NewItem};
pub use results::{GameResultRecord, NewGameResult, ResultsRepository};
pub use review_states::ReviewStatesRepository;
pub use sessions::SessionsRepository;

/// Main Database struct providing access to all repositories
pub struct Database {
    pub conn: Connection,
    date_provider: Arc<dyn DateProvider>,
}

impl Database {
    pub fn new(db_path: &str) -> Result<Self> {
        Self::init(db_path, Arc::new(SystemDateProvider))
    }

    pub fn with_date_provider(db_path: &str, date_provider: Arc<dyn DateProvider>) -> Result<Self> {
        Self::init(db_path, date_provider)
    }

    fn init(db_path: &str, date_provider: Arc<dyn DateProvider>) -> Result<Self> {
        let conn = connection::init_connection(db_path)?;
        Ok(Database {
            conn,
            date_provider,
        })
    }

    /// Current time as seen by this database's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.date_provider.get_current_time()
    }

    // ===== Items Repository Access =====

    pub fn insert_item(&self, item: &NewItem) -> Result<i64> {
        ItemsRepository::new(&self.conn).insert(item)
    }

    pub fn get_item(&self, item_id: i64) -> Result<Option<ReviewableItem>> {
        ItemsRepository::new(&self.conn).get(item_id)
    }

    pub fn count_items(&self) -> Result<i64> {
        ItemsRepository::new(&self.conn).count()
    }

    pub fn get_due_items(
        &self,
        user_id: i64,
        kind: Option<ItemKind>,
        filter: &ItemFilter,
        limit: i64,
    ) -> Result<Vec<ReviewableItem>> {
        ItemsRepository::new(&self.conn).get_due_for_user(user_id, self.now(), kind, filter, limit)
    }

    pub fn get_new_items(
        &self,
        user_id: i64,
        kind: Option<ItemKind>,
        filter: &ItemFilter,
        limit: i64,
    ) -> Result<Vec<ReviewableItem>> {
        ItemsRepository::new(&self.conn).get_new_for_user(user_id, kind, filter, limit)
    }

    pub fn get_random_items(
        &self,
        kind: Option<ItemKind>,
        filter: &ItemFilter,
        limit: i64,
    ) -> Result<Vec<ReviewableItem>> {
        ItemsRepository::new(&self.conn).get_random(kind, filter, limit)
    }

    pub fn get_answer_pool(
        &self,
        exclude_item_id: i64,
        kind: Option<ItemKind>,
        limit: i64,
    ) -> Result<Vec<String>> {
        ItemsRepository::new(&self.conn).get_answer_pool(exclude_item_id, kind, limit)
    }

    pub fn count_new_items(&self, user_id: i64) -> Result<i64> {
        ItemsRepository::new(&self.conn).count_new_for_user(user_id)
    }

    // ===== Review States Repository Access =====

    pub fn get_review_state(&self, user_id: i64, item_id: i64) -> Result<Option<ReviewState>> {
        ReviewStatesRepository::new(&self.conn).get(user_id, item_id)
    }

    pub fn upsert_review_state(&self, state: &ReviewState) -> Result<()> {
        ReviewStatesRepository::new(&self.conn).upsert(state)
    }

    pub fn count_due_states(&self, user_id: i64) -> Result<i64> {
        ReviewStatesRepository::new(&self.conn).count_due(user_id, self.now())
    }

    // ===== Grade Events Repository Access =====

    pub fn append_grade_event(
        &self,
        user_id: i64,
        item_id: i64,
        grade: &str,
        direction: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        GradeEventsRepository::new(&self.conn).append(user_id, item_id, grade, direction, created_at)
    }

    pub fn list_grade_events(&self, user_id: i64, item_id: i64) -> Result<Vec<GradeEventRecord>> {
        GradeEventsRepository::new(&self.conn).list_for_item(user_id, item_id)
    }

    pub fn count_grade_events(&self, user_id: i64) -> Result<i64> {
        GradeEventsRepository::new(&self.conn).count_for_user(user_id)
    }

    // ===== Reward Ledger Access =====

    pub fn add_xp(&self, user_id: i64, amount: i64) -> Result<()> {
        ResultsRepository::new(&self.conn).add_xp(user_id, amount)
    }

    pub fn get_xp(&self, user_id: i64) -> Result<i64> {
        ResultsRepository::new(&self.conn).get_xp(user_id)
    }

    pub fn record_game_result(&self, result: &NewGameResult) -> Result<i64> {
        ResultsRepository::new(&self.conn).record(result, self.now())
    }

    pub fn list_game_results(&self, user_id: i64) -> Result<Vec<GameResultRecord>> {
        ResultsRepository::new(&self.conn).list_for_user(user_id)
    }

    // ===== Sessions Repository Access =====

    pub fn purge_expired_sessions(&self) -> Result<usize> {
        SessionsRepository::new(&self.conn).purge_expired(self.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> Database {
        Database::new(":memory:").expect("Failed to create test database")
    }

    fn seed_word(db: &Database, prompt: &str, answer: &str) -> i64 {
        db.insert_item(&NewItem {
            prompt,
            answer,
            ..NewItem::default()
        })
        .unwrap()
    }

    #[test]
    fn test_database_creation() {
        let db = create_test_db();
        assert_eq!(db.count_items().unwrap(), 0);
        assert_eq!(db.count_grade_events(1).unwrap(), 0);
    }

    #[test]
    fn test_fixed_clock_flows_through_facade() {
        let fixed = chrono::NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            .and_utc();
        let db = Database::with_date_provider(
            ":memory:",
            Arc::new(crate::date_provider::FixedDateProvider::new(fixed)),
        )
        .unwrap();

        assert_eq!(db.now(), fixed);
    }

    #[test]
    fn test_due_and_new_counts() {
        let db = create_test_db();
        let id1 = seed_word(&db, "eins", "one");
        let _id2 = seed_word(&db, "zwei", "two");

        assert_eq!(db.count_new_items(1).unwrap(), 2);

        let mut state = ReviewState::fresh(1, id1);
        state.next_review_at = Some(db.now() - chrono::Duration::hours(2));
        db.upsert_review_state(&state).unwrap();

        assert_eq!(db.count_new_items(1).unwrap(), 1);
        assert_eq!(db.count_due_states(1).unwrap(), 1);
    }

    #[test]
    fn test_grade_event_log_round_trip() {
        let db = create_test_db();
        let item_id = seed_word(&db, "drei", "three");

        db.append_grade_event(1, item_id, "medium", "prompt_to_answer", db.now())
            .unwrap();

        let events = db.list_grade_events(1, item_id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].grade, "medium");
    }
}
