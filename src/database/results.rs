use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result, params};

use crate::row_factories::datetime_from_column;

/// Insert payload for a finished game
#[derive(Debug, Clone)]
pub struct NewGameResult<'a> {
    pub user_id: i64,
    pub kind: &'a str,
    pub score: i64,
    pub max_score: i64,
    pub time_spent_seconds: f64,
    pub reward: i64,
}

/// One row of the game-result statistics log
#[derive(Debug, Clone, PartialEq)]
pub struct GameResultRecord {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub score: i64,
    pub max_score: i64,
    pub time_spent_seconds: f64,
    pub reward: i64,
    pub created_at: DateTime<Utc>,
}

/// Reward ledger: per-user XP plus the immutable game-result log
pub struct ResultsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ResultsRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        ResultsRepository { conn }
    }

    pub fn add_xp(&self, user_id: i64, amount: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user_xp (user_id, xp) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET xp = xp + excluded.xp",
            params![user_id, amount],
        )?;
        Ok(())
    }

    pub fn get_xp(&self, user_id: i64) -> Result<i64> {
        let xp: Option<i64> = self
            .conn
            .query_row(
                "SELECT xp FROM user_xp WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(xp.unwrap_or(0))
    }

    pub fn record(&self, result: &NewGameResult, created_at: DateTime<Utc>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO game_results
                 (user_id, kind, score, max_score, time_spent_seconds, reward, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                result.user_id,
                result.kind,
                result.score,
                result.max_score,
                result.time_spent_seconds,
                result.reward,
                created_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_for_user(&self, user_id: i64) -> Result<Vec<GameResultRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, kind, score, max_score, time_spent_seconds, reward, created_at
             FROM game_results WHERE user_id = ?1 ORDER BY id ASC",
        )?;

        let results = stmt.query_map([user_id], |row| {
            Ok(GameResultRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                kind: row.get(2)?,
                score: row.get(3)?,
                max_score: row.get(4)?,
                time_spent_seconds: row.get(5)?,
                reward: row.get(6)?,
                created_at: datetime_from_column(7, row.get(7)?)?,
            })
        })?;

        results.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connection::init_connection;

    fn create_test_db() -> Connection {
        init_connection(":memory:").expect("Failed to create test database")
    }

    #[test]
    fn test_xp_defaults_to_zero() {
        let conn = create_test_db();
        let repo = ResultsRepository::new(&conn);
        assert_eq!(repo.get_xp(42).unwrap(), 0);
    }

    #[test]
    fn test_xp_accumulates() {
        let conn = create_test_db();
        let repo = ResultsRepository::new(&conn);

        repo.add_xp(1, 35).unwrap();
        repo.add_xp(1, 10).unwrap();
        repo.add_xp(2, 5).unwrap();

        assert_eq!(repo.get_xp(1).unwrap(), 45);
        assert_eq!(repo.get_xp(2).unwrap(), 5);
    }

    #[test]
    fn test_record_and_list_results() {
        let conn = create_test_db();
        let repo = ResultsRepository::new(&conn);
        let now = chrono::Utc::now();

        repo.record(
            &NewGameResult {
                user_id: 1,
                kind: "quiz",
                score: 4,
                max_score: 5,
                time_spent_seconds: 42.5,
                reward: 30,
            },
            now,
        )
        .unwrap();
        repo.record(
            &NewGameResult {
                user_id: 1,
                kind: "hangman",
                score: 1,
                max_score: 1,
                time_spent_seconds: 80.0,
                reward: 55,
            },
            now,
        )
        .unwrap();

        let results = repo.list_for_user(1).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].kind, "quiz");
        assert_eq!(results[0].score, 4);
        assert_eq!(results[1].kind, "hangman");
        assert_eq!(results[1].reward, 55);
        assert!(repo.list_for_user(9).unwrap().is_empty());
    }
}
