use std::sync::Arc;

use log::info;

use crate::catalog::{ItemFilter, ItemKind};
use crate::composer::{StudyCard, StudyMode, compose_session};
use crate::database::Database;
use crate::error::{PracticeError, Result};
use crate::scheduler::{Grade, ReviewScheduler, ReviewState};

pub use crate::composer::Direction;

/// Due/new queue sizes for a user's dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudyCounts {
    pub due: i64,
    pub unseen: i64,
}

/// Service layer wiring the scheduler and composer to persistence,
/// decoupled from any HTTP surface
pub struct StudyService {
    db: Arc<Database>,
    scheduler: ReviewScheduler,
}

impl StudyService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            scheduler: ReviewScheduler::new(),
        }
    }

    /// Processes one grading event for (user, item).
    ///
    /// Loads the existing scheduling state (or fresh defaults on first
    /// grading), applies the scheduler, persists the returned state and
    /// appends the grade event. Fails with `NotFound` for an unknown item;
    /// nothing is written in that case.
    pub fn grade_review(
        &self,
        user_id: i64,
        item_id: i64,
        grade: Grade,
        direction: Direction,
    ) -> Result<ReviewState> {
        let item = self
            .db
            .get_item(item_id)?
            .ok_or(PracticeError::NotFound)?;
        let now = self.db.now();

        let mut state = self
            .db
            .get_review_state(user_id, item_id)?
            .unwrap_or_else(|| ReviewState::fresh(user_id, item_id));

        self.scheduler.apply_grade(&mut state, grade, now);

        self.db.upsert_review_state(&state)?;
        self.db
            .append_grade_event(user_id, item_id, grade.as_str(), direction.as_str(), now)?;

        info!(
            "Graded '{}' as {} for user {}: reps={}, interval={} days, ease={:.2}",
            item.answer,
            grade.as_str(),
            user_id,
            state.repetitions,
            state.interval,
            state.ease_factor
        );

        Ok(state)
    }

    /// Parses a wire-form grade and applies it; rejects unknown values
    /// before touching any state
    pub fn grade_review_str(
        &self,
        user_id: i64,
        item_id: i64,
        grade: &str,
        direction: Direction,
    ) -> Result<ReviewState> {
        let grade = Grade::parse(grade)?;
        self.grade_review(user_id, item_id, grade, direction)
    }

    /// Builds one study session for the user.
    ///
    /// Fetches the due and new pools the composer needs (skipping the pool
    /// a single-source mode ignores) and returns the composed card list.
    /// An empty result means "nothing to study", not an error.
    pub fn start_study_session(
        &self,
        user_id: i64,
        session_size: usize,
        mode: StudyMode,
        kind: Option<ItemKind>,
        filter: &ItemFilter,
    ) -> Result<Vec<StudyCard>> {
        if session_size == 0 {
            return Err(PracticeError::Validation(
                "session size must be positive".to_string(),
            ));
        }

        let limit = session_size as i64;
        let due = match mode {
            StudyMode::New => Vec::new(),
            _ => self.db.get_due_items(user_id, kind, filter, limit)?,
        };
        let new = match mode {
            StudyMode::Review => Vec::new(),
            _ => self.db.get_new_items(user_id, kind, filter, limit)?,
        };

        let cards = compose_session(session_size, mode, due, new);
        info!(
            "Composed {} study session of {} card(s) for user {}",
            mode.as_str(),
            cards.len(),
            user_id
        );

        Ok(cards)
    }

    /// Queue sizes shown before the user picks a session mode
    pub fn study_counts(&self, user_id: i64) -> Result<StudyCounts> {
        Ok(StudyCounts {
            due: self.db.count_due_states(user_id)?,
            unseen: self.db.count_new_items(user_id)?,
        })
    }
}
