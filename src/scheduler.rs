use chrono::{DateTime, Duration, Utc};

use crate::error::{PracticeError, Result};

pub const INITIAL_EASE_FACTOR: f32 = 2.5;
pub const MIN_EASE_FACTOR: f32 = 1.3;

/// A player's difficulty rating for a single review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Easy,
    Medium,
    Hard,
}

impl Grade {
    /// Parses the wire form of a grade, rejecting anything outside the
    /// three recognized kinds.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "easy" => Ok(Grade::Easy),
            "medium" => Ok(Grade::Medium),
            "hard" => Ok(Grade::Hard),
            other => Err(PracticeError::InvalidGrade(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Easy => "easy",
            Grade::Medium => "medium",
            Grade::Hard => "hard",
        }
    }

    /// SM-2 quality score for this grade
    pub fn quality(&self) -> i32 {
        match self {
            Grade::Easy => 5,
            Grade::Medium => 3,
            Grade::Hard => 1,
        }
    }
}

/// Per-(user, item) scheduling record.
///
/// Invariant after a grading event: `next_review_at` is
/// `last_reviewed_at + interval days`. A `None` `next_review_at` means
/// "due now".
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewState {
    pub id: Option<i64>,
    pub user_id: i64,
    pub item_id: i64,
    /// Consecutive non-hard grades
    pub repetitions: i32,
    /// Days until the next review
    pub interval: i32,
    pub ease_factor: f32,
    pub next_review_at: Option<DateTime<Utc>>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewState {
    /// State for an item the user has never been graded on
    pub fn fresh(user_id: i64, item_id: i64) -> Self {
        ReviewState {
            id: None,
            user_id,
            item_id,
            repetitions: 0,
            interval: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            next_review_at: None,
            last_reviewed_at: None,
        }
    }
}

/// Scheduling parameters produced by one grading event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulingUpdate {
    pub repetitions: i32,
    pub interval: i32,
    pub ease_factor: f32,
    pub next_review_at: DateTime<Utc>,
}

/// Simplified SM-2 review scheduler. Pure: no I/O, no clock of its own.
pub struct ReviewScheduler;

impl ReviewScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Computes the next scheduling state for one grading event.
    ///
    /// A "hard" grade resets the streak (`repetitions = 0`, `interval = 1`).
    /// Otherwise the interval follows 1 day, 6 days, then
    /// `round(previous_interval * ease_factor)` with a 1-day minimum. The
    /// growth step uses the ease factor as it stood *before* this grading;
    /// the ease update applies to later reviews.
    pub fn process_grade(
        &self,
        state: &ReviewState,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> SchedulingUpdate {
        let quality = grade.quality();

        let (repetitions, interval) = if quality < 3 {
            (0, 1)
        } else {
            let repetitions = state.repetitions + 1;
            let interval = match repetitions {
                1 => 1,
                2 => 6,
                _ => ((state.interval as f32 * state.ease_factor).round() as i32).max(1),
            };
            (repetitions, interval)
        };

        let shortfall = (5 - quality) as f32;
        let ease_factor = (state.ease_factor + (0.1 - shortfall * (0.08 + shortfall * 0.02)))
            .max(MIN_EASE_FACTOR);

        SchedulingUpdate {
            repetitions,
            interval,
            ease_factor,
            next_review_at: now + Duration::days(interval as i64),
        }
    }

    /// Applies a grading event in place, stamping `last_reviewed_at`.
    /// Callers are responsible for persisting the state and appending the
    /// grade event.
    pub fn apply_grade(&self, state: &mut ReviewState, grade: Grade, now: DateTime<Utc>) {
        let update = self.process_grade(state, grade, now);
        state.repetitions = update.repetitions;
        state.interval = update.interval;
        state.ease_factor = update.ease_factor;
        state.next_review_at = Some(update.next_review_at);
        state.last_reviewed_at = Some(now);
    }
}

impl Default for ReviewScheduler {
    fn default() -> Self {
        Self::new()
    }
}
