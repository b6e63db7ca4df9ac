use std::collections::HashSet;
use std::sync::Arc;

use log::info;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::catalog::{ItemFilter, ItemKind, ReviewableItem};
use crate::composer::Direction;
use crate::database::{Database, NewGameResult};
use crate::error::{PracticeError, Result};
use crate::games::common::{
    SessionEnvelope, load_session, new_session_token, save_session, session_key,
};
use crate::scheduler::Grade;
use crate::session_store::{SessionStore, default_session_ttl};
use crate::study_service::StudyService;

pub const GAME_KIND: &str = "matching";
pub const DEFAULT_REVIEW_RATIO: f64 = 0.8;
pub const MIN_PAIRS: usize = 2;
pub const MAX_PAIRS: usize = 12;

const REWARD_BASE: i64 = 10;
const REWARD_PER_PAIR: i64 = 5;
const MAX_TIME_BONUS: i64 = 30;
const TIME_BONUS_WINDOW_SECONDS: u32 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPair {
    item_id: i64,
    prompt: String,
    answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct MatchingPayload {
    pairs: Vec<StoredPair>,
    due_pairs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSide {
    Prompt,
    Answer,
}

/// One face-down card dealt to the player
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingCard {
    pub card_id: usize,
    pub pair_index: usize,
    pub side: CardSide,
    pub text: String,
}

#[derive(Debug)]
pub struct MatchingStart {
    pub session_id: String,
    pub cards: Vec<MatchingCard>,
    pub num_pairs: usize,
    /// Pairs actually drawn from the due-for-review pool
    pub due_pairs: usize,
}

#[derive(Debug, PartialEq)]
pub struct MatchingOutcome {
    pub completed: bool,
    /// Synthetic grade fed to the scheduler, when completed
    pub grade: Option<Grade>,
    pub pairs_graded: usize,
    pub reward: i64,
}

/// Pair-matching game; the one game that feeds results back into
/// spaced repetition
pub struct MatchingGame {
    db: Arc<Database>,
    store: Arc<dyn SessionStore>,
    study: StudyService,
}

impl MatchingGame {
    pub fn new(db: Arc<Database>) -> Self {
        let store: Arc<dyn SessionStore> = db.clone();
        Self {
            study: StudyService::new(db.clone()),
            db,
            store,
        }
    }

    /// Deals `2 × num_pairs` shuffled cards, drawing pairs from the
    /// due-for-review pool first (up to `review_ratio`, default 80%),
    /// then never-seen items, then random catalog fill.
    pub fn start(
        &self,
        user_id: i64,
        num_pairs: usize,
        review_ratio: Option<f64>,
    ) -> Result<MatchingStart> {
        if !(MIN_PAIRS..=MAX_PAIRS).contains(&num_pairs) {
            return Err(PracticeError::Validation(format!(
                "pair count must be between {MIN_PAIRS} and {MAX_PAIRS}"
            )));
        }
        let ratio = review_ratio.unwrap_or(DEFAULT_REVIEW_RATIO);
        if !(0.0..=1.0).contains(&ratio) {
            return Err(PracticeError::Validation(
                "review ratio must be between 0 and 1".to_string(),
            ));
        }

        let fetch = (num_pairs * 3) as i64;
        let due = self
            .db
            .get_due_items(user_id, Some(ItemKind::Word), &ItemFilter::none(), fetch)?;
        let new = self
            .db
            .get_new_items(user_id, Some(ItemKind::Word), &ItemFilter::none(), fetch)?;
        let fill = self
            .db
            .get_random_items(Some(ItemKind::Word), &ItemFilter::none(), fetch)?;

        let due_budget = (num_pairs as f64 * ratio).round() as usize;
        let (selected, due_pairs) = select_pairs(num_pairs, due_budget, due, new, fill);

        if selected.len() < num_pairs {
            return Err(PracticeError::InsufficientData(format!(
                "only {} usable pair(s) available, {} requested",
                selected.len(),
                num_pairs
            )));
        }

        let pairs: Vec<StoredPair> = selected
            .into_iter()
            .map(|item| StoredPair {
                item_id: item.id,
                prompt: item.prompt,
                answer: item.answer,
            })
            .collect();

        let mut cards = Vec::with_capacity(pairs.len() * 2);
        for (pair_index, pair) in pairs.iter().enumerate() {
            cards.push((pair_index, CardSide::Prompt, pair.prompt.clone()));
            cards.push((pair_index, CardSide::Answer, pair.answer.clone()));
        }
        cards.shuffle(&mut rand::thread_rng());
        let cards: Vec<MatchingCard> = cards
            .into_iter()
            .enumerate()
            .map(|(card_id, (pair_index, side, text))| MatchingCard {
                card_id,
                pair_index,
                side,
                text,
            })
            .collect();

        let token = new_session_token();
        let key = session_key(GAME_KIND, &token);
        let envelope = SessionEnvelope::new(
            user_id,
            self.db.now(),
            MatchingPayload {
                pairs,
                due_pairs,
            },
        );
        save_session(self.store.as_ref(), &key, &envelope, default_session_ttl())?;

        info!(
            "Started matching for user {} with {} pair(s), {} due",
            user_id, num_pairs, due_pairs
        );

        Ok(MatchingStart {
            session_id: token,
            cards,
            num_pairs,
            due_pairs,
        })
    }

    /// Closes a matching session.
    ///
    /// On completion every paired item is graded exactly once through the
    /// scheduler with a difficulty inferred from moves and elapsed time.
    /// An uncompleted submit just discards the session.
    pub fn submit(
        &self,
        user_id: i64,
        session_id: &str,
        completed: bool,
        moves: u32,
        time_spent_seconds: u32,
    ) -> Result<MatchingOutcome> {
        let key = session_key(GAME_KIND, session_id);
        let envelope: SessionEnvelope<MatchingPayload> =
            load_session(self.store.as_ref(), &key, user_id)?;
        let num_pairs = envelope.payload.pairs.len();

        if completed && (moves as usize) < num_pairs {
            return Err(PracticeError::Validation(format!(
                "completing {num_pairs} pair(s) takes at least {num_pairs} moves, got {moves}"
            )));
        }

        if !completed {
            self.store.delete(&key)?;
            return Ok(MatchingOutcome {
                completed: false,
                grade: None,
                pairs_graded: 0,
                reward: 0,
            });
        }

        let grade = infer_grade(num_pairs, moves, time_spent_seconds);
        for pair in &envelope.payload.pairs {
            self.study
                .grade_review(user_id, pair.item_id, grade, Direction::PromptToAnswer)?;
        }

        let reward =
            REWARD_BASE + REWARD_PER_PAIR * num_pairs as i64 + time_bonus(time_spent_seconds);
        self.db.record_game_result(&NewGameResult {
            user_id,
            kind: GAME_KIND,
            score: num_pairs as i64,
            max_score: num_pairs as i64,
            time_spent_seconds: time_spent_seconds as f64,
            reward,
        })?;
        self.db.add_xp(user_id, reward)?;
        self.store.delete(&key)?;

        info!(
            "Matching completed by user {} in {} move(s), graded {} item(s) as {}",
            user_id,
            moves,
            num_pairs,
            grade.as_str()
        );

        Ok(MatchingOutcome {
            completed: true,
            grade: Some(grade),
            pairs_graded: num_pairs,
            reward,
        })
    }
}

/// Difficulty inferred from play efficiency: minimal moves inside a minute
/// is easy, more than twice the pair count is hard
fn infer_grade(num_pairs: usize, moves: u32, time_spent_seconds: u32) -> Grade {
    if moves as usize <= num_pairs && time_spent_seconds <= TIME_BONUS_WINDOW_SECONDS {
        Grade::Easy
    } else if moves as usize > 2 * num_pairs {
        Grade::Hard
    } else {
        Grade::Medium
    }
}

/// Time bonus decreasing linearly to zero across the first minute
fn time_bonus(time_spent_seconds: u32) -> i64 {
    if time_spent_seconds >= TIME_BONUS_WINDOW_SECONDS {
        return 0;
    }
    let remaining = (TIME_BONUS_WINDOW_SECONDS - time_spent_seconds) as i64;
    MAX_TIME_BONUS * remaining / TIME_BONUS_WINDOW_SECONDS as i64
}

/// Picks `num_pairs` usable pairs: due items first (up to `due_budget`),
/// then new items, then fallback fill. A pair is rejected when its prompt
/// equals its answer case-insensitively, or when it would duplicate an
/// already-selected prompt or answer. Returns the pairs and how many came
/// from the due pool.
fn select_pairs(
    num_pairs: usize,
    due_budget: usize,
    due: Vec<ReviewableItem>,
    new: Vec<ReviewableItem>,
    fill: Vec<ReviewableItem>,
) -> (Vec<ReviewableItem>, usize) {
    let mut seen_ids: HashSet<i64> = HashSet::new();
    let mut seen_prompts: HashSet<String> = HashSet::new();
    let mut seen_answers: HashSet<String> = HashSet::new();
    let mut selected: Vec<ReviewableItem> = Vec::new();
    let mut due_pairs = 0;

    let mut try_select =
        |item: ReviewableItem,
         selected: &mut Vec<ReviewableItem>,
         seen_ids: &mut HashSet<i64>,
         seen_prompts: &mut HashSet<String>,
         seen_answers: &mut HashSet<String>| {
            let prompt = item.prompt.to_lowercase();
            let answer = item.answer.to_lowercase();
            if prompt == answer
                || seen_ids.contains(&item.id)
                || seen_prompts.contains(&prompt)
                || seen_answers.contains(&answer)
            {
                return false;
            }
            seen_ids.insert(item.id);
            seen_prompts.insert(prompt);
            seen_answers.insert(answer);
            selected.push(item);
            true
        };

    for item in due {
        if due_pairs >= due_budget || selected.len() >= num_pairs {
            break;
        }
        if try_select(
            item,
            &mut selected,
            &mut seen_ids,
            &mut seen_prompts,
            &mut seen_answers,
        ) {
            due_pairs += 1;
        }
    }
    for item in new {
        if selected.len() >= num_pairs {
            break;
        }
        try_select(
            item,
            &mut selected,
            &mut seen_ids,
            &mut seen_prompts,
            &mut seen_answers,
        );
    }
    for item in fill {
        if selected.len() >= num_pairs {
            break;
        }
        try_select(
            item,
            &mut selected,
            &mut seen_ids,
            &mut seen_prompts,
            &mut seen_answers,
        );
    }

    (selected, due_pairs)
}
