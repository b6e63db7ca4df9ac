use std::collections::HashSet;
use std::sync::Arc;

use log::info;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::catalog::{ItemFilter, ItemKind};
use crate::database::{Database, NewGameResult};
use crate::error::{PracticeError, Result};
use crate::games::common::{
    SessionEnvelope, load_session, new_session_token, round_reward, save_session, session_key,
};
use crate::session_store::{SessionStore, default_session_ttl};

pub const GAME_KIND: &str = "quiz";
pub const MAX_DISTRACTORS: usize = 3;
pub const MAX_QUESTIONS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredQuestion {
    item_id: i64,
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct QuizPayload {
    questions: Vec<StoredQuestion>,
}

/// Question as shown to the player; the correct index stays server-side
#[derive(Debug, Clone, PartialEq)]
pub struct QuizQuestion {
    pub item_id: i64,
    pub prompt: String,
    pub options: Vec<String>,
}

#[derive(Debug)]
pub struct QuizStart {
    pub session_id: String,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, PartialEq)]
pub struct QuizOutcome {
    pub correct: usize,
    pub total: usize,
    pub reward: i64,
    pub per_question: Vec<bool>,
}

/// Multiple-choice quiz over catalog words
pub struct QuizGame {
    db: Arc<Database>,
    store: Arc<dyn SessionStore>,
}

impl QuizGame {
    pub fn new(db: Arc<Database>) -> Self {
        let store: Arc<dyn SessionStore> = db.clone();
        Self { db, store }
    }

    pub fn with_store(db: Arc<Database>, store: Arc<dyn SessionStore>) -> Self {
        Self { db, store }
    }

    /// Creates a quiz session of up to `num_questions` questions
    pub fn start(
        &self,
        user_id: i64,
        num_questions: usize,
        filter: &ItemFilter,
    ) -> Result<QuizStart> {
        if num_questions == 0 || num_questions > MAX_QUESTIONS {
            return Err(PracticeError::Validation(format!(
                "question count must be between 1 and {MAX_QUESTIONS}"
            )));
        }

        let items =
            self.db
                .get_random_items(Some(ItemKind::Word), filter, num_questions as i64)?;
        if items.is_empty() {
            return Err(PracticeError::InsufficientData(
                "no quiz candidates in the catalog".to_string(),
            ));
        }

        let mut rng = rand::thread_rng();
        let mut questions = Vec::with_capacity(items.len());
        for item in &items {
            let pool = self.db.get_answer_pool(
                item.id,
                Some(ItemKind::Word),
                (MAX_DISTRACTORS * 4) as i64,
            )?;
            let (options, correct_index) = build_options(&item.answer, pool, &mut rng);
            questions.push(StoredQuestion {
                item_id: item.id,
                prompt: item.prompt.clone(),
                options,
                correct_index,
            });
        }

        let token = new_session_token();
        let key = session_key(GAME_KIND, &token);
        let envelope = SessionEnvelope::new(user_id, self.db.now(), QuizPayload { questions });
        save_session(self.store.as_ref(), &key, &envelope, default_session_ttl())?;

        info!(
            "Started quiz session for user {} with {} question(s)",
            user_id,
            envelope.payload.questions.len()
        );

        Ok(QuizStart {
            session_id: token,
            questions: envelope
                .payload
                .questions
                .iter()
                .map(|q| QuizQuestion {
                    item_id: q.item_id,
                    prompt: q.prompt.clone(),
                    options: q.options.clone(),
                })
                .collect(),
        })
    }

    /// Scores a parallel array of chosen option indices (−1 means the
    /// question timed out). Consumes the session.
    pub fn submit(&self, user_id: i64, session_id: &str, answers: &[i32]) -> Result<QuizOutcome> {
        let key = session_key(GAME_KIND, session_id);
        let envelope: SessionEnvelope<QuizPayload> =
            load_session(self.store.as_ref(), &key, user_id)?;
        let questions = &envelope.payload.questions;

        if answers.len() != questions.len() {
            return Err(PracticeError::Validation(format!(
                "expected {} answer(s), got {}",
                questions.len(),
                answers.len()
            )));
        }
        for (answer, question) in answers.iter().zip(questions) {
            if *answer < -1 || *answer >= question.options.len() as i32 {
                return Err(PracticeError::Validation(format!(
                    "option index {answer} out of range"
                )));
            }
        }

        let per_question: Vec<bool> = answers
            .iter()
            .zip(questions)
            .map(|(answer, question)| is_correct_choice(*answer, question.correct_index))
            .collect();
        let correct = per_question.iter().filter(|c| **c).count();
        let total = questions.len();
        let reward = round_reward(correct, total);

        let elapsed = (self.db.now() - envelope.created_at).num_seconds().max(0) as f64;
        self.db.record_game_result(&NewGameResult {
            user_id,
            kind: GAME_KIND,
            score: correct as i64,
            max_score: total as i64,
            time_spent_seconds: elapsed,
            reward,
        })?;
        self.db.add_xp(user_id, reward)?;
        self.store.delete(&key)?;

        info!("Quiz completed by user {user_id}: {correct}/{total}, reward {reward}");

        Ok(QuizOutcome {
            correct,
            total,
            reward,
            per_question,
        })
    }
}

/// Builds a shuffled option list containing the correct answer and up to
/// three distractors drawn from the pool (deduplicated case-insensitively,
/// never equal to the correct answer). Returns the options and the index
/// of the correct one.
fn build_options<R: Rng>(
    correct: &str,
    pool: Vec<String>,
    rng: &mut R,
) -> (Vec<String>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(correct.to_lowercase());

    let mut options: Vec<String> = vec![correct.to_string()];
    for candidate in pool {
        if options.len() > MAX_DISTRACTORS {
            break;
        }
        if seen.insert(candidate.to_lowercase()) {
            options.push(candidate);
        }
    }

    options.shuffle(rng);
    let correct_index = options
        .iter()
        .position(|o| o == correct)
        .unwrap_or_default();
    (options, correct_index)
}

/// Correctness is a pure function of the chosen index and the recorded
/// correct index; −1 (timed out) never matches
pub fn is_correct_choice(chosen: i32, correct_index: usize) -> bool {
    chosen == correct_index as i32
}
