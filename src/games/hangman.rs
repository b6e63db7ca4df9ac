use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::catalog::{ItemFilter, ItemKind, ReviewableItem};
use crate::database::{Database, NewGameResult};
use crate::error::{PracticeError, Result};
use crate::games::common::{
    SessionEnvelope, load_session, new_session_token, save_session, session_key,
};
use crate::session_store::{SessionStore, default_session_ttl};

pub const GAME_KIND: &str = "hangman";
pub const MAX_ATTEMPTS: i32 = 6;
const MIN_WORD_LEN: usize = 3;
const MAX_WORD_LEN: usize = 12;
const CANDIDATE_SAMPLE: i64 = 50;

const WIN_REWARD_BASE: i64 = 30;
const WIN_REWARD_PER_ATTEMPT_LEFT: i64 = 5;

#[derive(Debug, Serialize, Deserialize)]
struct HangmanPayload {
    item_id: i64,
    /// Lowercased target word
    word: String,
    guessed: Vec<char>,
    attempts_left: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HangmanStatus {
    Active,
    Won,
    Lost,
}

#[derive(Debug)]
pub struct HangmanStart {
    pub session_id: String,
    /// Prompt-side hint (the native-language word)
    pub hint: String,
    pub masked: String,
    pub word_length: usize,
    pub attempts_left: i32,
}

#[derive(Debug)]
pub struct HangmanProgress {
    pub masked: String,
    pub guessed: Vec<char>,
    pub attempts_left: i32,
    pub status: HangmanStatus,
    /// Reward granted when the game just completed with a win
    pub reward: i64,
    /// Revealed word, present only once the game completed
    pub word: Option<String>,
}

/// Letter-guessing game over single catalog words
pub struct HangmanGame {
    db: Arc<Database>,
    store: Arc<dyn SessionStore>,
}

impl HangmanGame {
    pub fn new(db: Arc<Database>) -> Self {
        let store: Arc<dyn SessionStore> = db.clone();
        Self { db, store }
    }

    pub fn with_store(db: Arc<Database>, store: Arc<dyn SessionStore>) -> Self {
        Self { db, store }
    }

    /// Picks a target word and opens a session with six attempts
    pub fn start(&self, user_id: i64, filter: &ItemFilter) -> Result<HangmanStart> {
        let candidates =
            self.db
                .get_random_items(Some(ItemKind::Word), filter, CANDIDATE_SAMPLE)?;
        let item = pick_target(&candidates).ok_or_else(|| {
            PracticeError::InsufficientData(
                "no alphabetic words of playable length in the catalog".to_string(),
            )
        })?;

        let word = item.answer.to_lowercase();
        let payload = HangmanPayload {
            item_id: item.id,
            word: word.clone(),
            guessed: Vec::new(),
            attempts_left: MAX_ATTEMPTS,
        };

        let token = new_session_token();
        let key = session_key(GAME_KIND, &token);
        let envelope = SessionEnvelope::new(user_id, self.db.now(), payload);
        save_session(self.store.as_ref(), &key, &envelope, default_session_ttl())?;

        info!(
            "Started hangman for user {} with a {}-letter word",
            user_id,
            word.len()
        );

        Ok(HangmanStart {
            session_id: token,
            hint: item.prompt.clone(),
            masked: mask_word(&word, &[]),
            word_length: word.len(),
            attempts_left: MAX_ATTEMPTS,
        })
    }

    /// Applies one letter guess.
    ///
    /// Rejected input (non-letter, multi-char, repeated guess) fails
    /// validation without consuming an attempt. A miss decrements
    /// attempts; a hit reveals every occurrence. The session is consumed
    /// when the word is fully revealed (win) or attempts reach zero (loss).
    pub fn guess(&self, user_id: i64, session_id: &str, letter: &str) -> Result<HangmanProgress> {
        let key = session_key(GAME_KIND, session_id);
        let mut envelope: SessionEnvelope<HangmanPayload> =
            load_session(self.store.as_ref(), &key, user_id)?;

        let guess = parse_guess(letter)?;
        if envelope.payload.guessed.contains(&guess) {
            return Err(PracticeError::Validation(format!(
                "letter '{guess}' was already guessed"
            )));
        }

        envelope.payload.guessed.push(guess);
        if !envelope.payload.word.contains(guess) {
            envelope.payload.attempts_left -= 1;
        }

        let masked = mask_word(&envelope.payload.word, &envelope.payload.guessed);
        let won = !masked.contains('_');
        let lost = !won && envelope.payload.attempts_left == 0;

        if won || lost {
            let attempts_left = envelope.payload.attempts_left;
            let reward = if won {
                WIN_REWARD_BASE + WIN_REWARD_PER_ATTEMPT_LEFT * attempts_left as i64
            } else {
                0
            };
            let elapsed = (self.db.now() - envelope.created_at).num_seconds().max(0) as f64;

            // Attempts left out of the maximum; misses are the difference
            self.db.record_game_result(&NewGameResult {
                user_id,
                kind: GAME_KIND,
                score: attempts_left as i64,
                max_score: MAX_ATTEMPTS as i64,
                time_spent_seconds: elapsed,
                reward,
            })?;
            if reward > 0 {
                self.db.add_xp(user_id, reward)?;
            }
            self.store.delete(&key)?;

            info!(
                "Hangman {} by user {} with {} attempt(s) left",
                if won { "won" } else { "lost" },
                user_id,
                attempts_left
            );

            return Ok(HangmanProgress {
                masked,
                guessed: envelope.payload.guessed,
                attempts_left,
                status: if won {
                    HangmanStatus::Won
                } else {
                    HangmanStatus::Lost
                },
                reward,
                word: Some(envelope.payload.word),
            });
        }

        let progress = HangmanProgress {
            masked,
            guessed: envelope.payload.guessed.clone(),
            attempts_left: envelope.payload.attempts_left,
            status: HangmanStatus::Active,
            reward: 0,
            word: None,
        };
        save_session(self.store.as_ref(), &key, &envelope, default_session_ttl())?;
        Ok(progress)
    }
}

/// Prefers metadata-rich words (definition or example present) among the
/// playable candidates; the sample arrives pre-shuffled
fn pick_target(candidates: &[ReviewableItem]) -> Option<&ReviewableItem> {
    let playable = |item: &&ReviewableItem| {
        let answer = &item.answer;
        (MIN_WORD_LEN..=MAX_WORD_LEN).contains(&answer.len())
            && answer.chars().all(|c| c.is_ascii_alphabetic())
    };

    candidates
        .iter()
        .filter(playable)
        .find(|item| item.definition.is_some() || item.example.is_some())
        .or_else(|| candidates.iter().find(playable))
}

fn parse_guess(letter: &str) -> Result<char> {
    let mut chars = letter.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Ok(c.to_ascii_lowercase()),
        _ => Err(PracticeError::Validation(format!(
            "guess must be a single letter, got {letter:?}"
        ))),
    }
}

fn mask_word(word: &str, guessed: &[char]) -> String {
    word.chars()
        .map(|c| if guessed.contains(&c) { c } else { '_' })
        .collect()
}
