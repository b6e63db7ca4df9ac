use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::catalog::{ItemFilter, ItemKind};
use crate::database::{Database, NewGameResult};
use crate::error::{PracticeError, Result};
use crate::games::common::{
    SessionEnvelope, load_session, new_session_token, round_reward, save_session, session_key,
};
use crate::session_store::{SessionStore, default_session_ttl};

pub const GAME_KIND: &str = "dictation";
pub const MAX_WORDS: usize = 20;

const CANDIDATE_MULTIPLIER: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredWord {
    item_id: i64,
    prompt: String,
    // lowercased at session creation
    answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct DictationPayload {
    words: Vec<StoredWord>,
}

/// Prompt shown to the player; the expected spelling stays server-side
#[derive(Debug, Clone, PartialEq)]
pub struct DictationWord {
    pub item_id: i64,
    pub prompt: String,
    pub word_length: usize,
}

#[derive(Debug)]
pub struct DictationStart {
    pub session_id: String,
    pub words: Vec<DictationWord>,
}

#[derive(Debug, PartialEq)]
pub struct DictationOutcome {
    pub correct: usize,
    pub total: usize,
    pub reward: i64,
    pub per_word: Vec<bool>,
}

/// Spelling dictation over single-token alphabetic words
pub struct DictationGame {
    db: Arc<Database>,
    store: Arc<dyn SessionStore>,
}

impl DictationGame {
    pub fn new(db: Arc<Database>) -> Self {
        let store: Arc<dyn SessionStore> = db.clone();
        Self { db, store }
    }

    pub fn with_store(db: Arc<Database>, store: Arc<dyn SessionStore>) -> Self {
        Self { db, store }
    }

    /// Creates a dictation session of up to `num_words` words. Only items
    /// whose answer is a single alphabetic token qualify; multi-word
    /// answers cannot be spelled letter by letter.
    pub fn start(
        &self,
        user_id: i64,
        num_words: usize,
        filter: &ItemFilter,
    ) -> Result<DictationStart> {
        if num_words == 0 || num_words > MAX_WORDS {
            return Err(PracticeError::Validation(format!(
                "word count must be between 1 and {MAX_WORDS}"
            )));
        }

        let sample = self.db.get_random_items(
            Some(ItemKind::Word),
            filter,
            (num_words * CANDIDATE_MULTIPLIER) as i64,
        )?;
        let words: Vec<StoredWord> = sample
            .into_iter()
            .filter(|item| item.has_single_alphabetic_answer())
            .take(num_words)
            .map(|item| StoredWord {
                item_id: item.id,
                prompt: item.prompt,
                answer: item.answer.to_lowercase(),
            })
            .collect();
        if words.is_empty() {
            return Err(PracticeError::InsufficientData(
                "no single-word dictation candidates in the catalog".to_string(),
            ));
        }

        let token = new_session_token();
        let key = session_key(GAME_KIND, &token);
        let envelope = SessionEnvelope::new(user_id, self.db.now(), DictationPayload { words });
        save_session(self.store.as_ref(), &key, &envelope, default_session_ttl())?;

        info!(
            "Started dictation session for user {} with {} word(s)",
            user_id,
            envelope.payload.words.len()
        );

        Ok(DictationStart {
            session_id: token,
            words: envelope
                .payload
                .words
                .iter()
                .map(|w| DictationWord {
                    item_id: w.item_id,
                    prompt: w.prompt.clone(),
                    word_length: w.answer.chars().count(),
                })
                .collect(),
        })
    }

    /// Scores a parallel array of typed spellings, compared after trimming
    /// and lowercasing. Consumes the session.
    pub fn submit(
        &self,
        user_id: i64,
        session_id: &str,
        answers: &[String],
    ) -> Result<DictationOutcome> {
        let key = session_key(GAME_KIND, session_id);
        let envelope: SessionEnvelope<DictationPayload> =
            load_session(self.store.as_ref(), &key, user_id)?;
        let words = &envelope.payload.words;

        if answers.len() != words.len() {
            return Err(PracticeError::Validation(format!(
                "expected {} answer(s), got {}",
                words.len(),
                answers.len()
            )));
        }

        let per_word: Vec<bool> = answers
            .iter()
            .zip(words)
            .map(|(answer, word)| is_correct_spelling(answer, &word.answer))
            .collect();
        let correct = per_word.iter().filter(|c| **c).count();
        let total = words.len();
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

        info!("Dictation completed by user {user_id}: {correct}/{total}, reward {reward}");

        Ok(DictationOutcome {
            correct,
            total,
            reward,
            per_word,
        })
    }
}

/// Spellings match after trimming surrounding whitespace and lowercasing;
/// an empty (skipped) answer never matches
pub fn is_correct_spelling(typed: &str, expected: &str) -> bool {
    let typed = typed.trim().to_lowercase();
    !typed.is_empty() && typed == expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::NewItem;

    fn create_game() -> DictationGame {
        let db = Arc::new(Database::new(":memory:").unwrap());
        DictationGame::new(db)
    }

    fn seed_words(game: &DictationGame, pairs: &[(&str, &str)]) -> Vec<i64> {
        pairs
            .iter()
            .map(|(prompt, answer)| {
                game.db
                    .insert_item(&NewItem {
                        prompt,
                        answer,
                        ..NewItem::default()
                    })
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_spelling_comparison_is_lenient_on_case_and_whitespace() {
        assert!(is_correct_spelling("Cat", "cat"));
        assert!(is_correct_spelling("  cat  ", "cat"));
        assert!(!is_correct_spelling("kat", "cat"));
        assert!(!is_correct_spelling("", "cat"));
        assert!(!is_correct_spelling("   ", "cat"));
    }

    #[test]
    fn test_start_skips_multi_word_answers() {
        let game = create_game();
        seed_words(
            &game,
            &[
                ("die Katze", "cat"),
                ("guten Morgen", "good morning"),
                ("das Auto", "car2go"),
                ("der Hund", "dog"),
            ],
        );

        let start = game.start(1, 4, &ItemFilter::none()).unwrap();

        // Only "cat" and "dog" are spellable
        assert_eq!(start.words.len(), 2);
        for word in &start.words {
            let item = game.db.get_item(word.item_id).unwrap().unwrap();
            assert!(item.has_single_alphabetic_answer());
            assert_eq!(word.word_length, item.answer.chars().count());
        }
    }

    #[test]
    fn test_start_with_no_spellable_words() {
        let game = create_game();
        seed_words(&game, &[("guten Morgen", "good morning")]);

        assert!(matches!(
            game.start(1, 3, &ItemFilter::none()),
            Err(PracticeError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_start_rejects_bad_word_counts() {
        let game = create_game();
        assert!(matches!(
            game.start(1, 0, &ItemFilter::none()),
            Err(PracticeError::Validation(_))
        ));
        assert!(matches!(
            game.start(1, MAX_WORDS + 1, &ItemFilter::none()),
            Err(PracticeError::Validation(_))
        ));
    }

    #[test]
    fn test_full_round_mixed_results() {
        let game = create_game();
        seed_words(
            &game,
            &[("die Katze", "cat"), ("der Hund", "dog"), ("das Pferd", "horse")],
        );

        let start = game.start(1, 3, &ItemFilter::none()).unwrap();
        assert_eq!(start.words.len(), 3);

        // Spell the first two correctly (with sloppy casing), miss the last
        let answers: Vec<String> = start
            .words
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let item = game.db.get_item(w.item_id).unwrap().unwrap();
                if i < 2 {
                    format!(" {} ", item.answer.to_uppercase())
                } else {
                    "wrong".to_string()
                }
            })
            .collect();

        let outcome = game.submit(1, &start.session_id, &answers).unwrap();
        assert_eq!(outcome.correct, 2);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.per_word, vec![true, true, false]);
        assert_eq!(outcome.reward, 10 + 5 * 2);
        assert_eq!(game.db.get_xp(1).unwrap(), outcome.reward);
    }

    #[test]
    fn test_wrong_length_answer_array_rejected_without_consuming() {
        let game = create_game();
        seed_words(&game, &[("die Katze", "cat"), ("der Hund", "dog")]);

        let start = game.start(1, 2, &ItemFilter::none()).unwrap();

        let result = game.submit(1, &start.session_id, &["cat".to_string()]);
        assert!(matches!(result, Err(PracticeError::Validation(_))));

        let outcome = game
            .submit(1, &start.session_id, &["cat".to_string(), "dog".to_string()])
            .unwrap();
        assert_eq!(outcome.total, 2);
    }

    #[test]
    fn test_submit_consumes_session() {
        let game = create_game();
        seed_words(&game, &[("die Katze", "cat")]);

        let start = game.start(1, 1, &ItemFilter::none()).unwrap();
        game.submit(1, &start.session_id, &["cat".to_string()]).unwrap();

        assert!(matches!(
            game.submit(1, &start.session_id, &["cat".to_string()]),
            Err(PracticeError::NotFound)
        ));
    }

    #[test]
    fn test_foreign_session_is_forbidden() {
        let game = create_game();
        seed_words(&game, &[("die Katze", "cat")]);

        let start = game.start(1, 1, &ItemFilter::none()).unwrap();
        assert!(matches!(
            game.submit(2, &start.session_id, &["cat".to_string()]),
            Err(PracticeError::Forbidden)
        ));
    }
}
