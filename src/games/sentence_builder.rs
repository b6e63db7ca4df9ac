use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::catalog::{ItemFilter, ItemKind};
use crate::database::{Database, NewGameResult};
use crate::error::{PracticeError, Result};
use crate::games::common::{
    SessionEnvelope, load_session, new_session_token, round_reward, save_session, session_key,
};
use crate::session_store::{SessionStore, default_session_ttl};

pub const GAME_KIND: &str = "sentence_builder";
pub const MAX_SENTENCES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSentence {
    item_id: i64,
    prompt: String,
    answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SentencePayload {
    sentences: Vec<StoredSentence>,
}

/// Sentence handed to the player as shuffled word tiles
#[derive(Debug, Clone, PartialEq)]
pub struct SentencePuzzle {
    pub item_id: i64,
    pub prompt: String,
    pub tiles: Vec<String>,
}

#[derive(Debug)]
pub struct SentenceBuilderStart {
    pub session_id: String,
    pub puzzles: Vec<SentencePuzzle>,
}

/// Why a reconstruction was wrong; informational only, never affects the
/// score
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceDiagnostics {
    /// Position of the first token differing from the expected sentence
    pub first_mismatch: Option<usize>,
    pub missing_tokens: Vec<String>,
    pub extra_tokens: Vec<String>,
}

#[derive(Debug, PartialEq)]
pub struct SentenceResult {
    pub correct: bool,
    pub expected: String,
    pub diagnostics: Option<SentenceDiagnostics>,
}

#[derive(Debug, PartialEq)]
pub struct SentenceBuilderOutcome {
    pub correct: usize,
    pub total: usize,
    pub reward: i64,
    pub per_sentence: Vec<SentenceResult>,
}

/// Word-order game over catalog sentences
pub struct SentenceBuilderGame {
    db: Arc<Database>,
    store: Arc<dyn SessionStore>,
}

impl SentenceBuilderGame {
    pub fn new(db: Arc<Database>) -> Self {
        let store: Arc<dyn SessionStore> = db.clone();
        Self { db, store }
    }

    pub fn with_store(db: Arc<Database>, store: Arc<dyn SessionStore>) -> Self {
        Self { db, store }
    }

    /// Creates a session of up to `num_sentences` puzzles, each dealt as
    /// shuffled word tiles
    pub fn start(
        &self,
        user_id: i64,
        num_sentences: usize,
        filter: &ItemFilter,
    ) -> Result<SentenceBuilderStart> {
        if num_sentences == 0 || num_sentences > MAX_SENTENCES {
            return Err(PracticeError::Validation(format!(
                "sentence count must be between 1 and {MAX_SENTENCES}"
            )));
        }

        let items =
            self.db
                .get_random_items(Some(ItemKind::Sentence), filter, num_sentences as i64)?;
        if items.is_empty() {
            return Err(PracticeError::InsufficientData(
                "no sentences in the catalog".to_string(),
            ));
        }

        let mut rng = rand::thread_rng();
        let mut sentences = Vec::with_capacity(items.len());
        let mut puzzles = Vec::with_capacity(items.len());
        for item in items {
            puzzles.push(SentencePuzzle {
                item_id: item.id,
                prompt: item.prompt.clone(),
                tiles: shuffle_tokens(&item.answer, &mut rng),
            });
            sentences.push(StoredSentence {
                item_id: item.id,
                prompt: item.prompt,
                answer: item.answer,
            });
        }

        let token = new_session_token();
        let key = session_key(GAME_KIND, &token);
        let envelope = SessionEnvelope::new(user_id, self.db.now(), SentencePayload { sentences });
        save_session(self.store.as_ref(), &key, &envelope, default_session_ttl())?;

        info!(
            "Started sentence builder session for user {} with {} sentence(s)",
            user_id,
            puzzles.len()
        );

        Ok(SentenceBuilderStart {
            session_id: token,
            puzzles,
        })
    }

    /// Scores a parallel array of reconstructed sentences. A sentence is
    /// correct only when its normalized token sequence matches the
    /// original exactly; wrong answers carry diagnostics. Consumes the
    /// session.
    pub fn submit(
        &self,
        user_id: i64,
        session_id: &str,
        answers: &[String],
    ) -> Result<SentenceBuilderOutcome> {
        let key = session_key(GAME_KIND, session_id);
        let envelope: SentenceEnvelope = load_session(self.store.as_ref(), &key, user_id)?;
        let sentences = &envelope.payload.sentences;

        if answers.len() != sentences.len() {
            return Err(PracticeError::Validation(format!(
                "expected {} sentence(s), got {}",
                sentences.len(),
                answers.len()
            )));
        }

        let per_sentence: Vec<SentenceResult> = answers
            .iter()
            .zip(sentences)
            .map(|(answer, sentence)| score_sentence(answer, &sentence.answer))
            .collect();
        let correct = per_sentence.iter().filter(|r| r.correct).count();
        let total = sentences.len();
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

        info!("Sentence builder completed by user {user_id}: {correct}/{total}, reward {reward}");

        Ok(SentenceBuilderOutcome {
            correct,
            total,
            reward,
            per_sentence,
        })
    }
}

type SentenceEnvelope = SessionEnvelope<SentencePayload>;

/// Splits a sentence into whitespace tokens and shuffles them. When the
/// shuffle happens to reproduce the original order of a multi-token
/// sentence, it is re-rolled once; a second identical deal is accepted.
fn shuffle_tokens<R: rand::Rng>(sentence: &str, rng: &mut R) -> Vec<String> {
    let original: Vec<String> = sentence.split_whitespace().map(str::to_string).collect();
    let mut tiles = original.clone();
    tiles.shuffle(rng);
    if tiles == original && tiles.len() > 1 {
        tiles.shuffle(rng);
    }
    tiles
}

/// Collapses runs of whitespace to single spaces and lowercases, so tile
/// joining and typed input compare equal
fn normalize(sentence: &str) -> String {
    sentence
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn score_sentence(answer: &str, expected: &str) -> SentenceResult {
    let normalized_answer = normalize(answer);
    let normalized_expected = normalize(expected);
    if normalized_answer == normalized_expected {
        return SentenceResult {
            correct: true,
            expected: expected.to_string(),
            diagnostics: None,
        };
    }

    let answer_tokens: Vec<&str> = normalized_answer.split_whitespace().collect();
    let expected_tokens: Vec<&str> = normalized_expected.split_whitespace().collect();

    let first_mismatch = answer_tokens
        .iter()
        .zip(&expected_tokens)
        .position(|(a, e)| a != e)
        .or_else(|| {
            (answer_tokens.len() != expected_tokens.len())
                .then(|| answer_tokens.len().min(expected_tokens.len()))
        });

    let mut counts: HashMap<&str, i32> = HashMap::new();
    for &token in &expected_tokens {
        *counts.entry(token).or_default() += 1;
    }
    for &token in &answer_tokens {
        *counts.entry(token).or_default() -= 1;
    }
    let mut missing_tokens = Vec::new();
    let mut extra_tokens = Vec::new();
    for &token in &expected_tokens {
        if counts.get(token).copied().unwrap_or(0) > 0 {
            *counts.entry(token).or_default() -= 1;
            missing_tokens.push(token.to_string());
        }
    }
    for &token in &answer_tokens {
        if counts.get(token).copied().unwrap_or(0) < 0 {
            *counts.entry(token).or_default() += 1;
            extra_tokens.push(token.to_string());
        }
    }

    SentenceResult {
        correct: false,
        expected: expected.to_string(),
        diagnostics: Some(SentenceDiagnostics {
            first_mismatch,
            missing_tokens,
            extra_tokens,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::NewItem;

    fn create_game() -> SentenceBuilderGame {
        let db = Arc::new(Database::new(":memory:").unwrap());
        SentenceBuilderGame::new(db)
    }

    fn seed_sentence(game: &SentenceBuilderGame, prompt: &str, answer: &str) -> i64 {
        game.db
            .insert_item(&NewItem {
                kind: ItemKind::Sentence,
                prompt,
                answer,
                ..NewItem::default()
            })
            .unwrap()
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  I go   to the  Gym "), "i go to the gym");
        assert_eq!(normalize("one"), "one");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_shuffle_preserves_tokens() {
        let mut rng = rand::thread_rng();
        let tiles = shuffle_tokens("I go to the gym on Monday", &mut rng);

        let mut sorted = tiles.clone();
        sorted.sort();
        let mut expected: Vec<String> = "I go to the gym on Monday"
            .split_whitespace()
            .map(str::to_string)
            .collect();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_single_token_sentence_never_loops() {
        let mut rng = rand::thread_rng();
        assert_eq!(shuffle_tokens("Hello", &mut rng), vec!["Hello".to_string()]);
    }

    #[test]
    fn test_score_exact_match_modulo_case_and_spacing() {
        let result = score_sentence("i go  to the GYM on monday", "I go to the gym on Monday");
        assert!(result.correct);
        assert!(result.diagnostics.is_none());
    }

    #[test]
    fn test_score_reports_first_mismatch_and_token_diff() {
        let result = score_sentence("I go to gym the on Sunday", "I go to the gym on Monday");

        assert!(!result.correct);
        let diagnostics = result.diagnostics.unwrap();
        // "I go to" agree, position 3 is "gym" vs "the"
        assert_eq!(diagnostics.first_mismatch, Some(3));
        assert_eq!(diagnostics.missing_tokens, vec!["monday".to_string()]);
        assert_eq!(diagnostics.extra_tokens, vec!["sunday".to_string()]);
    }

    #[test]
    fn test_score_short_answer_mismatches_at_truncation_point() {
        let result = score_sentence("I go to the gym", "I go to the gym on Monday");

        assert!(!result.correct);
        let diagnostics = result.diagnostics.unwrap();
        assert_eq!(diagnostics.first_mismatch, Some(5));
        assert_eq!(
            diagnostics.missing_tokens,
            vec!["on".to_string(), "monday".to_string()]
        );
        assert!(diagnostics.extra_tokens.is_empty());
    }

    #[test]
    fn test_score_duplicate_tokens_counted_not_set_matched() {
        let result = score_sentence("the cat saw the cat", "the cat saw the other cat");
        assert!(!result.correct);
        let diagnostics = result.diagnostics.unwrap();
        assert_eq!(diagnostics.missing_tokens, vec!["other".to_string()]);
        assert!(diagnostics.extra_tokens.is_empty());
    }

    #[test]
    fn test_start_deals_shuffled_tiles_per_sentence() {
        let game = create_game();
        seed_sentence(&game, "Ich gehe montags ins Fitnessstudio", "I go to the gym on Monday");

        let start = game.start(1, 1, &ItemFilter::none()).unwrap();
        assert_eq!(start.puzzles.len(), 1);
        assert_eq!(start.puzzles[0].tiles.len(), 7);
    }

    #[test]
    fn test_start_with_no_sentences() {
        let game = create_game();
        // Words alone do not feed the sentence game
        game.db
            .insert_item(&NewItem {
                prompt: "die Katze",
                answer: "cat",
                ..NewItem::default()
            })
            .unwrap();

        assert!(matches!(
            game.start(1, 2, &ItemFilter::none()),
            Err(PracticeError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_full_round_scores_and_rewards() {
        let game = create_game();
        seed_sentence(&game, "Ich gehe montags ins Fitnessstudio", "I go to the gym on Monday");
        seed_sentence(&game, "Sie liest jeden Abend", "She reads every evening");

        let start = game.start(1, 2, &ItemFilter::none()).unwrap();

        // Answer each puzzle with its catalog sentence, first one correct,
        // second one scrambled.
        let answers: Vec<String> = start
            .puzzles
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let item = game.db.get_item(p.item_id).unwrap().unwrap();
                if i == 0 {
                    item.answer
                } else {
                    let mut tokens: Vec<&str> = item.answer.split_whitespace().collect();
                    tokens.reverse();
                    tokens.join(" ")
                }
            })
            .collect();

        let outcome = game.submit(1, &start.session_id, &answers).unwrap();
        assert_eq!(outcome.correct, 1);
        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.reward, 10 + 5);
        assert!(outcome.per_sentence[0].correct);
        assert!(!outcome.per_sentence[1].correct);
        assert!(outcome.per_sentence[1].diagnostics.is_some());
        assert_eq!(game.db.get_xp(1).unwrap(), outcome.reward);
    }

    #[test]
    fn test_submit_consumes_session() {
        let game = create_game();
        seed_sentence(&game, "Sie liest", "She reads");

        let start = game.start(1, 1, &ItemFilter::none()).unwrap();
        game.submit(1, &start.session_id, &["She reads".to_string()])
            .unwrap();

        assert!(matches!(
            game.submit(1, &start.session_id, &["She reads".to_string()]),
            Err(PracticeError::NotFound)
        ));
    }

    #[test]
    fn test_foreign_session_is_forbidden() {
        let game = create_game();
        seed_sentence(&game, "Sie liest", "She reads");

        let start = game.start(1, 1, &ItemFilter::none()).unwrap();
        assert!(matches!(
            game.submit(2, &start.session_id, &["She reads".to_string()]),
            Err(PracticeError::Forbidden)
        ));
    }
}
