use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PracticeError, Result};
use crate::session_store::SessionStore;

const SESSION_TOKEN_LEN: usize = 24;

/// Base reward for finishing a scored round
pub const REWARD_BASE: i64 = 10;
/// Reward per correct answer
pub const REWARD_PER_CORRECT: i64 = 5;
/// Bonus for a flawless round of at least `PERFECT_MIN_QUESTIONS`
pub const REWARD_PERFECT_BONUS: i64 = 20;
pub const PERFECT_MIN_QUESTIONS: usize = 5;

/// Lifecycle of a game session. Reaching `Completed` is what matters;
/// deleting the stored entry is how the store happens to implement it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Completed,
}

/// Stored wrapper around a game's kind-specific payload
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SessionEnvelope<P> {
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub payload: P,
}

impl<P> SessionEnvelope<P> {
    pub(crate) fn new(user_id: i64, created_at: DateTime<Utc>, payload: P) -> Self {
        Self {
            user_id,
            created_at,
            status: SessionStatus::Active,
            payload,
        }
    }
}

/// Opaque session token; the store key is `<kind>:<token>`
pub(crate) fn new_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub(crate) fn session_key(kind: &str, token: &str) -> String {
    format!("{kind}:{token}")
}

/// Loads and authorizes a session envelope.
///
/// Unknown or expired keys fail `NotFound`; a session owned by another
/// user fails `Forbidden` (callers surface both identically).
pub(crate) fn load_session<P: DeserializeOwned>(
    store: &dyn SessionStore,
    key: &str,
    user_id: i64,
) -> Result<SessionEnvelope<P>> {
    let raw = store.get(key)?.ok_or(PracticeError::NotFound)?;
    let envelope: SessionEnvelope<P> = serde_json::from_str(&raw)?;
    if envelope.user_id != user_id {
        return Err(PracticeError::Forbidden);
    }
    Ok(envelope)
}

pub(crate) fn save_session<P: Serialize>(
    store: &dyn SessionStore,
    key: &str,
    envelope: &SessionEnvelope<P>,
    ttl: chrono::Duration,
) -> Result<()> {
    let raw = serde_json::to_string(envelope)?;
    store.put(key, &raw, ttl)
}

/// Reward for answer-set games (quiz, dictation, sentence builder)
pub fn round_reward(correct: usize, total: usize) -> i64 {
    let mut reward = REWARD_BASE + REWARD_PER_CORRECT * correct as i64;
    if total >= PERFECT_MIN_QUESTIONS && correct == total {
        reward += REWARD_PERFECT_BONUS;
    }
    reward
}
