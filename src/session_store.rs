use chrono::Duration;

use crate::database::{Database, SessionsRepository};
use crate::error::Result;

/// Default lifetime of an unconsumed game session
pub fn default_session_ttl() -> Duration {
    Duration::hours(6)
}

/// Keyed ephemeral store for in-progress game sessions.
///
/// Keys are opaque strings scoped by a game-kind prefix (`quiz:<token>`).
/// Implementations provide at-most-once consumption: once a session is
/// deleted, a replayed read observes absence. Injected into each game
/// service as a capability rather than reached for as a global.
pub trait SessionStore {
    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// SQLite-backed store over the `sessions` table. Expiry is lazy: an
/// expired row reads as absent and is deleted on access.
impl SessionStore for Database {
    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = self.now() + ttl;
        SessionsRepository::new(&self.conn).put(key, value, expires_at)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let repo = SessionsRepository::new(&self.conn);
        match repo.get(key)? {
            Some((value, expires_at)) if expires_at > self.now() => Ok(Some(value)),
            Some(_) => {
                repo.delete(key)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        SessionsRepository::new(&self.conn).delete(key)?;
        Ok(())
    }
}
