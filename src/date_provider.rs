use chrono::{DateTime, Utc};

/// Trait for providing the current date/time to the database and services.
/// This allows for flexible time handling (system time, fixed test clocks).
pub trait DateProvider: Send + Sync {
    /// Get the current date/time
    fn get_current_time(&self) -> DateTime<Utc>;
}

/// Default date provider that uses the system's current date/time
pub struct SystemDateProvider;

impl DateProvider for SystemDateProvider {
    fn get_current_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Date provider pinned to a single instant, for deterministic tests of
/// scheduling dates and session expiry.
pub struct FixedDateProvider {
    fixed: DateTime<Utc>,
}

impl FixedDateProvider {
    pub fn new(fixed: DateTime<Utc>) -> Self {
        Self { fixed }
    }
}

impl DateProvider for FixedDateProvider {
    fn get_current_time(&self) -> DateTime<Utc> {
        self.fixed
    }
}
