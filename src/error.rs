use thiserror::Error;

/// Failure taxonomy shared by the scheduler, composer, and games
#[derive(Debug, Error)]
pub enum PracticeError {
    /// A grade string outside the accepted set
    #[error("invalid grade: {0}")]
    InvalidGrade(String),

    /// A request parameter outside its accepted range or shape
    #[error("invalid request: {0}")]
    Validation(String),

    /// The referenced item or session does not exist (or has expired)
    #[error("not found")]
    NotFound,

    /// The session exists but belongs to a different user
    #[error("forbidden")]
    Forbidden,

    /// The catalog cannot supply enough material for the request
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("session payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PracticeError>;
