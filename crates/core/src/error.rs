//! Errors raised by aggregates while deciding on a command.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Business-rule failures. Carries no IO errors: those live in the
/// infrastructure crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input the user can fix (missing field, bad number, unknown status).
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The order stream does not exist yet.
    #[error("not found")]
    NotFound,

    /// Duplicate creation or a stale stream version.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Text shown to the user, i.e. the payload without the
    /// `"validation failed: "` style prefix of `Display`.
    pub fn message(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::InvariantViolation(msg)
            | Self::InvalidId(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::NotFound => "not found".into(),
            Self::Unauthorized => "unauthorized".into(),
        }
    }
}
