//! Error types for the chirpy-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].
//! Client-input problems are grouped under [`ValidationError`] so callers can
//! map them to a single "bad request" condition.

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but is not a well-formed document.
    #[error("malformed document: {reason}")]
    MalformedDocument { reason: String },

    /// Serializing the in-memory document failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document was written by a newer build than this one.
    #[error("unsupported schema version {found} (this build supports up to {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    /// A schema upgrade step failed.
    #[error("migration v{version} failed: {message}")]
    Migration { version: u32, message: String },

    /// The requested record was not found.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Every id a collection can hold has been issued.
    #[error("{entity}: id space exhausted")]
    IdsExhausted { entity: &'static str },

    /// A record constructor or update changed the id it was handed.
    #[error("{entity}: record id {found} does not match assigned id {expected}")]
    InvalidRecordId {
        entity: &'static str,
        expected: u64,
        found: u64,
    },

    /// The caller supplied input that violates a record invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A thread panicked while holding the document lock.
    #[error("document lock poisoned: {0}")]
    LockPoisoned(String),

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl StoreError {
    /// Whether this error is a missing-record condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}

/// Rejected client input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Another account already uses this email.
    #[error("email already registered: {email}")]
    DuplicateEmail { email: String },

    /// A text field exceeds its maximum length (in characters).
    #[error("{field} is too long: {len} characters (max {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// A required field was empty.
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
}
