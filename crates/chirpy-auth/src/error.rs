//! Authentication error types.
//!
//! Every public API in this crate returns [`AuthError`]. Variants never carry
//! secrets, tokens, or hashes, so an error can be logged as-is.

/// Unified error type for credential and session handling.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    // -- Credential errors --------------------------------------------------
    /// The email/secret pair did not match a registered account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Generating a credential hash failed (entropy source unavailable).
    #[error("hashing failed: {reason}")]
    Hashing { reason: String },

    // -- Session errors -----------------------------------------------------
    /// The token is malformed, signed with another key, or carries
    /// unexpected claims.
    #[error("invalid session token")]
    InvalidSignature,

    /// The token was valid but its expiry has passed.
    #[error("session token expired")]
    Expired,

    /// No bearer token was presented.
    #[error("missing bearer token")]
    MissingToken,

    /// Encoding a token failed.
    #[error("token signing failed: {reason}")]
    Signing { reason: String },

    // -- Generic ------------------------------------------------------------
    /// A constructor was handed an unusable parameter.
    #[error("invalid auth configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A blocking hash task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}

/// Convenience alias used throughout the auth crate.
pub type AuthResult<T> = std::result::Result<T, AuthError>;
