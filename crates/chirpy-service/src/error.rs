//! Service error types and their classification for transport layers.

use chirpy_auth::AuthError;
use chirpy_store::{StoreError, ValidationError};

/// Coarse outcome class a transport maps to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Internal,
    NotFound,
    InvalidInput,
    Unauthorized,
}

/// Errors returned by [`crate::Chirpy`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The backing document could not be read or written.
    #[error("storage failure: {0}")]
    Store(StoreError),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Authentication failed. The reason is kept for logs but never shown.
    #[error("unauthorized")]
    Unauthorized(#[source] AuthError),

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::InvalidInput,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Store(_) | Self::Config { .. } | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => Self::NotFound { entity, key },
            StoreError::Validation(v) => Self::Validation(v),
            other => Self::Store(other),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::InvalidSignature
            | AuthError::Expired
            | AuthError::MissingToken => Self::Unauthorized(err),
            AuthError::InvalidConfig { reason } => Self::Config { reason },
            AuthError::Hashing { .. } | AuthError::Signing { .. } | AuthError::TaskJoin(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

/// Convenience alias used throughout the service crate.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_classified() {
        let not_found: ServiceError = StoreError::NotFound {
            entity: "chirps",
            key: "3".into(),
        }
        .into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let invalid: ServiceError = StoreError::from(ValidationError::EmptyField { field: "email" }).into();
        assert_eq!(invalid.kind(), ErrorKind::InvalidInput);

        let poisoned: ServiceError = StoreError::LockPoisoned("boom".into()).into();
        assert!(matches!(poisoned, ServiceError::Store(_)));
        assert_eq!(poisoned.kind(), ErrorKind::Internal);
    }

    #[test]
    fn auth_failures_share_one_message() {
        for err in [
            AuthError::InvalidCredentials,
            AuthError::InvalidSignature,
            AuthError::Expired,
            AuthError::MissingToken,
        ] {
            let service: ServiceError = err.into();
            assert_eq!(service.kind(), ErrorKind::Unauthorized);
            assert_eq!(service.to_string(), "unauthorized");
        }
    }

    #[test]
    fn auth_infrastructure_failures_are_internal() {
        let err: ServiceError = AuthError::Hashing {
            reason: "no entropy".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err: ServiceError = AuthError::InvalidConfig {
            reason: "empty key".into(),
        }
        .into();
        assert!(matches!(err, ServiceError::Config { .. }));
    }
}
