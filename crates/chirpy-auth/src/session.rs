//! Signed session tokens (HS256 JWT).
//!
//! A [`SessionIssuer`] mints tokens at login and checks them on every
//! authenticated request. Tokens are never persisted or revoked; expiry is
//! the only way a session ends. Expiry is evaluated against an injected
//! [`Clock`] rather than the library's own wall-clock check, so tests and
//! simulations can move time explicitly.

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, AuthResult};

/// Issuer claim stamped on, and required of, every token.
pub const ISSUER: &str = "chirpy";

/// Lifetime used when the caller asks for a non-positive one.
pub const DEFAULT_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iss: String,
    /// Account id, as decimal text.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// The account id named by the token.
    pub fn subject_id(&self) -> AuthResult<u64> {
        self.sub.parse().map_err(|_| AuthError::InvalidSignature)
    }
}

/// A freshly minted token together with its claims.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: SessionClaims,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"<redacted>")
            .field("claims", &self.claims)
            .finish()
    }
}

/// Mints and verifies session tokens with one symmetric signing key.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("key", &"<redacted>")
            .field("clock", &self.clock)
            .finish()
    }
}

impl SessionIssuer {
    /// Create an issuer signing with `secret` and reading the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] if `secret` is empty.
    pub fn new(secret: &[u8]) -> AuthResult<Self> {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    /// Create an issuer with an explicit time source.
    pub fn with_clock(secret: &[u8], clock: Arc<dyn Clock>) -> AuthResult<Self> {
        if secret.is_empty() {
            return Err(AuthError::InvalidConfig {
                reason: "signing secret must not be empty".into(),
            });
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[ISSUER]);
        validation.leeway = 0;
        // Expiry is checked against `clock` in `verify`.
        validation.validate_exp = false;
        validation.validate_aud = false;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            clock,
        })
    }

    /// Mint a token for `subject_id` that expires `ttl_seconds` from now.
    ///
    /// A `ttl_seconds` of zero or less means [`DEFAULT_TTL_SECONDS`].
    #[instrument(skip(self))]
    pub fn issue(&self, subject_id: u64, ttl_seconds: i64) -> AuthResult<IssuedToken> {
        let ttl = if ttl_seconds <= 0 {
            DEFAULT_TTL_SECONDS
        } else {
            ttl_seconds
        };
        let now = self.clock.now();
        let claims = SessionClaims {
            iss: ISSUER.to_string(),
            sub: subject_id.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing {
                reason: e.to_string(),
            })?;

        debug!(exp = claims.exp, "session token issued");
        Ok(IssuedToken { token, claims })
    }

    /// Check a token's signature, algorithm, issuer, and expiry.
    ///
    /// # Errors
    ///
    /// [`AuthError::Expired`] once `now >= exp`; [`AuthError::InvalidSignature`]
    /// for every other failure.
    #[instrument(skip(self, token))]
    pub fn verify(&self, token: &str) -> AuthResult<SessionClaims> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "session token rejected");
                AuthError::InvalidSignature
            })?;
        let claims = data.claims;

        if self.clock.now() >= claims.exp {
            debug!(exp = claims.exp, "session token expired");
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// # Errors
///
/// Returns [`AuthError::MissingToken`] when the header is absent, uses
/// another scheme, or carries an empty token.
pub fn bearer_token(header: Option<&str>) -> AuthResult<&str> {
    let header = header.ok_or(AuthError::MissingToken)?.trim();
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
