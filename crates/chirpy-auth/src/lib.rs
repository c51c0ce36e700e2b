//! Credential hashing and session tokens for Chirpy.
//!
//! This crate never touches storage. It turns secrets into hashes (and
//! checks them), and turns account ids into signed, expiring session tokens
//! (and back).
//!
//! # Modules
//!
//! - [`credential`]: PBKDF2-HMAC-SHA256 hashing with a self-describing
//!   format and adaptive cost.
//! - [`session`]: HS256 session tokens and bearer-header parsing.
//! - [`clock`]: time sources for expiry checks.
//! - [`error`]: unified error types.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chirpy_auth::{CredentialManager, SessionIssuer};
//!
//! # fn example() -> chirpy_auth::AuthResult<()> {
//! let creds = CredentialManager::default();
//! let hash = creds.hash("hunter2")?;
//! assert!(creds.verify("hunter2", &hash));
//!
//! let issuer = SessionIssuer::new(b"signing-secret")?;
//! let issued = issuer.issue(42, 0)?;
//! let claims = issuer.verify(&issued.token)?;
//! assert_eq!(claims.subject_id()?, 42);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod credential;
pub mod error;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::{CredentialManager, DEFAULT_HASH_COST};
pub use error::{AuthError, AuthResult};
pub use session::{
    DEFAULT_TTL_SECONDS, ISSUER, IssuedToken, SessionClaims, SessionIssuer, bearer_token,
};
