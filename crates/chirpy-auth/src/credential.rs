//! Credential hashing with PBKDF2-HMAC-SHA256.
//!
//! Hashes are self-describing strings of the form
//!
//! ```text
//! pbkdf2-sha256$<iterations>$<base64 salt>$<base64 key>
//! ```
//!
//! so that verification reads the cost from the stored hash. Raising the
//! configured cost therefore never invalidates existing accounts.
//!
//! Older deployments stored bcrypt hashes (`$2a$`, `$2b$`, `$2y$`). Those
//! still verify, and [`CredentialManager::needs_rehash`] always reports them
//! so callers can replace them with a PBKDF2 hash after a successful login.
//!
//! # Security Notes
//!
//! - A fresh 256-bit salt is drawn from `SystemRandom` for every hash.
//! - Comparison is constant-time (`ring::pbkdf2::verify`).
//! - The default of 600,000 iterations follows the OWASP (2023)
//!   recommendation for HMAC-SHA256.
//! - Hashing is deliberately slow. Async callers should use
//!   [`CredentialManager::spawn_hash`] / [`CredentialManager::spawn_verify`],
//!   which run on tokio's blocking pool.

use std::num::NonZeroU32;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, instrument, warn};

use crate::error::{AuthError, AuthResult};

/// Default PBKDF2 iteration count.
pub const DEFAULT_HASH_COST: u32 = 600_000;

/// Length of the random salt in bytes.
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes.
pub const KEY_LEN: usize = 32;

/// Scheme tag at the start of every hash string.
const SCHEME: &str = "pbkdf2-sha256";

/// Prefixes of the bcrypt variants accepted for verification only.
const LEGACY_BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Hashes and verifies account secrets.
#[derive(Debug, Clone)]
pub struct CredentialManager {
    cost: NonZeroU32,
    rng: SystemRandom,
}

impl Default for CredentialManager {
    fn default() -> Self {
        Self {
            cost: NonZeroU32::MIN.saturating_add(DEFAULT_HASH_COST - 1),
            rng: SystemRandom::new(),
        }
    }
}

impl CredentialManager {
    /// Create a manager that hashes with `cost` PBKDF2 iterations.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] if `cost` is zero.
    pub fn new(cost: u32) -> AuthResult<Self> {
        let cost = NonZeroU32::new(cost).ok_or_else(|| AuthError::InvalidConfig {
            reason: "hash cost must be greater than zero".into(),
        })?;
        Ok(Self {
            cost,
            rng: SystemRandom::new(),
        })
    }

    /// Iteration count used for new hashes.
    pub fn cost(&self) -> u32 {
        self.cost.get()
    }

    /// Hash `secret` with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if the system CSPRNG fails.
    #[instrument(skip(self, secret), fields(cost = self.cost.get()))]
    pub fn hash(&self, secret: &str) -> AuthResult<String> {
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt).map_err(|_| AuthError::Hashing {
            reason: "failed to generate random salt".into(),
        })?;

        let mut key = [0u8; KEY_LEN];
        pbkdf2::derive(PBKDF2_ALG, self.cost, &salt, secret.as_bytes(), &mut key);

        debug!("derived credential hash");
        Ok(format!(
            "{SCHEME}${}${}${}",
            self.cost,
            BASE64.encode(salt),
            BASE64.encode(key)
        ))
    }

    /// Check `secret` against a stored hash.
    ///
    /// Accepts this manager's PBKDF2 format and legacy bcrypt hashes.
    /// Returns `false` on mismatch and on hashes it cannot parse.
    #[instrument(skip(self, secret, hash))]
    pub fn verify(&self, secret: &str, hash: &str) -> bool {
        if is_legacy_bcrypt(hash) {
            return match bcrypt::verify(secret, hash) {
                Ok(matched) => matched,
                Err(err) => {
                    warn!(error = %err, "stored legacy credential hash is malformed");
                    false
                }
            };
        }
        let Some(parsed) = ParsedHash::parse(hash) else {
            warn!("stored credential hash is malformed");
            return false;
        };
        pbkdf2::verify(
            PBKDF2_ALG,
            parsed.cost,
            &parsed.salt,
            secret.as_bytes(),
            &parsed.key,
        )
        .is_ok()
    }

    /// Whether `hash` was produced with a different cost than this
    /// manager's, uses the legacy bcrypt scheme, or cannot be parsed at all.
    pub fn needs_rehash(&self, hash: &str) -> bool {
        ParsedHash::parse(hash).is_none_or(|parsed| parsed.cost != self.cost)
    }

    /// [`CredentialManager::hash`] on tokio's blocking pool.
    pub async fn spawn_hash(&self, secret: String) -> AuthResult<String> {
        let manager = self.clone();
        tokio::task::spawn_blocking(move || manager.hash(&secret)).await?
    }

    /// [`CredentialManager::verify`] on tokio's blocking pool.
    pub async fn spawn_verify(&self, secret: String, hash: String) -> AuthResult<bool> {
        let manager = self.clone();
        Ok(tokio::task::spawn_blocking(move || manager.verify(&secret, &hash)).await?)
    }
}

fn is_legacy_bcrypt(hash: &str) -> bool {
    LEGACY_BCRYPT_PREFIXES
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}

struct ParsedHash {
    cost: NonZeroU32,
    salt: Vec<u8>,
    key: Vec<u8>,
}

impl ParsedHash {
    fn parse(hash: &str) -> Option<Self> {
        let mut parts = hash.split('$');
        if parts.next()? != SCHEME {
            return None;
        }
        let cost = parts.next()?.parse::<NonZeroU32>().ok()?;
        let salt = BASE64.decode(parts.next()?).ok()?;
        let key = BASE64.decode(parts.next()?).ok()?;
        if parts.next().is_some() || salt.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self { cost, salt, key })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
