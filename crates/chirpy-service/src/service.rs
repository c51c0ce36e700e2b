//! The [`Chirpy`] façade: every operation a request handler needs.
//!
//! Handlers hold a clone of one `Chirpy`. All clones share the same
//! [`DocumentStore`], so the store's lock serializes every mutation in the
//! process. Credential hashing runs on tokio's blocking pool and never while
//! the store lock is held.

use std::fmt;

use chirpy_auth::{AuthError, CredentialManager, SessionIssuer, bearer_token};
use chirpy_store::{
    Account, AccountStore, DocumentStore, Message, MessageStore, StoreError, ValidationError,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};

/// Verified against when a login names an unknown email, so that unknown
/// emails and wrong secrets take comparable time.
const DUMMY_SECRET: &str = "chirpy-unknown-account";

/// The response-safe view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: u64,
    pub email: String,
}

impl From<Account> for Profile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
        }
    }
}

/// Result of a successful login.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SessionToken {
    pub account_id: u64,
    pub email: String,
    pub token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("account_id", &self.account_id)
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Messages, accounts, and sessions over one shared document store.
#[derive(Clone)]
pub struct Chirpy {
    store: DocumentStore,
    messages: MessageStore,
    accounts: AccountStore,
    credentials: CredentialManager,
    sessions: SessionIssuer,
    dummy_hash: String,
}

impl fmt::Debug for Chirpy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chirpy")
            .field("store", &self.store)
            .field("hash_cost", &self.credentials.cost())
            .field("sessions", &self.sessions)
            .finish()
    }
}

impl Chirpy {
    /// Assemble a service from already-built parts.
    ///
    /// Derives the hash used for unknown-email logins up front, so the
    /// first such login costs the same as every later one.
    pub async fn new(
        store: DocumentStore,
        credentials: CredentialManager,
        sessions: SessionIssuer,
    ) -> ServiceResult<Self> {
        let dummy_hash = credentials.spawn_hash(DUMMY_SECRET.to_string()).await?;
        Ok(Self {
            messages: MessageStore::new(store.clone()),
            accounts: AccountStore::new(store.clone()),
            store,
            credentials,
            sessions,
            dummy_hash,
        })
    }

    /// Validate `config`, open (and upgrade) the document, and build the
    /// credential manager and session issuer from it.
    #[instrument(skip(config), fields(path = %config.database_path.display()))]
    pub async fn from_config(config: &ServiceConfig) -> ServiceResult<Self> {
        config.validate()?;

        let credentials = CredentialManager::new(config.hash_cost)?;
        let sessions = SessionIssuer::new(config.signing_secret.as_bytes())?;
        let store = DocumentStore::open_and_migrate(config.database_path.clone())
            .await
            .map_err(surface)?;

        let chirpy = Self::new(store, credentials, sessions).await?;
        info!(hash_cost = config.hash_cost, "chirpy service ready");
        Ok(chirpy)
    }

    /// The shared document store.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    // ── messages ─────────────────────────────────────────────────────

    /// Store a new message. `body` must already be censored.
    #[instrument(skip(self, body))]
    pub async fn create_message(&self, body: &str) -> ServiceResult<Message> {
        self.messages.create(body).await.map_err(surface)
    }

    #[instrument(skip(self))]
    pub async fn get_message(&self, id: u64) -> ServiceResult<Message> {
        self.messages.get(id).await.map_err(surface)
    }

    /// All messages, ascending by id.
    #[instrument(skip(self))]
    pub async fn list_messages(&self) -> ServiceResult<Vec<Message>> {
        self.messages.list().await.map_err(surface)
    }

    // ── accounts ─────────────────────────────────────────────────────

    /// Register a new account. Only the hash of `secret` is stored.
    #[instrument(skip(self, secret))]
    pub async fn create_account(&self, email: &str, secret: &str) -> ServiceResult<Profile> {
        require("email", email)?;
        require("secret", secret)?;

        let hash = self.credentials.spawn_hash(secret.to_string()).await?;
        let account = self.accounts.create(email, &hash).await.map_err(surface)?;

        info!(id = account.id, "account created");
        Ok(account.into())
    }

    /// Check `email`/`secret` and mint a session token.
    ///
    /// `ttl_seconds <= 0` means the default lifetime of one day. Unknown
    /// emails and wrong secrets both yield the same unauthorized error.
    /// A stored hash in an outdated format or cost is replaced with a fresh
    /// one once the secret has been verified.
    #[instrument(skip(self, secret))]
    pub async fn authenticate(
        &self,
        email: &str,
        secret: &str,
        ttl_seconds: i64,
    ) -> ServiceResult<SessionToken> {
        let account = match self.accounts.get_by_email(email).await {
            Ok(account) => Some(account),
            Err(StoreError::NotFound { .. } | StoreError::Validation(_)) => None,
            Err(err) => return Err(surface(err)),
        };

        let hash = match &account {
            Some(account) => account.secret_hash.clone(),
            None => self.dummy_hash.clone(),
        };
        let matches = self
            .credentials
            .spawn_verify(secret.to_string(), hash)
            .await?;

        let account = match account {
            Some(account) if matches => account,
            _ => {
                warn!("login rejected");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if self.credentials.needs_rehash(&account.secret_hash) {
            self.upgrade_hash(&account, secret).await?;
        }

        let issued = self.sessions.issue(account.id, ttl_seconds)?;
        info!(id = account.id, expires_at = issued.claims.exp, "login succeeded");
        Ok(SessionToken {
            account_id: account.id,
            email: account.email,
            token: issued.token,
            expires_at: issued.claims.exp,
        })
    }

    /// Change the email and secret of the account named by `token`.
    #[instrument(skip(self, token, new_secret))]
    pub async fn update_account(
        &self,
        token: &str,
        new_email: &str,
        new_secret: &str,
    ) -> ServiceResult<Profile> {
        let id = self.verify_session(token)?;
        require("email", new_email)?;
        require("secret", new_secret)?;

        let hash = self.credentials.spawn_hash(new_secret.to_string()).await?;
        let account = self
            .accounts
            .update(id, new_email, &hash)
            .await
            .map_err(surface)?;

        info!(id, "account updated");
        Ok(account.into())
    }

    // ── sessions ─────────────────────────────────────────────────────

    /// The account id named by a valid, unexpired session token.
    #[instrument(skip(self, token))]
    pub fn verify_session(&self, token: &str) -> ServiceResult<u64> {
        let claims = self.sessions.verify(token)?;
        Ok(claims.subject_id()?)
    }

    /// [`Chirpy::verify_session`] on a raw `Authorization` header value.
    pub fn authorize(&self, header: Option<&str>) -> ServiceResult<u64> {
        let token = bearer_token(header)?;
        self.verify_session(token)
    }

    async fn upgrade_hash(&self, account: &Account, secret: &str) -> ServiceResult<()> {
        let replacement = self.credentials.spawn_hash(secret.to_string()).await?;
        self.accounts
            .upgrade_secret_hash(account.id, &account.secret_hash, &replacement)
            .await
            .map_err(surface)?;
        info!(id = account.id, "credential hash upgraded");
        Ok(())
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

/// Convert a store error, logging genuine storage failures.
fn surface(err: StoreError) -> ServiceError {
    let err = ServiceError::from(err);
    if let ServiceError::Store(inner) = &err {
        error!(error = %inner, "storage failure");
    }
    err
}

// ── tests ────────────────────────────────────────────────────────────
