//! Persistence for accounts.
//!
//! The store only ever sees credential hashes; hashing and verification
//! live in `chirpy-auth`. Email uniqueness is checked inside the same
//! exclusive critical section as the write, so two concurrent sign-ups with
//! one email cannot both succeed.

use std::collections::BTreeMap;

use tracing::instrument;

use crate::document::Account;
use crate::error::{StoreResult, ValidationError};
use crate::repository::Repository;
use crate::store::DocumentStore;

/// CRUD operations on accounts.
#[derive(Clone)]
pub struct AccountStore {
    repo: Repository<Account>,
}

impl AccountStore {
    /// Create a new account store backed by `store`.
    pub fn new(store: DocumentStore) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    /// Create a new account with an already-hashed secret.
    ///
    /// Returns [`ValidationError::DuplicateEmail`] if the email is taken.
    #[instrument(skip(self, secret_hash))]
    pub async fn create(&self, email: &str, secret_hash: &str) -> StoreResult<Account> {
        require("email", email)?;
        require("secret_hash", secret_hash)?;

        let email = email.to_string();
        let secret_hash = secret_hash.to_string();
        self.repo
            .create_with(move |id, accounts| {
                ensure_email_free(accounts, &email, None)?;
                Ok(Account {
                    id,
                    email,
                    secret_hash,
                })
            })
            .await
    }

    /// Fetch a single account by id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: u64) -> StoreResult<Account> {
        self.repo.get(id).await
    }

    /// Fetch the account registered under `email`.
    #[instrument(skip(self))]
    pub async fn get_by_email(&self, email: &str) -> StoreResult<Account> {
        require("email", email)?;
        self.repo.find_by(email_of, email.to_string()).await
    }

    /// Replace an account's email and secret hash.
    ///
    /// Keeping the current email is allowed; taking another account's email
    /// is rejected with [`ValidationError::DuplicateEmail`].
    #[instrument(skip(self, secret_hash))]
    pub async fn update(&self, id: u64, email: &str, secret_hash: &str) -> StoreResult<Account> {
        require("email", email)?;
        require("secret_hash", secret_hash)?;

        let email = email.to_string();
        let secret_hash = secret_hash.to_string();
        self.repo
            .update_with(id, move |current, accounts| {
                ensure_email_free(accounts, &email, Some(current.id))?;
                Ok(Account {
                    id: current.id,
                    email,
                    secret_hash,
                })
            })
            .await
    }

    /// Swap the stored hash for `replacement` if it is still `previous`.
    ///
    /// Returns the account as stored afterwards. A concurrent update that
    /// already changed the hash wins; the account then comes back unchanged.
    #[instrument(skip(self, previous, replacement))]
    pub async fn upgrade_secret_hash(
        &self,
        id: u64,
        previous: &str,
        replacement: &str,
    ) -> StoreResult<Account> {
        require("secret_hash", replacement)?;

        let previous = previous.to_string();
        let replacement = replacement.to_string();
        self.repo
            .update_with(id, move |current, _| {
                let mut account = current.clone();
                if account.secret_hash == previous {
                    account.secret_hash = replacement;
                }
                Ok(account)
            })
            .await
    }

    /// All accounts, ascending by id.
    pub async fn list(&self) -> StoreResult<Vec<Account>> {
        self.repo.list().await
    }

    /// Number of registered accounts.
    pub async fn count(&self) -> StoreResult<usize> {
        self.repo.count().await
    }
}

fn email_of(account: &Account) -> &String {
    &account.email
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

fn ensure_email_free(
    accounts: &BTreeMap<u64, Account>,
    email: &str,
    except: Option<u64>,
) -> Result<(), ValidationError> {
    let taken = accounts
        .values()
        .any(|a| a.email == email && Some(a.id) != except);
    if taken {
        return Err(ValidationError::DuplicateEmail {
            email: email.to_string(),
        });
    }
    Ok(())
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn setup() -> (tempfile::TempDir, AccountStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("database.json")).unwrap();
        (dir, AccountStore::new(store))
    }

    #[tokio::test]
    async fn create_and_lookup_account() {
        let (_dir, accounts) = setup();

        let created = accounts.create("walt@breakingbad.com", "hash-1").await.unwrap();
        assert_eq!(created.id, 1);

        let by_id = accounts.get(created.id).await.unwrap();
        assert_eq!(by_id, created);

        let by_email = accounts.get_by_email("walt@breakingbad.com").await.unwrap();
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let (_dir, accounts) = setup();
        accounts.create("a@x.com", "p").await.unwrap();

        match accounts.create("a@x.com", "q").await.unwrap_err() {
            StoreError::Validation(ValidationError::DuplicateEmail { email }) => {
                assert_eq!(email, "a@x.com");
            }
            other => panic!("expected DuplicateEmail, got: {other}"),
        }

        let matching = accounts
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.email == "a@x.com")
            .count();
        assert_eq!(matching, 1);
    }

    #[tokio::test]
    async fn empty_fields_rejected() {
        let (_dir, accounts) = setup();

        let err = accounts.create("", "hash").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::EmptyField { field: "email" })
        ));

        let err = accounts.create("a@x.com", "").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::EmptyField {
                field: "secret_hash"
            })
        ));

        let err = accounts.get_by_email("").await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(accounts.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let (_dir, accounts) = setup();
        accounts.create("a@x.com", "h").await.unwrap();

        let err = accounts.get_by_email("b@x.com").await.unwrap_err();
        assert!(err.is_not_found(), "got: {err}");
    }

    #[tokio::test]
    async fn update_changes_email_and_hash() {
        let (_dir, accounts) = setup();
        let created = accounts.create("old@x.com", "old-hash").await.unwrap();

        let updated = accounts
            .update(created.id, "new@x.com", "new-hash")
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.email, "new@x.com");
        assert_eq!(updated.secret_hash, "new-hash");

        assert!(accounts.get_by_email("old@x.com").await.unwrap_err().is_not_found());
        assert_eq!(accounts.get_by_email("new@x.com").await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn update_may_keep_own_email() {
        let (_dir, accounts) = setup();
        let created = accounts.create("same@x.com", "h1").await.unwrap();

        let updated = accounts.update(created.id, "same@x.com", "h2").await.unwrap();
        assert_eq!(updated.secret_hash, "h2");
    }

    #[tokio::test]
    async fn update_cannot_take_another_email() {
        let (_dir, accounts) = setup();
        accounts.create("first@x.com", "h").await.unwrap();
        let second = accounts.create("second@x.com", "h").await.unwrap();

        let err = accounts
            .update(second.id, "first@x.com", "h")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::DuplicateEmail { .. })
        ));
        assert_eq!(accounts.get(second.id).await.unwrap().email, "second@x.com");
    }

    #[tokio::test]
    async fn upgrade_secret_hash_swaps_matching_hash() {
        let (_dir, accounts) = setup();
        let created = accounts.create("a@x.com", "legacy").await.unwrap();

        let upgraded = accounts
            .upgrade_secret_hash(created.id, "legacy", "modern")
            .await
            .unwrap();
        assert_eq!(upgraded.secret_hash, "modern");
        assert_eq!(upgraded.email, "a@x.com");
        assert_eq!(accounts.get(created.id).await.unwrap().secret_hash, "modern");
    }

    #[tokio::test]
    async fn upgrade_secret_hash_loses_to_newer_update() {
        let (_dir, accounts) = setup();
        let created = accounts.create("a@x.com", "legacy").await.unwrap();
        accounts
            .update(created.id, "b@x.com", "changed")
            .await
            .unwrap();

        let after = accounts
            .upgrade_secret_hash(created.id, "legacy", "modern")
            .await
            .unwrap();
        assert_eq!(after.secret_hash, "changed");
        assert_eq!(after.email, "b@x.com");
    }

    #[tokio::test]
    async fn update_unknown_account_is_not_found() {
        let (_dir, accounts) = setup();
        let err = accounts.update(5, "a@x.com", "h").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
