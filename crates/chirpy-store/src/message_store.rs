//! Persistence for messages ("chirps").

use tracing::instrument;

use crate::document::Message;
use crate::error::{StoreResult, ValidationError};
use crate::repository::Repository;
use crate::store::DocumentStore;

/// Maximum message body length, in characters.
pub const MAX_MESSAGE_LEN: usize = 140;

/// Create/read/list operations on messages. Messages are immutable once
/// created.
#[derive(Clone)]
pub struct MessageStore {
    repo: Repository<Message>,
}

impl MessageStore {
    /// Create a new message store backed by `store`.
    pub fn new(store: DocumentStore) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    /// Store a new message.
    ///
    /// `body` must already be censored; bodies longer than
    /// [`MAX_MESSAGE_LEN`] characters are rejected.
    #[instrument(skip(self, body), fields(len = body.chars().count()))]
    pub async fn create(&self, body: &str) -> StoreResult<Message> {
        let len = body.chars().count();
        if len > MAX_MESSAGE_LEN {
            return Err(ValidationError::TooLong {
                field: "body",
                len,
                max: MAX_MESSAGE_LEN,
            }
            .into());
        }

        let body = body.to_string();
        self.repo.create(move |id| Message { id, body }).await
    }

    /// Fetch a single message by id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: u64) -> StoreResult<Message> {
        self.repo.get(id).await
    }

    /// All messages, ascending by id.
    #[instrument(skip(self))]
    pub async fn list(&self) -> StoreResult<Vec<Message>> {
        self.repo.list().await
    }

    /// Number of stored messages.
    pub async fn count(&self) -> StoreResult<usize> {
        self.repo.count().await
    }
}

// ── tests ────────────────────────────────────────────────────────────
