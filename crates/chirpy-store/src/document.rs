//! The persisted document and the record kinds it holds.
//!
//! The whole store is one JSON object:
//!
//! ```text
//! {
//!   "schema_version": 1,
//!   "sequences": { "chirps": 2, "users": 1 },
//!   "chirps": { "1": {"id": 1, "body": "..."}, "2": {...} },
//!   "users":  { "1": {"id": 1, "email": "...", "secret_hash": "..."} }
//! }
//! ```
//!
//! Each collection is a map from a positive integer id to a record. The
//! `sequences` map holds the last id issued per collection so ids are never
//! derived from the current record count.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

// ═══════════════════════════════════════════════════════════════════════
//  Records
// ═══════════════════════════════════════════════════════════════════════

/// A short message ("chirp"). Bodies arrive already censored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub body: String,
}

/// A registered account. `secret_hash` is an opaque credential hash, never
/// the plaintext secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub email: String,
    pub secret_hash: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("secret_hash", &"<redacted>")
            .finish()
    }
}

/// A record kind stored in one named collection of the [`Document`].
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection key in the document, also used as the entity name in
    /// errors and logs.
    const COLLECTION: &'static str;

    fn id(&self) -> u64;

    fn collection(doc: &Document) -> &BTreeMap<u64, Self>;

    fn collection_mut(doc: &mut Document) -> &mut BTreeMap<u64, Self>;
}

impl Record for Message {
    const COLLECTION: &'static str = "chirps";

    fn id(&self) -> u64 {
        self.id
    }

    fn collection(doc: &Document) -> &BTreeMap<u64, Self> {
        &doc.messages
    }

    fn collection_mut(doc: &mut Document) -> &mut BTreeMap<u64, Self> {
        &mut doc.messages
    }
}

impl Record for Account {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> u64 {
        self.id
    }

    fn collection(doc: &Document) -> &BTreeMap<u64, Self> {
        &doc.accounts
    }

    fn collection_mut(doc: &mut Document) -> &mut BTreeMap<u64, Self> {
        &mut doc.accounts
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Document
// ═══════════════════════════════════════════════════════════════════════

/// The entire persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub schema_version: u32,
    /// Last id issued per collection.
    #[serde(default)]
    pub sequences: BTreeMap<String, u64>,
    #[serde(rename = "chirps", default)]
    pub messages: BTreeMap<u64, Message>,
    #[serde(rename = "users", default)]
    pub accounts: BTreeMap<u64, Account>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            sequences: BTreeMap::new(),
            messages: BTreeMap::new(),
            accounts: BTreeMap::new(),
        }
    }
}

impl Document {
    /// An empty document at the current schema version.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reserve the next id for collection `R`.
    ///
    /// The sequence only moves forward and never lands on an id already
    /// present, even if the stored sequence lags behind the records.
    /// Fails with [`StoreError::IdsExhausted`] instead of wrapping; the
    /// sequence is left untouched in that case.
    pub fn next_id<R: Record>(&mut self) -> StoreResult<u64> {
        let highest = R::collection(self).keys().next_back().copied().unwrap_or(0);
        let seq = self.sequences.entry(R::COLLECTION.to_string()).or_insert(0);
        let next = (*seq)
            .max(highest)
            .checked_add(1)
            .ok_or(StoreError::IdsExhausted {
                entity: R::COLLECTION,
            })?;
        *seq = next;
        Ok(next)
    }

    /// Last id issued for collection `R` (0 if none).
    pub fn last_id<R: Record>(&self) -> u64 {
        self.sequences.get(R::COLLECTION).copied().unwrap_or(0)
    }

    /// Check that every record sits under its own, positive id.
    pub fn check_ids(&self) -> StoreResult<()> {
        check_collection::<Message>(self)?;
        check_collection::<Account>(self)
    }
}

fn check_collection<R: Record>(doc: &Document) -> StoreResult<()> {
    for (&key, record) in R::collection(doc) {
        if key == 0 {
            return Err(StoreError::MalformedDocument {
                reason: format!("{}: id 0 is not a valid id", R::COLLECTION),
            });
        }
        if record.id() != key {
            return Err(StoreError::MalformedDocument {
                reason: format!(
                    "{}: record under key {key} carries id {}",
                    R::COLLECTION,
                    record.id()
                ),
            });
        }
    }
    Ok(())
}

// ── tests ────────────────────────────────────────────────────────────
