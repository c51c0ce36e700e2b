//! Generic create/read/list/update over one collection of the document.
//!
//! A [`Repository`] owns no state of its own. Every operation is a closure
//! handed to the [`DocumentStore`]; mutating operations use
//! [`DocumentStore::update`] so checks and writes share one exclusive
//! critical section.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use tracing::debug;

use crate::document::Record;
use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;

/// CRUD operations on the collection holding records of type `R`.
pub struct Repository<R> {
    store: DocumentStore,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Repository<R> {
    /// Create a repository backed by `store`.
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Insert a record built from a freshly reserved id.
    pub async fn create<F>(&self, build: F) -> StoreResult<R>
    where
        F: FnOnce(u64) -> R + Send + 'static,
    {
        self.create_with(move |id, _| Ok(build(id))).await
    }

    /// Insert a record built from a freshly reserved id, letting `build`
    /// inspect the existing records first and reject the insert.
    ///
    /// The inspection, id reservation, and write all happen under the
    /// store's exclusive lock. A rejection leaves the document untouched,
    /// including the id sequence.
    pub async fn create_with<F>(&self, build: F) -> StoreResult<R>
    where
        F: FnOnce(u64, &BTreeMap<u64, R>) -> StoreResult<R> + Send + 'static,
    {
        let record = self
            .store
            .update(move |doc| {
                let id = doc.next_id::<R>()?;
                let record = build(id, R::collection(doc))?;
                check_id::<R>(id, &record)?;
                R::collection_mut(doc).insert(id, record.clone());
                Ok(record)
            })
            .await?;

        debug!(collection = R::COLLECTION, id = record.id(), "record created");
        Ok(record)
    }

    /// Fetch a single record by id.
    pub async fn get(&self, id: u64) -> StoreResult<R> {
        self.store
            .read(move |doc| {
                R::collection(doc)
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| not_found::<R>(id.to_string()))
            })
            .await
    }

    /// All records in the collection, ascending by id.
    pub async fn list(&self) -> StoreResult<Vec<R>> {
        self.store
            .read(|doc| Ok(R::collection(doc).values().cloned().collect()))
            .await
    }

    /// Number of records in the collection.
    pub async fn count(&self) -> StoreResult<usize> {
        self.store.read(|doc| Ok(R::collection(doc).len())).await
    }

    /// First record whose `select`ed field equals `value`.
    ///
    /// Linear scan: the store keeps no secondary indexes.
    pub async fn find_by<V>(&self, select: fn(&R) -> &V, value: V) -> StoreResult<R>
    where
        V: PartialEq + std::fmt::Debug + Send + 'static,
    {
        self.store
            .read(move |doc| {
                R::collection(doc)
                    .values()
                    .find(|record| *select(record) == value)
                    .cloned()
                    .ok_or_else(|| not_found::<R>(format!("{value:?}")))
            })
            .await
    }

    /// Replace an existing record in place.
    pub async fn update(&self, record: R) -> StoreResult<R> {
        self.update_with(record.id(), move |_, _| Ok(record)).await
    }

    /// Replace the record at `id` with the result of `change`, which sees
    /// the current record and the whole collection and may reject.
    pub async fn update_with<F>(&self, id: u64, change: F) -> StoreResult<R>
    where
        F: FnOnce(&R, &BTreeMap<u64, R>) -> StoreResult<R> + Send + 'static,
    {
        let record = self
            .store
            .update(move |doc| {
                let records = R::collection(doc);
                let current = records
                    .get(&id)
                    .ok_or_else(|| not_found::<R>(id.to_string()))?;
                let updated = change(current, records)?;
                check_id::<R>(id, &updated)?;
                R::collection_mut(doc).insert(id, updated.clone());
                Ok(updated)
            })
            .await?;

        debug!(collection = R::COLLECTION, id, "record updated");
        Ok(record)
    }
}

/// Record ids are fixed once assigned.
fn check_id<R: Record>(expected: u64, record: &R) -> StoreResult<()> {
    if record.id() == expected {
        return Ok(());
    }
    Err(StoreError::InvalidRecordId {
        entity: R::COLLECTION,
        expected,
        found: record.id(),
    })
}

fn not_found<R: Record>(key: String) -> StoreError {
    StoreError::NotFound {
        entity: R::COLLECTION,
        key,
    }
}

// ── tests ────────────────────────────────────────────────────────────
