//! The single-file document store.
//!
//! [`DocumentStore`] owns the backing JSON file and the read/write lock that
//! guards it. All file I/O runs on tokio's blocking pool via
//! `tokio::task::spawn_blocking` so request tasks never block the runtime.
//!
//! Mutations go through [`DocumentStore::update`], which holds the exclusive
//! lock across the whole load → transform → replace cycle. Two concurrent
//! writers therefore never observe the same pre-mutation snapshot.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::migration;

/// Thread-safe handle to the backing document.
///
/// Cloning is cheap; all clones share the same lock, so every handler in a
/// process must be given a clone of one store rather than opening its own.
#[derive(Clone, Debug)]
pub struct DocumentStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    lock: RwLock<()>,
}

impl DocumentStore {
    /// Open the store at `path`, creating an empty document if the file
    /// does not exist yet.
    ///
    /// This call blocks briefly (file I/O), so call it during startup before
    /// entering the main async loop, or wrap it in `spawn_blocking` yourself.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        info!(path = %path.display(), "opening document store");

        let store = Self {
            inner: Arc::new(Inner {
                path,
                lock: RwLock::new(()),
            }),
        };
        store.ensure_initialized()?;
        Ok(store)
    }

    /// Open the store and upgrade an older on-disk document.
    pub async fn open_and_migrate(path: impl AsRef<Path> + Send + 'static) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let store = tokio::task::spawn_blocking(move || Self::open(&path)).await??;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Create the backing file holding an empty document if it is missing.
    ///
    /// Idempotent. Blocking; safe to call at every process start.
    pub fn ensure_initialized(&self) -> StoreResult<()> {
        let _guard = self
            .inner
            .lock
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

        if self.inner.path.exists() {
            debug!(path = %self.inner.path.display(), "document already present");
            return Ok(());
        }

        write_document(&self.inner.path, &Document::empty())?;
        info!(path = %self.inner.path.display(), "initialized empty document");
        Ok(())
    }

    /// Upgrade the on-disk document to the current schema version.
    #[instrument(skip(self), fields(path = %self.inner.path.display()))]
    pub async fn run_migrations(&self) -> StoreResult<()> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let _guard = inner
                .lock
                .write()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

            let raw = fs::read(&inner.path)?;
            let value: serde_json::Value =
                serde_json::from_slice(&raw).map_err(|e| StoreError::MalformedDocument {
                    reason: e.to_string(),
                })?;
            let (value, changed) = migration::upgrade(value)?;
            if changed {
                let doc = decode(value)?;
                write_document(&inner.path, &doc)?;
                info!("document upgraded on disk");
            }
            Ok(())
        })
        .await?
    }

    /// Load the whole document under a shared lock.
    pub async fn load(&self) -> StoreResult<Document> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let _guard = inner
                .lock
                .read()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            read_document(&inner.path)
        })
        .await?
    }

    /// Overwrite the whole document under an exclusive lock.
    ///
    /// Prefer [`DocumentStore::update`] for mutations: a separate `load` and
    /// `replace` do not form one critical section.
    pub async fn replace(&self, doc: Document) -> StoreResult<()> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let _guard = inner
                .lock
                .write()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            write_document(&inner.path, &doc)
        })
        .await?
    }

    /// Run `f` against the current document under a shared lock.
    pub async fn read<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Document) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let _guard = inner
                .lock
                .read()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            let doc = read_document(&inner.path)?;
            f(&doc)
        })
        .await?
    }

    /// Run one atomic read-modify-write cycle.
    ///
    /// The exclusive lock is held while the document is loaded, while `f`
    /// transforms it, and while the result is written back. If `f` returns
    /// an error nothing is written and the error is returned unchanged.
    pub async fn update<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Document) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let _guard = inner
                .lock
                .write()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            let mut doc = read_document(&inner.path)?;
            let out = f(&mut doc)?;
            write_document(&inner.path, &doc)?;
            Ok(out)
        })
        .await?
    }
}

// ── file I/O (caller holds the lock) ─────────────────────────────────

fn read_document(path: &Path) -> StoreResult<Document> {
    let raw = fs::read(path)?;
    let value: serde_json::Value =
        serde_json::from_slice(&raw).map_err(|e| StoreError::MalformedDocument {
            reason: e.to_string(),
        })?;
    let (value, _) = migration::upgrade(value)?;
    decode(value)
}

fn decode(value: serde_json::Value) -> StoreResult<Document> {
    let doc: Document = serde_json::from_value(value).map_err(|e| StoreError::MalformedDocument {
        reason: e.to_string(),
    })?;
    doc.check_ids()?;
    Ok(doc)
}

/// Write `doc` to a temporary file next to `path`, sync it, and rename it
/// over `path`. Readers see either the old or the new document, never a
/// truncated one.
fn write_document(path: &Path, doc: &Document) -> StoreResult<()> {
    let data = serde_json::to_vec(doc)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    debug!(path = %path.display(), bytes = data.len(), "document written");
    Ok(())
}

// ── tests ────────────────────────────────────────────────────────────
