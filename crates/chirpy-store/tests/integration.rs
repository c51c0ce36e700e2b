//! Integration tests for the chirpy-store crate.
//!
//! These tests exercise the store against a real document on disk (via
//! tempfile), with many concurrent tasks contending for the same file.

use std::collections::HashSet;

use chirpy_store::{
    AccountStore, Document, DocumentStore, MessageStore, SCHEMA_VERSION, StoreError,
    ValidationError,
};

fn open_store() -> (tempfile::TempDir, DocumentStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::open(dir.path().join("database.json")).unwrap();
    (dir, store)
}

// ═══════════════════════════════════════════════════════════════════════
//  Concurrency
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_never_collide() {
    const N: usize = 64;
    let (_dir, store) = open_store();
    let messages = MessageStore::new(store.clone());

    let mut handles = Vec::with_capacity(N);
    for i in 0..N {
        let messages = messages.clone();
        handles.push(tokio::spawn(async move {
            messages.create(&format!("message {i}")).await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let message = handle.await.unwrap().unwrap();
        assert!(ids.insert(message.id), "duplicate id {}", message.id);
    }

    assert_eq!(ids.len(), N);
    assert_eq!(ids.iter().copied().max(), Some(N as u64));

    let stored = messages.list().await.unwrap();
    assert_eq!(stored.len(), N);
    let bodies: HashSet<String> = stored.into_iter().map(|m| m.body).collect();
    assert_eq!(bodies.len(), N, "no record was overwritten");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_signups_admit_one() {
    const N: usize = 16;
    let (_dir, store) = open_store();
    let accounts = AccountStore::new(store);

    let mut handles = Vec::with_capacity(N);
    for i in 0..N {
        let accounts = accounts.clone();
        handles.push(tokio::spawn(async move {
            accounts.create("race@x.com", &format!("hash-{i}")).await
        }));
    }

    let mut created = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(StoreError::Validation(ValidationError::DuplicateEmail { .. })) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(duplicates, N - 1);
    assert_eq!(accounts.count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_and_writers_interleave() {
    let (_dir, store) = open_store();
    let messages = MessageStore::new(store.clone());

    let writer = {
        let messages = messages.clone();
        tokio::spawn(async move {
            for i in 0..20 {
                messages.create(&format!("w{i}")).await.unwrap();
            }
        })
    };
    let reader = {
        let store = store.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                // Every snapshot is a complete document.
                let doc = store.load().await.unwrap();
                assert_eq!(doc.schema_version, SCHEMA_VERSION);
                assert_eq!(doc.messages.len() as u64, doc.last_id::<chirpy_store::Message>());
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(messages.count().await.unwrap(), 20);
}

// ═══════════════════════════════════════════════════════════════════════
//  Document lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.json");

    {
        let store = DocumentStore::open(&path).unwrap();
        MessageStore::new(store.clone()).create("persisted").await.unwrap();
        AccountStore::new(store).create("a@x.com", "h").await.unwrap();
    }

    let store = DocumentStore::open_and_migrate(path).await.unwrap();
    let messages = MessageStore::new(store.clone());
    let accounts = AccountStore::new(store);

    assert_eq!(messages.get(1).await.unwrap().body, "persisted");
    assert_eq!(accounts.get_by_email("a@x.com").await.unwrap().id, 1);

    // Sequences continue after a reopen.
    assert_eq!(messages.create("next").await.unwrap().id, 2);
}

#[tokio::test]
async fn on_disk_shape_matches_contract() {
    let (_dir, store) = open_store();
    MessageStore::new(store.clone()).create("hi").await.unwrap();
    AccountStore::new(store.clone()).create("a@x.com", "hash").await.unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
    assert_eq!(raw["schema_version"], SCHEMA_VERSION);
    assert_eq!(raw["chirps"]["1"], serde_json::json!({"id": 1, "body": "hi"}));
    assert_eq!(
        raw["users"]["1"],
        serde_json::json!({"id": 1, "email": "a@x.com", "secret_hash": "hash"})
    );
}

#[tokio::test]
async fn legacy_document_is_readable_and_upgraded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.json");
    std::fs::write(
        &path,
        r#"{"chirps":{"1":{"id":1,"body":"old"},"2":{"id":2,"body":"older"}},
            "users":{"1":{"id":1,"email":"legacy@x.com","password":"$2a$10$legacy"}}}"#,
    )
    .unwrap();

    // Readable before the on-disk upgrade.
    let store = DocumentStore::open(&path).unwrap();
    let accounts = AccountStore::new(store.clone());
    let legacy = accounts.get_by_email("legacy@x.com").await.unwrap();
    assert_eq!(legacy.secret_hash, "$2a$10$legacy");

    store.run_migrations().await.unwrap();
    let messages = MessageStore::new(store);
    assert_eq!(messages.create("new").await.unwrap().id, 3);
}

#[tokio::test]
async fn store_errors_propagate_unchanged() {
    let (_dir, store) = open_store();
    std::fs::write(store.path(), b"[]").unwrap();

    let messages = MessageStore::new(store.clone());
    let err = messages.list().await.unwrap_err();
    assert!(matches!(err, StoreError::MalformedDocument { .. }), "got: {err}");

    let err = messages.create("x").await.unwrap_err();
    assert!(matches!(err, StoreError::MalformedDocument { .. }), "got: {err}");

    // The malformed file was not overwritten by the failed create.
    assert_eq!(std::fs::read(store.path()).unwrap(), b"[]");

    store.replace(Document::empty()).await.unwrap();
    assert!(messages.list().await.unwrap().is_empty());
}
