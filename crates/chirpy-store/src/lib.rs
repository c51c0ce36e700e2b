//! # chirpy-store
//!
//! Storage engine for Chirpy.
//!
//! All state lives in one JSON document on disk holding two collections:
//! messages (`chirps`) and accounts (`users`). Every handler shares one
//! [`DocumentStore`]; mutations run as a single read-modify-write cycle
//! under an exclusive lock, and every write atomically replaces the file.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  MessageStore / AccountStore (typed)    │
//! ├─────────────────────────────────────────┤
//! │  Repository<R: Record> (generic CRUD)   │
//! ├─────────────────────────────────────────┤
//! │  DocumentStore (RwLock + atomic write)  │
//! │  Migrations (versioned document schema) │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use chirpy_store::{DocumentStore, MessageStore};
//!
//! let store = DocumentStore::open_and_migrate("database.json").await?;
//! let messages = MessageStore::new(store.clone());
//! let chirp = messages.create("hello world").await?;
//! ```

pub mod account_store;
pub mod document;
pub mod error;
pub mod message_store;
pub mod migration;
pub mod repository;
pub mod store;

// ── re-exports ───────────────────────────────────────────────────────

pub use account_store::AccountStore;
pub use document::{Account, Document, Message, Record, SCHEMA_VERSION};
pub use error::{StoreError, StoreResult, ValidationError};
pub use message_store::{MAX_MESSAGE_LEN, MessageStore};
pub use repository::Repository;
pub use store::DocumentStore;
