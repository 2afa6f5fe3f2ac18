//! Storage abstraction for docs-rag.
//!
//! The [`DocumentStore`] trait is the only way the reconciler and the chat
//! responder reach persisted line records, enabling pluggable backends
//! (SQLite in the application crate, in-memory here for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{LineRecord, QueryHit};

/// A persistent, queryable collection of [`LineRecord`]s.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add`](DocumentStore::add) | Insert new records |
/// | [`get`](DocumentStore::get) | Fetch records, optionally filtered by filename |
/// | [`ids`](DocumentStore::ids) | List every id in the collection |
/// | [`update`](DocumentStore::update) | Replace the text of existing records |
/// | [`delete`](DocumentStore::delete) | Remove every record of one file |
/// | [`query`](DocumentStore::query) | Similarity search |
/// | [`count`](DocumentStore::count) | Number of stored records |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert records. Fails if any id already exists.
    async fn add(&self, records: &[LineRecord]) -> Result<()>;

    /// Records whose `filename` equals `filename`, or all records when
    /// `None`. Ordered by ascending numeric id.
    async fn get(&self, filename: Option<&str>) -> Result<Vec<LineRecord>>;

    /// Every id currently stored.
    async fn ids(&self) -> Result<Vec<String>>;

    /// Replace the text of each record in `ids` with the matching entry of
    /// `texts`. Metadata is left untouched.
    async fn update(&self, ids: &[String], texts: &[String]) -> Result<()>;

    /// Remove every record belonging to `filename`. Returns the number removed.
    async fn delete(&self, filename: &str) -> Result<usize>;

    /// Up to `top_n` records most similar to `text`, best first.
    async fn query(&self, text: &str, top_n: usize) -> Result<Vec<QueryHit>>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;
}
