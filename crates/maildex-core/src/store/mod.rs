//! Storage abstraction for the two index collections.
//!
//! The [`VectorStore`] trait defines every operation the indexing and
//! retrieval pipeline needs against the fine and coarse collections,
//! enabling pluggable backends (SQLite, in-memory for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! Reads are safe for unbounded concurrent callers; writes are keyed by
//! deterministic chunk ids so duplicate writes converge instead of
//! duplicating rows.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ChunkRecord, Granularity, SourceType};

/// A candidate returned from similarity search: the stored chunk and its
/// cosine distance from the query vector (smaller is closer).
#[derive(Debug, Clone)]
pub struct SimilarHit {
    pub chunk: ChunkRecord,
    pub distance: f64,
}

/// Abstract storage backend holding the fine and coarse collections.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_chunks`](VectorStore::upsert_chunks) | Write a chunk set with its vectors |
/// | [`similarity_search`](VectorStore::similarity_search) | Nearest neighbors by cosine distance |
/// | [`contains_doc_hash`](VectorStore::contains_doc_hash) | Dedup probe for at-most-once indexing |
/// | [`chunks_for_source`](VectorStore::chunks_for_source) | Point lookup by source ref |
/// | [`count`](VectorStore::count) | Collection size |
/// | [`count_source_type`](VectorStore::count_source_type) | Per-source-type size |
/// | [`clear`](VectorStore::clear) | Drop and recreate both collections |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or update chunk records in a collection, with one
    /// embedding vector per chunk (same order, same length).
    async fn upsert_chunks(
        &self,
        granularity: Granularity,
        chunks: &[ChunkRecord],
        vectors: &[Vec<f32>],
    ) -> Result<()>;

    /// Return up to `limit` nearest chunks to `query_vec` by cosine
    /// distance, closest first.
    async fn similarity_search(
        &self,
        granularity: Granularity,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarHit>>;

    /// Whether any chunk in the collection carries this doc hash.
    async fn contains_doc_hash(&self, granularity: Granularity, doc_hash: &str) -> Result<bool>;

    /// All chunks in the collection whose source ref key matches,
    /// ordered by chunk index.
    async fn chunks_for_source(
        &self,
        granularity: Granularity,
        source_key: &str,
    ) -> Result<Vec<ChunkRecord>>;

    /// Number of chunks in the collection.
    async fn count(&self, granularity: Granularity) -> Result<u64>;

    /// Number of chunks in the collection from the given source type.
    async fn count_source_type(
        &self,
        granularity: Granularity,
        source_type: SourceType,
    ) -> Result<u64>;

    /// Drop all chunks from both collections.
    async fn clear(&self) -> Result<()>;
}
