//! In-memory [`VectorStore`] implementation for tests.
//!
//! Uses `Vec`s behind `std::sync::RwLock` for thread safety. Similarity
//! search is brute-force cosine distance over all stored vectors, which
//! matches the SQLite backend's scan semantics at test scale.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embed::cosine_distance;
use crate::models::{ChunkRecord, Granularity, SourceType};

use super::{SimilarHit, VectorStore};

struct StoredChunk {
    chunk: ChunkRecord,
    vector: Vec<f32>,
}

/// In-memory store holding both collections.
#[derive(Default)]
pub struct InMemoryStore {
    fine: RwLock<Vec<StoredChunk>>,
    coarse: RwLock<Vec<StoredChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, granularity: Granularity) -> &RwLock<Vec<StoredChunk>> {
        match granularity {
            Granularity::Fine => &self.fine,
            Granularity::Coarse => &self.coarse,
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert_chunks(
        &self,
        granularity: Granularity,
        chunks: &[ChunkRecord],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        anyhow::ensure!(
            chunks.len() == vectors.len(),
            "chunk/vector length mismatch: {} vs {}",
            chunks.len(),
            vectors.len()
        );

        let mut stored = self.collection(granularity).write().unwrap();
        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            stored.retain(|sc| sc.chunk.id != chunk.id);
            stored.push(StoredChunk {
                chunk: chunk.clone(),
                vector: vector.clone(),
            });
        }
        Ok(())
    }

    async fn similarity_search(
        &self,
        granularity: Granularity,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarHit>> {
        let stored = self.collection(granularity).read().unwrap();
        let mut hits: Vec<SimilarHit> = stored
            .iter()
            .map(|sc| SimilarHit {
                chunk: sc.chunk.clone(),
                distance: cosine_distance(query_vec, &sc.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn contains_doc_hash(&self, granularity: Granularity, doc_hash: &str) -> Result<bool> {
        let stored = self.collection(granularity).read().unwrap();
        Ok(stored.iter().any(|sc| sc.chunk.doc_hash == doc_hash))
    }

    async fn chunks_for_source(
        &self,
        granularity: Granularity,
        source_key: &str,
    ) -> Result<Vec<ChunkRecord>> {
        let stored = self.collection(granularity).read().unwrap();
        let mut chunks: Vec<ChunkRecord> = stored
            .iter()
            .filter(|sc| sc.chunk.source_ref.key() == source_key)
            .map(|sc| sc.chunk.clone())
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn count(&self, granularity: Granularity) -> Result<u64> {
        Ok(self.collection(granularity).read().unwrap().len() as u64)
    }

    async fn count_source_type(
        &self,
        granularity: Granularity,
        source_type: SourceType,
    ) -> Result<u64> {
        let stored = self.collection(granularity).read().unwrap();
        Ok(stored
            .iter()
            .filter(|sc| sc.chunk.source_type() == source_type)
            .count() as u64)
    }

    async fn clear(&self) -> Result<()> {
        self.fine.write().unwrap().clear();
        self.coarse.write().unwrap().clear();
        Ok(())
    }
}
