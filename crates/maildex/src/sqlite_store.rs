//! SQLite-backed [`VectorStore`] implementation.
//!
//! Each collection is one table carrying the full chunk schema plus the
//! embedding as a little-endian f32 BLOB. Similarity search is a
//! brute-force cosine scan over the collection: decode every vector,
//! score, sort, truncate. At the corpus sizes this engine targets that
//! stays comfortably inside the retrieval latency budget and needs no
//! auxiliary index structure.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use maildex_core::embed::{blob_to_vec, cosine_distance, vec_to_blob};
use maildex_core::models::{ChunkRecord, Granularity, SourceRef, SourceType};
use maildex_core::store::{SimilarHit, VectorStore};

use crate::migrate;

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_chunk(row: &sqlx::sqlite::SqliteRow, granularity: Granularity) -> Result<ChunkRecord> {
    let source_type: String = row.get("source_type");
    let source_ref: String = row.get("source_ref");

    let source_ref = match source_type.parse::<SourceType>()? {
        SourceType::Email => SourceRef::Email {
            message_id: source_ref,
        },
        SourceType::Pdf => SourceRef::Pdf {
            file_path: source_ref,
        },
    };

    Ok(ChunkRecord {
        id: row.get("id"),
        text: row.get("text"),
        source_title: row.get("source_title"),
        source_ref,
        sender: row.get("sender"),
        date: row.get("date"),
        granularity,
        chunk_index: row.get("chunk_index"),
        doc_hash: row.get("doc_hash"),
    })
}

#[async_trait]
impl VectorStore for SqliteStore {
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

        let table = granularity.collection_name();
        let mut tx = self.pool.begin().await?;

        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            let blob = vec_to_blob(vector);
            sqlx::query(&format!(
                r#"
                INSERT INTO {table} (id, text, source_type, source_title, source_ref,
                                     sender, date, chunk_index, doc_hash, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    text = excluded.text,
                    source_type = excluded.source_type,
                    source_title = excluded.source_title,
                    source_ref = excluded.source_ref,
                    sender = excluded.sender,
                    date = excluded.date,
                    chunk_index = excluded.chunk_index,
                    doc_hash = excluded.doc_hash,
                    embedding = excluded.embedding
                "#
            ))
            .bind(&chunk.id)
            .bind(&chunk.text)
            .bind(chunk.source_type().as_str())
            .bind(&chunk.source_title)
            .bind(chunk.source_ref.key())
            .bind(&chunk.sender)
            .bind(&chunk.date)
            .bind(chunk.chunk_index)
            .bind(&chunk.doc_hash)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn similarity_search(
        &self,
        granularity: Granularity,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarHit>> {
        let table = granularity.collection_name();
        let rows = sqlx::query(&format!(
            "SELECT id, text, source_type, source_title, source_ref, sender, date, \
             chunk_index, doc_hash, embedding FROM {table}"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let vector = blob_to_vec(&blob);
            hits.push(SimilarHit {
                chunk: row_to_chunk(row, granularity)?,
                distance: cosine_distance(query_vec, &vector),
            });
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn contains_doc_hash(&self, granularity: Granularity, doc_hash: &str) -> Result<bool> {
        let table = granularity.collection_name();
        let exists: i64 = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {table} WHERE doc_hash = ?)"
        ))
        .bind(doc_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists != 0)
    }

    async fn chunks_for_source(
        &self,
        granularity: Granularity,
        source_key: &str,
    ) -> Result<Vec<ChunkRecord>> {
        let table = granularity.collection_name();
        let rows = sqlx::query(&format!(
            "SELECT id, text, source_type, source_title, source_ref, sender, date, \
             chunk_index, doc_hash, embedding FROM {table} \
             WHERE source_ref = ? ORDER BY chunk_index ASC"
        ))
        .bind(source_key)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| row_to_chunk(row, granularity)).collect()
    }

    async fn count(&self, granularity: Granularity) -> Result<u64> {
        let table = granularity.collection_name();
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_source_type(
        &self,
        granularity: Granularity,
        source_type: SourceType,
    ) -> Result<u64> {
        let table = granularity.collection_name();
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {table} WHERE source_type = ?"
        ))
        .bind(source_type.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn clear(&self) -> Result<()> {
        // Drop and recreate rather than DELETE: a clear should also
        // reset any schema drift from older versions.
        for granularity in [Granularity::Fine, Granularity::Coarse] {
            sqlx::query(&format!(
                "DROP TABLE IF EXISTS {}",
                granularity.collection_name()
            ))
            .execute(&self.pool)
            .await?;
            migrate::create_collection(&self.pool, granularity).await?;
        }
        Ok(())
    }
}
