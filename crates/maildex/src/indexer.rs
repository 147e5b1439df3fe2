//! Document ingestion into the dual-granularity index.
//!
//! Orchestrates the full index-time flow: cleaning → length gate →
//! doc-hash dedup probe → chunking (fine + coarse) → batched embedding →
//! upsert. Each public entry point is non-throwing: failures are logged
//! and surface as `false` or a `failed` counter, never as a panic or a
//! propagated error, so a degraded knowledge base never takes the host
//! down with it.
//!
//! # Dedup
//!
//! `doc_hash` is a SHA-256 over `(source key, cleaned text)`. The probe
//! runs per granularity collection: a partial failure (fine written,
//! coarse not) is repaired by a retry that re-attempts only the missing
//! granularity. Chunk ids are deterministic, and the store upserts by
//! id, so concurrent workers racing on the same new document converge
//! on identical rows.

use anyhow::Result;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use maildex_core::chunk::chunk_text;
use maildex_core::clean::clean_document;
use maildex_core::embed::Embedder;
use maildex_core::models::{
    document_hash, BatchStats, ChunkRecord, EmailRecord, Granularity, IndexStats, SourceRef,
    SourceType,
};
use maildex_core::store::VectorStore;

use crate::sources::extract_pdf_text;

/// Documents shorter than this after cleaning are skipped (no-op).
const MIN_DOC_CHARS: usize = 50;
/// PDFs whose extracted text is shorter than this fail the index call.
const MIN_PDF_CHARS: usize = 100;
/// Batch progress is logged every this many documents.
const PROGRESS_INTERVAL: u64 = 100;

/// How a single document's indexing attempt ended.
#[derive(Debug, PartialEq, Eq)]
enum IndexOutcome {
    /// New chunks were written.
    Indexed { fine: usize, coarse: usize },
    /// Both collections already carry this document's hash.
    AlreadyIndexed,
    /// Cleaned content below the minimum; nothing to index.
    TooShort,
}

/// Ingestion service owning a store handle and an embedding gateway.
///
/// Explicitly constructed and dependency-injected; lifecycle is managed
/// by the host application.
pub struct Indexer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl Indexer {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Index a single email. Returns `true` on success, including the
    /// no-op cases (already indexed, too short after cleaning).
    pub async fn index_email(&self, email: &EmailRecord) -> bool {
        match self.try_index_email(email).await {
            Ok(outcome) => {
                debug!(message_id = %email.id, ?outcome, "indexed email");
                true
            }
            Err(e) => {
                error!(message_id = %email.id, error = %e, "failed to index email");
                false
            }
        }
    }

    /// Index a PDF file. Returns `false` for unreadable or
    /// insufficient-text PDFs as well as backend failures.
    pub async fn index_pdf(&self, path: &Path, title: Option<&str>) -> bool {
        match self.try_index_pdf(path, title).await {
            Ok(outcome) => {
                info!(path = %path.display(), ?outcome, "indexed pdf");
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to index pdf");
                false
            }
        }
    }

    /// Index a set of emails, isolating per-document failures.
    ///
    /// The abort flag is checked once per document boundary so an
    /// operator can stop a long reindex; partial progress is preserved
    /// and a rerun is idempotent thanks to the dedup probe.
    pub async fn batch_index_emails(
        &self,
        emails: &[EmailRecord],
        abort: &AtomicBool,
    ) -> BatchStats {
        let mut stats = BatchStats::default();
        info!(count = emails.len(), "starting batch indexing");

        for email in emails {
            if abort.load(Ordering::Relaxed) {
                warn!(
                    processed = stats.processed,
                    "batch indexing aborted; partial progress kept"
                );
                break;
            }

            stats.processed += 1;
            match self.try_index_email(email).await {
                Ok(IndexOutcome::Indexed { .. }) => stats.success += 1,
                Ok(IndexOutcome::AlreadyIndexed) | Ok(IndexOutcome::TooShort) => {
                    stats.skipped += 1;
                }
                Err(e) => {
                    error!(message_id = %email.id, error = %e, "failed to index email");
                    stats.failed += 1;
                }
            }

            if stats.processed % PROGRESS_INTERVAL == 0 {
                info!(
                    processed = stats.processed,
                    total = emails.len(),
                    "batch indexing progress"
                );
            }
        }

        info!(?stats, "batch indexing complete");
        stats
    }

    /// Current index counts; zeros (with an error log) if the store is
    /// unreachable.
    pub async fn index_stats(&self) -> IndexStats {
        match self.try_index_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "failed to read index stats");
                IndexStats::default()
            }
        }
    }

    /// Drop and recreate both collections.
    pub async fn clear_index(&self) -> bool {
        match self.store.clear().await {
            Ok(()) => {
                info!("index cleared");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to clear index");
                false
            }
        }
    }

    async fn try_index_email(&self, email: &EmailRecord) -> Result<IndexOutcome> {
        let full_content = format!(
            "Subject: {}\nFrom: {}\nDate: {}\n\n{}",
            email.subject, email.sender, email.date_received, email.body_text
        );
        let cleaned = clean_document(&full_content);

        if cleaned.len() < MIN_DOC_CHARS {
            return Ok(IndexOutcome::TooShort);
        }

        let source_ref = SourceRef::Email {
            message_id: email.id.clone(),
        };
        let sender = (!email.sender.is_empty()).then(|| email.sender.clone());
        let date = (!email.date_received.is_empty()).then(|| email.date_received.clone());

        self.index_document(source_ref, &email.subject, sender, date, &cleaned)
            .await
    }

    async fn try_index_pdf(&self, path: &Path, title: Option<&str>) -> Result<IndexOutcome> {
        let text = extract_pdf_text(path)?;
        if text.len() < MIN_PDF_CHARS {
            anyhow::bail!("insufficient text content in {}", path.display());
        }

        let cleaned = clean_document(&text);
        if cleaned.len() < MIN_DOC_CHARS {
            return Ok(IndexOutcome::TooShort);
        }

        let fallback_title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let title = title.unwrap_or(&fallback_title);

        let source_ref = SourceRef::Pdf {
            file_path: path.display().to_string(),
        };
        let indexed_at = chrono::Utc::now().to_rfc3339();

        self.index_document(source_ref, title, None, Some(indexed_at), &cleaned)
            .await
    }

    /// Shared per-document flow: hash, probe, chunk, embed, upsert.
    async fn index_document(
        &self,
        source_ref: SourceRef,
        title: &str,
        sender: Option<String>,
        date: Option<String>,
        cleaned: &str,
    ) -> Result<IndexOutcome> {
        let doc_hash = document_hash(source_ref.key(), cleaned);

        let fine_present = self
            .store
            .contains_doc_hash(Granularity::Fine, &doc_hash)
            .await?;
        let coarse_present = self
            .store
            .contains_doc_hash(Granularity::Coarse, &doc_hash)
            .await?;

        if fine_present && coarse_present {
            return Ok(IndexOutcome::AlreadyIndexed);
        }

        let fine_texts = chunk_text(cleaned, Granularity::Fine);
        let coarse_texts = chunk_text(cleaned, Granularity::Coarse);

        // A short document legitimately has no coarse chunks; when the
        // fine set is present and nothing coarse would be written, the
        // document is fully indexed.
        if fine_present && coarse_texts.is_empty() {
            return Ok(IndexOutcome::AlreadyIndexed);
        }

        let mut written = (0usize, 0usize);
        for (granularity, texts, present) in [
            (Granularity::Fine, &fine_texts, fine_present),
            (Granularity::Coarse, &coarse_texts, coarse_present),
        ] {
            if present || texts.is_empty() {
                continue;
            }

            let vectors = self.embedder.embed_batch(texts).await?;
            let records: Vec<ChunkRecord> = texts
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    ChunkRecord::new(
                        source_ref.clone(),
                        granularity,
                        i as i64,
                        text.clone(),
                        title,
                        sender.clone(),
                        date.clone(),
                        doc_hash.clone(),
                    )
                })
                .collect();

            self.store
                .upsert_chunks(granularity, &records, &vectors)
                .await?;

            match granularity {
                Granularity::Fine => written.0 = records.len(),
                Granularity::Coarse => written.1 = records.len(),
            }
        }

        Ok(IndexOutcome::Indexed {
            fine: written.0,
            coarse: written.1,
        })
    }

    async fn try_index_stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            fine_chunks: self.store.count(Granularity::Fine).await?,
            coarse_chunks: self.store.count(Granularity::Coarse).await?,
            email_chunks: self
                .store
                .count_source_type(Granularity::Fine, SourceType::Email)
                .await?,
            pdf_chunks: self
                .store
                .count_source_type(Granularity::Fine, SourceType::Pdf)
                .await?,
        })
    }
}
