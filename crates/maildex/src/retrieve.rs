//! Hybrid retrieval: dense similarity search fused with lexical scoring.
//!
//! # Pipeline
//!
//! 1. Clean the query; empty after cleaning → empty result, not an error.
//! 2. Extract up to 10 keywords for the sparse side.
//! 3. Resolve granularity: explicit override wins, else the router.
//! 4. Embed the cleaned query.
//! 5. Similarity-search the resolved collection for `min(2k, 20)`
//!    nearest neighbors.
//! 6. Score each candidate lexically (BM25-style), convert distance to
//!    similarity, fuse with a fixed weighted sum.
//! 7. Stable-sort descending, truncate to `k`, assign 1-based citation
//!    ids. Ties keep the similarity-search order (closest first).
//!
//! Any embedding or search failure is caught, logged, and surfaces as
//! an empty result list. Queries over the latency threshold log a
//! slow-query warning but still answer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use maildex_core::embed::Embedder;
use maildex_core::models::{Evidence, Granularity, RetrievalResult};
use maildex_core::query::{clean_query, extract_keywords};
use maildex_core::route::route_query;
use maildex_core::score::{fuse, lexical_score, similarity_from_distance};
use maildex_core::store::VectorStore;

/// Keywords extracted per query for lexical scoring.
const MAX_QUERY_KEYWORDS: usize = 10;
/// Candidate pool cap for the fusion stage.
const MAX_CANDIDATES: usize = 20;
/// Per-snippet character cap in evidence formatting.
const MAX_SNIPPET_CHARS: usize = 500;

/// Cumulative latency counters for one retriever instance.
#[derive(Debug, Clone)]
pub struct RetrieverMetrics {
    pub total_queries: u64,
    pub total_time_ms: u64,
    pub average_time_ms: f64,
    pub target_time_ms: u64,
    /// `A` under target, `B` under 2× target, `C` beyond.
    pub grade: char,
}

/// Read-side service owning a store handle and an embedding gateway.
///
/// Safe for unbounded concurrent callers; retrieval never blocks
/// concurrent index writes and a query issued mid-batch may or may not
/// see the newest document.
pub struct HybridRetriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    alpha: f64,
    slow_query_ms: u64,
    query_count: AtomicU64,
    total_time_ms: AtomicU64,
}

impl HybridRetriever {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_params(store, embedder, maildex_core::score::DEFAULT_ALPHA, 150)
    }

    pub fn with_params(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        alpha: f64,
        slow_query_ms: u64,
    ) -> Self {
        Self {
            store,
            embedder,
            alpha,
            slow_query_ms,
            query_count: AtomicU64::new(0),
            total_time_ms: AtomicU64::new(0),
        }
    }

    /// Retrieve up to `k` ranked results for a natural-language query.
    ///
    /// `granularity` forces a collection; `None` routes automatically.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        granularity: Option<Granularity>,
    ) -> Vec<RetrievalResult> {
        let started = Instant::now();

        let results = match self.retrieve_inner(query, k, granularity).await {
            Ok(results) => results,
            Err(e) => {
                error!(query, error = %e, "retrieval failed");
                Vec::new()
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.total_time_ms.fetch_add(elapsed_ms, Ordering::Relaxed);

        if elapsed_ms > self.slow_query_ms {
            let preview: String = query.chars().take(50).collect();
            warn!(
                elapsed_ms,
                threshold_ms = self.slow_query_ms,
                query = %preview,
                "slow retrieval"
            );
        } else {
            debug!(elapsed_ms, results = results.len(), "retrieval complete");
        }

        results
    }

    async fn retrieve_inner(
        &self,
        query: &str,
        k: usize,
        granularity: Option<Granularity>,
    ) -> anyhow::Result<Vec<RetrievalResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let cleaned = clean_query(query);
        if cleaned.is_empty() {
            return Ok(Vec::new());
        }

        let keywords = extract_keywords(&cleaned, MAX_QUERY_KEYWORDS);

        let granularity = granularity.unwrap_or_else(|| {
            let (routed, confidence) = route_query(&cleaned);
            debug!(%routed, confidence, "query routed");
            routed
        });

        let query_vec = self.embedder.embed(&cleaned).await?;

        let candidate_k = (2 * k).min(MAX_CANDIDATES);
        let hits = self
            .store
            .similarity_search(granularity, &query_vec, candidate_k)
            .await?;

        let mut scored: Vec<(f64, maildex_core::store::SimilarHit)> = hits
            .into_iter()
            .map(|hit| {
                let sim = similarity_from_distance(hit.distance);
                let lexical = lexical_score(&keywords, &hit.chunk.text);
                (fuse(sim, lexical, self.alpha), hit)
            })
            .collect();

        // Stable sort: ties keep the similarity-search order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, hit))| RetrievalResult {
                text: hit.chunk.text,
                source_title: hit.chunk.source_title,
                source_type: hit.chunk.source_ref.source_type(),
                source_ref: hit.chunk.source_ref.key().to_string(),
                sender: hit.chunk.sender,
                date: hit.chunk.date,
                relevance_score: score,
                granularity: hit.chunk.granularity,
                citation_id: i + 1,
            })
            .collect())
    }

    /// Fetch every chunk of one source document, fine then coarse, up
    /// to `k`, each with `relevance_score = 1.0`.
    ///
    /// This bypasses ranking entirely; it is the "expand this
    /// document's other chunks" path, not a relevance search.
    pub async fn retrieve_by_source(&self, source_key: &str, k: usize) -> Vec<RetrievalResult> {
        match self.retrieve_by_source_inner(source_key, k).await {
            Ok(results) => results,
            Err(e) => {
                error!(source_key, error = %e, "source expansion failed");
                Vec::new()
            }
        }
    }

    async fn retrieve_by_source_inner(
        &self,
        source_key: &str,
        k: usize,
    ) -> anyhow::Result<Vec<RetrievalResult>> {
        let fine = self
            .store
            .chunks_for_source(Granularity::Fine, source_key)
            .await?;
        let coarse = self
            .store
            .chunks_for_source(Granularity::Coarse, source_key)
            .await?;

        Ok(fine
            .into_iter()
            .chain(coarse)
            .take(k)
            .enumerate()
            .map(|(i, chunk)| RetrievalResult {
                text: chunk.text,
                source_title: chunk.source_title,
                source_type: chunk.source_ref.source_type(),
                source_ref: chunk.source_ref.key().to_string(),
                sender: chunk.sender,
                date: chunk.date,
                relevance_score: 1.0,
                granularity: chunk.granularity,
                citation_id: i + 1,
            })
            .collect())
    }

    /// Latency counters for this instance.
    pub fn metrics(&self) -> RetrieverMetrics {
        let total_queries = self.query_count.load(Ordering::Relaxed);
        let total_time_ms = self.total_time_ms.load(Ordering::Relaxed);
        let average_time_ms = if total_queries > 0 {
            total_time_ms as f64 / total_queries as f64
        } else {
            0.0
        };

        let grade = if average_time_ms < self.slow_query_ms as f64 {
            'A'
        } else if average_time_ms < 2.0 * self.slow_query_ms as f64 {
            'B'
        } else {
            'C'
        };

        RetrieverMetrics {
            total_queries,
            total_time_ms,
            average_time_ms,
            target_time_ms: self.slow_query_ms,
            grade,
        }
    }
}

/// Shape retrieval results into prompt-ready evidence records.
///
/// Each snippet is capped at 500 chars; entries stop once the
/// cumulative character budget would be exceeded.
pub fn format_evidence(results: &[RetrievalResult], max_context_chars: usize) -> Vec<Evidence> {
    let mut evidence = Vec::new();
    let mut used = 0usize;

    for result in results {
        let mut text = result.text.clone();
        if text.chars().count() > MAX_SNIPPET_CHARS {
            text = text.chars().take(MAX_SNIPPET_CHARS).collect();
            text.push_str("...");
        }

        let text_chars = text.chars().count();
        if used + text_chars > max_context_chars {
            break;
        }
        used += text_chars;

        evidence.push(Evidence {
            id: result.citation_id,
            text,
            source: result.source_title.clone(),
            source_type: result.source_type,
            score: (result.relevance_score * 1000.0).round() / 1000.0,
        });
    }

    evidence
}

#[cfg(test)]
mod tests {
    use super::*;
    use maildex_core::models::SourceType;

    fn result(citation_id: usize, text: &str, score: f64) -> RetrievalResult {
        RetrievalResult {
            text: text.to_string(),
            source_title: "Weekly sync".to_string(),
            source_type: SourceType::Email,
            source_ref: "msg-1".to_string(),
            sender: None,
            date: None,
            relevance_score: score,
            granularity: Granularity::Fine,
            citation_id,
        }
    }

    #[test]
    fn test_evidence_empty_input() {
        assert!(format_evidence(&[], 2000).is_empty());
    }

    #[test]
    fn test_evidence_snippet_capped_at_500() {
        let results = vec![result(1, &"x".repeat(900), 0.8)];
        let evidence = format_evidence(&results, 10_000);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].text.chars().count(), 503); // 500 + "..."
    }

    #[test]
    fn test_evidence_stops_at_budget() {
        let results = vec![
            result(1, &"a".repeat(400), 0.9),
            result(2, &"b".repeat(400), 0.8),
            result(3, &"c".repeat(400), 0.7),
        ];
        let evidence = format_evidence(&results, 900);
        assert_eq!(evidence.len(), 2);
        assert_eq!(evidence[0].id, 1);
        assert_eq!(evidence[1].id, 2);
    }

    #[test]
    fn test_evidence_score_rounded() {
        let results = vec![result(1, "short text", 0.123456)];
        let evidence = format_evidence(&results, 2000);
        assert!((evidence[0].score - 0.123).abs() < 1e-9);
    }
}
