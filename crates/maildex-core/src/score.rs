//! Lexical scoring and dense/sparse score fusion.
//!
//! The sparse side is a simplified BM25: per-keyword term frequency fed
//! through the standard saturating curve, summed over keywords, then
//! squashed into `[0, 1]`. True corpus statistics are not tracked, so
//! idf is fixed at 1.0 and the average document length is a constant.
//!
//! The dense side arrives as a cosine distance from the vector store and
//! is converted to `sim = max(0, 1 - distance)`. Fusion is a fixed
//! weighted sum, `alpha` toward the dense score.

/// BM25 term-frequency saturation.
const K1: f64 = 1.2;
/// BM25 length normalization.
const B: f64 = 0.75;
/// Assumed average document length in tokens; corpus stats are not kept.
const AVG_DOC_LEN: f64 = 100.0;
/// Raw BM25 sums are divided by this before clamping to `[0, 1]`.
const BM25_NORM: f64 = 5.0;

/// Default weight of the dense (vector) score in fusion.
pub const DEFAULT_ALPHA: f64 = 0.7;

/// Raw BM25-style score of `document` against `terms`.
///
/// Term frequency counts non-overlapping substring occurrences of each
/// lowercased term, matching how short keyword lists behave against
/// chunk-sized text.
pub fn bm25_score(terms: &[String], document: &str) -> f64 {
    if terms.is_empty() || document.is_empty() {
        return 0.0;
    }

    let doc_lower = document.to_lowercase();
    let doc_len = doc_lower.split_whitespace().count() as f64;

    let mut score = 0.0;
    for term in terms {
        let tf = doc_lower.matches(term.to_lowercase().as_str()).count() as f64;
        if tf == 0.0 {
            continue;
        }

        let idf = 1.0;
        let numerator = tf * (K1 + 1.0);
        let denominator = tf + K1 * (1.0 - B + B * (doc_len / AVG_DOC_LEN));

        score += idf * (numerator / denominator);
    }

    score
}

/// Normalized lexical score in `[0, 1]`.
pub fn lexical_score(terms: &[String], document: &str) -> f64 {
    (bm25_score(terms, document) / BM25_NORM).clamp(0.0, 1.0)
}

/// Convert a cosine distance to a similarity score in `[0, 1]`.
pub fn similarity_from_distance(distance: f64) -> f64 {
    (1.0 - distance).max(0.0)
}

/// Fuse dense and sparse scores: `alpha * sim + (1 - alpha) * lexical`.
pub fn fuse(similarity: f64, lexical: f64, alpha: f64) -> f64 {
    alpha * similarity + (1.0 - alpha) * lexical
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        assert_eq!(bm25_score(&[], "some document"), 0.0);
        assert_eq!(bm25_score(&terms(&["word"]), ""), 0.0);
    }

    #[test]
    fn test_absent_terms_score_zero() {
        let score = bm25_score(&terms(&["zebra"]), "a report about invoices");
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_term_frequency_saturates() {
        let once = bm25_score(&terms(&["budget"]), "budget review");
        let thrice = bm25_score(&terms(&["budget"]), "budget budget budget review");
        assert!(thrice > once);
        // the curve flattens: tripling tf must not triple the score
        assert!(thrice < 3.0 * once);
    }

    #[test]
    fn test_more_matching_keywords_score_higher() {
        let doc = "the migration budget was approved in the planning review";
        let one = lexical_score(&terms(&["budget"]), doc);
        let two = lexical_score(&terms(&["budget", "migration"]), doc);
        assert!(two > one);
    }

    #[test]
    fn test_lexical_score_clamped_to_unit() {
        let doc = "budget ".repeat(500);
        let score = lexical_score(&terms(&["budget"]), &doc);
        assert!(score <= 1.0);
        assert!(score >= 0.0);
    }

    #[test]
    fn test_similarity_from_distance() {
        assert!((similarity_from_distance(0.0) - 1.0).abs() < 1e-9);
        assert!((similarity_from_distance(0.4) - 0.6).abs() < 1e-9);
        // distances beyond 1.0 floor at zero rather than going negative
        assert_eq!(similarity_from_distance(1.7), 0.0);
    }

    #[test]
    fn test_fusion_weights() {
        let fused = fuse(1.0, 0.0, DEFAULT_ALPHA);
        assert!((fused - 0.7).abs() < 1e-9);
        let fused = fuse(0.0, 1.0, DEFAULT_ALPHA);
        assert!((fused - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_fusion_monotone_in_lexical() {
        // raising lexical overlap with similarity held fixed never
        // lowers the fused score
        let sim = 0.55;
        let low = fuse(sim, 0.2, DEFAULT_ALPHA);
        let high = fuse(sim, 0.6, DEFAULT_ALPHA);
        assert!(high > low);
    }
}
