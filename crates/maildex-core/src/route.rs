//! Query routing between the fine and coarse collections.
//!
//! A deterministic, side-effect-free classifier: two disjoint keyword
//! sets vote for a granularity, open "wh-" question words break ties
//! toward coarse (questions usually want broader context), and anything
//! left defaults to fine. Identical input always yields identical
//! output.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::models::Granularity;
use crate::query::words;

// Terms indicating precise, document-oriented lookups.
static FINE_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "policy", "policies", "document", "documents", "doc", "docs", "contract",
        "contracts", "agreement", "agreements", "pdf", "attachment", "attachments",
        "file", "files", "procedure", "procedures", "specification",
        "specifications", "requirement", "requirements", "detail", "details",
        "clause", "clauses", "section", "sections",
    ]
    .into_iter()
    .collect()
});

// Terms indicating timeline/summary/thread-level context.
static COARSE_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "timeline", "timelines", "summary", "summaries", "overview", "update",
        "updates", "progress", "status", "history", "background", "context",
        "discussion", "conversation", "thread", "threads", "overall", "general",
        "broad",
    ]
    .into_iter()
    .collect()
});

// Open question words that usually need comprehensive context.
static CONTEXT_QUESTION_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "what", "why", "how", "when", "where", "who", "explain", "describe",
        "tell", "show",
    ]
    .into_iter()
    .collect()
});

/// Decide which collection should serve a cleaned query.
///
/// Returns the granularity and a confidence in `[0.0, 1.0]`:
/// `min(0.9, 0.6 + 0.1 * score)` when one keyword set outvotes the
/// other, `0.7` for question-word ties routed coarse, `0.6` for the
/// fine default.
pub fn route_query(query: &str) -> (Granularity, f64) {
    let tokens: HashSet<String> = words(query).into_iter().collect();

    let fine_score = tokens
        .iter()
        .filter(|w| FINE_KEYWORDS.contains(w.as_str()))
        .count();
    let coarse_score = tokens
        .iter()
        .filter(|w| COARSE_KEYWORDS.contains(w.as_str()))
        .count();

    let has_context_question = tokens
        .iter()
        .any(|w| CONTEXT_QUESTION_WORDS.contains(w.as_str()));

    if fine_score > coarse_score {
        (Granularity::Fine, confidence(fine_score))
    } else if coarse_score > fine_score {
        (Granularity::Coarse, confidence(coarse_score))
    } else if has_context_question {
        (Granularity::Coarse, 0.7)
    } else {
        (Granularity::Fine, 0.6)
    }
}

fn confidence(score: usize) -> f64 {
    (0.6 + 0.1 * score as f64).min(0.9)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_question_routes_coarse() {
        let (granularity, confidence) = route_query("What is the project timeline?");
        assert_eq!(granularity, Granularity::Coarse);
        assert!((confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_contract_clause_routes_fine() {
        let (granularity, confidence) =
            route_query("show me the contract clause on termination");
        assert_eq!(granularity, Granularity::Fine);
        // two fine hits: contract, clause
        assert!((confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_neutral_query_defaults_fine() {
        let (granularity, confidence) = route_query("invoice from the vendor");
        assert_eq!(granularity, Granularity::Fine);
        assert!((confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_question_word_tie_routes_coarse() {
        let (granularity, confidence) = route_query("explain the delay");
        assert_eq!(granularity, Granularity::Coarse);
        assert!((confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_caps_at_090() {
        let (granularity, confidence) =
            route_query("policy document contract agreement pdf attachment");
        assert_eq!(granularity, Granularity::Fine);
        assert!((confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let q = "status update on the migration thread";
        assert_eq!(route_query(q), route_query(q));
    }
}
