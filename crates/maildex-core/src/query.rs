//! Query preprocessing for lexical scoring.
//!
//! Queries pass through the same signature/boilerplate stripping as
//! documents (pasted email text shows up in queries more often than one
//! would hope), plus date normalization so date phrasing does not
//! dominate lexical scoring. Keyword extraction lowercases, drops stop
//! words and short tokens, and deduplicates preserving order.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::clean::strip_signatures;

/// Placeholder substituted for date-like substrings.
pub const DATE_TOKEN: &str = "[DATE]";

static SIGN_OFF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\n(?:Best regards|Thanks|Regards),.*$").unwrap());

static DATE_SLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}/\d{1,2}/\d{2,4}\b").unwrap());
static DATE_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}-\d{1,2}-\d{2,4}\b").unwrap());
static DATE_WORDY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w+\s+\d{1,2},?\s+\d{4}\b").unwrap());

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").unwrap());

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of",
        "with", "by", "from", "up", "about", "into", "through", "during", "before",
        "after", "above", "below", "between", "among", "is", "are", "was", "were",
        "be", "been", "have", "has", "had", "do", "does", "did", "will", "would",
        "could", "should", "may", "might", "must", "can",
    ]
    .into_iter()
    .collect()
});

/// Clean and normalize a query string.
///
/// Returns an empty string for queries that are empty after cleaning;
/// the retriever treats that as "no results", not an error.
pub fn clean_query(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let query = strip_signatures(query);
    let query = SIGN_OFF.replace(&query, "");

    let query = DATE_SLASH.replace_all(&query, DATE_TOKEN);
    let query = DATE_DASH.replace_all(&query, DATE_TOKEN);
    let query = DATE_WORDY.replace_all(&query, DATE_TOKEN);

    WHITESPACE_RUN.replace_all(&query, " ").trim().to_string()
}

/// Lowercase word tokens of a string, in order.
pub fn words(text: &str) -> Vec<String> {
    WORD.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract up to `max_keywords` lexical keywords from a query.
///
/// Tokens are lowercased; stop words and tokens of two characters or
/// fewer are dropped; duplicates are removed preserving first
/// occurrence order.
pub fn extract_keywords(query: &str, max_keywords: usize) -> Vec<String> {
    let cleaned = clean_query(query);

    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for word in words(&cleaned) {
        if word.len() <= 2 || STOP_WORDS.contains(word.as_str()) {
            continue;
        }
        if seen.insert(word.clone()) {
            keywords.push(word);
        }
        if keywords.len() == max_keywords {
            break;
        }
    }

    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query() {
        assert_eq!(clean_query(""), "");
        assert_eq!(clean_query("   "), "");
    }

    #[test]
    fn test_dates_normalized() {
        let cleaned = clean_query("status update from 12/03/2025 please");
        assert!(cleaned.contains(DATE_TOKEN));
        assert!(!cleaned.contains("12/03/2025"));

        let cleaned = clean_query("notes for March 3, 2025 review");
        assert!(cleaned.contains(DATE_TOKEN));
    }

    #[test]
    fn test_sign_off_stripped() {
        let cleaned = clean_query("can you find the invoice\nThanks,\nBob");
        assert_eq!(cleaned, "can you find the invoice");
    }

    #[test]
    fn test_keywords_drop_stop_words_and_short_tokens() {
        let keywords = extract_keywords("what is the plan for the Q3 launch", 10);
        assert!(!keywords.contains(&"the".to_string()));
        assert!(!keywords.contains(&"is".to_string()));
        // two-char tokens are dropped
        assert!(!keywords.contains(&"q3".to_string()));
        assert!(keywords.contains(&"plan".to_string()));
        assert!(keywords.contains(&"launch".to_string()));
    }

    #[test]
    fn test_keywords_deduplicated_in_order() {
        let keywords = extract_keywords("contract renewal contract terms renewal", 10);
        assert_eq!(keywords, vec!["contract", "renewal", "terms"]);
    }

    #[test]
    fn test_keywords_capped() {
        let query = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda";
        let keywords = extract_keywords(query, 10);
        assert_eq!(keywords.len(), 10);
    }
}
