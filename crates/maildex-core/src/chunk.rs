//! Sentence-boundary text chunker with dual granularities.
//!
//! Splits cleaned document text into chunks bounded by the granularity's
//! `(min_size, max_size)` character window. Splitting occurs on sentence
//! boundaries (`.`, `!`, `?` followed by whitespace) to preserve
//! semantic coherence within each chunk.
//!
//! # Algorithm
//!
//! 1. Split text into sentences at punctuation-plus-whitespace
//!    boundaries (the punctuation stays with its sentence).
//! 2. Greedily accumulate sentences into a buffer.
//! 3. When appending the next sentence would push the buffer past
//!    `max_size` *and* the buffer already meets `min_size`, flush the
//!    buffer as a chunk and start a new one with that sentence.
//! 4. At end of input, flush the trailing buffer only if it meets
//!    `min_size`; otherwise it is dropped. Documents shorter than
//!    `min_size` therefore produce zero chunks for that granularity.
//!
//! The function is pure: identical input always yields identical chunks.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Granularity;

// Sentence terminator followed by whitespace. The regex crate has no
// lookbehind, so the boundary match is sliced manually to keep the
// terminator with the preceding sentence.
static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Split text into sentences, keeping terminators attached.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        // The terminator is a single ASCII char, so +1 stays on a
        // char boundary.
        let end = boundary.start() + 1;
        if end > start {
            sentences.push(&text[start..end]);
        }
        start = boundary.end();
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}

/// Split cleaned text into chunks for the given granularity.
///
/// Returns chunk texts in document order. Every returned chunk has
/// `len >= min_size`; the trailing remainder below `min_size` is
/// silently dropped.
pub fn chunk_text(text: &str, granularity: Granularity) -> Vec<String> {
    let (min_size, max_size) = granularity.bounds();

    let mut chunks = Vec::new();
    let mut buf = String::new();

    for sentence in split_sentences(text) {
        let appended_len = if buf.is_empty() {
            sentence.len()
        } else {
            buf.len() + 1 + sentence.len()
        };

        if appended_len > max_size && buf.len() >= min_size {
            chunks.push(buf.trim().to_string());
            buf.clear();
            buf.push_str(sentence);
        } else {
            if !buf.is_empty() {
                buf.push(' ');
            }
            buf.push_str(sentence);
        }
    }

    if buf.len() >= min_size {
        chunks.push(buf.trim().to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A sentence of roughly `n` chars ending in a period.
    fn sentence(n: usize) -> String {
        let mut s = "word ".repeat(n / 5);
        s.truncate(n.saturating_sub(1));
        s.push('.');
        s
    }

    fn text_of(total_sentences: usize, sentence_len: usize) -> String {
        (0..total_sentences)
            .map(|_| sentence(sentence_len))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_split_sentences_keeps_terminators() {
        let parts = split_sentences("First one. Second! Third? tail");
        assert_eq!(parts, vec!["First one.", "Second!", "Third?", "tail"]);
    }

    #[test]
    fn test_short_text_produces_no_chunks() {
        // Below the fine minimum of 350 chars.
        let chunks = chunk_text(&text_of(2, 100), Granularity::Fine);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_single_fine_chunk_for_mid_size_text() {
        // ~600 chars: one fine chunk, zero coarse chunks.
        let text = text_of(6, 100);
        let fine = chunk_text(&text, Granularity::Fine);
        let coarse = chunk_text(&text, Granularity::Coarse);
        assert_eq!(fine.len(), 1);
        assert!(coarse.is_empty());
    }

    #[test]
    fn test_chunk_bounds_hold() {
        let text = text_of(80, 90);
        for granularity in [Granularity::Fine, Granularity::Coarse] {
            let (min, max) = granularity.bounds();
            for chunk in chunk_text(&text, granularity) {
                assert!(chunk.len() >= min, "chunk under min: {}", chunk.len());
                assert!(chunk.len() <= max, "chunk over max: {}", chunk.len());
            }
        }
    }

    #[test]
    fn test_sub_minimum_trailer_dropped() {
        // One near-max sentence, then a tiny remainder that forces a
        // flush and is itself below the minimum.
        let mut text = sentence(698);
        text.push_str(" Tiny trailer.");
        let chunks = chunk_text(&text, Granularity::Fine);
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].contains("Tiny trailer"));
    }

    #[test]
    fn test_deterministic() {
        let text = text_of(40, 95);
        let a = chunk_text(&text, Granularity::Fine);
        let b = chunk_text(&text, Granularity::Fine);
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunks_are_contiguous_substrings() {
        let text = text_of(40, 95);
        let chunks = chunk_text(&text, Granularity::Fine);
        assert!(chunks.len() > 1);
        let mut cursor = 0;
        for chunk in &chunks {
            let pos = text[cursor..].find(chunk.as_str()).expect("chunk out of order");
            cursor += pos + chunk.len();
        }
    }
}
