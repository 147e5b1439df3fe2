//! Core data models used throughout maildex.
//!
//! These types represent the chunks, retrieval results, and statistics
//! that flow through the indexing and retrieval pipeline. Dynamic
//! metadata bags are deliberately absent: every record is a fixed value
//! type with named, typed fields, validated at construction.

use anyhow::bail;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Maximum length of a stored source title, in characters.
const MAX_TITLE_CHARS: usize = 100;

/// Content fingerprint for at-most-once indexing: SHA-256 hex digest
/// over `(source key, cleaned document text)`.
pub fn document_hash(source_key: &str, cleaned: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_key.as_bytes());
    hasher.update(b":");
    hasher.update(cleaned.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Chunk granularity: the two independent index partitions.
///
/// Fine chunks (350–700 chars) are optimized for precise fact retrieval;
/// coarse chunks (1500–2500 chars) for contextual/summary retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Fine,
    Coarse,
}

impl Granularity {
    /// `(min_size, max_size)` character bounds for this granularity.
    pub fn bounds(self) -> (usize, usize) {
        match self {
            Granularity::Fine => (350, 700),
            Granularity::Coarse => (1500, 2500),
        }
    }

    /// Name of the backing collection (table) for this granularity.
    pub fn collection_name(self) -> &'static str {
        match self {
            Granularity::Fine => "fine_chunks",
            Granularity::Coarse => "coarse_chunks",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Fine => "fine",
            Granularity::Coarse => "coarse",
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fine" => Ok(Granularity::Fine),
            "coarse" => Ok(Granularity::Coarse),
            other => bail!("Unknown granularity: '{}'. Use fine or coarse.", other),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of source document a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Email,
    Pdf,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Email => "email",
            SourceType::Pdf => "pdf",
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(SourceType::Email),
            "pdf" => Ok(SourceType::Pdf),
            other => bail!("Unknown source type: '{}'. Use email or pdf.", other),
        }
    }
}

/// Typed reference back to the source document.
///
/// Emails are addressed by message id, PDFs by file path. The [`key`]
/// string is what point lookups and chunk id derivation use.
///
/// [`key`]: SourceRef::key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Email { message_id: String },
    Pdf { file_path: String },
}

impl SourceRef {
    /// The lookup key: message id for emails, file path for PDFs.
    pub fn key(&self) -> &str {
        match self {
            SourceRef::Email { message_id } => message_id,
            SourceRef::Pdf { file_path } => file_path,
        }
    }

    pub fn source_type(&self) -> SourceType {
        match self {
            SourceRef::Email { .. } => SourceType::Email,
            SourceRef::Pdf { .. } => SourceType::Pdf,
        }
    }
}

/// The atomic indexed unit: one chunk of one source document.
///
/// Created only by the indexer during ingestion, never mutated in place,
/// removed only by a full index clear. The embedding vector travels
/// alongside slices of these records rather than inside them, so the
/// same record type serves both write and read paths.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Deterministic id: `{source_type}_{granularity}_{key}_{chunk_index}`,
    /// where `key` is the message id for emails and the doc hash for PDFs.
    pub id: String,
    pub text: String,
    /// Display title (subject or filename), truncated to 100 chars.
    pub source_title: String,
    pub source_ref: SourceRef,
    /// Sending address or name; email only.
    pub sender: Option<String>,
    /// Received date for emails, indexing time for PDFs.
    pub date: Option<String>,
    pub granularity: Granularity,
    /// Ordinal position within the source document for this granularity.
    pub chunk_index: i64,
    /// Content hash of the whole cleaned document (not this chunk);
    /// the dedup key for at-most-once indexing.
    pub doc_hash: String,
}

impl ChunkRecord {
    /// Build a chunk record with its deterministic id.
    ///
    /// The title is truncated to 100 characters; the id is derived from
    /// the source key (emails) or the doc hash (PDFs, whose file paths
    /// make poor id components) plus granularity and ordinal.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_ref: SourceRef,
        granularity: Granularity,
        chunk_index: i64,
        text: String,
        source_title: &str,
        sender: Option<String>,
        date: Option<String>,
        doc_hash: String,
    ) -> Self {
        let key = match &source_ref {
            SourceRef::Email { message_id } => message_id.clone(),
            SourceRef::Pdf { .. } => doc_hash.clone(),
        };
        let id = format!(
            "{}_{}_{}_{}",
            source_ref.source_type().as_str(),
            granularity.as_str(),
            key,
            chunk_index
        );

        Self {
            id,
            text,
            source_title: truncate_chars(source_title, MAX_TITLE_CHARS),
            source_ref,
            sender,
            date,
            granularity,
            chunk_index,
            doc_hash,
        }
    }

    pub fn source_type(&self) -> SourceType {
        self.source_ref.source_type()
    }
}

/// Truncate a string to at most `max` characters, respecting char
/// boundaries.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Query-time projection of a ranked chunk.
///
/// Synthesized per retrieval call; `citation_id` is the 1-based rank
/// within that call only and is not stable across calls.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub text: String,
    pub source_title: String,
    pub source_type: SourceType,
    /// Message id or file path of the source document.
    pub source_ref: String,
    pub sender: Option<String>,
    pub date: Option<String>,
    /// Fused dense+sparse relevance in `[0.0, 1.0]`.
    pub relevance_score: f64,
    pub granularity: Granularity,
    pub citation_id: usize,
}

/// Evidence record for downstream prompt assembly.
#[derive(Debug, Clone, Serialize)]
pub struct Evidence {
    pub id: usize,
    pub text: String,
    pub source: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub score: f64,
}

/// Current index counts, as reported by `mdx stats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub fine_chunks: u64,
    pub coarse_chunks: u64,
    /// Email-sourced chunks in the fine collection.
    pub email_chunks: u64,
    /// PDF-sourced chunks in the fine collection.
    pub pdf_chunks: u64,
}

/// Outcome counters for a batch indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub processed: u64,
    pub success: u64,
    pub failed: u64,
    /// Documents that were no-ops: already indexed or too short.
    pub skipped: u64,
}

/// Email source record as consumed from the mail collaborator.
///
/// Absent fields default to empty strings; only `id` and `body_text`
/// carry signal the engine depends on.
#[derive(Debug, Clone, Default)]
pub struct EmailRecord {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub body_text: String,
    pub date_received: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_hash_depends_on_both_inputs() {
        let a = document_hash("msg-1", "body");
        let b = document_hash("msg-2", "body");
        let c = document_hash("msg-1", "other body");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, document_hash("msg-1", "body"));
    }

    #[test]
    fn test_granularity_bounds() {
        assert_eq!(Granularity::Fine.bounds(), (350, 700));
        assert_eq!(Granularity::Coarse.bounds(), (1500, 2500));
    }

    #[test]
    fn test_granularity_parse_roundtrip() {
        for g in [Granularity::Fine, Granularity::Coarse] {
            let parsed: Granularity = g.as_str().parse().unwrap();
            assert_eq!(parsed, g);
        }
        assert!("medium".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_email_chunk_id_is_deterministic() {
        let make = || {
            ChunkRecord::new(
                SourceRef::Email {
                    message_id: "msg-42".to_string(),
                },
                Granularity::Fine,
                3,
                "body".to_string(),
                "Subject line",
                Some("alice@example.com".to_string()),
                None,
                "abc123".to_string(),
            )
        };
        assert_eq!(make().id, "email_fine_msg-42_3");
        assert_eq!(make().id, make().id);
    }

    #[test]
    fn test_pdf_chunk_id_uses_doc_hash() {
        let chunk = ChunkRecord::new(
            SourceRef::Pdf {
                file_path: "/tmp/report.pdf".to_string(),
            },
            Granularity::Coarse,
            0,
            "text".to_string(),
            "report.pdf",
            None,
            None,
            "deadbeef".to_string(),
        );
        assert_eq!(chunk.id, "pdf_coarse_deadbeef_0");
        assert_eq!(chunk.source_type(), SourceType::Pdf);
    }

    #[test]
    fn test_title_truncated_to_100_chars() {
        let long_title = "x".repeat(250);
        let chunk = ChunkRecord::new(
            SourceRef::Email {
                message_id: "m".to_string(),
            },
            Granularity::Fine,
            0,
            String::new(),
            &long_title,
            None,
            None,
            "h".to_string(),
        );
        assert_eq!(chunk.source_title.chars().count(), 100);
    }
}
