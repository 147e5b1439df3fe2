//! Source document adapters.
//!
//! Acquisition is a collaborator concern: mail transport and attachment
//! handling live elsewhere and hand this engine plain records. The
//! adapters here read the collaborator's SQLite `emails` table and
//! extract text from PDF files; the engine consumes only the resulting
//! strings.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use maildex_core::models::EmailRecord;

/// Provider of email records for batch indexing.
#[async_trait]
pub trait EmailSource: Send + Sync {
    /// Fetch up to `limit` emails with non-empty bodies, newest first.
    async fn fetch(&self, limit: Option<u32>) -> Result<Vec<EmailRecord>>;
}

/// Reads the mail collaborator's SQLite `emails` table.
pub struct SqliteEmailSource {
    pool: SqlitePool,
}

impl SqliteEmailSource {
    pub async fn connect(db_path: &Path) -> Result<Self> {
        let pool = crate::db::connect(db_path).await?;
        Ok(Self { pool })
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailSource for SqliteEmailSource {
    async fn fetch(&self, limit: Option<u32>) -> Result<Vec<EmailRecord>> {
        let mut query = String::from(
            "SELECT message_id, subject, sender, body_text, date_received \
             FROM emails \
             WHERE body_text IS NOT NULL AND body_text != '' \
             ORDER BY date_received DESC",
        );
        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| EmailRecord {
                id: row.get::<Option<String>, _>("message_id").unwrap_or_default(),
                subject: row.get::<Option<String>, _>("subject").unwrap_or_default(),
                sender: row.get::<Option<String>, _>("sender").unwrap_or_default(),
                body_text: row.get::<Option<String>, _>("body_text").unwrap_or_default(),
                date_received: row
                    .get::<Option<String>, _>("date_received")
                    .unwrap_or_default(),
            })
            .collect())
    }
}

/// Extract text from a PDF file.
///
/// Delegated wholesale to `pdf-extract`; the engine does not interpret
/// PDF structure itself.
pub fn extract_pdf_text(path: &Path) -> Result<String> {
    anyhow::ensure!(path.exists(), "PDF file not found: {}", path.display());

    pdf_extract::extract_text(path)
        .map_err(|e| anyhow::anyhow!("Failed to extract PDF text from {}: {}", path.display(), e))
}
