use anyhow::Result;
use sqlx::SqlitePool;

use maildex_core::models::Granularity;

/// Create one collection table plus its lookup indexes.
///
/// The deterministic chunk id is the primary key, so concurrent workers
/// indexing the same new document converge on identical rows instead of
/// duplicating the chunk set.
pub async fn create_collection(pool: &SqlitePool, granularity: Granularity) -> Result<()> {
    let table = granularity.collection_name();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            source_type TEXT NOT NULL,
            source_title TEXT NOT NULL,
            source_ref TEXT NOT NULL,
            sender TEXT,
            date TEXT,
            chunk_index INTEGER NOT NULL,
            doc_hash TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_doc_hash ON {table}(doc_hash)"
    ))
    .execute(pool)
    .await?;
    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_source_ref ON {table}(source_ref)"
    ))
    .execute(pool)
    .await?;
    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_source_type ON {table}(source_type)"
    ))
    .execute(pool)
    .await?;

    Ok(())
}

/// Create both collections. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    create_collection(pool, Granularity::Fine).await?;
    create_collection(pool, Granularity::Coarse).await?;
    Ok(())
}
