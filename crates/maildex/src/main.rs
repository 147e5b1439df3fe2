//! # maildex CLI (`mdx`)
//!
//! The `mdx` binary is the operator surface for the knowledge index.
//! It provides commands for schema initialization, email and PDF
//! indexing, hybrid search, source expansion, and index maintenance.
//!
//! ## Usage
//!
//! ```bash
//! mdx --config ./config/maildex.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mdx init` | Create the SQLite database and both chunk collections |
//! | `mdx index-emails` | Batch-index emails from the configured mail database |
//! | `mdx index-pdf <path>` | Index a single PDF file |
//! | `mdx search "<query>"` | Hybrid search over the index |
//! | `mdx expand <source-ref>` | Fetch all chunks of one source document |
//! | `mdx stats` | Show index counts |
//! | `mdx clear` | Drop and recreate both collections |
//!
//! Periodic reindexing is intentionally not owned here: point your
//! scheduler (cron, systemd timer) at `mdx index-emails`.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use maildex::config::{load_config, Config};
use maildex::embedding::create_embedder;
use maildex::indexer::Indexer;
use maildex::retrieve::{format_evidence, HybridRetriever};
use maildex::sources::{EmailSource, SqliteEmailSource};
use maildex::sqlite_store::SqliteStore;
use maildex::{db, migrate};

use maildex_core::models::Granularity;

/// maildex — knowledge indexing and hybrid retrieval for email and PDF
/// archives.
#[derive(Parser)]
#[command(
    name = "mdx",
    about = "maildex — knowledge indexing and hybrid retrieval for email and PDF archives",
    version,
    long_about = "maildex turns email bodies and extracted PDF text into a dual-granularity, \
    retrieval-augmented knowledge base: fine chunks for precise fact lookup, coarse chunks for \
    timeline and summary context, with embedding-backed similarity search fused with lexical scoring."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/maildex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and both chunk collections
    /// (fine, coarse). Idempotent — running it multiple times is safe.
    Init,

    /// Batch-index emails from the configured mail database.
    ///
    /// Skips documents already indexed (content-hash dedup) and isolates
    /// per-document failures. Ctrl-C aborts between documents; partial
    /// progress is kept and a rerun is idempotent.
    IndexEmails {
        /// Maximum number of emails to process.
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Index a single PDF file.
    IndexPdf {
        /// Path to the PDF file.
        path: PathBuf,

        /// Title override (defaults to the file name).
        #[arg(long)]
        title: Option<String>,
    },

    /// Search the index with hybrid dense + lexical retrieval.
    Search {
        /// Natural-language query.
        query: String,

        /// Number of results to return.
        #[arg(long, default_value_t = 3)]
        k: usize,

        /// Force a collection (fine or coarse) instead of routing.
        #[arg(long)]
        granularity: Option<String>,

        /// Emit prompt-ready evidence records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Fetch all chunks of one source document (message id or PDF path).
    Expand {
        /// Source reference: email message id or PDF file path.
        source_ref: String,

        /// Maximum number of chunks to return.
        #[arg(long, default_value_t = 5)]
        k: usize,
    },

    /// Show index statistics.
    Stats,

    /// Drop and recreate both collections.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&config).await,
        Commands::IndexEmails { limit } => run_index_emails(&config, limit).await,
        Commands::IndexPdf { path, title } => run_index_pdf(&config, &path, title.as_deref()).await,
        Commands::Search {
            query,
            k,
            granularity,
            json,
        } => run_search(&config, &query, k, granularity.as_deref(), json).await,
        Commands::Expand { source_ref, k } => run_expand(&config, &source_ref, k).await,
        Commands::Stats => run_stats(&config).await,
        Commands::Clear { yes } => run_clear(&config, yes).await,
    }
}

/// Build the services the commands share.
async fn open_engine(config: &Config) -> Result<(Indexer, HybridRetriever)> {
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;

    let store: Arc<dyn maildex_core::store::VectorStore> = Arc::new(SqliteStore::new(pool));
    let embedder = create_embedder(&config.embedding)?;

    let indexer = Indexer::new(store.clone(), embedder.clone());
    let retriever = HybridRetriever::with_params(
        store,
        embedder,
        config.retrieval.alpha,
        config.retrieval.slow_query_ms,
    );

    Ok((indexer, retriever))
}

async fn run_init(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    println!("initialized {}", config.db.path.display());
    Ok(())
}

async fn run_index_emails(config: &Config, limit: Option<u32>) -> Result<()> {
    let email_db = config
        .sources
        .email_db
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("sources.email_db not set in config"))?;

    let source = SqliteEmailSource::connect(email_db).await?;
    let emails = source.fetch(limit).await?;

    let (indexer, _retriever) = open_engine(config).await?;

    let abort = Arc::new(AtomicBool::new(false));
    {
        let abort = abort.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                abort.store(true, Ordering::Relaxed);
            }
        });
    }

    let stats = indexer.batch_index_emails(&emails, &abort).await;

    println!("index emails");
    println!("  processed: {}", stats.processed);
    println!("  indexed:   {}", stats.success);
    println!("  skipped:   {}", stats.skipped);
    println!("  failed:    {}", stats.failed);
    println!("ok");
    Ok(())
}

async fn run_index_pdf(config: &Config, path: &std::path::Path, title: Option<&str>) -> Result<()> {
    let (indexer, _retriever) = open_engine(config).await?;

    if indexer.index_pdf(path, title).await {
        println!("indexed {}", path.display());
    } else {
        println!("failed to index {}", path.display());
        std::process::exit(1);
    }
    Ok(())
}

async fn run_search(
    config: &Config,
    query: &str,
    k: usize,
    granularity: Option<&str>,
    json: bool,
) -> Result<()> {
    let granularity = granularity
        .map(|g| g.parse::<Granularity>())
        .transpose()?;

    let (_indexer, retriever) = open_engine(config).await?;

    let results = retriever.retrieve(query, k, granularity).await;

    if json {
        let evidence = format_evidence(&results, 2000);
        println!("{}", serde_json::to_string_pretty(&evidence)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for result in &results {
        println!(
            "[{}] {} ({}, {})",
            result.citation_id,
            result.source_title,
            result.source_type.as_str(),
            result.granularity
        );
        println!("    score: {:.3}", result.relevance_score);
        let preview: String = result.text.chars().take(200).collect();
        println!("    {}", preview);
    }
    Ok(())
}

async fn run_expand(config: &Config, source_ref: &str, k: usize) -> Result<()> {
    let (_indexer, retriever) = open_engine(config).await?;

    let results = retriever.retrieve_by_source(source_ref, k).await;

    if results.is_empty() {
        println!("No chunks for {}", source_ref);
        return Ok(());
    }

    for result in &results {
        println!(
            "[{}] {} chunk ({})",
            result.citation_id, result.granularity, result.source_title
        );
        let preview: String = result.text.chars().take(200).collect();
        println!("    {}", preview);
    }
    Ok(())
}

async fn run_stats(config: &Config) -> Result<()> {
    let (indexer, _retriever) = open_engine(config).await?;

    let stats = indexer.index_stats().await;

    println!("maildex — Index Stats");
    println!("=====================");
    println!();
    println!("  Database:      {}", config.db.path.display());
    println!("  Fine chunks:   {}", stats.fine_chunks);
    println!("  Coarse chunks: {}", stats.coarse_chunks);
    println!("  Email chunks:  {}", stats.email_chunks);
    println!("  PDF chunks:    {}", stats.pdf_chunks);
    println!();
    Ok(())
}

async fn run_clear(config: &Config, yes: bool) -> Result<()> {
    if !yes {
        println!("This drops both collections. Re-run with --yes to confirm.");
        return Ok(());
    }

    let (indexer, _retriever) = open_engine(config).await?;

    if indexer.clear_index().await {
        println!("cleared");
    } else {
        println!("failed to clear index");
        std::process::exit(1);
    }
    Ok(())
}
