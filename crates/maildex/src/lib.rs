//! # maildex
//!
//! Knowledge indexing and hybrid retrieval engine for email and PDF
//! archives: dual-granularity chunking, embedding-backed similarity
//! search, BM25-style lexical scoring, score fusion, query routing, and
//! content-addressed deduplication.
//!
//! The pure algorithms live in `maildex-core`; this crate owns
//! configuration, the SQLite-backed vector store, embedding providers,
//! the [`Indexer`](indexer::Indexer) and
//! [`HybridRetriever`](retrieve::HybridRetriever) services, and the
//! `mdx` CLI binary.

pub mod config;
pub mod db;
pub mod embedding;
pub mod indexer;
pub mod migrate;
pub mod retrieve;
pub mod sources;
pub mod sqlite_store;
