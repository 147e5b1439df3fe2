//! # maildex core
//!
//! Shared, runtime-free logic for maildex: data models, text cleaning,
//! dual-granularity chunking, query preprocessing, query routing,
//! lexical scoring and score fusion, plus the store and embedder traits.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies beyond `async-trait` futures at the seams.
//! Everything here is deterministic and unit-testable in isolation.

pub mod chunk;
pub mod clean;
pub mod embed;
pub mod models;
pub mod query;
pub mod route;
pub mod score;
pub mod store;
