//! annuaire - Business-directory ingestion and storage
//!
//! Ingests semi-structured business-listing records and durably stores them
//! in a document store, one collection per business category, with
//! hash-based deduplication so repeated runs never store the same
//! establishment twice.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`normalize`] - Raw record to canonical document conversion
//! - [`store`] - Document store trait and backends (SQLite, in-memory)
//! - [`ingest`] - Collection routing, upsert engine, batch pipeline
//! - [`stats`] - Cross-collection aggregation
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use annuaire::config::Config;
//! use annuaire::ingest::IngestionPipeline;
//! use annuaire::store::SqliteStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = Arc::new(SqliteStore::open(&config.store.sqlite_path)?);
//!     let pipeline = IngestionPipeline::new(store, config.ingest);
//!     let stats = pipeline.ingest_file("data/scraped.json".as_ref()).await?;
//!     println!("inserted {}", stats.inserted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod stats;
pub mod store;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, MergePolicy};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::ingest::IngestionPipeline;
    pub use crate::models::{NormalizedDocument, RawRecord, RunStats, UpsertOutcome};
    pub use crate::stats::StatsReporter;
    pub use crate::store::{DocumentStore, MemoryStore, SharedDocumentStore, SqliteStore};
}

// Direct re-exports for convenience
pub use models::{NormalizedDocument, RawRecord, RunStats, UpsertOutcome};
