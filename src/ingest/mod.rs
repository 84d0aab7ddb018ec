//! Ingestion of raw records into the document store
//!
//! Three layers, leaves first:
//!
//! - [`router`] - category to ensured collection, fallback on bad labels
//! - [`upsert`] - insert / merge / no-op decision and the conditional write
//! - [`pipeline`] - batch orchestration and run statistics

pub mod pipeline;
pub mod router;
pub mod upsert;

pub use pipeline::IngestionPipeline;
pub use router::{CollectionRouter, RouteResult};
pub use upsert::UpsertEngine;
