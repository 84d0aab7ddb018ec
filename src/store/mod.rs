//! Document store abstraction and backends
//!
//! Business logic never talks to a database engine directly; it goes through
//! the [`DocumentStore`] trait, which models the small surface the ingestion
//! layer needs: ensure a collection, provision its indexes, look up by
//! identity hash, conditionally upsert, list collections, and aggregate.
//!
//! Two backends implement the trait:
//!
//! - [`SqliteStore`] - embedded persistent backend (one table per
//!   collection, unique index on the identity hash)
//! - [`MemoryStore`] - in-memory backend for tests
//!
//! The conditional [`DocumentStore::upsert`] is the store's atomic
//! primitive: the caller passes the revision it observed at read time
//! (`None` for "expect absent") and the store rejects the write with
//! [`StoreError::WriteConflict`] when the expectation no longer holds.
//! Uniqueness of `hash_id` per collection is enforced by the store, never by
//! application-level locking.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::models::NormalizedDocument;

// ============================================================================
// Errors
// ============================================================================

/// Store-level failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not open or reach the backing store
    #[error("connection failed: {0}")]
    Connection(String),

    /// Collection does not exist (it may have vanished between a listing
    /// call and the operation)
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// Conditional write expectation no longer holds; the caller may
    /// re-read and retry
    #[error("write conflict on {hash_id}")]
    WriteConflict { hash_id: String },

    /// Collection identifier rejected before reaching the engine
    #[error("invalid collection name: {0:?}")]
    InvalidCollectionName(String),

    /// Any other write failure
    #[error("write failed: {0}")]
    Write(String),

    /// Document (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SQLite engine error
    #[error("backend error: {0}")]
    Backend(#[from] rusqlite::Error),
}

impl StoreError {
    /// Check whether this error is an optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::WriteConflict { .. })
    }
}

// ============================================================================
// Index specification
// ============================================================================

/// Index kind, in document-store terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Text search index over the listed fields
    Text,
    /// Plain ascending index
    Ascending,
    /// Unique ascending index
    Unique,
}

/// One index to provision on a collection
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub fields: &'static [&'static str],
    pub kind: IndexKind,
}

/// The index set provisioned on every collection
///
/// Reproduced exactly for compatibility with the existing data: a text index
/// over name+type, plain indexes over address, rating, review list,
/// professional flag and insertion time, and the unique index over the
/// identity hash that carries the deduplication invariant.
pub const COLLECTION_INDEXES: &[IndexSpec] = &[
    IndexSpec {
        fields: &["name", "type"],
        kind: IndexKind::Text,
    },
    IndexSpec {
        fields: &["address"],
        kind: IndexKind::Ascending,
    },
    IndexSpec {
        fields: &["metadata.note_moyenne"],
        kind: IndexKind::Ascending,
    },
    IndexSpec {
        fields: &["avis"],
        kind: IndexKind::Ascending,
    },
    IndexSpec {
        fields: &["metadata.hash_id"],
        kind: IndexKind::Unique,
    },
    IndexSpec {
        fields: &["professional"],
        kind: IndexKind::Ascending,
    },
    IndexSpec {
        fields: &["metadata.inserted_at"],
        kind: IndexKind::Ascending,
    },
];

// ============================================================================
// Aggregation result
// ============================================================================

/// Rating aggregate for one collection
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingAggregate {
    /// Total documents in the collection
    pub count: u64,

    /// Documents carrying a parsed rating
    pub rated: u64,

    /// Sum of `metadata.note_moyenne` over rated documents
    pub rating_sum: f64,
}

impl RatingAggregate {
    /// Mean rating over rated documents; unrated documents are excluded,
    /// never counted as zero
    pub fn average(&self) -> Option<f64> {
        if self.rated == 0 {
            return None;
        }
        Some(self.rating_sum / self.rated as f64)
    }
}

// ============================================================================
// Store trait
// ============================================================================

/// Generic document-store interface consumed by the ingestion layer
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the collection if it does not exist
    ///
    /// Returns true when this call created it. "Already exists" is success,
    /// so concurrent ensures of the same collection cannot fail each other.
    async fn ensure_collection(&self, name: &str) -> Result<bool, StoreError>;

    /// Provision indexes on a collection; existing indexes are a no-op
    async fn create_indexes(&self, collection: &str, specs: &[IndexSpec])
        -> Result<(), StoreError>;

    /// Look up a document by its identity hash
    async fn find_by_hash(
        &self,
        collection: &str,
        hash_id: &str,
    ) -> Result<Option<NormalizedDocument>, StoreError>;

    /// Atomic conditional write keyed on the identity hash
    ///
    /// `expected` is the `updated_at` revision observed at read time, or
    /// `None` to insert only if absent. A stale expectation yields
    /// [`StoreError::WriteConflict`].
    async fn upsert(
        &self,
        collection: &str,
        expected: Option<DateTime<Utc>>,
        doc: &NormalizedDocument,
    ) -> Result<(), StoreError>;

    /// List all non-system collections
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Count documents in a collection
    async fn count(&self, collection: &str) -> Result<u64, StoreError>;

    /// Aggregate document count and rating sum for a collection
    async fn aggregate_ratings(&self, collection: &str) -> Result<RatingAggregate, StoreError>;
}

/// Thread-safe shared store handle
pub type SharedDocumentStore = Arc<dyn DocumentStore>;
