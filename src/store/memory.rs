//! In-memory document store
//!
//! Backs tests and dry runs without touching disk. Enforces the same
//! conditional-write and uniqueness semantics as the persistent backend;
//! index provisioning is recorded but has no effect beyond the unique
//! constraint, which the map structure enforces by construction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::models::NormalizedDocument;
use crate::store::{DocumentStore, IndexSpec, RatingAggregate, StoreError};

/// One collection: hash_id -> document
type Collection = HashMap<String, NormalizedDocument>;

/// In-memory implementation of [`DocumentStore`]
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Collection>>,
    indexed: RwLock<HashMap<String, usize>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total documents across all collections
    pub fn len(&self) -> usize {
        self.collections
            .read()
            .unwrap()
            .values()
            .map(HashMap::len)
            .sum()
    }

    /// Check if the store holds no documents
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all collections
    pub fn clear(&self) {
        self.collections.write().unwrap().clear();
        self.indexed.write().unwrap().clear();
    }

    /// Number of index specs recorded for a collection
    pub fn index_count(&self, collection: &str) -> usize {
        self.indexed
            .read()
            .unwrap()
            .get(collection)
            .copied()
            .unwrap_or(0)
    }

    /// Remove a collection entirely (simulates concurrent drops in tests)
    pub fn drop_collection(&self, name: &str) -> bool {
        self.collections.write().unwrap().remove(name).is_some()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_collection(&self, name: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().unwrap();
        if collections.contains_key(name) {
            return Ok(false);
        }
        collections.insert(name.to_string(), HashMap::new());
        Ok(true)
    }

    async fn create_indexes(
        &self,
        collection: &str,
        specs: &[IndexSpec],
    ) -> Result<(), StoreError> {
        if !self.collections.read().unwrap().contains_key(collection) {
            return Err(StoreError::CollectionNotFound(collection.to_string()));
        }
        self.indexed
            .write()
            .unwrap()
            .insert(collection.to_string(), specs.len());
        Ok(())
    }

    async fn find_by_hash(
        &self,
        collection: &str,
        hash_id: &str,
    ) -> Result<Option<NormalizedDocument>, StoreError> {
        let collections = self.collections.read().unwrap();
        let docs = collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        Ok(docs.get(hash_id).cloned())
    }

    async fn upsert(
        &self,
        collection: &str,
        expected: Option<DateTime<Utc>>,
        doc: &NormalizedDocument,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().unwrap();
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        let hash_id = &doc.metadata.hash_id;
        let current = docs.get(hash_id).map(|d| d.metadata.updated_at);

        // The write lock makes check-and-write one critical section, which
        // is this backend's native atomic upsert
        match (expected, current) {
            (None, None) => {
                docs.insert(hash_id.clone(), doc.clone());
                Ok(())
            }
            (Some(rev), Some(cur)) if rev == cur => {
                docs.insert(hash_id.clone(), doc.clone());
                Ok(())
            }
            _ => Err(StoreError::WriteConflict {
                hash_id: hash_id.clone(),
            }),
        }
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.collections.read().unwrap().keys().cloned().collect())
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let collections = self.collections.read().unwrap();
        let docs = collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        Ok(docs.len() as u64)
    }

    async fn aggregate_ratings(&self, collection: &str) -> Result<RatingAggregate, StoreError> {
        let collections = self.collections.read().unwrap();
        let docs = collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        let mut agg = RatingAggregate {
            count: docs.len() as u64,
            ..Default::default()
        };
        for doc in docs.values() {
            if let Some(note) = doc.metadata.note_moyenne {
                agg.rated += 1;
                agg.rating_sum += note;
            }
        }
        Ok(agg)
    }
}
