//! Routing of documents to per-category collections
//!
//! Each business category maps to one collection; the router derives the
//! collection name, falls back to the reserved `divers` collection when the
//! label is unusable, and ensures the collection exists with its full index
//! set before the first document reaches it.

use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::normalize::sanitize::{sanitize_collection_name, FALLBACK_COLLECTION};
use crate::store::{SharedDocumentStore, COLLECTION_INDEXES};

/// Result of routing one category
#[derive(Debug, Clone)]
pub struct RouteResult {
    /// Target collection name
    pub collection: String,

    /// True when this call created the collection in the store
    pub created: bool,
}

/// Maps categories to ensured collections
pub struct CollectionRouter {
    store: SharedDocumentStore,

    /// Collections already ensured by this router, to skip redundant
    /// round-trips on the hot path
    ensured: Mutex<HashSet<String>>,
}

impl CollectionRouter {
    pub fn new(store: SharedDocumentStore) -> Self {
        Self {
            store,
            ensured: Mutex::new(HashSet::new()),
        }
    }

    /// Resolve a category to its collection, creating it on first use
    ///
    /// Creation and index provisioning behave as one idempotent "ensure":
    /// concurrent callers racing on a new category both succeed, because
    /// the store treats "already exists" as success. An unusable category
    /// label routes to [`FALLBACK_COLLECTION`] instead of failing.
    pub async fn route(&self, category: &str) -> Result<RouteResult> {
        let collection = match sanitize_collection_name(category) {
            Ok(name) => name,
            Err(Error::InvalidCategory(raw)) => {
                warn!(
                    category = %raw,
                    fallback = FALLBACK_COLLECTION,
                    "invalid category, routing to fallback collection"
                );
                FALLBACK_COLLECTION.to_string()
            }
            Err(e) => return Err(e),
        };

        if self.ensured.lock().unwrap().contains(&collection) {
            return Ok(RouteResult {
                collection,
                created: false,
            });
        }

        let created = self.store.ensure_collection(&collection).await?;
        self.store
            .create_indexes(&collection, COLLECTION_INDEXES)
            .await?;
        self.ensured.lock().unwrap().insert(collection.clone());

        if created {
            info!(collection = %collection, "new collection discovered");
        }

        Ok(RouteResult {
            collection,
            created,
        })
    }
}
