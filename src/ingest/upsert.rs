//! Insert-or-update engine with hash-based duplicate detection
//!
//! For each incoming document the engine looks up the stored document with
//! the same identity hash, then decides:
//!
//! - absent: write with fresh timestamps (Inserted)
//! - present, content-identical: no write at all, so repeated runs over an
//!   unchanged source never churn `updated_at` (Unchanged)
//! - present, different: merge per [`MergePolicy`] and write (Updated)
//!
//! The write is the store's atomic conditional upsert; when a concurrent
//! writer invalidates the observed revision, the whole read-decide-write
//! cycle is retried a bounded number of times before surfacing a
//! storage-write error.

use chrono::Utc;
use tracing::debug;

use crate::config::MergePolicy;
use crate::error::{Error, Result};
use crate::models::{NormalizedDocument, UpsertOutcome};
use crate::normalize::record::mean_rating;
use crate::store::{SharedDocumentStore, StoreError};
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Insert-or-update engine for one document store
pub struct UpsertEngine {
    store: SharedDocumentStore,
    merge_policy: MergePolicy,
    retry: RetryConfig,
}

impl UpsertEngine {
    /// Create an engine; `max_write_attempts` bounds the optimistic
    /// conflict-retry loop (total attempts, minimum 1)
    pub fn new(
        store: SharedDocumentStore,
        merge_policy: MergePolicy,
        max_write_attempts: u32,
    ) -> Self {
        Self {
            store,
            merge_policy,
            retry: RetryConfig::with_delays(max_write_attempts.saturating_sub(1), 50, 1_000),
        }
    }

    /// Upsert one document into its collection
    ///
    /// Store write failures are reported as [`Error::StorageWrite`] carrying
    /// the collection name and identity hash; the engine retries only write
    /// conflicts, nothing else.
    pub async fn upsert(
        &self,
        collection: &str,
        doc: &NormalizedDocument,
    ) -> Result<UpsertOutcome> {
        with_retry_if(
            &self.retry,
            || self.try_upsert(collection, doc),
            StoreError::is_conflict,
        )
        .await
        .map_err(|e| Error::storage_write(collection, &doc.metadata.hash_id, e))
    }

    /// One read-decide-write cycle
    async fn try_upsert(
        &self,
        collection: &str,
        doc: &NormalizedDocument,
    ) -> std::result::Result<UpsertOutcome, StoreError> {
        let hash_id = &doc.metadata.hash_id;
        let existing = self.store.find_by_hash(collection, hash_id).await?;

        match existing {
            None => {
                let mut fresh = doc.clone();
                let now = Utc::now();
                fresh.metadata.inserted_at = now;
                fresh.metadata.updated_at = now;

                self.store.upsert(collection, None, &fresh).await?;
                Ok(UpsertOutcome::Inserted)
            }
            Some(current) => {
                if current.content_eq(doc) {
                    debug!(collection = %collection, hash_id = %hash_id, "document unchanged, skipping write");
                    return Ok(UpsertOutcome::Unchanged);
                }

                let merged = merge_documents(&current, doc, self.merge_policy);
                self.store
                    .upsert(collection, Some(current.metadata.updated_at), &merged)
                    .await?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }
}

/// Merge an incoming document into the stored one
///
/// `inserted_at` and `hash_id` come from the stored document and never
/// change; `updated_at` is bumped. Under Overwrite the incoming reviews and
/// schedules replace the stored ones wholesale; under Append the stored
/// reviews are kept and extended with unseen incoming ones, schedules are
/// union-merged with the incoming day winning, and the derived rating fields
/// are recomputed over the combined list.
fn merge_documents(
    current: &NormalizedDocument,
    incoming: &NormalizedDocument,
    policy: MergePolicy,
) -> NormalizedDocument {
    let mut merged = incoming.clone();
    merged.metadata.hash_id = current.metadata.hash_id.clone();
    merged.metadata.inserted_at = current.metadata.inserted_at;
    merged.metadata.updated_at = Utc::now();

    if policy == MergePolicy::Append {
        let mut avis = current.avis.clone();
        for review in &incoming.avis {
            if !avis.contains(review) {
                avis.push(review.clone());
            }
        }
        merged.avis = avis;

        let mut horaires = current.horaires.clone();
        horaires.extend(incoming.horaires.clone());
        merged.horaires = horaires;

        merged.metadata.nombre_avis = merged.avis.len() as u32;
        merged.metadata.note_moyenne = mean_rating(&merged.avis);
        merged.has_reviews = !merged.avis.is_empty();
        merged.has_schedule = !merged.horaires.is_empty();
    }

    merged
}
