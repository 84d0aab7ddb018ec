//! Cross-collection statistics
//!
//! Read-side aggregation over all known collections: per-collection count
//! and mean rating, plus the global rollup. Documents without a parsed
//! rating are excluded from means, never counted as zero. A collection that
//! vanishes between the listing call and the aggregation call contributes
//! zero rather than failing the report.

use futures::future;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::Result;
use crate::store::{RatingAggregate, SharedDocumentStore, StoreError};

/// Global rollup over every collection
#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalStats {
    pub total_establishments: u64,
    /// Mean over rated documents across all collections; None when nothing
    /// is rated
    pub average_rating: Option<f64>,
    pub collections_count: u64,
}

/// Statistics for one collection
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionStats {
    pub count: u64,
    pub average_rating: Option<f64>,
}

/// Read-only reporter over one document store
pub struct StatsReporter {
    store: SharedDocumentStore,
}

impl StatsReporter {
    pub fn new(store: SharedDocumentStore) -> Self {
        Self { store }
    }

    /// Aggregate counts and mean rating across all collections
    pub async fn global_stats(&self) -> Result<GlobalStats> {
        let collections = self.store.list_collections().await?;

        let aggregates =
            future::try_join_all(collections.iter().map(|name| self.aggregate_or_zero(name)))
                .await?;

        let mut total = 0u64;
        let mut rated = 0u64;
        let mut rating_sum = 0.0;

        for agg in aggregates {
            total += agg.count;
            rated += agg.rated;
            rating_sum += agg.rating_sum;
        }

        let average_rating = if rated == 0 {
            None
        } else {
            Some(round2(rating_sum / rated as f64))
        };

        Ok(GlobalStats {
            total_establishments: total,
            average_rating,
            collections_count: collections.len() as u64,
        })
    }

    /// Per-collection counts and mean ratings
    pub async fn per_type_stats(&self) -> Result<BTreeMap<String, CollectionStats>> {
        let collections = self.store.list_collections().await?;

        let aggregates =
            future::try_join_all(collections.iter().map(|name| self.aggregate_or_zero(name)))
                .await?;

        Ok(collections
            .into_iter()
            .zip(aggregates)
            .map(|(name, agg)| {
                (
                    name,
                    CollectionStats {
                        count: agg.count,
                        average_rating: agg.average().map(round2),
                    },
                )
            })
            .collect())
    }

    /// Aggregate one collection, treating a vanished collection as empty
    async fn aggregate_or_zero(&self, name: &str) -> Result<RatingAggregate> {
        match self.store.aggregate_ratings(name).await {
            Ok(agg) => Ok(agg),
            Err(StoreError::CollectionNotFound(_)) => {
                debug!(collection = %name, "collection vanished during aggregation");
                Ok(RatingAggregate::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
