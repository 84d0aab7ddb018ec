//! Batch ingestion orchestration
//!
//! Drives each raw record through normalize -> route -> upsert and folds the
//! outcomes into a [`RunStats`] value. Records are independent: one record's
//! failure is recorded and the batch continues; only loss of store
//! connectivity aborts the run. A stop signal is honored between records,
//! never mid-record.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::ingest::router::CollectionRouter;
use crate::ingest::upsert::UpsertEngine;
use crate::models::{RawRecord, RecordFailure, RunStats, UpsertOutcome};
use crate::normalize;
use crate::store::{SharedDocumentStore, StoreError};

/// Outcome of one record's trip through the pipeline
struct RecordResult {
    outcome: UpsertOutcome,
    collection_created: bool,
}

/// Batch ingestion pipeline over one document store
pub struct IngestionPipeline {
    router: CollectionRouter,
    engine: UpsertEngine,
    config: IngestConfig,
    stop: Arc<AtomicBool>,
}

impl IngestionPipeline {
    /// Create a pipeline over an explicitly owned store handle
    pub fn new(store: SharedDocumentStore, config: IngestConfig) -> Self {
        Self {
            router: CollectionRouter::new(store.clone()),
            engine: UpsertEngine::new(store, config.merge_policy, config.max_write_attempts),
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for requesting a stop from outside the run
    ///
    /// The flag is checked between records; the record in flight always
    /// completes.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Ingest a batch of raw records
    pub async fn ingest(&self, records: &[RawRecord]) -> Result<RunStats> {
        let mut stats = RunStats::new();
        info!(
            run_id = %stats.run_id,
            total = records.len(),
            "ingestion run started"
        );

        for (index, raw) in records.iter().enumerate() {
            if self.stop.load(Ordering::Relaxed) {
                warn!(processed = index, "stop signal received, ending run early");
                break;
            }

            stats = match self.process_record(raw).await {
                Ok(result) => {
                    let stats = stats.with_outcome(result.outcome);
                    if result.collection_created {
                        stats.with_new_collection()
                    } else {
                        stats
                    }
                }
                Err(e) if is_fatal(&e) => {
                    error!(error = %e, "store connectivity lost, aborting run");
                    return Err(e);
                }
                Err(e) => {
                    warn!(index = index, error = %e, "record failed, continuing");
                    stats.with_failure(RecordFailure {
                        index,
                        name: raw.name.as_deref().map(|n| n.trim().to_string()),
                        reason: e.to_string(),
                    })
                }
            };

            if (index + 1) % self.config.progress_interval == 0 {
                info!(
                    processed = index + 1,
                    total = records.len(),
                    inserted = stats.inserted,
                    updated = stats.updated,
                    unchanged = stats.unchanged,
                    failed = stats.failed,
                    "ingestion progress"
                );
            }
        }

        info!(
            run_id = %stats.run_id,
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.unchanged,
            failed = stats.failed,
            collections_created = stats.collections_created,
            "ingestion run finished"
        );
        Ok(stats)
    }

    /// Batch import mode: read a JSON array of records from a file
    pub async fn ingest_file(&self, path: &Path) -> Result<RunStats> {
        let content = tokio::fs::read_to_string(path).await?;
        let records: Vec<RawRecord> = serde_json::from_str(&content)?;
        info!(path = %path.display(), records = records.len(), "loaded input file");
        self.ingest(&records).await
    }

    /// One record: normalize, reject if unusable, route, upsert
    async fn process_record(&self, raw: &RawRecord) -> Result<RecordResult> {
        let doc = normalize::normalize(raw);

        if doc.name.is_empty() {
            return Err(Error::InvalidRecord(
                "missing establishment name".to_string(),
            ));
        }

        let route = self.router.route(&doc.category).await?;
        let outcome = self.engine.upsert(&route.collection, &doc).await?;

        Ok(RecordResult {
            outcome,
            collection_created: route.created,
        })
    }
}

/// Only connectivity loss aborts a run
fn is_fatal(error: &Error) -> bool {
    matches!(
        error,
        Error::StoreConnection(_) | Error::Store(StoreError::Connection(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::{DocumentStore, MemoryStore};
    use serde_json::json;

    fn records(value: serde_json::Value) -> Vec<RawRecord> {
        serde_json::from_value(value).unwrap()
    }

    fn pipeline() -> (Arc<MemoryStore>, IngestionPipeline) {
        let store = Arc::new(MemoryStore::new());
        let pipeline = IngestionPipeline::new(store.clone(), Config::default().ingest);
        (store, pipeline)
    }

    #[tokio::test]
    async fn test_single_record_run() {
        let (store, pipeline) = pipeline();
        let batch = records(json!([{
            "name": "Le Gourmet",
            "type": "Restaurant",
            "address": "123 Rue de la Paix, 75001 Paris",
            "professional": "true",
            "avis": [["4/5", "ok"]],
            "horaire": [["09:00-12:00 -> Lundi"]]
        }]));

        let stats = pipeline.ingest(&batch).await.unwrap();

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.collections_created, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(store.count("restaurant").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let (store, pipeline) = pipeline();
        let batch = records(json!([
            {"name": "A", "type": "Restaurant", "address": "1 rue x"},
            {"name": "B", "type": "Restaurant", "address": "2 rue x"}
        ]));

        let first = pipeline.ingest(&batch).await.unwrap();
        assert_eq!(first.inserted, 2);

        let second = pipeline.ingest(&batch).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.unchanged, first.inserted + first.updated);
        assert_eq!(store.count("restaurant").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_nameless_record_fails_without_aborting_batch() {
        let (store, pipeline) = pipeline();
        let batch = records(json!([
            {"type": "Restaurant", "address": "1 rue x"},
            {"name": "   ", "type": "Restaurant", "address": "2 rue x"},
            {"name": "B", "type": "Restaurant", "address": "3 rue x"}
        ]));

        let stats = pipeline.ingest(&batch).await.unwrap();

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.failures.len(), 2);
        assert_eq!(stats.failures[0].index, 0);
        assert!(stats.failures[0].reason.contains("name"));
        assert_eq!(store.count("restaurant").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_category_uses_fallback_collection() {
        let (store, pipeline) = pipeline();
        let batch = records(json!([
            {"name": "Sans Type", "type": "", "address": "1 rue x"}
        ]));

        let stats = pipeline.ingest(&batch).await.unwrap();

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(store.count("divers").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stop_signal_honored_between_records() {
        let (store, pipeline) = pipeline();
        pipeline.stop_handle().store(true, Ordering::Relaxed);

        let batch = records(json!([
            {"name": "A", "type": "Restaurant", "address": "1 rue x"}
        ]));
        let stats = pipeline.ingest(&batch).await.unwrap();

        assert_eq!(stats.total_processed(), 0);
        assert!(store.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_file() {
        let (_, pipeline) = pipeline();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        std::fs::write(
            &path,
            r#"[{"name": "A", "type": "Restaurant", "address": "1 rue x"}]"#,
        )
        .unwrap();

        let stats = pipeline.ingest_file(&path).await.unwrap();
        assert_eq!(stats.inserted, 1);
    }

    #[tokio::test]
    async fn test_ingest_file_rejects_non_array() {
        let (_, pipeline) = pipeline();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"name": "not a list"}"#).unwrap();

        let err = pipeline.ingest_file(&path).await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn test_mixed_categories_create_separate_collections() {
        let (store, pipeline) = pipeline();
        let batch = records(json!([
            {"name": "A", "type": "Restaurant", "address": "1 rue x"},
            {"name": "B", "type": "Coiffeur / Barbier", "address": "2 rue x"},
            {"name": "C", "type": "Restaurant", "address": "3 rue x"}
        ]));

        let stats = pipeline.ingest(&batch).await.unwrap();

        assert_eq!(stats.inserted, 3);
        assert_eq!(stats.collections_created, 2);
        let names = store.list_collections().await.unwrap();
        assert_eq!(names, vec!["coiffeur_barbier", "restaurant"]);
    }
}
