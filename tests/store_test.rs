//! Trait-level tests run against every store backend

mod common;

use std::sync::Arc;

use annuaire::models::NormalizedDocument;
use annuaire::normalize::record::normalize;
use annuaire::store::{
    DocumentStore, MemoryStore, SharedDocumentStore, SqliteStore, StoreError, COLLECTION_INDEXES,
};

// Helper to create test stores covering every backend
fn create_test_stores() -> Vec<SharedDocumentStore> {
    vec![
        Arc::new(MemoryStore::new()),
        Arc::new(SqliteStore::in_memory().unwrap()),
    ]
}

fn doc(name: &str, address: &str) -> NormalizedDocument {
    normalize(&common::create_record(name, "Restaurant", address))
}

#[tokio::test]
async fn test_ensure_is_idempotent_everywhere() {
    for store in create_test_stores() {
        assert!(store.ensure_collection("restaurant").await.unwrap());
        assert!(!store.ensure_collection("restaurant").await.unwrap());

        // Index provisioning twice must be a no-op, not an error
        store
            .create_indexes("restaurant", COLLECTION_INDEXES)
            .await
            .unwrap();
        store
            .create_indexes("restaurant", COLLECTION_INDEXES)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_unique_hash_per_collection() {
    for store in create_test_stores() {
        store.ensure_collection("restaurant").await.unwrap();

        let d = doc("Le Gourmet", "123 Rue de la Paix");
        store.upsert("restaurant", None, &d).await.unwrap();

        // A second unconditional insert of the same identity must be
        // rejected by the store, not silently duplicated
        let err = store.upsert("restaurant", None, &d).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.count("restaurant").await.unwrap(), 1);
    }
}

#[tokio::test]
async fn test_same_identity_allowed_in_different_collections() {
    for store in create_test_stores() {
        store.ensure_collection("restaurant").await.unwrap();
        store.ensure_collection("traiteur").await.unwrap();

        let d = doc("Le Gourmet", "123 Rue de la Paix");
        store.upsert("restaurant", None, &d).await.unwrap();
        store.upsert("traiteur", None, &d).await.unwrap();

        assert_eq!(store.count("restaurant").await.unwrap(), 1);
        assert_eq!(store.count("traiteur").await.unwrap(), 1);
    }
}

#[tokio::test]
async fn test_conditional_write_rejects_stale_revision() {
    for store in create_test_stores() {
        store.ensure_collection("restaurant").await.unwrap();

        let d = doc("Le Gourmet", "123 Rue de la Paix");
        store.upsert("restaurant", None, &d).await.unwrap();

        let stale = d.metadata.updated_at + chrono::Duration::milliseconds(1);
        let err = store
            .upsert("restaurant", Some(stale), &d)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        store
            .upsert("restaurant", Some(d.metadata.updated_at), &d)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_find_returns_full_document() {
    for store in create_test_stores() {
        store.ensure_collection("restaurant").await.unwrap();

        let d = normalize(&common::create_test_record());
        store.upsert("restaurant", None, &d).await.unwrap();

        let found = store
            .find_by_hash("restaurant", &d.metadata.hash_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, d);

        let absent_hash = "0".repeat(64);
        let missing = store
            .find_by_hash("restaurant", &absent_hash)
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}

#[tokio::test]
async fn test_operations_on_missing_collection() {
    for store in create_test_stores() {
        for result in [
            store.count("absent").await.err(),
            store.aggregate_ratings("absent").await.err(),
            store.find_by_hash("absent", "x").await.err(),
        ] {
            assert!(matches!(result, Some(StoreError::CollectionNotFound(_))));
        }
    }
}

#[tokio::test]
async fn test_list_collections_excludes_system_state() {
    for store in create_test_stores() {
        assert!(store.list_collections().await.unwrap().is_empty());

        store.ensure_collection("restaurant").await.unwrap();
        store.ensure_collection("divers").await.unwrap();

        let mut names = store.list_collections().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["divers".to_string(), "restaurant".to_string()]);
    }
}

#[tokio::test]
async fn test_concurrent_inserts_of_same_identity() {
    for store in create_test_stores() {
        store.ensure_collection("restaurant").await.unwrap();
        let d = doc("Le Gourmet", "123 Rue de la Paix");

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let d = d.clone();
                tokio::spawn(async move { store.upsert("restaurant", None, &d).await })
            })
            .collect();

        let mut wins = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                wins += 1;
            }
        }

        // Exactly one writer wins; the store serializes the rest
        assert_eq!(wins, 1);
        assert_eq!(store.count("restaurant").await.unwrap(), 1);
    }
}
