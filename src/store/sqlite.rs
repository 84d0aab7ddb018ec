//! Embedded SQLite document store
//!
//! One table per collection plus a `collections` registry table. Documents
//! are stored as JSON alongside extracted columns so the index set of the
//! store contract maps onto native SQLite indexes; the unique index on
//! `hash_id` is the primary key and carries the deduplication invariant.
//!
//! Collection names are validated against the sanitizer's output shape
//! before ever reaching an SQL identifier position, and every CREATE uses
//! IF NOT EXISTS so concurrent ensures of the same collection succeed.

use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{LazyLock, Mutex};
use tracing::{debug, warn};

use async_trait::async_trait;

use crate::models::NormalizedDocument;
use crate::store::{DocumentStore, IndexKind, IndexSpec, RatingAggregate, StoreError};

static COLLECTION_NAME_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(_[a-z0-9]+)*$").unwrap());

/// SQLite implementation of [`DocumentStore`]
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection; every
/// upsert is a single statement, which SQLite executes atomically.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Connection(format!("{}: {e}", path.display())))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::Connection(format!("{}: {e}", path.display())))?;

        // WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_registry()?;

        debug!(path = %path.display(), "SQLite store opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Connection(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_registry()?;
        Ok(store)
    }

    fn create_registry(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }

    /// Reject names that could not have come from the sanitizer before they
    /// reach an identifier position
    fn validate_name(name: &str) -> Result<(), StoreError> {
        if name.len() <= 50 && COLLECTION_NAME_SHAPE.is_match(name) {
            Ok(())
        } else {
            Err(StoreError::InvalidCollectionName(name.to_string()))
        }
    }

    fn table_for(name: &str) -> String {
        format!("doc_{name}")
    }

    /// Closest native column for a document field path
    fn column_for_field(field: &str) -> Option<&'static str> {
        match field {
            "name" => Some("name"),
            "type" => Some("category"),
            "address" => Some("address"),
            "professional" => Some("professional"),
            "avis" => Some("nombre_avis"),
            "metadata.note_moyenne" => Some("note_moyenne"),
            "metadata.hash_id" => Some("hash_id"),
            "metadata.inserted_at" => Some("inserted_at"),
            "metadata.updated_at" => Some("updated_at"),
            _ => None,
        }
    }

    fn map_err(collection: &str, e: rusqlite::Error) -> StoreError {
        if e.to_string().contains("no such table") {
            StoreError::CollectionNotFound(collection.to_string())
        } else {
            StoreError::Backend(e)
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn ensure_collection(&self, name: &str) -> Result<bool, StoreError> {
        Self::validate_name(name)?;
        let table = Self::table_for(name);

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let created = tx.execute(
            "INSERT OR IGNORE INTO collections (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now().to_rfc3339()],
        )? == 1;

        tx.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{table}" (
                hash_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                address TEXT NOT NULL,
                professional INTEGER NOT NULL,
                note_moyenne REAL,
                nombre_avis INTEGER NOT NULL,
                inserted_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                document TEXT NOT NULL
            );
            "#
        ))?;

        tx.commit()?;
        Ok(created)
    }

    async fn create_indexes(
        &self,
        collection: &str,
        specs: &[IndexSpec],
    ) -> Result<(), StoreError> {
        Self::validate_name(collection)?;
        let table = Self::table_for(collection);
        let conn = self.conn.lock().unwrap();

        for spec in specs {
            let columns: Vec<&str> = spec
                .fields
                .iter()
                .filter_map(|f| {
                    let col = Self::column_for_field(f);
                    if col.is_none() {
                        warn!(field = %f, "no native column for indexed field, skipping");
                    }
                    col
                })
                .collect();

            if columns.is_empty() {
                continue;
            }

            let unique = if spec.kind == IndexKind::Unique {
                "UNIQUE "
            } else {
                ""
            };
            let index_name = format!("idx_{table}_{}", columns.join("_"));
            let sql = format!(
                "CREATE {unique}INDEX IF NOT EXISTS \"{index_name}\" ON \"{table}\" ({})",
                columns.join(", ")
            );
            conn.execute(&sql, [])
                .map_err(|e| Self::map_err(collection, e))?;
        }

        Ok(())
    }

    async fn find_by_hash(
        &self,
        collection: &str,
        hash_id: &str,
    ) -> Result<Option<NormalizedDocument>, StoreError> {
        Self::validate_name(collection)?;
        let table = Self::table_for(collection);
        let conn = self.conn.lock().unwrap();

        let json: Option<String> = conn
            .query_row(
                &format!("SELECT document FROM \"{table}\" WHERE hash_id = ?1"),
                params![hash_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Self::map_err(collection, e))?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn upsert(
        &self,
        collection: &str,
        expected: Option<DateTime<Utc>>,
        doc: &NormalizedDocument,
    ) -> Result<(), StoreError> {
        Self::validate_name(collection)?;
        let table = Self::table_for(collection);
        let json = serde_json::to_string(doc)?;
        let conn = self.conn.lock().unwrap();

        match expected {
            // Insert only if absent; the primary key rejects a concurrent
            // insert of the same identity
            None => {
                let result = conn.execute(
                    &format!(
                        r#"
                        INSERT INTO "{table}"
                            (hash_id, name, category, address, professional,
                             note_moyenne, nombre_avis, inserted_at, updated_at, document)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                        "#
                    ),
                    params![
                        doc.metadata.hash_id,
                        doc.name,
                        doc.category,
                        doc.address,
                        doc.professional,
                        doc.metadata.note_moyenne,
                        doc.metadata.nombre_avis,
                        doc.metadata.inserted_at.to_rfc3339(),
                        doc.metadata.updated_at.to_rfc3339(),
                        json,
                    ],
                );

                match result {
                    Ok(_) => Ok(()),
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        Err(StoreError::WriteConflict {
                            hash_id: doc.metadata.hash_id.clone(),
                        })
                    }
                    Err(e) => Err(Self::map_err(collection, e)),
                }
            }

            // Replace only if the revision observed at read time still holds
            Some(revision) => {
                let changed = conn
                    .execute(
                        &format!(
                            r#"
                            UPDATE "{table}" SET
                                name = ?1, category = ?2, address = ?3,
                                professional = ?4, note_moyenne = ?5,
                                nombre_avis = ?6, inserted_at = ?7,
                                updated_at = ?8, document = ?9
                            WHERE hash_id = ?10 AND updated_at = ?11
                            "#
                        ),
                        params![
                            doc.name,
                            doc.category,
                            doc.address,
                            doc.professional,
                            doc.metadata.note_moyenne,
                            doc.metadata.nombre_avis,
                            doc.metadata.inserted_at.to_rfc3339(),
                            doc.metadata.updated_at.to_rfc3339(),
                            json,
                            doc.metadata.hash_id,
                            revision.to_rfc3339(),
                        ],
                    )
                    .map_err(|e| Self::map_err(collection, e))?;

                if changed == 0 {
                    return Err(StoreError::WriteConflict {
                        hash_id: doc.metadata.hash_id.clone(),
                    });
                }
                Ok(())
            }
        }
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        Self::validate_name(collection)?;
        let table = Self::table_for(collection);
        let conn = self.conn.lock().unwrap();

        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                row.get(0)
            })
            .map_err(|e| Self::map_err(collection, e))?;
        Ok(count as u64)
    }

    async fn aggregate_ratings(&self, collection: &str) -> Result<RatingAggregate, StoreError> {
        Self::validate_name(collection)?;
        let table = Self::table_for(collection);
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!(
                "SELECT COUNT(*), COUNT(note_moyenne), COALESCE(SUM(note_moyenne), 0.0)
                 FROM \"{table}\""
            ),
            [],
            |row| {
                Ok(RatingAggregate {
                    count: row.get::<_, i64>(0)? as u64,
                    rated: row.get::<_, i64>(1)? as u64,
                    rating_sum: row.get(2)?,
                })
            },
        )
        .map_err(|e| Self::map_err(collection, e))
    }
}
