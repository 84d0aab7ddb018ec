// Core data structures for the annuaire ingestion pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Source tag stamped into every persisted document's metadata
pub const SOURCE_TAG: &str = "pagesjaunes_scraper";

/// Raw business-listing record as produced by the scraper
///
/// All fields are optional and loosely typed; the normalization layer is the
/// only consumer and converts this into a [`NormalizedDocument`]. Unknown
/// fields are ignored on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub name: Option<String>,

    /// Business category label, e.g. "Restaurant" or "Coiffeur / Barbier"
    #[serde(rename = "type", default)]
    pub category: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    /// Either a boolean or the strings "true"/"false"
    #[serde(default)]
    pub professional: Option<Value>,

    /// Ordered sequence of [rating-string, comment-string] pairs
    #[serde(default)]
    pub avis: Option<Value>,

    /// Ordered sequence of schedule entries, "09:00-12:00 -> Lundi" form;
    /// entries may be bare strings or single-element arrays
    #[serde(default)]
    pub horaire: Option<Value>,
}

/// Canonical day of week, serialized as the French day name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Lundi,
    Mardi,
    Mercredi,
    Jeudi,
    Vendredi,
    Samedi,
    Dimanche,
}

impl Weekday {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lundi => "lundi",
            Self::Mardi => "mardi",
            Self::Mercredi => "mercredi",
            Self::Jeudi => "jeudi",
            Self::Vendredi => "vendredi",
            Self::Samedi => "samedi",
            Self::Dimanche => "dimanche",
        }
    }

    /// Parse a day token case-insensitively, tolerating surrounding
    /// whitespace ("Lundi", " lundi ", "LUNDI" all match)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lundi" => Some(Self::Lundi),
            "mardi" => Some(Self::Mardi),
            "mercredi" => Some(Self::Mercredi),
            "jeudi" => Some(Self::Jeudi),
            "vendredi" => Some(Self::Vendredi),
            "samedi" => Some(Self::Samedi),
            "dimanche" => Some(Self::Dimanche),
            _ => None,
        }
    }

    /// All seven days, Monday first
    pub fn all() -> Vec<Self> {
        vec![
            Self::Lundi,
            Self::Mardi,
            Self::Mercredi,
            Self::Jeudi,
            Self::Vendredi,
            Self::Samedi,
            Self::Dimanche,
        ]
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single customer review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Rating as scraped, e.g. "4/5"
    pub rating: String,
    pub comment: String,
}

/// Derived and bookkeeping fields attached to every persisted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Deduplication key; SHA-256 over normalized name + address
    pub hash_id: String,

    /// Set once at first insertion, immutable afterwards
    pub inserted_at: DateTime<Utc>,

    /// Bumped on every write
    pub updated_at: DateTime<Utc>,

    /// Mean of the parseable ratings; None when no rating parses
    pub note_moyenne: Option<f64>,

    /// Review count
    pub nombre_avis: u32,

    pub source: String,
}

/// Canonical persisted document shape
///
/// Produced once per ingestion pass by the normalizer; raw untyped records
/// never travel past the normalization boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub name: String,

    /// Original category label, preserved verbatim for display
    #[serde(rename = "type")]
    pub category: String,

    pub professional: bool,
    pub address: String,

    /// Reviews in scrape order
    pub avis: Vec<Review>,

    /// Day -> schedule string (or "Fermé"); unrecognized days are dropped
    /// during normalization
    pub horaires: BTreeMap<Weekday, String>,

    pub metadata: DocumentMetadata,

    /// Lower-cased, accent-folded, whitespace-collapsed name for
    /// case-insensitive matching
    pub searchable_name: String,

    pub has_reviews: bool,
    pub has_schedule: bool,
}

impl NormalizedDocument {
    /// Compare content-relevant fields, ignoring write timestamps
    ///
    /// Used by the upsert engine to decide Unchanged vs. Updated; hash_id is
    /// equal by construction when two documents are compared at all, and
    /// searchable_name / has_* are derived from the compared fields.
    pub fn content_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.category == other.category
            && self.professional == other.professional
            && self.address == other.address
            && self.avis == other.avis
            && self.horaires == other.horaires
            && self.metadata.note_moyenne == other.metadata.note_moyenne
            && self.metadata.nombre_avis == other.metadata.nombre_avis
    }
}

/// Outcome of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    /// Document was absent; written with fresh timestamps
    Inserted,
    /// Document was present with different content; merged
    Updated,
    /// Document was present and content-identical; no write performed
    Unchanged,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

/// A record that could not be ingested, with enough context for replay
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    /// Position of the record in the input batch
    pub index: usize,

    /// Establishment name if one was present
    pub name: Option<String>,

    pub reason: String,
}

/// Statistics for one ingestion run
///
/// An explicit value threaded through the pipeline and merged functionally
/// per record; nothing mutates shared counters behind the caller's back.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub run_id: Uuid,
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub failed: u64,
    pub collections_created: u64,
    pub failures: Vec<RecordFailure>,
}

impl RunStats {
    /// Create empty stats with a fresh run identifier
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            inserted: 0,
            updated: 0,
            unchanged: 0,
            failed: 0,
            collections_created: 0,
            failures: Vec::new(),
        }
    }

    /// Fold in one upsert outcome
    pub fn with_outcome(mut self, outcome: UpsertOutcome) -> Self {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
        self
    }

    /// Fold in one per-record failure
    pub fn with_failure(mut self, failure: RecordFailure) -> Self {
        self.failed += 1;
        self.failures.push(failure);
        self
    }

    /// Fold in a newly created collection
    pub fn with_new_collection(mut self) -> Self {
        self.collections_created += 1;
        self
    }

    /// Total records processed, successfully or not
    pub fn total_processed(&self) -> u64 {
        self.inserted + self.updated + self.unchanged + self.failed
    }

    /// Fraction of records that were stored or confirmed unchanged
    pub fn success_rate(&self) -> f64 {
        let total = self.total_processed();
        if total == 0 {
            return 1.0;
        }
        (total - self.failed) as f64 / total as f64
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}
