//! Raw record to canonical document conversion
//!
//! [`normalize`] is a total function: missing or malformed fields degrade to
//! defaults (empty list, empty string, false) and are logged as warnings,
//! never propagated as errors. Record-level rejection (e.g. an empty name)
//! is the pipeline's decision, not the normalizer's.

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::models::{
    DocumentMetadata, NormalizedDocument, RawRecord, Review, Weekday, SOURCE_TAG,
};
use crate::normalize::identity::identity_hash;
use crate::normalize::sanitize::normalize_for_matching;

/// Convert a raw scraped record into the canonical persisted shape
pub fn normalize(raw: &RawRecord) -> NormalizedDocument {
    let name = raw.name.as_deref().unwrap_or_default().trim().to_string();
    let category = raw
        .category
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_string();
    let address = raw
        .address
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_string();

    let professional = coerce_professional(raw.professional.as_ref());
    let avis = parse_reviews(raw.avis.as_ref());
    let horaires = parse_schedule(raw.horaire.as_ref());

    let note_moyenne = mean_rating(&avis);
    let nombre_avis = avis.len() as u32;
    let now = Utc::now();

    NormalizedDocument {
        searchable_name: normalize_for_matching(&name),
        has_reviews: !avis.is_empty(),
        has_schedule: !horaires.is_empty(),
        metadata: DocumentMetadata {
            hash_id: identity_hash(&name, &address),
            inserted_at: now,
            updated_at: now,
            note_moyenne,
            nombre_avis,
            source: SOURCE_TAG.to_string(),
        },
        name,
        category,
        professional,
        address,
        avis,
        horaires,
    }
}

/// Coerce the `professional` field from a boolean or "true"/"false" string
///
/// Absent or unrecognized values default to false.
fn coerce_professional(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(other) => {
            warn!(value = %other, "unrecognized professional flag, defaulting to false");
            false
        }
    }
}

/// Extract reviews from the raw `avis` array
///
/// Each entry is expected to be a [rating, comment] pair; entries with only
/// a rating get an empty comment, anything else is skipped with a warning.
fn parse_reviews(value: Option<&Value>) -> Vec<Review> {
    let Some(Value::Array(entries)) = value else {
        if let Some(v) = value {
            if !v.is_null() {
                warn!("avis field is not an array, ignoring");
            }
        }
        return Vec::new();
    };

    let mut reviews = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Value::Array(pair) if !pair.is_empty() => {
                let rating = value_to_text(&pair[0]);
                let comment = pair.get(1).map(value_to_text).unwrap_or_default();
                reviews.push(Review { rating, comment });
            }
            other => {
                warn!(entry = %other, "skipping malformed review entry");
            }
        }
    }
    reviews
}

/// Extract the day -> schedule mapping from the raw `horaire` array
///
/// Entries encode "`<range>` -> `<day>`" (or "`Fermé -> <day>`") and arrive
/// either as bare strings or single-element arrays. Day tokens that do not
/// match one of the seven canonical names are dropped with a warning.
fn parse_schedule(value: Option<&Value>) -> BTreeMap<Weekday, String> {
    let Some(Value::Array(entries)) = value else {
        if let Some(v) = value {
            if !v.is_null() {
                warn!("horaire field is not an array, ignoring");
            }
        }
        return BTreeMap::new();
    };

    let mut schedule = BTreeMap::new();
    for entry in entries {
        let text = match entry {
            Value::String(s) => s.clone(),
            Value::Array(inner) if !inner.is_empty() => value_to_text(&inner[0]),
            other => {
                warn!(entry = %other, "skipping malformed schedule entry");
                continue;
            }
        };

        match parse_schedule_entry(&text) {
            Some((day, hours)) => {
                schedule.insert(day, hours);
            }
            None => warn!(entry = %text, "dropping schedule entry with unrecognized day"),
        }
    }
    schedule
}

/// Split one schedule entry on the `->` separator
///
/// The left part is the schedule text, the right part (trimmed) must match a
/// canonical day name case-insensitively.
fn parse_schedule_entry(text: &str) -> Option<(Weekday, String)> {
    let (hours, day_token) = text.rsplit_once("->")?;
    let day = Weekday::parse(day_token)?;
    Some((day, hours.trim().to_string()))
}

/// Parse one rating of the form "N/5" or a bare "N", clamped to 0..=5
///
/// Returns None when the numeric part does not parse; the caller excludes
/// that review from the mean rather than aborting.
pub fn parse_rating(rating: &str) -> Option<f64> {
    let numeric = match rating.split_once('/') {
        Some((n, _)) => n,
        None => rating,
    };
    let value: f64 = numeric.trim().parse().ok()?;
    Some(value.clamp(0.0, 5.0))
}

/// Arithmetic mean of the parseable ratings, rounded to two decimals
///
/// None when no rating parses; unparseable entries are excluded, never
/// counted as zero.
pub fn mean_rating(reviews: &[Review]) -> Option<f64> {
    let mut total = 0.0;
    let mut count = 0u32;
    for review in reviews {
        match parse_rating(&review.rating) {
            Some(value) => {
                total += value;
                count += 1;
            }
            None => warn!(rating = %review.rating, "unparseable rating excluded from average"),
        }
    }
    if count == 0 {
        return None;
    }
    Some((total / f64::from(count) * 100.0).round() / 100.0)
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}
