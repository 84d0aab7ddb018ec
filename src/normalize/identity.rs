//! Stable identity hashing for deduplication
//!
//! The identity of an establishment is a SHA-256 digest over its normalized
//! name and address, and nothing else. Mutable fields (reviews, schedules)
//! never participate, so re-scraping the same establishment with fresh
//! reviews maps to the same identity.

use sha2::{Digest, Sha256};

use crate::normalize::sanitize::normalize_for_matching;

/// Compute the deduplication key for an establishment
///
/// Lower-cases, folds accents and collapses whitespace in both fields before
/// hashing, so incidental casing or spacing differences between scrapes
/// never split an identity. Output is 64 hex characters.
///
/// # Examples
///
/// ```
/// use annuaire::normalize::identity::identity_hash;
///
/// let a = identity_hash("Le Gourmet", "123 Rue de la Paix");
/// let b = identity_hash("LE  GOURMET", " 123 rue de la paix ");
/// assert_eq!(a, b);
/// ```
pub fn identity_hash(name: &str, address: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_for_matching(name).as_bytes());
    hasher.update(b"|");
    hasher.update(normalize_for_matching(address).as_bytes());
    format!("{:x}", hasher.finalize())
}
