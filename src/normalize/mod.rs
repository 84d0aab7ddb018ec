//! Normalization of raw scraped records into the canonical document shape
//!
//! Three pure layers, leaves first:
//!
//! - [`sanitize`] - category labels to collection identifiers, plus the
//!   shared text-folding helpers
//! - [`identity`] - stable deduplication hash over name + address
//! - [`record`] - raw record to [`crate::models::NormalizedDocument`]

pub mod identity;
pub mod record;
pub mod sanitize;

pub use identity::identity_hash;
pub use record::normalize;
pub use sanitize::{sanitize_collection_name, FALLBACK_COLLECTION};
