//! Common test utilities

use annuaire::models::RawRecord;
use serde_json::json;

/// Create a fully populated test record
pub fn create_test_record() -> RawRecord {
    serde_json::from_value(json!({
        "name": "Le Gourmet",
        "type": "Restaurant",
        "address": "123 Rue de la Paix, 75001 Paris",
        "professional": "true",
        "avis": [["4/5", "ok"]],
        "horaire": [["09:00-12:00 -> Lundi"]]
    }))
    .unwrap()
}

/// Create a minimal record with a specific name, category and address
#[allow(dead_code)]
pub fn create_record(name: &str, category: &str, address: &str) -> RawRecord {
    serde_json::from_value(json!({
        "name": name,
        "type": category,
        "address": address,
    }))
    .unwrap()
}
