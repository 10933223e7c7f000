//! Canonical JSON and SHA-256 fingerprints.
//!
//! Object keys are sorted recursively before serialization so the digest
//! does not depend on map iteration order.

use sha2::{Digest, Sha256};

use crate::domain::error::Result;

fn sort_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();

            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(v) = map.get(key) {
                    sorted.insert(key.to_string(), sort_keys(v));
                }
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(arr) => serde_json::Value::Array(arr.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Compact JSON with recursively sorted keys.
pub fn canonical_json(value: &serde_json::Value) -> Result<String> {
    Ok(serde_json::to_string(&sort_keys(value))?)
}

/// SHA-256 hex digest of the canonical JSON form of `value`.
pub fn compute_digest<T: serde::Serialize>(value: &T) -> Result<String> {
    let canonical = canonical_json(&serde_json::to_value(value)?)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
