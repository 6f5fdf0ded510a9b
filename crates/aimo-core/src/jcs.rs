//! JCS (RFC 8785) canonicalization for bundle JSON files.
//!
//! Every JSON file the Evidence Bundle Emitter (C9) writes is canonicalized
//! before it is hashed or persisted, so that re-running the pipeline on
//! identical inputs produces byte-identical files (`spec.md` I1).

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JcsError {
    #[error("failed to serialize value to JSON: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to canonicalize JSON: {0}")]
    Canonicalize(String),
}

/// Serialize `value` to a canonical JSON string (JCS, RFC 8785).
pub fn to_canonical_string<T: Serialize>(value: &T) -> Result<String, JcsError> {
    let json_value = serde_json::to_value(value)?;
    let bytes = serde_json_canonicalizer::to_vec(&json_value)
        .map_err(|e| JcsError::Canonicalize(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| JcsError::Canonicalize(e.to_string()))
}

/// Serialize `value` to canonical JSON bytes (JCS, RFC 8785).
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, JcsError> {
    let json_value = serde_json::to_value(value)?;
    serde_json_canonicalizer::to_vec(&json_value).map_err(|e| JcsError::Canonicalize(e.to_string()))
}
