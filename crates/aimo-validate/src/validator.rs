//! Validator entry point (`spec.md` §4.10): validates a fully-written
//! Evidence Bundle and produces `validation_result.json`. There is no
//! official Standard validator CLI vendored into this engine, so step 1 of
//! the algorithm ("invoke the official validator if present") is a no-op
//! here and the fallback checks in step 2 are always authoritative.

use crate::cardinality::validate_taxonomy_summary;
use crate::error::ValidateError;
use crate::file_check::{check_checksums_cover_all_files, check_evidence_files_exist};
use crate::schema_check::validate_against_schema;
use aimo_standard::ResolvedStandard;
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub validation_time: DateTime<Utc>,
    pub passed: bool,
    pub status: String,
    pub aimo_standard_version: String,
    pub errors: Vec<String>,
    pub error_count: usize,
}

/// Validates the bundle at `bundle_dir` and returns the result that
/// `validation_result.json` serializes. Does not write the file itself —
/// the caller decides where and whether to persist it.
pub fn validate_bundle(bundle_dir: &Utf8Path, standard: &ResolvedStandard, validation_time: DateTime<Utc>) -> Result<ValidationResult, ValidateError> {
    let mut errors = Vec::new();

    let manifest_path = bundle_dir.join("evidence_pack_manifest.json");
    let manifest = read_json(&manifest_path)?;

    if let Ok(schema) = standard.schemas.load("evidence_pack_manifest") {
        errors.extend(validate_against_schema(&schema, &manifest));
    }

    let taxonomy_summary: BTreeMap<String, Vec<String>> = manifest
        .get("taxonomy_summary")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    errors.extend(validate_taxonomy_summary(&taxonomy_summary).into_iter().map(|e| e.to_string()));

    let filenames: Vec<String> = manifest
        .get("evidence_files")
        .and_then(Value::as_array)
        .map(|files| files.iter().filter_map(|f| f.get("filename").and_then(Value::as_str)).map(str::to_string).collect())
        .unwrap_or_default();
    errors.extend(check_evidence_files_exist(bundle_dir, &filenames));

    let checksums_path = bundle_dir.join("checksums.json");
    if let Ok(checksums) = read_json(&checksums_path) {
        let files: BTreeMap<String, String> = checksums.get("files").and_then(|v| serde_json::from_value(v.clone()).ok()).unwrap_or_default();
        let mut covered = filenames.clone();
        covered.push("evidence_pack_manifest.json".to_string());
        errors.extend(check_checksums_cover_all_files(&files, &covered));
    } else {
        errors.push("checksums.json is missing or unreadable".to_string());
    }

    let error_count = errors.len();
    let passed = error_count == 0;
    Ok(ValidationResult {
        validation_time,
        passed,
        status: if passed { "passed".to_string() } else { "failed".to_string() },
        aimo_standard_version: standard.artifacts.standard_version.clone(),
        errors,
        error_count,
    })
}

fn read_json(path: &Utf8Path) -> Result<Value, ValidateError> {
    let content = std::fs::read_to_string(path).map_err(|source| ValidateError::Read { path: path.to_string(), source })?;
    serde_json::from_str(&content).map_err(|source| ValidateError::Parse { path: path.to_string(), source })
}
