//! Canonical Ingestor (C3): map vendor rows to canonical events and compute
//! lineage hashes.

pub mod event;
pub mod mapping;
pub mod parse;

use aimo_core::hashing::sha256_file;
use aimo_core::model::{CanonicalEvent, InputFile};
use camino::Utf8Path;
use event::derive_event;
use mapping::{MappingError, VendorMapping};
use parse::{parse_file, ParseError};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("I/O error reading {path}: {source}")]
    Io { path: String, source: std::io::Error },
}

/// Result of ingesting one file: the canonical events that survived
/// derivation, the `InputFile` record, and per-row drop diagnostics
/// (never silent, `spec.md` §4.3).
pub struct IngestOutcome {
    pub events: Vec<CanonicalEvent>,
    pub input_file: InputFile,
    pub row_drop_warnings: Vec<(u64, String)>,
}

/// Locate `<vendors_dir>/<vendor>.toml` and load it.
pub fn load_vendor_mapping(vendors_dir: &Utf8Path, vendor: &str) -> Result<VendorMapping, MappingError> {
    let path = vendors_dir.join(format!("{vendor}.toml"));
    VendorMapping::load_from_path(path.as_std_path())
}

/// Ingest one file end to end: detect shape, parse rows, derive canonical
/// events, compute the `InputFile` record.
pub fn ingest_file(
    run_id: &str,
    file_path: &Utf8Path,
    mapping: &VendorMapping,
) -> Result<IngestOutcome, IngestError> {
    let metadata = std::fs::metadata(file_path.as_std_path()).map_err(|source| IngestError::Io {
        path: file_path.to_string(),
        source,
    })?;
    let file_size = metadata.len();
    let mtime_unix = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let file_hash = sha256_file(file_path.as_std_path()).map_err(|source| IngestError::Io {
        path: file_path.to_string(),
        source,
    })?;
    let file_id = InputFile::compute_file_id(file_path.as_str(), file_size, mtime_unix);

    let outcome = parse_file(Path::new(file_path.as_str()))?;

    let mut events = Vec::with_capacity(outcome.rows.len());
    let mut row_drop_warnings: Vec<(u64, String)> = outcome
        .warnings
        .into_iter()
        .map(|w| (w.row_index, w.reason))
        .collect();

    for parsed_row in &outcome.rows {
        match derive_event(mapping, file_path.as_str(), parsed_row.row_index, &parsed_row.fields) {
            Ok(event) => events.push(event),
            Err(reason) => {
                warn!(
                    row_index = parsed_row.row_index,
                    reason = %reason,
                    "dropping row during canonicalization"
                );
                row_drop_warnings.push((parsed_row.row_index, reason.to_string()));
            }
        }
    }

    let input_file = InputFile {
        file_id,
        run_id: run_id.to_string(),
        file_path: file_path.to_string(),
        file_size,
        file_hash,
        vendor: mapping.vendor.clone(),
        log_type: mapping.log_type.clone(),
        row_count: outcome.rows.len() as u64,
    };

    Ok(IngestOutcome {
        events,
        input_file,
        row_drop_warnings,
    })
}

pub use event::EventDropReason as RowDropReason;
