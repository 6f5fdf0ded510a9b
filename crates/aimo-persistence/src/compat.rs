//! Backward-compatible normalization of classification cache rows written
//! under the pre-8-dimension schema (a single `fs_uc_code` column plus
//! one-value-per-dimension columns for DT/CH/RS/EV/OB) alongside the current
//! 8-dimension columns. New columns always win; legacy-only data is still
//! read, but the row is flagged `needs_review`.

use aimo_core::model::{Dimension, TaxonomyAssignment};

/// The legacy, pre-migration columns a `classification_cache` row may still
/// carry from before the 8-dimension split.
#[derive(Debug, Clone, Default)]
pub struct LegacyTaxonomyColumns {
    /// Combined FS/UC single code, e.g. `"FS-001"` or `"UC-002"` — the old
    /// schema conflated the two dimensions into one column.
    pub fs_uc_code: Option<String>,
    pub dt_code: Option<String>,
    pub ch_code: Option<String>,
    pub rs_code: Option<String>,
    pub ob_code: Option<String>,
    pub ev_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    New,
    Legacy,
}

#[derive(Debug, Clone)]
pub struct NormalizedTaxonomy {
    pub taxonomy: TaxonomyAssignment,
    pub needs_review: bool,
    pub source_format: SourceFormat,
}

/// Normalizes a row's current 8-dimension taxonomy plus any legacy columns
/// into a single `TaxonomyAssignment`, preferring new columns and falling
/// back to legacy ones per dimension.
#[must_use]
pub fn normalize_taxonomy_record(current: &TaxonomyAssignment, legacy: &LegacyTaxonomyColumns) -> NormalizedTaxonomy {
    let mut used_legacy = false;
    let mut result = current.clone();

    if result.fs.is_empty() {
        if let Some(code) = legacy.fs_uc_code.as_deref() {
            if code != "DEPRECATED" && code.starts_with("FS-") {
                result.insert(Dimension::Fs, code.to_string());
                used_legacy = true;
            }
        }
    }

    if result.uc.is_empty() {
        if let Some(code) = legacy.fs_uc_code.as_deref() {
            if code.starts_with("UC-") {
                result.insert(Dimension::Uc, code.to_string());
                used_legacy = true;
            }
        }
    }

    used_legacy |= fall_back_single(&mut result, Dimension::Dt, legacy.dt_code.as_deref());
    used_legacy |= fall_back_single(&mut result, Dimension::Ch, legacy.ch_code.as_deref());
    used_legacy |= fall_back_single(&mut result, Dimension::Rs, legacy.rs_code.as_deref());
    used_legacy |= fall_back_single(&mut result, Dimension::Ev, legacy.ev_code.as_deref());
    used_legacy |= fall_back_single(&mut result, Dimension::Ob, legacy.ob_code.as_deref());

    let complete = is_complete(&result);

    NormalizedTaxonomy {
        taxonomy: result,
        needs_review: used_legacy || !complete,
        source_format: if used_legacy { SourceFormat::Legacy } else { SourceFormat::New },
    }
}

fn fall_back_single(assignment: &mut TaxonomyAssignment, dim: Dimension, legacy_value: Option<&str>) -> bool {
    if !assignment.codes(dim).is_empty() {
        return false;
    }
    match legacy_value {
        Some(code) if !code.trim().is_empty() => {
            assignment.insert(dim, code.trim().to_string());
            true
        }
        _ => false,
    }
}

fn is_complete(assignment: &TaxonomyAssignment) -> bool {
    !assignment.fs.is_empty()
        && !assignment.im.is_empty()
        && !assignment.uc.is_empty()
        && !assignment.dt.is_empty()
        && !assignment.ch.is_empty()
        && !assignment.rs.is_empty()
        && !assignment.ev.is_empty()
}
