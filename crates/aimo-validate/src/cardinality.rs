//! Taxonomy cardinality validation of an aggregated codes block
//! (`spec.md` §3, §4.10 step 2b).

use aimo_core::model::{Dimension, TaxonomyAssignment, TaxonomyError};
use std::collections::BTreeMap;

/// Rebuilds a [`TaxonomyAssignment`] from a dimension-prefix-keyed summary
/// (as found in `evidence_pack_manifest.taxonomy_summary`) and runs the same
/// cardinality/format checks an individual `ClassificationCacheRow` is held
/// to, so the Validator and the write path share one rule set.
#[must_use]
pub fn validate_taxonomy_summary(summary: &BTreeMap<String, Vec<String>>) -> Vec<TaxonomyError> {
    let mut assignment = TaxonomyAssignment::default();
    for dim in Dimension::all() {
        if let Some(codes) = summary.get(dim.as_prefix()) {
            for code in codes {
                assignment.insert(dim, code.as_str());
            }
        }
    }
    assignment.validate().err().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfied_cardinality_is_clean() {
        let mut summary = BTreeMap::new();
        summary.insert("FS".to_string(), vec!["FS-001".to_string()]);
        summary.insert("IM".to_string(), vec!["IM-001".to_string()]);
        summary.insert("UC".to_string(), vec!["UC-001".to_string()]);
        summary.insert("DT".to_string(), vec!["DT-001".to_string()]);
        summary.insert("CH".to_string(), vec!["CH-001".to_string()]);
        summary.insert("RS".to_string(), vec!["RS-001".to_string()]);
        summary.insert("EV".to_string(), vec!["EV-001".to_string()]);
        assert!(validate_taxonomy_summary(&summary).is_empty());
    }

    #[test]
    fn missing_required_dimension_is_an_error() {
        let summary = BTreeMap::new();
        let errors = validate_taxonomy_summary(&summary);
        assert!(errors.iter().any(|e| matches!(e, TaxonomyError::TooFewCodes { dimension: Dimension::Fs, .. })));
    }

    #[test]
    fn ob_may_be_empty() {
        let mut summary = BTreeMap::new();
        summary.insert("FS".to_string(), vec!["FS-001".to_string()]);
        summary.insert("IM".to_string(), vec!["IM-001".to_string()]);
        summary.insert("UC".to_string(), vec!["UC-001".to_string()]);
        summary.insert("DT".to_string(), vec!["DT-001".to_string()]);
        summary.insert("CH".to_string(), vec!["CH-001".to_string()]);
        summary.insert("RS".to_string(), vec!["RS-001".to_string()]);
        summary.insert("EV".to_string(), vec!["EV-001".to_string()]);
        let errors = validate_taxonomy_summary(&summary);
        assert!(!errors.iter().any(|e| matches!(e, TaxonomyError::TooFewCodes { dimension: Dimension::Ob, .. })));
    }
}
