//! `run_manifest.json` and `evidence_pack_manifest.json` (`spec.md` §4.9).

use aimo_core::model::{ClassificationCacheRow, Dimension, Run, StandardArtifacts};
use aimo_standard::taxonomy::TaxonomyDictionary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Run identity and the resolved Standard's pinned fields — `spec.md` I7
/// requires these be non-empty and equal the resolver's actual output.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub run_id: String,
    pub run_key: String,
    pub input_manifest_hash: String,
    pub vendor: String,
    pub aimo_standard: StandardArtifacts,
    pub versions: ManifestVersions,
    pub extraction_parameters: ExtractionParameters,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestVersions {
    pub target_range: String,
    pub signature_version: String,
    pub rule_version: String,
    pub prompt_version: String,
    pub taxonomy_version: String,
    pub evidence_pack_version: String,
    pub engine_spec_version: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExtractionParameters {
    pub a_min_bytes: u64,
    pub burst_threshold: u32,
    pub cumulative_threshold_bytes: u64,
    pub sample_rate: f64,
}

#[must_use]
pub fn build_run_manifest(run: &Run, vendor: &str, standard: &StandardArtifacts, extraction_parameters: ExtractionParameters, generated_at: DateTime<Utc>) -> RunManifest {
    let v = &run.versions;
    RunManifest {
        run_id: run.run_id.clone(),
        run_key: run.run_key.clone(),
        input_manifest_hash: run.input_manifest_hash.clone(),
        vendor: vendor.to_string(),
        aimo_standard: standard.clone(),
        versions: ManifestVersions {
            target_range: v.target_range.clone(),
            signature_version: v.signature_version.clone(),
            rule_version: v.rule_version.clone(),
            prompt_version: v.prompt_version.clone(),
            taxonomy_version: v.taxonomy_version.clone(),
            evidence_pack_version: v.evidence_pack_version.clone(),
            engine_spec_version: v.engine_spec_version.clone(),
        },
        extraction_parameters,
        generated_at,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvidenceFileRef {
    pub file_id: String,
    pub filename: String,
    pub ev_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvidencePackManifest {
    pub standard_version: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub taxonomy_summary: BTreeMap<String, Vec<String>>,
    pub evidence_files: Vec<EvidenceFileRef>,
}

/// Aggregates every `active` classification's taxonomy codes across `rows`,
/// by dimension, applying the Standard's first allowed code as a fallback
/// for any required dimension nothing in this run populated.
#[must_use]
pub fn aggregate_taxonomy_summary(rows: &[ClassificationCacheRow], taxonomy: &TaxonomyDictionary) -> BTreeMap<String, Vec<String>> {
    let mut summary: BTreeMap<Dimension, std::collections::BTreeSet<String>> = BTreeMap::new();

    for row in rows {
        for dim in Dimension::all() {
            summary.entry(dim).or_default().extend(row.taxonomy.codes(dim).iter().cloned());
        }
    }

    let mut out = BTreeMap::new();
    for dim in Dimension::all() {
        let mut codes: Vec<String> = summary.remove(&dim).unwrap_or_default().into_iter().collect();
        if codes.is_empty() && dim.min_codes() > 0 {
            if let Some(fallback) = taxonomy.allowed_codes(dim).first() {
                codes.push((*fallback).to_string());
            }
        }
        out.insert(dim.as_prefix().to_string(), codes);
    }
    out
}

#[must_use]
pub fn evidence_file_refs(filenames: &[(&str, &str)]) -> Vec<EvidenceFileRef> {
    filenames
        .iter()
        .map(|(filename, ev_type)| EvidenceFileRef {
            file_id: aimo_core::hashing::sha256_hex(filename.as_bytes()),
            filename: (*filename).to_string(),
            ev_type: (*ev_type).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimo_core::model::{ClassificationSource, TaxonomyAssignment};

    fn row_with(codes: &[(Dimension, &str)]) -> ClassificationCacheRow {
        let mut taxonomy = TaxonomyAssignment::default();
        for (dim, code) in codes {
            taxonomy.insert(*dim, *code);
        }
        ClassificationCacheRow {
            url_signature: "sig".into(),
            service_name: None,
            category: None,
            usage_type: None,
            risk_level: None,
            confidence: 1.0,
            rationale_short: None,
            classification_source: ClassificationSource::Rule,
            taxonomy,
            signature_version: "v1".into(),
            rule_version: "v1".into(),
            prompt_version: "v1".into(),
            taxonomy_schema_version: "v1".into(),
            model: None,
            status: aimo_core::model::CacheStatus::Active,
            is_human_verified: false,
            failure_count: 0,
            error_type: None,
            error_reason: None,
            last_error_at: None,
            analysis_date: Utc::now(),
        }
    }

    #[test]
    fn empty_rows_use_dictionary_fallback_for_required_dimensions() {
        let taxonomy = TaxonomyDictionary::default();
        let summary = aggregate_taxonomy_summary(&[], &taxonomy);
        assert_eq!(summary.get("OB"), Some(&Vec::<String>::new()));
    }

    #[test]
    fn observed_codes_are_sorted_and_deduplicated() {
        let rows = vec![row_with(&[(Dimension::Uc, "UC-002")]), row_with(&[(Dimension::Uc, "UC-001"), (Dimension::Uc, "UC-002")])];
        let taxonomy = TaxonomyDictionary::default();
        let summary = aggregate_taxonomy_summary(&rows, &taxonomy);
        assert_eq!(summary.get("UC"), Some(&vec!["UC-001".to_string(), "UC-002".to_string()]));
    }
}
