//! `analysis/taxonomy_assignments.json` (`spec.md` §4.9) — joins a run's
//! `SignatureStats` rows with their `ClassificationCacheRow` by
//! `url_signature` to produce one record per classified candidate.

use aimo_core::model::{ClassificationCacheRow, ClassificationSource, Dimension, SignatureStats};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct TaxonomyAssignmentRecord {
    pub url_signature: String,
    pub norm_host: String,
    pub norm_path_template: String,
    pub access_count: u64,
    pub unique_users: u64,
    pub last_seen: DateTime<Utc>,
    pub service_name: Option<String>,
    pub category: Option<String>,
    pub usage_type: Option<String>,
    pub risk_level: Option<String>,
    pub confidence: f32,
    pub classification_source: ClassificationSource,
    pub is_human_verified: bool,
    pub taxonomy: BTreeMap<String, Vec<String>>,
}

#[must_use]
pub fn build_taxonomy_assignment_record(stats: &SignatureStats, row: &ClassificationCacheRow) -> TaxonomyAssignmentRecord {
    let mut taxonomy = BTreeMap::new();
    for dim in Dimension::all() {
        taxonomy.insert(dim.as_prefix().to_string(), row.taxonomy.codes(dim).iter().cloned().collect());
    }

    TaxonomyAssignmentRecord {
        url_signature: stats.url_signature.clone(),
        norm_host: stats.norm_host.clone(),
        norm_path_template: stats.norm_path_template.clone(),
        access_count: stats.access_count,
        unique_users: stats.unique_users,
        last_seen: stats.last_seen,
        service_name: row.service_name.clone(),
        category: row.category.clone(),
        usage_type: row.usage_type.clone(),
        risk_level: row.risk_level.clone(),
        confidence: row.confidence,
        classification_source: row.classification_source,
        is_human_verified: row.is_human_verified,
        taxonomy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimo_core::model::{BytesBucket, CacheStatus, TaxonomyAssignment};
    use std::collections::BTreeSet;

    fn stats() -> SignatureStats {
        SignatureStats {
            run_id: "run1".into(),
            url_signature: "sig1".into(),
            norm_host: "api.example.com".into(),
            norm_path_template: "/v1/{id}".into(),
            bytes_sent_bucket: BytesBucket::S,
            access_count: 5,
            unique_users: 2,
            bytes_sent_sum: 1000,
            bytes_sent_max: 500,
            first_seen: Utc::now(),
            last_seen: Utc::now(),
            candidate_flags: BTreeSet::new(),
        }
    }

    fn row() -> ClassificationCacheRow {
        let mut taxonomy = TaxonomyAssignment::default();
        taxonomy.insert(Dimension::Fs, "FS-001");
        ClassificationCacheRow {
            url_signature: "sig1".into(),
            service_name: Some("ChatGPT".into()),
            category: Some("genai-chat".into()),
            usage_type: Some("genai".into()),
            risk_level: Some("medium".into()),
            confidence: 0.8,
            rationale_short: None,
            classification_source: ClassificationSource::Rule,
            taxonomy,
            signature_version: "v1".into(),
            rule_version: "v1".into(),
            prompt_version: "v1".into(),
            taxonomy_schema_version: "v1".into(),
            model: None,
            status: CacheStatus::Active,
            is_human_verified: false,
            failure_count: 0,
            error_type: None,
            error_reason: None,
            last_error_at: None,
            analysis_date: Utc::now(),
        }
    }

    #[test]
    fn joins_stats_and_classification_by_signature() {
        let record = build_taxonomy_assignment_record(&stats(), &row());
        assert_eq!(record.url_signature, "sig1");
        assert_eq!(record.norm_host, "api.example.com");
        assert_eq!(record.taxonomy.get("FS"), Some(&vec!["FS-001".to_string()]));
    }
}
