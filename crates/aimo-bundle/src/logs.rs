//! `logs/shadow_ai_discovery.jsonl` and `logs/agent_activity.jsonl`
//! (`spec.md` §4.9).

use aimo_core::model::ClassificationCacheRow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Namespace for this engine's name-derived record IDs. `record_id` must be
/// stable across re-runs with identical inputs (`spec.md` I1), so it is
/// derived (UUIDv5) from the record's natural key rather than generated
/// fresh (UUIDv4) each run.
const RECORD_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6a, 0x1b, 0xd2, 0x4e, 0x9c, 0x77, 0x4a, 0x0e, 0x8e, 0x2d, 0x3f, 0x51, 0xc9, 0x0a, 0x7b, 0x44,
]);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Block,
    NeedsReview,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShadowAiDiscoveryRecord {
    pub record_id: String,
    pub event_time: DateTime<Utc>,
    pub actor_id: String,
    pub ai_service: String,
    pub data_classification: String,
    pub decision: Decision,
    pub evidence_ref: String,
}

const LOW_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Maps a GenAI-classified signature to its discovery record. A signature is
/// "GenAI-classified" when its `usage_type` is `genai`; everything else is
/// out of scope for this log per `spec.md` §4.9.
fn decide(row: &ClassificationCacheRow) -> Decision {
    if row.confidence < LOW_CONFIDENCE_THRESHOLD {
        Decision::NeedsReview
    } else if row.risk_level.as_deref() == Some("high") {
        Decision::Block
    } else {
        Decision::Allow
    }
}

#[must_use]
pub fn is_genai_classified(row: &ClassificationCacheRow) -> bool {
    row.usage_type.as_deref() == Some("genai")
}

#[must_use]
pub fn build_shadow_ai_discovery_record(run_id: &str, url_signature: &str, last_seen: DateTime<Utc>, row: &ClassificationCacheRow) -> ShadowAiDiscoveryRecord {
    ShadowAiDiscoveryRecord {
        record_id: Uuid::new_v5(&RECORD_ID_NAMESPACE, format!("shadow_ai_discovery|{run_id}|{url_signature}").as_bytes()).to_string(),
        event_time: last_seen,
        actor_id: format!("sig:{url_signature}"),
        ai_service: row.service_name.clone().unwrap_or_else(|| "unknown".to_string()),
        data_classification: row.risk_level.clone().unwrap_or_else(|| "unknown".to_string()),
        decision: decide(row),
        evidence_ref: url_signature.to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentActivityRecord {
    pub record_id: String,
    pub run_id: String,
    pub action: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_row_count: u64,
    pub signature_count: usize,
    pub engine_spec_version: String,
}

#[must_use]
pub fn build_agent_activity_record(run_id: &str, started_at: DateTime<Utc>, finished_at: DateTime<Utc>, input_row_count: u64, signature_count: usize, engine_spec_version: &str) -> AgentActivityRecord {
    AgentActivityRecord {
        record_id: Uuid::new_v5(&RECORD_ID_NAMESPACE, format!("agent_activity|{run_id}").as_bytes()).to_string(),
        run_id: run_id.to_string(),
        action: "classify_security_proxy_logs".to_string(),
        started_at,
        finished_at,
        input_row_count,
        signature_count,
        engine_spec_version: engine_spec_version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimo_core::model::{CacheStatus, ClassificationSource, TaxonomyAssignment};

    fn row(confidence: f32, risk: Option<&str>) -> ClassificationCacheRow {
        ClassificationCacheRow {
            url_signature: "sig".into(),
            service_name: Some("ChatGPT".into()),
            category: Some("genai-chat".into()),
            usage_type: Some("genai".into()),
            risk_level: risk.map(str::to_string),
            confidence,
            rationale_short: None,
            classification_source: ClassificationSource::Rule,
            taxonomy: TaxonomyAssignment::default(),
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
    fn low_confidence_forces_needs_review_regardless_of_risk() {
        assert!(matches!(decide(&row(0.1, Some("high"))), Decision::NeedsReview));
    }

    #[test]
    fn high_risk_with_confidence_blocks() {
        assert!(matches!(decide(&row(0.9, Some("high"))), Decision::Block));
    }

    #[test]
    fn low_risk_with_confidence_allows() {
        assert!(matches!(decide(&row(0.9, Some("low"))), Decision::Allow));
    }
}
