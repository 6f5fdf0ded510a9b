//! Translates retry-loop outcomes into `classification_cache` writes
//! (`spec.md` §4.7 "Cache state transitions"). The state machine lives here
//! rather than in `aimo-persistence`, since it needs the LLM Classifier's
//! notion of version identity and priority, not just the raw row.

use crate::budget::BudgetDecision;
use crate::classifier::SignatureOutcome;
use aimo_core::model::{CacheStatus, ClassificationCacheRow, ClassificationSource, TaxonomyAssignment};
use aimo_persistence::{PersistError, PersistenceGateway, WriteOp};
use chrono::Utc;

/// Version identity stamped on every row this classifier writes, used to
/// decide whether a `failed_permanent` row may be retried.
#[derive(Debug, Clone)]
pub struct VersionStamp {
    pub signature_version: String,
    pub rule_version: String,
    pub prompt_version: String,
    pub taxonomy_schema_version: String,
    pub model: Option<String>,
}

/// Applies one signature's outcome to the classification cache, honoring:
/// - human-verified rows are never overwritten (the gateway also enforces
///   this on write; checking here too avoids bumping `failure_count` on a
///   write that would just be discarded);
/// - a `failed_permanent` row is not retried again within the same
///   `prompt_version` (`spec.md` §4.7).
///
/// Returns `true` if a write was queued, `false` if this signature was
/// skipped outright (already `failed_permanent` under the current prompt
/// version, or human-verified).
pub fn apply_outcome(gateway: &PersistenceGateway, url_signature: &str, outcome: &SignatureOutcome, versions: &VersionStamp) -> Result<bool, PersistError> {
    let existing = gateway.get_classification_cache(url_signature)?;

    if let Some(existing) = &existing {
        if existing.is_human_verified {
            tracing::debug!(url_signature, "skipping human-verified row, not queuing LLM write");
            return Ok(false);
        }
        if existing.status == CacheStatus::FailedPermanent && existing.prompt_version == versions.prompt_version {
            tracing::debug!(url_signature, prompt_version = %versions.prompt_version, "signature already failed_permanent under this prompt version, not retrying");
            return Ok(false);
        }
    }

    let failure_count = existing.as_ref().map_or(0, |e| e.failure_count);
    let now = Utc::now();

    let row = match outcome {
        SignatureOutcome::Active(classification) => ClassificationCacheRow {
            url_signature: url_signature.to_string(),
            service_name: Some(classification.service_name.clone()),
            category: Some(classification.category.clone()),
            usage_type: Some(classification.usage_type.clone()),
            risk_level: Some(classification.risk_level.clone()),
            confidence: 1.0,
            rationale_short: None,
            classification_source: ClassificationSource::Llm,
            taxonomy: classification.taxonomy.clone(),
            signature_version: versions.signature_version.clone(),
            rule_version: versions.rule_version.clone(),
            prompt_version: versions.prompt_version.clone(),
            taxonomy_schema_version: versions.taxonomy_schema_version.clone(),
            model: versions.model.clone(),
            status: CacheStatus::Active,
            is_human_verified: false,
            failure_count: 0,
            error_type: None,
            error_reason: None,
            last_error_at: None,
            analysis_date: now,
        },
        SignatureOutcome::NeedsReview { error_code } => ClassificationCacheRow {
            url_signature: url_signature.to_string(),
            service_name: None,
            category: None,
            usage_type: None,
            risk_level: None,
            confidence: 0.0,
            rationale_short: None,
            classification_source: ClassificationSource::Llm,
            taxonomy: TaxonomyAssignment::default(),
            signature_version: versions.signature_version.clone(),
            rule_version: versions.rule_version.clone(),
            prompt_version: versions.prompt_version.clone(),
            taxonomy_schema_version: versions.taxonomy_schema_version.clone(),
            model: versions.model.clone(),
            status: CacheStatus::NeedsReview,
            is_human_verified: false,
            failure_count: failure_count + 1,
            error_type: Some(error_code.clone()),
            error_reason: Some("transient retries exhausted".to_string()),
            last_error_at: Some(now),
            analysis_date: now,
        },
        SignatureOutcome::FailedPermanent { error_code } => ClassificationCacheRow {
            url_signature: url_signature.to_string(),
            service_name: None,
            category: None,
            usage_type: None,
            risk_level: None,
            confidence: 0.0,
            rationale_short: None,
            classification_source: ClassificationSource::Llm,
            taxonomy: TaxonomyAssignment::default(),
            signature_version: versions.signature_version.clone(),
            rule_version: versions.rule_version.clone(),
            prompt_version: versions.prompt_version.clone(),
            taxonomy_schema_version: versions.taxonomy_schema_version.clone(),
            model: versions.model.clone(),
            status: CacheStatus::FailedPermanent,
            is_human_verified: false,
            failure_count: failure_count + 1,
            error_type: Some(error_code.clone()),
            error_reason: Some("permanent provider error".to_string()),
            last_error_at: Some(now),
            analysis_date: now,
        },
    };

    gateway.enqueue(WriteOp::UpsertClassificationCache(row))?;
    Ok(true)
}

/// Records a `budget_exceeded` skip as `failed_permanent`, so a later run
/// under the same prompt version does not keep re-estimating cost for a
/// signature that will never be analyzed this budget cycle (`spec.md` §4.7
/// "Budget" — C/no-priority candidates that don't fit the remaining budget).
pub fn apply_budget_skip(gateway: &PersistenceGateway, url_signature: &str, versions: &VersionStamp) -> Result<bool, PersistError> {
    apply_outcome(gateway, url_signature, &SignatureOutcome::FailedPermanent { error_code: "budget_exceeded".to_string() }, versions)
}

/// Whether a budget decision means this signature should not be sent to the
/// backend at all.
#[must_use]
pub fn should_skip(decision: BudgetDecision) -> bool {
    matches!(decision, BudgetDecision::Skip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimo_core::model::{Dimension, TaxonomyAssignment};
    use camino::Utf8PathBuf;
    use crate::types::ClassificationResponseItem;

    fn versions(prompt_version: &str) -> VersionStamp {
        VersionStamp {
            signature_version: "v1".into(),
            rule_version: "v1".into(),
            prompt_version: prompt_version.to_string(),
            taxonomy_schema_version: "v1".into(),
            model: Some("test-model".into()),
        }
    }

    fn open_gateway() -> (PersistenceGateway, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = Utf8PathBuf::from_path_buf(dir.path().join("aimo.sqlite3")).unwrap();
        let temp_dir = Utf8PathBuf::from_path_buf(dir.path().join("tmp")).unwrap();
        let gateway = PersistenceGateway::open(&db_path, &temp_dir, 64).unwrap();
        (gateway, dir)
    }

    fn complete_taxonomy() -> TaxonomyAssignment {
        let mut t = TaxonomyAssignment::default();
        t.insert(Dimension::Fs, "FS-001");
        t.insert(Dimension::Im, "IM-001");
        t.insert(Dimension::Uc, "UC-001");
        t.insert(Dimension::Dt, "DT-001");
        t.insert(Dimension::Ch, "CH-001");
        t.insert(Dimension::Rs, "RS-001");
        t.insert(Dimension::Ev, "EV-001");
        t
    }

    #[test]
    fn active_outcome_writes_a_flushable_row() {
        let (gateway, _dir) = open_gateway();
        let outcome = SignatureOutcome::Active(ClassificationResponseItem {
            service_name: "ChatGPT".into(),
            category: "genai-chat".into(),
            usage_type: "genai".into(),
            risk_level: "high".into(),
            taxonomy: complete_taxonomy(),
        });

        let wrote = apply_outcome(&gateway, "sig-1", &outcome, &versions("p1")).unwrap();
        assert!(wrote);
        gateway.flush().unwrap();

        let cached = gateway.get_classification_cache("sig-1").unwrap().unwrap();
        assert_eq!(cached.status, CacheStatus::Active);
        assert_eq!(cached.service_name.as_deref(), Some("ChatGPT"));
    }

    #[test]
    fn failed_permanent_is_not_retried_within_same_prompt_version() {
        let (gateway, _dir) = open_gateway();
        let versions_p1 = versions("p1");
        let first = SignatureOutcome::FailedPermanent { error_code: "invalid_api_key".to_string() };
        apply_outcome(&gateway, "sig-2", &first, &versions_p1).unwrap();
        gateway.flush().unwrap();

        let second = SignatureOutcome::NeedsReview { error_code: "timeout".to_string() };
        let wrote = apply_outcome(&gateway, "sig-2", &second, &versions_p1).unwrap();
        assert!(!wrote);

        let cached = gateway.get_classification_cache("sig-2").unwrap().unwrap();
        assert_eq!(cached.status, CacheStatus::FailedPermanent);
    }

    #[test]
    fn failed_permanent_may_be_retried_under_a_new_prompt_version() {
        let (gateway, _dir) = open_gateway();
        let first = SignatureOutcome::FailedPermanent { error_code: "invalid_api_key".to_string() };
        apply_outcome(&gateway, "sig-3", &first, &versions("p1")).unwrap();
        gateway.flush().unwrap();

        let second = SignatureOutcome::Active(ClassificationResponseItem {
            service_name: "ChatGPT".into(),
            category: "genai-chat".into(),
            usage_type: "genai".into(),
            risk_level: "high".into(),
            taxonomy: complete_taxonomy(),
        });
        let wrote = apply_outcome(&gateway, "sig-3", &second, &versions("p2")).unwrap();
        assert!(wrote);
        gateway.flush().unwrap();

        let cached = gateway.get_classification_cache("sig-3").unwrap().unwrap();
        assert_eq!(cached.status, CacheStatus::Active);
    }
}
