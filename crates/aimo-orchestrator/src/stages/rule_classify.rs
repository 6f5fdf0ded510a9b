//! Stage 3 — Rule Classify (`spec.md` §4.6, §4.8).

use aimo_core::model::{CacheStatus, ClassificationCacheRow, RunVersions, SignatureStats};
use aimo_persistence::{PersistenceGateway, WriteOp};
use aimo_rules::{classify, CompiledRule, Signature};
use anyhow::{Context, Result};
use chrono::Utc;

/// Runs the deterministic rule matcher over every signature not already
/// `active` or human-verified, writing a `classification_cache` row for
/// each match. Returns the number of signatures the rule set resolved.
pub fn run(gateway: &PersistenceGateway, signatures: &[SignatureStats], rules: &[CompiledRule], versions: &RunVersions) -> Result<usize> {
    let mut matched = 0usize;

    for stats in signatures {
        if let Some(existing) = gateway.get_classification_cache(&stats.url_signature).context("reading classification cache")? {
            if existing.is_human_verified || existing.status == CacheStatus::Active {
                continue;
            }
        }

        let sig = Signature { url_signature: &stats.url_signature, norm_host: &stats.norm_host, norm_path_template: &stats.norm_path_template };
        let Some(classification) = classify(&sig, rules) else { continue };

        let row = ClassificationCacheRow {
            url_signature: stats.url_signature.clone(),
            service_name: Some(classification.service_name),
            category: Some(classification.category),
            usage_type: Some(classification.usage_type),
            risk_level: Some(classification.risk_level),
            confidence: classification.confidence,
            rationale_short: Some(format!("{} via {}", classification.rule_id, classification.match_reason.as_str())),
            classification_source: classification.classification_source,
            taxonomy: classification.taxonomy,
            signature_version: versions.signature_version.clone(),
            rule_version: classification.rule_version,
            prompt_version: versions.prompt_version.clone(),
            taxonomy_schema_version: versions.taxonomy_version.clone(),
            model: None,
            status: CacheStatus::Active,
            is_human_verified: false,
            failure_count: 0,
            error_type: None,
            error_reason: None,
            last_error_at: None,
            analysis_date: Utc::now(),
        };

        gateway.enqueue(WriteOp::UpsertClassificationCache(row)).context("queuing rule classification row")?;
        matched += 1;
    }

    gateway.flush().context("flushing rule classifications")?;
    tracing::info!(matched, total = signatures.len(), "rule classify stage complete");
    Ok(matched)
}
