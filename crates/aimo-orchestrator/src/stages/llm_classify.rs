//! Stage 4 — LLM Classify (`spec.md` §4.7, §4.8).
//!
//! `AIMO_DISABLE_LLM=1` is a non-fatal skip of this stage alone, per
//! `spec.md` §7 — it must not fail the run.

use aimo_core::model::{CacheStatus, SignatureStats};
use aimo_llm::{
    apply_budget_skip, apply_outcome, classify_with_retry, BudgetController, BudgetDecision, CandidatePriority, LlmBackend, RetryConfig, SignatureRequestItem, VersionStamp,
};
use aimo_persistence::PersistenceGateway;
use anyhow::{Context, Result};
use chrono::Utc;

pub struct LlmStageOutput {
    pub analyzed: usize,
    pub skipped_budget: usize,
}

pub async fn run(
    gateway: &PersistenceGateway,
    backend: &(dyn LlmBackend + Sync),
    budget: &BudgetController,
    signatures: &[SignatureStats],
    versions: &VersionStamp,
    max_batch_size: usize,
) -> Result<LlmStageOutput> {
    if let Err(e) = aimo_llm::check_llm_disabled() {
        tracing::warn!(error = %e, "LLM classify stage skipped (AIMO_DISABLE_LLM)");
        return Ok(LlmStageOutput { analyzed: 0, skipped_budget: 0 });
    }

    let mut admitted = Vec::new();
    let mut skipped_budget = 0usize;

    for stats in signatures {
        if let Some(existing) = gateway.get_classification_cache(&stats.url_signature).context("reading classification cache")? {
            let same_prompt_failed_permanent = existing.status == CacheStatus::FailedPermanent && existing.prompt_version == versions.prompt_version;
            if existing.is_human_verified || existing.status == CacheStatus::Active || same_prompt_failed_permanent {
                continue;
            }
        }

        let priority = CandidatePriority::from_flags(&stats.candidate_flags);
        let (est_input_tokens, est_output_tokens) = estimate_tokens(stats);
        let now = Utc::now();
        let (decision, cost) = budget.decide(priority, est_input_tokens, est_output_tokens, now);

        if decision == BudgetDecision::Skip {
            apply_budget_skip(gateway, &stats.url_signature, versions).context("recording budget skip")?;
            skipped_budget += 1;
            continue;
        }

        budget.record_spend(now, cost);
        admitted.push(SignatureRequestItem {
            url_signature: stats.url_signature.clone(),
            norm_host: stats.norm_host.clone(),
            norm_path_template: stats.norm_path_template.clone(),
            access_count: stats.access_count,
            bytes_sent_sum: stats.bytes_sent_sum,
        });
    }

    let mut analyzed = 0usize;
    for batch in admitted.chunks(max_batch_size.max(1)) {
        let outcomes = classify_with_retry(backend, batch.to_vec(), RetryConfig::default()).await;
        for (url_signature, outcome) in outcomes {
            if apply_outcome(gateway, &url_signature, &outcome, versions).context("persisting LLM classification outcome")? {
                analyzed += 1;
            }
        }
    }
    gateway.flush().context("flushing LLM classifications")?;

    tracing::info!(analyzed, skipped_budget, admitted = admitted.len(), "LLM classify stage complete");
    Ok(LlmStageOutput { analyzed, skipped_budget })
}

/// Coarse token estimate from the PII-safe request payload shape alone —
/// there is no tokenizer call here, just enough to drive budget admission.
fn estimate_tokens(stats: &SignatureStats) -> (u64, u64) {
    let input = 150 + stats.norm_host.len() as u64 + stats.norm_path_template.len() as u64;
    (input, 200)
}
