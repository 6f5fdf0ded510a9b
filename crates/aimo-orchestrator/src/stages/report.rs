//! Stage 5 — Report / finalize (`spec.md` §4.8, §7 "Human-facing surface").

use aimo_core::model::{CacheStatus, CandidateFlag, RunStatus, SignatureStats};
use aimo_persistence::PersistenceGateway;
use anyhow::{Context, Result};

/// The compact KPI block printed at the end of every run, audit-sufficient
/// without requiring the reader to open the store.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct KpiBlock {
    pub input_rows: u64,
    pub unique_signatures: usize,
    pub a_count: usize,
    pub b_count: usize,
    pub c_count: usize,
    pub cache_hits: usize,
    pub rule_matched: usize,
    pub llm_analyzed: usize,
    pub llm_skipped_budget: usize,
    pub needs_review: usize,
    pub failed_permanent: usize,
    pub bundle_path: Option<String>,
    pub bundle_validation_passed: Option<bool>,
}

/// Marks the run `succeeded` or `failed` and stamps `finished_at` — skipped
/// entirely for `--dry-run`, which leaves the run `running` and resumable.
pub fn finalize(gateway: &PersistenceGateway, run_id: &str, succeeded: bool) -> Result<()> {
    let status = if succeeded { RunStatus::Succeeded } else { RunStatus::Failed };
    gateway.update_run_status(run_id, status).context("finalizing run status")?;
    gateway.flush().context("flushing final run status")?;
    Ok(())
}

/// Builds the KPI block from the run's persisted signature stats and
/// classification cache, independent of what's still in memory — so `status
/// <run_id>` can reconstruct the same numbers from a prior run.
pub fn build_kpi(gateway: &PersistenceGateway, run_id: &str, input_rows: u64) -> Result<KpiBlock> {
    let signatures = gateway.list_signature_stats(run_id).context("reading signature stats for KPI block")?;

    let mut kpi = KpiBlock { input_rows, unique_signatures: signatures.len(), ..Default::default() };
    for stats in &signatures {
        if stats.candidate_flags.contains(&CandidateFlag::A) {
            kpi.a_count += 1;
        }
        if stats.candidate_flags.contains(&CandidateFlag::B) {
            kpi.b_count += 1;
        }
        if stats.candidate_flags.contains(&CandidateFlag::C) {
            kpi.c_count += 1;
        }

        match gateway.get_classification_cache(&stats.url_signature).context("reading classification cache for KPI block")? {
            Some(row) => {
                kpi.cache_hits += 1;
                match (row.classification_source, row.status) {
                    (aimo_core::model::ClassificationSource::Rule, CacheStatus::Active) => kpi.rule_matched += 1,
                    (aimo_core::model::ClassificationSource::Llm, CacheStatus::Active) => kpi.llm_analyzed += 1,
                    (_, CacheStatus::NeedsReview) => kpi.needs_review += 1,
                    (_, CacheStatus::FailedPermanent) if row.error_type.as_deref() == Some("budget_exceeded") => kpi.llm_skipped_budget += 1,
                    (_, CacheStatus::FailedPermanent) => kpi.failed_permanent += 1,
                    _ => {}
                }
            }
            None => {}
        }
    }

    Ok(kpi)
}

#[must_use]
pub fn is_candidate(stats: &SignatureStats) -> bool {
    super::normalize_detect::is_candidate(&stats.candidate_flags)
}

/// Sums `input_files.row_count` for a run — used both by a resumed run
/// (which skips re-ingestion) and by `status <run_id>` to reconstruct the
/// KPI block's `input_rows` without replaying the pipeline.
pub fn sum_input_rows(gateway: &PersistenceGateway, run_id: &str) -> Result<u64> {
    let conn = gateway.read_connection().context("opening read connection")?;
    let total: i64 = conn
        .query_row("SELECT COALESCE(SUM(row_count), 0) FROM input_files WHERE run_id = ?1", rusqlite::params![run_id], |r| r.get(0))
        .context("summing input_files.row_count")?;
    Ok(total.max(0) as u64)
}
