//! Queued write operations. A tagged enum stands in for the generic
//! `upsert(table, row, conflict_key)` contract: each table gets its own
//! variant carrying a typed row, rather than a stringly-typed table name and
//! an untyped payload — the same "tagged variants, not subclass" preference
//! applied to vendor mappings elsewhere in this engine.

use aimo_core::model::{ClassificationCacheRow, InputFile, PerformanceMetric, Run, SignatureStats};

#[derive(Debug, Clone)]
pub enum WriteOp {
    UpsertRun(Run),
    InsertInputFile(InputFile),
    UpsertSignatureStats(SignatureStats),
    UpsertClassificationCache(ClassificationCacheRow),
    InsertPerformanceMetric(PerformanceMetric),
    InsertApiCost(aimo_core::model::ApiCost),
}

/// The dedup key for batch collapsing: within one flushed batch, multiple
/// writes to the same key collapse to the last one (last-write-wins).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Run(String),
    InputFile(String),
    SignatureStats(String, String),
    ClassificationCache(String),
    /// Append-only rows never collapse; each gets a unique key.
    Unique(u64),
}

impl WriteOp {
    #[must_use]
    pub fn dedup_key(&self, unique_seq: u64) -> DedupKey {
        match self {
            WriteOp::UpsertRun(r) => DedupKey::Run(r.run_id.clone()),
            WriteOp::InsertInputFile(f) => DedupKey::InputFile(f.file_id.clone()),
            WriteOp::UpsertSignatureStats(s) => DedupKey::SignatureStats(s.run_id.clone(), s.url_signature.clone()),
            WriteOp::UpsertClassificationCache(c) => DedupKey::ClassificationCache(c.url_signature.clone()),
            WriteOp::InsertPerformanceMetric(_) | WriteOp::InsertApiCost(_) => DedupKey::Unique(unique_seq),
        }
    }

    #[must_use]
    pub fn table_name(&self) -> &'static str {
        match self {
            WriteOp::UpsertRun(_) => "runs",
            WriteOp::InsertInputFile(_) => "input_files",
            WriteOp::UpsertSignatureStats(_) => "signature_stats",
            WriteOp::UpsertClassificationCache(_) => "classification_cache",
            WriteOp::InsertPerformanceMetric(_) => "performance_metrics",
            WriteOp::InsertApiCost(_) => "api_costs",
        }
    }
}

/// Collapses a batch to last-write-wins per dedup key, preserving the
/// relative order of surviving entries (stable on first occurrence).
#[must_use]
pub fn dedup_batch(batch: Vec<WriteOp>) -> Vec<WriteOp> {
    use std::collections::HashMap;

    let mut order: Vec<DedupKey> = Vec::new();
    let mut last: HashMap<DedupKey, WriteOp> = HashMap::new();

    for (i, op) in batch.into_iter().enumerate() {
        let key = op.dedup_key(i as u64);
        if !last.contains_key(&key) {
            order.push(key.clone());
        }
        last.insert(key, op);
    }

    order.into_iter().map(|k| last.remove(&k).expect("key present from same loop")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimo_core::model::{RunStatus, RunVersions};
    use chrono::Utc;

    fn versions() -> RunVersions {
        RunVersions {
            target_range: "all".into(),
            signature_version: "v1".into(),
            rule_version: "v1".into(),
            prompt_version: "v1".into(),
            taxonomy_version: "v1".into(),
            evidence_pack_version: "v1".into(),
            engine_spec_version: "0.1.0".into(),
        }
    }

    fn run(run_id: &str, stage: u8) -> Run {
        Run {
            run_id: run_id.to_string(),
            run_key: format!("{run_id}-key"),
            input_manifest_hash: "abc".into(),
            versions: versions(),
            status: RunStatus::Running,
            last_completed_stage: stage,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    #[test]
    fn later_upsert_to_same_run_wins() {
        let batch = vec![WriteOp::UpsertRun(run("r1", 1)), WriteOp::UpsertRun(run("r1", 3))];
        let deduped = dedup_batch(batch);
        assert_eq!(deduped.len(), 1);
        match &deduped[0] {
            WriteOp::UpsertRun(r) => assert_eq!(r.last_completed_stage, 3),
            _ => panic!("expected UpsertRun"),
        }
    }

    #[test]
    fn distinct_runs_both_survive_in_first_seen_order() {
        let batch = vec![WriteOp::UpsertRun(run("r1", 1)), WriteOp::UpsertRun(run("r2", 1)), WriteOp::UpsertRun(run("r1", 2))];
        let deduped = dedup_batch(batch);
        assert_eq!(deduped.len(), 2);
        match &deduped[0] {
            WriteOp::UpsertRun(r) => assert_eq!(r.run_id, "r1"),
            _ => panic!(),
        }
    }
}
