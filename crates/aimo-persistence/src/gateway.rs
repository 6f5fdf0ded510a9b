//! Single-writer, many-reader persistence gateway (`spec.md` §4.1, §5).
//!
//! One background thread owns the write connection and drains a bounded
//! queue; every other crate talks to the store only through `enqueue` and
//! `flush`. Readers open their own connection — SQLite's WAL mode gives them
//! a consistent snapshot without coordinating with the writer.

use crate::compat;
use crate::error::PersistError;
use crate::ops::{dedup_batch, WriteOp};
use crate::schema::CREATE_TABLES_SQL;
use aimo_core::model::{BytesBucket, CandidateFlag, ClassificationCacheRow, Run, RunStatus, RunVersions, SignatureStats};
use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::JoinHandle;
use std::time::Duration;

enum Command {
    Enqueue(WriteOp),
    Flush(mpsc::Sender<Result<FlushReport, PersistError>>),
    UpdateRunStatus(String, RunStatus, mpsc::Sender<Result<(), PersistError>>),
    Shutdown,
}

/// Summary of one flushed batch, for logging and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub rows_written: usize,
    pub human_verified_protected: usize,
}

pub struct PersistenceGateway {
    cmd_tx: SyncSender<Command>,
    handle: Option<JoinHandle<()>>,
    db_path: Utf8PathBuf,
    queue_capacity: usize,
    flush_timeout: Duration,
}

impl PersistenceGateway {
    /// Opens (creating if needed) the SQLite store at `db_path`, configures
    /// `temp_dir` as its temp area, and starts the writer thread.
    pub fn open(db_path: &Utf8Path, temp_dir: &Utf8Path, queue_capacity: usize) -> Result<Self, PersistError> {
        std::fs::create_dir_all(temp_dir)?;
        tracing::info!(db_path = %db_path, temp_dir = %temp_dir, "opening persistence gateway");

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "temp_store_directory", temp_dir.as_str())?;
        conn.execute_batch(CREATE_TABLES_SQL)?;

        let (cmd_tx, cmd_rx) = mpsc::sync_channel::<Command>(queue_capacity);
        let handle = std::thread::spawn(move || writer_loop(conn, cmd_rx));

        Ok(PersistenceGateway {
            cmd_tx,
            handle: Some(handle),
            db_path: db_path.to_path_buf(),
            queue_capacity,
            flush_timeout: Duration::from_secs(30),
        })
    }

    /// Queues a write. Fails immediately (no silent drop) if the queue is
    /// full or the writer thread has died.
    pub fn enqueue(&self, op: WriteOp) -> Result<(), PersistError> {
        self.cmd_tx.try_send(Command::Enqueue(op)).map_err(|e| match e {
            TrySendError::Full(_) => PersistError::QueueFull { capacity: self.queue_capacity },
            TrySendError::Disconnected(_) => PersistError::WriterGone,
        })
    }

    /// Drains and commits the current batch, deduplicating by primary key
    /// (last-write-wins) before applying it in one transaction.
    pub fn flush(&self) -> Result<FlushReport, PersistError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.cmd_tx.send(Command::Flush(reply_tx)).map_err(|_| PersistError::WriterGone)?;
        reply_rx.recv_timeout(self.flush_timeout).map_err(|_| PersistError::FlushTimeout { timeout_ms: self.flush_timeout.as_millis() as u64 })?
    }

    /// Explicit, narrow update for the one `runs` column the blanket upsert
    /// deliberately excludes (`spec.md` §4.1 "Non-updatable columns").
    pub fn update_run_status(&self, run_id: &str, status: RunStatus) -> Result<(), PersistError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.cmd_tx.send(Command::UpdateRunStatus(run_id.to_string(), status, reply_tx)).map_err(|_| PersistError::WriterGone)?;
        reply_rx.recv_timeout(self.flush_timeout).map_err(|_| PersistError::FlushTimeout { timeout_ms: self.flush_timeout.as_millis() as u64 })?
    }

    /// Opens an independent read connection. Safe to call concurrently with
    /// in-flight writes; WAL mode gives each reader a consistent snapshot.
    pub fn read_connection(&self) -> Result<Connection, PersistError> {
        let conn = Connection::open(&self.db_path)?;
        conn.pragma_update(None, "query_only", true)?;
        Ok(conn)
    }

    /// Idempotent run creation: if a row with this `run_id` already exists,
    /// returns it (after verifying `run_key` matches, to catch hash
    /// collisions); otherwise inserts a fresh `running` row.
    pub fn get_or_create_run(&self, run_key: &str, input_manifest_hash: &str, versions: &RunVersions) -> Result<Run, PersistError> {
        let run_id = Run::run_id_from_key(run_key);
        let reader = self.read_connection()?;

        if let Some(existing) = fetch_run(&reader, &run_id)? {
            if existing.run_key != run_key {
                return Err(PersistError::RunKeyMismatch {
                    run_id,
                    expected: existing.run_key,
                    found: run_key.to_string(),
                });
            }
            return Ok(existing);
        }

        let run = Run {
            run_id: run_id.clone(),
            run_key: run_key.to_string(),
            input_manifest_hash: input_manifest_hash.to_string(),
            versions: versions.clone(),
            status: RunStatus::Running,
            last_completed_stage: 0,
            started_at: chrono::Utc::now(),
            finished_at: None,
        };

        self.enqueue(WriteOp::UpsertRun(run.clone()))?;
        self.flush()?;
        Ok(run)
    }

    /// Reads the current cached classification for a signature, if any. Used
    /// by the LLM Classifier (C7) to decide cache-state transitions before
    /// queuing a write — e.g. whether an existing row is human-verified, or
    /// was `failed_permanent` under the same `prompt_version`.
    pub fn get_classification_cache(&self, url_signature: &str) -> Result<Option<ClassificationCacheRow>, PersistError> {
        let reader = self.read_connection()?;
        fetch_classification_cache(&reader, url_signature)
    }

    /// Reads back the `signature_stats` rows persisted for one run. Used by
    /// the Orchestrator (C8) both to drive rule/LLM classification and, on a
    /// resumed run, to reconstruct stage-2's output without recomputing the
    /// A/B/C pass (`spec.md` §4.8 "Checkpointing").
    pub fn list_signature_stats(&self, run_id: &str) -> Result<Vec<SignatureStats>, PersistError> {
        let reader = self.read_connection()?;
        fetch_signature_stats(&reader, run_id)
    }

    /// Reads back one run by id, without the idempotent-creation side
    /// effects of [`Self::get_or_create_run`]. Used by `aimo status` and by
    /// the Orchestrator when resuming.
    pub fn get_run(&self, run_id: &str) -> Result<Option<Run>, PersistError> {
        let reader = self.read_connection()?;
        fetch_run(&reader, run_id)
    }
}

fn fetch_signature_stats(conn: &Connection, run_id: &str) -> Result<Vec<SignatureStats>, PersistError> {
    let mut stmt = conn.prepare(
        "SELECT url_signature, norm_host, norm_path_template, bytes_sent_bucket, access_count, \
            unique_users, bytes_sent_sum, bytes_sent_max, first_seen, last_seen, candidate_flags \
         FROM signature_stats WHERE run_id = ?1 ORDER BY url_signature",
    )?;
    let rows = stmt.query_map(params![run_id], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, u64>(4)?,
            r.get::<_, u64>(5)?,
            r.get::<_, u64>(6)?,
            r.get::<_, u64>(7)?,
            r.get::<_, String>(8)?,
            r.get::<_, String>(9)?,
            r.get::<_, String>(10)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (url_signature, norm_host, norm_path_template, bucket_str, access_count, unique_users, bytes_sent_sum, bytes_sent_max, first_seen, last_seen, flags_str) = row?;
        let first_seen = first_seen.parse().map_err(|_| rusqlite::Error::InvalidColumnType(8, "first_seen".to_string(), rusqlite::types::Type::Text))?;
        let last_seen = last_seen.parse().map_err(|_| rusqlite::Error::InvalidColumnType(9, "last_seen".to_string(), rusqlite::types::Type::Text))?;

        out.push(SignatureStats {
            run_id: run_id.to_string(),
            url_signature,
            norm_host,
            norm_path_template,
            bytes_sent_bucket: parse_bytes_bucket(&bucket_str),
            access_count,
            unique_users,
            bytes_sent_sum,
            bytes_sent_max,
            first_seen,
            last_seen,
            candidate_flags: parse_candidate_flags(&flags_str),
        });
    }
    Ok(out)
}

fn parse_bytes_bucket(s: &str) -> BytesBucket {
    match s {
        "M" => BytesBucket::M,
        "L" => BytesBucket::L,
        "XL" => BytesBucket::Xl,
        _ => BytesBucket::S,
    }
}

fn parse_candidate_flags(s: &str) -> std::collections::BTreeSet<CandidateFlag> {
    s.split('|')
        .filter_map(|tok| match tok {
            "A" => Some(CandidateFlag::A),
            "B" => Some(CandidateFlag::B),
            "C" => Some(CandidateFlag::C),
            "burst" => Some(CandidateFlag::Burst),
            "cumulative" => Some(CandidateFlag::Cumulative),
            "sampled" => Some(CandidateFlag::Sampled),
            _ => None,
        })
        .collect()
}

fn fetch_classification_cache(conn: &Connection, url_signature: &str) -> Result<Option<ClassificationCacheRow>, PersistError> {
    let mut stmt = conn.prepare(
        "SELECT service_name, category, usage_type, risk_level, confidence, rationale_short, \
            classification_source, taxonomy_json, signature_version, rule_version, prompt_version, \
            taxonomy_schema_version, model, status, is_human_verified, failure_count, error_type, \
            error_reason, last_error_at, analysis_date \
         FROM classification_cache WHERE url_signature = ?1",
    )?;
    let row = stmt
        .query_row(params![url_signature], |r| {
            Ok((
                r.get::<_, Option<String>>(0)?,
                r.get::<_, Option<String>>(1)?,
                r.get::<_, Option<String>>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, f64>(4)?,
                r.get::<_, Option<String>>(5)?,
                r.get::<_, String>(6)?,
                r.get::<_, String>(7)?,
                r.get::<_, String>(8)?,
                r.get::<_, String>(9)?,
                r.get::<_, String>(10)?,
                r.get::<_, String>(11)?,
                r.get::<_, Option<String>>(12)?,
                r.get::<_, String>(13)?,
                r.get::<_, bool>(14)?,
                r.get::<_, u32>(15)?,
                r.get::<_, Option<String>>(16)?,
                r.get::<_, Option<String>>(17)?,
                r.get::<_, Option<String>>(18)?,
                r.get::<_, String>(19)?,
            ))
        })
        .optional()?;

    let Some((
        service_name,
        category,
        usage_type,
        risk_level,
        confidence,
        rationale_short,
        classification_source,
        taxonomy_json,
        signature_version,
        rule_version,
        prompt_version,
        taxonomy_schema_version,
        model,
        status,
        is_human_verified,
        failure_count,
        error_type,
        error_reason,
        last_error_at,
        analysis_date,
    )) = row
    else {
        return Ok(None);
    };

    let taxonomy = serde_json::from_str(&taxonomy_json)?;
    let last_error_at = last_error_at.map(|s| s.parse()).transpose().map_err(|_| rusqlite::Error::InvalidColumnType(18, "last_error_at".to_string(), rusqlite::types::Type::Text))?;
    let analysis_date = analysis_date.parse().map_err(|_| rusqlite::Error::InvalidColumnType(19, "analysis_date".to_string(), rusqlite::types::Type::Text))?;

    Ok(Some(ClassificationCacheRow {
        url_signature: url_signature.to_string(),
        service_name,
        category,
        usage_type,
        risk_level,
        confidence,
        rationale_short,
        classification_source: parse_classification_source(&classification_source),
        taxonomy,
        signature_version,
        rule_version,
        prompt_version,
        taxonomy_schema_version,
        model,
        status: parse_cache_status(&status),
        is_human_verified,
        failure_count,
        error_type,
        error_reason,
        last_error_at,
        analysis_date,
    }))
}

fn parse_classification_source(s: &str) -> aimo_core::model::ClassificationSource {
    use aimo_core::model::ClassificationSource::*;
    match s {
        "LLM" => Llm,
        "STUB" => Stub,
        "HUMAN" => Human,
        _ => Rule,
    }
}

fn parse_cache_status(s: &str) -> aimo_core::model::CacheStatus {
    use aimo_core::model::CacheStatus::*;
    match s {
        "needs_review" => NeedsReview,
        "failed_permanent" => FailedPermanent,
        _ => Active,
    }
}

impl Drop for PersistenceGateway {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn fetch_run(conn: &Connection, run_id: &str) -> Result<Option<Run>, PersistError> {
    let mut stmt = conn.prepare(
        "SELECT run_id, run_key, input_manifest_hash, versions_json, status, last_completed_stage, started_at, finished_at \
         FROM runs WHERE run_id = ?1",
    )?;
    let row = stmt
        .query_row(params![run_id], |row| {
            let versions_json: String = row.get(3)?;
            let status_str: String = row.get(4)?;
            let started_at: String = row.get(6)?;
            let finished_at: Option<String> = row.get(7)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                versions_json,
                status_str,
                row.get::<_, u8>(5)?,
                started_at,
                finished_at,
            ))
        })
        .optional()?;

    let Some((run_id, run_key, input_manifest_hash, versions_json, status_str, last_completed_stage, started_at, finished_at)) = row else {
        return Ok(None);
    };

    let versions: RunVersions = serde_json::from_str(&versions_json)?;
    let status = parse_run_status(&status_str);
    let started_at = started_at.parse().map_err(|_| rusqlite::Error::InvalidColumnType(6, "started_at".to_string(), rusqlite::types::Type::Text))?;
    let finished_at = finished_at.map(|s| s.parse()).transpose().map_err(|_| rusqlite::Error::InvalidColumnType(7, "finished_at".to_string(), rusqlite::types::Type::Text))?;

    Ok(Some(Run { run_id, run_key, input_manifest_hash, versions, status, last_completed_stage, started_at, finished_at }))
}

fn parse_run_status(s: &str) -> RunStatus {
    match s {
        "succeeded" => RunStatus::Succeeded,
        "failed" => RunStatus::Failed,
        "partial" => RunStatus::Partial,
        _ => RunStatus::Running,
    }
}

fn run_status_str(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Running => "running",
        RunStatus::Succeeded => "succeeded",
        RunStatus::Failed => "failed",
        RunStatus::Partial => "partial",
    }
}

fn writer_loop(mut conn: Connection, cmd_rx: Receiver<Command>) {
    let mut pending: Vec<WriteOp> = Vec::new();

    loop {
        match cmd_rx.recv() {
            Ok(Command::Enqueue(op)) => pending.push(op),
            Ok(Command::Flush(reply)) => {
                let batch = std::mem::take(&mut pending);
                let result = apply_batch(&mut conn, batch);
                let _ = reply.send(result);
            }
            Ok(Command::UpdateRunStatus(run_id, status, reply)) => {
                let result = apply_update_run_status(&conn, &run_id, status);
                let _ = reply.send(result);
            }
            Ok(Command::Shutdown) | Err(_) => break,
        }
    }
}

fn apply_update_run_status(conn: &Connection, run_id: &str, status: RunStatus) -> Result<(), PersistError> {
    conn.execute("UPDATE runs SET status = ?1 WHERE run_id = ?2", params![run_status_str(status), run_id])?;
    Ok(())
}

fn apply_batch(conn: &mut Connection, batch: Vec<WriteOp>) -> Result<FlushReport, PersistError> {
    let deduped = dedup_batch(batch);
    let mut report = FlushReport::default();

    let tx = conn.transaction()?;
    for op in deduped {
        match op {
            WriteOp::UpsertRun(run) => {
                apply_upsert_run(&tx, &run)?;
                report.rows_written += 1;
            }
            WriteOp::InsertInputFile(file) => {
                tx.execute(
                    "INSERT INTO input_files (file_id, run_id, file_path, file_size, file_hash, vendor, log_type, row_count) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
                     ON CONFLICT(file_id) DO UPDATE SET row_count = excluded.row_count",
                    params![file.file_id, file.run_id, file.file_path, file.file_size, file.file_hash, file.vendor, file.log_type, file.row_count],
                )?;
                report.rows_written += 1;
            }
            WriteOp::UpsertSignatureStats(s) => {
                let flags = aimo_core::model::flags_to_string(&s.candidate_flags);
                tx.execute(
                    "INSERT INTO signature_stats (run_id, url_signature, norm_host, norm_path_template, bytes_sent_bucket, \
                     access_count, unique_users, bytes_sent_sum, bytes_sent_max, first_seen, last_seen, candidate_flags) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
                     ON CONFLICT(run_id, url_signature) DO UPDATE SET \
                       access_count = excluded.access_count, unique_users = excluded.unique_users, \
                       bytes_sent_sum = excluded.bytes_sent_sum, bytes_sent_max = excluded.bytes_sent_max, \
                       last_seen = excluded.last_seen, candidate_flags = excluded.candidate_flags",
                    params![
                        s.run_id,
                        s.url_signature,
                        s.norm_host,
                        s.norm_path_template,
                        s.bytes_sent_bucket.to_string(),
                        s.access_count,
                        s.unique_users,
                        s.bytes_sent_sum,
                        s.bytes_sent_max,
                        s.first_seen.to_rfc3339(),
                        s.last_seen.to_rfc3339(),
                        flags,
                    ],
                )?;
                report.rows_written += 1;
            }
            WriteOp::UpsertClassificationCache(row) => {
                if apply_upsert_classification_cache(&tx, &row)? {
                    report.human_verified_protected += 1;
                } else {
                    report.rows_written += 1;
                }
            }
            WriteOp::InsertPerformanceMetric(m) => {
                tx.execute(
                    "INSERT INTO performance_metrics (run_id, stage, metric_name, value, unit, started_at, finished_at, recorded_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![m.run_id, m.stage, m.metric_name, m.value, m.unit, m.started_at.to_rfc3339(), m.finished_at.to_rfc3339(), m.recorded_at.to_rfc3339()],
                )?;
                report.rows_written += 1;
            }
            WriteOp::InsertApiCost(c) => {
                tx.execute(
                    "INSERT INTO api_costs (run_id, provider, model, request_count, input_tokens, output_tokens, cost_usd_estimated) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![c.run_id, c.provider, c.model, c.request_count, c.input_tokens, c.output_tokens, c.cost_usd_estimated],
                )?;
                report.rows_written += 1;
            }
        }
    }
    tx.commit()?;

    Ok(report)
}

/// `status` is deliberately excluded from the upsert's UPDATE list
/// (`spec.md` §4.1): state transitions go through `update_run_status`.
fn apply_upsert_run(tx: &rusqlite::Transaction<'_>, run: &Run) -> Result<(), PersistError> {
    let versions_json = serde_json::to_string(&run.versions)?;
    tx.execute(
        "INSERT INTO runs (run_id, run_key, input_manifest_hash, versions_json, status, last_completed_stage, started_at, finished_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
         ON CONFLICT(run_id) DO UPDATE SET \
           run_key = excluded.run_key, input_manifest_hash = excluded.input_manifest_hash, \
           versions_json = excluded.versions_json, last_completed_stage = excluded.last_completed_stage, \
           finished_at = excluded.finished_at",
        params![
            run.run_id,
            run.run_key,
            run.input_manifest_hash,
            versions_json,
            run_status_str(run.status),
            run.last_completed_stage,
            run.started_at.to_rfc3339(),
            run.finished_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

/// Returns `true` if the write was discarded because the existing row is
/// human-verified (`spec.md` §4.1 "Human-verified protection"). `usage_type`
/// and `is_human_verified` are excluded from the blanket UPDATE list even on
/// a non-protected row; they are set only through dedicated human-review
/// tooling, not by automated classification writes.
fn apply_upsert_classification_cache(tx: &rusqlite::Transaction<'_>, row: &ClassificationCacheRow) -> Result<bool, PersistError> {
    let existing_verified: Option<bool> = tx
        .query_row("SELECT is_human_verified FROM classification_cache WHERE url_signature = ?1", params![row.url_signature], |r| r.get::<_, i64>(0))
        .optional()?
        .map(|v| v != 0);

    if existing_verified == Some(true) {
        tracing::warn!(
            url_signature = %row.url_signature,
            attempted_category = ?row.category,
            "discarding automated write to human-verified classification cache row"
        );
        tx.execute(
            "UPDATE classification_cache SET last_error_at = ?1 WHERE url_signature = ?2",
            params![row.last_error_at.map(|t| t.to_rfc3339()), row.url_signature],
        )?;
        return Ok(true);
    }

    let taxonomy_json = serde_json::to_string(&row.taxonomy)?;
    tx.execute(
        "INSERT INTO classification_cache ( \
            url_signature, service_name, category, usage_type, risk_level, confidence, rationale_short, \
            classification_source, taxonomy_json, signature_version, rule_version, prompt_version, \
            taxonomy_schema_version, model, status, is_human_verified, failure_count, error_type, \
            error_reason, last_error_at, analysis_date) \
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21) \
         ON CONFLICT(url_signature) DO UPDATE SET \
           service_name = excluded.service_name, category = excluded.category, risk_level = excluded.risk_level, \
           confidence = excluded.confidence, rationale_short = excluded.rationale_short, \
           classification_source = excluded.classification_source, taxonomy_json = excluded.taxonomy_json, \
           signature_version = excluded.signature_version, rule_version = excluded.rule_version, \
           prompt_version = excluded.prompt_version, taxonomy_schema_version = excluded.taxonomy_schema_version, \
           model = excluded.model, status = excluded.status, failure_count = excluded.failure_count, \
           error_type = excluded.error_type, error_reason = excluded.error_reason, \
           last_error_at = excluded.last_error_at, analysis_date = excluded.analysis_date",
        params![
            row.url_signature,
            row.service_name,
            row.category,
            row.usage_type,
            row.risk_level,
            row.confidence,
            row.rationale_short,
            classification_source_str(row.classification_source),
            taxonomy_json,
            row.signature_version,
            row.rule_version,
            row.prompt_version,
            row.taxonomy_schema_version,
            row.model,
            cache_status_str(row.status),
            row.is_human_verified,
            row.failure_count,
            row.error_type,
            row.error_reason,
            row.last_error_at.map(|t| t.to_rfc3339()),
            row.analysis_date.to_rfc3339(),
        ],
    )?;
    Ok(false)
}

fn classification_source_str(source: aimo_core::model::ClassificationSource) -> &'static str {
    use aimo_core::model::ClassificationSource::*;
    match source {
        Rule => "RULE",
        Llm => "LLM",
        Stub => "STUB",
        Human => "HUMAN",
    }
}

fn cache_status_str(status: aimo_core::model::CacheStatus) -> &'static str {
    use aimo_core::model::CacheStatus::*;
    match status {
        Active => "active",
        NeedsReview => "needs_review",
        FailedPermanent => "failed_permanent",
    }
}

/// Applies the legacy-compat normalization (`compat::normalize_taxonomy_record`)
/// to a freshly-read row's current taxonomy and legacy columns, used by the
/// Evidence Bundle Emitter (C9) when reading `classification_cache` for a run.
#[must_use]
pub fn normalize_legacy_row(current: &ClassificationCacheRow, legacy: &compat::LegacyTaxonomyColumns) -> compat::NormalizedTaxonomy {
    compat::normalize_taxonomy_record(&current.taxonomy, legacy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimo_core::model::{CacheStatus, ClassificationSource, TaxonomyAssignment};

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

    fn open_gateway() -> (PersistenceGateway, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = Utf8PathBuf::from_path_buf(dir.path().join("aimo.sqlite3")).unwrap();
        let temp_dir = Utf8PathBuf::from_path_buf(dir.path().join("tmp")).unwrap();
        let gateway = PersistenceGateway::open(&db_path, &temp_dir, 64).unwrap();
        (gateway, dir)
    }

    #[test]
    fn get_or_create_run_is_idempotent() {
        let (gateway, _dir) = open_gateway();
        let versions = versions();
        let run1 = gateway.get_or_create_run("key-1", "manifest-hash", &versions).unwrap();
        let run2 = gateway.get_or_create_run("key-1", "manifest-hash", &versions).unwrap();
        assert_eq!(run1.run_id, run2.run_id);

        let reader = gateway.read_connection().unwrap();
        let count: i64 = reader.query_row("SELECT COUNT(*) FROM runs", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn update_run_status_does_not_touch_other_columns() {
        let (gateway, _dir) = open_gateway();
        let run = gateway.get_or_create_run("key-2", "manifest-hash", &versions()).unwrap();
        gateway.update_run_status(&run.run_id, RunStatus::Succeeded).unwrap();

        let reader = gateway.read_connection().unwrap();
        let (status, stage): (String, u8) = reader
            .query_row("SELECT status, last_completed_stage FROM runs WHERE run_id = ?1", params![run.run_id], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(status, "succeeded");
        assert_eq!(stage, 0);
    }

    fn cache_row(url_signature: &str, is_human_verified: bool, category: &str) -> ClassificationCacheRow {
        ClassificationCacheRow {
            url_signature: url_signature.to_string(),
            service_name: Some("ChatGPT".to_string()),
            category: Some(category.to_string()),
            usage_type: Some("genai".to_string()),
            risk_level: Some("high".to_string()),
            confidence: 0.9,
            rationale_short: Some("matched rule".to_string()),
            classification_source: ClassificationSource::Rule,
            taxonomy: TaxonomyAssignment::default(),
            signature_version: "v1".into(),
            rule_version: "v1".into(),
            prompt_version: "v1".into(),
            taxonomy_schema_version: "v1".into(),
            model: None,
            status: CacheStatus::Active,
            is_human_verified,
            failure_count: 0,
            error_type: None,
            error_reason: None,
            last_error_at: None,
            analysis_date: chrono::Utc::now(),
        }
    }

    #[test]
    fn human_verified_row_rejects_automated_overwrite() {
        let (gateway, _dir) = open_gateway();
        gateway.enqueue(WriteOp::UpsertClassificationCache(cache_row("sig-1", true, "ChatGPT"))).unwrap();
        gateway.flush().unwrap();

        let report = {
            gateway.enqueue(WriteOp::UpsertClassificationCache(cache_row("sig-1", false, "Other"))).unwrap();
            gateway.flush().unwrap()
        };
        assert_eq!(report.human_verified_protected, 1);

        let reader = gateway.read_connection().unwrap();
        let category: String = reader.query_row("SELECT category FROM classification_cache WHERE url_signature = 'sig-1'", [], |r| r.get(0)).unwrap();
        assert_eq!(category, "ChatGPT");
    }

    #[test]
    fn batch_dedup_collapses_repeated_signature_upserts() {
        let (gateway, _dir) = open_gateway();
        gateway.enqueue(WriteOp::UpsertClassificationCache(cache_row("sig-2", false, "First"))).unwrap();
        gateway.enqueue(WriteOp::UpsertClassificationCache(cache_row("sig-2", false, "Second"))).unwrap();
        let report = gateway.flush().unwrap();
        assert_eq!(report.rows_written, 1);

        let reader = gateway.read_connection().unwrap();
        let category: String = reader.query_row("SELECT category FROM classification_cache WHERE url_signature = 'sig-2'", [], |r| r.get(0)).unwrap();
        assert_eq!(category, "Second");
    }
}
