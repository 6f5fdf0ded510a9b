//! Evidence Bundle assembly (`spec.md` §4.9): writes every content file
//! atomically, then `checksums.json` last of the content files. It does not
//! write `validation_result.json` — that belongs to the Validator stage,
//! which runs after a bundle is fully on disk.

use crate::checksums::build_checksum_manifest;
use crate::error::BundleError;
use crate::logs::{build_agent_activity_record, build_shadow_ai_discovery_record, is_genai_classified};
use crate::manifest::{aggregate_taxonomy_summary, build_run_manifest, evidence_file_refs, EvidencePackManifest, ExtractionParameters};
use crate::taxonomy_assignments::build_taxonomy_assignment_record;
use aimo_core::atomic_write::write_text_atomic;
use aimo_core::jcs::to_canonical_string;
use aimo_persistence::PersistenceGateway;
use aimo_standard::ResolvedStandard;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};

/// Parameters that don't live on `Run` but are needed to populate
/// `run_manifest.json`'s `extraction_parameters` block.
pub struct BundleRequest<'a> {
    pub run_id: &'a str,
    pub vendor: &'a str,
    pub extraction_parameters: ExtractionParameters,
    pub input_row_count: u64,
    pub run_started_at: DateTime<Utc>,
    pub run_finished_at: DateTime<Utc>,
    pub engine_spec_version: &'a str,
}

/// Relative paths of every file this writer produced, in write order. The
/// Validator reads this back to confirm `evidence_pack_manifest.json`'s
/// file list matches what's actually on disk.
pub struct BundleOutput {
    pub bundle_dir: Utf8PathBuf,
    pub relative_paths: Vec<String>,
}

pub fn emit_bundle(gateway: &PersistenceGateway, standard: &ResolvedStandard, req: &BundleRequest<'_>, output_dir: &Utf8Path, generated_at: DateTime<Utc>) -> Result<BundleOutput, BundleError> {
    let run = gateway.get_run(req.run_id)?.ok_or_else(|| BundleError::RunNotFound { run_id: req.run_id.to_string() })?;

    let bundle_dir = output_dir.join(req.run_id);
    let mut relative_paths = Vec::new();

    let run_manifest = build_run_manifest(&run, req.vendor, &standard.artifacts, req.extraction_parameters, generated_at);
    write_json(&bundle_dir, "run_manifest.json", &run_manifest, &mut relative_paths)?;

    let signatures = gateway.list_signature_stats(req.run_id)?;
    let mut classification_rows = Vec::with_capacity(signatures.len());
    let mut assignment_records = Vec::with_capacity(signatures.len());
    let mut discovery_records = Vec::new();

    for stats in &signatures {
        let Some(row) = gateway.get_classification_cache(&stats.url_signature)? else {
            continue;
        };
        assignment_records.push(build_taxonomy_assignment_record(stats, &row));
        if is_genai_classified(&row) {
            discovery_records.push(build_shadow_ai_discovery_record(req.run_id, &stats.url_signature, stats.last_seen, &row));
        }
        classification_rows.push(row);
    }

    write_json(&bundle_dir, "analysis/taxonomy_assignments.json", &assignment_records, &mut relative_paths)?;

    write_jsonl(&bundle_dir, "logs/shadow_ai_discovery.jsonl", &discovery_records, &mut relative_paths)?;

    let agent_activity = vec![build_agent_activity_record(
        req.run_id,
        req.run_started_at,
        req.run_finished_at,
        req.input_row_count,
        signatures.len(),
        req.engine_spec_version,
    )];
    write_jsonl(&bundle_dir, "logs/agent_activity.jsonl", &agent_activity, &mut relative_paths)?;

    let taxonomy_summary = aggregate_taxonomy_summary(&classification_rows, &standard.taxonomy);
    let evidence_files = evidence_file_refs(&[
        ("run_manifest.json", "manifest"),
        ("analysis/taxonomy_assignments.json", "analysis"),
        ("logs/shadow_ai_discovery.jsonl", "log"),
        ("logs/agent_activity.jsonl", "log"),
    ]);
    let evidence_pack_manifest = EvidencePackManifest {
        standard_version: standard.artifacts.standard_version.clone(),
        run_id: req.run_id.to_string(),
        generated_at,
        taxonomy_summary,
        evidence_files,
    };
    write_json(&bundle_dir, "evidence_pack_manifest.json", &evidence_pack_manifest, &mut relative_paths)?;

    let checksums = build_checksum_manifest(&bundle_dir, &relative_paths)?;
    let checksums_path = bundle_dir.join("checksums.json");
    write_text_atomic(&checksums_path, &to_canonical_string(&checksums)?)?;
    relative_paths.push("checksums.json".to_string());

    Ok(BundleOutput { bundle_dir, relative_paths })
}

fn write_json<T: serde::Serialize>(bundle_dir: &Utf8Path, relative_path: &str, value: &T, relative_paths: &mut Vec<String>) -> Result<(), BundleError> {
    let path = bundle_dir.join(relative_path);
    write_text_atomic(&path, &to_canonical_string(value)?)?;
    relative_paths.push(relative_path.to_string());
    Ok(())
}

fn write_jsonl<T: serde::Serialize>(bundle_dir: &Utf8Path, relative_path: &str, rows: &[T], relative_paths: &mut Vec<String>) -> Result<(), BundleError> {
    let mut body = String::new();
    for row in rows {
        body.push_str(&to_canonical_string(row)?);
        body.push('\n');
    }
    let path = bundle_dir.join(relative_path);
    write_text_atomic(&path, &body)?;
    relative_paths.push(relative_path.to_string());
    Ok(())
}
