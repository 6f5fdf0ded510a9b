//! Bundle emission + validation, run after stage 5's KPI block is built
//! (`spec.md` §4.9, §4.10, flow: "... then C9 which consults C1 and C10").

use aimo_bundle::{emit_bundle, BundleRequest, ExtractionParameters};
use aimo_core::jcs::to_canonical_string;
use aimo_persistence::PersistenceGateway;
use aimo_standard::ResolvedStandard;
use aimo_validate::validate_bundle;
use anyhow::{Context, Result};
use camino::Utf8Path;
use chrono::{DateTime, Utc};

pub struct BundleStageOutput {
    pub bundle_path: String,
    pub validation_passed: bool,
}

/// Emits the Evidence Bundle for `run_id`, then validates it and writes
/// `validation_result.json` as the last file in the bundle directory. A
/// failed validation does not delete the bundle — it's left on disk for
/// inspection — but the caller must mark the run `failed` per `spec.md` §7.
#[allow(clippy::too_many_arguments)]
pub fn run(
    gateway: &PersistenceGateway,
    standard: &ResolvedStandard,
    run_id: &str,
    vendor: &str,
    output_dir: &Utf8Path,
    extraction_parameters: ExtractionParameters,
    input_row_count: u64,
    run_started_at: DateTime<Utc>,
    run_finished_at: DateTime<Utc>,
    engine_spec_version: &str,
) -> Result<BundleStageOutput> {
    let generated_at = run_finished_at;
    let req = BundleRequest {
        run_id,
        vendor,
        extraction_parameters,
        input_row_count,
        run_started_at,
        run_finished_at,
        engine_spec_version,
    };

    let output = emit_bundle(gateway, standard, &req, output_dir, generated_at).context("emitting evidence bundle")?;

    let result = validate_bundle(&output.bundle_dir, standard, Utc::now()).context("validating evidence bundle")?;
    let validation_json = to_canonical_string(&result).context("serializing validation_result.json")?;
    aimo_core::atomic_write::write_text_atomic(&output.bundle_dir.join("validation_result.json"), &validation_json).context("writing validation_result.json")?;

    if !result.passed {
        tracing::warn!(run_id = %run_id, error_count = result.error_count, "bundle validation failed");
    }

    Ok(BundleStageOutput { bundle_path: output.bundle_dir.to_string(), validation_passed: result.passed })
}
