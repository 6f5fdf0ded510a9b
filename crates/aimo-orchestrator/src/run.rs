//! Pipeline entry point: sequences the six stages over one
//! [`crate::context::EngineContext`], checkpointing `last_completed_stage`
//! after each flush so a crash mid-run resumes rather than restarts
//! (`spec.md` §4.1, §4.8).

use crate::context::EngineContext;
use crate::stages::{bundle, ingest, llm_classify, normalize_detect, report, rule_classify};
use aimo_bundle::ExtractionParameters;
use aimo_core::model::{Run, Stage};
use aimo_llm::VersionStamp;
use aimo_persistence::{PersistError, WriteOp};
use anyhow::{Context, Result};
use camino::Utf8Path;
use chrono::Utc;

/// Final summary returned to the CLI layer after a run (or dry-run) completes.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub dry_run: bool,
    pub kpi: report::KpiBlock,
}

/// Runs the pipeline end to end against `input_path`, or resumes a prior run
/// over the same input and versions if one is already in progress.
///
/// `--dry-run` stops after stage 2 (normalize/detect/persist) without
/// invoking classification or finalizing the run — the row is left
/// `running` and resumable by a subsequent non-dry-run invocation.
pub async fn run_pipeline(ctx: &EngineContext, input_path: &Utf8Path) -> Result<RunReport> {
    let input_manifest_hash = aimo_core::hashing::sha256_file(input_path.as_std_path()).with_context(|| format!("hashing input file {input_path}"))?;
    let versions = ctx.run_versions();
    let run_key = Run::compute_run_key(&input_manifest_hash, &versions);

    let run = ctx.gateway.get_or_create_run(&run_key, &input_manifest_hash, &versions).map_err(run_collision_to_engine)?;
    let run_id = run.run_id.clone();
    let last_completed = Stage::from_u8(run.last_completed_stage).unwrap_or(Stage::Init);

    tracing::info!(run_id = %run_id, resumed = last_completed != Stage::Init, last_completed_stage = run.last_completed_stage, "pipeline run starting");

    let events = if last_completed < Stage::NormalizeAbcPersist {
        let out = ingest::run(&ctx.gateway, &run_id, input_path, &ctx.mapping).context("stage 1: ingest")?;
        checkpoint(ctx, &run_id, Stage::Ingest)?;
        Some((out.events, out.row_count))
    } else {
        None
    };

    let input_rows = if let Some((events, row_count)) = events {
        let thresholds = aimo_detect::Thresholds {
            a_min_bytes: ctx.config.thresholds.a_min_bytes,
            burst_threshold: ctx.config.thresholds.burst_threshold,
            cumulative_threshold_bytes: ctx.config.thresholds.cumulative_threshold_bytes,
            sample_rate: ctx.config.thresholds.sample_rate,
            ..aimo_detect::Thresholds::default()
        };
        normalize_detect::run(&ctx.gateway, &run_id, events, &thresholds).context("stage 2: normalize/detect/persist")?;
        checkpoint(ctx, &run_id, Stage::NormalizeAbcPersist)?;
        row_count
    } else {
        report::sum_input_rows(&ctx.gateway, &run_id).context("reading persisted input row count for resumed run")?
    };

    if ctx.config.dry_run {
        let kpi = report::build_kpi(&ctx.gateway, &run_id, input_rows).context("building dry-run KPI block")?;
        tracing::info!(run_id = %run_id, ?kpi, "dry-run complete, run left resumable");
        return Ok(RunReport { run_id, dry_run: true, kpi });
    }

    let signatures = ctx.gateway.list_signature_stats(&run_id).context("reading signature stats for classification")?;

    if last_completed < Stage::RuleClassify {
        rule_classify::run(&ctx.gateway, &signatures, &ctx.rules, &versions).context("stage 3: rule classify")?;
        checkpoint(ctx, &run_id, Stage::RuleClassify)?;
    }

    if last_completed < Stage::LlmClassify {
        let version_stamp = VersionStamp {
            signature_version: versions.signature_version.clone(),
            rule_version: versions.rule_version.clone(),
            prompt_version: versions.prompt_version.clone(),
            taxonomy_schema_version: versions.taxonomy_version.clone(),
            model: Some(ctx.config.llm.model.clone()),
        };
        llm_classify::run(&ctx.gateway, ctx.llm_backend.as_ref(), &ctx.budget, &signatures, &version_stamp, ctx.config.llm.max_batch_size)
            .await
            .context("stage 4: LLM classify")?;
        checkpoint(ctx, &run_id, Stage::LlmClassify)?;
    }

    let mut kpi = report::build_kpi(&ctx.gateway, &run_id, input_rows).context("building KPI block")?;

    let output_dir = ctx.config.paths.output_dir.as_ref().context("--output-dir (or [paths] output_dir) is required")?;
    let run = ctx.gateway.get_run(&run_id).context("reloading run for bundle emission")?.with_context(|| format!("run {run_id} vanished before bundle emission"))?;
    let extraction_parameters = ExtractionParameters {
        a_min_bytes: ctx.config.thresholds.a_min_bytes,
        burst_threshold: ctx.config.thresholds.burst_threshold,
        cumulative_threshold_bytes: ctx.config.thresholds.cumulative_threshold_bytes,
        sample_rate: ctx.config.thresholds.sample_rate,
    };
    let bundle_output = bundle::run(
        &ctx.gateway,
        &ctx.standard,
        &run_id,
        &ctx.config.vendor,
        output_dir,
        extraction_parameters,
        input_rows,
        run.started_at,
        Utc::now(),
        &versions.engine_spec_version,
    )
    .context("stage 9: evidence bundle emission + validation")?;
    kpi.bundle_path = Some(bundle_output.bundle_path);
    kpi.bundle_validation_passed = Some(bundle_output.validation_passed);

    report::finalize(&ctx.gateway, &run_id, bundle_output.validation_passed).context("stage 5: finalize")?;
    checkpoint(ctx, &run_id, Stage::Report)?;

    tracing::info!(run_id = %run_id, ?kpi, "pipeline run complete");
    Ok(RunReport { run_id, dry_run: false, kpi })
}

/// Bumps `last_completed_stage` on the run row through the same blanket
/// `UpsertRun` upsert used at creation, then flushes so the checkpoint is
/// durable before the next stage starts (`spec.md` §4.1 "resumability").
fn checkpoint(ctx: &EngineContext, run_id: &str, stage: Stage) -> Result<()> {
    let mut run = ctx.gateway.get_run(run_id).context("reloading run for checkpoint")?.with_context(|| format!("run {run_id} vanished before checkpointing"))?;
    run.last_completed_stage = stage.as_u8();
    ctx.gateway.enqueue(WriteOp::UpsertRun(run)).with_context(|| format!("queuing checkpoint for stage {stage:?}"))?;
    ctx.gateway.flush().with_context(|| format!("flushing checkpoint for stage {stage:?}"))?;
    Ok(())
}

fn run_collision_to_engine(e: PersistError) -> anyhow::Error {
    match e {
        PersistError::RunKeyMismatch { run_id, .. } => aimo_core::AimoError::RunCollision { run_id }.into(),
        other => anyhow::Error::new(other).context("creating or loading run"),
    }
}
