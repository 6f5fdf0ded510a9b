//! Stage 1 — Ingest (`spec.md` §4.3, §4.8).

use aimo_core::model::CanonicalEvent;
use aimo_ingest::mapping::VendorMapping;
use aimo_persistence::{PersistenceGateway, WriteOp};
use anyhow::{Context, Result};
use camino::Utf8Path;

pub struct IngestStageOutput {
    pub events: Vec<CanonicalEvent>,
    pub row_count: u64,
}

/// Parses the input file, canonicalizes its rows, and persists the
/// `InputFile` record. Drops are logged individually, never silently
/// (`spec.md` §4.3).
pub fn run(gateway: &PersistenceGateway, run_id: &str, input_path: &Utf8Path, mapping: &VendorMapping) -> Result<IngestStageOutput> {
    let outcome = aimo_ingest::ingest_file(run_id, input_path, mapping).context("ingesting input file")?;

    for (row_index, reason) in &outcome.row_drop_warnings {
        tracing::warn!(run_id, row_index, reason = %reason, "row dropped during canonicalization");
    }

    let row_count = outcome.input_file.row_count;
    gateway.enqueue(WriteOp::InsertInputFile(outcome.input_file)).context("queuing input_file record")?;
    gateway.flush().context("flushing input_file record")?;

    tracing::info!(run_id, row_count, event_count = outcome.events.len(), dropped = outcome.row_drop_warnings.len(), "ingest stage complete");
    Ok(IngestStageOutput { events: outcome.events, row_count })
}
