//! Stage 2 — Normalize, detect, persist (`spec.md` §4.4, §4.5, §4.8).
//!
//! Assigns `url_signature` (C4), sorts to the deterministic ordering the
//! detector requires, runs the A/B/C pass (C5), then aggregates per-signature
//! statistics and persists them. `CanonicalEvent`s themselves are ephemeral
//! and do not outlive this stage.

use aimo_core::model::{CandidateFlag, CanonicalEvent, SignatureStats};
use aimo_detect::{detect_abc, DetectionMetadata, Thresholds};
use aimo_persistence::{PersistenceGateway, WriteOp};
use aimo_urlsig::{build_signature, UrlSignatureResult};
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};

pub struct NormalizeDetectOutput {
    pub metadata: DetectionMetadata,
    pub signature_count: usize,
}

pub fn run(gateway: &PersistenceGateway, run_id: &str, mut events: Vec<CanonicalEvent>, thresholds: &Thresholds) -> Result<NormalizeDetectOutput> {
    let mut signature_info: HashMap<String, UrlSignatureResult> = HashMap::new();
    for event in &mut events {
        let sig = build_signature(event.url_full.as_deref().unwrap_or(""), Some(event.dest_host.as_str()), event.http_method.as_deref().unwrap_or("GET"), event.bytes_sent);
        event.url_signature = Some(sig.url_signature.clone());
        signature_info.entry(sig.url_signature.clone()).or_insert(sig);
    }

    events.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));

    let metadata = detect_abc(&mut events, run_id, thresholds);
    tracing::info!(run_id, a_count = metadata.a_count, b_count = metadata.b_count, c_count = metadata.c_count, "A/B/C detection complete");

    let mut aggregates: HashMap<String, SignatureStats> = HashMap::new();
    let mut users: HashMap<String, HashSet<String>> = HashMap::new();

    for event in &events {
        let Some(url_signature) = event.url_signature.clone() else { continue };
        let Some(info) = signature_info.get(&url_signature) else { continue };

        let entry = aggregates.entry(url_signature.clone()).or_insert_with(|| SignatureStats {
            run_id: run_id.to_string(),
            url_signature: url_signature.clone(),
            norm_host: info.norm_host.clone(),
            norm_path_template: info.norm_path_template.clone(),
            bytes_sent_bucket: info.bytes_bucket,
            access_count: 0,
            unique_users: 0,
            bytes_sent_sum: 0,
            bytes_sent_max: 0,
            first_seen: event.event_time,
            last_seen: event.event_time,
            candidate_flags: Default::default(),
        });

        entry.access_count += 1;
        entry.bytes_sent_sum += event.bytes_sent;
        entry.bytes_sent_max = entry.bytes_sent_max.max(event.bytes_sent);
        entry.first_seen = entry.first_seen.min(event.event_time);
        entry.last_seen = entry.last_seen.max(event.event_time);
        for flag in &event.candidate_flags {
            entry.candidate_flags.insert(*flag);
        }
        users.entry(url_signature).or_default().insert(event.user_id.clone());
    }

    let signature_count = aggregates.len();
    for (url_signature, mut stats) in aggregates {
        stats.unique_users = users.get(&url_signature).map_or(0, HashSet::len) as u64;
        gateway.enqueue(WriteOp::UpsertSignatureStats(stats)).context("queuing signature_stats row")?;
    }
    gateway.flush().context("flushing signature_stats")?;

    tracing::info!(run_id, signature_count, "normalize+detect stage complete");
    Ok(NormalizeDetectOutput { metadata, signature_count })
}

#[must_use]
pub fn is_candidate(flags: &std::collections::BTreeSet<CandidateFlag>) -> bool {
    flags.contains(&CandidateFlag::A) || flags.contains(&CandidateFlag::B) || flags.contains(&CandidateFlag::C)
}
