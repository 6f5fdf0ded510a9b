//! The A/B/C candidate predicates and per-run detection pass (`spec.md` §4.5).

use crate::thresholds::Thresholds;
use crate::windows::{floor_to_5min, floor_to_day};
use aimo_core::hashing::sha256_first8_be_u64;
use aimo_core::model::{Action, CandidateFlag, CanonicalEvent};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Aggregate counters and sampling metadata emitted alongside per-event
/// flags (`spec.md` §4.5 "Metadata").
#[derive(Debug, Clone, Default)]
pub struct DetectionMetadata {
    pub a_count: usize,
    pub b_count: usize,
    pub c_count: usize,
    pub sampling_seed: String,
    pub sample_threshold: u64,
}

fn window_key(event: &CanonicalEvent) -> (String, String, DateTime<Utc>) {
    (event.user_id.clone(), event.dest_domain.clone(), floor_to_5min(event.event_time))
}

fn day_key(event: &CanonicalEvent) -> (String, String, DateTime<Utc>) {
    (event.user_id.clone(), event.dest_domain.clone(), floor_to_day(event.event_time))
}

/// Run the full A/B/C detection pass over a run's canonical events.
///
/// Events must already be sorted by `CanonicalEvent::ordering_key` and must
/// already carry a `url_signature` (assigned by the URL Normalizer, C4)
/// before this runs, per the Orchestrator's stage-2 sequencing.
pub fn detect_abc(events: &mut [CanonicalEvent], run_id: &str, thresholds: &Thresholds) -> DetectionMetadata {
    // Both aggregates are built over allow-action events only (spec.md §4.5
    // Metadata "declared exclusions"). The burst count is further scoped to
    // write-method events (§4.5 B(ii)); the cumulative-bytes sum is not —
    // it's a day total over every allowed event's bytes_sent (§4.5 B(iii)),
    // write or read.
    let mut window_counts: BTreeMap<(String, String, DateTime<Utc>), u32> = BTreeMap::new();
    let mut day_sums: BTreeMap<(String, String, DateTime<Utc>), u64> = BTreeMap::new();

    for event in events.iter() {
        if event.action != Action::Allow {
            continue;
        }
        if thresholds.is_write_method(event.http_method.as_deref()) {
            *window_counts.entry(window_key(event)).or_insert(0) += 1;
        }
        *day_sums.entry(day_key(event)).or_insert(0) += event.bytes_sent;
    }

    let mut meta = DetectionMetadata {
        sampling_seed: run_id.to_string(),
        sample_threshold: thresholds.sample_threshold(),
        ..Default::default()
    };

    for event in events.iter_mut() {
        let mut flags = std::mem::take(&mut event.candidate_flags);

        let is_write = thresholds.is_write_method(event.http_method.as_deref());
        let is_allow = event.action == Action::Allow;

        let window_count = window_counts.get(&window_key(event)).copied().unwrap_or(0);
        let day_sum = day_sums.get(&day_key(event)).copied().unwrap_or(0);

        if window_count >= thresholds.burst_threshold {
            flags.insert(CandidateFlag::Burst);
        }
        if day_sum >= thresholds.cumulative_threshold_bytes {
            flags.insert(CandidateFlag::Cumulative);
        }

        let is_a = is_allow && event.bytes_sent >= thresholds.a_min_bytes;
        if is_a {
            flags.insert(CandidateFlag::A);
            meta.a_count += 1;
        }

        let is_b = is_allow
            && is_write
            && (thresholds.is_high_risk_category(event.app_category.as_deref())
                || flags.contains(&CandidateFlag::Burst)
                || flags.contains(&CandidateFlag::Cumulative));
        if is_b {
            flags.insert(CandidateFlag::B);
            meta.b_count += 1;
        }

        // C: drawn only from sub-A-sized B-candidates (spec.md §9 open
        // question, codified exactly as stated — not reinterpreted).
        let is_c = is_b && event.bytes_sent < thresholds.a_min_bytes && {
            let input = format!("{run_id}|{}", event.ingest_lineage_hash);
            sha256_first8_be_u64(&input) % 10_000 < meta.sample_threshold
        };
        if is_c {
            flags.insert(CandidateFlag::C);
            flags.insert(CandidateFlag::Sampled);
            meta.c_count += 1;
        }

        event.candidate_flags = flags;
    }

    meta
}
