//! Row -> `CanonicalEvent` derivation (`spec.md` §4.3 steps 2-5).

use crate::mapping::VendorMapping;
use aimo_core::model::{Action, CanonicalEvent};
use aimo_urlsig::dest_domain;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeSet, HashMap};

/// Why a row was dropped (`spec.md` §4.3 "Failure").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDropReason {
    UnparseableTimestamp,
    MissingUserIdentity,
    MissingDestination,
    MissingBytesSent,
    MissingAction,
}

impl std::fmt::Display for EventDropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventDropReason::UnparseableTimestamp => "unparseable timestamp",
            EventDropReason::MissingUserIdentity => "missing user identity",
            EventDropReason::MissingDestination => "missing destination",
            EventDropReason::MissingBytesSent => "missing bytes_sent",
            EventDropReason::MissingAction => "missing action",
        };
        write!(f, "{s}")
    }
}

/// Parse a timestamp field as ISO-8601 or epoch seconds/millis, coercing to
/// UTC (`spec.md` §4.3 step 2).
fn parse_event_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(epoch) = raw.parse::<i64>() {
        // Heuristic: 13-digit values are milliseconds, else seconds.
        return if raw.len() >= 13 {
            Utc.timestamp_millis_opt(epoch).single()
        } else {
            Utc.timestamp_opt(epoch, 0).single()
        };
    }
    None
}

fn parse_u64(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().or_else(|| raw.trim().parse::<f64>().ok().map(|f| f.max(0.0) as u64))
}

fn extract_host_from_url(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let authority = rest.split('/').next().unwrap_or(rest);
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    let host = host_port.rsplit_once(':').map_or(host_port, |(h, _)| h);
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

/// Derive one `CanonicalEvent` from a raw row, or the reason it was dropped.
pub fn derive_event(
    mapping: &VendorMapping,
    file_path: &str,
    row_index: u64,
    row: &HashMap<String, String>,
) -> Result<CanonicalEvent, EventDropReason> {
    let raw_time = VendorMapping::first_present(row, &mapping.fields.event_time)
        .ok_or(EventDropReason::UnparseableTimestamp)?;
    let event_time = parse_event_time(raw_time).ok_or(EventDropReason::UnparseableTimestamp)?;

    let user_id = VendorMapping::first_present(row, &mapping.fields.user_id)
        .ok_or(EventDropReason::MissingUserIdentity)?
        .to_string();

    let url_full = VendorMapping::first_present(row, &mapping.fields.url_full).map(str::to_string);
    let dest_host = VendorMapping::first_present(row, &mapping.fields.dest_host)
        .map(str::to_string)
        .or_else(|| url_full.as_deref().and_then(extract_host_from_url))
        .ok_or(EventDropReason::MissingDestination)?;

    let bytes_sent = VendorMapping::first_present(row, &mapping.fields.bytes_sent)
        .and_then(parse_u64)
        .ok_or(EventDropReason::MissingBytesSent)?;
    let bytes_received = VendorMapping::first_present(row, &mapping.fields.bytes_received)
        .and_then(parse_u64)
        .unwrap_or(0);

    let action = mapping
        .action_map
        .resolve(row.get("action").map(String::as_str).unwrap_or(""));

    let mut sorted_fields: Vec<(String, String)> = row.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    sorted_fields.sort_by(|a, b| a.0.cmp(&b.0));
    let lineage = CanonicalEvent::compute_lineage_hash(file_path, row_index, &sorted_fields);

    Ok(CanonicalEvent {
        event_time,
        vendor: mapping.vendor.clone(),
        user_id,
        user_dept: VendorMapping::first_present(row, &mapping.fields.user_dept).map(str::to_string),
        device_id: VendorMapping::first_present(row, &mapping.fields.device_id).map(str::to_string),
        src_ip: VendorMapping::first_present(row, &mapping.fields.src_ip).map(str::to_string),
        dest_domain: dest_domain(&dest_host),
        dest_host,
        url_full: url_full.clone(),
        url_path: url_full.as_deref().and_then(|u| u.split_once("://")).map(|(_, r)| {
            let after_host = r.splitn(2, '/').nth(1).unwrap_or("");
            format!("/{}", after_host.split('?').next().unwrap_or(""))
        }),
        url_query: url_full
            .as_deref()
            .and_then(|u| u.split_once('?'))
            .map(|(_, q)| q.to_string()),
        http_method: VendorMapping::first_present(row, &mapping.fields.http_method).map(str::to_string),
        status_code: VendorMapping::first_present(row, &mapping.fields.status_code).and_then(|s| s.parse().ok()),
        action,
        app_name: VendorMapping::first_present(row, &mapping.fields.app_name).map(str::to_string),
        app_category: VendorMapping::first_present(row, &mapping.fields.app_category).map(str::to_string),
        bytes_sent,
        bytes_received,
        content_type: VendorMapping::first_present(row, &mapping.fields.content_type).map(str::to_string),
        user_agent: VendorMapping::first_present(row, &mapping.fields.user_agent).map(str::to_string),
        ingest_lineage_hash: lineage,
        candidate_flags: BTreeSet::new(),
        url_signature: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ActionMap;
    use crate::mapping::FieldCandidates;

    fn test_mapping() -> VendorMapping {
        VendorMapping {
            vendor: "paloalto".to_string(),
            log_type: "proxy".to_string(),
            fields: FieldCandidates {
                event_time: vec!["time_generated".to_string()],
                bytes_sent: vec!["bytes_sent".to_string()],
                bytes_received: vec!["bytes_received".to_string()],
                url_full: vec!["url".to_string()],
                dest_host: vec![],
                user_id: vec!["src_user".to_string()],
                http_method: vec!["http_method".to_string()],
                ..Default::default()
            },
            action_map: ActionMap {
                default: "unknown".to_string(),
                allow: vec!["allow".to_string()],
                block: vec!["deny".to_string()],
            },
        }
    }

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn derives_event_from_well_formed_row() {
        let mapping = test_mapping();
        let r = row(&[
            ("time_generated", "2024-01-15T10:23:45Z"),
            ("bytes_sent", "1048576"),
            ("bytes_received", "512"),
            ("url", "https://api.openai.com/v1/chat/completions"),
            ("src_user", "u1"),
            ("http_method", "POST"),
            ("action", "allow"),
        ]);
        let event = derive_event(&mapping, "file.csv", 0, &r).unwrap();
        assert_eq!(event.user_id, "u1");
        assert_eq!(event.dest_domain, "openai.com");
        assert_eq!(event.action, Action::Allow);
        assert_eq!(event.bytes_sent, 1_048_576);
    }

    #[test]
    fn drops_row_missing_user_identity() {
        let mapping = test_mapping();
        let r = row(&[
            ("time_generated", "2024-01-15T10:23:45Z"),
            ("bytes_sent", "1024"),
            ("url", "https://example.com/"),
        ]);
        assert_eq!(
            derive_event(&mapping, "file.csv", 0, &r).unwrap_err(),
            EventDropReason::MissingUserIdentity
        );
    }

    #[test]
    fn drops_row_with_unparseable_timestamp() {
        let mapping = test_mapping();
        let r = row(&[("time_generated", "not-a-date"), ("src_user", "u1")]);
        assert_eq!(
            derive_event(&mapping, "file.csv", 0, &r).unwrap_err(),
            EventDropReason::UnparseableTimestamp
        );
    }

    #[test]
    fn epoch_seconds_timestamp_parses() {
        assert!(parse_event_time("1705314225").is_some());
    }

    #[test]
    fn lineage_hash_differs_by_file_path_for_identical_content() {
        let mapping = test_mapping();
        let r = row(&[
            ("time_generated", "2024-01-15T10:23:45Z"),
            ("bytes_sent", "1024"),
            ("url", "https://example.com/"),
            ("src_user", "u1"),
            ("action", "allow"),
        ]);
        let e1 = derive_event(&mapping, "file_a.csv", 0, &r).unwrap();
        let e2 = derive_event(&mapping, "file_b.csv", 0, &r).unwrap();
        assert_ne!(e1.ingest_lineage_hash, e2.ingest_lineage_hash);
    }
}
