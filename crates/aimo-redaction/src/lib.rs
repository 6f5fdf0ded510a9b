//! PII-suspect pattern detection shared by the URL Normalizer (C4) and the
//! sanitized CSV export path.
//!
//! One source of truth for "what looks like PII" keeps the signature
//! builder's path-segment placeholder logic and the export's forbidden-value
//! scrubbing in sync, the same way the teacher family keeps a single
//! canonical pattern table for secret detection and reuses it for both
//! runtime redaction and documentation generation.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Category of PII-suspect content a path segment or query value can match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Numeric,
    Uuid,
    LongHex,
    Base64ish,
    Email,
    Plain,
}

static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap());

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

/// 16+ contiguous hex characters, the threshold the teacher's pattern table
/// uses for "long enough to be an opaque identifier" detection.
static LONG_HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[0-9a-f]{16,}$").unwrap());

static BASE64ISH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/_-]{20,}={0,2}$").unwrap());

pub static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").unwrap());

/// Classify a single URL path segment or query value.
///
/// Order matters: a segment is classified as the most specific kind it
/// matches, checked numeric → UUID → long-hex → base64-ish → email →
/// otherwise left alone as `Plain`.
#[must_use]
pub fn classify_segment(segment: &str) -> SegmentKind {
    if segment.is_empty() {
        return SegmentKind::Plain;
    }
    if NUMERIC.is_match(segment) {
        SegmentKind::Numeric
    } else if UUID.is_match(segment) {
        SegmentKind::Uuid
    } else if LONG_HEX.is_match(segment) {
        SegmentKind::LongHex
    } else if BASE64ISH.is_match(segment) {
        SegmentKind::Base64ish
    } else if EMAIL.is_match(segment) {
        SegmentKind::Email
    } else {
        SegmentKind::Plain
    }
}

/// Whether a segment should be replaced by a placeholder in a
/// `norm_path_template` (`spec.md` §4.4).
#[must_use]
pub fn is_pii_suspect(segment: &str) -> bool {
    !matches!(classify_segment(segment), SegmentKind::Plain)
}

/// The placeholder token a given kind is replaced by.
#[must_use]
pub const fn placeholder_for(kind: SegmentKind) -> &'static str {
    match kind {
        SegmentKind::Numeric => "{num}",
        SegmentKind::Uuid => "{uuid}",
        SegmentKind::LongHex => "{hex}",
        SegmentKind::Base64ish => "{b64}",
        SegmentKind::Email => "{email}",
        SegmentKind::Plain => "",
    }
}

/// Columns a sanitized CSV export must never emit (`spec.md` §8 RT3).
pub const FORBIDDEN_EXPORT_COLUMNS: &[&str] =
    &["user_id", "src_ip", "device_id", "url_full", "url_path", "url_query"];

/// Whether `value` contains an email-pattern substring (RT3's second check).
#[must_use]
pub fn contains_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Salted, keyed hash of a value for sanitized exports that still need a
/// stable per-value token without revealing the original (`SANITIZE_SALT`,
/// `spec.md` §6).
#[must_use]
pub fn salted_token(value: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"|");
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}
