//! Canonical record types for the AIMO data model (`spec.md` §3).
//!
//! These types are the contract between every pipeline stage and the
//! Persistence Gateway (C1): they are plain data, serializable, and carry no
//! component-specific behavior. Composite keys derive `Ord`/`Hash` so they
//! can key `BTreeMap`/`HashMap` aggregations before a flush.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
    Partial,
}

/// Orchestrator stage identifiers (`spec.md` §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Stage {
    Init = 0,
    Ingest = 1,
    NormalizeAbcPersist = 2,
    RuleClassify = 3,
    LlmClassify = 4,
    Report = 5,
}

impl Stage {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Stage::Init),
            1 => Some(Stage::Ingest),
            2 => Some(Stage::NormalizeAbcPersist),
            3 => Some(Stage::RuleClassify),
            4 => Some(Stage::LlmClassify),
            5 => Some(Stage::Report),
            _ => None,
        }
    }
}

/// Versioned inputs that jointly determine `run_key` / `run_id`
/// (`spec.md` §3 "Run").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunVersions {
    pub target_range: String,
    pub signature_version: String,
    pub rule_version: String,
    pub prompt_version: String,
    pub taxonomy_version: String,
    pub evidence_pack_version: String,
    pub engine_spec_version: String,
}

/// One pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_key: String,
    pub input_manifest_hash: String,
    pub versions: RunVersions,
    pub status: RunStatus,
    pub last_completed_stage: u8,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Run {
    /// Compute `run_key` = sha256 of the pipe-joined input manifest hash and
    /// version tuple (`spec.md` §3).
    #[must_use]
    pub fn compute_run_key(input_manifest_hash: &str, versions: &RunVersions) -> String {
        aimo_core_hash_joined(input_manifest_hash, versions)
    }

    /// `run_id` is the first 16 hex chars of `run_key`.
    #[must_use]
    pub fn run_id_from_key(run_key: &str) -> String {
        run_key.chars().take(16).collect()
    }
}

fn aimo_core_hash_joined(input_manifest_hash: &str, v: &RunVersions) -> String {
    crate::hashing::sha256_joined([
        input_manifest_hash,
        v.target_range.as_str(),
        v.signature_version.as_str(),
        v.rule_version.as_str(),
        v.prompt_version.as_str(),
        v.taxonomy_version.as_str(),
        v.evidence_pack_version.as_str(),
        v.engine_spec_version.as_str(),
    ])
}

/// One ingested input file (`spec.md` §3 "InputFile").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFile {
    pub file_id: String,
    pub run_id: String,
    pub file_path: String,
    pub file_size: u64,
    pub file_hash: String,
    pub vendor: String,
    pub log_type: String,
    pub row_count: u64,
}

impl InputFile {
    #[must_use]
    pub fn compute_file_id(path: &str, size: u64, mtime_unix: i64) -> String {
        crate::hashing::sha256_joined([path.to_string(), size.to_string(), mtime_unix.to_string()])
    }
}

/// Action outcome of a proxied/firewalled request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Block,
    Unknown,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Allow => write!(f, "allow"),
            Action::Block => write!(f, "block"),
            Action::Unknown => write!(f, "unknown"),
        }
    }
}

/// A normalized event flowing through the pipeline (`spec.md` §3
/// "CanonicalEvent"). Ephemeral — not required to be persisted row-level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub event_time: DateTime<Utc>,
    pub vendor: String,
    pub user_id: String,
    pub user_dept: Option<String>,
    pub device_id: Option<String>,
    pub src_ip: Option<String>,
    pub dest_host: String,
    pub dest_domain: String,
    pub url_full: Option<String>,
    pub url_path: Option<String>,
    pub url_query: Option<String>,
    pub http_method: Option<String>,
    pub status_code: Option<u16>,
    pub action: Action,
    pub app_name: Option<String>,
    pub app_category: Option<String>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub content_type: Option<String>,
    pub user_agent: Option<String>,
    pub ingest_lineage_hash: String,
    /// Pipe-joined candidate flags populated by the A/B/C Detector (C5).
    #[serde(default)]
    pub candidate_flags: BTreeSet<CandidateFlag>,
    /// The url_signature this event was assigned during normalization (C4).
    #[serde(default)]
    pub url_signature: Option<String>,
}

impl CanonicalEvent {
    #[must_use]
    pub fn compute_lineage_hash(file_path: &str, row_index: u64, sorted_fields: &[(String, String)]) -> String {
        let mut parts = vec![file_path.to_string(), row_index.to_string()];
        for (k, v) in sorted_fields {
            parts.push(format!("{k}={v}"));
        }
        crate::hashing::sha256_joined(parts)
    }

    /// Deterministic ordering key used before A/B/C aggregation
    /// (`spec.md` §4.5 "Deterministic ordering").
    #[must_use]
    pub fn ordering_key(&self) -> (DateTime<Utc>, &str, &str, &str, &str) {
        (
            self.event_time,
            self.user_id.as_str(),
            self.dest_domain.as_str(),
            self.url_signature.as_deref().unwrap_or(""),
            self.ingest_lineage_hash.as_str(),
        )
    }
}

/// Per-event candidate/flag markers (`spec.md` §4.5 "Per-event flags").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateFlag {
    A,
    B,
    C,
    Burst,
    Cumulative,
    Sampled,
}

impl std::fmt::Display for CandidateFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CandidateFlag::A => "A",
            CandidateFlag::B => "B",
            CandidateFlag::C => "C",
            CandidateFlag::Burst => "burst",
            CandidateFlag::Cumulative => "cumulative",
            CandidateFlag::Sampled => "sampled",
        };
        write!(f, "{s}")
    }
}

/// Render a flag set as the pipe-joined string the data model specifies.
#[must_use]
pub fn flags_to_string(flags: &BTreeSet<CandidateFlag>) -> String {
    flags
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

/// Coarse log-scale byte band (`spec.md` §4.4 "`bytes_bucket`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BytesBucket {
    S,
    M,
    L,
    Xl,
}

impl std::fmt::Display for BytesBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BytesBucket::S => "S",
            BytesBucket::M => "M",
            BytesBucket::L => "L",
            BytesBucket::Xl => "XL",
        };
        write!(f, "{s}")
    }
}

impl BytesBucket {
    /// Bucket boundaries: 1 KiB, 64 KiB, 1 MiB, 16 MiB (`spec.md` §4.4).
    #[must_use]
    pub fn from_bytes(bytes: u64) -> Self {
        const KIB: u64 = 1024;
        const MIB: u64 = 1024 * 1024;
        if bytes < KIB {
            BytesBucket::S
        } else if bytes < 64 * KIB {
            BytesBucket::M
        } else if bytes < MIB {
            BytesBucket::L
        } else if bytes < 16 * MIB {
            BytesBucket::Xl
        } else {
            BytesBucket::Xl
        }
    }
}

/// HTTP method bucket (`spec.md` §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodBucket {
    Read,
    Write,
    Other,
}

impl std::fmt::Display for MethodBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MethodBucket::Read => "read",
            MethodBucket::Write => "write",
            MethodBucket::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl MethodBucket {
    #[must_use]
    pub fn from_method(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" => MethodBucket::Read,
            "POST" | "PUT" | "PATCH" | "DELETE" => MethodBucket::Write,
            _ => MethodBucket::Other,
        }
    }
}

/// Per-run, per-signature aggregate statistics (`spec.md` §3 "SignatureStats").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureStats {
    pub run_id: String,
    pub url_signature: String,
    pub norm_host: String,
    pub norm_path_template: String,
    pub bytes_sent_bucket: BytesBucket,
    pub access_count: u64,
    pub unique_users: u64,
    pub bytes_sent_sum: u64,
    pub bytes_sent_max: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub candidate_flags: BTreeSet<CandidateFlag>,
}

/// Source of a classification cache row (`spec.md` §3 "ClassificationCache").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClassificationSource {
    Rule,
    Llm,
    Stub,
    Human,
}

/// Lifecycle status of a classification cache row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Active,
    NeedsReview,
    FailedPermanent,
}

/// The 8 taxonomy dimension keys (`spec.md` §3 "TaxonomyAssignment").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    Fs,
    Im,
    Uc,
    Dt,
    Ch,
    Rs,
    Ev,
    Ob,
}

impl Dimension {
    #[must_use]
    pub const fn as_prefix(self) -> &'static str {
        match self {
            Dimension::Fs => "FS",
            Dimension::Im => "IM",
            Dimension::Uc => "UC",
            Dimension::Dt => "DT",
            Dimension::Ch => "CH",
            Dimension::Rs => "RS",
            Dimension::Ev => "EV",
            Dimension::Ob => "OB",
        }
    }

    #[must_use]
    pub const fn all() -> [Dimension; 8] {
        [
            Dimension::Fs,
            Dimension::Im,
            Dimension::Uc,
            Dimension::Dt,
            Dimension::Ch,
            Dimension::Rs,
            Dimension::Ev,
            Dimension::Ob,
        ]
    }

    /// Minimum number of codes required for an `active` row (`spec.md` §3).
    #[must_use]
    pub const fn min_codes(self) -> usize {
        match self {
            Dimension::Fs | Dimension::Im => 1,
            Dimension::Uc | Dimension::Dt | Dimension::Ch | Dimension::Rs | Dimension::Ev => 1,
            Dimension::Ob => 0,
        }
    }

    /// Whether this dimension carries at most one code (`FS`/`IM`) or a set
    /// (everything else).
    #[must_use]
    pub const fn is_single_valued(self) -> bool {
        matches!(self, Dimension::Fs | Dimension::Im)
    }
}

/// Error raised by [`TaxonomyAssignment::validate`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("dimension {dimension:?} requires at least {min} code(s), found {found}")]
    TooFewCodes {
        dimension: Dimension,
        min: usize,
        found: usize,
    },
    #[error("dimension {dimension:?} allows at most one code, found {found}")]
    TooManyCodes { dimension: Dimension, found: usize },
    #[error("code '{code}' does not match pattern ^[A-Z]{{2}}-\\d{{3}}$")]
    MalformedCode { code: String },
    #[error("code '{code}' has prefix '{prefix}' but was placed under dimension {dimension:?}")]
    PrefixMismatch {
        code: String,
        prefix: String,
        dimension: Dimension,
    },
}

/// The 8-dimension taxonomy code set assigned to one signature
/// (`spec.md` §3 "TaxonomyAssignment").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomyAssignment {
    pub fs: BTreeSet<String>,
    pub im: BTreeSet<String>,
    pub uc: BTreeSet<String>,
    pub dt: BTreeSet<String>,
    pub ch: BTreeSet<String>,
    pub rs: BTreeSet<String>,
    pub ev: BTreeSet<String>,
    pub ob: BTreeSet<String>,
}

impl TaxonomyAssignment {
    #[must_use]
    pub fn codes(&self, dim: Dimension) -> &BTreeSet<String> {
        match dim {
            Dimension::Fs => &self.fs,
            Dimension::Im => &self.im,
            Dimension::Uc => &self.uc,
            Dimension::Dt => &self.dt,
            Dimension::Ch => &self.ch,
            Dimension::Rs => &self.rs,
            Dimension::Ev => &self.ev,
            Dimension::Ob => &self.ob,
        }
    }

    fn codes_mut(&mut self, dim: Dimension) -> &mut BTreeSet<String> {
        match dim {
            Dimension::Fs => &mut self.fs,
            Dimension::Im => &mut self.im,
            Dimension::Uc => &mut self.uc,
            Dimension::Dt => &mut self.dt,
            Dimension::Ch => &mut self.ch,
            Dimension::Rs => &mut self.rs,
            Dimension::Ev => &mut self.ev,
            Dimension::Ob => &mut self.ob,
        }
    }

    pub fn insert(&mut self, dim: Dimension, code: impl Into<String>) {
        self.codes_mut(dim).insert(code.into());
    }

    /// Validate cardinality (`spec.md` §3) and code format for every
    /// dimension. Used by the Rule Classifier, LLM Classifier response
    /// validation, and the Validator (C10).
    pub fn validate(&self) -> Result<(), Vec<TaxonomyError>> {
        let mut errors = Vec::new();

        for dim in Dimension::all() {
            let codes = self.codes(dim);

            for code in codes {
                if !is_well_formed_code(code) {
                    errors.push(TaxonomyError::MalformedCode { code: code.clone() });
                    continue;
                }
                let prefix = &code[..2];
                if prefix != dim.as_prefix() {
                    errors.push(TaxonomyError::PrefixMismatch {
                        code: code.clone(),
                        prefix: prefix.to_string(),
                        dimension: dim,
                    });
                }
            }

            if dim.is_single_valued() && codes.len() > 1 {
                errors.push(TaxonomyError::TooManyCodes {
                    dimension: dim,
                    found: codes.len(),
                });
            }

            if codes.len() < dim.min_codes() {
                errors.push(TaxonomyError::TooFewCodes {
                    dimension: dim,
                    min: dim.min_codes(),
                    found: codes.len(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_well_formed_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 6
        && bytes[0].is_ascii_uppercase()
        && bytes[1].is_ascii_uppercase()
        && bytes[2] == b'-'
        && bytes[3..6].iter().all(u8::is_ascii_digit)
}

/// A cached classification result, keyed by `url_signature` only
/// (`spec.md` §3 "ClassificationCache").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationCacheRow {
    pub url_signature: String,
    pub service_name: Option<String>,
    pub category: Option<String>,
    pub usage_type: Option<String>,
    pub risk_level: Option<String>,
    pub confidence: f32,
    pub rationale_short: Option<String>,
    pub classification_source: ClassificationSource,
    pub taxonomy: TaxonomyAssignment,
    pub signature_version: String,
    pub rule_version: String,
    pub prompt_version: String,
    pub taxonomy_schema_version: String,
    pub model: Option<String>,
    pub status: CacheStatus,
    pub is_human_verified: bool,
    pub failure_count: u32,
    pub error_type: Option<String>,
    pub error_reason: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub analysis_date: DateTime<Utc>,
}

impl ClassificationCacheRow {
    /// Columns an automated write may never touch once
    /// `is_human_verified = true` (`spec.md` §3 invariant (a)).
    #[must_use]
    pub const fn human_protected_columns() -> &'static [&'static str] {
        &[
            "service_name",
            "category",
            "usage_type",
            "risk_level",
            "rationale_short",
            "classification_source",
            "taxonomy",
            "confidence",
            "status",
            "is_human_verified",
        ]
    }
}

/// Resolved Standard artifact identity (`spec.md` §3 "StandardArtifacts").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardArtifacts {
    pub standard_version: String,
    pub standard_commit: String,
    pub artifacts_dir_sha256: String,
    pub artifacts_zip_sha256: Option<String>,
}

/// Append-only performance sample (`spec.md` §3 "PerformanceMetric").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub run_id: String,
    pub stage: String,
    pub metric_name: String,
    pub value: f64,
    pub unit: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only API cost sample (`spec.md` §3 "ApiCost").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCost {
    pub run_id: String,
    pub provider: String,
    pub model: String,
    pub request_count: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd_estimated: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_is_first_16_hex_chars_of_run_key() {
        let versions = RunVersions {
            target_range: "2024-01".into(),
            signature_version: "v1".into(),
            rule_version: "v1".into(),
            prompt_version: "v1".into(),
            taxonomy_version: "v1".into(),
            evidence_pack_version: "v1".into(),
            engine_spec_version: "v1".into(),
        };
        let key = Run::compute_run_key("deadbeef", &versions);
        let id = Run::run_id_from_key(&key);
        assert_eq!(id.len(), 16);
        assert!(key.starts_with(&id));
    }

    #[test]
    fn identical_inputs_yield_identical_run_key() {
        let versions = RunVersions {
            target_range: "2024-01".into(),
            signature_version: "v1".into(),
            rule_version: "v1".into(),
            prompt_version: "v1".into(),
            taxonomy_version: "v1".into(),
            evidence_pack_version: "v1".into(),
            engine_spec_version: "v1".into(),
        };
        let k1 = Run::compute_run_key("abc123", &versions);
        let k2 = Run::compute_run_key("abc123", &versions);
        assert_eq!(k1, k2);
    }

    #[test]
    fn bytes_bucket_boundaries() {
        assert_eq!(BytesBucket::from_bytes(0), BytesBucket::S);
        assert_eq!(BytesBucket::from_bytes(1023), BytesBucket::S);
        assert_eq!(BytesBucket::from_bytes(1024), BytesBucket::M);
        assert_eq!(BytesBucket::from_bytes(65536), BytesBucket::L);
        assert_eq!(BytesBucket::from_bytes(1024 * 1024), BytesBucket::Xl);
    }

    #[test]
    fn method_bucket_mapping() {
        assert_eq!(MethodBucket::from_method("GET"), MethodBucket::Read);
        assert_eq!(MethodBucket::from_method("head"), MethodBucket::Read);
        assert_eq!(MethodBucket::from_method("POST"), MethodBucket::Write);
        assert_eq!(MethodBucket::from_method("DELETE"), MethodBucket::Write);
        assert_eq!(MethodBucket::from_method("OPTIONS"), MethodBucket::Other);
    }

    #[test]
    fn taxonomy_validate_rejects_missing_required_dimension() {
        let mut t = TaxonomyAssignment::default();
        t.insert(Dimension::Fs, "FS-001");
        t.insert(Dimension::Im, "IM-001");
        // UC/DT/CH/RS/EV all missing.
        let errors = t.validate().unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            TaxonomyError::TooFewCodes {
                dimension: Dimension::Uc,
                ..
            }
        )));
    }

    #[test]
    fn taxonomy_validate_rejects_multi_value_fs() {
        let mut t = full_valid_taxonomy();
        t.insert(Dimension::Fs, "FS-002");
        let errors = t.validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, TaxonomyError::TooManyCodes { dimension: Dimension::Fs, .. })));
    }

    #[test]
    fn taxonomy_validate_rejects_prefix_mismatch() {
        let mut t = full_valid_taxonomy();
        t.ob.insert("FS-999".to_string());
        let errors = t.validate().unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, TaxonomyError::PrefixMismatch { .. })));
    }

    #[test]
    fn taxonomy_validate_accepts_complete_assignment() {
        let t = full_valid_taxonomy();
        assert!(t.validate().is_ok());
    }

    #[test]
    fn ob_dimension_may_be_empty() {
        let t = full_valid_taxonomy();
        assert!(t.ob.is_empty());
        assert!(t.validate().is_ok());
    }

    fn full_valid_taxonomy() -> TaxonomyAssignment {
        let mut t = TaxonomyAssignment::default();
        t.insert(Dimension::Fs, "FS-001");
        t.insert(Dimension::Im, "IM-001");
        t.insert(Dimension::Uc, "UC-001");
        t.insert(Dimension::Dt, "DT-001");
        t.insert(Dimension::Ch, "CH-001");
        t.insert(Dimension::Rs, "RS-001");
        t.insert(Dimension::Ev, "EV-001");
        t
    }
}
