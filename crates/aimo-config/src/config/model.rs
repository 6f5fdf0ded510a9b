//! Layered configuration's value model (`SPEC_FULL.md` §1.1 "Configuration").

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// The versions that jointly determine `run_key` (`spec.md` §3).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Versions {
    #[serde(default = "default_target_range")]
    pub target_range: String,
    #[serde(default = "default_signature_version")]
    pub signature_version: String,
    #[serde(default = "default_rule_version")]
    pub rule_version: String,
    #[serde(default = "default_prompt_version")]
    pub prompt_version: String,
    #[serde(default = "default_taxonomy_version")]
    pub taxonomy_version: String,
    #[serde(default = "default_evidence_pack_version")]
    pub evidence_pack_version: String,
    #[serde(default = "default_engine_spec_version")]
    pub engine_spec_version: String,
}

fn default_target_range() -> String {
    "all".to_string()
}
fn default_signature_version() -> String {
    "v1".to_string()
}
fn default_rule_version() -> String {
    "v1".to_string()
}
fn default_prompt_version() -> String {
    "v1".to_string()
}
fn default_taxonomy_version() -> String {
    "v1".to_string()
}
fn default_evidence_pack_version() -> String {
    "v1".to_string()
}
fn default_engine_spec_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for Versions {
    fn default() -> Self {
        Versions {
            target_range: default_target_range(),
            signature_version: default_signature_version(),
            rule_version: default_rule_version(),
            prompt_version: default_prompt_version(),
            taxonomy_version: default_taxonomy_version(),
            evidence_pack_version: default_evidence_pack_version(),
            engine_spec_version: default_engine_spec_version(),
        }
    }
}

/// Detector thresholds, overridable from `[thresholds]` (`spec.md` §4.5).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThresholdsConfig {
    #[serde(default = "default_a_min_bytes")]
    pub a_min_bytes: u64,
    #[serde(default = "default_burst_threshold")]
    pub burst_threshold: u32,
    #[serde(default = "default_cumulative_threshold_bytes")]
    pub cumulative_threshold_bytes: u64,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

fn default_a_min_bytes() -> u64 {
    1_048_576
}
fn default_burst_threshold() -> u32 {
    20
}
fn default_cumulative_threshold_bytes() -> u64 {
    20 * 1024 * 1024
}
fn default_sample_rate() -> f64 {
    0.02
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        ThresholdsConfig {
            a_min_bytes: default_a_min_bytes(),
            burst_threshold: default_burst_threshold(),
            cumulative_threshold_bytes: default_cumulative_threshold_bytes(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// LLM Classifier operational parameters (`spec.md` §4.7).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_daily_budget_usd")]
    pub daily_budget_usd: f64,
    #[serde(default = "default_estimation_buffer")]
    pub estimation_buffer: f64,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_provider() -> String {
    "anthropic".to_string()
}
fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}
fn default_max_retries() -> u32 {
    2
}
fn default_base_backoff_ms() -> u64 {
    1000
}
fn default_timeout_seconds() -> u64 {
    30
}
fn default_daily_budget_usd() -> f64 {
    5.0
}
fn default_estimation_buffer() -> f64 {
    1.15
}
fn default_max_batch_size() -> usize {
    20
}
fn default_concurrency() -> usize {
    4
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            provider: default_provider(),
            model: default_model(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            timeout_seconds: default_timeout_seconds(),
            daily_budget_usd: default_daily_budget_usd(),
            estimation_buffer: default_estimation_buffer(),
            max_batch_size: default_max_batch_size(),
            concurrency: default_concurrency(),
        }
    }
}

/// Filesystem locations (`spec.md` §6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    pub db_path: Option<Utf8PathBuf>,
    pub output_dir: Option<Utf8PathBuf>,
    #[serde(default = "default_vendors_dir")]
    pub vendors_dir: Utf8PathBuf,
    #[serde(default = "default_rules_dir")]
    pub rules_dir: Utf8PathBuf,
    #[serde(default = "default_standard_submodule_dir")]
    pub standard_submodule_dir: Utf8PathBuf,
    #[serde(default = "default_standard_cache_dir")]
    pub standard_cache_dir: Utf8PathBuf,
}

fn default_vendors_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("vendors")
}
fn default_rules_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("rules")
}
fn default_standard_submodule_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("third_party/aimo-standard")
}
fn default_standard_cache_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("~/.cache/aimo/standard")
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            db_path: None,
            output_dir: None,
            vendors_dir: default_vendors_dir(),
            rules_dir: default_rules_dir(),
            standard_submodule_dir: default_standard_submodule_dir(),
            standard_cache_dir: default_standard_cache_dir(),
        }
    }
}

/// Persistence Gateway tuning (`spec.md` §4.1).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    4096
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Which component last supplied a given config value, for diagnostics
/// (mirrors the teacher's `ConfigSource` attribution).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    ConfigFile(Utf8PathBuf),
    Env,
    Cli,
}
