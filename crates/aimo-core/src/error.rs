//! Top-level error type aggregating the error-taxonomy table in `spec.md` §7.
//!
//! Component crates define their own focused error enums (e.g.
//! `aimo_llm::LlmError`, `aimo_standard::PinningError`) and this crate's
//! `AimoError` aggregates them with `#[from]` so the Orchestrator and CLI can
//! handle one error type end to end, mirroring the teacher's
//! `XCheckerError` aggregation pattern.

use crate::exit_codes::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AimoError {
    #[error("vendor mapping missing for vendor '{vendor}'")]
    MappingMissing { vendor: String },

    #[error("standard pinning mismatch: expected {expected}, resolved {resolved}")]
    PinningMismatch { expected: String, resolved: String },

    #[error("guarded skip misuse: AIMO_ALLOW_SKIP_PINNING not set or invalid")]
    GuardedSkipMisuse,

    #[error("persistence writer queue overflow or flush timeout in table '{table}'")]
    WriterOverflow { table: String },

    #[error("classification cache upsert for '{table}' has no updatable columns")]
    NoUpdatableColumns { table: String },

    #[error("rule schema invalid: {reason}")]
    RuleSchemaInvalid { reason: String },

    #[error("LLM classifier disabled by AIMO_DISABLE_LLM")]
    LlmDisabled,

    #[error("bundle validation failed with {error_count} error(s)")]
    BundleValidationFailed { error_count: usize },

    #[error("run collision: existing run_key does not match computed run_key for run_id {run_id}")]
    RunCollision { run_id: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("other: {0}")]
    Other(#[from] anyhow::Error),
}

impl AimoError {
    /// Map this error to the CLI's documented exit code (`spec.md` §6).
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            AimoError::PinningMismatch { .. } => ExitCode::PINNING_MISMATCH,
            AimoError::GuardedSkipMisuse => ExitCode::GUARDED_SKIP_MISUSE,
            _ => ExitCode::GENERIC_FAILURE,
        }
    }

    /// A compact, user-facing message suitable for the KPI block (`spec.md` §7).
    #[must_use]
    pub fn user_message(&self) -> String {
        format!("{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinning_mismatch_maps_to_exit_2() {
        let err = AimoError::PinningMismatch {
            expected: "abc".into(),
            resolved: "def".into(),
        };
        assert_eq!(err.to_exit_code(), ExitCode::PINNING_MISMATCH);
    }

    #[test]
    fn guarded_skip_misuse_maps_to_exit_3() {
        let err = AimoError::GuardedSkipMisuse;
        assert_eq!(err.to_exit_code(), ExitCode::GUARDED_SKIP_MISUSE);
    }

    #[test]
    fn generic_error_maps_to_exit_1() {
        let err = AimoError::LlmDisabled;
        assert_eq!(err.to_exit_code(), ExitCode::GENERIC_FAILURE);
    }
}
