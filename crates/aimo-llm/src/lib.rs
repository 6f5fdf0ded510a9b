//! LLM Classifier (`spec.md` §4.7): obtains a Standard-conformant
//! classification for signatures the Rule Classifier didn't resolve,
//! subject to a daily budget and a documented retry policy.

pub mod anthropic_backend;
pub mod budget;
pub mod classifier;
pub mod error;
pub mod http_client;
pub mod persist;
pub mod stub;
pub mod types;

pub use anthropic_backend::{AnthropicBackend, AnthropicConfig};
pub use budget::{BudgetController, BudgetDecision, CandidatePriority, PriceTable};
pub use classifier::{classify_with_retry, RetryConfig, SignatureOutcome};
pub use error::LlmError;
pub use persist::{apply_budget_skip, apply_outcome, should_skip, VersionStamp};
pub use stub::StubBackend;
pub use types::{BatchResponse, ClassificationResponseItem, LlmBackend, SignatureRequestItem, TokenUsage};

/// `AIMO_DISABLE_LLM=1` must short-circuit with a dedicated error rather
/// than silently proceeding (`spec.md` §6, §7).
pub fn check_llm_disabled() -> Result<(), LlmError> {
    match std::env::var("AIMO_DISABLE_LLM") {
        Ok(v) if v == "1" => Err(LlmError::Disabled),
        _ => Ok(()),
    }
}

/// `AIMO_CLASSIFIER=stub` selects the deterministic stub backend
/// (`spec.md` §6).
#[must_use]
pub fn stub_classifier_requested() -> bool {
    std::env::var("AIMO_CLASSIFIER").map(|v| v == "stub").unwrap_or(false)
}
