//! Request/response shapes for the LLM Classifier (`spec.md` §4.7 "Request
//! contract"). Only PII-safe signature aggregates ever leave the process.

use aimo_core::model::TaxonomyAssignment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// One signature's PII-safe request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRequestItem {
    pub url_signature: String,
    pub norm_host: String,
    pub norm_path_template: String,
    pub access_count: u64,
    pub bytes_sent_sum: u64,
}

/// One element of the model's response array, before cardinality
/// re-validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationResponseItem {
    pub service_name: String,
    pub category: String,
    pub usage_type: String,
    pub risk_level: String,
    pub taxonomy: TaxonomyAssignment,
}

/// Token usage reported by the provider for one batch call, used by the
/// budget controller and `ApiCost` recording.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct BatchResponse {
    pub items: Vec<ClassificationResponseItem>,
    pub usage: TokenUsage,
    pub model: String,
}

/// A provider backend capable of classifying a batch of signatures.
/// Implementations must not retry internally — retry policy lives in
/// [`crate::classifier`], which needs to observe each raw error.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn classify_batch(&self, items: &[SignatureRequestItem]) -> Result<BatchResponse, LlmError>;

    fn provider_name(&self) -> &'static str;
}
