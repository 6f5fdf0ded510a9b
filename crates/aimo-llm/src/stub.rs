//! `AIMO_CLASSIFIER=stub` backend (`spec.md` §6 env vars): a deterministic
//! stand-in used by contract tests, returning Standard-conformant codes
//! taken from the taxonomy's first allowed entry per dimension.

use crate::error::LlmError;
use crate::types::{BatchResponse, ClassificationResponseItem, LlmBackend, SignatureRequestItem, TokenUsage};
use aimo_core::model::{Dimension, TaxonomyAssignment};
use aimo_standard::taxonomy::TaxonomyDictionary;
use async_trait::async_trait;
use std::sync::Arc;

pub struct StubBackend {
    taxonomy: Arc<TaxonomyDictionary>,
}

impl StubBackend {
    #[must_use]
    pub fn new(taxonomy: Arc<TaxonomyDictionary>) -> Self {
        Self { taxonomy }
    }

    fn stub_assignment(&self) -> TaxonomyAssignment {
        let mut assignment = TaxonomyAssignment::default();
        for dim in Dimension::all() {
            if let Some(first) = self.taxonomy.allowed_codes(dim).first() {
                assignment.insert(dim, (*first).to_string());
            }
        }
        assignment
    }
}

#[async_trait]
impl LlmBackend for StubBackend {
    async fn classify_batch(&self, items: &[SignatureRequestItem]) -> Result<BatchResponse, LlmError> {
        let assignment = self.stub_assignment();
        let response_items = items
            .iter()
            .map(|_| ClassificationResponseItem {
                service_name: "Unclassified (stub)".to_string(),
                category: "stub".to_string(),
                usage_type: "unknown".to_string(),
                risk_level: "low".to_string(),
                taxonomy: assignment.clone(),
            })
            .collect();

        Ok(BatchResponse { items: response_items, usage: TokenUsage::default(), model: "stub".to_string() })
    }

    fn provider_name(&self) -> &'static str {
        "stub"
    }
}
