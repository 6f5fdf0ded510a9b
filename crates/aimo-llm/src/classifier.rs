//! Retry loop and cache-state-transition logic (`spec.md` §4.7 "Retry &
//! error taxonomy", "Cache state transitions"). Backends perform exactly one
//! attempt per call; backoff, jitter, retry-after clamping, and batch
//! halving all live here so they can be shared across backends.

use crate::error::{LlmError, RetryClass};
use crate::types::{BatchResponse, ClassificationResponseItem, LlmBackend, SignatureRequestItem};
use rand::Rng;
use std::pin::Pin;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub base_backoff: Duration,
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { base_backoff: Duration::from_millis(500), max_retries: 3 }
    }
}

/// Per-signature outcome after the retry loop settles — never `active`
/// without a schema-valid response.
#[derive(Debug, Clone)]
pub enum SignatureOutcome {
    Active(ClassificationResponseItem),
    NeedsReview { error_code: String },
    FailedPermanent { error_code: String },
}

type BoxedOutcomeFuture<'a> = Pin<Box<dyn std::future::Future<Output = Vec<(String, SignatureOutcome)>> + Send + 'a>>;

/// Classifies a batch, retrying transient failures with exponential
/// backoff + jitter, honoring any `Retry-After` hint, and halving the batch
/// on a persistent rate limit. Returns one outcome per input signature.
pub fn classify_with_retry<'a>(backend: &'a (dyn LlmBackend + Sync), items: Vec<SignatureRequestItem>, retry: RetryConfig) -> BoxedOutcomeFuture<'a> {
    Box::pin(async move {
        if items.is_empty() {
            return Vec::new();
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match backend.classify_batch(&items).await {
                Ok(response) => return reconcile_response(&items, response),
                Err(e) => {
                    if e.retry_class() == RetryClass::Permanent {
                        tracing::warn!(provider = backend.provider_name(), error_code = e.error_code(), "LLM batch failed permanently");
                        return items.iter().map(|i| (i.url_signature.clone(), SignatureOutcome::FailedPermanent { error_code: e.error_code().to_string() })).collect();
                    }

                    if attempt > retry.max_retries {
                        tracing::warn!(provider = backend.provider_name(), error_code = e.error_code(), attempts = attempt, "LLM batch exhausted retries, marking needs_review");
                        return items.iter().map(|i| (i.url_signature.clone(), SignatureOutcome::NeedsReview { error_code: e.error_code().to_string() })).collect();
                    }

                    let is_rate_limit = matches!(e, LlmError::RateLimitError { .. });
                    if is_rate_limit && items.len() > 1 {
                        let mid = items.len() / 2;
                        let (first_half, second_half) = items.split_at(mid);
                        let (first_half, second_half) = (first_half.to_vec(), second_half.to_vec());
                        let retry_after_wait = e.retry_after();
                        if let Some(delay) = retry_after_wait {
                            tokio::time::sleep(delay).await;
                        }
                        let mut results = classify_with_retry(backend, first_half, retry).await;
                        results.extend(classify_with_retry(backend, second_half, retry).await);
                        return results;
                    }

                    let delay = backoff_delay(retry.base_backoff, attempt, e.retry_after());
                    tracing::debug!(provider = backend.provider_name(), error_code = e.error_code(), attempt, delay_ms = delay.as_millis() as u64, "retrying LLM batch");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    })
}

fn backoff_delay(base: Duration, attempt: u32, retry_after: Option<Duration>) -> Duration {
    let multiplier = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    let exponential = base.checked_mul(multiplier).unwrap_or(Duration::MAX);
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=300));
    let delay = exponential + jitter;
    match retry_after {
        Some(hint) if hint > delay => hint,
        _ => delay,
    }
}

fn reconcile_response(items: &[SignatureRequestItem], response: BatchResponse) -> Vec<(String, SignatureOutcome)> {
    if response.items.len() != items.len() {
        tracing::warn!(expected = items.len(), got = response.items.len(), "LLM response array length mismatch, marking batch needs_review");
        return items.iter().map(|i| (i.url_signature.clone(), SignatureOutcome::NeedsReview { error_code: "json_schema_error".to_string() })).collect();
    }

    items
        .iter()
        .zip(response.items.into_iter())
        .map(|(item, classification)| match classification.taxonomy.validate() {
            Ok(()) => (item.url_signature.clone(), SignatureOutcome::Active(classification)),
            Err(_) => (item.url_signature.clone(), SignatureOutcome::NeedsReview { error_code: "json_schema_error".to_string() }),
        })
        .collect()
}
