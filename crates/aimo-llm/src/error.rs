//! Error taxonomy for the LLM Classifier (`spec.md` §4.7 "Retry & error
//! taxonomy"). Every variant is classified as permanent or transient; the
//! retry loop in [`crate::classifier`] consults [`LlmError::retry_class`]
//! rather than matching on variants directly.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("invalid API key")]
    InvalidApiKey,

    #[error("authentication error: {0}")]
    AuthenticationError(String),

    #[error("invalid request: {0}")]
    InvalidRequestError(String),

    #[error("context length exceeded")]
    ContextLengthExceeded,

    #[error("rate limited{}", retry_after.map(|d| format!(", retry after {}ms", d.as_millis())).unwrap_or_default())]
    RateLimitError { retry_after: Option<Duration> },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("provider server error: {0}")]
    ServerError(String),

    #[error("response failed schema validation: {0}")]
    JsonSchemaError(String),

    #[error("LLM classification disabled via AIMO_DISABLE_LLM")]
    Disabled,

    #[error("backend misconfigured: {0}")]
    Misconfiguration(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Permanent,
    Transient,
}

impl LlmError {
    #[must_use]
    pub fn retry_class(&self) -> RetryClass {
        match self {
            LlmError::InvalidApiKey
            | LlmError::AuthenticationError(_)
            | LlmError::InvalidRequestError(_)
            | LlmError::ContextLengthExceeded => RetryClass::Permanent,
            LlmError::RateLimitError { .. }
            | LlmError::Timeout(_)
            | LlmError::NetworkError(_)
            | LlmError::ServerError(_)
            | LlmError::JsonSchemaError(_) => RetryClass::Transient,
            LlmError::Disabled | LlmError::Misconfiguration(_) => RetryClass::Permanent,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            LlmError::InvalidApiKey => "invalid_api_key",
            LlmError::AuthenticationError(_) => "authentication_error",
            LlmError::InvalidRequestError(_) => "invalid_request_error",
            LlmError::ContextLengthExceeded => "context_length_exceeded",
            LlmError::RateLimitError { .. } => "rate_limit_error",
            LlmError::Timeout(_) => "timeout",
            LlmError::NetworkError(_) => "network_error",
            LlmError::ServerError(_) => "server_error",
            LlmError::JsonSchemaError(_) => "json_schema_error",
            LlmError::Disabled => "llm_disabled",
            LlmError::Misconfiguration(_) => "misconfiguration",
        }
    }

    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimitError { retry_after } => *retry_after,
            _ => None,
        }
    }
}
