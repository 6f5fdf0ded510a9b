//! Anthropic Messages API backend (`spec.md` §4.7).

use crate::error::LlmError;
use crate::http_client::HttpClient;
use crate::types::{BatchResponse, ClassificationResponseItem, LlmBackend, SignatureRequestItem, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
}

pub struct AnthropicBackend {
    client: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    request_timeout: Duration,
}

impl AnthropicBackend {
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: config.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: config.api_key,
            model: config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            request_timeout: config.request_timeout,
        })
    }

    fn build_prompt(items: &[SignatureRequestItem]) -> String {
        let payload = serde_json::to_string_pretty(items).unwrap_or_default();
        format!(
            "Classify each of the following network request signatures into the AIMO 8-dimension \
             taxonomy. Respond with a JSON array with one element per input signature, in the same \
             order, each conforming to the required schema (service_name, category, usage_type, \
             risk_level, taxonomy).\n\nSignatures:\n{payload}"
        )
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn classify_batch(&self, items: &[SignatureRequestItem]) -> Result<BatchResponse, LlmError> {
        let prompt = Self::build_prompt(items);
        let request_body = AnthropicRequest {
            model: self.model.clone(),
            messages: vec![AnthropicMessage { role: "user".to_string(), content: prompt }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let request = reqwest::Client::new()
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body);

        let response = self.client.execute_once(request, self.request_timeout, "anthropic").await?;

        let response_body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::JsonSchemaError(format!("failed to parse Anthropic envelope: {e}")))?;

        let content = response_body
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        let items: Vec<ClassificationResponseItem> =
            serde_json::from_str(content.trim()).map_err(|e| LlmError::JsonSchemaError(format!("response was not a valid classification array: {e}")))?;

        let usage = response_body
            .usage
            .map(|u| TokenUsage { input_tokens: u.input_tokens, output_tokens: u.output_tokens })
            .unwrap_or_default();

        Ok(BatchResponse { items, usage, model: self.model.clone() })
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
