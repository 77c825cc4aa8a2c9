//! Anthropic Provider - Implementation of ProviderAdapter for Anthropic's
//! Messages API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = AnthropicConfig::new(api_key)
//!     .with_model("claude-sonnet-4-20250514")
//!     .with_base_url("https://api.anthropic.com");
//!
//! let provider = AnthropicProvider::new(config);
//! ```
//!
//! The Messages API has no JSON output switch, so the schema requirements in
//! the system prompt carry the whole contract. Anthropic reports overload as
//! HTTP 529, which is classified as retryable.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::decision::DecisionRequest;
use crate::ports::{
    FinishReason, ProviderAdapter, ProviderError, ProviderMetadata, ProviderResponse, TokenUsage,
};

use super::http_errors::{classify_status, classify_transport};

/// Registry name of this adapter.
pub const ANTHROPIC_PROVIDER: &str = "anthropic";

/// Anthropic API version header value.
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic provider.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key for authentication; the adapter is unavailable without one.
    api_key: Option<Secret<String>>,
    /// Model to use (e.g., "claude-sonnet-4-20250514").
    pub model: String,
    /// Base URL for the API (default: https://api.anthropic.com).
    pub base_url: String,
    /// HTTP client timeout.
    pub timeout: Duration,
    /// Completion token limit (required by the API).
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            timeout: Duration::from_secs(60),
            max_tokens: 2048,
            temperature: 0.2,
        }
    }
}

impl AnthropicConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::default().with_api_key(api_key)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = (!key.trim().is_empty()).then(|| Secret::new(key));
        self
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Anthropic API provider implementation.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider with the given configuration.
    pub fn new(config: AnthropicConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    /// Builds the messages endpoint URL.
    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    fn to_anthropic_request(&self, system_prompt: &str, user_prompt: &str) -> AnthropicRequest {
        AnthropicRequest {
            model: self.config.model.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user_prompt.to_string(),
            }],
            system: (!system_prompt.is_empty()).then(|| system_prompt.to_string()),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
        }
    }

    async fn send(&self, body: &AnthropicRequest) -> Result<ProviderResponse, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::no_api_key(ANTHROPIC_PROVIDER))?;

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let timeout_ms = u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX);
                classify_transport(ANTHROPIC_PROVIDER, &e, timeout_ms)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_status(ANTHROPIC_PROVIDER, status.as_u16(), &error_body));
        }

        let parsed: AnthropicResponse = response.json().await.map_err(|e| {
            ProviderError::parse(ANTHROPIC_PROVIDER, format!("failed to parse response: {}", e))
        })?;

        into_provider_response(parsed)
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    fn is_available(&self) -> bool {
        self.config.has_api_key()
    }

    async fn make_decision_request(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        request: &DecisionRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        if request.is_cancelled() {
            return Err(ProviderError::aborted(ANTHROPIC_PROVIDER));
        }

        let body = self.to_anthropic_request(system_prompt, user_prompt);
        tokio::select! {
            _ = request.cancellation().cancelled() => Err(ProviderError::aborted(ANTHROPIC_PROVIDER)),
            result = self.send(&body) => result,
        }
    }

    async fn health_check(&self) -> bool {
        if !self.is_available() {
            return false;
        }

        let mut body = self.to_anthropic_request("", "Reply with OK.");
        body.max_tokens = 5;
        match self.send(&body).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Anthropic health check failed: {}", e);
                false
            }
        }
    }

    fn metadata(&self) -> ProviderMetadata {
        let (input, output) = price_per_token(&self.config.model);
        ProviderMetadata::new(ANTHROPIC_PROVIDER)
            .with_models([self.config.model.clone()])
            .with_capabilities(["long_context", "messages_api"])
            .with_limitations(["no native JSON mode", "no streaming"])
            .with_cost_per_token(input, output)
    }
}

fn into_provider_response(response: AnthropicResponse) -> Result<ProviderResponse, ProviderError> {
    let content = response
        .content
        .into_iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");

    if content.is_empty() {
        return Err(ProviderError::parse(ANTHROPIC_PROVIDER, "no text content in response"));
    }

    let mut result = ProviderResponse::new(content)
        .with_model(response.model)
        .with_usage(TokenUsage::new(
            response.usage.input_tokens,
            response.usage.output_tokens,
        ));
    if let Some(reason) = response.stop_reason.as_deref() {
        result = result.with_finish_reason(FinishReason::from_wire(reason));
    }
    Ok(result)
}

/// US dollars per token as (input, output).
fn price_per_token(model: &str) -> (f64, f64) {
    let (input, output) = match model {
        m if m.contains("opus") => (15.0, 75.0),
        m if m.contains("haiku") => (0.80, 4.0),
        _ => (3.0, 15.0),
    };
    (input / 1_000_000.0, output / 1_000_000.0)
}

// ----- Anthropic API Types -----

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
