//! OpenAI Provider - Implementation of ProviderAdapter for OpenAI's API.
//!
//! Sends one chat completion per decision attempt with JSON output mode
//! enabled. Retries, backoff and failover belong to the engine, so this
//! adapter makes exactly one HTTP call per invocation.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new(api_key)
//!     .with_model("gpt-4o")
//!     .with_base_url("https://api.openai.com/v1");
//!
//! let provider = OpenAIProvider::new(config);
//! ```

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
pub const OPENAI_PROVIDER: &str = "openai";

/// Configuration for the OpenAI provider.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication; the adapter is unavailable without one.
    api_key: Option<Secret<String>>,
    /// Model to use (e.g., "gpt-4o", "gpt-4o-mini").
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// HTTP client timeout; the engine applies its own per-call bound too.
    pub timeout: Duration,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token limit.
    pub max_tokens: u32,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

impl OpenAIConfig {
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

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
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

/// OpenAI API provider implementation.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Creates a new OpenAI provider with the given configuration.
    pub fn new(config: OpenAIConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    /// Builds the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Converts a prompt pair to OpenAI's format.
    fn to_openai_request(&self, system_prompt: &str, user_prompt: &str, json: bool) -> OpenAIRequest {
        OpenAIRequest {
            model: self.config.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
            response_format: json.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }

    /// Sends one completion request and parses the reply.
    async fn send(&self, body: &OpenAIRequest) -> Result<ProviderResponse, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::no_api_key(OPENAI_PROVIDER))?;

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| classify_transport(OPENAI_PROVIDER, &e, timeout_ms(self.config.timeout)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_status(OPENAI_PROVIDER, status.as_u16(), &error_body));
        }

        let parsed: OpenAIResponse = response.json().await.map_err(|e| {
            ProviderError::parse(OPENAI_PROVIDER, format!("failed to parse response: {}", e))
        })?;

        into_provider_response(parsed)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAIProvider {
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
            return Err(ProviderError::aborted(OPENAI_PROVIDER));
        }

        let body = self.to_openai_request(system_prompt, user_prompt, true);
        tokio::select! {
            _ = request.cancellation().cancelled() => Err(ProviderError::aborted(OPENAI_PROVIDER)),
            result = self.send(&body) => result,
        }
    }

    async fn health_check(&self) -> bool {
        if !self.is_available() {
            return false;
        }

        let mut body = self.to_openai_request("You are a health probe.", "Reply with OK.", false);
        body.max_tokens = Some(5);
        match self.send(&body).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                false
            }
        }
    }

    fn metadata(&self) -> ProviderMetadata {
        let (input, output) = price_per_token(&self.config.model);
        ProviderMetadata::new(OPENAI_PROVIDER)
            .with_models([self.config.model.clone()])
            .with_capabilities(["json_mode", "chat_completions"])
            .with_limitations(["no streaming", "single completion per call"])
            .with_cost_per_token(input, output)
    }
}

fn into_provider_response(response: OpenAIResponse) -> Result<ProviderResponse, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::parse(OPENAI_PROVIDER, "no choices in response"))?;

    let content = choice
        .message
        .content
        .ok_or_else(|| ProviderError::parse(OPENAI_PROVIDER, "empty message content"))?;

    let mut result = ProviderResponse::new(content).with_model(response.model);
    if let Some(reason) = choice.finish_reason.as_deref() {
        result = result.with_finish_reason(FinishReason::from_wire(reason));
    }
    if let Some(usage) = response.usage {
        result = result.with_usage(TokenUsage::new(usage.prompt_tokens, usage.completion_tokens));
    }
    Ok(result)
}

/// US dollars per token as (input, output).
fn price_per_token(model: &str) -> (f64, f64) {
    let (input, output) = match model {
        m if m.starts_with("gpt-4o-mini") => (0.15, 0.60),
        m if m.starts_with("gpt-4o") => (2.50, 10.0),
        m if m.starts_with("gpt-4-turbo") => (10.0, 30.0),
        m if m.starts_with("gpt-4") => (30.0, 60.0),
        m if m.starts_with("gpt-3.5") => (0.50, 1.50),
        _ => (2.50, 10.0),
    };
    (input / 1_000_000.0, output / 1_000_000.0)
}

fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

// ----- OpenAI API Types -----

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::CancelHandle;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn config_builder_works() {
        let config = OpenAIConfig::new("test-key")
            .with_model("gpt-4o-mini")
            .with_base_url("https://custom.api.com/")
            .with_timeout(Duration::from_secs(30))
            .with_temperature(0.0)
            .with_max_tokens(512);

        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_tokens, 512);
        assert!(config.has_api_key());

        let provider = OpenAIProvider::new(config);
        assert_eq!(provider.completions_url(), "https://custom.api.com/chat/completions");
    }

    #[test]
    fn blank_key_is_treated_as_missing() {
        assert!(!OpenAIConfig::new("   ").has_api_key());
        assert!(!OpenAIProvider::new(OpenAIConfig::default()).is_available());
    }

    #[test]
    fn request_enables_json_mode() {
        let provider = OpenAIProvider::new(OpenAIConfig::new("k"));
        let body = provider.to_openai_request("system", "user", true);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "user");
    }

    #[test]
    fn response_is_translated() {
        let body = r#"{
            "model": "gpt-4o-2024-08-06",
            "choices": [{"message": {"role": "assistant", "content": "{\"urgency\":\"urgent\"}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 40}
        }"#;
        let parsed: OpenAIResponse = serde_json::from_str(body).unwrap();

        let response = into_provider_response(parsed).unwrap();

        assert_eq!(response.content, r#"{"urgency":"urgent"}"#);
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.unwrap().total_tokens, 160);
        assert_eq!(response.model.as_deref(), Some("gpt-4o-2024-08-06"));
    }

    #[test]
    fn empty_choices_is_a_parse_error() {
        let parsed: OpenAIResponse =
            serde_json::from_str(r#"{"model": "gpt-4o", "choices": []}"#).unwrap();
        let err = into_provider_response(parsed).unwrap_err();
        assert_eq!(err.code, ErrorCode::ParseError);
        assert!(err.retryable);
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let provider = OpenAIProvider::new(OpenAIConfig::default());
        let request = DecisionRequest::new("medical", "triage", "x");

        let err = provider
            .make_decision_request("s", "u", &request)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::NoApiKey);
        assert!(!err.retryable);
        assert!(!provider.health_check().await);
    }

    #[tokio::test]
    async fn cancelled_request_is_aborted() {
        let provider = OpenAIProvider::new(OpenAIConfig::new("k"));
        let cancel = CancelHandle::new();
        cancel.cancel();
        let request = DecisionRequest::new("medical", "triage", "x").with_cancellation(cancel);

        let err = provider
            .make_decision_request("s", "u", &request)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::RequestAborted);
    }

    #[test]
    fn metadata_includes_pricing() {
        let metadata = OpenAIProvider::new(OpenAIConfig::new("k").with_model("gpt-4o-mini")).metadata();
        assert_eq!(metadata.name, "openai");
        assert_eq!(metadata.models, vec!["gpt-4o-mini".to_string()]);
        let cost = metadata.cost_per_token.unwrap();
        assert!(cost.output > cost.input);
    }
}
