//! Provider Adapter Port - Interface for external AI backends.
//!
//! This port abstracts every interaction with an AI provider (OpenAI,
//! Anthropic, etc.) behind one request/response call, so the decision engine
//! can route between providers without knowing their wire formats.
//!
//! # Design
//!
//! - One call per prompt; no streaming
//! - Cancellation is honored before any network contact
//! - Adapters classify their own failures as retryable or not; the engine
//!   trusts that classification
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//!
//! struct EchoProvider;
//!
//! #[async_trait]
//! impl ProviderAdapter for EchoProvider {
//!     fn is_available(&self) -> bool { true }
//!
//!     async fn make_decision_request(
//!         &self,
//!         _system_prompt: &str,
//!         user_prompt: &str,
//!         _request: &DecisionRequest,
//!     ) -> Result<ProviderResponse, ProviderError> {
//!         Ok(ProviderResponse::new(user_prompt))
//!     }
//!     // ... other methods
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::decision::DecisionRequest;
use crate::domain::foundation::ErrorCode;

/// Port for AI provider interactions.
///
/// Implementations connect to one external AI service and translate between
/// its API and `ProviderResponse`.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// True only if the credentials and configuration needed for a call are
    /// present. The engine never calls an unavailable adapter.
    fn is_available(&self) -> bool;

    /// Sends one prompt pair and returns the raw completion.
    ///
    /// If `request` is already cancelled, fails with a non-retryable
    /// `REQUEST_ABORTED` error without contacting the backend.
    async fn make_decision_request(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        request: &DecisionRequest,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Lightweight round-trip probe, independent of decision semantics.
    async fn health_check(&self) -> bool;

    /// Static self-description for capability/cost aware routing.
    fn metadata(&self) -> ProviderMetadata;
}

/// Raw completion returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Generated text, expected to contain the strategy's JSON schema.
    pub content: String,
    /// Token usage, when the backend reports it.
    pub usage: Option<TokenUsage>,
    /// Why the model stopped generating.
    pub finish_reason: Option<FinishReason>,
    /// Model that generated the content.
    pub model: Option<String>,
}

impl ProviderResponse {
    /// Creates a response carrying only content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
            finish_reason: None,
            model: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion).
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Creates new token usage.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop (end of response).
    Stop,
    /// Hit max_tokens limit.
    Length,
    /// Content was filtered for safety.
    ContentFilter,
    /// Anything the backend reports that we do not model.
    Other,
}

impl FinishReason {
    /// Maps the common wire spellings onto our variants.
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" | "end_turn" | "stop_sequence" => FinishReason::Stop,
            "length" | "max_tokens" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }
}

/// Price of one token, in US dollars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostPerToken {
    pub input: f64,
    pub output: f64,
}

/// Static provider self-description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    /// Provider name (e.g., "openai", "anthropic").
    pub name: String,
    /// Models this adapter can address.
    pub models: Vec<String>,
    /// What the backend is good at.
    pub capabilities: Vec<String>,
    /// Known constraints.
    pub limitations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_token: Option<CostPerToken>,
}

impl ProviderMetadata {
    /// Creates metadata with a name and no declared models.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            models: Vec::new(),
            capabilities: Vec::new(),
            limitations: Vec::new(),
            cost_per_token: None,
        }
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limitations<I, S>(mut self, limitations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.limitations = limitations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cost_per_token(mut self, input: f64, output: f64) -> Self {
        self.cost_per_token = Some(CostPerToken { input, output });
        self
    }
}

/// Provider errors, classified by the adapter that raised them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{provider} [{code}]: {message}")]
pub struct ProviderError {
    /// Error classification.
    pub code: ErrorCode,
    /// HTTP status, when the failure came from a response.
    pub status_code: Option<u16>,
    /// Whether the engine may spend retry budget on this failure.
    pub retryable: bool,
    /// Provider that raised the error.
    pub provider: String,
    /// Details for logs and the response's `error` field.
    pub message: String,
}

impl ProviderError {
    /// Creates an error whose retryability follows the code's default.
    pub fn new(code: ErrorCode, provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            status_code: None,
            retryable: code.is_retryable_by_default(),
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Attaches the HTTP status that produced this error.
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Overrides the default retryability.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Missing credentials.
    pub fn no_api_key(provider: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoApiKey, provider, "API key not configured")
    }

    /// Credentials rejected.
    pub fn authentication(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthenticationError, provider, message)
    }

    /// Rate limited by the backend.
    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RateLimit, provider, message)
    }

    /// Call exceeded its deadline.
    pub fn timeout(provider: impl Into<String>, timeout_ms: u64) -> Self {
        Self::new(
            ErrorCode::RequestTimeout,
            provider,
            format!("request timed out after {}ms", timeout_ms),
        )
    }

    /// Backend overloaded or failing server-side.
    pub fn overloaded(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceOverloaded, provider, message)
    }

    /// Transport failure.
    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, provider, message)
    }

    /// Caller cancelled the request.
    pub fn aborted(provider: impl Into<String>) -> Self {
        Self::new(ErrorCode::RequestAborted, provider, "request was cancelled")
    }

    /// Backend returned something we could not interpret.
    ///
    /// Retryable: truncated or empty completions are usually transient.
    pub fn parse(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, provider, message).with_retryable(true)
    }

    /// Backend rejected the request as malformed.
    pub fn invalid_request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, provider, message)
    }
}
