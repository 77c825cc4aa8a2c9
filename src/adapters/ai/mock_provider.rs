//! Mock provider for testing.
//!
//! Provides a scriptable implementation of the `ProviderAdapter` port so
//! engine behavior can be exercised without calling real AI APIs.
//!
//! # Features
//!
//! - Queued responses, consumed in order, then a default
//! - Simulated delays for timeout and cancellation testing
//! - Error injection for retry and failover testing
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockProvider::new("mock")
//!     .with_response(r#"{"urgency": "urgent"}"#)
//!     .with_delay(Duration::from_millis(100));
//!
//! engine.register_provider("mock", Arc::new(provider.clone()), ProviderOptions::default()).await;
//! // ...
//! assert_eq!(provider.call_count(), 1);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::decision::DecisionRequest;
use crate::domain::foundation::RequestId;
use crate::ports::{
    FinishReason, ProviderAdapter, ProviderError, ProviderMetadata, ProviderResponse, TokenUsage,
};

/// Mock provider for testing.
///
/// Clones share the response queue and call history, so a test can keep
/// one handle while the engine owns another.
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    model: String,
    /// Pre-configured responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Returned once the queue is empty.
    default_response: MockResponse,
    /// Simulated latency per request.
    delay: Duration,
    available: bool,
    healthy: bool,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

/// A configured mock response.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    /// Return this content as a successful completion.
    Success(String),
    /// Return an error.
    Error(MockError),
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone, PartialEq)]
pub enum MockError {
    /// Simulate rate limiting.
    RateLimited,
    /// Simulate a server-side overload.
    Overloaded { message: String },
    /// Simulate rejected credentials.
    AuthenticationFailed,
    /// Simulate missing credentials.
    NoApiKey,
    /// Simulate a transport failure.
    Network { message: String },
    /// Simulate a backend-side timeout.
    Timeout { timeout_ms: u64 },
    /// Simulate a malformed request.
    InvalidRequest { message: String },
}

impl MockError {
    fn into_provider_error(self, provider: &str) -> ProviderError {
        match self {
            MockError::RateLimited => {
                ProviderError::rate_limited(provider, "rate limit exceeded").with_status(429)
            }
            MockError::Overloaded { message } => {
                ProviderError::overloaded(provider, message).with_status(503)
            }
            MockError::AuthenticationFailed => {
                ProviderError::authentication(provider, "invalid API key").with_status(401)
            }
            MockError::NoApiKey => ProviderError::no_api_key(provider),
            MockError::Network { message } => ProviderError::network(provider, message),
            MockError::Timeout { timeout_ms } => ProviderError::timeout(provider, timeout_ms),
            MockError::InvalidRequest { message } => {
                ProviderError::invalid_request(provider, message).with_status(400)
            }
        }
    }
}

/// One recorded call to `make_decision_request`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub request_id: RequestId,
    pub system_prompt: String,
    pub user_prompt: String,
    pub retry_count: u32,
}

impl MockProvider {
    /// Creates a mock that answers `{}` until configured otherwise.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: "mock-model-1".to_string(),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            default_response: MockResponse::Success("{}".to_string()),
            delay: Duration::ZERO,
            available: true,
            healthy: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a successful response to the queue.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        lock(&self.responses).push_back(MockResponse::Success(content.into()));
        self
    }

    /// Adds an error response to the queue.
    pub fn with_error(self, error: MockError) -> Self {
        lock(&self.responses).push_back(MockResponse::Error(error));
        self
    }

    /// Sets the content returned once the queue is empty.
    pub fn with_default_response(mut self, content: impl Into<String>) -> Self {
        self.default_response = MockResponse::Success(content.into());
        self
    }

    /// Sets the error returned once the queue is empty.
    pub fn with_default_error(mut self, error: MockError) -> Self {
        self.default_response = MockResponse::Error(error);
        self
    }

    /// Sets simulated latency per request and per health probe.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Reports the provider as lacking credentials.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Makes the health probe fail.
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Returns the number of calls made to this provider.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Clears the call history.
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn next_response(&self) -> MockResponse {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn make_decision_request(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        request: &DecisionRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        if request.is_cancelled() {
            return Err(ProviderError::aborted(&self.name));
        }

        lock(&self.calls).push(RecordedCall {
            request_id: request.id,
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            retry_count: request.retry_count(),
        });

        if !self.delay.is_zero() {
            tokio::select! {
                _ = request.cancellation().cancelled() => {
                    return Err(ProviderError::aborted(&self.name));
                }
                _ = sleep(self.delay) => {}
            }
        }

        match self.next_response() {
            MockResponse::Success(content) => Ok(ProviderResponse::new(content)
                .with_usage(TokenUsage::new(10, 20))
                .with_finish_reason(FinishReason::Stop)
                .with_model(self.model.clone())),
            MockResponse::Error(err) => Err(err.into_provider_error(&self.name)),
        }
    }

    async fn health_check(&self) -> bool {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.healthy
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::new(self.name.clone())
            .with_models([self.model.clone()])
            .with_capabilities(["json_output", "scripted_responses"])
            .with_limitations(["no real model behind it"])
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
