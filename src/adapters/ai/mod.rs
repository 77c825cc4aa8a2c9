//! AI Provider Adapters.
//!
//! Implementations of the `ProviderAdapter` port for various LLM backends.
//!
//! ## Available Adapters
//!
//! - `MockProvider` - Scriptable mock for testing
//! - `OpenAIProvider` - OpenAI chat completions with JSON mode
//! - `AnthropicProvider` - Anthropic Messages API

mod anthropic_provider;
mod http_errors;
mod mock_provider;
mod openai_provider;

pub use anthropic_provider::{AnthropicConfig, AnthropicProvider, ANTHROPIC_PROVIDER};
pub use http_errors::{classify_status, classify_transport};
pub use mock_provider::{MockError, MockProvider, MockResponse, RecordedCall};
pub use openai_provider::{OpenAIConfig, OpenAIProvider, OPENAI_PROVIDER};
