//! Ports - Interfaces for pluggable collaborators.
//!
//! Following hexagonal architecture, ports define the contracts between the
//! decision engine and the outside world. Adapters implement these ports.
//!
//! - `ProviderAdapter` - one external AI backend
//! - `DecisionStrategy` - one decision domain

mod decision_strategy;
mod provider_adapter;

pub use decision_strategy::{render_context, render_previous_decisions, DecisionStrategy};
pub use provider_adapter::{
    CostPerToken, FinishReason, ProviderAdapter, ProviderError, ProviderMetadata,
    ProviderResponse, TokenUsage,
};
