//! Decision engine - orchestration over strategies and providers.
//!
//! The engine resolves a strategy per domain, walks the provider priority
//! list with retries and backoff, gates on confidence, and synthesizes a
//! fallback when every attempt fails. Metrics and the response cache are
//! the only state shared between requests.

mod cache;
mod config;
#[allow(clippy::module_inception)]
mod engine;
mod errors;
mod metrics;
mod parsing;
mod registry;
mod retry;
mod routing;

pub use cache::{cache_key, DecisionCache};
pub use config::{CacheConfig, EngineConfig, EngineConfigUpdate};
pub use engine::DecisionEngine;
pub use errors::EngineError;
pub use metrics::EngineMetrics;
pub use parsing::extract_json_object;
pub use registry::{
    HealthStatus, ProviderEntry, ProviderOptions, ProviderRegistry, ProviderStatus,
    StrategyEntry, StrategyOptions, StrategyRegistry,
};
pub use retry::BackoffPolicy;
pub use routing::resolve_provider_order;
