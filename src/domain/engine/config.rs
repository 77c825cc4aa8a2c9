//! Engine configuration and hot updates.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use super::EngineError;

/// Decision engine configuration.
///
/// Loaded once at startup; may be replaced field-by-field at runtime through
/// [`EngineConfigUpdate`]. Updates never reset metrics or the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Provider tried after the request's preferred provider.
    #[serde(default)]
    pub default_provider: Option<String>,

    /// Providers tried after the default, in order.
    #[serde(default)]
    pub fallback_providers: Vec<String>,

    /// Run the strategy's structural validation on provider output.
    #[serde(default = "default_true")]
    pub enable_validation: bool,

    /// Synthesize a fallback decision when every attempt fails.
    #[serde(default = "default_true")]
    pub enable_fallback: bool,

    /// Retry the provider list after a failed pass.
    #[serde(default = "default_true")]
    pub enable_retry: bool,

    /// Retries after the first pass (total passes = max_retries + 1).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-provider-call timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Minimum confidence for a decision to be accepted.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Cache successful responses by request content.
    #[serde(default)]
    pub enable_caching: bool,

    /// Cache sizing; defaults apply when caching is enabled without it.
    #[serde(default)]
    pub cache: Option<CacheConfig>,

    /// Backoff before retry `k` is `backoff_base_ms * 2^k`.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

/// Response cache sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds; 0 disables expiry.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached responses.
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            max_size: default_cache_max_size(),
        }
    }
}

impl EngineConfig {
    /// Number of passes over the provider list.
    pub fn attempts(&self) -> u32 {
        if self.enable_retry {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }

    /// Per-provider-call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Effective cache settings.
    pub fn cache_config(&self) -> CacheConfig {
        self.cache.unwrap_or_default()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(EngineError::InvalidConfig(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }

        if self.timeout_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(EngineError::InvalidConfig(format!(
                "max_retries must not exceed {}",
                MAX_RETRIES_LIMIT
            )));
        }

        if self.enable_caching && self.cache_config().max_size == 0 {
            return Err(EngineError::InvalidConfig(
                "cache.max_size must be greater than zero when caching is enabled".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_provider: None,
            fallback_providers: Vec::new(),
            enable_validation: true,
            enable_fallback: true,
            enable_retry: true,
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            confidence_threshold: default_confidence_threshold(),
            enable_caching: false,
            cache: None,
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

/// Partial configuration update. `None` fields are left unchanged.
///
/// `default_provider` is doubly optional: `Some(None)` (JSON `null`) clears
/// the default, an absent field keeps it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfigUpdate {
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_provider: Option<Option<String>>,
    pub fallback_providers: Option<Vec<String>>,
    pub enable_validation: Option<bool>,
    pub enable_fallback: Option<bool>,
    pub enable_retry: Option<bool>,
    pub max_retries: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub confidence_threshold: Option<f64>,
    pub enable_caching: Option<bool>,
    pub cache: Option<CacheConfig>,
    pub backoff_base_ms: Option<u64>,
}

impl EngineConfigUpdate {
    /// Returns a copy of `config` with this update's fields replaced.
    pub fn apply_to(&self, config: &EngineConfig) -> EngineConfig {
        let mut next = config.clone();
        if let Some(ref provider) = self.default_provider {
            next.default_provider = provider.clone();
        }
        if let Some(ref fallbacks) = self.fallback_providers {
            next.fallback_providers = fallbacks.clone();
        }
        if let Some(v) = self.enable_validation {
            next.enable_validation = v;
        }
        if let Some(v) = self.enable_fallback {
            next.enable_fallback = v;
        }
        if let Some(v) = self.enable_retry {
            next.enable_retry = v;
        }
        if let Some(v) = self.max_retries {
            next.max_retries = v;
        }
        if let Some(v) = self.timeout_ms {
            next.timeout_ms = v;
        }
        if let Some(v) = self.confidence_threshold {
            next.confidence_threshold = v;
        }
        if let Some(v) = self.enable_caching {
            next.enable_caching = v;
        }
        if let Some(v) = self.cache {
            next.cache = Some(v);
        }
        if let Some(v) = self.backoff_base_ms {
            next.backoff_base_ms = v;
        }
        next
    }
}

const MAX_RETRIES_LIMIT: u32 = 10;

// A present field, including `null`, becomes `Some`; absence falls to `default`.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_cache_ttl_secs() -> u64 {
    3_600
}

fn default_cache_max_size() -> usize {
    100
}
