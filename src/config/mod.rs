//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `DECISION_ENGINE`
//! prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use decision_engine::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Confidence threshold: {}", config.engine.confidence_threshold);
//! ```

mod error;
mod logging;
mod providers;

pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};
pub use providers::ProvidersConfig;

use serde::Deserialize;

use crate::domain::engine::EngineConfig;

/// Root application configuration
///
/// Every section has defaults, so an empty environment loads successfully.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Decision engine behaviour (routing, retries, thresholds, cache)
    #[serde(default)]
    pub engine: EngineConfig,

    /// Provider credentials and endpoints (OpenAI/Anthropic)
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Log filter and output format
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `DECISION_ENGINE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `DECISION_ENGINE__ENGINE__MAX_RETRIES=5` -> `engine.max_retries = 5`
    /// - `DECISION_ENGINE__ENGINE__FALLBACK_PROVIDERS=anthropic,openai` -> list
    /// - `DECISION_ENGINE__PROVIDERS__OPENAI_API_KEY=...` -> `providers.openai_api_key`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("DECISION_ENGINE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("engine.fallback_providers")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.engine
            .validate()
            .map_err(|e| ValidationError::InvalidEngine(e.to_string()))?;
        self.providers.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
