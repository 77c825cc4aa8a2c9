//! AI provider configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use crate::adapters::ai::{AnthropicConfig, OpenAIConfig, ANTHROPIC_PROVIDER, OPENAI_PROVIDER};

use super::error::ValidationError;

/// Credentials and endpoints for the concrete provider adapters.
///
/// A provider is registered only when its API key is present and non-blank.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// OpenAI API key
    pub openai_api_key: Option<Secret<String>>,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Anthropic API key
    pub anthropic_api_key: Option<Secret<String>>,

    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,

    /// HTTP client timeout in seconds, independent of the engine's per-call bound
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl ProvidersConfig {
    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Check if OpenAI is configured
    pub fn has_openai(&self) -> bool {
        has_key(&self.openai_api_key)
    }

    /// Check if Anthropic is configured
    pub fn has_anthropic(&self) -> bool {
        has_key(&self.anthropic_api_key)
    }

    /// Whether the named provider has credentials.
    pub fn is_configured(&self, name: &str) -> bool {
        match name {
            OPENAI_PROVIDER => self.has_openai(),
            ANTHROPIC_PROVIDER => self.has_anthropic(),
            _ => false,
        }
    }

    pub fn openai_config(&self) -> OpenAIConfig {
        let config = OpenAIConfig::default()
            .with_model(self.openai_model.clone())
            .with_base_url(self.openai_base_url.clone())
            .with_timeout(self.http_timeout());

        match &self.openai_api_key {
            Some(key) => config.with_api_key(key.expose_secret().clone()),
            None => config,
        }
    }

    pub fn anthropic_config(&self) -> AnthropicConfig {
        let config = AnthropicConfig::default()
            .with_model(self.anthropic_model.clone())
            .with_base_url(self.anthropic_base_url.clone())
            .with_timeout(self.http_timeout());

        match &self.anthropic_api_key {
            Some(key) => config.with_api_key(key.expose_secret().clone()),
            None => config,
        }
    }

    /// Validate provider configuration
    ///
    /// Missing keys are not an error here; the binary falls back to `--mock`
    /// or reports that no provider is available.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_http_url(&self.openai_base_url) {
            return Err(ValidationError::InvalidBaseUrl(OPENAI_PROVIDER));
        }

        if !is_http_url(&self.anthropic_base_url) {
            return Err(ValidationError::InvalidBaseUrl(ANTHROPIC_PROVIDER));
        }

        if self.http_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        Ok(())
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: default_openai_model(),
            openai_base_url: default_openai_base_url(),
            anthropic_api_key: None,
            anthropic_model: default_anthropic_model(),
            anthropic_base_url: default_anthropic_base_url(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

fn has_key(key: &Option<Secret<String>>) -> bool {
    key.as_ref()
        .is_some_and(|k| !k.expose_secret().trim().is_empty())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_http_timeout() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_providers_config_defaults() {
        let config = ProvidersConfig::default();
        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(config.http_timeout_secs, 60);
        assert!(!config.has_openai());
        assert!(!config.has_anthropic());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_has_provider_checks() {
        let config = ProvidersConfig {
            openai_api_key: Some(Secret::new("sk-xxx".to_string())),
            anthropic_api_key: Some(Secret::new("   ".to_string())),
            ..Default::default()
        };
        assert!(config.has_openai());
        assert!(!config.has_anthropic());
        assert!(config.is_configured("openai"));
        assert!(!config.is_configured("anthropic"));
        assert!(!config.is_configured("mock"));
    }

    #[test]
    fn test_adapter_configs_carry_settings() {
        let config = ProvidersConfig {
            anthropic_api_key: Some(Secret::new("sk-ant-xxx".to_string())),
            anthropic_model: "claude-3-5-haiku-latest".to_string(),
            http_timeout_secs: 15,
            ..Default::default()
        };

        let anthropic = config.anthropic_config();
        assert!(anthropic.has_api_key());
        assert_eq!(anthropic.model, "claude-3-5-haiku-latest");
        assert_eq!(anthropic.timeout, Duration::from_secs(15));

        let openai = config.openai_config();
        assert!(!openai.has_api_key());
        assert_eq!(openai.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_validation_rejects_bad_base_url() {
        let config = ProvidersConfig {
            openai_base_url: "api.openai.com".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidBaseUrl("openai"))
        );
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let config = ProvidersConfig {
            http_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTimeout));
    }

    #[test]
    fn test_debug_output_hides_keys() {
        let config = ProvidersConfig {
            openai_api_key: Some(Secret::new("sk-very-secret".to_string())),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("sk-very-secret"));
    }
}
