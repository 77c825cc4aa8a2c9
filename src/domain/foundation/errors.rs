//! Error codes shared by providers, the engine, and metrics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes organized by category.
///
/// Serialized in SCREAMING_SNAKE_CASE so metrics and responses carry the
/// same strings callers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Configuration errors (fatal, never retried)
    NoStrategyForDomain,
    UnsupportedDecisionType,
    NoProvidersAvailable,
    InvalidConfig,

    // Provider-classified, non-retryable
    NoApiKey,
    AuthenticationError,
    InvalidRequest,

    // Provider-classified, retryable
    RateLimit,
    RequestTimeout,
    ServiceOverloaded,
    NetworkError,

    // Attempt failures
    ParseError,
    ValidationFailed,
    ConfidenceBelowThreshold,

    // Terminal
    RequestAborted,
    AllProvidersFailed,
}

impl ErrorCode {
    /// Whether a failure with this code is worth retrying by default.
    ///
    /// Adapters use this when constructing errors; the engine itself only
    /// reads the `retryable` flag the adapter sets.
    pub fn is_retryable_by_default(&self) -> bool {
        matches!(
            self,
            ErrorCode::RateLimit
                | ErrorCode::RequestTimeout
                | ErrorCode::ServiceOverloaded
                | ErrorCode::NetworkError
        )
    }

    /// Configuration errors abort a request before any provider is called.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::NoStrategyForDomain
                | ErrorCode::UnsupportedDecisionType
                | ErrorCode::NoProvidersAvailable
                | ErrorCode::InvalidConfig
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::NoStrategyForDomain => "NO_STRATEGY_FOR_DOMAIN",
            ErrorCode::UnsupportedDecisionType => "UNSUPPORTED_DECISION_TYPE",
            ErrorCode::NoProvidersAvailable => "NO_PROVIDERS_AVAILABLE",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::NoApiKey => "NO_API_KEY",
            ErrorCode::AuthenticationError => "AUTHENTICATION_ERROR",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::RequestTimeout => "REQUEST_TIMEOUT",
            ErrorCode::ServiceOverloaded => "SERVICE_OVERLOADED",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::ConfidenceBelowThreshold => "CONFIDENCE_BELOW_THRESHOLD",
            ErrorCode::RequestAborted => "REQUEST_ABORTED",
            ErrorCode::AllProvidersFailed => "ALL_PROVIDERS_FAILED",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_display_formats_correctly() {
        assert_eq!(format!("{}", ErrorCode::NoStrategyForDomain), "NO_STRATEGY_FOR_DOMAIN");
        assert_eq!(format!("{}", ErrorCode::AllProvidersFailed), "ALL_PROVIDERS_FAILED");
        assert_eq!(format!("{}", ErrorCode::NoApiKey), "NO_API_KEY");
    }

    #[test]
    fn error_code_serializes_like_display() {
        for code in [
            ErrorCode::RateLimit,
            ErrorCode::ConfidenceBelowThreshold,
            ErrorCode::UnsupportedDecisionType,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code));
        }
    }

    #[test]
    fn retryable_classification() {
        assert!(ErrorCode::RateLimit.is_retryable_by_default());
        assert!(ErrorCode::RequestTimeout.is_retryable_by_default());
        assert!(ErrorCode::ServiceOverloaded.is_retryable_by_default());

        assert!(!ErrorCode::AuthenticationError.is_retryable_by_default());
        assert!(!ErrorCode::NoApiKey.is_retryable_by_default());
        assert!(!ErrorCode::RequestAborted.is_retryable_by_default());
    }

    #[test]
    fn configuration_errors_are_flagged() {
        assert!(ErrorCode::NoStrategyForDomain.is_configuration_error());
        assert!(ErrorCode::NoProvidersAvailable.is_configuration_error());
        assert!(!ErrorCode::AllProvidersFailed.is_configuration_error());
    }
}
