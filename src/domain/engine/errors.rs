//! Error types for the decision engine.

use crate::domain::foundation::{ErrorCode, RequestId};

/// Terminal failures returned by `make_decision` and engine setup.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum EngineError {
    #[error("no strategy registered for domain '{domain}'")]
    NoStrategyForDomain { domain: String },

    #[error("decision type '{decision_type}' is not supported by domain '{domain}'")]
    UnsupportedDecisionType {
        domain: String,
        decision_type: String,
    },

    #[error("no enabled providers available for this request")]
    NoProvidersAvailable,

    #[error("all providers failed after {retry_count} retries: {last_error}")]
    AllProvidersFailed { last_error: String, retry_count: u32 },

    #[error("request {request_id} was cancelled")]
    RequestAborted { request_id: RequestId },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// The taxonomy code recorded in metrics.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::NoStrategyForDomain { .. } => ErrorCode::NoStrategyForDomain,
            EngineError::UnsupportedDecisionType { .. } => ErrorCode::UnsupportedDecisionType,
            EngineError::NoProvidersAvailable => ErrorCode::NoProvidersAvailable,
            EngineError::AllProvidersFailed { .. } => ErrorCode::AllProvidersFailed,
            EngineError::RequestAborted { .. } => ErrorCode::RequestAborted,
            EngineError::InvalidConfig(_) => ErrorCode::InvalidConfig,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_message() {
        let err = EngineError::UnsupportedDecisionType {
            domain: "medical".to_string(),
            decision_type: "billing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "decision type 'billing' is not supported by domain 'medical'"
        );
        assert_eq!(err.code(), ErrorCode::UnsupportedDecisionType);
    }

    #[test]
    fn test_all_providers_failed_carries_last_error() {
        let err = EngineError::AllProvidersFailed {
            last_error: "openai [RATE_LIMIT]: slow down".to_string(),
            retry_count: 2,
        };
        assert!(err.to_string().contains("slow down"));
        assert_eq!(err.code(), ErrorCode::AllProvidersFailed);
    }

    #[test]
    fn test_configuration_codes() {
        assert!(EngineError::NoProvidersAvailable.code().is_configuration_error());
        assert!(EngineError::NoStrategyForDomain {
            domain: "legal".to_string()
        }
        .code()
        .is_configuration_error());
    }
}
