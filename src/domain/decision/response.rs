//! Response returned for every decision request.

use serde::{Deserialize, Serialize};

use super::Decision;

/// Provider name reported when the decision was synthesized locally.
pub const FALLBACK_PROVIDER: &str = "fallback";

/// The engine's answer to one `make_decision` call.
///
/// Always carries a well-formed decision: either an accepted provider
/// decision (`success = true`) or a fallback (`success = false`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub decision: Decision,
    pub confidence: f64,
    pub latency_ms: u64,
    pub provider: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub retry_count: u32,
}

impl DecisionResponse {
    /// An accepted provider decision.
    pub fn accepted(
        decision: Decision,
        provider: impl Into<String>,
        latency_ms: u64,
        retry_count: u32,
    ) -> Self {
        Self {
            confidence: decision.confidence,
            decision,
            latency_ms,
            provider: provider.into(),
            success: true,
            error: None,
            retry_count,
        }
    }

    /// A fallback decision after exhaustion.
    pub fn fallback(
        decision: Decision,
        error: impl Into<String>,
        latency_ms: u64,
        retry_count: u32,
    ) -> Self {
        Self {
            confidence: decision.confidence,
            decision,
            latency_ms,
            provider: FALLBACK_PROVIDER.to_string(),
            success: false,
            error: Some(error.into()),
            retry_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::DecisionPayload;

    #[test]
    fn accepted_response_mirrors_decision_confidence() {
        let mut decision = Decision::new("medical", "triage", DecisionPayload::default());
        decision.confidence = 0.82;

        let response = DecisionResponse::accepted(decision, "openai", 120, 1);

        assert!(response.success);
        assert_eq!(response.confidence, 0.82);
        assert_eq!(response.provider, "openai");
        assert_eq!(response.retry_count, 1);
        assert!(response.error.is_none());
    }

    #[test]
    fn fallback_response_reports_error() {
        let decision = Decision::fallback("medical", "triage", DecisionPayload::default(), 0.3);
        let response = DecisionResponse::fallback(decision, "rate limited", 900, 3);

        assert!(!response.success);
        assert_eq!(response.provider, FALLBACK_PROVIDER);
        assert_eq!(response.error.as_deref(), Some("rate limited"));
        assert_eq!(response.confidence, 0.3);
    }
}
