//! Decision value produced by a strategy from provider output.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::foundation::{DecisionId, Timestamp};

use super::{ConfidenceAssessment, ValidationResults};

/// Where a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Parsed from a provider response.
    Generated,
    /// Synthesized locally after every provider failed.
    Fallback,
}

/// Strategy-owned structured body of a decision.
///
/// The engine treats the payload as opaque; the owning strategy decodes it
/// into its own typed structs after structural validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionPayload(Value);

impl DecisionPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Builds a payload from any serializable strategy type.
    pub fn from_typed<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::to_value(value)?))
    }

    /// Decodes the payload into a strategy type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.0)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Reads a top-level string field, if present.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// A decision within a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub id: DecisionId,
    #[serde(rename = "type")]
    pub kind: DecisionKind,
    pub domain: String,
    pub decision_type: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_results: Option<ValidationResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_assessment: Option<ConfidenceAssessment>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    pub payload: DecisionPayload,
}

impl Decision {
    /// Creates a generated decision with zero confidence; the engine fills
    /// in confidence after scoring.
    pub fn new(
        domain: impl Into<String>,
        decision_type: impl Into<String>,
        payload: DecisionPayload,
    ) -> Self {
        let reasoning = payload.str_field("reasoning").map(str::to_string);
        Self {
            id: DecisionId::new(),
            kind: DecisionKind::Generated,
            domain: domain.into(),
            decision_type: decision_type.into(),
            confidence: 0.0,
            timestamp: Timestamp::now(),
            reasoning,
            validation_results: None,
            confidence_assessment: None,
            metadata: BTreeMap::new(),
            payload,
        }
    }

    /// Creates a fallback decision with the given confidence.
    pub fn fallback(
        domain: impl Into<String>,
        decision_type: impl Into<String>,
        payload: DecisionPayload,
        confidence: f64,
    ) -> Self {
        Self {
            kind: DecisionKind::Fallback,
            confidence,
            ..Self::new(domain, decision_type, payload)
        }
    }

    /// Sets the reasoning text.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Adds a metadata annotation.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.kind == DecisionKind::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Triage {
        urgency: String,
    }

    #[test]
    fn new_decision_picks_up_reasoning_from_payload() {
        let payload = DecisionPayload::new(json!({"urgency": "urgent", "reasoning": "acute onset"}));
        let decision = Decision::new("medical", "triage", payload);

        assert_eq!(decision.kind, DecisionKind::Generated);
        assert_eq!(decision.reasoning.as_deref(), Some("acute onset"));
        assert_eq!(decision.confidence, 0.0);
    }

    #[test]
    fn payload_decodes_into_typed_struct() {
        let payload = DecisionPayload::from_typed(&Triage {
            urgency: "critical".to_string(),
        })
        .unwrap();

        let decoded: Triage = payload.decode().unwrap();
        assert_eq!(decoded.urgency, "critical");
    }

    #[test]
    fn fallback_decision_is_marked() {
        let decision = Decision::fallback("medical", "triage", DecisionPayload::default(), 0.3)
            .with_metadata("requiresHumanReview", true);

        assert!(decision.is_fallback());
        assert_eq!(decision.confidence, 0.3);
        assert_eq!(decision.metadata.get("requiresHumanReview"), Some(&json!(true)));
    }

    #[test]
    fn kind_serializes_as_type() {
        let decision = Decision::new("medical", "triage", DecisionPayload::default());
        let value = serde_json::to_value(&decision).unwrap();

        assert_eq!(value["type"], json!("generated"));
        assert_eq!(value["decisionType"], json!("triage"));
        assert!(value.get("metadata").is_none());
    }
}
