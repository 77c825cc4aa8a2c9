//! Decision Strategy Port - Interface for per-domain decision logic.
//!
//! A strategy owns everything domain-specific about a decision: the prompts,
//! the JSON schema the provider must emit, structural validation, confidence
//! scoring, and the conservative decision used when every provider fails.
//! The engine owns everything else (routing, retries, caching, metrics).
//!
//! All methods are pure functions of their inputs.
//!
//! # Example
//!
//! ```ignore
//! struct WeatherStrategy;
//!
//! impl DecisionStrategy for WeatherStrategy {
//!     fn supported_decision_types(&self) -> Vec<String> {
//!         vec!["umbrella".to_string()]
//!     }
//!     // ... other methods
//! }
//!
//! engine.register_strategy("weather", Arc::new(WeatherStrategy), StrategyOptions::default()).await;
//! ```

use serde_json::Value;

use crate::domain::decision::{ConfidenceAssessment, Decision, DecisionRequest, ValidationResult};

/// Port for domain-specific decision logic.
pub trait DecisionStrategy: Send + Sync {
    /// Decision types this strategy can handle.
    fn supported_decision_types(&self) -> Vec<String>;

    /// Builds the system prompt for a request.
    ///
    /// Must incorporate `request.previous_decisions` and `request.context`
    /// when present.
    fn build_system_prompt(&self, decision_type: &str, request: &DecisionRequest) -> String;

    /// Literal schema description appended to the system prompt.
    fn build_json_format_requirements(&self, decision_type: &str) -> String;

    /// Structural and type checks on the parsed provider output.
    ///
    /// Never a semantic correctness judgement.
    fn validate_decision_structure(&self, raw: &Value, decision_type: &str) -> ValidationResult;

    /// Scores a decision. `final_confidence` must be in [0, 1].
    fn calculate_confidence(
        &self,
        decision: &Decision,
        decision_type: &str,
        request: &DecisionRequest,
    ) -> ConfidenceAssessment;

    /// A structurally valid, conservative decision for when no provider
    /// succeeds.
    fn create_fallback_decision(&self, decision_type: &str, request: &DecisionRequest) -> Decision;

    /// Sanitizes a request before prompts are built.
    fn pre_process_request(&self, request: DecisionRequest) -> DecisionRequest {
        request
    }

    /// Annotates an accepted decision.
    fn post_process_decision(&self, decision: Decision, _request: &DecisionRequest) -> Decision {
        decision
    }
}

/// Renders prior decisions as prompt lines, oldest first.
///
/// Shared by strategies so continuity is formatted the same way everywhere.
pub fn render_previous_decisions(request: &DecisionRequest) -> Option<String> {
    if request.previous_decisions.is_empty() {
        return None;
    }

    let lines: Vec<String> = request
        .previous_decisions
        .iter()
        .enumerate()
        .map(|(i, decision)| {
            let summary = match decision.reasoning.as_deref() {
                Some(reasoning) => reasoning.to_string(),
                None => decision.payload.as_value().to_string(),
            };
            format!(
                "{}. [{}] {} (confidence {:.2}): {}",
                i + 1,
                decision.timestamp.as_datetime().to_rfc3339(),
                decision.decision_type,
                decision.confidence,
                summary,
            )
        })
        .collect();

    Some(lines.join("\n"))
}

/// Renders request context as `key: value` prompt lines.
pub fn render_context(request: &DecisionRequest) -> Option<String> {
    let context = request.context.as_ref().filter(|c| !c.is_empty())?;
    let lines: Vec<String> = context
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("- {}: {}", key, s),
            other => format!("- {}: {}", key, other),
        })
        .collect();
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::DecisionPayload;
    use serde_json::json;

    #[test]
    fn no_previous_decisions_renders_nothing() {
        let request = DecisionRequest::new("medical", "triage", "x");
        assert!(render_previous_decisions(&request).is_none());
    }

    #[test]
    fn previous_decisions_render_in_order() {
        let first = Decision::new("medical", "triage", DecisionPayload::default())
            .with_reasoning("initial triage: urgent");
        let second = Decision::new("medical", "diagnosis", DecisionPayload::default())
            .with_reasoning("likely pneumonia");
        let request = DecisionRequest::new("medical", "triage", "x")
            .with_previous_decision(first)
            .with_previous_decision(second);

        let rendered = render_previous_decisions(&request).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1. "));
        assert!(lines[0].contains("initial triage: urgent"));
        assert!(lines[1].contains("likely pneumonia"));
    }

    #[test]
    fn context_renders_sorted_keys() {
        let request = DecisionRequest::new("medical", "triage", "x")
            .with_context("sex", "female")
            .with_context("age", json!(41));

        let rendered = render_context(&request).unwrap();
        assert_eq!(rendered, "- age: 41\n- sex: female");
    }

    #[test]
    fn empty_context_renders_nothing() {
        let request = DecisionRequest::new("medical", "triage", "x");
        assert!(render_context(&request).is_none());
    }
}
