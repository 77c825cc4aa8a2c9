//! Medical decision strategy: diagnosis and triage.

use serde_json::{json, Map, Value};

use crate::domain::decision::{
    ConfidenceAdjustment, ConfidenceAssessment, ConfidenceBand, Decision, DecisionPayload,
    DecisionRequest, ValidationResult, DEFAULT_BASE_CONFIDENCE, FALLBACK_CONFIDENCE,
};
use crate::ports::{render_context, render_previous_decisions, DecisionStrategy};

use super::payload::{DiagnosisCandidate, DiagnosisDecision, TriageDecision, Urgency};
use super::redaction::{redact_json, redact_pii};

/// Domain name the strategy is usually registered under.
pub const MEDICAL_DOMAIN: &str = "medical";
pub const DIAGNOSIS: &str = "diagnosis";
pub const TRIAGE: &str = "triage";

/// Reasoning at least this long counts as detailed.
const DETAILED_REASONING_CHARS: usize = 100;

/// Clinical decision support for diagnosis and triage.
///
/// Confidence is clamped to [`ConfidenceBand::SAFETY`] so no decision ever
/// claims certainty. Critical or red-flagged decisions are annotated for
/// clinician review.
#[derive(Debug, Clone, Default)]
pub struct MedicalStrategy;

impl MedicalStrategy {
    pub fn new() -> Self {
        Self
    }

    fn diagnosis_confidence(
        diagnosis: &DiagnosisDecision,
        request: &DecisionRequest,
    ) -> Vec<ConfidenceAdjustment> {
        let mut adjustments = Vec::new();

        if diagnosis.differential_diagnoses.len() >= 2 {
            adjustments.push(ConfidenceAdjustment::new(
                "differentials",
                10.0,
                "multiple differentials considered",
            ));
        }
        if !diagnosis.recommended_tests.is_empty() {
            adjustments.push(ConfidenceAdjustment::new(
                "recommended_tests",
                5.0,
                "diagnostic workup recommended",
            ));
        }
        let probability = diagnosis.primary_diagnosis.probability;
        if probability >= 0.7 {
            adjustments.push(ConfidenceAdjustment::new(
                "primary_probability",
                5.0,
                "high primary diagnosis probability",
            ));
        } else if probability < 0.4 {
            adjustments.push(ConfidenceAdjustment::new(
                "primary_probability",
                -10.0,
                "low primary diagnosis probability",
            ));
        }
        if !diagnosis.red_flags.is_empty() {
            adjustments.push(ConfidenceAdjustment::new("red_flags", -5.0, "red flags present"));
        }

        adjustments.extend(shared_adjustments(diagnosis.reasoning.as_deref(), request));
        adjustments
    }

    fn triage_confidence(
        triage: &TriageDecision,
        request: &DecisionRequest,
    ) -> Vec<ConfidenceAdjustment> {
        let mut adjustments = Vec::new();

        if triage.urgency == Urgency::Critical {
            adjustments.push(ConfidenceAdjustment::new(
                "critical_urgency",
                -5.0,
                "critical urgency flagged",
            ));
        }
        if !triage.red_flags.is_empty() {
            adjustments.push(ConfidenceAdjustment::new("red_flags", -5.0, "red flags present"));
        }
        if triage.time_to_treatment_minutes.is_some() {
            adjustments.push(ConfidenceAdjustment::new(
                "time_to_treatment",
                5.0,
                "explicit time to treatment",
            ));
        }

        adjustments.extend(shared_adjustments(triage.reasoning.as_deref(), request));
        adjustments
    }
}

impl DecisionStrategy for MedicalStrategy {
    fn supported_decision_types(&self) -> Vec<String> {
        vec![DIAGNOSIS.to_string(), TRIAGE.to_string()]
    }

    fn build_system_prompt(&self, decision_type: &str, request: &DecisionRequest) -> String {
        let task = match decision_type {
            DIAGNOSIS => "Produce a differential diagnosis for the presentation described by the user.",
            TRIAGE => "Assign a triage urgency and disposition for the presentation described by the user.",
            other => return format!("Unsupported medical decision type: {}", other),
        };

        let mut sections = vec![
            "You are a clinical decision support assistant. Your output supports, and never \
             replaces, the judgement of a licensed clinician."
                .to_string(),
            task.to_string(),
            "Be conservative: when findings are ambiguous, prefer the more urgent option and \
             list the red flags that would change your assessment."
                .to_string(),
        ];

        if let Some(context) = render_context(request) {
            sections.push(format!("Patient context:\n{}", context));
        }

        if let Some(previous) = render_previous_decisions(request) {
            sections.push(format!(
                "Previous decisions in this case (oldest first):\n{}\n\
                 Build on these decisions and explain any change in assessment.",
                previous
            ));
        }

        sections.join("\n\n")
    }

    fn build_json_format_requirements(&self, decision_type: &str) -> String {
        match decision_type {
            DIAGNOSIS => r#"Respond with a single JSON object and nothing else:
{
  "primaryDiagnosis": {"condition": string, "probability": number between 0 and 1},
  "differentialDiagnoses": [{"condition": string, "probability": number between 0 and 1, "reasoning": string}],
  "recommendedTests": [string],
  "redFlags": [string],
  "reasoning": string
}"#
            .to_string(),
            TRIAGE => r#"Respond with a single JSON object and nothing else:
{
  "urgency": "critical" | "urgent" | "semi_urgent" | "non_urgent",
  "disposition": string,
  "redFlags": [string],
  "timeToTreatmentMinutes": integer,
  "reasoning": string
}"#
            .to_string(),
            _ => "Respond with a single JSON object.".to_string(),
        }
    }

    fn validate_decision_structure(&self, raw: &Value, decision_type: &str) -> ValidationResult {
        let mut result = ValidationResult::ok();

        let Some(object) = raw.as_object() else {
            result.error("decision must be a JSON object");
            return result;
        };

        match decision_type {
            DIAGNOSIS => validate_diagnosis(object, &mut result),
            TRIAGE => validate_triage(object, &mut result),
            other => result.error(format!("unsupported decision type '{}'", other)),
        }

        match object.get("reasoning") {
            None | Some(Value::Null) => result.warn("reasoning is missing"),
            Some(Value::String(_)) => {}
            Some(_) => result.error("reasoning must be a string"),
        }

        result
    }

    fn calculate_confidence(
        &self,
        decision: &Decision,
        decision_type: &str,
        request: &DecisionRequest,
    ) -> ConfidenceAssessment {
        let adjustments = match decision_type {
            DIAGNOSIS => decision
                .payload
                .decode::<DiagnosisDecision>()
                .map(|d| Self::diagnosis_confidence(&d, request)),
            TRIAGE => decision
                .payload
                .decode::<TriageDecision>()
                .map(|t| Self::triage_confidence(&t, request)),
            _ => Ok(Vec::new()),
        }
        .unwrap_or_else(|_| {
            vec![ConfidenceAdjustment::new(
                "unreadable_payload",
                -15.0,
                "payload could not be decoded",
            )]
        });

        ConfidenceAssessment::from_adjustments(
            DEFAULT_BASE_CONFIDENCE,
            adjustments,
            ConfidenceBand::SAFETY,
        )
    }

    fn create_fallback_decision(&self, decision_type: &str, request: &DecisionRequest) -> Decision {
        let payload = match decision_type {
            DIAGNOSIS => DecisionPayload::from_typed(&DiagnosisDecision {
                primary_diagnosis: DiagnosisCandidate {
                    condition: "Undetermined: clinical evaluation required".to_string(),
                    probability: 0.0,
                    reasoning: None,
                },
                differential_diagnoses: Vec::new(),
                recommended_tests: vec!["Assessment by a qualified clinician".to_string()],
                red_flags: Vec::new(),
                reasoning: Some(
                    "Automated diagnosis unavailable; the case needs clinician assessment."
                        .to_string(),
                ),
            }),
            TRIAGE => DecisionPayload::from_typed(&TriageDecision {
                urgency: Urgency::Urgent,
                disposition: "In-person clinical evaluation".to_string(),
                red_flags: Vec::new(),
                time_to_treatment_minutes: Some(60),
                reasoning: Some(
                    "Automated triage unavailable; defaulting to urgent in-person evaluation."
                        .to_string(),
                ),
            }),
            _ => Ok(DecisionPayload::new(json!({
                "reasoning": "Automated decision unavailable; clinician review required."
            }))),
        }
        .unwrap_or_default();

        Decision::fallback(
            request.domain.clone(),
            decision_type,
            payload,
            FALLBACK_CONFIDENCE,
        )
        .with_metadata("requiresHumanReview", true)
    }

    fn pre_process_request(&self, mut request: DecisionRequest) -> DecisionRequest {
        request.input = redact_pii(&request.input);
        if let Some(context) = request.context.as_mut() {
            for value in context.values_mut() {
                if let Value::String(text) = value {
                    *text = redact_pii(text);
                }
            }
        }
        for decision in request.previous_decisions.iter_mut() {
            decision.reasoning = decision.reasoning.as_deref().map(redact_pii);
            let payload = redact_json(decision.payload.as_value().clone());
            decision.payload = DecisionPayload::new(payload);
        }
        request
    }

    fn post_process_decision(&self, decision: Decision, _request: &DecisionRequest) -> Decision {
        let (critical, red_flags) = match decision.decision_type.as_str() {
            TRIAGE => match decision.payload.decode::<TriageDecision>() {
                Ok(t) => (t.urgency == Urgency::Critical, !t.red_flags.is_empty()),
                Err(_) => (false, false),
            },
            DIAGNOSIS => match decision.payload.decode::<DiagnosisDecision>() {
                Ok(d) => (false, !d.red_flags.is_empty()),
                Err(_) => (false, false),
            },
            _ => (false, false),
        };

        let mut decision = decision;
        if critical {
            decision = decision.with_metadata("requiresUrgentReview", true);
        }
        if critical || red_flags {
            decision = decision.with_metadata("requiresHumanReview", true);
        }
        decision
    }
}

fn shared_adjustments(reasoning: Option<&str>, request: &DecisionRequest) -> Vec<ConfidenceAdjustment> {
    let mut adjustments = Vec::new();
    if reasoning.is_some_and(|r| r.trim().len() >= DETAILED_REASONING_CHARS) {
        adjustments.push(ConfidenceAdjustment::new(
            "reasoning",
            5.0,
            "detailed reasoning provided",
        ));
    }
    if !request.previous_decisions.is_empty() {
        adjustments.push(ConfidenceAdjustment::new(
            "continuity",
            5.0,
            "consistent with prior decisions in this case",
        ));
    }
    adjustments
}

fn validate_diagnosis(object: &Map<String, Value>, result: &mut ValidationResult) {
    match object.get("primaryDiagnosis") {
        Some(Value::Object(primary)) => validate_candidate("primaryDiagnosis", primary, result),
        Some(_) => result.error("primaryDiagnosis must be an object"),
        None => result.error("primaryDiagnosis is required"),
    }

    match object.get("differentialDiagnoses") {
        None => result.warn("differentialDiagnoses is missing"),
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                let field = format!("differentialDiagnoses[{}]", i);
                match item.as_object() {
                    Some(candidate) => validate_candidate(&field, candidate, result),
                    None => result.error(format!("{} must be an object", field)),
                }
            }
        }
        Some(_) => result.error("differentialDiagnoses must be an array"),
    }

    validate_string_array(object, "recommendedTests", result);
    validate_string_array(object, "redFlags", result);
}

fn validate_candidate(field: &str, candidate: &Map<String, Value>, result: &mut ValidationResult) {
    match candidate.get("condition").and_then(Value::as_str) {
        Some(condition) if !condition.trim().is_empty() => {}
        _ => result.error(format!("{}.condition must be a non-empty string", field)),
    }
    validate_probability(field, candidate.get("probability"), result);
}

fn validate_probability(field: &str, value: Option<&Value>, result: &mut ValidationResult) {
    match value.and_then(Value::as_f64) {
        Some(p) if (0.0..=1.0).contains(&p) => {}
        Some(p) => result.error(format!("{}.probability must be within [0, 1], got {}", field, p)),
        None => result.error(format!("{}.probability must be a number", field)),
    }
}

fn validate_triage(object: &Map<String, Value>, result: &mut ValidationResult) {
    match object.get("urgency").and_then(Value::as_str) {
        Some(urgency) if Urgency::parse(urgency).is_some() => {}
        Some(urgency) => result.error(format!(
            "urgency '{}' is not one of critical, urgent, semi_urgent, non_urgent",
            urgency
        )),
        None => result.error("urgency is required"),
    }

    match object.get("disposition").and_then(Value::as_str) {
        Some(disposition) if !disposition.trim().is_empty() => {}
        _ => result.error("disposition must be a non-empty string"),
    }

    validate_string_array(object, "redFlags", result);

    match object.get("timeToTreatmentMinutes") {
        None | Some(Value::Null) => {}
        Some(value) if value.as_u64().is_some_and(|m| m <= u64::from(u32::MAX)) => {}
        Some(_) => result.error("timeToTreatmentMinutes must be a non-negative integer"),
    }
}

fn validate_string_array(object: &Map<String, Value>, field: &str, result: &mut ValidationResult) {
    match object.get(field) {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            if items.iter().any(|item| !item.is_string()) {
                result.error(format!("{} must contain only strings", field));
            }
        }
        Some(_) => result.error(format!("{} must be an array", field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(decision_type: &str) -> DecisionRequest {
        DecisionRequest::new(MEDICAL_DOMAIN, decision_type, "fever and productive cough")
    }

    fn generated(decision_type: &str, payload: Value) -> Decision {
        Decision::new(MEDICAL_DOMAIN, decision_type, DecisionPayload::new(payload))
    }

    fn strong_diagnosis() -> Value {
        json!({
            "primaryDiagnosis": {"condition": "Community-acquired pneumonia", "probability": 0.75},
            "differentialDiagnoses": [
                {"condition": "Acute bronchitis", "probability": 0.15, "reasoning": "cough"},
                {"condition": "Influenza", "probability": 0.1, "reasoning": "season"}
            ],
            "recommendedTests": ["Chest X-ray", "CBC"],
            "redFlags": [],
            "reasoning": "Fever with productive cough and focal crackles on auscultation is most consistent with a lower respiratory tract infection."
        })
    }

    #[test]
    fn declares_supported_types() {
        assert_eq!(
            MedicalStrategy::new().supported_decision_types(),
            vec!["diagnosis".to_string(), "triage".to_string()]
        );
    }

    #[test]
    fn system_prompt_includes_context_and_history() {
        let previous = generated(TRIAGE, json!({"urgency": "urgent"}))
            .with_reasoning("urgent triage for suspected sepsis");
        let request = request(DIAGNOSIS)
            .with_context("age", json!(67))
            .with_previous_decision(previous);

        let prompt = MedicalStrategy::new().build_system_prompt(DIAGNOSIS, &request);

        assert!(prompt.contains("differential diagnosis"));
        assert!(prompt.contains("- age: 67"));
        assert!(prompt.contains("urgent triage for suspected sepsis"));
    }

    #[test]
    fn system_prompt_omits_empty_sections() {
        let prompt = MedicalStrategy::new().build_system_prompt(TRIAGE, &request(TRIAGE));
        assert!(!prompt.contains("Patient context"));
        assert!(!prompt.contains("Previous decisions"));
    }

    #[test]
    fn format_requirements_name_the_fields() {
        let strategy = MedicalStrategy::new();
        assert!(strategy.build_json_format_requirements(TRIAGE).contains("timeToTreatmentMinutes"));
        assert!(strategy.build_json_format_requirements(DIAGNOSIS).contains("primaryDiagnosis"));
    }

    #[test]
    fn valid_diagnosis_passes() {
        let result = MedicalStrategy::new().validate_decision_structure(&strong_diagnosis(), DIAGNOSIS);
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn diagnosis_probability_out_of_range_fails() {
        let raw = json!({"primaryDiagnosis": {"condition": "Migraine", "probability": 1.4}});
        let result = MedicalStrategy::new().validate_decision_structure(&raw, DIAGNOSIS);
        assert!(!result.valid);
        assert!(result.errors[0].contains("probability"));
    }

    #[test]
    fn missing_reasoning_is_only_a_warning() {
        let raw = json!({"urgency": "urgent", "disposition": "emergency department"});
        let result = MedicalStrategy::new().validate_decision_structure(&raw, TRIAGE);
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("reasoning")));
    }

    #[test]
    fn triage_rejects_unknown_urgency_and_bad_shapes() {
        let raw = json!({
            "urgency": "whenever",
            "disposition": "",
            "redFlags": "chest pain",
            "timeToTreatmentMinutes": -5
        });
        let result = MedicalStrategy::new().validate_decision_structure(&raw, TRIAGE);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 4);
    }

    #[test]
    fn non_object_is_rejected() {
        let result = MedicalStrategy::new().validate_decision_structure(&json!([1, 2]), TRIAGE);
        assert!(!result.valid);
    }

    #[test]
    fn strong_diagnosis_scores_high_within_band() {
        let strategy = MedicalStrategy::new();
        let decision = generated(DIAGNOSIS, strong_diagnosis());

        let assessment = strategy.calculate_confidence(&decision, DIAGNOSIS, &request(DIAGNOSIS));

        // 75 + 10 differentials + 5 tests + 5 probability + 5 reasoning = 100 -> clamped to 95
        assert_eq!(assessment.base_confidence, 75.0);
        assert_eq!(assessment.adjustments.len(), 4);
        assert!((assessment.final_confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn critical_triage_is_penalized() {
        let strategy = MedicalStrategy::new();
        let decision = generated(
            TRIAGE,
            json!({
                "urgency": "critical",
                "disposition": "resuscitation bay",
                "redFlags": ["hypotension"]
            }),
        );

        let assessment = strategy.calculate_confidence(&decision, TRIAGE, &request(TRIAGE));

        // 75 - 5 critical - 5 red flags = 65
        assert!((assessment.final_confidence - 0.65).abs() < 1e-9);
        assert!(assessment
            .adjustments
            .iter()
            .any(|a| a.reason == "critical urgency flagged"));
    }

    #[test]
    fn continuity_is_rewarded() {
        let strategy = MedicalStrategy::new();
        let decision = generated(
            TRIAGE,
            json!({"urgency": "non_urgent", "disposition": "self care"}),
        );
        let with_history = request(TRIAGE)
            .with_previous_decision(generated(TRIAGE, json!({"urgency": "non_urgent"})));

        let without = strategy.calculate_confidence(&decision, TRIAGE, &request(TRIAGE));
        let with = strategy.calculate_confidence(&decision, TRIAGE, &with_history);

        assert!(with.final_confidence > without.final_confidence);
    }

    #[test]
    fn undecodable_payload_floors_at_band_minimum() {
        let decision = generated(TRIAGE, json!({"urgency": 3}));
        let assessment = MedicalStrategy::new().calculate_confidence(&decision, TRIAGE, &request(TRIAGE));
        assert!((assessment.final_confidence - 0.60).abs() < 1e-9);
    }

    #[test]
    fn fallback_triage_is_conservative() {
        let decision = MedicalStrategy::new().create_fallback_decision(TRIAGE, &request(TRIAGE));

        assert!(decision.is_fallback());
        assert_eq!(decision.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(decision.metadata["requiresHumanReview"], true);

        let triage: TriageDecision = decision.payload.decode().unwrap();
        assert_eq!(triage.urgency, Urgency::Urgent);

        let raw = decision.payload.as_value().clone();
        assert!(MedicalStrategy::new().validate_decision_structure(&raw, TRIAGE).valid);
    }

    #[test]
    fn fallback_diagnosis_is_structurally_valid() {
        let strategy = MedicalStrategy::new();
        let decision = strategy.create_fallback_decision(DIAGNOSIS, &request(DIAGNOSIS));
        let raw = decision.payload.as_value().clone();
        assert!(strategy.validate_decision_structure(&raw, DIAGNOSIS).valid);
        assert!(decision.reasoning.is_some());
    }

    #[test]
    fn pre_process_redacts_input_and_context() {
        let request = DecisionRequest::new(
            MEDICAL_DOMAIN,
            TRIAGE,
            "Chest pain since morning, reach me at 555-123-4567",
        )
        .with_context("contact", "pat@example.com")
        .with_context("age", json!(52));

        let cleaned = MedicalStrategy::new().pre_process_request(request);

        assert_eq!(cleaned.input, "Chest pain since morning, reach me at [PHONE]");
        let context = cleaned.context.unwrap();
        assert_eq!(context["contact"], "[EMAIL]");
        assert_eq!(context["age"], 52);
    }

    #[test]
    fn pre_process_redacts_previous_decisions() {
        let previous = generated(
            TRIAGE,
            json!({"urgency": "urgent", "disposition": "call back on 555-987-6543"}),
        )
        .with_reasoning("Spoke with daughter at jane.doe@example.com");
        let request = DecisionRequest::new(MEDICAL_DOMAIN, TRIAGE, "follow-up")
            .with_previous_decision(previous);

        let strategy = MedicalStrategy::new();
        let cleaned = strategy.pre_process_request(request);

        let decision = &cleaned.previous_decisions[0];
        assert_eq!(
            decision.reasoning.as_deref(),
            Some("Spoke with daughter at [EMAIL]")
        );
        assert_eq!(
            decision.payload.str_field("disposition"),
            Some("call back on [PHONE]")
        );

        let prompt = strategy.build_system_prompt(TRIAGE, &cleaned);
        assert!(!prompt.contains("jane.doe"));
        assert!(!prompt.contains("555-987-6543"));
    }

    #[test]
    fn post_process_flags_critical_triage() {
        let decision = generated(
            TRIAGE,
            json!({"urgency": "critical", "disposition": "resuscitation bay"}),
        );

        let annotated = MedicalStrategy::new().post_process_decision(decision, &request(TRIAGE));

        assert_eq!(annotated.metadata["requiresUrgentReview"], true);
        assert_eq!(annotated.metadata["requiresHumanReview"], true);
    }

    #[test]
    fn post_process_flags_red_flags_only_for_review() {
        let mut payload = strong_diagnosis();
        payload["redFlags"] = json!(["hemoptysis"]);
        let decision = generated(DIAGNOSIS, payload);

        let annotated = MedicalStrategy::new().post_process_decision(decision, &request(DIAGNOSIS));

        assert_eq!(annotated.metadata["requiresHumanReview"], true);
        assert!(!annotated.metadata.contains_key("requiresUrgentReview"));
    }

    #[test]
    fn post_process_leaves_routine_decisions_alone() {
        let decision = generated(
            TRIAGE,
            json!({"urgency": "non_urgent", "disposition": "self care"}),
        );
        let annotated = MedicalStrategy::new().post_process_decision(decision, &request(TRIAGE));
        assert!(annotated.metadata.is_empty());
    }
}
