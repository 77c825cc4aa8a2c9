//! Typed payloads for medical decisions.

use serde::{Deserialize, Serialize};

/// A candidate condition with its estimated probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisCandidate {
    pub condition: String,
    /// Probability in [0, 1].
    pub probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Payload of a `diagnosis` decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisDecision {
    pub primary_diagnosis: DiagnosisCandidate,
    #[serde(default)]
    pub differential_diagnoses: Vec<DiagnosisCandidate>,
    #[serde(default)]
    pub recommended_tests: Vec<String>,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Triage urgency, most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Critical,
    Urgent,
    SemiUrgent,
    NonUrgent,
}

impl Urgency {
    pub const ALL: [Urgency; 4] = [
        Urgency::Critical,
        Urgency::Urgent,
        Urgency::SemiUrgent,
        Urgency::NonUrgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::Urgent => "urgent",
            Urgency::SemiUrgent => "semi_urgent",
            Urgency::NonUrgent => "non_urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == value)
    }
}

/// Payload of a `triage` decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageDecision {
    pub urgency: Urgency,
    pub disposition: String,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_treatment_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}
