//! Medical domain: diagnosis and triage decisions.

mod payload;
mod redaction;
mod strategy;

pub use payload::{DiagnosisCandidate, DiagnosisDecision, TriageDecision, Urgency};
pub use redaction::{redact_json, redact_pii};
pub use strategy::{MedicalStrategy, DIAGNOSIS, MEDICAL_DOMAIN, TRIAGE};
