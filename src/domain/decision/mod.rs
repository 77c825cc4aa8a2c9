//! Decision vocabulary: requests, decisions, responses, and scoring types.

mod cancellation;
mod confidence;
#[allow(clippy::module_inception)]
mod decision;
mod request;
mod response;
mod validation;

pub use cancellation::CancelHandle;
pub use confidence::{
    ConfidenceAdjustment, ConfidenceAssessment, ConfidenceBand, DEFAULT_BASE_CONFIDENCE,
    FALLBACK_CONFIDENCE,
};
pub use decision::{Decision, DecisionKind, DecisionPayload};
pub use request::DecisionRequest;
pub use response::{DecisionResponse, FALLBACK_PROVIDER};
pub use validation::{ValidationResult, ValidationResults};
