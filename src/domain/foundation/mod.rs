//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, and the error code vocabulary used
//! across the decision engine.

mod errors;
mod ids;
mod timestamp;

pub use errors::ErrorCode;
pub use ids::{DecisionId, RequestId};
pub use timestamp::Timestamp;
