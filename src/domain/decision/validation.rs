//! Structural validation outcomes.

use serde::{Deserialize, Serialize};

/// Result of a strategy's structural check of raw provider output.
///
/// Errors are hard failures; warnings never reject a decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A passing result with no findings.
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Records a hard error and marks the result invalid.
    pub fn error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    /// Records a warning without affecting validity.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Validation findings attached to a decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResults {
    pub structure_valid: bool,
    pub content_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl From<ValidationResult> for ValidationResults {
    fn from(result: ValidationResult) -> Self {
        Self {
            structure_valid: result.valid,
            content_valid: result.valid,
            errors: result.errors,
            warnings: result.warnings,
        }
    }
}
