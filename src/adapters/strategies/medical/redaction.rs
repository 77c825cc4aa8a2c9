//! PII redaction applied to patient text before it reaches a provider.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid email pattern")
});

// Separators are required so bare lab values are left alone.
static SSN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]{3}[-\s][0-9]{2}[-\s][0-9]{4}\b").expect("valid SSN pattern"));

static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?(?:\([0-9]{3}\)|\b[0-9]{3})[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b")
        .expect("valid phone pattern")
});

static MRN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bMRN\s*[:#]?\s*[A-Z0-9]{5,}\b").expect("valid record number pattern")
});

/// Replaces emails, SSNs, phone numbers and medical record numbers with
/// fixed placeholders.
pub fn redact_pii(text: &str) -> String {
    let text = EMAIL_REGEX.replace_all(text, "[EMAIL]");
    let text = MRN_REGEX.replace_all(&text, "[MRN]");
    let text = SSN_REGEX.replace_all(&text, "[SSN]");
    let text = PHONE_REGEX.replace_all(&text, "[PHONE]");
    text.into_owned()
}

/// Redacts every string inside a JSON value, keys excepted.
pub fn redact_json(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(redact_pii(&text)),
        Value::Array(items) => Value::Array(items.into_iter().map(redact_json).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, redact_json(value)))
                .collect(),
        ),
        other => other,
    }
}
