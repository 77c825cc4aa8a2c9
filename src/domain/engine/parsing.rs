//! Extraction of the JSON decision object from provider text.

use serde_json::Value;

/// Finds and parses the JSON object in a completion.
///
/// Models often wrap the object in prose or a fenced code block, so parsing
/// is attempted on the whole text first and then on the span from the first
/// `{` to the last `}`. Only JSON objects are accepted.
pub fn extract_json_object(content: &str) -> Result<Value, String> {
    let trimmed = content.trim();

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed
        .find('{')
        .ok_or_else(|| "response did not contain a JSON object".to_string())?;
    let end = trimmed
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| "response contained an unterminated JSON object".to_string())?;

    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err("response JSON was not an object".to_string()),
        Err(e) => Err(format!("invalid JSON in response: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_object() {
        let value = extract_json_object(r#"{"urgency": "urgent"}"#).unwrap();
        assert_eq!(value, json!({"urgency": "urgent"}));
    }

    #[test]
    fn parses_fenced_object() {
        let content = "Here is the decision:\n```json\n{\"urgency\": \"critical\"}\n```\n";
        let value = extract_json_object(content).unwrap();
        assert_eq!(value["urgency"], "critical");
    }

    #[test]
    fn rejects_text_without_object() {
        assert!(extract_json_object("I cannot help with that.").is_err());
    }

    #[test]
    fn rejects_arrays() {
        assert!(extract_json_object("[1, 2, 3]").is_err());
    }

    #[test]
    fn rejects_malformed_object() {
        let err = extract_json_object("{\"urgency\": }").unwrap_err();
        assert!(err.contains("invalid JSON"));
    }
}
