//! HTTP failure classification shared by the HTTP adapters.

use crate::domain::foundation::ErrorCode;
use crate::ports::ProviderError;

/// Maps a non-success HTTP status onto a classified provider error.
///
/// 401/403 are credential problems and never retried. 429, 408/504 and the
/// 5xx overload family (including Anthropic's 529) are retryable. Any other
/// status is treated as a malformed request.
pub fn classify_status(provider: &str, status: u16, body: &str) -> ProviderError {
    let message = error_message(body).unwrap_or_else(|| format!("HTTP {}", status));

    let error = match status {
        401 | 403 => ProviderError::authentication(provider, message),
        429 => ProviderError::rate_limited(provider, message),
        408 | 504 => ProviderError::new(ErrorCode::RequestTimeout, provider, message),
        500..=599 => ProviderError::overloaded(provider, message),
        _ => ProviderError::invalid_request(provider, message),
    };

    error.with_status(status)
}

/// Maps a transport failure onto a classified provider error.
pub fn classify_transport(provider: &str, err: &reqwest::Error, timeout_ms: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout(provider, timeout_ms)
    } else if err.is_connect() {
        ProviderError::network(provider, format!("connection failed: {}", err))
    } else {
        ProviderError::network(provider, err.to_string())
    }
}

/// Pulls `error.message` out of a JSON error body, falling back to the
/// trimmed body text.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let from_json = serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        });

    Some(from_json.unwrap_or_else(|| trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_not_retryable() {
        for status in [401, 403] {
            let err = classify_status("openai", status, "");
            assert_eq!(err.code, ErrorCode::AuthenticationError);
            assert!(!err.retryable);
            assert_eq!(err.status_code, Some(status));
        }
    }

    #[test]
    fn transient_failures_are_retryable() {
        assert_eq!(classify_status("p", 429, "").code, ErrorCode::RateLimit);
        assert_eq!(classify_status("p", 408, "").code, ErrorCode::RequestTimeout);
        assert_eq!(classify_status("p", 504, "").code, ErrorCode::RequestTimeout);
        assert_eq!(classify_status("p", 503, "").code, ErrorCode::ServiceOverloaded);
        assert_eq!(classify_status("p", 529, "").code, ErrorCode::ServiceOverloaded);

        for status in [429, 408, 500, 502, 503, 504, 529] {
            assert!(classify_status("p", status, "").retryable, "status {}", status);
        }
    }

    #[test]
    fn other_client_errors_are_invalid_requests() {
        let err = classify_status("p", 400, "");
        assert_eq!(err.code, ErrorCode::InvalidRequest);
        assert!(!err.retryable);
    }

    #[test]
    fn message_is_extracted_from_json_body() {
        let body = r#"{"error":{"type":"rate_limit_error","message":"Please try again in 20s."}}"#;
        let err = classify_status("anthropic", 429, body);
        assert_eq!(err.message, "Please try again in 20s.");
    }

    #[test]
    fn plain_body_is_used_verbatim() {
        let err = classify_status("p", 502, "  Bad Gateway  ");
        assert_eq!(err.message, "Bad Gateway");

        let err = classify_status("p", 502, "");
        assert_eq!(err.message, "HTTP 502");
    }
}
