//! Response interceptor
//!
//! Every failed request passes through [`on_error`], which logs a readable
//! message and hands the error back untouched. Nothing is suppressed or
//! retried here.

use serde_json::Value;
use tracing::error;

use crate::error::Error;

/// Readable message for a failed request.
///
/// Prefers the server-supplied message, then the HTTP status, then
/// "no response", then the error's own text.
pub fn describe_error(error: &Error) -> String {
    match error {
        Error::Status {
            message: Some(message),
            ..
        } => message.clone(),
        Error::Status { status, .. } => format!("Request error: {}", status.as_u16()),
        Error::NoResponse(_) | Error::Timeout(_) => "No response from server".to_string(),
        other => {
            let text = other.to_string();
            if text.is_empty() {
                "Request failed".to_string()
            } else {
                text
            }
        }
    }
}

pub(crate) fn on_error(err: Error) -> Error {
    error!(code = err.code(), "API error: {}", describe_error(&err));
    err
}

/// Pull a human-readable message out of an error body.
///
/// FastAPI reports `HTTPException`s as `{"detail": ...}`, so `detail` is
/// accepted when `message` is absent.
pub(crate) fn server_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "detail"].iter().find_map(|key| {
        value
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_prefers_server_message() {
        let err = Error::Status {
            status: StatusCode::BAD_REQUEST,
            message: Some("Prompt is required".to_string()),
        };
        assert_eq!(describe_error(&err), "Prompt is required");
    }

    #[test]
    fn test_falls_back_to_status() {
        let err = Error::Status {
            status: StatusCode::BAD_GATEWAY,
            message: None,
        };
        assert_eq!(describe_error(&err), "Request error: 502");
    }

    #[test]
    fn test_timeout_is_no_response() {
        assert_eq!(describe_error(&Error::Timeout(60)), "No response from server");
    }

    #[test]
    fn test_other_errors_use_own_text() {
        let err = Error::InvalidRequest("empty prompt".to_string());
        assert_eq!(describe_error(&err), "Invalid request: empty prompt");
    }

    #[test]
    fn test_on_error_returns_same_error() {
        let err = on_error(Error::Rejected("nope".to_string()));
        assert!(matches!(err, Error::Rejected(ref m) if m == "nope"));
    }

    #[test]
    fn test_server_message_extraction() {
        assert_eq!(
            server_message(br#"{"success": false, "message": "Bad image"}"#),
            Some("Bad image".to_string())
        );
        assert_eq!(
            server_message(br#"{"detail": "Prompt is required"}"#),
            Some("Prompt is required".to_string())
        );
        assert_eq!(
            server_message(br#"{"message": "", "detail": "fallback"}"#),
            Some("fallback".to_string())
        );
        assert_eq!(server_message(br#"{"detail": [{"loc": ["body"]}]}"#), None);
        assert_eq!(server_message(b"<html>502</html>"), None);
    }
}
