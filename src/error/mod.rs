//! The normalized error every failed request resolves to.

pub mod unified;

pub use unified::{ErrorCategory, ErrorCode, RecoverySuggestion};

use chrono::{SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::json::parse_tolerant;

/// Uniform failure shape for transport, HTTP and parse failures.
///
/// Callers inspect one type regardless of where the failure originated:
/// `status` is `0` when the backend could not be reached at all.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} (status {status}, {error_code})")]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    #[serde(rename = "httpStatus")]
    pub status: u16,
    pub message: String,
    pub error_code: String,
    pub path: String,
    /// ISO-8601 UTC instant, millisecond precision.
    pub timestamp: String,
}

impl ApiError {
    pub fn new(
        status: u16,
        message: impl Into<String>,
        error_code: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            error_code: error_code.into(),
            path: path.into(),
            timestamp: now_timestamp(),
        }
    }

    /// The backend could not be reached; no response was received.
    pub fn unreachable(endpoint: &str, base_url: &str, cause: &str) -> Self {
        Self::new(
            0,
            format!(
                "Unable to connect to {endpoint}. Check that the backend is running at {base_url} ({cause})."
            ),
            ErrorCode::BackendConnectionError,
            endpoint,
        )
    }

    /// A refresh attempt failed and the stored session was discarded.
    pub fn auth_expired(endpoint: &str) -> Self {
        Self::new(
            401,
            "Authentication expired. Please log in again.",
            ErrorCode::AuthExpired,
            endpoint,
        )
    }

    /// A success response whose body could not be interpreted.
    pub fn parse(status: u16, endpoint: &str, reason: impl std::fmt::Display) -> Self {
        Self::new(
            status,
            format!("Invalid JSON response from server: {reason}"),
            ErrorCode::JsonParseError,
            endpoint,
        )
    }

    /// The request never left the client because it could not be built.
    pub fn invalid_request(endpoint: &str, reason: impl std::fmt::Display) -> Self {
        Self::new(
            0,
            format!("Invalid request: {reason}"),
            ErrorCode::InvalidRequest,
            endpoint,
        )
    }

    /// Build an error from a non-2xx response, defaulting every field the
    /// body does not supply.
    pub fn from_error_response(
        status: StatusCode,
        endpoint: &str,
        body: &std::result::Result<String, String>,
    ) -> Self {
        let fallback = status_line(status);
        let fields = match body {
            Ok(text) if text.trim().is_empty() => Ok(Map::new()),
            Ok(text) => match parse_tolerant(text) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Ok(Map::new()),
                Err(err) => Err(err.to_string()),
            },
            Err(err) => Err(err.clone()),
        };

        match fields {
            Ok(map) => Self {
                status: status.as_u16(),
                message: string_field(&map, "message").unwrap_or(fallback),
                error_code: string_field(&map, "error")
                    .unwrap_or_else(|| ErrorCode::UnknownError.to_string()),
                path: string_field(&map, "path").unwrap_or_else(|| endpoint.to_string()),
                timestamp: string_field(&map, "timestamp").unwrap_or_else(now_timestamp),
            },
            Err(reason) => {
                tracing::debug!(endpoint, status = status.as_u16(), %reason, "Error body unreadable");
                Self::new(status.as_u16(), fallback, ErrorCode::ParseError, endpoint)
            }
        }
    }

    /// The well-known code, if this error carries one.
    pub fn code(&self) -> Option<ErrorCode> {
        self.error_code.parse().ok()
    }

    pub fn is_auth_expired(&self) -> bool {
        self.code() == Some(ErrorCode::AuthExpired)
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match (self.code(), self.status) {
            (Some(ErrorCode::InvalidRequest), _) => ErrorCategory::Client,
            (Some(ErrorCode::AuthExpired), _) => ErrorCategory::AuthExpired,
            (Some(ErrorCode::JsonParseError | ErrorCode::ParseError), _) => ErrorCategory::Parse,
            (Some(ErrorCode::BackendConnectionError), _) | (_, 0) => ErrorCategory::Unreachable,
            (_, 401 | 403) => ErrorCategory::Authentication,
            (_, 500..=599) => ErrorCategory::Server,
            _ => ErrorCategory::Client,
        }
    }

    /// Whether repeating the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Unreachable | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Unreachable => RecoverySuggestion::CheckBackend,
            ErrorCategory::AuthExpired => RecoverySuggestion::Reauthenticate,
            ErrorCategory::Authentication => RecoverySuggestion::CheckPermissions,
            ErrorCategory::Client => RecoverySuggestion::FixRequest,
            ErrorCategory::Server => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Parse => RecoverySuggestion::ContactSupport,
        }
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.to_string()
    }
}

/// Current instant in the `2024-01-31T12:00:00.000Z` form.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {}: {reason}", status.as_u16()),
        None => format!("HTTP {}", status.as_u16()),
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_fields_are_used_when_present() {
        let body = Ok(r#"{"message":"Patient not found","error":"NOT_FOUND","path":"/api/patients/9","timestamp":"2024-03-01T10:00:00.000Z"}"#.to_string());
        let err = ApiError::from_error_response(StatusCode::NOT_FOUND, "/patients/9", &body);
        assert_eq!(err.status, 404);
        assert_eq!(err.message, "Patient not found");
        assert_eq!(err.error_code, "NOT_FOUND");
        assert_eq!(err.path, "/api/patients/9");
        assert_eq!(err.timestamp, "2024-03-01T10:00:00.000Z");
    }

    #[test]
    fn missing_fields_are_synthesized() {
        let body = Ok(r#"{"detail":"nope"}"#.to_string());
        let err = ApiError::from_error_response(StatusCode::BAD_REQUEST, "/visits", &body);
        assert_eq!(err.message, "HTTP 400: Bad Request");
        assert_eq!(err.error_code, "UNKNOWN_ERROR");
        assert_eq!(err.path, "/visits");
        assert!(err.timestamp.ends_with('Z'));
    }

    #[test]
    fn unparseable_body_uses_parse_error_code() {
        let body = Ok("<<<>>>".to_string());
        let err = ApiError::from_error_response(StatusCode::BAD_GATEWAY, "/x", &body);
        assert_eq!(err.status, 502);
        assert_eq!(err.error_code, "PARSE_ERROR");
        assert_eq!(err.message, "HTTP 502: Bad Gateway");
    }

    #[test]
    fn empty_body_defaults_everything() {
        let err = ApiError::from_error_response(StatusCode::CONFLICT, "/x", &Ok("  ".into()));
        assert_eq!(err.error_code, "UNKNOWN_ERROR");
        assert_eq!(err.message, "HTTP 409: Conflict");
    }

    #[test]
    fn non_string_fields_are_ignored() {
        let body = Ok(r#"{"message":42,"error":""}"#.to_string());
        let err = ApiError::from_error_response(StatusCode::BAD_REQUEST, "/x", &body);
        assert_eq!(err.message, "HTTP 400: Bad Request");
        assert_eq!(err.error_code, "UNKNOWN_ERROR");
    }

    #[test]
    fn categories_follow_code_then_status() {
        assert_eq!(
            ApiError::unreachable("/a", "http://h", "refused").category(),
            ErrorCategory::Unreachable
        );
        assert_eq!(ApiError::auth_expired("/a").category(), ErrorCategory::AuthExpired);
        assert_eq!(ApiError::parse(200, "/a", "bad").category(), ErrorCategory::Parse);
        assert_eq!(
            ApiError::new(403, "no", "FORBIDDEN", "/a").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            ApiError::new(503, "down", "X", "/a").category(),
            ErrorCategory::Server
        );
        assert_eq!(
            ApiError::new(422, "bad", "X", "/a").category(),
            ErrorCategory::Client
        );
        assert_eq!(
            ApiError::invalid_request("/a", "bad body").category(),
            ErrorCategory::Client
        );
    }

    #[test]
    fn serializes_with_wire_names() {
        let err = ApiError::auth_expired("/patients/7");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["httpStatus"], 401);
        assert_eq!(value["errorCode"], "AUTH_EXPIRED");
        assert_eq!(value["path"], "/patients/7");
    }
}
