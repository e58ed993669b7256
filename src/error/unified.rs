//! Error classification and recovery.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Well-known machine-readable codes produced by the client itself.
///
/// Servers may send any other string in the `error` field; those are kept
/// verbatim in [`ApiError::error_code`](super::ApiError::error_code).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No response was received at all.
    BackendConnectionError,
    /// A refresh attempt failed; the session is gone.
    AuthExpired,
    /// A success response could not be read as JSON.
    JsonParseError,
    /// An error response body could not be read as JSON.
    ParseError,
    /// The server sent no error code.
    UnknownError,
    /// The request could not be built (e.g. body serialization failed).
    InvalidRequest,
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Unreachable,
    AuthExpired,
    Authentication,
    Client,
    Server,
    Parse,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    CheckBackend,
    Reauthenticate,
    CheckPermissions,
    FixRequest,
    RetryWithBackoff,
    ContactSupport,
}
