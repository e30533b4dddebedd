//! # Error Handling
//!
//! This module defines the error taxonomy for the audio session core and how
//! each error is converted into an HTTP response.
//!
//! ## Error Categories:
//! - **Validation failures** (unsupported upload format, empty upload, blank
//!   announcement text): rejected synchronously with a 400-class response
//! - **Missing resources** (unknown file id, stale voice session id): 404
//! - **Arbitration conflicts** (a voice session is already recording): 409
//! - **Adapter failures** (a source could not start): 503, since the request
//!   was well-formed but the source is currently unusable
//! - **Server-side problems** (internal, configuration): 500
//!
//! Synthesis failures are deliberately absent from this enum: the provider is
//! external and slow, so those failures surface asynchronously on the event
//! channel as `announcement_failed`, never as a call error (see
//! `voice::synthesis`).
//!
//! ## JSON Response Format:
//! All errors return JSON with a consistent structure:
//! ```json
//! {
//!   "error": {
//!     "type": "unsupported_format",
//!     "message": "Unsupported audio format: .txt",
//!     "timestamp": "2025-01-01T12:00:00Z"
//!   }
//! }
//! ```

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Custom error types for the application.
///
/// Each variant holds the data needed for a human-readable message; the
/// machine-readable error type is derived from the variant itself in
/// `error_response`.
#[derive(Debug)]
pub enum AppError {
    /// Internal server errors (storage failures, poisoned locks, etc.)
    Internal(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// Requested resource (audio file, route target) was not found
    NotFound(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// User input failed validation rules
    ValidationError(String),

    /// Uploaded file does not carry an accepted audio extension
    UnsupportedFormat(String),

    /// Uploaded file had no content
    EmptyUpload,

    /// An audio source adapter failed to start playback
    SourceUnavailable(String),

    /// A voice recording session is already open
    SessionAlreadyActive,

    /// Voice session id is stale, closed, or was never opened
    UnknownSession(String),

    /// Text-to-speech request with blank text
    EmptyText,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::UnsupportedFormat(ext) => write!(f, "Unsupported audio format: {}", ext),
            AppError::EmptyUpload => write!(f, "Uploaded file contains no data"),
            AppError::SourceUnavailable(msg) => write!(f, "Audio source unavailable: {}", msg),
            AppError::SessionAlreadyActive => {
                write!(f, "A voice recording session is already active")
            }
            AppError::UnknownSession(id) => write!(f, "Unknown voice session: {}", id),
            AppError::EmptyText => write!(f, "Announcement text is empty"),
        }
    }
}

/// Converts each error into an HTTP response.
///
/// ## HTTP Status Code Mapping:
/// - Internal/ConfigError → 500 (Internal Server Error)
/// - BadRequest/ValidationError/UnsupportedFormat/EmptyUpload/EmptyText → 400
/// - NotFound/UnknownSession → 404 (Not Found)
/// - SessionAlreadyActive → 409 (Conflict)
/// - SourceUnavailable → 503 (Service Unavailable)
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type) = match self {
            AppError::Internal(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
            AppError::BadRequest(_) => (actix_web::http::StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotFound(_) => (actix_web::http::StatusCode::NOT_FOUND, "not_found"),
            AppError::ConfigError(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
            ),
            AppError::ValidationError(_) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "validation_error",
            ),
            AppError::UnsupportedFormat(_) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "unsupported_format",
            ),
            AppError::EmptyUpload => (actix_web::http::StatusCode::BAD_REQUEST, "empty_upload"),
            AppError::SourceUnavailable(_) => (
                actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                "source_unavailable",
            ),
            AppError::SessionAlreadyActive => (
                actix_web::http::StatusCode::CONFLICT,
                "session_already_active",
            ),
            AppError::UnknownSession(_) => {
                (actix_web::http::StatusCode::NOT_FOUND, "unknown_session")
            }
            AppError::EmptyText => (actix_web::http::StatusCode::BAD_REQUEST, "empty_text"),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing errors are almost always the client's fault, so they map to
/// 400 rather than 500.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {}", err))
    }
}

/// Type alias for Results that use our custom error type.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_code_mapping() {
        let cases = [
            (
                AppError::UnsupportedFormat(".txt".into()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::EmptyUpload, StatusCode::BAD_REQUEST),
            (AppError::EmptyText, StatusCode::BAD_REQUEST),
            (AppError::NotFound("file".into()), StatusCode::NOT_FOUND),
            (AppError::UnknownSession("abc".into()), StatusCode::NOT_FOUND),
            (AppError::SessionAlreadyActive, StatusCode::CONFLICT),
            (
                AppError::SourceUnavailable("sink".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::Internal("oops".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.error_response().status(), expected);
        }
    }

    #[test]
    fn test_display_messages_are_specific() {
        assert!(AppError::UnsupportedFormat(".txt".into())
            .to_string()
            .contains(".txt"));
        assert!(AppError::UnknownSession("s-1".into())
            .to_string()
            .contains("s-1"));
    }
}
