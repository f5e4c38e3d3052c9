//! Error types for vidfeed
//!
//! This module provides the crate-wide error type, including:
//! - Feed aggregation conditions ("no content" and the soft "partial content")
//! - Network, decode and I/O failures with their context
//! - HTTP status code mapping for the router
//! - Structured JSON error bodies with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for vidfeed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vidfeed
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "workers")
        key: Option<String>,
    },

    /// Network error (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus {
        /// Status code returned by the upstream
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// Response body could not be decoded into the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fetch job was submitted without any requests
    #[error("fetch job has no requests")]
    EmptyJob,

    /// A spawned fetch task panicked or was cancelled before producing a result
    #[error("fetch task failed: {0}")]
    TaskFailed(String),

    /// Nothing could be produced for this aggregation cycle
    #[error("no content to show{}", .cause.as_ref().map(|c| format!(": {c}")).unwrap_or_default())]
    NoContent {
        /// The dispatch-level failure that prevented any content, if any
        #[source]
        cause: Option<Box<Error>>,
    },

    /// Some sources failed but content is still available
    ///
    /// This is a soft condition: the accompanying list is valid and should be used.
    #[error("some content is missing: missing videos from {failed} sources")]
    PartialContent {
        /// Number of sources that failed to fetch or decode
        failed: usize,
    },
}

impl Error {
    /// Wrap a dispatch-level failure into a "no content" condition
    pub fn no_content(cause: Error) -> Self {
        Error::NoContent {
            cause: Some(Box::new(cause)),
        }
    }

    /// Returns true for the soft "partial content" condition
    pub fn is_partial(&self) -> bool {
        matches!(self, Error::PartialContent { .. })
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "no_content",
///     "message": "no content to show"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "no_content", "network_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,

            // Upstream feeds are unavailable or misbehaving
            Error::Network(_) => 502,
            Error::HttpStatus { .. } => 502,
            Error::Decode(_) => 502,

            // Nothing to serve yet
            Error::NoContent { .. } => 503,

            // Partial content is served with the list; only reached when reported alone
            Error::PartialContent { .. } => 200,

            Error::Io(_) => 500,
            Error::EmptyJob => 500,
            Error::TaskFailed(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Network(_) => "network_error",
            Error::HttpStatus { .. } => "upstream_status",
            Error::Decode(_) => "decode_error",
            Error::Io(_) => "io_error",
            Error::EmptyJob => "empty_job",
            Error::TaskFailed(_) => "task_failed",
            Error::NoContent { .. } => "no_content",
            Error::PartialContent { .. } => "partial_content",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::HttpStatus { status, url } => Some(serde_json::json!({
                "status": status,
                "url": url,
            })),
            Error::PartialContent { failed } => Some(serde_json::json!({
                "failed_sources": failed,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
