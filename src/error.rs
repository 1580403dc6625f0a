//! Error types for media-fetch
//!
//! This module provides the error taxonomy for the fetch pipeline:
//! - Domain errors (validation, single-flight conflicts, extraction, storage)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-fetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-fetch
///
/// Only terminal classifications are represented here. Per-attempt failures are
/// carried as [`crate::types::FailureReason`] inside the retry loop and never
/// cross the API boundary individually.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "retry.max_attempts")
        key: Option<String>,
    },

    /// Malformed or unsupported resource identifier
    #[error("{0}")]
    Validation(String),

    /// A fetch for the same resource key is already running
    #[error("Download already in progress for this URL")]
    AlreadyInProgress(String),

    /// Terminal fetch failure (fatal or retries exhausted)
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The extraction collaborator could not be set up
    #[error("extractor error: {0}")]
    Extractor(#[from] ExtractorError),

    /// Scratch file allocation or delivery failed
    #[error("storage error at {path}: {reason}")]
    Storage {
        /// The scratch path involved
        path: PathBuf,
        /// The reason the storage operation failed
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Terminal outcome of the retry loop for one fetch request
#[derive(Debug, Error)]
pub enum FetchError {
    /// The collaborator failed with a non-transient error; no retry was made
    #[error("Download failed: {reason}")]
    Fatal {
        /// Failure message reported by the collaborator
        reason: String,
    },

    /// Every attempt allowed by the retry policy failed with a retryable reason
    #[error("Download failed after {attempts} attempts: {last_reason}")]
    ExhaustedRetries {
        /// Number of attempts made
        attempts: u32,
        /// Reason reported by the final attempt
        last_reason: String,
    },
}

/// Errors raised by the extraction collaborator
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// The extractor binary could not be located
    #[error("extractor binary not found: {0}")]
    NotInstalled(String),

    /// The extractor process could not be started
    #[error("failed to execute {binary}: {source}")]
    Spawn {
        /// Binary that failed to start
        binary: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The extractor ran and reported a failure
    #[error("{message}")]
    Failed {
        /// Error text reported by the extractor
        message: String,
        /// Process exit code, if the process exited normally
        exit_code: Option<i32>,
    },

    /// The extractor succeeded but its metadata output could not be read
    #[error("invalid extractor output: {0}")]
    InvalidOutput(String),
}

impl ExtractorError {
    /// Whether the error text contains one of the given transient markers
    ///
    /// Matching is case-insensitive. Markers are the profile's retry-trigger keywords
    /// (signature, precondition, extraction, token failures and the like).
    pub fn matches_marker(&self, markers: &[String]) -> bool {
        let text = self.to_string().to_lowercase();
        markers
            .iter()
            .any(|marker| !marker.is_empty() && text.contains(&marker.to_lowercase()))
    }
}

/// API error response format
///
/// Returned by API endpoints when an error occurs. The `error` field carries the
/// human-readable message; `code` is stable for programmatic handling.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": "Download already in progress for this URL",
///   "code": "already_in_progress",
///   "details": { "url": "https://youtu.be/abc123" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable error message
    pub error: String,

    /// Machine-readable error code (e.g., "validation_error", "already_in_progress")
    pub code: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
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
            // 400 Bad Request - user input fault
            Error::Validation(_) => 400,
            Error::Config { .. } => 400,

            // 409 Conflict - caller should retry later
            Error::AlreadyInProgress(_) => 409,

            // 500 Internal Server Error - extraction and storage failures
            Error::Fetch(_) => 500,
            Error::Extractor(_) => 500,
            Error::Storage { .. } => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::AlreadyInProgress(_) => "already_in_progress",
            Error::Fetch(e) => match e {
                FetchError::Fatal { .. } => "fatal_extraction_failure",
                FetchError::ExhaustedRetries { .. } => "exhausted_retries",
            },
            Error::Extractor(_) => "extractor_error",
            Error::Storage { .. } => "storage_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::AlreadyInProgress(url) => Some(serde_json::json!({
                "url": url,
            })),
            Error::Fetch(FetchError::ExhaustedRetries { attempts, .. }) => {
                Some(serde_json::json!({
                    "attempts": attempts,
                }))
            }
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: message,
            code,
            details,
        }
    }
}
