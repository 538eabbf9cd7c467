//! # Error Handling Module
//!
//! This module defines every failure the mock backend can produce using the `thiserror` crate,
//! together with the HTTP status mapping used when an error has to be rendered as a
//! response envelope.
//!
//! ## Where Errors Surface
//!
//! Record-level failures (missing IDs, client-chosen IDs, malformed bodies) never travel as
//! `Err` values: the collection store turns them into structured envelopes right away.
//! `Err` is reserved for failures that are not part of normal CRUD traffic:
//! - malformed route templates, raised while the router is being configured
//! - persistence slot failures (disk full, corrupt document, ...)
//! - transport failures while forwarding to the live backend
//! - configuration problems at startup

use http::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::core::types::MockResponse;

/// Main result type used throughout the mock backend
pub type MockResult<T> = Result<T, MockError>;

/// Error types for the mock backend
#[derive(Debug, Error, Clone)]
pub enum MockError {
    /// Route template could not be compiled (adjacent placeholders, unbalanced braces, ...)
    #[error("Invalid route template '{template}': {reason}")]
    Template { template: String, reason: String },

    /// Requested record does not exist in its collection
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Client sent something the store refuses to accept
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Underlying key-value store failed
    #[error("Persistence error for key '{key}': {message}")]
    Persistence { key: String, message: String },

    /// Configuration-related errors (invalid config, missing files, etc.)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Live backend could not be reached or answered with garbage
    #[error("Passthrough failed: {message}")]
    Passthrough { message: String },

    /// I/O errors (file operations)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// YAML parsing errors for configuration files
    #[error("YAML error: {message}")]
    Yaml { message: String },
}

impl MockError {
    /// Create a template error for the given template string
    pub fn template<T: Into<String>, R: Into<String>>(template: T, reason: R) -> Self {
        Self::Template {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error with a custom message
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an invalid request error with a custom message
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a persistence error for a slot key
    pub fn persistence<K: Into<String>, S: Into<String>>(key: K, message: S) -> Self {
        Self::Persistence {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a passthrough error with a custom message
    pub fn passthrough<S: Into<String>>(message: S) -> Self {
        Self::Passthrough {
            message: message.into(),
        }
    }

    /// Get the HTTP status code used when this error is rendered as a response
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Json { .. } => StatusCode::BAD_REQUEST,
            Self::Passthrough { .. } => StatusCode::BAD_GATEWAY,
            Self::Template { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Yaml { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a string representation of the error type for logs and tooling
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Template { .. } => "template_error",
            Self::NotFound { .. } => "not_found",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Persistence { .. } => "persistence_error",
            Self::Configuration { .. } => "configuration_error",
            Self::Passthrough { .. } => "passthrough_error",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
            Self::Yaml { .. } => "yaml_error",
        }
    }

    /// Render this error as a response envelope: `{error: {code, message}}`
    ///
    /// For `NotFound` and `InvalidRequest` the message is the bare client-facing text,
    /// for everything else the full display string.
    pub fn into_response(self) -> MockResponse {
        let status = self.status_code();
        let message = match &self {
            Self::NotFound { message } | Self::InvalidRequest { message } => message.clone(),
            other => other.to_string(),
        };

        MockResponse::json(
            status,
            json!({
                "error": {
                    "code": status.as_u16(),
                    "message": message,
                }
            }),
        )
    }
}

/// Implement conversion from std::io::Error
impl From<std::io::Error> for MockError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Implement conversion from serde_json::Error
impl From<serde_json::Error> for MockError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

/// Implement conversion from serde_yaml::Error
impl From<serde_yaml::Error> for MockError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}

/// Implement conversion from reqwest::Error
impl From<reqwest::Error> for MockError {
    fn from(err: reqwest::Error) -> Self {
        Self::Passthrough {
            message: err.to_string(),
        }
    }
}

impl From<MockError> for MockResponse {
    fn from(err: MockError) -> Self {
        err.into_response()
    }
}
