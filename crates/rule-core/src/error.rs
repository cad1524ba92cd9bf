//! Error types for mcp-rule.

use thiserror::Error;

/// Main error type for Rule.io operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Network or connection failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Missing or rejected API key
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed fields on a write
    #[error("Validation error: {0}")]
    Validation(String),

    /// API returned an unclassified error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// No route for the requested method and path
    #[error("Unsupported operation: {method} {path}")]
    UnsupportedOperation { method: String, path: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => Error::Validation(message),
            401 | 403 => Error::Unauthorized(message),
            404 => Error::NotFound(message),
            _ => Error::Api { status, message },
        }
    }

    /// Stable string code for this error kind.
    ///
    /// These codes are part of the adapter's response contract.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthorized(_) => "AuthenticationError",
            Error::NotFound(_) => "NotFoundError",
            Error::Validation(_) => "ValidationError",
            Error::Http(_) => "TransportError",
            Error::UnsupportedOperation { .. } => "UnsupportedOperationError",
            Error::Api { .. } => "ApiError",
            Error::InvalidData(_) | Error::Serialization(_) => "InvalidResponseError",
            Error::Config(_) | Error::Storage(_) | Error::Other(_) => "InternalError",
        }
    }

    /// Status code to report for this error in an adapter response.
    pub fn status(&self) -> u16 {
        match self {
            Error::Unauthorized(_) => 401,
            Error::NotFound(_) => 404,
            Error::Validation(_) => 400,
            Error::Http(_) | Error::InvalidData(_) | Error::Serialization(_) => 502,
            Error::UnsupportedOperation { .. } => 404,
            Error::Api { status, .. } => *status,
            Error::Config(_) | Error::Storage(_) | Error::Other(_) => 500,
        }
    }
}

/// Result type alias for Rule.io operations.
pub type Result<T> = std::result::Result<T, Error>;
