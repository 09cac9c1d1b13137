//! Error types for the InfluxDB template.
//!
//! Two layers exist: [`ClientError`] is raised by an [`InfluxClient`](crate::client::InfluxClient)
//! talking to the server, [`InfluxError`] is what the factory and template return.
//! Client failures pass through [`InfluxError::Client`] untouched.

use thiserror::Error;

/// Errors raised by a client while talking to the server.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// A statement-level error reported inside a successful response.
    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Invalid point: {message}")]
    InvalidPoint { message: String },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl ClientError {
    /// Create a server error.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Create a statement-level query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an invalid point error.
    pub fn invalid_point(message: impl Into<String>) -> Self {
        Self::InvalidPoint {
            message: message.into(),
        }
    }

    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Check if this error is worth retrying.
    ///
    /// Nothing in this crate retries; the flag is for callers layering their own policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect(),
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Errors returned by the connection factory and the template.
#[derive(Error, Debug)]
pub enum InfluxError {
    #[error("InfluxDB properties must be specified")]
    ConfigurationMissing,

    #[error("Incomplete configuration: missing {}", .missing.join(", "))]
    IncompleteConfiguration { missing: Vec<&'static str> },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl InfluxError {
    /// Create an incomplete configuration error.
    pub fn incomplete(missing: Vec<&'static str>) -> Self {
        Self::IncompleteConfiguration { missing }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Get the underlying client error, if this is a delegated failure.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Client(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for factory and template operations.
pub type InfluxResult<T> = Result<T, InfluxError>;
