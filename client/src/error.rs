//! Error types for the EventPass client

use eventpass_runtime::StoreError;
use thiserror::Error;

/// Errors produced by the booking API transport
///
/// `Clone` so failures can travel inside result actions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// A successful response carried a body that could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),

    /// The server answered with a non-2xx status
    ///
    /// `message` is the body's `message` field, or `HTTP <status>: <reason>`.
    #[error("{message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Message surfaced to the user
        message: String,
    },
}

impl ApiError {
    /// Build an HTTP error with the synthesized `HTTP <status>: <reason>` message
    #[must_use]
    pub fn from_status(status: u16, reason: &str) -> Self {
        Self::Http {
            status,
            message: format!("HTTP {status}: {reason}"),
        }
    }
}

/// Errors surfaced by the [`EventPassClient`](crate::handlers::EventPassClient) facade
#[derive(Debug, Error)]
pub enum ClientError {
    /// The store rejected the action
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A request failed and the failure propagates unmodified
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The feature has no backend support
    #[error("{0} is not available yet")]
    NotImplemented(&'static str),

    /// Navigation to a page the current identity may not see
    #[error("Navigation refused: {0}")]
    NavigationRefused(String),

    /// Markup could not be produced
    #[error("Render error: {0}")]
    Render(#[from] askama::Error),

    /// A result action never arrived
    #[error("No result for request {0}")]
    MissingResult(String),
}

/// Errors from reading configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to a value that cannot be used
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        /// Environment variable name
        var: &'static str,
        /// Value found
        value: String,
        /// Why it was rejected
        reason: String,
    },
}
