//! Error types for adapters.

use thiserror::Error;

/// A required setting is missing or unusable.
///
/// Raised while building a client, before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Setting absent or blank.
    #[error("missing required setting '{key}'")]
    Missing { key: String },

    /// Setting present but not usable.
    #[error("invalid setting '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigurationError {
    pub fn missing(key: impl Into<String>) -> Self {
        ConfigurationError::Missing { key: key.into() }
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigurationError::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// A request against the board API failed.
///
/// Every variant names the endpoint path so the message can be shown to the
/// user as is. Credentials never appear in the endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-success HTTP status.
    #[error("request to {endpoint} failed with HTTP status {status}")]
    Http { endpoint: String, status: u16 },

    /// The API rejected the key or token.
    #[error("authentication rejected by {endpoint}: check the API key and token")]
    Auth { endpoint: String },

    /// The server could not be reached.
    #[error("connection to {endpoint} failed: {message}")]
    Connection { endpoint: String, message: String },

    /// Timeout waiting for response.
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    /// Response body did not have the expected shape.
    #[error("failed to parse response from {endpoint}: {message}")]
    Parse { endpoint: String, message: String },
}

impl FetchError {
    /// The endpoint path the failing request was sent to.
    pub fn endpoint(&self) -> &str {
        match self {
            FetchError::Http { endpoint, .. }
            | FetchError::Auth { endpoint }
            | FetchError::Connection { endpoint, .. }
            | FetchError::Timeout { endpoint }
            | FetchError::Parse { endpoint, .. } => endpoint,
        }
    }

    #[cfg(feature = "trello")]
    pub(crate) fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        // The request URL carries the key and token as query parameters.
        let err = err.without_url();
        let endpoint = endpoint.to_string();
        if err.is_timeout() {
            FetchError::Timeout { endpoint }
        } else if err.is_decode() {
            FetchError::Parse {
                endpoint,
                message: err.to_string(),
            }
        } else {
            FetchError::Connection {
                endpoint,
                message: err.to_string(),
            }
        }
    }
}
