//! EMT client error types

use thiserror::Error;

/// Errors that can occur while talking to the EMT open API
#[derive(Debug, Error)]
pub enum EmtError {
    /// The exchange could not be completed, or the server answered with a
    /// non-2xx HTTP status
    #[error("Network error{}: {reason}", status_suffix(.status))]
    Network {
        /// HTTP status code, `None` when no response was received
        status: Option<u16>,
        /// Human-readable cause
        reason: String,
    },

    /// The exchange completed but the operator rejected it with its own result code
    #[error("Server rejected request with code {code}: {description}")]
    Server {
        /// Operator result code (e.g. "80", "99")
        code: String,
        /// Operator-supplied description, empty when absent
        description: String,
    },

    /// The response body did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// An authenticated call was attempted before a successful login
    #[error("Not authenticated: login has not completed")]
    NotAuthenticated,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EmtError {
    /// Build a network error for a response that carried a non-2xx status
    pub(crate) fn http_status(status: reqwest::StatusCode) -> Self {
        Self::Network {
            status: Some(status.as_u16()),
            reason: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        }
    }

    /// Build a network error for a request that never produced a response
    pub(crate) fn no_response(reason: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            reason: reason.into(),
        }
    }

    /// Returns true if repeating the whole operation might succeed
    ///
    /// Nothing in this crate retries on its own; this is a hint for callers.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// The operator result code, if this is a server rejection
    #[must_use]
    pub fn server_code(&self) -> Option<&str> {
        match self {
            Self::Server { code, .. } => Some(code),
            _ => None,
        }
    }

    /// The HTTP status, if this is a network error that received a response
    #[must_use]
    pub const fn http_status_code(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            _ => None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl From<reqwest::Error> for EmtError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::Configuration(format!("invalid request: {err}"));
        }
        if err.is_timeout() {
            return Self::no_response(format!("request timed out: {err}"));
        }
        match err.status() {
            Some(status) => Self::Network {
                status: Some(status.as_u16()),
                reason: err.to_string(),
            },
            None => Self::no_response(err.to_string()),
        }
    }
}
