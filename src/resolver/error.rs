//! Error types for link resolution.

use thiserror::Error;

/// Fallback message when the server rejects a link without saying why.
pub const GENERIC_REJECTION: &str = "Invalid response from server";

/// Errors returned by [`Resolver::resolve`](super::Resolver::resolve).
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// Transport-level failure (DNS, connection refused, TLS, broken body).
    #[error("network error contacting {endpoint}: {source}")]
    Network {
        /// Resolution endpoint that was contacted.
        endpoint: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint did not answer within the client timeout.
    #[error("request timeout contacting {endpoint}")]
    Timeout {
        /// Resolution endpoint that was contacted.
        endpoint: String,
    },

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP error! status: {status}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
    },

    /// The endpoint answered but its success discriminator was not `true`.
    ///
    /// Carries the server's own message when it provided one.
    #[error("{message}")]
    Rejected {
        /// Message passed through from the server, or [`GENERIC_REJECTION`].
        message: String,
    },

    /// The response body could not be understood or lacks required fields.
    #[error("invalid response from server: {reason}")]
    InvalidResponse {
        /// What was wrong with the body.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {reason}")]
    ClientBuild {
        /// Builder failure description.
        reason: String,
    },
}

/// Coarse grouping used to phrase resolution failures for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// Connectivity problem.
    Network,
    /// The track does not exist or is unavailable.
    NotFound,
    /// The server took too long.
    Timeout,
    /// Anything else.
    Other,
}

impl ResolutionError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn from_transport(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        let endpoint = endpoint.into();
        if source.is_timeout() {
            Self::Timeout { endpoint }
        } else {
            Self::Network { endpoint, source }
        }
    }

    /// Creates an HTTP status error.
    #[must_use]
    pub fn http_status(status: u16) -> Self {
        Self::HttpStatus { status }
    }

    /// Creates a rejection error, falling back to the generic message.
    #[must_use]
    pub fn rejected(message: Option<String>) -> Self {
        Self::Rejected {
            message: message.unwrap_or_else(|| GENERIC_REJECTION.to_string()),
        }
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Classifies the failure by inspecting its message text.
    ///
    /// Server-provided messages are free text, so the text is the only
    /// signal common to every variant.
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        let text = self.to_string();
        if text.contains("network") || text.contains("Network") {
            FailureCategory::Network
        } else if text.contains("404") || text.contains("not found") {
            FailureCategory::NotFound
        } else if text.contains("timeout") {
            FailureCategory::Timeout
        } else {
            FailureCategory::Other
        }
    }

    /// User-facing message for the failure category.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self.category() {
            FailureCategory::Network => "Network error. Please check your internet connection.",
            FailureCategory::NotFound => {
                "Track not found. The URL might be invalid or the track is unavailable."
            }
            FailureCategory::Timeout => {
                "Request timeout. The server is taking too long to respond."
            }
            FailureCategory::Other => {
                "Failed to process track. Please check the URL and try again."
            }
        }
    }
}
