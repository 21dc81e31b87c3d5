//! Error types for the API client.

use thiserror::Error;

/// Result type alias using `ClientError`.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur when talking to the flag management API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client configuration is invalid (bad token characters, bad base URL).
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Every connection attempt failed.
    #[error("Request to {url} failed after {attempts} attempt(s): {source}")]
    ConnectionFailed {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The route quota stayed exhausted for the whole throttle budget.
    #[error("Rate limit exceeded for {path}, please try again later")]
    RateLimitExceeded { path: String },

    /// The API answered with a non-success status.
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// Response body was not the JSON document we expected.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Transport error while reading a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// Status code carried by the error, if the API answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure happened before any response was received.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectionFailed { .. } | ClientError::Http(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status() {
        let err = ClientError::Api {
            status: 409,
            body: "{}".into(),
        };
        assert_eq!(err.status(), Some(409));
        assert!(!err.is_network());
    }

    #[test]
    fn test_rate_limit_message() {
        let err = ClientError::RateLimitExceeded {
            path: "/flags/p".into(),
        };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded for /flags/p, please try again later"
        );
        assert_eq!(err.status(), None);
    }
}
