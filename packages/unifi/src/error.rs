//! Error types for controller sessions and the certificate API

use thiserror::Error;

use crate::session::Flavor;

/// One failed login probe, kept for the exhausted-login report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    /// Endpoint path that was tried
    pub endpoint: String,
    /// Rendered failure
    pub error: String,
}

/// Controller client errors
#[derive(Debug, Error)]
pub enum UnifiError {
    /// Every candidate login endpoint failed
    #[error("all login attempts failed ({} endpoints tried)", attempts.len())]
    AuthExhausted {
        /// Failures in probe order
        attempts: Vec<LoginAttempt>,
    },

    /// The operation is not exposed by the controller flavor bound to this session
    #[error("{operation} is only supported on UniFi OS systems (session is {flavor})")]
    NotSupported {
        /// Operation name
        operation: &'static str,
        /// Flavor of the current session
        flavor: Flavor,
    },

    /// A request was attempted before a successful login
    #[error("session is not authenticated")]
    NotAuthenticated,

    /// The controller answered with a non-2xx status
    #[error("unexpected status code {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The request never produced a response
    #[error("failed to send request: {0}")]
    Network(String),

    /// A JWT-shaped token could not be read
    #[error("invalid token format: {0}")]
    TokenFormat(String),

    /// A 2xx response did not carry what the operation needs
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// JSON encoding or decoding failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The controller URL or an endpoint could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be built
    #[error("HTTP client initialization failed: {context}")]
    HttpClientInit {
        /// Underlying builder error
        source: Box<dyn std::error::Error + Send + Sync>,
        /// What was being built
        context: &'static str,
    },
}

impl UnifiError {
    /// HTTP status carried by this error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the controller rejected the session credentials
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, UnifiError>;
