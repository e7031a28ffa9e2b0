//! Error types for the capture client

use capture_core::CaptureCoreError;
use thiserror::Error;

/// Result type for capture client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur in the capture trust protocol
#[derive(Error, Debug)]
pub enum ClientError {
    /// The trust service rejected the publisher identifier
    #[error("Invalid publisher identifier")]
    InvalidPublisher,

    /// Registration conflicted again after regenerating the external id
    #[error("Device is already registered with the trust service")]
    AlreadyRegistered,

    /// No device credential is stored
    #[error("Device is not registered")]
    DeviceNotRegistered,

    /// The device credential was rejected
    #[error("Device credential rejected by the trust service")]
    Unauthorized,

    /// The nonce is unknown, malformed or already used
    #[error("Nonce is invalid or already used")]
    InvalidNonce,

    /// The session's nonce existed but its window has passed
    #[error("Capture session expired")]
    SessionExpired,

    /// Any other non-success HTTP status
    #[error("HTTP error {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Http { status: u16, message: Option<String> },

    /// The trust service could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The trust service answered with an unexpected body
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Secure credential store failure
    #[error("Credential store error: {0}")]
    Storage(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Media integrity generation failed
    #[error("Media integrity error: {0}")]
    Integrity(#[from] CaptureCoreError),
}

/// Recovery-oriented grouping of client errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad configuration; fatal, never retried
    Configuration,
    /// Missing or rejected credential; re-register the device
    Authorization,
    /// Session or nonce state; start a new capture session
    ProtocolState,
    /// Network or malformed responses; safe to retry the whole operation
    Transport,
    /// Signing hardware; fatal to the current capture
    Hardware,
    /// Local credential store
    Storage,
}

impl ClientError {
    /// Classify the error by the recovery it calls for
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::InvalidPublisher | ClientError::Config(_) => ErrorCategory::Configuration,
            ClientError::Unauthorized | ClientError::DeviceNotRegistered => {
                ErrorCategory::Authorization
            }
            ClientError::AlreadyRegistered
            | ClientError::InvalidNonce
            | ClientError::SessionExpired => ErrorCategory::ProtocolState,
            ClientError::Http { .. }
            | ClientError::Network(_)
            | ClientError::InvalidResponse(_) => ErrorCategory::Transport,
            ClientError::Integrity(_) => ErrorCategory::Hardware,
            ClientError::Storage(_) => ErrorCategory::Storage,
        }
    }

    /// Whether retrying the whole operation later can succeed as-is
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::InvalidResponse(err.to_string())
    }
}
