//! Error types for capture attestation primitives

use thiserror::Error;

/// Result type alias using CaptureCoreError
pub type Result<T> = std::result::Result<T, CaptureCoreError>;

/// Errors that can occur while producing or checking capture proofs
#[derive(Error, Debug)]
pub enum CaptureCoreError {
    /// The hardware signing key has not been created yet
    #[error("Signing key not found")]
    KeyNotFound,

    /// The hardware signing capability cannot be used right now
    #[error("Hardware signing unavailable: {0}")]
    HardwareUnavailable(String),

    /// The hardware refused or failed to produce a signature
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Malformed key or signature material
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Base64 or hex decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CaptureCoreError {
    /// Whether this error originates from the signing hardware.
    ///
    /// Hardware errors are fatal to the current capture attempt.
    pub fn is_hardware(&self) -> bool {
        matches!(
            self,
            CaptureCoreError::KeyNotFound
                | CaptureCoreError::HardwareUnavailable(_)
                | CaptureCoreError::Signing(_)
        )
    }
}

impl From<p256::ecdsa::Error> for CaptureCoreError {
    fn from(err: p256::ecdsa::Error) -> Self {
        CaptureCoreError::Crypto(err.to_string())
    }
}

impl From<base64::DecodeError> for CaptureCoreError {
    fn from(err: base64::DecodeError) -> Self {
        CaptureCoreError::Encoding(err.to_string())
    }
}

impl From<serde_json::Error> for CaptureCoreError {
    fn from(err: serde_json::Error) -> Self {
        CaptureCoreError::Serialization(err.to_string())
    }
}
