//! Storage abstraction for the capture plane
//!
//! Devices and capture sessions live behind [`DeviceStore`] so handlers
//! never touch the backing maps directly. Only an in-memory backend ships;
//! everything is lost on restart.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Nonce already redeemed: {0}")]
    AlreadyConsumed(String),

    #[error("Session expired: {0}")]
    Expired(String),

    #[error("Nonce issued to another device")]
    WrongDevice,

    #[error("Backend error: {0}")]
    Backend(String),
}

/// A registered device
#[derive(Clone)]
pub struct DeviceRecord {
    /// Server-assigned device id
    pub device_id: String,
    /// Publisher that registered the device
    pub publisher_id: String,
    /// Client-chosen external id, unique across the store
    pub external_id: String,
    /// Bearer credential for session and exchange calls
    pub device_token: String,
    /// Platform attestation forwarded at registration
    pub attestation_token: Option<String>,
    /// When the device was registered
    pub created_at: DateTime<Utc>,
}

impl Debug for DeviceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRecord")
            .field("device_id", &self.device_id)
            .field("publisher_id", &self.publisher_id)
            .field("external_id", &self.external_id)
            .field("device_token", &capture_core::types::redact(&self.device_token))
            .field("attested", &self.attestation_token.is_some())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// A capture session and the state of its nonce
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub capture_id: String,
    pub nonce: String,
    /// Device that opened the session
    pub device_id: String,
    pub expires_at: DateTime<Utc>,
    /// Set once the nonce has been exchanged
    pub consumed_at: Option<DateTime<Utc>>,
}

/// Storage backend trait for devices and sessions
///
/// Implementations must be thread-safe. [`DeviceStore::consume_nonce`] must
/// check and mark a nonce atomically so that concurrent exchanges of the
/// same nonce yield exactly one success.
#[async_trait]
pub trait DeviceStore: Send + Sync + Debug {
    /// Register a device; fails with `AlreadyExists` if its external id is taken
    async fn insert_device(&self, device: DeviceRecord) -> Result<(), StorageError>;

    /// Look up a device by its bearer token
    async fn find_by_token(&self, device_token: &str) -> Result<Option<DeviceRecord>, StorageError>;

    /// Look up a device by its external id
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<DeviceRecord>, StorageError>;

    /// Number of registered devices
    async fn device_count(&self) -> Result<usize, StorageError>;

    /// Store a freshly opened session
    async fn insert_session(&self, session: SessionRecord) -> Result<(), StorageError>;

    /// Run the redemption checks for `nonce` without consuming it
    async fn check_nonce(
        &self,
        nonce: &str,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, StorageError>;

    /// Redeem `nonce` on behalf of `device_id` at `now`
    ///
    /// Checks ownership, prior use and expiry in that order. Expired nonces
    /// are left unconsumed.
    async fn consume_nonce(
        &self,
        nonce: &str,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, StorageError>;
}
