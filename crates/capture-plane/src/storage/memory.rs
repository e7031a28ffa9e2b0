//! In-memory storage backend
//!
//! Default storage implementation using in-memory hashmaps.
//! Data is lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use super::{DeviceRecord, DeviceStore, SessionRecord, StorageError};

#[derive(Debug, Default)]
struct Devices {
    /// device_id -> record
    by_id: HashMap<String, DeviceRecord>,
    /// external_id -> device_id
    external_ids: HashMap<String, String>,
    /// device_token -> device_id
    tokens: HashMap<String, String>,
}

/// In-memory device store implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    devices: RwLock<Devices>,
    /// nonce -> session
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn devices(&self) -> Result<RwLockReadGuard<'_, Devices>, StorageError> {
        self.devices.read().map_err(|_| poisoned())
    }

    fn devices_mut(&self) -> Result<RwLockWriteGuard<'_, Devices>, StorageError> {
        self.devices.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> StorageError {
    StorageError::Backend("lock poisoned".into())
}

/// Ownership, prior use, then expiry
fn redeemable(session: &SessionRecord, device_id: &str, now: DateTime<Utc>) -> Result<(), StorageError> {
    if session.device_id != device_id {
        return Err(StorageError::WrongDevice);
    }
    if session.consumed_at.is_some() {
        return Err(StorageError::AlreadyConsumed(session.capture_id.clone()));
    }
    if now >= session.expires_at {
        return Err(StorageError::Expired(session.capture_id.clone()));
    }
    Ok(())
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn insert_device(&self, device: DeviceRecord) -> Result<(), StorageError> {
        let mut devices = self.devices_mut()?;
        if devices.external_ids.contains_key(&device.external_id) {
            return Err(StorageError::AlreadyExists(device.external_id));
        }

        info!(
            device_id = %device.device_id,
            external_id = %device.external_id,
            publisher = %device.publisher_id,
            "Registering device"
        );
        devices
            .external_ids
            .insert(device.external_id.clone(), device.device_id.clone());
        devices
            .tokens
            .insert(device.device_token.clone(), device.device_id.clone());
        devices.by_id.insert(device.device_id.clone(), device);
        Ok(())
    }

    async fn find_by_token(&self, device_token: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let devices = self.devices()?;
        Ok(devices
            .tokens
            .get(device_token)
            .and_then(|id| devices.by_id.get(id))
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let devices = self.devices()?;
        Ok(devices
            .external_ids
            .get(external_id)
            .and_then(|id| devices.by_id.get(id))
            .cloned())
    }

    async fn device_count(&self) -> Result<usize, StorageError> {
        Ok(self.devices()?.by_id.len())
    }

    async fn insert_session(&self, session: SessionRecord) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        if sessions.contains_key(&session.nonce) {
            return Err(StorageError::AlreadyExists(session.capture_id));
        }
        debug!(capture_id = %session.capture_id, device_id = %session.device_id, "Session opened");
        sessions.insert(session.nonce.clone(), session);
        Ok(())
    }

    async fn check_nonce(
        &self,
        nonce: &str,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, StorageError> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        let session = sessions
            .get(nonce)
            .ok_or_else(|| StorageError::NotFound("nonce".into()))?;
        redeemable(session, device_id, now)?;
        Ok(session.clone())
    }

    async fn consume_nonce(
        &self,
        nonce: &str,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, StorageError> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        let session = sessions
            .get_mut(nonce)
            .ok_or_else(|| StorageError::NotFound("nonce".into()))?;
        redeemable(session, device_id, now)?;

        session.consumed_at = Some(now);
        info!(capture_id = %session.capture_id, device_id = %device_id, "Nonce redeemed");
        Ok(session.clone())
    }
}
