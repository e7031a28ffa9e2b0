//! Secure credential store abstraction
//!
//! The platform store (keychain, keystore) is an opaque, durable key-value
//! store scoped to the installation. The protocol only needs four
//! operations, so it is modelled as a small trait with an in-memory
//! implementation for tests and development.

use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Durable, confidential key -> bytes storage
///
/// Implementations must be thread-safe. Writes are expected to be durable
/// once `save` returns.
pub trait CredentialStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    fn save(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Read the value under `key`
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Whether `key` holds a value
    fn exists(&self, key: &str) -> Result<bool>;

    /// Read the value under `key` as UTF-8
    fn read_string(&self, key: &str) -> Result<Option<String>> {
        match self.read(key)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| ClientError::Storage(format!("value for '{}' is not UTF-8", key))),
            None => Ok(None),
        }
    }
}

/// In-memory credential store
///
/// Useful for development and testing. Data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCredentialStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> ClientError {
    ClientError::Storage("credential store lock poisoned".into())
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        debug!(key = %key, "Saving credential");
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if entries.remove(key).is_some() {
            debug!(key = %key, "Deleted credential");
        }
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_read_delete() {
        let store = MemoryCredentialStore::new();

        store.save("device_token", b"tok").unwrap();
        assert!(store.exists("device_token").unwrap());
        assert_eq!(store.read("device_token").unwrap(), Some(b"tok".to_vec()));
        assert_eq!(store.read_string("device_token").unwrap(), Some("tok".to_string()));

        store.delete("device_token").unwrap();
        assert!(!store.exists("device_token").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_missing_key() {
        let store = MemoryCredentialStore::new();
        assert!(store.delete("nothing").is_ok());
    }

    #[test]
    fn test_non_utf8_value() {
        let store = MemoryCredentialStore::new();
        store.save("k", &[0xff, 0xfe]).unwrap();
        assert!(matches!(store.read_string("k"), Err(ClientError::Storage(_))));
    }
}
