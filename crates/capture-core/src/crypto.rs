//! Cryptographic primitives for media integrity proofs
//!
//! Content is hashed with SHA-256 and the canonical message is signed with
//! ECDSA P-256 (SHA-256 digest, DER-encoded signatures), the algorithm
//! offered by mobile secure hardware.
//!
//! Key types:
//! - `HardwareSigner`: capability trait over a non-exportable signing key
//! - `SoftwareSigner`: in-memory implementation for development and tests
//! - `verify_with_public_key`: offline verification against a SEC1 point

use crate::error::{CaptureCoreError, Result};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::sync::RwLock;
use tracing::info;

/// Length of an uncompressed P-256 public key (0x04 || X || Y)
pub const UNCOMPRESSED_POINT_LEN: usize = 65;

/// Compute the lowercase hex SHA-256 of `content`
pub fn compute_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Capability interface over a platform signing key
///
/// The private key is generated and held by the platform (secure enclave,
/// keystore, TPM) and never leaves it. Implementations must be thread-safe;
/// the protocol treats the signer as an externally synchronized singleton.
pub trait HardwareSigner: Send + Sync {
    /// Whether the signing key has been created
    fn key_exists(&self) -> bool;

    /// Create the signing key. Replaces nothing if one already exists.
    fn create_key(&self) -> Result<()>;

    /// Uncompressed SEC1 encoding of the public key (65 bytes)
    fn public_key(&self) -> Result<Vec<u8>>;

    /// Sign `data` with the hardware key
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Verify `signature` over `data` with the hardware key's public half
    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<bool>;

    /// Get a description of this signer (for logging)
    fn description(&self) -> &str {
        "hardware signer"
    }
}

/// Software-backed signer (development/testing only)
///
/// Keeps the P-256 key in process memory, with none of the custody
/// guarantees of real secure hardware.
pub struct SoftwareSigner {
    key: RwLock<Option<SigningKey>>,
}

impl std::fmt::Debug for SoftwareSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareSigner")
            .field("key_exists", &self.key_exists())
            .finish()
    }
}

impl SoftwareSigner {
    /// Create a signer with no key yet
    pub fn new() -> Self {
        Self {
            key: RwLock::new(None),
        }
    }

    /// Create a signer with a freshly generated key
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Create a signer around an existing key
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self {
            key: RwLock::new(Some(signing_key)),
        }
    }

    fn with_key<T>(&self, f: impl FnOnce(&SigningKey) -> Result<T>) -> Result<T> {
        let guard = self
            .key
            .read()
            .map_err(|_| CaptureCoreError::HardwareUnavailable("key slot lock poisoned".into()))?;
        match guard.as_ref() {
            Some(key) => f(key),
            None => Err(CaptureCoreError::KeyNotFound),
        }
    }
}

impl Default for SoftwareSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareSigner for SoftwareSigner {
    fn key_exists(&self) -> bool {
        self.key.read().map(|k| k.is_some()).unwrap_or(false)
    }

    fn create_key(&self) -> Result<()> {
        let mut guard = self
            .key
            .write()
            .map_err(|_| CaptureCoreError::HardwareUnavailable("key slot lock poisoned".into()))?;
        if guard.is_none() {
            *guard = Some(SigningKey::random(&mut OsRng));
            info!("Generated software signing key");
        }
        Ok(())
    }

    fn public_key(&self) -> Result<Vec<u8>> {
        self.with_key(|key| {
            Ok(key
                .verifying_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec())
        })
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.with_key(|key| {
            let signature: Signature = key
                .try_sign(data)
                .map_err(|e| CaptureCoreError::Signing(e.to_string()))?;
            Ok(signature.to_der().as_bytes().to_vec())
        })
    }

    fn verify(&self, signature: &[u8], data: &[u8]) -> Result<bool> {
        self.with_key(|key| Ok(verify_with_key(key.verifying_key(), signature, data)))
    }

    fn description(&self) -> &str {
        "software P-256 signer"
    }
}

/// Verify an ECDSA P-256 signature against an uncompressed SEC1 public key
///
/// Accepts DER signatures as produced by platform keystores, and raw
/// 64-byte `r || s` signatures. An unparseable signature verifies as
/// `false`; an unparseable public key is an error.
pub fn verify_with_public_key(public_key: &[u8], signature: &[u8], data: &[u8]) -> Result<bool> {
    let verifying_key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|e| CaptureCoreError::Crypto(format!("Invalid public key: {}", e)))?;
    Ok(verify_with_key(&verifying_key, signature, data))
}

fn verify_with_key(verifying_key: &VerifyingKey, signature: &[u8], data: &[u8]) -> bool {
    let parsed = Signature::from_der(signature).or_else(|_| Signature::from_slice(signature));
    match parsed {
        Ok(signature) => verifying_key.verify(data, &signature).is_ok(),
        Err(_) => false,
    }
}
