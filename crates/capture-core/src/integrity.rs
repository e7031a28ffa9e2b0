//! Media integrity proofs
//!
//! A proof binds the exact media bytes to a capture session and a capture
//! time under a hardware signature. Generation runs in a fixed order:
//!
//! 1. SHA-256 over the content exactly as it will be persisted
//! 2. capture time as ISO-8601 UTC, whole seconds, `Z` suffix
//! 3. canonical message `"{content_hash}:{capture_id}:{captured_at}"`
//! 4. hardware signature over the UTF-8 message, base64-encoded
//! 5. current public key, base64-encoded
//!
//! The message layout is fixed: changing field order or the delimiter breaks
//! verification of every proof issued by earlier versions.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::crypto::{compute_hash, verify_with_public_key, HardwareSigner};
use crate::error::{CaptureCoreError, Result};
use crate::types::MediaIntegrity;

/// Format a capture time as ISO-8601 UTC with whole seconds and a `Z` suffix
pub fn format_captured_at(captured_at: DateTime<Utc>) -> String {
    captured_at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build the canonical message that the hardware key signs
pub fn build_message(content_hash: &str, capture_id: &str, captured_at: &str) -> String {
    format!("{}:{}:{}", content_hash, capture_id, captured_at)
}

/// Produces media integrity proofs with a hardware signer
pub struct MediaIntegrityGenerator {
    signer: Arc<dyn HardwareSigner>,
}

impl MediaIntegrityGenerator {
    /// Create a generator around a signing capability
    pub fn new(signer: Arc<dyn HardwareSigner>) -> Self {
        Self { signer }
    }

    /// Create the signing key if the hardware does not hold one yet
    ///
    /// `generate` never creates keys on its own; a missing key is a hard
    /// failure there.
    pub fn prepare_key(&self) -> Result<()> {
        if self.signer.key_exists() {
            return Ok(());
        }
        debug!(signer = self.signer.description(), "Creating signing key");
        self.signer.create_key()
    }

    /// Generate the integrity proof for `content` captured in `capture_id`
    ///
    /// Any signing failure aborts the capture attempt: there is no proof
    /// without a hardware signature.
    pub fn generate(
        &self,
        content: &[u8],
        capture_id: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<MediaIntegrity> {
        let content_hash = compute_hash(content);
        let captured_at = format_captured_at(captured_at);
        let message = build_message(&content_hash, capture_id, &captured_at);

        if !self.signer.key_exists() {
            warn!(signer = self.signer.description(), "No signing key present");
            return Err(CaptureCoreError::KeyNotFound);
        }

        let signature = self.signer.sign(message.as_bytes()).map_err(|e| {
            warn!(error = %e, capture_id = %capture_id, "Hardware signing failed");
            e
        })?;
        let public_key = self.signer.public_key()?;

        debug!(
            capture_id = %capture_id,
            content_hash = %content_hash,
            "Generated media integrity proof"
        );

        Ok(MediaIntegrity {
            content_hash,
            signature: STANDARD.encode(signature),
            public_key: STANDARD.encode(public_key),
            capture_id: capture_id.to_string(),
            captured_at,
        })
    }
}

/// Verify an integrity proof against content bytes
///
/// The canonical message is rebuilt from the *stored* fields and checked
/// against the *stored* public key. A content hash mismatch returns `false`
/// without touching the signature. Undecodable signature or key material
/// also yields `false`.
pub fn verify_integrity(integrity: &MediaIntegrity, content: &[u8]) -> Result<bool> {
    if compute_hash(content) != integrity.content_hash {
        debug!(capture_id = %integrity.capture_id, "Content hash mismatch");
        return Ok(false);
    }

    let message = build_message(
        &integrity.content_hash,
        &integrity.capture_id,
        &integrity.captured_at,
    );

    let (signature, public_key) = match (
        STANDARD.decode(&integrity.signature),
        STANDARD.decode(&integrity.public_key),
    ) {
        (Ok(signature), Ok(public_key)) => (signature, public_key),
        _ => return Ok(false),
    };

    match verify_with_public_key(&public_key, &signature, message.as_bytes()) {
        Ok(valid) => Ok(valid),
        Err(CaptureCoreError::Crypto(reason)) => {
            debug!(reason = %reason, "Unusable public key in integrity proof");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
