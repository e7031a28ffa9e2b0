//! # Capture Core
//!
//! Core types and cryptographic primitives for the capture attestation
//! protocol: proving that a piece of captured media came from a specific
//! device, at a known time, inside a session vouched for by a trust service.
//!
//! ## Key Concepts
//!
//! - **Media integrity**: SHA-256 content hash bound to a capture session and
//!   a capture time, signed by a hardware-held P-256 key
//! - **Canonical message**: `"{content_hash}:{capture_id}:{captured_at}"`,
//!   the exact string the hardware key signs
//! - **Trust token**: server-issued credential proving a session nonce was
//!   exchanged by a registered device
//! - **Sidecar**: versioned JSON artifact stored next to the media, carrying
//!   both proofs
//!
//! Nothing in this crate performs network I/O. The device-side protocol
//! lives in `capture-client`.

pub mod crypto;
pub mod error;
pub mod integrity;
pub mod sidecar;
pub mod types;

pub use crypto::{compute_hash, HardwareSigner, SoftwareSigner};
pub use error::{CaptureCoreError, Result};
pub use integrity::{build_message, format_captured_at, verify_integrity, MediaIntegrityGenerator};
pub use sidecar::{CaptureTrust, Sidecar, SidecarAssembler, SIDECAR_VERSION};
pub use types::{CaptureSession, DeviceIdentity, MediaIntegrity, TrustToken};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the library version
pub fn version() -> &'static str {
    VERSION
}
