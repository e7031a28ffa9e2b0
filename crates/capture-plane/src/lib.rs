//! Capture Plane
//!
//! An in-memory trust service implementing the capture attestation wire
//! contract. It exists for local development and end-to-end tests of the
//! device client; it performs no media verification of its own.
//!
//! ## API Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check with issuer info
//! - `POST /devices` - Register a device (201 | 400 | 409)
//! - `POST /capture/session` - Open a capture session (201 | 401)
//! - `POST /capture/trust` - Exchange a nonce for a trust token (200 | 400 | 401 | 410)
//!
//! ## Session rules
//!
//! 1. A nonce belongs to the device that opened its session
//! 2. A nonce is redeemed at most once
//! 3. A nonce is dead once `now >= expires_at`

pub mod api;
pub mod keys;
pub mod state;
pub mod storage;

pub use api::create_router;
pub use keys::{IssuerError, TokenIssuer, TrustClaims, TrustTokenSigner};
pub use state::{AppState, PlaneConfig};
pub use storage::{DeviceRecord, DeviceStore, MemoryStore, SessionRecord, StorageError};
