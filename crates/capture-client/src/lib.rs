//! Capture Client
//!
//! Device-side half of the capture trust protocol. It talks to the trust
//! service over its JSON wire contract and turns a captured photo into a
//! sidecar that binds two proofs together.
//!
//! ## Architecture
//!
//! - **Device Identity Manager**: registers the device once, recovering from
//!   a stale server-side record with exactly one retry
//! - **Capture Session Manager**: opens single-use, time-bounded sessions
//! - **Trust Exchange Client**: exchanges a session nonce for a trust token
//! - **CaptureClient**: orchestrates the above with the media integrity
//!   generator from `capture-core`
//!
//! Platform collaborators are injected as traits: `CredentialStore`,
//! `HardwareSigner`, `AttestationProvider` and `Transport`.
//!
//! ## Usage
//!
//! ```ignore
//! use capture_client::{CaptureClient, ClientConfig, MemoryCredentialStore};
//! use capture_core::SoftwareSigner;
//!
//! let config = ClientConfig::new("https://trust.example.com", "publisher-123");
//! let client = CaptureClient::with_http(
//!     config,
//!     Arc::new(MemoryCredentialStore::new()),
//!     Arc::new(SoftwareSigner::new()),
//! )?;
//!
//! client.prepare_signing_key()?;
//! client.ensure_registered(None).await?;
//!
//! let session = client.begin_capture().await?;
//! let photo = camera.capture();
//! let sidecar = client.complete_capture(session, &photo, Utc::now()).await?;
//! storage.persist(&photo, &sidecar.to_json()?)?;
//! ```

pub mod attestation;
pub mod capture;
pub mod config;
pub mod error;
pub mod exchange;
pub mod identity;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

pub use attestation::{AttestationProvider, NoAttestation, StaticAttestation};
pub use capture::CaptureClient;
pub use config::ClientConfig;
pub use error::{ClientError, ErrorCategory, Result};
pub use exchange::TrustExchangeClient;
pub use identity::DeviceIdentityManager;
pub use session::CaptureSessionManager;
pub use store::{CredentialStore, MemoryCredentialStore};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, MockTransport, Transport};
