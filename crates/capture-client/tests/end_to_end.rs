//! End-to-end protocol tests
//!
//! Drives the device client over real HTTP against an in-process capture
//! plane bound to an ephemeral loopback port.

use std::sync::Arc;

use chrono::{Duration, Utc};

use capture_client::identity::{DEVICE_ID_KEY, DEVICE_TOKEN_KEY, EXTERNAL_ID_KEY};
use capture_client::{
    CaptureClient, ClientConfig, ClientError, CredentialStore, DeviceIdentityManager,
    HttpTransport, MemoryCredentialStore,
};
use capture_core::{compute_hash, verify_integrity, Sidecar, SoftwareSigner};
use capture_plane::{create_router, AppState, DeviceRecord, MemoryStore, PlaneConfig, TokenIssuer};

// =============================================================================
// Test Helpers
// =============================================================================

const PUBLISHER: &str = "pub-e2e";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("capture_client=debug,capture_plane=debug")
        .try_init();
}

async fn spawn_plane(config: PlaneConfig) -> (String, Arc<AppState>) {
    init_tracing();
    let issuer = TokenIssuer::generate("e2e-kid", config.issuer.clone()).unwrap();
    let state = Arc::new(AppState {
        issuer: Arc::new(issuer),
        store: Arc::new(MemoryStore::new()),
        config,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

fn capture_client(base_url: &str, store: Arc<MemoryCredentialStore>) -> CaptureClient {
    let signer = Arc::new(SoftwareSigner::generate());
    CaptureClient::with_http(ClientConfig::new(base_url, PUBLISHER), store, signer).unwrap()
}

fn identity_manager(base_url: &str, store: Arc<MemoryCredentialStore>) -> DeviceIdentityManager {
    // Loopback answers well inside a sub-second budget
    let config =
        ClientConfig::new(base_url, PUBLISHER).with_timeout(std::time::Duration::from_millis(800));
    let transport = Arc::new(HttpTransport::new(&config).unwrap());
    DeviceIdentityManager::new(Arc::new(config), store, transport)
}

// =============================================================================
// Full capture
// =============================================================================

#[tokio::test]
async fn test_full_capture_round_trip() {
    let (base_url, plane) = spawn_plane(PlaneConfig::default().with_publisher(PUBLISHER)).await;
    let store = Arc::new(MemoryCredentialStore::new());
    let client = capture_client(&base_url, store);

    client.prepare_signing_key().unwrap();
    let identity = client.ensure_registered(None).await.unwrap();
    let session = client.begin_capture().await.unwrap();
    let capture_id = session.capture_id.clone();

    let photo = b"\xff\xd8\xff\xe0 not really a jpeg";
    let sidecar = client.complete_capture(session, photo, Utc::now()).await.unwrap();

    assert_eq!(sidecar.capture_id(), capture_id);
    assert_eq!(sidecar.media_integrity.content_hash, compute_hash(photo));
    assert!(sidecar.verify_media(photo).unwrap());
    assert!(!sidecar.verify_media(b"edited").unwrap());

    let claims = plane.issuer.verify(sidecar.capture_trust.jwt.as_str()).unwrap();
    assert_eq!(claims.sub, identity.device_id);
    assert_eq!(claims.capture_id, capture_id);
    assert_eq!(claims.publisher_id, PUBLISHER);

    // The artifact survives a trip through disk
    let json = sidecar.to_json_pretty().unwrap();
    let restored = Sidecar::from_json(&json).unwrap();
    assert!(verify_integrity(&restored.media_integrity, photo).unwrap());
}

#[tokio::test]
async fn test_session_reused_after_success_is_rejected() {
    let (base_url, _plane) = spawn_plane(PlaneConfig::default()).await;
    let client = capture_client(&base_url, Arc::new(MemoryCredentialStore::new()));
    client.prepare_signing_key().unwrap();
    client.ensure_registered(None).await.unwrap();

    let session = client.begin_capture().await.unwrap();
    let nonce = session.nonce.clone();
    client.complete_capture(session, b"photo", Utc::now()).await.unwrap();

    let replay = client.exchange().exchange_trust_token(&nonce).await;
    assert!(matches!(replay, Err(ClientError::InvalidNonce)));
}

#[tokio::test]
async fn test_expired_session() {
    let config = PlaneConfig::default().with_session_ttl(Duration::zero());
    let (base_url, _plane) = spawn_plane(config).await;
    let client = capture_client(&base_url, Arc::new(MemoryCredentialStore::new()));
    client.prepare_signing_key().unwrap();
    client.ensure_registered(None).await.unwrap();

    let session = client.begin_capture().await.unwrap();
    let result = client.complete_capture(session, b"photo", Utc::now()).await;

    assert!(matches!(result, Err(ClientError::SessionExpired)));
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_unknown_publisher() {
    let (base_url, _plane) = spawn_plane(PlaneConfig::default().with_publisher("someone-else")).await;
    let store = Arc::new(MemoryCredentialStore::new());
    let manager = identity_manager(&base_url, store.clone());

    let result = manager.register_device(None).await;

    assert!(matches!(result, Err(ClientError::InvalidPublisher)));
    assert!(!store.exists(DEVICE_TOKEN_KEY).unwrap());
}

#[tokio::test]
async fn test_conflict_recovers_with_new_external_id() {
    let (base_url, plane) = spawn_plane(PlaneConfig::default()).await;

    // A previous install registered "E1" and then lost its token
    plane
        .store
        .insert_device(DeviceRecord {
            device_id: "old-device".into(),
            publisher_id: PUBLISHER.into(),
            external_id: "E1".into(),
            device_token: "old-token".into(),
            attestation_token: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    let store = Arc::new(MemoryCredentialStore::new());
    store.save(EXTERNAL_ID_KEY, b"E1").unwrap();

    let manager = identity_manager(&base_url, store.clone());
    let identity = manager.register_device(None).await.unwrap();

    assert_ne!(identity.external_id, "E1");
    assert_ne!(identity.device_id, "old-device");
    assert_eq!(
        store.read_string(EXTERNAL_ID_KEY).unwrap().as_deref(),
        Some(identity.external_id.as_str())
    );
    let server_side = plane
        .store
        .find_by_external_id(&identity.external_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(server_side.device_token, identity.device_token);
}

#[tokio::test]
async fn test_attestation_token_reaches_service() {
    let (base_url, plane) = spawn_plane(PlaneConfig::default()).await;
    let manager = identity_manager(&base_url, Arc::new(MemoryCredentialStore::new()));

    let identity = manager.register_device(Some("attest-abc".into())).await.unwrap();

    let record = plane
        .store
        .find_by_token(&identity.device_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.attestation_token.as_deref(), Some("attest-abc"));
}

#[tokio::test]
async fn test_concurrent_registration_stays_consistent() {
    let (base_url, plane) = spawn_plane(PlaneConfig::default()).await;
    let store = Arc::new(MemoryCredentialStore::new());
    let manager = Arc::new(identity_manager(&base_url, store.clone()));

    let a = tokio::spawn({
        let manager = manager.clone();
        async move { manager.register_device(None).await }
    });
    let b = tokio::spawn({
        let manager = manager.clone();
        async move { manager.register_device(None).await }
    });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    // Whatever interleaving happened, the stored triple names one server record
    let token = store.read_string(DEVICE_TOKEN_KEY).unwrap().unwrap();
    let device_id = store.read_string(DEVICE_ID_KEY).unwrap().unwrap();
    let external_id = store.read_string(EXTERNAL_ID_KEY).unwrap().unwrap();

    let record = plane.store.find_by_token(&token).await.unwrap().unwrap();
    assert_eq!(record.device_id, device_id);
    assert_eq!(record.external_id, external_id);
}

#[tokio::test]
async fn test_reset_then_reregister() {
    let (base_url, _plane) = spawn_plane(PlaneConfig::default()).await;
    let store = Arc::new(MemoryCredentialStore::new());
    let client = capture_client(&base_url, store.clone());

    let first = client.ensure_registered(None).await.unwrap();
    client.identity().reset_credentials().await.unwrap();
    assert!(!client.identity().is_registered().unwrap());

    let second = client.ensure_registered(None).await.unwrap();
    assert_ne!(first.device_id, second.device_id);
    assert_ne!(first.external_id, second.external_id);
}

#[tokio::test]
async fn test_stale_token_is_unauthorized() {
    let (base_url, _plane) = spawn_plane(PlaneConfig::default()).await;
    let store = Arc::new(MemoryCredentialStore::new());
    store.save(EXTERNAL_ID_KEY, b"ext-stale").unwrap();
    store.save(DEVICE_ID_KEY, b"dev-stale").unwrap();
    store.save(DEVICE_TOKEN_KEY, b"revoked").unwrap();
    let client = capture_client(&base_url, store);

    let result = client.begin_capture().await;
    assert!(matches!(result, Err(ClientError::Unauthorized)));
}
