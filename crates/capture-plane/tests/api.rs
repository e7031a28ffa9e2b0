//! HTTP contract tests for the capture plane
//!
//! Each test binds a fresh server to an ephemeral loopback port and drives
//! it with a plain HTTP client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use capture_plane::{
    create_router, AppState, IssuerError, MemoryStore, PlaneConfig, TokenIssuer, TrustClaims,
    TrustTokenSigner,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{json, Value};

// =============================================================================
// Test Helpers
// =============================================================================

struct Plane {
    base_url: String,
    state: Arc<AppState>,
    http: reqwest::Client,
}

/// Signer whose first signature attempt fails
struct FlakySigner {
    inner: TokenIssuer,
    failed: AtomicBool,
}

impl TrustTokenSigner for FlakySigner {
    fn kid(&self) -> &str {
        self.inner.kid()
    }

    fn issuer(&self) -> &str {
        self.inner.issuer()
    }

    fn public_key_pem(&self) -> &str {
        self.inner.public_key_pem()
    }

    fn issue(
        &self,
        device_id: &str,
        capture_id: &str,
        publisher_id: &str,
        issued_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<String, IssuerError> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(IssuerError::Unavailable("key busy".into()));
        }
        self.inner.issue(device_id, capture_id, publisher_id, issued_at)
    }

    fn verify(&self, token: &str) -> Result<TrustClaims, IssuerError> {
        self.inner.verify(token)
    }
}

async fn spawn(config: PlaneConfig) -> Plane {
    let issuer = TokenIssuer::generate("test-kid", config.issuer.clone()).unwrap();
    spawn_with(config, Arc::new(issuer)).await
}

async fn spawn_with(config: PlaneConfig, issuer: Arc<dyn TrustTokenSigner>) -> Plane {
    let state = Arc::new(AppState {
        issuer,
        store: Arc::new(MemoryStore::new()),
        config,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Plane {
        base_url: format!("http://{}", addr),
        state,
        http: reqwest::Client::new(),
    }
}

impl Plane {
    async fn register(&self, publisher: &str, external_id: &str) -> (u16, Value) {
        let response = self
            .http
            .post(format!("{}/devices", self.base_url))
            .header("X-Publisher-ID", publisher)
            .json(&json!({ "external_id": external_id }))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn open_session(&self, token: &str) -> (u16, Value) {
        let response = self
            .http
            .post(format!("{}/capture/session", self.base_url))
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn exchange(&self, token: &str, nonce: &str) -> (u16, Value) {
        let response = self
            .http
            .post(format!("{}/capture/trust", self.base_url))
            .bearer_auth(token)
            .json(&json!({ "nonce": nonce }))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn registered_token(&self, external_id: &str) -> String {
        let (status, body) = self.register("pub-1", external_id).await;
        assert_eq!(status, 201);
        body["device_token"].as_str().unwrap().to_string()
    }
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_device() {
    let plane = spawn(PlaneConfig::default()).await;

    let (status, body) = plane.register("pub-1", "ext-1").await;

    assert_eq!(status, 201);
    assert_eq!(body["publisher_id"], "pub-1");
    assert_eq!(body["external_id"], "ext-1");
    assert!(!body["device_id"].as_str().unwrap().is_empty());
    assert!(!body["device_token"].as_str().unwrap().is_empty());
    assert!(body["created_at"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_register_conflict() {
    let plane = spawn(PlaneConfig::default()).await;

    plane.register("pub-1", "ext-1").await;
    let (status, body) = plane.register("pub-1", "ext-1").await;

    assert_eq!(status, 409);
    assert_eq!(body["code"], "ALREADY_REGISTERED");
}

#[tokio::test]
async fn test_register_unknown_publisher() {
    let plane = spawn(PlaneConfig::default().with_publisher("pub-1")).await;

    let (status, body) = plane.register("pub-2", "ext-1").await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_PUBLISHER");

    let (status, _) = plane.register("", "ext-1").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_register_empty_external_id() {
    let plane = spawn(PlaneConfig::default()).await;

    let (status, _) = plane.register("pub-1", "  ").await;
    assert_eq!(status, 400);
}

// =============================================================================
// Sessions and Trust Exchange
// =============================================================================

#[tokio::test]
async fn test_session_requires_known_token() {
    let plane = spawn(PlaneConfig::default()).await;

    let (status, body) = plane.open_session("not-a-token").await;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_session_and_exchange() {
    let plane = spawn(PlaneConfig::default()).await;
    let token = plane.registered_token("ext-1").await;

    let (status, session) = plane.open_session(&token).await;
    assert_eq!(status, 201);
    let capture_id = session["capture_id"].as_str().unwrap().to_string();
    let nonce = session["nonce"].as_str().unwrap().to_string();
    assert!(session["expires_at"].is_string());

    let (status, body) = plane.exchange(&token, &nonce).await;
    assert_eq!(status, 200);

    let claims = plane
        .state
        .issuer
        .verify(body["trust_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.capture_id, capture_id);
    assert_eq!(claims.publisher_id, "pub-1");
}

#[tokio::test]
async fn test_nonce_reuse_rejected() {
    let plane = spawn(PlaneConfig::default()).await;
    let token = plane.registered_token("ext-1").await;
    let (_, session) = plane.open_session(&token).await;
    let nonce = session["nonce"].as_str().unwrap();

    let (first, _) = plane.exchange(&token, nonce).await;
    let (second, body) = plane.exchange(&token, nonce).await;

    assert_eq!(first, 200);
    assert_eq!(second, 400);
    assert_eq!(body["code"], "INVALID_NONCE");
}

#[tokio::test]
async fn test_nonce_bound_to_device() {
    let plane = spawn(PlaneConfig::default()).await;
    let alice = plane.registered_token("ext-alice").await;
    let mallory = plane.registered_token("ext-mallory").await;
    let (_, session) = plane.open_session(&alice).await;
    let nonce = session["nonce"].as_str().unwrap();

    let (stolen, _) = plane.exchange(&mallory, nonce).await;
    assert_eq!(stolen, 400);

    let (owner, _) = plane.exchange(&alice, nonce).await;
    assert_eq!(owner, 200);
}

#[tokio::test]
async fn test_expired_session_is_gone() {
    let config = PlaneConfig::default().with_session_ttl(chrono::Duration::zero());
    let plane = spawn(config).await;
    let token = plane.registered_token("ext-1").await;
    let (_, session) = plane.open_session(&token).await;

    let (status, body) = plane
        .exchange(&token, session["nonce"].as_str().unwrap())
        .await;

    assert_eq!(status, 410);
    assert_eq!(body["code"], "SESSION_EXPIRED");
}

#[tokio::test]
async fn test_signing_failure_keeps_nonce_redeemable() {
    let config = PlaneConfig::default();
    let signer = FlakySigner {
        inner: TokenIssuer::generate("test-kid", config.issuer.clone()).unwrap(),
        failed: AtomicBool::new(false),
    };
    let plane = spawn_with(config, Arc::new(signer)).await;
    let token = plane.registered_token("ext-1").await;
    let (_, session) = plane.open_session(&token).await;
    let nonce = session["nonce"].as_str().unwrap();

    let (first, body) = plane.exchange(&token, nonce).await;
    assert_eq!(first, 500);
    assert_eq!(body["code"], "INTERNAL_ERROR");

    let (second, body) = plane.exchange(&token, nonce).await;
    assert_eq!(second, 200);
    assert!(plane.state.issuer.verify(body["trust_token"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_unknown_nonce() {
    let plane = spawn(PlaneConfig::default()).await;
    let token = plane.registered_token("ext-1").await;

    let (status, _) = plane.exchange(&token, "made-up").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_concurrent_exchange_single_winner() {
    let plane = Arc::new(spawn(PlaneConfig::default()).await);
    let token = plane.registered_token("ext-1").await;
    let (_, session) = plane.open_session(&token).await;
    let nonce = session["nonce"].as_str().unwrap().to_string();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let plane = plane.clone();
        let token = token.clone();
        let nonce = nonce.clone();
        handles.push(tokio::spawn(async move { plane.exchange(&token, &nonce).await.0 }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() == 200 {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn test_health_and_ready() {
    let plane = spawn(PlaneConfig::default()).await;
    plane.registered_token("ext-1").await;

    let health: Value = plane
        .http
        .get(format!("{}/health", plane.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let ready: Value = plane
        .http
        .get(format!("{}/ready", plane.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ready["kid"], "test-kid");
    assert_eq!(ready["device_count"], 1);
}

#[tokio::test]
async fn test_ready_key_verifies_trust_tokens() {
    let plane = spawn(PlaneConfig::default()).await;
    let token = plane.registered_token("ext-1").await;
    let (_, session) = plane.open_session(&token).await;
    let (_, body) = plane.exchange(&token, session["nonce"].as_str().unwrap()).await;

    let ready: Value = plane
        .http
        .get(format!("{}/ready", plane.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let pem = ready["public_key_pem"].as_str().unwrap();

    // A relying party needs nothing but the published key
    let key = DecodingKey::from_ec_pem(pem.as_bytes()).unwrap();
    let mut validation = Validation::new(Algorithm::ES256);
    validation.set_issuer(&["capture-plane"]);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    let claims = decode::<TrustClaims>(body["trust_token"].as_str().unwrap(), &key, &validation)
        .unwrap()
        .claims;
    assert_eq!(claims.capture_id, session["capture_id"].as_str().unwrap());
}
