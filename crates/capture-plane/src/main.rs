//! Capture Plane Server Binary
//!
//! Runs the reference trust service for capture attestation.

use std::env;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use capture_plane::{
    create_router, AppState, DeviceStore, MemoryStore, PlaneConfig, TokenIssuer, TrustTokenSigner,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_level = env::var("CAPTURE_PLANE_LOG_LEVEL")
        .unwrap_or_else(|_| "info".into())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let port: u16 = env::var("CAPTURE_PLANE_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()
        .map_err(|_| "CAPTURE_PLANE_PORT must be a valid port number")?;

    let kid = env::var("CAPTURE_PLANE_KID")
        .unwrap_or_else(|_| format!("capture-plane-{}", uuid::Uuid::new_v4()));

    let config = PlaneConfig::from_env();
    let issuer: Arc<dyn TrustTokenSigner> =
        Arc::new(TokenIssuer::generate(kid, config.issuer.clone())?);
    let store: Arc<dyn DeviceStore> = Arc::new(MemoryStore::new());

    info!(
        kid = %issuer.kid(),
        iss = %config.issuer,
        publishers = ?config.allowed_publishers,
        session_ttl_secs = config.session_ttl.num_seconds(),
        port = port,
        "Starting capture plane"
    );

    let state = Arc::new(AppState { issuer, store, config });
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, "Capture plane listening");

    axum::serve(listener, app).await?;
    Ok(())
}
