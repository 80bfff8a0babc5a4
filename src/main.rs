//! Gemini Relay - OpenAI-compatible front for the Gemini web client
//!
//! This is the main entry point for the relay server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::{info, warn};

use gemini_relay::{routes, AppState, Config, CredentialStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_relay=info,tower_http=info".into()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Gemini Relay");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    log_credentials(&CredentialStore::from_config(&config));

    routes::metrics::init_metrics();
    info!("Metrics initialized");

    let state = Arc::new(AppState::new(config.clone())?);
    info!("Application state initialized; Gemini session will be created on first request");

    let app = routes::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gemini Relay shutdown complete");
    Ok(())
}

/// Report which credentials are present, by fingerprint only
fn log_credentials(store: &CredentialStore) {
    if store.has_session_cookies() {
        info!(
            psid = !store.cookie_primary.is_empty(),
            psidts = !store.cookie_secondary.is_empty(),
            "Gemini session cookies configured"
        );
    } else {
        warn!("SECURE_1PSID / SECURE_1PSIDTS not set; chat requests will fail with 502");
    }

    if let Some(key) = &store.custom_key {
        info!(fingerprint = %key.fingerprint(), "API_KEY configured");
    }
    if let Some(token) = &store.platform_token {
        info!(fingerprint = %token.fingerprint(), "HF_TOKEN configured");
    }
    if store.is_open_mode() {
        warn!("No API_KEY or HF_TOKEN configured; running in open mode without authentication");
    }
}

/// Handle graceful shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating shutdown");
        }
    }
}
