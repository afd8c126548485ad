//! Chat Relay
//!
//! Single-process real-time chat relay: clients connect over WebSocket,
//! exchange text and media messages, pull history, search past messages, and
//! see a live roster of currently-active users.

pub mod auth;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod hub;
pub mod models;
pub mod presence;
pub mod session;
pub mod store;
pub mod ws;

use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::info;
use tracing_subscriber::EnvFilter;

use auth::TrustedTokenIdentity;
use broadcast::Broadcaster;
use config::{AppState, RelayConfig};
use hub::RelayHub;
use presence::PresenceTracker;
use session::SessionRegistry;
use store::MessageStore;

pub async fn run() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    let config = RelayConfig::from_env();
    info!("=== Chat Relay ===");
    info!("Database: {:?}", config.db_path);

    let store = Arc::new(MessageStore::new(&config.db_path).await?);
    let presence = Arc::new(PresenceTracker::new());
    let sessions = Arc::new(SessionRegistry::new());
    let broadcaster = Arc::new(Broadcaster::new());
    let hub = Arc::new(RelayHub::new(store, presence, sessions, broadcaster));

    let state = AppState {
        hub,
        identity: Arc::new(TrustedTokenIdentity),
    };

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/healthz", get(health_check))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http());

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}
