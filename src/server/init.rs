//! Server initialization and run loop

use super::config::AppConfig;
use super::loader::load_config;
use super::providers::{build_assistant, resolve_llm_provider};
use crate::api::{api_router, AppState};
use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use chatbuddy_store::{LoadOutcome, ProfileStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Open the profile store named by the configuration, creating the key on
/// first use.
pub fn open_store(config: &AppConfig) -> Result<ProfileStore> {
    let store_config = config.store_config();
    let key_path = store_config.key_path.clone();
    ProfileStore::open(store_config)
        .with_context(|| format!("Failed to open profile store (key: {})", key_path.display()))
}

/// Log what the data file holds so corruption shows up at startup
pub fn report_store_state(store: &ProfileStore) {
    let path = store.config().data_path.display();
    match store.load_all() {
        Ok(LoadOutcome::Empty) => info!(path = %path, "No profiles stored yet"),
        Ok(LoadOutcome::Loaded(map)) => info!(path = %path, count = map.len(), "Profiles loaded"),
        Ok(LoadOutcome::Corrupt(e)) => error!(
            path = %path,
            error = %e,
            policy = ?store.config().corruption_policy,
            "Profile data file is unreadable"
        ),
        Err(e) => warn!(path = %path, error = %e, "Could not read profile data file"),
    }
}

/// Full application router
pub fn build_router(state: AppState) -> Router {
    api_router(state)
        .route("/", get(|| async { "ChatBuddy" }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the HTTP server until Ctrl+C / SIGTERM
pub async fn run() -> Result<()> {
    let config = load_config()?;

    let store = Arc::new(open_store(&config)?);
    report_store_state(&store);

    let provider = resolve_llm_provider(&config.llm)?;
    let assistant = build_assistant(&config, provider);
    info!(
        provider = %assistant.provider_name(),
        model = %assistant.model(),
        "Assistant ready"
    );

    let state = AppState::new(store, assistant, config.chat.history_window);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("ChatBuddy shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
