//! DMPRoadmap API Console
//!
//! Browser-driven test console for a DMPRoadmap-style REST/OAuth API.
//! A developer submits a host, credentials, and a chosen test through the
//! form; the console mints whatever token the test's scope needs (walking
//! the full authorization-code redirect for user-scoped tests), issues the
//! request, and renders the raw response.

mod catalog;
mod config;
mod legacy;
mod provider_impl;
mod routes;
mod session;
mod view;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roadmap_core::Catalog;

use crate::config::Config;
use crate::session::SessionRegistry;

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    catalog: Arc<Catalog>,
    sessions: Arc<SessionRegistry>,
    client: reqwest::Client,
    redirect_uri: String,
    started_at: Instant,
    tests_run: Arc<AtomicU64>,
}

impl AppState {
    fn new(redirect_uri: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            catalog: Arc::new(catalog::standard_catalog()),
            sessions: Arc::new(SessionRegistry::new()),
            client,
            redirect_uri,
            started_at: Instant::now(),
            tests_run: Arc::new(AtomicU64::new(0)),
        })
    }
}

fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/test", post(routes::submit_test))
        .route("/oauth2/callback", get(routes::oauth_callback))
        .route("/health", get(health_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting dmp-api-console");

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        redirect_uri = %config.server.redirect_uri,
        "configuration loaded"
    );

    let state = AppState::new(
        config.server.redirect_uri.clone(),
        Duration::from_secs(config.server.timeout_secs),
    )?;
    let app = build_router(state, config.server.max_connections);

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.listen_addr))?;

    info!(addr = %config.server.listen_addr, "accepting requests");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        serde_json::json!({
            "status": "ok",
            "uptime_seconds": state.started_at.elapsed().as_secs(),
            "tests_run": state.tests_run.load(Ordering::Relaxed),
            "active_sessions": state.sessions.len(),
        })
        .to_string(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
