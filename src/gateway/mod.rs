//! HTTP front door for chat channels.

pub mod api;

use crate::bot::DentaBot;
use crate::config::{Config, GatewayConfig};
use crate::security::BearerGuard;
use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<DentaBot>,
    pub guard: BearerGuard,
}

impl AppState {
    pub fn new(bot: DentaBot, gateway: &GatewayConfig) -> Self {
        Self {
            bot: Arc::new(bot),
            guard: BearerGuard::new(gateway.bearer_token.as_deref()),
        }
    }
}

pub fn build_router(state: AppState, gateway: &GatewayConfig) -> Router {
    Router::new()
        .route("/api/messages", post(api::handle_messages))
        .route("/health", get(api::handle_health))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(gateway.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(gateway.request_timeout_secs.max(1)),
        ))
}

/// Bind `host:port` and serve until SIGINT or SIGTERM.
pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    let bot = DentaBot::from_config(&config).context("building bot from config")?;
    let state = AppState::new(bot, &config.gateway);
    if state.guard.is_enabled() {
        tracing::info!("Bearer token required on /api/messages");
    }
    let app = build_router(state, &config.gateway);

    let bind_addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {bind_addr}"))?;
    tracing::info!("Gateway listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}
