//! HTTP API: Axum server over the corridor store and quote engine.
//!
//! Exposes corridor state, pricing, signal administration and quoting as
//! JSON. CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub use routes::{ApiState, AppState};

/// Bind `port` and serve until the listener fails.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API port {port}"))?;
    info!(port, "API server listening on http://localhost:{port}");

    axum::serve(listener, app).await.context("API server error")?;
    Ok(())
}

/// Start the API server in a background task. Errors are logged.
pub fn spawn_api(state: AppState, port: u16) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve(state, port).await {
            error!(error = format!("{e:#}"), "API server stopped");
        }
    })
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health))
        // Corridors
        .route("/api/corridors", get(routes::get_corridors))
        .route("/api/corridors/:base/:quote", get(routes::get_corridor))
        .route("/api/corridors/:base/:quote/pricing", get(routes::get_pricing))
        // Signals
        .route(
            "/api/signals",
            post(routes::post_signal).delete(routes::clear_signals),
        )
        .route("/api/signals/seed", post(routes::seed_signals))
        // Quotes
        .route("/api/quote", post(routes::post_quote))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
