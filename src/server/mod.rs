//! HTTP server exposing the generation pipeline and ScopeStack push
//!
//! Routes, CORS layering, and graceful shutdown follow the same structure
//! throughout: CORS outermost so preflight requests are answered before
//! anything else, a shutdown flag polled for graceful exit.

pub mod routes;
pub mod state;

pub use state::AppState;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue,
    },
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Version information for the server
#[derive(serde::Serialize)]
struct VersionInfo {
    version: String,
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/research", post(routes::research_routes::research_handler))
        .route(
            "/api/push-to-scopestack",
            post(routes::push_routes::push_handler),
        )
        .route(
            "/api/analytics",
            get(routes::analytics_routes::analytics_handler),
        )
        .route("/api/auth/token", post(routes::auth_routes::token_handler))
        .route(
            "/api/auth/refresh",
            post(routes::auth_routes::refresh_handler),
        )
        .route("/health", get(health_handler))
        .route("/api/version", get(version_handler))
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(
    port: u16,
    bind: &str,
    state: AppState,
    cors_origins: Option<Vec<String>>,
) -> Result<(), String> {
    // Build CORS layer
    // Must be the outermost layer to handle preflight OPTIONS requests first.
    // Note: explicit headers instead of Any to avoid browser deprecation
    // warnings when Authorization is used with a wildcard
    let cors = match &cors_origins {
        Some(origins) if !origins.is_empty() => {
            let allowed_origins: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods(Any)
                .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        }
        _ => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]),
    };

    let shutdown_state = state.shutdown_state.clone();
    let app = build_router(state).layer(cors);

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Server listening on http://{}", addr);
    log::info!("  POST /api/research            - Generate a scope (SSE progress)");
    log::info!("  POST /api/push-to-scopestack  - Push a scope to ScopeStack");
    log::info!("  GET  /api/analytics           - Request logs and stats");
    log::info!("  GET  /health                  - Health check");

    // Shutdown signal that waits for the shutdown state flag
    let shutdown_signal = async move {
        loop {
            if shutdown_state.is_shutdown_requested() {
                log::info!("Shutdown signal received, stopping server...");
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| format!("Server error: {}", e))
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Version endpoint
async fn version_handler() -> Json<VersionInfo> {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
