//! HTTP surface of the adapter.
//!
//! - `GET /` returns a short welcome text
//! - `GET|POST /api` takes a request body and answers with a result or an
//!   error body

mod handlers;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::config::ServerConfig;
use crate::telemetry::shutdown_signal;

/// Builds the axum router with all routes.
pub fn router() -> Router {
    Router::new()
        .route("/", get(handlers::welcome))
        .route("/api", get(handlers::api).post(handlers::api))
}

/// Binds to the configured address and serves until a shutdown signal arrives.
pub async fn serve(config: &ServerConfig) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown_signal())
        .await
}
