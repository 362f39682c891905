// src/api/mod.rs — HTTP boundary for the browser agent

pub mod handlers;
pub mod types;

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::infra::config::ServerConfig;
use crate::plugins::Dispatcher;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Dispatcher,
}

/// Build the axum router with all API routes.
pub fn build_router(state: ApiState, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/metadata/scrape", post(handlers::scrape))
        .route("/api/plugin/config", get(handlers::plugin_config))
        .route("/api/plugin/toggle", post(handlers::plugin_toggle))
        .route("/api/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn start_server<F>(config: &ServerConfig, state: ApiState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.bind_addr();
    let router = build_router(state, config.body_limit_bytes());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
