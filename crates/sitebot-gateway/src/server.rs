// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use sitebot_core::{SiteError, StorageAdapter};
use sitebot_scheduler::Scheduler;
use sitebot_workflow::Dispatcher;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, require_scheduler_token};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: Arc<Dispatcher>,
    pub scheduler: Arc<Scheduler>,
    /// Used by the health check.
    pub store: Arc<dyn StorageAdapter>,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the route table:
/// - POST /telegram/webhook (webhook secret header)
/// - POST /scheduler/tick (bearer token)
/// - GET /health (open)
pub fn router(state: GatewayState) -> Router {
    let tick_routes = Router::new()
        .route("/scheduler/tick", post(handlers::post_tick))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            require_scheduler_token,
        ))
        .with_state(state.clone());

    let open_routes = Router::new()
        .route("/telegram/webhook", post(handlers::post_webhook))
        .route("/health", get(handlers::get_health))
        .with_state(state);

    Router::new()
        .merge(open_routes)
        .merge(tick_routes)
        .layer(TraceLayer::new_for_http())
}

/// Serve the gateway until `cancel` fires, then drain in-flight requests.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), SiteError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SiteError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| SiteError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway stopped");
    Ok(())
}
