// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use spike_core::SpikeError;
use spike_lock::LockGate;
use spike_recovery::{RecoveryCoordinator, RestoreCoordinator, RootKeyKeeper};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub keeper: Arc<RootKeyKeeper>,
    pub gate: Arc<LockGate>,
    pub recovery: Arc<RecoveryCoordinator>,
    pub restore: Arc<RestoreCoordinator>,
    pub auth: AuthConfig,
    /// Cancelled on shutdown; in-flight recover requests observe it.
    pub shutdown: CancellationToken,
    pub start_time: std::time::Instant,
}

/// Listener address.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the router:
/// - GET /health (public)
/// - GET /v1/status
/// - POST /v1/operator/{recover,restore,lock,unlock}
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/status", get(handlers::get_status))
        .route("/v1/operator/recover", post(handlers::post_recover))
        .route("/v1/operator/restore", post(handlers::post_restore))
        .route("/v1/operator/lock", post(handlers::post_lock))
        .route("/v1/operator/unlock", post(handlers::post_unlock))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}

/// Serve until `state.shutdown` is cancelled.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), SpikeError> {
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SpikeError::Connectivity {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| SpikeError::Connectivity {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway stopped");
    Ok(())
}
