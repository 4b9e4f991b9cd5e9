// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Handlers translate between JSON and the coordinators. Capability checks
//! happen inside the coordinators, against the identity the auth middleware
//! attached.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use spike_core::{CallerIdentity, ErrorKind, RootKeySink, SpikeError};

use crate::api::{ErrorResponse, HealthResponse, LockResponse, RecoverResponse, RestoreRequest, StatusResponse};
use crate::server::GatewayState;

/// A [`SpikeError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub SpikeError);

impl From<SpikeError> for ApiError {
    fn from(err: SpikeError) -> Self {
        Self(err)
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::Quorum | ErrorKind::Integrity => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::Locked => StatusCode::LOCKED,
        ErrorKind::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Expired => StatusCode::GONE,
        ErrorKind::Connectivity => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Storage | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                kind: kind.to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// GET /health (unauthenticated).
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /v1/status. Any authenticated caller; never gated by the lock.
pub async fn get_status(State(state): State<GatewayState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        ready: state.keeper.is_ready(),
        locked: state.gate.is_locked(),
        restore: state.restore.status(),
        active_kek: state.keeper.keyring().active_version().map(|v| v.id),
    })
}

/// POST /v1/operator/recover.
pub async fn post_recover(
    State(state): State<GatewayState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<RecoverResponse>, ApiError> {
    let cancel = state.shutdown.child_token();
    let shards = state.recovery.recover(&caller, &cancel).await?;
    let encoded = shards.iter().map(spike_shamir::encode).collect();
    Ok(Json(RecoverResponse { shards: encoded }))
}

/// POST /v1/operator/restore.
pub async fn post_restore(
    State(state): State<GatewayState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<RestoreRequest>,
) -> Result<Json<spike_core::RestoreStatus>, ApiError> {
    let status = state.restore.submit_encoded(&caller, &body.shard)?;
    Ok(Json(status))
}

/// POST /v1/operator/lock.
pub async fn post_lock(
    State(state): State<GatewayState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<LockResponse>, ApiError> {
    state.gate.lock(&caller)?;
    Ok(Json(LockResponse { locked: true }))
}

/// POST /v1/operator/unlock.
pub async fn post_unlock(
    State(state): State<GatewayState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<LockResponse>, ApiError> {
    state.gate.unlock(&caller)?;
    Ok(Json(LockResponse { locked: false }))
}
