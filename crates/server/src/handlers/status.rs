//! Health and status endpoints.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /v1/health - Liveness probe, intentionally unauthenticated.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Server status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub peers_total: u64,
    pub peers_online: u64,
}

/// GET /v1/status - Version and registry counts.
pub async fn server_status(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let (peers_total, peers_online) = state.metadata.peer_counts(state.online_cutoff()).await?;
    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        peers_total,
        peers_online,
    }))
}
