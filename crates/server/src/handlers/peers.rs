//! Peer registry handlers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use courier_core::{PeerStatus, validate_peer_name, validate_port};
use courier_metadata::models::PeerRow;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Peer registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterPeerRequest {
    pub name: String,
    pub address: String,
    pub port: u32,
}

/// Peer representation returned by the API.
#[derive(Debug, Serialize)]
pub struct PeerResponse {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub status: PeerStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Peer list response.
#[derive(Debug, Serialize)]
pub struct PeerListResponse {
    pub peers: Vec<PeerResponse>,
    pub count: usize,
}

pub(crate) fn peer_response(row: PeerRow) -> ApiResult<PeerResponse> {
    let status = PeerStatus::parse(&row.status)
        .map_err(|e| ApiError::Internal(format!("corrupt peer status: {e}")))?;
    let port = u16::try_from(row.port)
        .map_err(|_| ApiError::Internal(format!("corrupt peer port: {}", row.port)))?;
    Ok(PeerResponse {
        name: row.name,
        address: row.address,
        port,
        status,
        last_seen: row.last_seen,
        created_at: row.created_at,
    })
}

fn peer_list_response(rows: Vec<PeerRow>) -> ApiResult<PeerListResponse> {
    let peers = rows
        .into_iter()
        .map(peer_response)
        .collect::<ApiResult<Vec<_>>>()?;
    let count = peers.len();
    Ok(PeerListResponse { peers, count })
}

/// POST /v1/peers - Register or refresh a peer.
///
/// Upsert semantics: re-registration by the same name is how a peer
/// refreshes its liveness or changes its own address and port.
pub async fn register_peer(
    State(state): State<AppState>,
    Json(req): Json<RegisterPeerRequest>,
) -> ApiResult<Json<PeerResponse>> {
    validate_peer_name(&req.name)?;
    let port = validate_port(req.port)?;
    if req.address.is_empty() {
        return Err(ApiError::InvalidArgument(
            "address cannot be empty".to_string(),
        ));
    }

    let now = OffsetDateTime::now_utc();
    let row = PeerRow {
        name: req.name.clone(),
        address: req.address,
        port: i32::from(port),
        status: PeerStatus::Online.as_str().to_string(),
        last_seen: now,
        created_at: now,
    };
    state.metadata.upsert_peer(&row).await?;
    tracing::debug!(peer = %req.name, "peer registered");

    // Read back: on re-registration the stored created_at predates ours.
    let stored = state
        .metadata
        .get_peer(&req.name)
        .await?
        .ok_or_else(|| ApiError::Internal("peer vanished after upsert".to_string()))?;
    Ok(Json(peer_response(stored)?))
}

/// DELETE /v1/peers/{name} - Mark a peer offline.
///
/// Idempotent: unknown names and already-offline peers acknowledge the same
/// way. The row is retained so transfer history stays resolvable.
pub async fn unregister_peer(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .metadata
        .mark_peer_offline(&name, OffsetDateTime::now_utc())
        .await?;
    tracing::debug!(peer = %name, "peer unregistered");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/peers - All known peers, whatever their status.
pub async fn list_peers(State(state): State<AppState>) -> ApiResult<Json<PeerListResponse>> {
    let rows = state.metadata.list_peers().await?;
    Ok(Json(peer_list_response(rows)?))
}

/// Query parameters for the online-peer listing.
#[derive(Debug, Deserialize)]
pub struct OnlineQuery {
    /// Name of the calling peer, excluded from its own discovery results.
    pub exclude: Option<String>,
}

/// GET /v1/peers/online - Peers currently considered online.
///
/// Staleness is evaluated lazily from `last_seen` against the configured
/// liveness threshold; there is no background sweep.
pub async fn list_online_peers(
    State(state): State<AppState>,
    Query(query): Query<OnlineQuery>,
) -> ApiResult<Json<PeerListResponse>> {
    let rows = state
        .metadata
        .list_online_peers(state.online_cutoff(), query.exclude.as_deref())
        .await?;
    Ok(Json(peer_list_response(rows)?))
}

/// GET /v1/peers/{name} - Resolve one peer regardless of status.
pub async fn get_peer(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<PeerResponse>> {
    let row = state
        .metadata
        .get_peer(&name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("peer '{name}' not found")))?;
    Ok(Json(peer_response(row)?))
}
