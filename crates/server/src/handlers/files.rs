//! File ledger handlers.

use crate::coordinator::SendRequest;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use courier_core::{DeliveryStatus, FanoutState, Permission};
use courier_metadata::models::{DeliveryRow, FileRow, ReceivedFileRow};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// File intent registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterFileRequest {
    pub filename: String,
    pub filesize: u64,
    /// Hex digest claim; verified against the transport receipt later.
    pub checksum: String,
    pub owner: String,
    pub recipients: Vec<String>,
}

/// One recipient's delivery outcome.
#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub recipient: String,
    pub status: DeliveryStatus,
    pub reason: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

/// Full file record with its deliveries and derived fan-out state.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub file_id: Uuid,
    pub filename: String,
    pub filesize: u64,
    pub checksum: String,
    pub owner: String,
    pub permission: Permission,
    pub state: FanoutState,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub deliveries: Vec<DeliveryResponse>,
}

/// Received-view entry: a file record plus the queried recipient's own
/// delivery outcome.
#[derive(Debug, Serialize)]
pub struct ReceivedFileResponse {
    pub file_id: Uuid,
    pub filename: String,
    pub filesize: u64,
    pub checksum: String,
    pub owner: String,
    pub permission: Permission,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub status: DeliveryStatus,
    pub reason: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

/// File list response for the history views.
#[derive(Debug, Serialize)]
pub struct FileListResponse<T: Serialize> {
    pub files: Vec<T>,
    pub count: usize,
}

fn delivery_response(row: DeliveryRow) -> ApiResult<DeliveryResponse> {
    let status = DeliveryStatus::parse(&row.status)
        .map_err(|e| ApiError::Internal(format!("corrupt delivery status: {e}")))?;
    Ok(DeliveryResponse {
        recipient: row.recipient,
        status,
        reason: row.reason,
        completed_at: row.completed_at,
    })
}

pub(crate) fn file_response(file: FileRow, deliveries: Vec<DeliveryRow>) -> ApiResult<FileResponse> {
    let permission = Permission::parse(&file.permission)
        .map_err(|e| ApiError::Internal(format!("corrupt permission: {e}")))?;
    let filesize = u64::try_from(file.filesize)
        .map_err(|_| ApiError::Internal(format!("corrupt filesize: {}", file.filesize)))?;

    let deliveries = deliveries
        .into_iter()
        .map(delivery_response)
        .collect::<ApiResult<Vec<_>>>()?;
    let pending = deliveries
        .iter()
        .filter(|d| !d.status.is_terminal())
        .count() as u64;
    let terminal = deliveries.len() as u64 - pending;

    Ok(FileResponse {
        file_id: file.file_id,
        filename: file.filename,
        filesize,
        checksum: file.checksum,
        owner: file.owner,
        permission,
        state: FanoutState::from_counts(pending, terminal),
        created_at: file.created_at,
        deliveries,
    })
}

fn received_file_response(row: ReceivedFileRow) -> ApiResult<ReceivedFileResponse> {
    let permission = Permission::parse(&row.permission)
        .map_err(|e| ApiError::Internal(format!("corrupt permission: {e}")))?;
    let status = DeliveryStatus::parse(&row.status)
        .map_err(|e| ApiError::Internal(format!("corrupt delivery status: {e}")))?;
    let filesize = u64::try_from(row.filesize)
        .map_err(|_| ApiError::Internal(format!("corrupt filesize: {}", row.filesize)))?;
    Ok(ReceivedFileResponse {
        file_id: row.file_id,
        filename: row.filename,
        filesize,
        checksum: row.checksum,
        owner: row.owner,
        permission,
        created_at: row.created_at,
        status,
        reason: row.reason,
        completed_at: row.completed_at,
    })
}

/// POST /v1/files - Register a file intent without fanning out.
///
/// Creates the record and one pending delivery per recipient atomically.
/// Recipients must be explicit names; wildcard expansion belongs to the
/// coordinated send endpoint.
pub async fn register_file(
    State(state): State<AppState>,
    Json(req): Json<RegisterFileRequest>,
) -> ApiResult<(StatusCode, Json<FileResponse>)> {
    let request = SendRequest {
        filename: req.filename,
        filesize: req.filesize,
        checksum: req.checksum,
        owner: req.owner,
        recipients: req.recipients,
    };
    let (file, deliveries) = state.coordinator.register_intent(&request).await?;
    Ok((StatusCode::CREATED, Json(file_response(file, deliveries)?)))
}

/// GET /v1/files/{file_id} - File record with deliveries and fan-out state.
pub async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
) -> ApiResult<Json<FileResponse>> {
    let file = state
        .metadata
        .get_file(file_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("file {file_id} not found")))?;
    let deliveries = state.metadata.get_deliveries(file_id).await?;
    Ok(Json(file_response(file, deliveries)?))
}

/// Delivery outcome body.
#[derive(Debug, Deserialize)]
pub struct RecordDeliveryRequest {
    pub status: DeliveryStatus,
    pub reason: Option<String>,
}

/// POST /v1/files/{file_id}/deliveries/{recipient} - Record a terminal
/// delivery outcome.
///
/// Write-once per pair: a second recording attempt gets 409 and the stored
/// outcome never changes.
pub async fn record_delivery(
    State(state): State<AppState>,
    Path((file_id, recipient)): Path<(Uuid, String)>,
    Json(req): Json<RecordDeliveryRequest>,
) -> ApiResult<Json<DeliveryResponse>> {
    state
        .metadata
        .record_delivery(
            file_id,
            &recipient,
            req.status,
            req.reason.as_deref(),
            OffsetDateTime::now_utc(),
        )
        .await?;

    let row = state
        .metadata
        .get_delivery(file_id, &recipient)
        .await?
        .ok_or_else(|| ApiError::Internal("delivery vanished after recording".to_string()))?;
    Ok(Json(delivery_response(row)?))
}

/// Query parameters for the history views.
#[derive(Debug, Deserialize)]
pub struct FilesQuery {
    pub direction: String,
}

/// GET /v1/peers/{name}/files?direction=sent|received - History views.
pub async fn list_peer_files(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<FilesQuery>,
) -> ApiResult<Response> {
    if state.metadata.get_peer(&name).await?.is_none() {
        return Err(ApiError::NotFound(format!("peer '{name}' not found")));
    }

    match query.direction.as_str() {
        "sent" => {
            let mut files = Vec::new();
            for file in state.metadata.list_sent_files(&name).await? {
                let deliveries = state.metadata.get_deliveries(file.file_id).await?;
                files.push(file_response(file, deliveries)?);
            }
            let count = files.len();
            Ok(Json(FileListResponse { files, count }).into_response())
        }
        "received" => {
            let files = state
                .metadata
                .list_received_files(&name)
                .await?
                .into_iter()
                .map(received_file_response)
                .collect::<ApiResult<Vec<_>>>()?;
            let count = files.len();
            Ok(Json(FileListResponse { files, count }).into_response())
        }
        other => Err(ApiError::InvalidArgument(format!(
            "direction must be 'sent' or 'received', got '{other}'"
        ))),
    }
}
