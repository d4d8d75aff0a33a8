//! Coordinated send handler.

use crate::coordinator::{FailedDelivery, SendRequest};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use courier_core::Permission;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coordinated send request.
///
/// `recipients` may be the single wildcard `"*"`, which expands to every
/// online peer except the owner at send time.
#[derive(Debug, Deserialize)]
pub struct SendFileRequest {
    pub filename: String,
    pub filesize: u64,
    pub checksum: String,
    pub owner: String,
    pub recipients: Vec<String>,
}

/// Aggregate outcome of a coordinated send.
#[derive(Debug, Serialize)]
pub struct SendFileResponse {
    pub file_id: Uuid,
    pub permission: Permission,
    pub delivered: Vec<String>,
    pub failed: Vec<FailedDelivery>,
    /// True iff every recipient's delivery succeeded.
    pub full_success: bool,
}

/// POST /v1/transfers - Register an intent and fan it out to completion.
///
/// Responds once every recipient has a terminal delivery result. A failed
/// recipient never aborts its siblings and is reported by name.
pub async fn create_transfer(
    State(state): State<AppState>,
    Json(req): Json<SendFileRequest>,
) -> ApiResult<Json<SendFileResponse>> {
    let outcome = state
        .coordinator
        .send(SendRequest {
            filename: req.filename,
            filesize: req.filesize,
            checksum: req.checksum,
            owner: req.owner,
            recipients: req.recipients,
        })
        .await?;

    let full_success = outcome.full_success();
    Ok(Json(SendFileResponse {
        file_id: outcome.file_id,
        permission: outcome.permission,
        delivered: outcome.delivered,
        failed: outcome.failed,
        full_success,
    }))
}
