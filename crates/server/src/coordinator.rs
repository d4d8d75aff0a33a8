//! Transfer coordination: intent registration and best-effort fan-out.

use crate::error::{ApiError, ApiResult};
use crate::transport::{ByteTransport, DeliveryRequest};
use courier_core::config::AppConfig;
use courier_core::{
    Checksum, DeliveryStatus, Permission, WILDCARD_RECIPIENT, validate_peer_name,
};
use courier_metadata::MetadataStore;
use courier_metadata::models::{DeliveryRow, FileRow};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

/// One send action as requested by the initiating peer.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub filename: String,
    pub filesize: u64,
    /// Hex digest claimed by the sender.
    pub checksum: String,
    pub owner: String,
    pub recipients: Vec<String>,
}

/// A recipient whose delivery ended `failed`, with the recorded reason.
#[derive(Debug, Clone, Serialize)]
pub struct FailedDelivery {
    pub recipient: String,
    pub reason: String,
}

/// Aggregate outcome of one fan-out: full success iff `failed` is empty.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub file_id: Uuid,
    pub permission: Permission,
    pub delivered: Vec<String>,
    pub failed: Vec<FailedDelivery>,
}

impl SendOutcome {
    pub fn full_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives one send action end to end: wildcard expansion, atomic intent
/// registration, bounded-concurrency delivery fan-out, write-once outcome
/// recording, and the aggregate report.
pub struct TransferCoordinator {
    config: Arc<AppConfig>,
    metadata: Arc<dyn MetadataStore>,
    transport: Arc<dyn ByteTransport>,
}

impl TransferCoordinator {
    pub fn new(
        config: Arc<AppConfig>,
        metadata: Arc<dyn MetadataStore>,
        transport: Arc<dyn ByteTransport>,
    ) -> Self {
        Self {
            config,
            metadata,
            transport,
        }
    }

    /// The `last_seen` cutoff below which an online-status peer counts as
    /// stale.
    pub fn online_cutoff(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc() - self.config.presence.liveness_threshold()
    }

    /// Expand a wildcard recipient to the online set minus the sender.
    ///
    /// Evaluated once, at send time: a peer that drops offline during the
    /// fan-out still gets a `failed` result instead of vanishing from the
    /// record. Explicit recipient lists pass through untouched.
    pub async fn expand_recipients(
        &self,
        owner: &str,
        recipients: &[String],
    ) -> ApiResult<Vec<String>> {
        if !recipients.iter().any(|r| r == WILDCARD_RECIPIENT) {
            return Ok(recipients.to_vec());
        }
        if recipients.len() != 1 {
            return Err(ApiError::InvalidArgument(
                "wildcard recipient cannot be combined with named recipients".to_string(),
            ));
        }

        let online = self
            .metadata
            .list_online_peers(self.online_cutoff(), Some(owner))
            .await?;
        let names: Vec<String> = online.into_iter().map(|p| p.name).collect();
        if names.is_empty() {
            return Err(ApiError::InvalidArgument(
                "wildcard send found no online recipients".to_string(),
            ));
        }
        Ok(names)
    }

    /// Validate a send request and persist the file record with one pending
    /// delivery per recipient, atomically.
    ///
    /// Recipients must be explicit names here; wildcard expansion happens
    /// before this call. Duplicate names collapse to the first occurrence.
    pub async fn register_intent(
        &self,
        request: &SendRequest,
    ) -> ApiResult<(FileRow, Vec<DeliveryRow>)> {
        if request.filename.is_empty() {
            return Err(ApiError::InvalidArgument(
                "filename cannot be empty".to_string(),
            ));
        }
        let filesize = i64::try_from(request.filesize).map_err(|_| {
            ApiError::InvalidArgument(format!("filesize {} is too large", request.filesize))
        })?;
        let claim = Checksum::from_hex(self.config.transfer.checksum, &request.checksum)?;

        let owner = self
            .metadata
            .get_peer(&request.owner)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("owner '{}' is not a registered peer", request.owner))
            })?;

        if request.recipients.is_empty() {
            return Err(ApiError::InvalidArgument(
                "recipients cannot be empty".to_string(),
            ));
        }
        let mut recipients = Vec::new();
        let mut seen = HashSet::new();
        for name in &request.recipients {
            validate_peer_name(name)?;
            if name == &owner.name {
                return Err(ApiError::InvalidArgument(
                    "sender cannot be its own recipient".to_string(),
                ));
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            // The recipient may be offline right now; registering the intent
            // is still legal and delivery fails at fan-out time instead.
            if self.metadata.get_peer(name).await?.is_none() {
                return Err(ApiError::InvalidArgument(format!(
                    "unknown recipient '{name}'"
                )));
            }
            recipients.push(name.clone());
        }

        let now = OffsetDateTime::now_utc();
        let file = FileRow {
            file_id: Uuid::new_v4(),
            filename: request.filename.clone(),
            filesize,
            checksum: claim.as_hex().to_string(),
            owner: owner.name.clone(),
            permission: Permission::from_recipient_count(recipients.len())
                .as_str()
                .to_string(),
            created_at: now,
        };
        let deliveries: Vec<DeliveryRow> = recipients
            .iter()
            .enumerate()
            .map(|(position, recipient)| DeliveryRow {
                file_id: file.file_id,
                recipient: recipient.clone(),
                position: position as i32,
                status: DeliveryStatus::Pending.as_str().to_string(),
                reason: None,
                completed_at: None,
            })
            .collect();

        self.metadata.create_file(&file, &deliveries).await?;
        tracing::info!(
            file_id = %file.file_id,
            owner = %file.owner,
            recipients = deliveries.len(),
            permission = %file.permission,
            "file intent registered"
        );
        Ok((file, deliveries))
    }

    /// Run one send action to completion and report the aggregate outcome.
    ///
    /// The fan-out runs in a detached task whose handle this method awaits:
    /// if the initiating request is cancelled, in-flight deliveries keep
    /// running and every recipient still ends with a terminal result.
    pub async fn send(&self, request: SendRequest) -> ApiResult<SendOutcome> {
        let recipients = self
            .expand_recipients(&request.owner, &request.recipients)
            .await?;
        let request = SendRequest {
            recipients,
            ..request
        };
        let (file, deliveries) = self.register_intent(&request).await?;

        let permission = Permission::parse(&file.permission)
            .map_err(|e| ApiError::Internal(format!("corrupt permission: {e}")))?;
        let claim = Checksum::from_hex(self.config.transfer.checksum, &file.checksum)
            .map_err(|e| ApiError::Internal(format!("corrupt checksum claim: {e}")))?;

        let recipients: Vec<String> = deliveries.into_iter().map(|d| d.recipient).collect();
        let handle = tokio::spawn(fan_out(
            self.metadata.clone(),
            self.transport.clone(),
            self.config.transfer.max_concurrent_deliveries as usize,
            self.online_cutoff(),
            file.clone(),
            claim,
            recipients,
        ));

        let (delivered, failed) = handle
            .await
            .map_err(|e| ApiError::Internal(format!("fan-out task failed: {e}")))?;

        let outcome = SendOutcome {
            file_id: file.file_id,
            permission,
            delivered,
            failed,
        };
        tracing::info!(
            file_id = %outcome.file_id,
            delivered = outcome.delivered.len(),
            failed = outcome.failed.len(),
            "fan-out complete"
        );
        Ok(outcome)
    }
}

/// Dispatch one delivery per recipient with bounded concurrency and gather
/// the terminal results in the original recipient order.
async fn fan_out(
    metadata: Arc<dyn MetadataStore>,
    transport: Arc<dyn ByteTransport>,
    max_concurrent: usize,
    cutoff: OffsetDateTime,
    file: FileRow,
    claim: Checksum,
    recipients: Vec<String>,
) -> (Vec<String>, Vec<FailedDelivery>) {
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let mut tasks = JoinSet::new();
    let mut task_recipients = HashMap::new();

    for recipient in &recipients {
        let metadata = metadata.clone();
        let transport = transport.clone();
        let semaphore = semaphore.clone();
        let file = file.clone();
        let claim = claim.clone();
        let recipient = recipient.clone();
        let task_recipient = recipient.clone();

        let handle = tasks.spawn(async move {
            let mut reason = match semaphore.acquire_owned().await {
                Ok(_permit) => {
                    deliver_one(&*metadata, &*transport, cutoff, &file, &claim, &recipient)
                        .await
                        .err()
                }
                // The semaphore is never closed while the fan-out runs.
                Err(_) => Some("fan-out aborted".to_string()),
            };

            let status = if reason.is_none() {
                DeliveryStatus::Success
            } else {
                DeliveryStatus::Failed
            };
            if let Err(e) = metadata
                .record_delivery(
                    file.file_id,
                    &recipient,
                    status,
                    reason.as_deref(),
                    OffsetDateTime::now_utc(),
                )
                .await
            {
                tracing::error!(
                    file_id = %file.file_id,
                    recipient = %recipient,
                    error = %e,
                    "failed to record delivery outcome"
                );
                // The ledger row is still pending; the aggregate must not
                // claim an outcome the ledger does not carry.
                reason = Some(format!("delivery outcome not recorded: {e}"));
            }
            (recipient, reason)
        });
        task_recipients.insert(handle.id(), task_recipient);
    }

    let mut reasons: HashMap<String, Option<String>> = HashMap::new();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, (recipient, reason))) => {
                reasons.insert(recipient, reason);
            }
            Err(join_err) => {
                // A panicked delivery still gets its terminal result.
                let recipient = task_recipients
                    .get(&join_err.id())
                    .cloned()
                    .unwrap_or_default();
                tracing::error!(
                    file_id = %file.file_id,
                    recipient = %recipient,
                    panic = ?join_err,
                    "delivery task panicked"
                );
                let reason = "delivery task panicked".to_string();
                if let Err(e) = metadata
                    .record_delivery(
                        file.file_id,
                        &recipient,
                        DeliveryStatus::Failed,
                        Some(&reason),
                        OffsetDateTime::now_utc(),
                    )
                    .await
                {
                    tracing::error!(
                        file_id = %file.file_id,
                        recipient = %recipient,
                        error = %e,
                        "failed to record panicked delivery"
                    );
                }
                reasons.insert(recipient, Some(reason));
            }
        }
    }

    let mut delivered = Vec::new();
    let mut failed = Vec::new();
    for recipient in recipients {
        match reasons.remove(&recipient) {
            Some(None) => delivered.push(recipient),
            Some(Some(reason)) => failed.push(FailedDelivery { recipient, reason }),
            None => failed.push(FailedDelivery {
                recipient,
                reason: "delivery result missing".to_string(),
            }),
        }
    }
    (delivered, failed)
}

/// Attempt one delivery and verify the receipt digest against the claim.
async fn deliver_one(
    metadata: &dyn MetadataStore,
    transport: &dyn ByteTransport,
    cutoff: OffsetDateTime,
    file: &FileRow,
    claim: &Checksum,
    recipient: &str,
) -> Result<(), String> {
    let peer = metadata
        .get_peer(recipient)
        .await
        .map_err(|e| format!("registry lookup failed: {e}"))?
        .ok_or_else(|| "recipient no longer registered".to_string())?;

    if peer.status != "online" || peer.last_seen < cutoff {
        return Err("recipient offline".to_string());
    }
    let port = u16::try_from(peer.port).map_err(|_| "corrupt recipient port".to_string())?;

    let request = DeliveryRequest {
        file_id: file.file_id,
        filename: file.filename.clone(),
        filesize: file.filesize as u64,
        checksum: claim.clone(),
        sender: file.owner.clone(),
        recipient: peer.name,
        recipient_address: peer.address,
        recipient_port: port,
    };
    let receipt = transport
        .deliver(&request)
        .await
        .map_err(|e| e.to_string())?;

    // The registration-time claim is advisory; only the digest the transport
    // computed over the moved bytes proves integrity.
    if receipt.digest != *claim {
        return Err("checksum mismatch".to_string());
    }
    Ok(())
}
