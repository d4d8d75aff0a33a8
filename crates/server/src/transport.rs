//! Byte transport abstraction.
//!
//! Courier coordinates transfers but does not define how file bytes move
//! between peers. The [`ByteTransport`] trait is that boundary: the
//! coordinator hands it one recipient at a time and gets back a receipt
//! carrying the digest the transport computed over the bytes it actually
//! moved, which is what checksum verification runs against.

use async_trait::async_trait;
use courier_core::Checksum;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// One delivery attempt: a file offered to a single recipient.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub file_id: Uuid,
    pub filename: String,
    pub filesize: u64,
    /// The sender's checksum claim, forwarded so the receiving end can
    /// verify independently.
    pub checksum: Checksum,
    pub sender: String,
    pub recipient: String,
    pub recipient_address: String,
    pub recipient_port: u16,
}

/// Receipt returned by a transport after a completed delivery.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// Digest the transport computed over the delivered bytes.
    pub digest: Checksum,
    pub bytes_sent: u64,
}

/// Transport-level delivery failure for one recipient.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("recipient unreachable: {0}")]
    Unreachable(String),

    #[error("transfer rejected: {0}")]
    Rejected(String),

    #[error("transfer timed out after {0:?}")]
    Timeout(Duration),
}

/// Opaque channel that moves file bytes to one recipient.
#[async_trait]
pub trait ByteTransport: Send + Sync {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<DeliveryReceipt, TransportError>;
}

/// Offer body posted to a peer daemon's incoming endpoint.
#[derive(Debug, Serialize)]
struct TransferOffer<'a> {
    file_id: Uuid,
    filename: &'a str,
    filesize: u64,
    checksum: &'a str,
    sender: &'a str,
}

/// Acknowledgement returned by a peer daemon once it has the bytes.
#[derive(Debug, Deserialize)]
struct TransferAccepted {
    /// Hex digest the receiver computed over what it stored.
    checksum: String,
    bytes_received: u64,
}

/// HTTP transport: posts the transfer offer to the recipient's peer daemon
/// and reads back the digest it computed.
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl ByteTransport for HttpTransport {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<DeliveryReceipt, TransportError> {
        let url = format!(
            "http://{}:{}/v1/incoming",
            request.recipient_address, request.recipient_port
        );
        let offer = TransferOffer {
            file_id: request.file_id,
            filename: &request.filename,
            filesize: request.filesize,
            checksum: request.checksum.as_hex(),
            sender: &request.sender,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&offer)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout)
                } else {
                    TransportError::Unreachable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(TransportError::Rejected(format!(
                "{} responded {}",
                request.recipient,
                response.status()
            )));
        }

        let accepted: TransferAccepted = response
            .json()
            .await
            .map_err(|e| TransportError::Rejected(format!("malformed acknowledgement: {e}")))?;

        let digest = Checksum::from_hex(request.checksum.algorithm(), &accepted.checksum)
            .map_err(|e| TransportError::Rejected(format!("malformed receipt digest: {e}")))?;

        Ok(DeliveryReceipt {
            digest,
            bytes_sent: accepted.bytes_received,
        })
    }
}
