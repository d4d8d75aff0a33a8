//! Delivery outcome repository.

use crate::error::MetadataResult;
use crate::models::DeliveryRow;
use async_trait::async_trait;
use courier_core::DeliveryStatus;
use time::OffsetDateTime;
use uuid::Uuid;

/// Pending/terminal delivery counts for one file record, used to derive its
/// fan-out state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutCounts {
    pub pending: u64,
    pub terminal: u64,
}

/// Repository for per-recipient delivery outcomes.
#[async_trait]
pub trait DeliveryRepo: Send + Sync {
    /// All deliveries for a file, in recipient order.
    async fn get_deliveries(&self, file_id: Uuid) -> MetadataResult<Vec<DeliveryRow>>;

    /// One delivery by (file, recipient) pair.
    async fn get_delivery(
        &self,
        file_id: Uuid,
        recipient: &str,
    ) -> MetadataResult<Option<DeliveryRow>>;

    /// Record a terminal delivery outcome, exactly once.
    ///
    /// Only transitions a `pending` row. Returns `NotFound` if the pair does
    /// not exist, `InvalidState` if the outcome was already recorded, and
    /// `InvalidArgument` if `status` is not terminal.
    async fn record_delivery(
        &self,
        file_id: Uuid,
        recipient: &str,
        status: DeliveryStatus,
        reason: Option<&str>,
        completed_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Pending/terminal counts for a file's deliveries.
    async fn fanout_counts(&self, file_id: Uuid) -> MetadataResult<FanoutCounts>;
}
