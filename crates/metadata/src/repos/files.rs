//! File ledger repository.

use crate::error::MetadataResult;
use crate::models::{DeliveryRow, FileRow, ReceivedFileRow};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for file record operations.
#[async_trait]
pub trait FileRepo: Send + Sync {
    /// Insert a file record and its pending deliveries in one transaction.
    ///
    /// Either the record and every delivery row land together or nothing
    /// does; a partially created record is never observable.
    async fn create_file(&self, file: &FileRow, deliveries: &[DeliveryRow]) -> MetadataResult<()>;

    /// Get a file record by id.
    async fn get_file(&self, file_id: Uuid) -> MetadataResult<Option<FileRow>>;

    /// Files registered by `owner`, newest first.
    async fn list_sent_files(&self, owner: &str) -> MetadataResult<Vec<FileRow>>;

    /// Files with a delivery addressed to `recipient`, newest first, each
    /// carrying that recipient's own delivery outcome.
    async fn list_received_files(&self, recipient: &str) -> MetadataResult<Vec<ReceivedFileRow>>;
}
