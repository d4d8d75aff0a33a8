//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Peer registry record.
///
/// `status` is only `offline` after an explicit unregister. A peer whose
/// heartbeats stopped keeps `status = 'online'` and is filtered out by the
/// `last_seen` cutoff at query time.
#[derive(Debug, Clone, FromRow)]
pub struct PeerRow {
    pub name: String,
    pub address: String,
    pub port: i32,
    pub status: String,
    pub last_seen: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// File record: one registered transfer intent.
#[derive(Debug, Clone, FromRow)]
pub struct FileRow {
    pub file_id: Uuid,
    pub filename: String,
    pub filesize: i64,
    /// Lowercase hex digest claimed by the sender.
    pub checksum: String,
    pub owner: String,
    pub permission: String,
    pub created_at: OffsetDateTime,
}

/// Per-recipient delivery outcome for a file record.
///
/// Created as `pending` in the same transaction as the file row; `position`
/// preserves the order recipients were supplied in.
#[derive(Debug, Clone, FromRow)]
pub struct DeliveryRow {
    pub file_id: Uuid,
    pub recipient: String,
    pub position: i32,
    pub status: String,
    pub reason: Option<String>,
    pub completed_at: Option<OffsetDateTime>,
}

/// Joined row for the received-files view: a file record plus the queried
/// recipient's own delivery outcome.
#[derive(Debug, Clone, FromRow)]
pub struct ReceivedFileRow {
    pub file_id: Uuid,
    pub filename: String,
    pub filesize: i64,
    pub checksum: String,
    pub owner: String,
    pub permission: String,
    pub created_at: OffsetDateTime,
    pub status: String,
    pub reason: Option<String>,
    pub completed_at: Option<OffsetDateTime>,
}
