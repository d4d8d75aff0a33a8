//! Peer registry repository.

use crate::error::MetadataResult;
use crate::models::PeerRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for peer registry operations.
#[async_trait]
pub trait PeerRepo: Send + Sync {
    /// Insert or refresh a peer registration.
    ///
    /// Re-registration updates address, port, status, and `last_seen` but
    /// preserves the original `created_at`.
    async fn upsert_peer(&self, peer: &PeerRow) -> MetadataResult<()>;

    /// Get a peer by name regardless of status.
    async fn get_peer(&self, name: &str) -> MetadataResult<Option<PeerRow>>;

    /// Mark a peer offline. A no-op for names that were never registered.
    async fn mark_peer_offline(&self, name: &str, seen_at: OffsetDateTime) -> MetadataResult<()>;

    /// All known peers ordered by name, whatever their status.
    async fn list_peers(&self) -> MetadataResult<Vec<PeerRow>>;

    /// Peers with `status = 'online'` whose `last_seen` is at or after
    /// `cutoff`, optionally excluding one name (the caller itself).
    ///
    /// The cutoff is computed by the caller from the configured liveness
    /// threshold so the query stays deterministic under test clocks.
    async fn list_online_peers(
        &self,
        cutoff: OffsetDateTime,
        exclude: Option<&str>,
    ) -> MetadataResult<Vec<PeerRow>>;

    /// Count of all peers and of peers passing the online cutoff.
    async fn peer_counts(&self, cutoff: OffsetDateTime) -> MetadataResult<(u64, u64)>;
}
