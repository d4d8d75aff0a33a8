//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{DeliveryRepo, FileRepo, PeerRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: PeerRepo + FileRepo + DeliveryRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) a SQLite store at `path` and migrate it.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under axum concurrency and
            // serializes the write-once delivery updates.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "opened sqlite metadata store");

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::{DeliveryRow, FileRow, PeerRow, ReceivedFileRow};
    use crate::repos::FanoutCounts;
    use courier_core::DeliveryStatus;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl PeerRepo for SqliteStore {
        async fn upsert_peer(&self, peer: &PeerRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO peers (name, address, port, status, last_seen, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(name) DO UPDATE SET
                    address = excluded.address,
                    port = excluded.port,
                    status = excluded.status,
                    last_seen = excluded.last_seen
                "#,
            )
            .bind(&peer.name)
            .bind(&peer.address)
            .bind(peer.port)
            .bind(&peer.status)
            .bind(peer.last_seen)
            .bind(peer.created_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_peer(&self, name: &str) -> MetadataResult<Option<PeerRow>> {
            let row = sqlx::query_as::<_, PeerRow>("SELECT * FROM peers WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn mark_peer_offline(
            &self,
            name: &str,
            seen_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            // Unregistering a never-registered name is an acceptable no-op.
            sqlx::query("UPDATE peers SET status = 'offline', last_seen = ? WHERE name = ?")
                .bind(seen_at)
                .bind(name)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn list_peers(&self) -> MetadataResult<Vec<PeerRow>> {
            let rows = sqlx::query_as::<_, PeerRow>("SELECT * FROM peers ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn list_online_peers(
            &self,
            cutoff: OffsetDateTime,
            exclude: Option<&str>,
        ) -> MetadataResult<Vec<PeerRow>> {
            let rows = match exclude {
                Some(name) => {
                    sqlx::query_as::<_, PeerRow>(
                        "SELECT * FROM peers WHERE status = 'online' AND last_seen >= ? AND name != ? ORDER BY name",
                    )
                    .bind(cutoff)
                    .bind(name)
                    .fetch_all(&self.pool)
                    .await?
                }
                None => {
                    sqlx::query_as::<_, PeerRow>(
                        "SELECT * FROM peers WHERE status = 'online' AND last_seen >= ? ORDER BY name",
                    )
                    .bind(cutoff)
                    .fetch_all(&self.pool)
                    .await?
                }
            };
            Ok(rows)
        }

        async fn peer_counts(&self, cutoff: OffsetDateTime) -> MetadataResult<(u64, u64)> {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM peers")
                .fetch_one(&self.pool)
                .await?;
            let online: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM peers WHERE status = 'online' AND last_seen >= ?",
            )
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;
            Ok((total as u64, online as u64))
        }
    }

    #[async_trait]
    impl FileRepo for SqliteStore {
        async fn create_file(
            &self,
            file: &FileRow,
            deliveries: &[DeliveryRow],
        ) -> MetadataResult<()> {
            // One transaction: the record and every pending delivery land
            // together or not at all.
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                r#"
                INSERT INTO files (file_id, filename, filesize, checksum, owner, permission, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(file.file_id)
            .bind(&file.filename)
            .bind(file.filesize)
            .bind(&file.checksum)
            .bind(&file.owner)
            .bind(&file.permission)
            .bind(file.created_at)
            .execute(&mut *tx)
            .await?;

            for delivery in deliveries {
                sqlx::query(
                    r#"
                    INSERT INTO deliveries (file_id, recipient, position, status, reason, completed_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(delivery.file_id)
                .bind(&delivery.recipient)
                .bind(delivery.position)
                .bind(&delivery.status)
                .bind(&delivery.reason)
                .bind(delivery.completed_at)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(())
        }

        async fn get_file(&self, file_id: Uuid) -> MetadataResult<Option<FileRow>> {
            let row = sqlx::query_as::<_, FileRow>("SELECT * FROM files WHERE file_id = ?")
                .bind(file_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_sent_files(&self, owner: &str) -> MetadataResult<Vec<FileRow>> {
            let rows = sqlx::query_as::<_, FileRow>(
                "SELECT * FROM files WHERE owner = ? ORDER BY created_at DESC, file_id",
            )
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn list_received_files(
            &self,
            recipient: &str,
        ) -> MetadataResult<Vec<ReceivedFileRow>> {
            let rows = sqlx::query_as::<_, ReceivedFileRow>(
                r#"
                SELECT f.file_id, f.filename, f.filesize, f.checksum, f.owner,
                       f.permission, f.created_at, d.status, d.reason, d.completed_at
                FROM files f
                JOIN deliveries d ON d.file_id = f.file_id
                WHERE d.recipient = ?
                ORDER BY f.created_at DESC, f.file_id
                "#,
            )
            .bind(recipient)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }
    }

    #[async_trait]
    impl DeliveryRepo for SqliteStore {
        async fn get_deliveries(&self, file_id: Uuid) -> MetadataResult<Vec<DeliveryRow>> {
            let rows = sqlx::query_as::<_, DeliveryRow>(
                "SELECT * FROM deliveries WHERE file_id = ? ORDER BY position",
            )
            .bind(file_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn get_delivery(
            &self,
            file_id: Uuid,
            recipient: &str,
        ) -> MetadataResult<Option<DeliveryRow>> {
            let row = sqlx::query_as::<_, DeliveryRow>(
                "SELECT * FROM deliveries WHERE file_id = ? AND recipient = ?",
            )
            .bind(file_id)
            .bind(recipient)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn record_delivery(
            &self,
            file_id: Uuid,
            recipient: &str,
            status: DeliveryStatus,
            reason: Option<&str>,
            completed_at: OffsetDateTime,
        ) -> MetadataResult<()> {
            if !status.is_terminal() {
                return Err(MetadataError::InvalidArgument(format!(
                    "delivery outcome must be terminal, got '{status}'"
                )));
            }

            // Write-once: only a pending row transitions. The single-connection
            // pool serializes concurrent recorders, so exactly one UPDATE wins.
            let result = sqlx::query(
                "UPDATE deliveries SET status = ?, reason = ?, completed_at = ? \
                 WHERE file_id = ? AND recipient = ? AND status = 'pending'",
            )
            .bind(status.as_str())
            .bind(reason)
            .bind(completed_at)
            .bind(file_id)
            .bind(recipient)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return match self.get_delivery(file_id, recipient).await? {
                    Some(existing) => Err(MetadataError::InvalidState(format!(
                        "delivery for file {file_id} to '{recipient}' already recorded as '{}'",
                        existing.status
                    ))),
                    None => Err(MetadataError::NotFound(format!(
                        "no delivery for file {file_id} to '{recipient}'"
                    ))),
                };
            }
            Ok(())
        }

        async fn fanout_counts(&self, file_id: Uuid) -> MetadataResult<FanoutCounts> {
            let pending: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM deliveries WHERE file_id = ? AND status = 'pending'",
            )
            .bind(file_id)
            .fetch_one(&self.pool)
            .await?;
            let terminal: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM deliveries WHERE file_id = ? AND status != 'pending'",
            )
            .bind(file_id)
            .fetch_one(&self.pool)
            .await?;

            Ok(FanoutCounts {
                pending: pending as u64,
                terminal: terminal as u64,
            })
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Peer registry
CREATE TABLE IF NOT EXISTS peers (
    name TEXT PRIMARY KEY,
    address TEXT NOT NULL,
    port INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'online',
    last_seen TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_peers_status_seen ON peers(status, last_seen);

-- File ledger
CREATE TABLE IF NOT EXISTS files (
    file_id BLOB PRIMARY KEY,
    filename TEXT NOT NULL,
    filesize INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    owner TEXT NOT NULL,
    permission TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_files_owner ON files(owner, created_at);

-- Per-recipient delivery outcomes
CREATE TABLE IF NOT EXISTS deliveries (
    file_id BLOB NOT NULL REFERENCES files(file_id),
    recipient TEXT NOT NULL,
    position INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    reason TEXT,
    completed_at TEXT,
    PRIMARY KEY (file_id, recipient)
);
CREATE INDEX IF NOT EXISTS idx_deliveries_recipient ON deliveries(recipient);
"#;
