//! Integration tests for the SQLite metadata store.

mod common;

use common::fixtures::test_checksum;
use courier_core::DeliveryStatus;
use courier_metadata::models::{DeliveryRow, FileRow, PeerRow};
use courier_metadata::repos::{DeliveryRepo, FileRepo, PeerRepo};
use courier_metadata::{MetadataError, SqliteStore};
use time::OffsetDateTime;
use uuid::Uuid;

async fn test_store() -> (SqliteStore, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let store = SqliteStore::new(temp_dir.path().join("courier.db"))
        .await
        .expect("Failed to create metadata store");
    (store, temp_dir)
}

fn peer(name: &str, last_seen: OffsetDateTime) -> PeerRow {
    PeerRow {
        name: name.to_string(),
        address: "192.168.1.10".to_string(),
        port: 6000,
        status: "online".to_string(),
        last_seen,
        created_at: last_seen,
    }
}

fn file(owner: &str) -> FileRow {
    FileRow {
        file_id: Uuid::new_v4(),
        filename: "report.pdf".to_string(),
        filesize: 1024,
        checksum: test_checksum(b"report.pdf"),
        owner: owner.to_string(),
        permission: "private".to_string(),
        created_at: OffsetDateTime::now_utc(),
    }
}

fn pending_delivery(file_id: Uuid, recipient: &str, position: i32) -> DeliveryRow {
    DeliveryRow {
        file_id,
        recipient: recipient.to_string(),
        position,
        status: "pending".to_string(),
        reason: None,
        completed_at: None,
    }
}

#[tokio::test]
async fn upsert_preserves_created_at_and_updates_the_rest() {
    let (store, _dir) = test_store().await;
    let t0 = OffsetDateTime::now_utc() - time::Duration::minutes(10);
    store.upsert_peer(&peer("PC1", t0)).await.unwrap();

    let t1 = OffsetDateTime::now_utc();
    let mut refreshed = peer("PC1", t1);
    refreshed.address = "192.168.1.99".to_string();
    refreshed.created_at = t1;
    store.upsert_peer(&refreshed).await.unwrap();

    let stored = store.get_peer("PC1").await.unwrap().unwrap();
    assert_eq!(stored.address, "192.168.1.99");
    assert_eq!(stored.last_seen, t1);
    assert_eq!(stored.created_at, t0);
}

#[tokio::test]
async fn mark_offline_is_a_no_op_for_unknown_names() {
    let (store, _dir) = test_store().await;
    store
        .mark_peer_offline("ghost", OffsetDateTime::now_utc())
        .await
        .unwrap();
    assert!(store.get_peer("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn online_listing_applies_cutoff_exclusion_and_status() {
    let (store, _dir) = test_store().await;
    let now = OffsetDateTime::now_utc();
    store.upsert_peer(&peer("PC1", now)).await.unwrap();
    store.upsert_peer(&peer("PC2", now)).await.unwrap();
    store
        .upsert_peer(&peer("stale", now - time::Duration::hours(1)))
        .await
        .unwrap();
    store.upsert_peer(&peer("gone", now)).await.unwrap();
    store.mark_peer_offline("gone", now).await.unwrap();

    let cutoff = now - time::Duration::minutes(1);
    let online = store.list_online_peers(cutoff, Some("PC1")).await.unwrap();
    let names: Vec<_> = online.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["PC2"]);

    let (total, online_count) = store.peer_counts(cutoff).await.unwrap();
    assert_eq!(total, 4);
    assert_eq!(online_count, 2);
}

#[tokio::test]
async fn create_file_persists_deliveries_in_position_order() {
    let (store, _dir) = test_store().await;
    let record = file("PC1");
    let deliveries = vec![
        pending_delivery(record.file_id, "PC3", 0),
        pending_delivery(record.file_id, "PC2", 1),
    ];
    store.create_file(&record, &deliveries).await.unwrap();

    let stored = store.get_deliveries(record.file_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].recipient, "PC3");
    assert_eq!(stored[1].recipient, "PC2");
    assert!(stored.iter().all(|d| d.status == "pending"));
}

#[tokio::test]
async fn record_delivery_rejects_non_terminal_status() {
    let (store, _dir) = test_store().await;
    let record = file("PC1");
    let deliveries = vec![pending_delivery(record.file_id, "PC2", 0)];
    store.create_file(&record, &deliveries).await.unwrap();

    let err = store
        .record_delivery(
            record.file_id,
            "PC2",
            DeliveryStatus::Pending,
            None,
            OffsetDateTime::now_utc(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MetadataError::InvalidArgument(_)));
}

#[tokio::test]
async fn record_delivery_distinguishes_missing_from_already_recorded() {
    let (store, _dir) = test_store().await;
    let record = file("PC1");
    let deliveries = vec![pending_delivery(record.file_id, "PC2", 0)];
    store.create_file(&record, &deliveries).await.unwrap();
    let now = OffsetDateTime::now_utc();

    store
        .record_delivery(record.file_id, "PC2", DeliveryStatus::Success, None, now)
        .await
        .unwrap();

    let err = store
        .record_delivery(
            record.file_id,
            "PC2",
            DeliveryStatus::Failed,
            Some("late retry"),
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MetadataError::InvalidState(_)));

    let err = store
        .record_delivery(record.file_id, "PC9", DeliveryStatus::Failed, None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, MetadataError::NotFound(_)));

    // The first recording is untouched
    let stored = store.get_delivery(record.file_id, "PC2").await.unwrap().unwrap();
    assert_eq!(stored.status, "success");
    assert_eq!(stored.reason, None);
}

#[tokio::test]
async fn fanout_counts_track_terminal_transitions() {
    let (store, _dir) = test_store().await;
    let record = file("PC1");
    let deliveries = vec![
        pending_delivery(record.file_id, "PC2", 0),
        pending_delivery(record.file_id, "PC3", 1),
    ];
    store.create_file(&record, &deliveries).await.unwrap();

    let counts = store.fanout_counts(record.file_id).await.unwrap();
    assert_eq!((counts.pending, counts.terminal), (2, 0));

    store
        .record_delivery(
            record.file_id,
            "PC2",
            DeliveryStatus::Failed,
            Some("recipient offline"),
            OffsetDateTime::now_utc(),
        )
        .await
        .unwrap();
    let counts = store.fanout_counts(record.file_id).await.unwrap();
    assert_eq!((counts.pending, counts.terminal), (1, 1));
}

#[tokio::test]
async fn received_view_joins_the_recipients_own_outcome() {
    let (store, _dir) = test_store().await;
    let record = file("PC1");
    let deliveries = vec![
        pending_delivery(record.file_id, "PC2", 0),
        pending_delivery(record.file_id, "PC3", 1),
    ];
    store.create_file(&record, &deliveries).await.unwrap();
    store
        .record_delivery(
            record.file_id,
            "PC2",
            DeliveryStatus::Success,
            None,
            OffsetDateTime::now_utc(),
        )
        .await
        .unwrap();

    let received = store.list_received_files("PC2").await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].owner, "PC1");
    assert_eq!(received[0].status, "success");

    let received = store.list_received_files("PC3").await.unwrap();
    assert_eq!(received[0].status, "pending");

    let sent = store.list_sent_files("PC1").await.unwrap();
    assert_eq!(sent.len(), 1);
    assert!(store.list_sent_files("PC2").await.unwrap().is_empty());
}
