//! Integration tests for the file ledger endpoints.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestServer;
use common::fixtures::{file_body, peer_body, test_checksum};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

/// Helper to make JSON requests.
async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

async fn register_peers(server: &TestServer, names: &[&str]) {
    for (i, name) in names.iter().enumerate() {
        let (status, _) = json_request(
            &server.router,
            "POST",
            "/v1/peers",
            Some(peer_body(name, 10 + i as u8)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

async fn register_file(server: &TestServer, owner: &str, recipients: &[&str]) -> Value {
    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/files",
        Some(file_body(owner, "report.pdf", recipients)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registering file: {body}");
    body
}

#[tokio::test]
async fn intent_creates_one_pending_delivery_per_recipient() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC1", "PC2", "PC3"]).await;

    let body = register_file(&server, "PC1", &["PC2", "PC3"]).await;
    assert_eq!(body["owner"], "PC1");
    assert_eq!(body["state"], "created");

    let deliveries = body["deliveries"].as_array().unwrap();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[0]["recipient"], "PC2");
    assert_eq!(deliveries[1]["recipient"], "PC3");
    for delivery in deliveries {
        assert_eq!(delivery["status"], "pending");
        assert_eq!(delivery["reason"], Value::Null);
        assert_eq!(delivery["completed_at"], Value::Null);
    }
}

#[tokio::test]
async fn permission_derives_from_recipient_count() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC1", "PC2", "PC3"]).await;

    let single = register_file(&server, "PC1", &["PC2"]).await;
    assert_eq!(single["permission"], "private");

    let multi = register_file(&server, "PC1", &["PC2", "PC3"]).await;
    assert_eq!(multi["permission"], "public");
}

#[tokio::test]
async fn duplicate_recipients_collapse_to_first_occurrence() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC1", "PC2", "PC3"]).await;

    let body = register_file(&server, "PC1", &["PC2", "PC3", "PC2"]).await;
    let deliveries = body["deliveries"].as_array().unwrap();
    assert_eq!(deliveries.len(), 2);
    assert_eq!(deliveries[0]["recipient"], "PC2");
    assert_eq!(deliveries[1]["recipient"], "PC3");
    assert_eq!(body["permission"], "public");
}

#[tokio::test]
async fn intent_rejects_unknown_owner_with_404() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC2"]).await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/files",
        Some(file_body("ghost", "report.pdf", &["PC2"])),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn intent_rejects_unknown_recipient_with_400() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC1"]).await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/v1/files",
        Some(file_body("PC1", "report.pdf", &["ghost"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_argument");
}

#[tokio::test]
async fn intent_rejects_sender_as_recipient() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC1", "PC2"]).await;

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/files",
        Some(file_body("PC1", "report.pdf", &["PC2", "PC1"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn intent_rejects_empty_recipients_and_bad_checksum() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC1", "PC2"]).await;

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/files",
        Some(file_body("PC1", "report.pdf", &[])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/files",
        Some(json!({
            "filename": "report.pdf",
            "filesize": 10,
            "checksum": "not-a-digest",
            "owner": "PC1",
            "recipients": ["PC2"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_file_returns_404() {
    let server = TestServer::new().await;

    let uri = format!("/v1/files/{}", Uuid::new_v4());
    let (status, body) = json_request(&server.router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn record_delivery_is_write_once() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC1", "PC2"]).await;
    let file = register_file(&server, "PC1", &["PC2"]).await;
    let file_id = file["file_id"].as_str().unwrap().to_string();

    let uri = format!("/v1/files/{file_id}/deliveries/PC2");
    let (status, body) = json_request(
        &server.router,
        "POST",
        &uri,
        Some(json!({"status": "success"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(body["completed_at"].is_string());

    // Second recording loses and the stored outcome is unchanged
    let (status, body) = json_request(
        &server.router,
        "POST",
        &uri,
        Some(json!({"status": "failed", "reason": "late retry"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_state");

    let (_, file) = json_request(&server.router, "GET", &format!("/v1/files/{file_id}"), None).await;
    assert_eq!(file["deliveries"][0]["status"], "success");
    assert_eq!(file["deliveries"][0]["reason"], Value::Null);
}

#[tokio::test]
async fn record_delivery_unknown_pair_returns_404() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC1", "PC2", "PC3"]).await;
    let file = register_file(&server, "PC1", &["PC2"]).await;
    let file_id = file["file_id"].as_str().unwrap().to_string();

    // PC3 is a registered peer but not a recipient of this file
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/files/{file_id}/deliveries/PC3"),
        Some(json!({"status": "success"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/files/{}/deliveries/PC2", Uuid::new_v4()),
        Some(json!({"status": "success"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fanout_state_follows_delivery_recordings() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC1", "PC2", "PC3"]).await;
    let file = register_file(&server, "PC1", &["PC2", "PC3"]).await;
    let file_id = file["file_id"].as_str().unwrap().to_string();
    let file_uri = format!("/v1/files/{file_id}");

    json_request(
        &server.router,
        "POST",
        &format!("{file_uri}/deliveries/PC2"),
        Some(json!({"status": "success"})),
    )
    .await;
    let (_, body) = json_request(&server.router, "GET", &file_uri, None).await;
    assert_eq!(body["state"], "in_progress");

    json_request(
        &server.router,
        "POST",
        &format!("{file_uri}/deliveries/PC3"),
        Some(json!({"status": "failed", "reason": "connection refused"})),
    )
    .await;
    let (_, body) = json_request(&server.router, "GET", &file_uri, None).await;
    assert_eq!(body["state"], "complete");
}

#[tokio::test]
async fn sent_view_lists_only_the_owners_files() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC1", "PC2", "PC3"]).await;
    register_file(&server, "PC1", &["PC2"]).await;
    register_file(&server, "PC3", &["PC2"]).await;

    let (status, body) = json_request(
        &server.router,
        "GET",
        "/v1/peers/PC1/files?direction=sent",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["files"][0]["owner"], "PC1");

    let (_, body) = json_request(
        &server.router,
        "GET",
        "/v1/peers/PC2/files?direction=sent",
        None,
    )
    .await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn received_view_carries_the_recipients_own_outcome() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC1", "PC2", "PC3"]).await;
    let file = register_file(&server, "PC1", &["PC2", "PC3"]).await;
    let file_id = file["file_id"].as_str().unwrap().to_string();

    json_request(
        &server.router,
        "POST",
        &format!("/v1/files/{file_id}/deliveries/PC2"),
        Some(json!({"status": "failed", "reason": "checksum mismatch"})),
    )
    .await;

    let (status, body) = json_request(
        &server.router,
        "GET",
        "/v1/peers/PC2/files?direction=received",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["files"][0]["owner"], "PC1");
    assert_eq!(body["files"][0]["status"], "failed");
    assert_eq!(body["files"][0]["reason"], "checksum mismatch");
    assert_eq!(
        body["files"][0]["checksum"],
        test_checksum("report.pdf".as_bytes())
    );

    // PC3's outcome is still pending and independent of PC2's
    let (_, body) = json_request(
        &server.router,
        "GET",
        "/v1/peers/PC3/files?direction=received",
        None,
    )
    .await;
    assert_eq!(body["files"][0]["status"], "pending");
}

#[tokio::test]
async fn history_views_validate_peer_and_direction() {
    let server = TestServer::new().await;
    register_peers(&server, &["PC1"]).await;

    let (status, _) = json_request(
        &server.router,
        "GET",
        "/v1/peers/ghost/files?direction=sent",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = json_request(
        &server.router,
        "GET",
        "/v1/peers/PC1/files?direction=sideways",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_argument");
}
