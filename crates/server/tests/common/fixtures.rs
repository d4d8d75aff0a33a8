//! Test fixtures for generating test data.

use courier_core::checksum::ChecksumAlgorithm;
use serde_json::{Value, json};

/// Compute the hex SHA-256 checksum of data.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub fn test_checksum(data: &[u8]) -> String {
    ChecksumAlgorithm::Sha256.compute(data).to_string()
}

/// Registration body for a test peer on 192.168.1.x.
#[allow(dead_code)]
pub fn peer_body(name: &str, host_octet: u8) -> Value {
    json!({
        "name": name,
        "address": format!("192.168.1.{}", host_octet),
        "port": 6000,
    })
}

/// Intent body for a file owned by `owner` with the given recipients.
#[allow(dead_code)]
pub fn file_body(owner: &str, filename: &str, recipients: &[&str]) -> Value {
    let data = filename.as_bytes();
    json!({
        "filename": filename,
        "filesize": data.len(),
        "checksum": test_checksum(data),
        "owner": owner,
        "recipients": recipients,
    })
}
