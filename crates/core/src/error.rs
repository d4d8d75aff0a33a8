//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid peer name: {0}")]
    InvalidPeerName(String),

    #[error("invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u32),

    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    #[error("invalid delivery status: {0}")]
    InvalidDeliveryStatus(String),

    #[error("invalid permission: {0}")]
    InvalidPermission(String),

    #[error("invalid peer status: {0}")]
    InvalidPeerStatus(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
