//! Core domain types and shared logic for Courier.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Checksum algorithms and fixed-length hex digests
//! - Peer identity validation and status
//! - Transfer permissions, delivery status, and fan-out lifecycle
//! - Application configuration

pub mod checksum;
pub mod config;
pub mod error;
pub mod peer;
pub mod transfer;

pub use checksum::{Checksum, ChecksumAlgorithm, ChecksumHasher};
pub use error::{Error, Result};
pub use peer::{MAX_PEER_NAME_LEN, PeerStatus, validate_peer_name, validate_port};
pub use transfer::{DeliveryStatus, FanoutState, Permission};

/// Recipient placeholder that expands to every online peer except the sender.
pub const WILDCARD_RECIPIENT: &str = "*";
