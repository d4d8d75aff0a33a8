//! HTTP coordination server for Courier.
//!
//! This crate provides the transfer control plane:
//! - Peer registration, discovery, and lazy liveness expiry
//! - File intent registration with per-recipient delivery tracking
//! - Coordinated multi-recipient fan-out with checksum verification
//! - Sent/received history views

pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod transport;

pub use coordinator::{SendOutcome, SendRequest, TransferCoordinator};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
pub use transport::{ByteTransport, DeliveryReceipt, DeliveryRequest, HttpTransport};
