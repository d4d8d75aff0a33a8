//! Repository traits for metadata operations.

pub mod deliveries;
pub mod files;
pub mod peers;

pub use deliveries::{DeliveryRepo, FanoutCounts};
pub use files::FileRepo;
pub use peers::PeerRepo;
