//! HTTP request handlers.

pub mod files;
pub mod peers;
pub mod status;
pub mod transfers;

pub use files::*;
pub use peers::*;
pub use status::*;
pub use transfers::*;
