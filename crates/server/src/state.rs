//! Application state shared across handlers.

use crate::coordinator::TransferCoordinator;
use crate::transport::ByteTransport;
use courier_core::config::AppConfig;
use courier_metadata::MetadataStore;
use std::sync::Arc;
use time::OffsetDateTime;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Metadata store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Transfer coordinator.
    pub coordinator: Arc<TransferCoordinator>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Validates configuration and logs warnings for settings that are legal
    /// but likely mistakes.
    ///
    /// # Panics
    ///
    /// Panics if presence or transfer configuration validation fails with an
    /// error.
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        transport: Arc<dyn ByteTransport>,
    ) -> Self {
        match config.presence.validate() {
            Ok(warnings) => {
                for warning in warnings {
                    tracing::warn!("Configuration warning: {}", warning);
                }
            }
            Err(error) => {
                panic!("Invalid presence configuration: {}", error);
            }
        }
        if let Err(error) = config.transfer.validate() {
            panic!("Invalid transfer configuration: {}", error);
        }

        let config = Arc::new(config);
        let coordinator = Arc::new(TransferCoordinator::new(
            config.clone(),
            metadata.clone(),
            transport,
        ));

        Self {
            config,
            metadata,
            coordinator,
        }
    }

    /// The `last_seen` cutoff separating online peers from stale ones.
    pub fn online_cutoff(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc() - self.config.presence.liveness_threshold()
    }
}
