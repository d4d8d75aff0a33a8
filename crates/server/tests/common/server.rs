//! Server test utilities.

use super::transport::MockTransport;
use courier_core::config::{AppConfig, MetadataConfig};
use courier_metadata::{MetadataStore, SqliteStore};
use courier_server::{AppState, create_router};
use std::sync::Arc;
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub transport: Arc<MockTransport>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with a temporary database.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        // Create metadata
        let db_path = temp_dir.path().join("courier.db");
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );

        let mut config = AppConfig {
            metadata: MetadataConfig::Sqlite {
                path: db_path.clone(),
            },
            ..AppConfig::for_testing()
        };

        // Apply user modifications
        modifier(&mut config);

        let transport = Arc::new(MockTransport::new());

        // Create state
        let state = AppState::new(config, metadata, transport.clone());

        // Create router
        let router = create_router(state.clone());

        Self {
            router,
            state,
            transport,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying metadata.
    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }
}
