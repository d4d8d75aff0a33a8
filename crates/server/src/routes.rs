//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (intentionally unauthenticated for probes)
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/status", get(handlers::server_status))
        // Peer registry
        .route(
            "/v1/peers",
            post(handlers::register_peer).get(handlers::list_peers),
        )
        // Static segment wins over the {name} capture below
        .route("/v1/peers/online", get(handlers::list_online_peers))
        .route("/v1/peers/{name}", get(handlers::get_peer))
        .route("/v1/peers/{name}", delete(handlers::unregister_peer))
        .route("/v1/peers/{name}/files", get(handlers::list_peer_files))
        // File ledger
        .route("/v1/files", post(handlers::register_file))
        .route("/v1/files/{file_id}", get(handlers::get_file))
        .route(
            "/v1/files/{file_id}/deliveries/{recipient}",
            post(handlers::record_delivery),
        )
        // Coordinated sends
        .route("/v1/transfers", post(handlers::create_transfer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
