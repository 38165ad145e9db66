//! Axum router construction for the gateway.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete router.
///
/// - `GET /api/instances` -- instances with their current status
/// - `GET /api/instances/{id}/snapshot` -- latest publication
/// - `GET /api/instances/{id}/entities` -- projected entity states
/// - `POST /api/instances/{id}/refresh` -- request a cycle
/// - `POST /api/instances/{id}/commands/{name}` -- run a command
/// - `POST /api/commands/{name}` -- run a command, target from the body
/// - `GET /api/instances/{id}/diagnostics` -- redacted config and a ping
/// - `GET /ws/instances/{id}` -- publication stream
///
/// CORS allows any origin; the gateway is meant for a trusted LAN.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/instances", get(handlers::list_instances))
        .route("/api/instances/{id}/snapshot", get(handlers::get_snapshot))
        .route("/api/instances/{id}/entities", get(handlers::get_entities))
        .route("/api/instances/{id}/refresh", post(handlers::refresh))
        .route(
            "/api/instances/{id}/commands/{name}",
            post(handlers::run_instance_command),
        )
        .route("/api/commands/{name}", post(handlers::run_command))
        .route(
            "/api/instances/{id}/diagnostics",
            get(handlers::get_diagnostics),
        )
        .route("/ws/instances/{id}", get(ws::ws_instance))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
