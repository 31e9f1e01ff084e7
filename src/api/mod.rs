//! HTTP/WebSocket transport over the ring engine.
//!
//! The engine's operation contracts are the real API; this module is a thin
//! axum surface over them.

pub mod errors;
pub mod handlers;
pub mod websocket;

use crate::config::DemoSettings;
use crate::events::EventNotifier;
use crate::lifecycle::RingEngine;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
pub struct AppState {
    pub engine: Arc<RingEngine>,
    pub notifier: EventNotifier,
    pub demo: DemoSettings,
}

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/rings",
            post(handlers::create_ring_handler).get(handlers::list_rings_handler),
        )
        .route("/rings/:ring_id", get(handlers::get_ring_handler))
        .route("/rings/:ring_id/join", post(handlers::join_ring_handler))
        .route("/rings/:ring_id/spin", post(handlers::start_spin_handler))
        .route("/ws", get(websocket::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(cors_origins))
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}
