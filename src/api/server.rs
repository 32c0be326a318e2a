//! HTTP server setup and routing
//!
//! Axum router for the control endpoints and the SSE event stream. The
//! HTTP surface is the command interface handed to whatever front end or
//! lifecycle shim drives the player.

use crate::events::EventBus;
use crate::playback::session::PlaybackSession;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub session: Arc<PlaybackSession>,
    pub events: EventBus,
}

/// Build the application router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Session snapshot for display
        .route("/status", get(super::handlers::get_status))
        // Playback control
        .route("/playback/play", post(super::handlers::play))
        .route("/playback/stop", post(super::handlers::stop))
        .route("/playback/toggle", post(super::handlers::toggle))
        .route(
            "/playback/noise",
            get(super::handlers::get_noise).post(super::handlers::set_noise),
        )
        .route("/playback/noise/next", post(super::handlers::next_noise))
        .route("/playback/noise/prev", post(super::handlers::prev_noise))
        .route(
            "/playback/timer",
            get(super::handlers::get_timer).post(super::handlers::set_timer),
        )
        // Audio device management
        .route(
            "/audio/volume",
            get(super::handlers::get_volume).post(super::handlers::set_volume),
        )
        .route("/audio/devices", get(super::handlers::list_audio_devices))
        // SSE event stream
        .route("/events", get(super::handlers::event_stream))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
