use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Voice bridge ingress
        .route("/voice/events", post(handlers::post_event))
        .route(
            "/voice/channels/:channel_id/audio/:user_id",
            post(handlers::push_audio),
        )
        .route("/voice/connections", get(handlers::list_connections))
        .route(
            "/voice/channels/:channel_id/capture",
            get(handlers::capture_state),
        )
        // Registry view
        .route("/sessions", get(handlers::list_sessions))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
