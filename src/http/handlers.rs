use super::state::AppState;
use crate::session::SessionSummary;
use crate::voice::{CaptureState, ChannelId, MembershipEvent, UserId};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{debug, error};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// POST /voice/events
/// Queue a membership change from the gateway bridge
pub async fn post_event(
    State(state): State<AppState>,
    Json(event): Json<MembershipEvent>,
) -> impl IntoResponse {
    debug!(
        "Voice update from {} ({:?} -> {:?})",
        event.member.id,
        event.before.as_ref().map(|p| p.channel.id),
        event.after.as_ref().map(|p| p.channel.id)
    );

    state.dispatcher.dispatch(event).await;
    StatusCode::ACCEPTED
}

/// POST /voice/channels/:channel_id/audio/:user_id
/// Append received audio for one speaker
pub async fn push_audio(
    State(state): State<AppState>,
    Path((channel_id, user_id)): Path<(u64, u64)>,
    body: Bytes,
) -> impl IntoResponse {
    let channel_id = ChannelId(channel_id);

    match state.capture.push_audio(channel_id, UserId(user_id), &body) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Channel {} is not being recorded", channel_id),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to store audio for channel {}: {}", channel_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /voice/connections
/// Channels the bridge should be connected to, with their capture settings
pub async fn list_connections(State(state): State<AppState>) -> Json<Vec<CaptureState>> {
    Json(state.capture.connections())
}

/// GET /voice/channels/:channel_id/capture
/// Whether to stay connected to a channel and where its audio goes
pub async fn capture_state(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
) -> Json<CaptureState> {
    Json(state.capture.capture_state(ChannelId(channel_id)))
}

/// GET /sessions
/// List active recording sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.manager.active_sessions())
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
