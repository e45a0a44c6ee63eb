//! HTTP ingress for the voice gateway bridge
//!
//! The bridge holds the platform connection, forwards what it sees and
//! polls which voice channels it should be in:
//! - POST /voice/events - Membership change (join/leave/move)
//! - POST /voice/channels/:channel_id/audio/:user_id - Received audio
//! - GET /voice/connections - Channels to join, with capture settings
//! - GET /voice/channels/:channel_id/capture - Join/leave state of one channel
//! - GET /sessions - Active recordings
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
