use chrono::{DateTime, Local};
use serde::Serialize;

use super::session::RecordingSession;
use crate::voice::ChannelId;

/// Read-only view of an active session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub text_channel_id: ChannelId,
    pub output_path: String,
    pub started_at: DateTime<Local>,
}

impl From<&RecordingSession> for SessionSummary {
    fn from(session: &RecordingSession) -> Self {
        Self {
            channel_id: session.channel.id,
            channel_name: session.channel.name.clone(),
            text_channel_id: session.text_channel_id,
            output_path: session.output_path.display().to_string(),
            started_at: session.started_at,
        }
    }
}
