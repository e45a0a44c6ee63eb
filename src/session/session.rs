use chrono::{DateTime, Local};
use std::path::PathBuf;

use crate::voice::{CaptureHandle, ChannelId, VoiceChannel};

/// One in-progress recording of a voice channel
#[derive(Debug)]
pub struct RecordingSession {
    /// Channel being recorded; `channel.id` is the registry key
    pub channel: VoiceChannel,

    /// Released exactly once, by the stop sequence
    pub capture: CaptureHandle,

    /// Where the recording is written; never reused across sessions
    pub output_path: PathBuf,

    pub file_name: String,

    pub started_at: DateTime<Local>,

    /// Text channel resolved at start and notified at the end
    pub text_channel_id: ChannelId,
}

impl RecordingSession {
    pub fn channel_id(&self) -> ChannelId {
        self.channel.id
    }
}

/// Replace everything except ASCII letters, digits, `-` and `_` with `_`
pub fn sanitize_channel_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `{YYYY-MM-DDTHH-MM-SS}_{sanitized channel}.{format}`
///
/// Second resolution: two sessions of one channel started within the same
/// second get the same name.
pub fn recording_filename(started_at: DateTime<Local>, channel_name: &str, format: &str) -> String {
    format!(
        "{}_{}.{}",
        started_at.format("%Y-%m-%dT%H-%M-%S"),
        sanitize_channel_name(channel_name),
        format
    )
}
