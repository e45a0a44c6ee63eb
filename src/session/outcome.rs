use std::path::PathBuf;
use std::time::Duration;

use crate::voice::ChannelId;

/// Why a stopped session left nothing behind
#[derive(Debug, Clone, PartialEq)]
pub enum DiscardReason {
    /// Shorter than the minimum recording duration
    TooShort(Duration),
    /// Capture returned no speaker buffers
    NoAudio,
    /// Capture sink failed on stop; treated as no audio
    CaptureFailed(String),
    /// The recording could not be written locally
    WriteFailed(String),
}

/// Final classification of a stopped session
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingOutcome {
    /// No file kept, nothing posted
    Discarded(DiscardReason),

    /// Stored remotely and shared; local copy removed when auto-delete is on
    Uploaded { link: String, remote_id: String },

    /// Upload failed; the local file is kept as-is
    UploadFailed { local_path: PathBuf, error: String },
}

impl RecordingOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, RecordingOutcome::Uploaded { .. })
    }
}

/// What handling an event did to a channel
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Started {
        channel_id: ChannelId,
        text_channel_id: ChannelId,
    },
    Stopped {
        channel_id: ChannelId,
        outcome: RecordingOutcome,
    },
}
