use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use super::model::{ChannelId, UserId, VoiceChannel};
use crate::error::Result;

/// Ownership token for an open capture
///
/// Not `Clone`: the only way to release a capture is to hand the token back
/// to [`CaptureSink::stop`], which consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct CaptureHandle {
    pub channel_id: ChannelId,
    pub capture_id: u64,
}

/// Audio heard from one speaker, spooled to disk in the container format
///
/// The file belongs to whoever receives the [`CapturedAudio`]; it is either
/// moved into place as the recording or removed.
#[derive(Debug, Clone)]
pub struct SpeakerAudio {
    pub speaker: UserId,
    pub path: PathBuf,
}

/// Everything a capture produced once stopped
#[derive(Debug, Clone, Default)]
pub struct CapturedAudio {
    /// Per-speaker spool files in first-heard order
    pub buffers: Vec<SpeakerAudio>,
    pub elapsed: Duration,
}

/// Voice connection plus audio receive pipeline for a channel
#[async_trait]
pub trait CaptureSink: Send + Sync {
    /// Join the channel and start receiving audio
    async fn start(&self, channel: &VoiceChannel) -> Result<CaptureHandle>;

    /// Stop receiving and return what was captured
    async fn stop(&self, handle: CaptureHandle) -> Result<CapturedAudio>;

    /// Leave the voice channel
    async fn disconnect(&self, channel_id: ChannelId) -> Result<()>;

    /// Sink name for logging
    fn name(&self) -> &str;
}
