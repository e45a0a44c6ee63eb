use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::capture::{CaptureHandle, CaptureSink, CapturedAudio, SpeakerAudio};
use super::model::{ChannelId, UserId, VoiceChannel};
use crate::config::{CaptureConfig, Config};
use crate::error::{RecorderError, Result};
use crate::sync::lock;

/// How the bridge is expected to deliver audio
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub capture: CaptureConfig,
    /// Container of pushed audio; "wav" means raw i16 PCM wrapped here
    pub format: String,
    /// Encoder bitrate for formats the bridge encodes itself
    pub bitrate_bps: u32,
    /// Per-speaker audio is appended here while a capture is open
    pub spool_dir: PathBuf,
}

impl BridgeSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            capture: cfg.capture.clone(),
            format: cfg.recording_format.clone(),
            bitrate_bps: cfg.bitrate_bps(),
            spool_dir: cfg.spool_dir(),
        }
    }

    fn is_wav(&self) -> bool {
        self.format.eq_ignore_ascii_case("wav")
    }
}

/// What the bridge should be doing for one voice channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureState {
    pub channel_id: ChannelId,
    /// Hold a voice connection to the channel
    pub connected: bool,
    /// Set while audio for the channel is accepted
    pub capture_id: Option<u64>,
    pub format: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Bits per second, for formats the bridge encodes
    pub bitrate: u32,
}

/// Capture sink fed by the voice gateway bridge
///
/// The bridge owns the actual voice connection. It polls
/// [`BridgeCaptureSink::connections`] to learn which channels to join or
/// leave and pushes received audio through [`BridgeCaptureSink::push_audio`].
/// Audio is streamed to one spool file per speaker, and only while a capture
/// is open on the channel.
pub struct BridgeCaptureSink {
    settings: BridgeSettings,
    captures: Mutex<HashMap<ChannelId, OpenCapture>>,
    connected: Mutex<HashSet<ChannelId>>,
    next_capture_id: AtomicU64,
}

struct OpenCapture {
    capture_id: u64,
    started: Instant,
    /// First-heard order
    speakers: Vec<SpeakerSpool>,
}

struct SpeakerSpool {
    speaker: UserId,
    path: PathBuf,
    writer: SpoolWriter,
}

enum SpoolWriter {
    /// Little-endian i16 PCM; an odd trailing byte waits for the next push
    Wav {
        writer: hound::WavWriter<BufWriter<File>>,
        pending: Option<u8>,
    },
    /// Bytes already in the target container
    Raw(BufWriter<File>),
}

impl SpoolWriter {
    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        match self {
            SpoolWriter::Wav { writer, pending } => {
                let mut bytes = bytes;
                if let Some(low) = pending.take() {
                    let Some((&high, rest)) = bytes.split_first() else {
                        *pending = Some(low);
                        return Ok(());
                    };
                    writer
                        .write_sample(i16::from_le_bytes([low, high]))
                        .context("Failed to write sample to WAV")?;
                    bytes = rest;
                }

                let mut samples = bytes.chunks_exact(2);
                for pair in &mut samples {
                    writer
                        .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                        .context("Failed to write sample to WAV")?;
                }
                if let [odd] = samples.remainder() {
                    *pending = Some(*odd);
                }
                Ok(())
            }
            SpoolWriter::Raw(file) => file.write_all(bytes).context("Failed to append audio"),
        }
    }

    fn finish(self) -> anyhow::Result<()> {
        match self {
            SpoolWriter::Wav { writer, .. } => writer.finalize().context("Failed to finalize WAV"),
            SpoolWriter::Raw(mut file) => file.flush().context("Failed to flush audio"),
        }
    }
}

impl BridgeCaptureSink {
    pub fn new(settings: BridgeSettings) -> Self {
        Self {
            settings,
            captures: Mutex::new(HashMap::new()),
            connected: Mutex::new(HashSet::new()),
            next_capture_id: AtomicU64::new(1),
        }
    }

    /// Append audio from one speaker. Returns false when no capture is open.
    pub fn push_audio(&self, channel_id: ChannelId, speaker: UserId, bytes: &[u8]) -> Result<bool> {
        let mut captures = lock(&self.captures);
        let Some(capture) = captures.get_mut(&channel_id) else {
            debug!("Dropping {} bytes for channel {} (not capturing)", bytes.len(), channel_id);
            return Ok(false);
        };

        let index = match capture.speakers.iter().position(|s| s.speaker == speaker) {
            Some(index) => index,
            None => {
                let spool = self.open_spool(capture.capture_id, speaker)?;
                capture.speakers.push(spool);
                capture.speakers.len() - 1
            }
        };

        capture.speakers[index]
            .writer
            .write(bytes)
            .map_err(|e| RecorderError::Capture(format!("{:#}", e)))?;
        Ok(true)
    }

    pub fn capture_state(&self, channel_id: ChannelId) -> CaptureState {
        let capture_id = lock(&self.captures).get(&channel_id).map(|c| c.capture_id);
        let connected = lock(&self.connected).contains(&channel_id);

        CaptureState {
            channel_id,
            connected,
            capture_id,
            format: self.settings.format.clone(),
            sample_rate: self.settings.capture.sample_rate,
            channels: self.settings.capture.channels,
            bitrate: self.settings.bitrate_bps,
        }
    }

    /// Channels the bridge should currently hold a connection to
    pub fn connections(&self) -> Vec<CaptureState> {
        let channels: Vec<ChannelId> = lock(&self.connected).iter().copied().collect();
        let mut states: Vec<CaptureState> =
            channels.into_iter().map(|id| self.capture_state(id)).collect();
        states.sort_by_key(|s| s.channel_id);
        states
    }

    fn open_spool(&self, capture_id: u64, speaker: UserId) -> Result<SpeakerSpool> {
        let path = self
            .settings
            .spool_dir
            .join(format!("{}-{}.part", capture_id, speaker));

        let writer = if self.settings.is_wav() {
            let spec = hound::WavSpec {
                channels: self.settings.capture.channels,
                sample_rate: self.settings.capture.sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let writer = hound::WavWriter::create(&path, spec).map_err(|e| {
                RecorderError::Capture(format!("Failed to create {}: {}", path.display(), e))
            })?;
            SpoolWriter::Wav {
                writer,
                pending: None,
            }
        } else {
            SpoolWriter::Raw(BufWriter::new(File::create(&path)?))
        };

        debug!("Spooling audio from {} to {}", speaker, path.display());

        Ok(SpeakerSpool {
            speaker,
            path,
            writer,
        })
    }
}

#[async_trait]
impl CaptureSink for BridgeCaptureSink {
    async fn start(&self, channel: &VoiceChannel) -> Result<CaptureHandle> {
        tokio::fs::create_dir_all(&self.settings.spool_dir).await?;

        let capture_id = self.next_capture_id.fetch_add(1, Ordering::SeqCst);

        {
            let mut captures = lock(&self.captures);
            if captures.contains_key(&channel.id) {
                return Err(RecorderError::Capture(format!(
                    "channel {} is already being captured",
                    channel.id
                )));
            }
            captures.insert(
                channel.id,
                OpenCapture {
                    capture_id,
                    started: Instant::now(),
                    speakers: Vec::new(),
                },
            );
        }
        lock(&self.connected).insert(channel.id);

        info!("Capture {} opened on {} ({})", capture_id, channel.name, channel.id);

        Ok(CaptureHandle {
            channel_id: channel.id,
            capture_id,
        })
    }

    async fn stop(&self, handle: CaptureHandle) -> Result<CapturedAudio> {
        let capture = {
            let mut captures = lock(&self.captures);
            let is_open = captures
                .get(&handle.channel_id)
                .is_some_and(|open| open.capture_id == handle.capture_id);
            if is_open {
                captures.remove(&handle.channel_id)
            } else {
                None
            }
        };

        let Some(capture) = capture else {
            return Err(RecorderError::Capture(format!(
                "capture {} on channel {} is not open",
                handle.capture_id, handle.channel_id
            )));
        };

        let elapsed = capture.started.elapsed();
        let mut buffers = Vec::with_capacity(capture.speakers.len());

        for SpeakerSpool {
            speaker,
            path,
            writer,
        } in capture.speakers
        {
            match writer.finish() {
                Ok(()) => buffers.push(SpeakerAudio { speaker, path }),
                Err(e) => {
                    warn!("Dropping audio from {}: {:#}", speaker, e);
                    if let Err(e) = std::fs::remove_file(&path) {
                        debug!("Could not remove {}: {}", path.display(), e);
                    }
                }
            }
        }

        info!(
            "Capture {} closed on {}: {:.1}s, {} speaker(s)",
            handle.capture_id,
            handle.channel_id,
            elapsed.as_secs_f64(),
            buffers.len()
        );

        Ok(CapturedAudio { buffers, elapsed })
    }

    async fn disconnect(&self, channel_id: ChannelId) -> Result<()> {
        if lock(&self.connected).remove(&channel_id) {
            info!("Left voice channel {}", channel_id);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "voice-bridge"
    }
}
