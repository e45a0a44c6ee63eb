use chrono::Local;
use futures::future::join_all;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::outcome::{DiscardReason, RecordingOutcome, Transition};
use super::resolve::resolve_text_channel;
use super::session::{recording_filename, RecordingSession};
use super::stats::SessionSummary;
use crate::config::Config;
use crate::error::{RecorderError, Result};
use crate::notify::Notifier;
use crate::storage::{mime_type_for, ObjectStorage, UploadMetadata};
use crate::sync::lock;
use crate::voice::{
    CaptureSink, CapturedAudio, ChannelId, GuildSnapshot, MembershipEvent, SpeakerAudio,
    VoicePresence,
};

/// Recordings shorter than this are dropped
pub const MIN_RECORDING_DURATION: Duration = Duration::from_secs(3);

/// Non-bot members needed before a channel is recorded
pub const START_THRESHOLD: usize = 2;

type Slot = Arc<Mutex<Option<RecordingSession>>>;

/// Owns the channel → session registry and drives start/stop
///
/// Each channel has its own async lock, held for the whole start or stop
/// sequence (upload included). Events for other channels never wait on it.
pub struct SessionManager {
    config: Arc<Config>,
    capture: Arc<dyn CaptureSink>,
    storage: Arc<dyn ObjectStorage>,
    notifier: Arc<dyn Notifier>,

    /// Per-channel slots; `Some` means the channel is recording. Empty slots
    /// are dropped once no task holds them.
    slots: StdMutex<HashMap<ChannelId, Slot>>,

    /// Summaries of registered sessions, readable while a slot is busy
    active: StdMutex<HashMap<ChannelId, SessionSummary>>,
}

impl SessionManager {
    pub fn new(
        config: Arc<Config>,
        capture: Arc<dyn CaptureSink>,
        storage: Arc<dyn ObjectStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        info!("Session manager using capture sink: {}", capture.name());

        Self {
            config,
            capture,
            storage,
            notifier,
            slots: StdMutex::new(HashMap::new()),
            active: StdMutex::new(HashMap::new()),
        }
    }

    /// Handle every side of a membership event.
    ///
    /// Errors are logged here and never escape; the returned transitions
    /// describe what changed.
    pub async fn handle_event(&self, event: &MembershipEvent) -> Vec<Transition> {
        self.handle_sides(event, None).await
    }

    /// Handle only the side of `event` that concerns `channel_id`
    pub async fn handle_event_on(
        &self,
        channel_id: ChannelId,
        event: &MembershipEvent,
    ) -> Vec<Transition> {
        self.handle_sides(event, Some(channel_id)).await
    }

    async fn handle_sides(
        &self,
        event: &MembershipEvent,
        only: Option<ChannelId>,
    ) -> Vec<Transition> {
        if event.is_same_channel() {
            return Vec::new();
        }

        if event.member.bot {
            debug!("Ignoring voice update from bot {}", event.member.id);
            return Vec::new();
        }

        let wanted = |presence: &VoicePresence| only.map_or(true, |id| id == presence.channel.id);
        let mut transitions = Vec::new();

        if let Some(after) = event.after.as_ref().filter(|p| wanted(*p)) {
            match self.on_join(&event.guild, after).await {
                Ok(Some(t)) => transitions.push(t),
                Ok(None) => {}
                Err(e @ RecorderError::Resolution(_)) => warn!("{}", e),
                Err(e) => error!(
                    "Failed to start recording in {} ({}): {}",
                    after.channel.name, after.channel.id, e
                ),
            }
        }

        if let Some(before) = event.before.as_ref().filter(|p| wanted(*p)) {
            if let Some(t) = self.on_leave(before).await {
                transitions.push(t);
            }
        }

        transitions
    }

    async fn on_join(
        &self,
        guild: &GuildSnapshot,
        presence: &VoicePresence,
    ) -> Result<Option<Transition>> {
        if presence.non_bot_members < START_THRESHOLD {
            return Ok(None);
        }

        let channel_id = presence.channel.id;
        let slot = self.slot(channel_id);
        let started = {
            let mut guard = slot.lock().await;
            self.start_session(&mut *guard, guild, presence).await
        };
        self.release_slot(channel_id, slot);

        let Some(text_channel_id) = started? else {
            return Ok(None);
        };

        if let Err(e) = self
            .notifier
            .send(text_channel_id, &self.config.message_templates.recording_start)
            .await
        {
            warn!("Could not announce recording in {}: {}", text_channel_id, e);
        }

        Ok(Some(Transition::Started {
            channel_id,
            text_channel_id,
        }))
    }

    /// Open a capture and register the session; returns the text channel
    async fn start_session(
        &self,
        slot: &mut Option<RecordingSession>,
        guild: &GuildSnapshot,
        presence: &VoicePresence,
    ) -> Result<Option<ChannelId>> {
        let channel = &presence.channel;
        if slot.is_some() {
            debug!("{} is already being recorded", channel.name);
            return Ok(None);
        }

        let text_channel_id = resolve_text_channel(guild, channel)
            .ok_or_else(|| RecorderError::Resolution(channel.name.clone()))?;

        info!("Recording start: {} ({})", channel.name, guild.name);

        let started_at = Local::now();
        let file_name = recording_filename(started_at, &channel.name, &self.config.recording_format);
        let output_path = self.config.storage_dir().join(&file_name);

        let capture = self.capture.start(channel).await?;

        info!("Recording file: {}", output_path.display());

        let session = RecordingSession {
            channel: channel.clone(),
            capture,
            output_path,
            file_name,
            started_at,
            text_channel_id,
        };
        lock(&self.active).insert(channel.id, SessionSummary::from(&session));
        *slot = Some(session);

        Ok(Some(text_channel_id))
    }

    async fn on_leave(&self, presence: &VoicePresence) -> Option<Transition> {
        if presence.non_bot_members != 0 {
            return None;
        }

        let channel_id = presence.channel.id;
        let slot = self.existing_slot(channel_id)?;
        let outcome = {
            let mut guard = slot.lock().await;
            match guard.take() {
                Some(session) => {
                    info!("Recording stop: {}", presence.channel.name);
                    Some(self.finish(session).await)
                }
                None => None,
            }
        };
        self.release_slot(channel_id, slot);

        Some(Transition::Stopped {
            channel_id,
            outcome: outcome?,
        })
    }

    /// Stop, classify, deregister, disconnect, then notify on success
    async fn finish(&self, session: RecordingSession) -> RecordingOutcome {
        let channel_id = session.channel_id();
        let text_channel_id = session.text_channel_id;

        let outcome = self.conclude(session).await;

        lock(&self.active).remove(&channel_id);

        if let Err(e) = self.capture.disconnect(channel_id).await {
            warn!("Failed to leave voice channel {}: {}", channel_id, e);
        }

        match &outcome {
            RecordingOutcome::Uploaded { link, .. } => {
                let templates = &self.config.message_templates;
                for message in [templates.recording_end.clone(), templates.share_link(link)] {
                    if let Err(e) = self.notifier.send(text_channel_id, &message).await {
                        warn!("Could not post recording result to {}: {}", text_channel_id, e);
                        break;
                    }
                }
            }
            RecordingOutcome::UploadFailed { local_path, error } => {
                error!(
                    "Upload failed, recording kept at {}: {}",
                    local_path.display(),
                    error
                );
            }
            RecordingOutcome::Discarded(reason) => {
                debug!("Recording on {} discarded: {:?}", channel_id, reason);
            }
        }

        outcome
    }

    /// Steps from capture-stop to upload; never deletes an unconfirmed file
    async fn conclude(&self, session: RecordingSession) -> RecordingOutcome {
        let RecordingSession {
            channel,
            capture,
            output_path,
            file_name,
            ..
        } = session;

        let CapturedAudio { buffers, elapsed } = match self.capture.stop(capture).await {
            Ok(captured) => captured,
            Err(e) => {
                error!("Capture failed on {}: {}", channel.name, e);
                return RecordingOutcome::Discarded(DiscardReason::CaptureFailed(e.to_string()));
            }
        };

        if elapsed < MIN_RECORDING_DURATION {
            info!("Recording too short, skipping: {:.1}s", elapsed.as_secs_f64());
            remove_spooled(buffers).await;
            return RecordingOutcome::Discarded(DiscardReason::TooShort(elapsed));
        }

        // Mixing is not implemented: only the first speaker's audio is kept.
        let mut buffers = buffers.into_iter();
        let Some(first) = buffers.next() else {
            warn!("No audio captured on {}", channel.name);
            return RecordingOutcome::Discarded(DiscardReason::NoAudio);
        };
        remove_spooled(buffers).await;

        if let Err(e) = persist_recording(&first.path, &output_path).await {
            error!("Failed to write {}: {}", output_path.display(), e);
            remove_spooled([first]).await;
            return RecordingOutcome::Discarded(DiscardReason::WriteFailed(e.to_string()));
        }

        info!(
            "Recording saved: {} ({:.1}s)",
            output_path.display(),
            elapsed.as_secs_f64()
        );

        let metadata = UploadMetadata {
            name: file_name.clone(),
            description: format!(
                "Voice channel \"{}\" recording - {}",
                channel.name,
                Local::now().format("%Y-%m-%d %H:%M:%S")
            ),
            parent_folder: self.config.google_drive_folder_id.clone(),
            mime_type: mime_type_for(&file_name).to_string(),
        };

        let stored = match self.storage.upload(&output_path, &metadata).await {
            Ok(stored) => stored,
            Err(e) => {
                return RecordingOutcome::UploadFailed {
                    local_path: output_path,
                    error: e.to_string(),
                }
            }
        };

        if let Err(e) = self.storage.share_publicly(&stored.id).await {
            return RecordingOutcome::UploadFailed {
                local_path: output_path,
                error: e.to_string(),
            };
        }

        if self.config.auto_delete_local_files {
            match tokio::fs::remove_file(&output_path).await {
                Ok(()) => info!("Deleted local file: {}", output_path.display()),
                Err(e) => warn!("Failed to delete {}: {}", output_path.display(), e),
            }
        }

        RecordingOutcome::Uploaded {
            link: stored.link,
            remote_id: stored.id,
        }
    }

    /// Stop every active session through the normal stop sequence
    pub async fn shutdown(&self) -> Vec<(ChannelId, RecordingOutcome)> {
        let slots: Vec<(ChannelId, Slot)> = lock(&self.slots)
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect();

        let stops = slots.into_iter().map(|(channel_id, slot)| async move {
            let outcome = {
                let mut guard = slot.lock().await;
                match guard.take() {
                    Some(session) => {
                        info!("Stopping {} for shutdown", session.channel.name);
                        Some(self.finish(session).await)
                    }
                    None => None,
                }
            };
            self.release_slot(channel_id, slot);
            Some((channel_id, outcome?))
        });

        join_all(stops).await.into_iter().flatten().collect()
    }

    /// Sessions currently registered, including ones mid-stop
    pub fn active_sessions(&self) -> Vec<SessionSummary> {
        let mut sessions: Vec<SessionSummary> = lock(&self.active).values().cloned().collect();
        sessions.sort_by_key(|s| s.channel_id);
        sessions
    }

    pub fn is_recording(&self, channel_id: ChannelId) -> bool {
        lock(&self.active).contains_key(&channel_id)
    }

    /// Channels holding a slot, recording or not
    pub fn tracked_channels(&self) -> usize {
        lock(&self.slots).len()
    }

    fn slot(&self, channel_id: ChannelId) -> Slot {
        Arc::clone(lock(&self.slots).entry(channel_id).or_default())
    }

    fn existing_slot(&self, channel_id: ChannelId) -> Option<Slot> {
        lock(&self.slots).get(&channel_id).cloned()
    }

    /// Drop an empty slot nobody else is waiting on
    fn release_slot(&self, channel_id: ChannelId, slot: Slot) {
        let mut slots = lock(&self.slots);
        // Held by the map and by `slot` only; clones are made under this lock
        let idle = slots
            .get(&channel_id)
            .is_some_and(|held| Arc::ptr_eq(held, &slot))
            && Arc::strong_count(&slot) == 2
            && slot.try_lock().is_ok_and(|session| session.is_none());

        if idle {
            slots.remove(&channel_id);
        }
    }
}

/// Move a finished spool file to the recording's final name
async fn persist_recording(spool: &Path, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if tokio::fs::rename(spool, path).await.is_err() {
        // Spool directory on another filesystem
        tokio::fs::copy(spool, path).await?;
        if let Err(e) = tokio::fs::remove_file(spool).await {
            warn!("Failed to remove {}: {}", spool.display(), e);
        }
    }

    Ok(())
}

async fn remove_spooled(buffers: impl IntoIterator<Item = SpeakerAudio>) {
    for audio in buffers {
        if let Err(e) = tokio::fs::remove_file(&audio.path).await {
            warn!("Failed to remove spooled audio {}: {}", audio.path.display(), e);
        }
    }
}
