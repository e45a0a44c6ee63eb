// Shared fakes for session manager and HTTP tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;
use vc_recorder::error::{RecorderError, Result};
use vc_recorder::storage::{StoredObject, UploadMetadata};
use vc_recorder::voice::{
    CaptureHandle, CapturedAudio, ChannelId, GuildId, GuildSnapshot, Member, SpeakerAudio,
    TextChannel, UserId, VoiceChannel, VoicePresence,
};
use vc_recorder::{CaptureSink, Config, MembershipEvent, Notifier, ObjectStorage, SessionManager};

pub const GENERAL_ID: ChannelId = ChannelId(900);
pub const SYSTEM_ID: ChannelId = ChannelId(902);

/// Capture sink that spools scripted audio on stop
pub struct FakeCapture {
    pub elapsed: Duration,
    pub script: Vec<(UserId, Vec<u8>)>,
    pub fail_stop: bool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub disconnects: Mutex<Vec<ChannelId>>,
    spool: TempDir,
    next_id: AtomicU64,
}

impl FakeCapture {
    pub fn new(elapsed: Duration, script: Vec<(UserId, Vec<u8>)>) -> Self {
        Self {
            elapsed,
            script,
            fail_stop: false,
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            disconnects: Mutex::new(Vec::new()),
            spool: TempDir::new().unwrap(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Ten seconds of audio from one speaker
    pub fn speaking() -> Self {
        Self::new(Duration::from_secs(10), vec![speaker(1, b"first speaker")])
    }

    pub fn failing_stop() -> Self {
        Self {
            fail_stop: true,
            ..Self::speaking()
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Spool files nobody has claimed yet
    pub fn spooled(&self) -> Vec<PathBuf> {
        recordings_in(self.spool.path())
    }
}

#[async_trait]
impl CaptureSink for FakeCapture {
    async fn start(&self, channel: &VoiceChannel) -> Result<CaptureHandle> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        // Widen the window for racing joins
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(CaptureHandle {
            channel_id: channel.id,
            capture_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn stop(&self, handle: CaptureHandle) -> Result<CapturedAudio> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(RecorderError::Capture("voice connection dropped".to_string()));
        }

        let mut buffers = Vec::new();
        for (speaker, data) in &self.script {
            let path = self
                .spool
                .path()
                .join(format!("{}-{}.part", handle.capture_id, speaker));
            std::fs::write(&path, data)?;
            buffers.push(SpeakerAudio {
                speaker: *speaker,
                path,
            });
        }

        Ok(CapturedAudio {
            buffers,
            elapsed: self.elapsed,
        })
    }

    async fn disconnect(&self, channel_id: ChannelId) -> Result<()> {
        self.disconnects.lock().unwrap().push(channel_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

#[derive(Debug, Clone)]
pub struct UploadCall {
    pub path: PathBuf,
    pub metadata: UploadMetadata,
    pub file_existed: bool,
}

pub struct FakeStorage {
    pub fail: bool,
    /// Uploads wait for a permit here before returning
    pub gate: Option<Arc<Notify>>,
    pub uploads: Mutex<Vec<UploadCall>>,
    pub completed: AtomicUsize,
    pub shared: Mutex<Vec<String>>,
}

impl FakeStorage {
    pub fn working() -> Self {
        Self {
            fail: false,
            gate: None,
            uploads: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            shared: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::working()
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::working()
        }
    }

    pub fn uploads(&self) -> Vec<UploadCall> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(&self, path: &Path, metadata: &UploadMetadata) -> Result<StoredObject> {
        self.uploads.lock().unwrap().push(UploadCall {
            path: path.to_path_buf(),
            metadata: metadata.clone(),
            file_existed: path.exists(),
        });

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(RecorderError::Upload("quota exceeded".to_string()));
        }

        Ok(StoredObject {
            id: "file-1".to_string(),
            name: metadata.name.clone(),
            link: "https://drive.example/file-1".to_string(),
        })
    }

    async fn share_publicly(&self, remote_id: &str) -> Result<()> {
        self.shared.lock().unwrap().push(remote_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(ChannelId, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(ChannelId, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, channel_id: ChannelId, content: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((channel_id, content.to_string()));
        Ok(())
    }
}

pub fn test_config(storage_dir: &Path, auto_delete: bool) -> Config {
    let json = serde_json::json!({
        "prefix": "!",
        "recordingFormat": "wav",
        "recordingBitrate": 128,
        "localStoragePath": storage_dir.display().to_string(),
        "autoDeleteLocalFiles": auto_delete,
        "googleDriveFolderId": "folder-123",
        "messageTemplates": {
            "recordingStart": "Recording started",
            "recordingEnd": "Recording finished",
            "shareLink": "Listen: {link}"
        }
    });
    Config::from_json(&json.to_string()).unwrap()
}

pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub capture: Arc<FakeCapture>,
    pub storage: Arc<FakeStorage>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness(config: Config, capture: FakeCapture, storage: FakeStorage) -> Harness {
    let capture = Arc::new(capture);
    let storage = Arc::new(storage);
    let notifier = Arc::new(RecordingNotifier::default());
    let manager = Arc::new(SessionManager::new(
        Arc::new(config),
        capture.clone(),
        storage.clone(),
        notifier.clone(),
    ));

    Harness {
        manager,
        capture,
        storage,
        notifier,
    }
}

pub fn speaker(id: u64, data: &[u8]) -> (UserId, Vec<u8>) {
    (UserId(id), data.to_vec())
}

pub fn lounge() -> VoiceChannel {
    voice_channel(100, "Lounge")
}

pub fn voice_channel(id: u64, name: &str) -> VoiceChannel {
    VoiceChannel {
        id: ChannelId(id),
        guild_id: GuildId(1),
        name: name.to_string(),
        category_id: Some(ChannelId(50)),
    }
}

/// Guild with a category `general`, a channel named like the lounge and a
/// system channel
pub fn guild() -> GuildSnapshot {
    GuildSnapshot {
        id: GuildId(1),
        name: "Test Guild".to_string(),
        system_channel_id: Some(SYSTEM_ID),
        text_channels: vec![
            TextChannel {
                id: ChannelId(901),
                name: "Lounge".to_string(),
                category_id: None,
            },
            TextChannel {
                id: SYSTEM_ID,
                name: "welcome".to_string(),
                category_id: None,
            },
            TextChannel {
                id: GENERAL_ID,
                name: "general".to_string(),
                category_id: Some(ChannelId(50)),
            },
        ],
    }
}

fn presence(channel: &VoiceChannel, non_bot_members: usize) -> VoicePresence {
    VoicePresence {
        channel: channel.clone(),
        non_bot_members,
    }
}

pub fn join(user: u64, channel: &VoiceChannel, non_bot_members: usize) -> MembershipEvent {
    MembershipEvent {
        guild: guild(),
        member: Member {
            id: UserId(user),
            bot: false,
        },
        before: None,
        after: Some(presence(channel, non_bot_members)),
    }
}

pub fn leave(user: u64, channel: &VoiceChannel, non_bot_members: usize) -> MembershipEvent {
    MembershipEvent {
        guild: guild(),
        member: Member {
            id: UserId(user),
            bot: false,
        },
        before: Some(presence(channel, non_bot_members)),
        after: None,
    }
}

pub fn moved(
    user: u64,
    from: &VoiceChannel,
    from_count: usize,
    to: &VoiceChannel,
    to_count: usize,
) -> MembershipEvent {
    MembershipEvent {
        guild: guild(),
        member: Member {
            id: UserId(user),
            bot: false,
        },
        before: Some(presence(from, from_count)),
        after: Some(presence(to, to_count)),
    }
}

pub fn as_bot(mut event: MembershipEvent) -> MembershipEvent {
    event.member.bot = true;
    event
}

/// Files directly inside `dir`; subdirectories such as the spool are skipped
pub fn recordings_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Poll `condition` for up to a second
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
