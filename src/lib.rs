pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod notify;
pub mod session;
pub mod storage;
mod sync;
pub mod voice;

pub use config::{Config, MessageTemplates};
pub use error::RecorderError;
pub use http::{create_router, AppState};
pub use notify::{DiscordNotifier, Notifier};
pub use session::{
    EventDispatcher, RecordingOutcome, RecordingSession, SessionManager, SessionSummary,
    Transition,
};
pub use storage::{DriveCredentials, GoogleDrive, ObjectStorage, UnavailableStorage};
pub use voice::{BridgeCaptureSink, BridgeSettings, CaptureSink, MembershipEvent};
