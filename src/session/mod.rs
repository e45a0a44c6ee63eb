//! Recording session lifecycle
//!
//! This module owns everything between "a channel became busy" and "the
//! recording was shared":
//! - per-channel start/stop decisions from membership events
//! - text-channel resolution for notifications
//! - capture stop, local write, upload and the resulting outcome
//! - ordered per-channel event dispatch

mod dispatch;
mod manager;
mod outcome;
mod resolve;
mod session;
mod stats;

pub use dispatch::EventDispatcher;
pub use manager::{SessionManager, MIN_RECORDING_DURATION, START_THRESHOLD};
pub use outcome::{DiscardReason, RecordingOutcome, Transition};
pub use resolve::{resolve_text_channel, GENERAL_CHANNEL_NAMES};
pub use session::{recording_filename, sanitize_channel_name, RecordingSession};
pub use stats::SessionSummary;
