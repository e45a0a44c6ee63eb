//! Voice-side types and the capture seam
//!
//! The gateway connection itself lives outside this crate. A bridge process
//! forwards membership events and received audio; this module models both.

pub mod bridge;
pub mod capture;
pub mod model;

pub use bridge::{BridgeCaptureSink, BridgeSettings, CaptureState};
pub use capture::{CaptureHandle, CaptureSink, CapturedAudio, SpeakerAudio};
pub use model::{
    ChannelId, GuildId, GuildSnapshot, Member, MembershipEvent, TextChannel, UserId,
    VoiceChannel, VoicePresence,
};
