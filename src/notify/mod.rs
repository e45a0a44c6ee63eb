//! Text-channel notifications

pub mod discord;

use async_trait::async_trait;

use crate::error::Result;
use crate::voice::ChannelId;

pub use discord::DiscordNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post a plain message to a text channel
    async fn send(&self, channel_id: ChannelId, content: &str) -> Result<()>;
}
