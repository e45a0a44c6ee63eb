use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::Notifier;
use crate::error::{RecorderError, Result};
use crate::voice::ChannelId;

/// Posts messages through the Discord REST API with a bot token
pub struct DiscordNotifier {
    api_base: String,
    token: String,
    http: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            http: reqwest::Client::new(),
        }
    }

    fn messages_url(&self, channel_id: ChannelId) -> String {
        format!("{}/channels/{}/messages", self.api_base, channel_id)
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, channel_id: ChannelId, content: &str) -> Result<()> {
        let response = self
            .http
            .post(self.messages_url(channel_id))
            .header("Authorization", format!("Bot {}", self.token))
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| RecorderError::Notify(format!("send to {} failed: {}", channel_id, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecorderError::Notify(format!(
                "channel {} returned {}: {}",
                channel_id, status, body
            )));
        }

        debug!("Posted message to channel {}", channel_id);
        Ok(())
    }
}
