use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake!(ChannelId);
snowflake!(GuildId);
snowflake!(UserId);

/// A voice channel as seen by the gateway bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceChannel {
    pub id: ChannelId,
    pub guild_id: GuildId,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<ChannelId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChannel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<ChannelId>,
}

/// Guild layout at the time of the event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildSnapshot {
    pub id: GuildId,
    pub name: String,
    #[serde(default)]
    pub system_channel_id: Option<ChannelId>,
    /// Text channels in the provider's enumeration order
    #[serde(default)]
    pub text_channels: Vec<TextChannel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    #[serde(default)]
    pub bot: bool,
}

/// One side of a voice state change, with the member count after the event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoicePresence {
    pub channel: VoiceChannel,
    /// Non-bot members left in the channel once the event is applied
    pub non_bot_members: usize,
}

/// A member joined, left or moved between voice channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipEvent {
    pub guild: GuildSnapshot,
    pub member: Member,
    #[serde(default)]
    pub before: Option<VoicePresence>,
    #[serde(default)]
    pub after: Option<VoicePresence>,
}

impl MembershipEvent {
    /// Member stayed in the same channel (mute, deafen, stream toggles)
    pub fn is_same_channel(&self) -> bool {
        let before = self.before.as_ref().map(|p| p.channel.id);
        let after = self.after.as_ref().map(|p| p.channel.id);
        before == after
    }

    /// Channels this event touches, `before` first
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        let mut ids = Vec::with_capacity(2);
        if let Some(before) = &self.before {
            ids.push(before.channel.id);
        }
        if let Some(after) = &self.after {
            if !ids.contains(&after.channel.id) {
                ids.push(after.channel.id);
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserializes_from_bridge_json() {
        let json = r#"{
            "guild": {"id": 1, "name": "Guild", "systemChannelId": 7,
                      "textChannels": [{"id": 7, "name": "welcome"}]},
            "member": {"id": 42},
            "after": {
                "channel": {"id": 10, "guildId": 1, "name": "Lounge", "categoryId": 3},
                "nonBotMembers": 2
            }
        }"#;

        let event: MembershipEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.member.id, UserId(42));
        assert!(!event.member.bot);
        assert!(event.before.is_none());

        let after = event.after.as_ref().unwrap();
        assert_eq!(after.channel.category_id, Some(ChannelId(3)));
        assert_eq!(after.non_bot_members, 2);
        assert_eq!(event.channel_ids(), vec![ChannelId(10)]);
        assert!(!event.is_same_channel());
    }
}
