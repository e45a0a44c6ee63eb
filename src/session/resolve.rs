use crate::voice::{ChannelId, GuildSnapshot, VoiceChannel};

/// Names that mark a category's general-purpose text channel
pub const GENERAL_CHANNEL_NAMES: [&str; 2] = ["general", "一般"];

/// Pick the text channel that receives a recording's notifications.
///
/// First match wins:
/// 1. a `general` text channel in the voice channel's category
/// 2. a text channel named exactly like the voice channel
/// 3. the guild's system channel
/// 4. the first text channel the guild lists
pub fn resolve_text_channel(guild: &GuildSnapshot, voice: &VoiceChannel) -> Option<ChannelId> {
    if let Some(category) = voice.category_id {
        let general = guild.text_channels.iter().find(|c| {
            c.category_id == Some(category) && GENERAL_CHANNEL_NAMES.contains(&c.name.as_str())
        });
        if let Some(channel) = general {
            return Some(channel.id);
        }
    }

    if let Some(channel) = guild.text_channels.iter().find(|c| c.name == voice.name) {
        return Some(channel.id);
    }

    if let Some(system) = guild.system_channel_id {
        return Some(system);
    }

    guild.text_channels.first().map(|c| c.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::{GuildId, TextChannel};

    fn text(id: u64, name: &str, category: Option<u64>) -> TextChannel {
        TextChannel {
            id: ChannelId(id),
            name: name.to_string(),
            category_id: category.map(ChannelId),
        }
    }

    fn voice(name: &str, category: Option<u64>) -> VoiceChannel {
        VoiceChannel {
            id: ChannelId(100),
            guild_id: GuildId(1),
            name: name.to_string(),
            category_id: category.map(ChannelId),
        }
    }

    fn guild(system: Option<u64>, channels: Vec<TextChannel>) -> GuildSnapshot {
        GuildSnapshot {
            id: GuildId(1),
            name: "Guild".to_string(),
            system_channel_id: system.map(ChannelId),
            text_channels: channels,
        }
    }

    #[test]
    fn test_category_general_beats_everything() {
        let g = guild(
            Some(3),
            vec![
                text(1, "random", None),
                text(2, "Lounge", None),
                text(3, "welcome", None),
                text(4, "general", Some(50)),
            ],
        );
        assert_eq!(resolve_text_channel(&g, &voice("Lounge", Some(50))), Some(ChannelId(4)));
    }

    #[test]
    fn test_localized_general_name() {
        let g = guild(None, vec![text(1, "random", None), text(2, "一般", Some(50))]);
        assert_eq!(resolve_text_channel(&g, &voice("Lounge", Some(50))), Some(ChannelId(2)));
    }

    #[test]
    fn test_general_is_case_sensitive_and_category_scoped() {
        let g = guild(
            None,
            vec![
                text(1, "General", Some(50)),
                text(2, "general", Some(60)),
                text(3, "Lounge", None),
            ],
        );
        assert_eq!(resolve_text_channel(&g, &voice("Lounge", Some(50))), Some(ChannelId(3)));
    }

    #[test]
    fn test_same_name_then_system_then_first() {
        let same_name = guild(Some(9), vec![text(1, "a", None), text(2, "Lounge", None)]);
        assert_eq!(resolve_text_channel(&same_name, &voice("Lounge", None)), Some(ChannelId(2)));

        let system = guild(Some(9), vec![text(1, "a", None), text(9, "welcome", None)]);
        assert_eq!(resolve_text_channel(&system, &voice("Lounge", None)), Some(ChannelId(9)));

        let first = guild(None, vec![text(5, "b", None), text(1, "a", None)]);
        assert_eq!(resolve_text_channel(&first, &voice("Lounge", None)), Some(ChannelId(5)));
    }

    #[test]
    fn test_no_text_channels() {
        assert_eq!(resolve_text_channel(&guild(None, vec![]), &voice("Lounge", Some(1))), None);
    }
}
