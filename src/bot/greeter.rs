use super::traits::{OutgoingReply, ParticipantId};
use crate::config::BotConfig;

pub const WELCOME_TEXT: &str = "Hello! I am the Contoso Dentistry Virtual Assistant! \
Try asking me for available appointment slots, or book an appointment! \
I can also answer some of your questions";

/// Greets participants who join a conversation. Skips the bot's own id.
#[derive(Debug, Clone)]
pub struct WelcomeGreeter {
    welcome_text: String,
}

impl WelcomeGreeter {
    pub fn new() -> Self {
        Self::with_text(WELCOME_TEXT)
    }

    pub fn with_text(text: &str) -> Self {
        Self {
            welcome_text: text.to_string(),
        }
    }

    /// Uses `bot.welcome_text` when set and non-blank.
    pub fn from_config(config: &BotConfig) -> Self {
        config
            .welcome_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map_or_else(Self::new, Self::with_text)
    }

    pub fn welcome_text(&self) -> &str {
        &self.welcome_text
    }

    /// One greeting per joined participant other than `self_id`, in input order.
    pub fn on_participants_added(
        &self,
        participants: &[ParticipantId],
        self_id: &ParticipantId,
    ) -> Vec<OutgoingReply> {
        participants
            .iter()
            .filter(|p| *p != self_id)
            .map(|_| OutgoingReply::text(self.welcome_text.clone()))
            .collect()
    }
}

impl Default for WelcomeGreeter {
    fn default() -> Self {
        Self::new()
    }
}
