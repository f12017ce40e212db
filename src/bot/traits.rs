use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::activity::Activity;

/// Conversation participant id as assigned by the channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user utterance handed to the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub text: String,
    pub conversation_id: String,
    pub from: ParticipantId,
}

impl IncomingMessage {
    pub fn new(text: &str, conversation_id: &str, from: &str) -> Self {
        Self {
            text: text.to_string(),
            conversation_id: conversation_id.to_string(),
            from: ParticipantId::new(from),
        }
    }
}

/// Text the bot sends back into the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingReply {
    pub text: String,
}

impl OutgoingReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Transport seam: accepts reply activities for delivery to the conversation.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, activity: Activity) -> Result<()>;
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_id_serializes_as_plain_string() {
        let id = ParticipantId::new("user-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"user-1\"");
        assert_eq!(id.to_string(), "user-1");
    }

    #[test]
    fn incoming_message_keeps_fields() {
        let msg = IncomingMessage::new("hello", "conv-1", "user-1");
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.conversation_id, "conv-1");
        assert_eq!(msg.from, ParticipantId::from("user-1"));
    }
}
