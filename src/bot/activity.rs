//! Bot Framework style activity envelope exchanged with the transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::traits::{IncomingMessage, OutgoingReply, ParticipantId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityType {
    Message,
    ConversationUpdate,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationAccount {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members_added: Vec<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
}

impl Activity {
    fn base(kind: ActivityType, from: &str, recipient: &str, conversation_id: &str) -> Self {
        Self {
            kind,
            id: Some(uuid::Uuid::new_v4().to_string()),
            timestamp: Some(Utc::now()),
            channel_id: None,
            service_url: None,
            from: Some(ChannelAccount::new(from)),
            recipient: Some(ChannelAccount::new(recipient)),
            conversation: Some(ConversationAccount {
                id: conversation_id.to_string(),
            }),
            text: None,
            members_added: Vec::new(),
            reply_to_id: None,
        }
    }

    pub fn message(from: &str, recipient: &str, conversation_id: &str, text: &str) -> Self {
        let mut activity = Self::base(ActivityType::Message, from, recipient, conversation_id);
        activity.text = Some(text.to_string());
        activity
    }

    pub fn conversation_update(
        from: &str,
        recipient: &str,
        conversation_id: &str,
        members_added: &[&str],
    ) -> Self {
        let mut activity =
            Self::base(ActivityType::ConversationUpdate, from, recipient, conversation_id);
        activity.members_added = members_added.iter().map(|id| ChannelAccount::new(id)).collect();
        activity
    }

    pub fn conversation_id(&self) -> &str {
        self.conversation.as_ref().map_or("", |c| c.id.as_str())
    }

    /// The bot's own id on this channel: whoever the activity was sent to.
    pub fn recipient_id(&self) -> ParticipantId {
        ParticipantId::new(self.recipient.as_ref().map_or("", |r| r.id.as_str()))
    }

    pub fn members_added_ids(&self) -> Vec<ParticipantId> {
        self.members_added
            .iter()
            .map(|m| ParticipantId::new(&m.id))
            .collect()
    }

    /// Router input for message activities with non-empty text.
    pub fn to_incoming_message(&self) -> Option<IncomingMessage> {
        if self.kind != ActivityType::Message {
            return None;
        }
        let text = self.text.as_deref().filter(|t| !t.is_empty())?;
        Some(IncomingMessage {
            text: text.to_string(),
            conversation_id: self.conversation_id().to_string(),
            from: ParticipantId::new(self.from.as_ref().map_or("", |f| f.id.as_str())),
        })
    }

    /// Reply activity addressed back along the same conversation.
    pub fn reply(&self, reply: &OutgoingReply) -> Self {
        Self {
            kind: ActivityType::Message,
            id: Some(uuid::Uuid::new_v4().to_string()),
            timestamp: Some(Utc::now()),
            channel_id: self.channel_id.clone(),
            service_url: self.service_url.clone(),
            from: self.recipient.clone(),
            recipient: self.from.clone(),
            conversation: self.conversation.clone(),
            text: Some(reply.text.clone()),
            members_added: Vec::new(),
            reply_to_id: self.id.clone(),
        }
    }
}

/// Decode an activity from a raw request body.
pub fn parse_activity(body: &[u8]) -> serde_json::Result<Activity> {
    serde_json::from_slice(body)
}
