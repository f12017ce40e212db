use anyhow::Result;
use std::time::Duration;

use crate::collaborators::{self, BotError, Collaborators};
use crate::config::Config;

use super::activity::{Activity, ActivityType};
use super::greeter::WelcomeGreeter;
use super::router::MessageRouter;
use super::traits::ReplySink;

/// Dispatches transport activities: messages to the router, joins to the greeter.
pub struct DentaBot {
    router: MessageRouter,
    greeter: WelcomeGreeter,
}

impl DentaBot {
    pub fn new(router: MessageRouter, greeter: WelcomeGreeter) -> Self {
        Self { router, greeter }
    }

    /// Build the bot with HTTP collaborators. Missing credentials fail here.
    pub fn from_config(config: &Config) -> Result<Self, BotError> {
        let collaborators = collaborators::create_collaborators(config)?;
        Ok(Self::with_collaborators(config, collaborators))
    }

    pub fn with_collaborators(config: &Config, collaborators: Collaborators) -> Self {
        let timeout = Duration::from_secs(config.bot.collaborator_timeout_secs.max(1));
        Self::new(
            MessageRouter::new(collaborators, timeout),
            WelcomeGreeter::from_config(&config.bot),
        )
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn greeter(&self) -> &WelcomeGreeter {
        &self.greeter
    }

    /// Handle one activity, sending replies to `sink`. Returns how many were sent.
    pub async fn on_activity(&self, activity: &Activity, sink: &dyn ReplySink) -> Result<usize> {
        match activity.kind {
            ActivityType::Message => {
                let Some(message) = activity.to_incoming_message() else {
                    tracing::debug!(
                        conversation = %activity.conversation_id(),
                        "Ignoring message with empty text"
                    );
                    return Ok(0);
                };
                let reply = self.router.handle(&message).await;
                sink.send(activity.reply(&reply)).await?;
                Ok(1)
            }
            ActivityType::ConversationUpdate => {
                let joined = activity.members_added_ids();
                let greetings = self
                    .greeter
                    .on_participants_added(&joined, &activity.recipient_id());
                let sent = greetings.len();
                for greeting in &greetings {
                    sink.send(activity.reply(greeting)).await?;
                }
                tracing::info!(
                    conversation = %activity.conversation_id(),
                    joined = joined.len(),
                    greeted = sent,
                    "Participants added"
                );
                Ok(sent)
            }
            ActivityType::Other => {
                tracing::debug!(
                    conversation = %activity.conversation_id(),
                    "Ignoring unsupported activity type"
                );
                Ok(0)
            }
        }
    }
}
