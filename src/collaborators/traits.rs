//! Capability traits and result types for the external services the bot calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which external service a call went to. Used in errors and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collaborator {
    Nlu,
    Qna,
    Scheduler,
}

impl Collaborator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nlu => "nlu",
            Self::Qna => "qna",
            Self::Scheduler => "scheduler",
        }
    }
}

impl std::fmt::Display for Collaborator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures the bot distinguishes between.
///
/// `ConfigurationMissing` is fatal at construction time. The other two are
/// raised per collaborator call and never escape the message router.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable {
        collaborator: Collaborator,
        reason: String,
    },
    #[error("{collaborator} returned a malformed result: {reason}")]
    MalformedResult {
        collaborator: Collaborator,
        reason: String,
    },
    #[error("required configuration missing: {0}")]
    ConfigurationMissing(String),
}

impl BotError {
    pub fn unavailable(collaborator: Collaborator, reason: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable {
            collaborator,
            reason: reason.into(),
        }
    }

    pub fn malformed(collaborator: Collaborator, reason: impl Into<String>) -> Self {
        Self::MalformedResult {
            collaborator,
            reason: reason.into(),
        }
    }

    /// Map a transport-level reqwest failure onto the taxonomy. Body decode
    /// errors mean the service answered with something we cannot read.
    pub fn from_reqwest(collaborator: Collaborator, err: &reqwest::Error) -> Self {
        let reason = super::sanitize_api_error(&err.to_string());
        if err.is_decode() {
            Self::malformed(collaborator, reason)
        } else {
            Self::unavailable(collaborator, reason)
        }
    }
}

pub type CollaboratorResult<T> = std::result::Result<T, BotError>;

/// A typed span of the user's text extracted by the NLU service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: String,
    pub text: String,
}

impl Entity {
    pub fn new(kind: &str, text: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: text.to_string(),
        }
    }
}

/// Intent classification for one utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NluResult {
    pub top_intent: String,
    pub intents: HashMap<String, f64>,
    pub entities: Vec<Entity>,
}

impl NluResult {
    /// Confidence of the top intent, `0.0` when the service did not score it.
    pub fn top_score(&self) -> f64 {
        self.intents.get(&self.top_intent).copied().unwrap_or(0.0)
    }

    /// First entity of the given type, in extraction order.
    pub fn first_entity(&self, kind: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.kind == kind)
    }
}

/// One knowledge-base candidate. `score` is normalised to 0.0-1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QnaAnswer {
    pub answer: String,
    pub score: f64,
}

/// Intent recognition service.
#[async_trait]
pub trait NluClient: Send + Sync {
    async fn query(&self, text: &str) -> CollaboratorResult<NluResult>;
    fn name(&self) -> &str;
}

/// Knowledge-base lookup. Answers come back most confident first.
#[async_trait]
pub trait QnaClient: Send + Sync {
    async fn query(&self, text: &str) -> CollaboratorResult<Vec<QnaAnswer>>;
    fn name(&self) -> &str;
}

/// Appointment backend. Both operations return reply-ready text.
#[async_trait]
pub trait SchedulerClient: Send + Sync {
    async fn get_availability(&self) -> CollaboratorResult<String>;
    async fn schedule_appointment(&self, time: &str) -> CollaboratorResult<String>;
    fn name(&self) -> &str;
}
