//! Canned collaborators for tests that exercise the bot above the HTTP layer.

use super::traits::{
    BotError, Collaborator, CollaboratorResult, Entity, NluClient, NluResult, QnaAnswer,
    QnaClient, SchedulerClient,
};
use super::Collaborators;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) struct StaticNlu(pub Option<NluResult>);

#[async_trait]
impl NluClient for StaticNlu {
    async fn query(&self, _text: &str) -> CollaboratorResult<NluResult> {
        self.0
            .clone()
            .ok_or_else(|| BotError::unavailable(Collaborator::Nlu, "static failure"))
    }

    fn name(&self) -> &str {
        "static-nlu"
    }
}

pub(crate) struct StaticQna(pub Vec<QnaAnswer>);

#[async_trait]
impl QnaClient for StaticQna {
    async fn query(&self, _text: &str) -> CollaboratorResult<Vec<QnaAnswer>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "static-qna"
    }
}

/// `None` makes every scheduler call fail.
pub(crate) struct StaticScheduler(pub Option<String>);

#[async_trait]
impl SchedulerClient for StaticScheduler {
    async fn get_availability(&self) -> CollaboratorResult<String> {
        self.0
            .clone()
            .ok_or_else(|| BotError::unavailable(Collaborator::Scheduler, "static failure"))
    }

    async fn schedule_appointment(&self, time: &str) -> CollaboratorResult<String> {
        match self.0 {
            Some(_) => Ok(format!("Booked for {time}")),
            None => Err(BotError::unavailable(Collaborator::Scheduler, "static failure")),
        }
    }

    fn name(&self) -> &str {
        "static-scheduler"
    }
}

pub(crate) fn nlu_result(intent: &str, score: f64, times: &[&str]) -> NluResult {
    NluResult {
        top_intent: intent.to_string(),
        intents: HashMap::from([(intent.to_string(), score)]),
        entities: times.iter().map(|t| Entity::new("time", t)).collect(),
    }
}

pub(crate) fn collaborators(
    nlu: Option<NluResult>,
    answers: Vec<QnaAnswer>,
    availability: Option<&str>,
) -> Collaborators {
    Collaborators {
        nlu: Arc::new(StaticNlu(nlu)),
        qna: Arc::new(StaticQna(answers)),
        scheduler: Arc::new(StaticScheduler(availability.map(ToString::to_string))),
    }
}
