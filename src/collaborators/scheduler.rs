//! Dentist scheduler REST client.

use super::traits::{BotError, Collaborator, CollaboratorResult, SchedulerClient};
use crate::config::SchedulerConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

pub struct DentistSchedulerClient {
    endpoint: String,
    client: Client,
}

impl DentistSchedulerClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            client: super::http_client(timeout),
        }
    }

    pub fn from_config(config: &SchedulerConfig, timeout: Duration) -> Result<Self, BotError> {
        let endpoint = super::require("scheduler.endpoint", &config.endpoint)?;
        Ok(Self::new(&endpoint, timeout))
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{resource}", self.endpoint)
    }
}

#[derive(Debug, Serialize)]
struct ScheduleRequest<'a> {
    time: &'a str,
}

/// Render the slot list the way the bot announces it.
pub fn format_availability(slots: &[String]) -> String {
    let mut text = String::from("Current time slots available:");
    for slot in slots {
        text.push('\n');
        text.push_str(slot);
    }
    text
}

/// Confirmation text for a booked slot.
pub fn format_confirmation(time: &str) -> String {
    format!("An appointment is set for {time}.")
}

#[async_trait]
impl SchedulerClient for DentistSchedulerClient {
    async fn get_availability(&self) -> CollaboratorResult<String> {
        let response = self
            .client
            .get(self.url("availability"))
            .send()
            .await
            .map_err(|e| BotError::from_reqwest(Collaborator::Scheduler, &e))?;

        if !response.status().is_success() {
            return Err(super::api_error(Collaborator::Scheduler, response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| BotError::from_reqwest(Collaborator::Scheduler, &e))?;
        let slots: Vec<String> = serde_json::from_str(&body).map_err(|e| {
            BotError::malformed(
                Collaborator::Scheduler,
                format!("availability is not a list of slots: {e}"),
            )
        })?;

        Ok(format_availability(&slots))
    }

    async fn schedule_appointment(&self, time: &str) -> CollaboratorResult<String> {
        let response = self
            .client
            .post(self.url("schedule"))
            .json(&ScheduleRequest { time })
            .send()
            .await
            .map_err(|e| BotError::from_reqwest(Collaborator::Scheduler, &e))?;

        if !response.status().is_success() {
            return Err(super::api_error(Collaborator::Scheduler, response).await);
        }

        Ok(format_confirmation(time))
    }

    fn name(&self) -> &str {
        "dentist-scheduler"
    }
}
