//! Collaborator subsystem: HTTP clients for the services the bot depends on.
//!
//! Each client implements one capability trait from [`traits`]:
//! [`NluClient`] (LUIS prediction API), [`QnaClient`] (QnA Maker
//! `generateAnswer`) and [`SchedulerClient`] (the dentist scheduler REST
//! API). [`create_collaborators`] builds all three from [`Config`] and fails
//! fast with [`BotError::ConfigurationMissing`] when credentials are absent.

pub mod luis;
pub mod qna_maker;
pub mod scheduler;
#[cfg(test)]
pub(crate) mod testing;
pub mod traits;

pub use luis::LuisClient;
pub use qna_maker::QnaMakerClient;
pub use scheduler::DentistSchedulerClient;
#[allow(unused_imports)]
pub use traits::{
    BotError, Collaborator, CollaboratorResult, Entity, NluClient, NluResult, QnaAnswer,
    QnaClient, SchedulerClient,
};

use crate::config::Config;
use std::sync::Arc;
use std::time::Duration;

const MAX_API_ERROR_CHARS: usize = 200;

/// Query/header markers whose following token is a credential.
const SECRET_MARKERS: [&str; 3] = ["subscription-key=", "EndpointKey ", "Bearer "];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '%')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Scrub credentials from error strings before they reach logs or users.
///
/// reqwest errors embed the request URL, and the LUIS prediction URL carries
/// the subscription key as a query parameter.
pub fn scrub_secret_patterns(input: &str) -> String {
    let mut scrubbed = input.to_string();

    for marker in SECRET_MARKERS {
        let mut search_from = 0;
        loop {
            let Some(rel) = scrubbed[search_from..].find(marker) else {
                break;
            };

            let content_start = search_from + rel + marker.len();
            let end = token_end(&scrubbed, content_start);

            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(content_start..end, "[REDACTED]");
            search_from = content_start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Sanitize API error text by scrubbing secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}

/// Build a sanitized collaborator error from a failed HTTP response.
pub async fn api_error(collaborator: Collaborator, response: reqwest::Response) -> BotError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    let sanitized = sanitize_api_error(&body);
    BotError::unavailable(collaborator, format!("API error ({status}): {sanitized}"))
}

/// Shared HTTP client settings for every collaborator.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Reject empty credential values with the config key that holds them.
pub(crate) fn require(field: &str, value: &str) -> Result<String, BotError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BotError::ConfigurationMissing(field.to_string()));
    }
    Ok(trimmed.to_string())
}

/// The three services the message router talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub nlu: Arc<dyn NluClient>,
    pub qna: Arc<dyn QnaClient>,
    pub scheduler: Arc<dyn SchedulerClient>,
}

/// Factory: build the HTTP collaborators from config.
pub fn create_collaborators(config: &Config) -> Result<Collaborators, BotError> {
    let timeout = Duration::from_secs(config.bot.collaborator_timeout_secs.max(1));

    let nlu = LuisClient::from_config(&config.luis, timeout)?;
    let qna = QnaMakerClient::from_config(&config.qna, timeout)?;
    let scheduler = DentistSchedulerClient::from_config(&config.scheduler, timeout)?;

    tracing::debug!(
        nlu = nlu.name(),
        qna = qna.name(),
        scheduler = scheduler.name(),
        "Collaborators created"
    );

    Ok(Collaborators {
        nlu: Arc::new(nlu),
        qna: Arc::new(qna),
        scheduler: Arc::new(scheduler),
    })
}
