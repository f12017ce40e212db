//! QnA Maker knowledge-base client (`generateAnswer` runtime API).

use super::traits::{BotError, Collaborator, CollaboratorResult, QnaAnswer, QnaClient};
use crate::config::QnaConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Id the service gives its "No good match found in KB." placeholder answer.
const NO_MATCH_ID: i64 = -1;

pub struct QnaMakerClient {
    knowledge_base_id: String,
    endpoint_key: String,
    host: String,
    top: usize,
    score_threshold: f64,
    client: Client,
}

impl QnaMakerClient {
    pub fn new(
        knowledge_base_id: &str,
        endpoint_key: &str,
        host: &str,
        top: usize,
        score_threshold: f64,
        timeout: Duration,
    ) -> Self {
        let host = host.trim().trim_end_matches('/');
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        Self {
            knowledge_base_id: knowledge_base_id.to_string(),
            endpoint_key: endpoint_key.to_string(),
            host,
            top: top.max(1),
            score_threshold,
            client: super::http_client(timeout),
        }
    }

    pub fn from_config(config: &QnaConfig, timeout: Duration) -> Result<Self, BotError> {
        let kb = super::require("qna.knowledge_base_id", &config.knowledge_base_id)?;
        let key = super::require("qna.endpoint_key", &config.endpoint_key)?;
        let host = super::require("qna.host", &config.host)?;
        Ok(Self::new(
            &kb,
            &key,
            &host,
            config.top,
            config.score_threshold,
            timeout,
        ))
    }

    fn generate_answer_url(&self) -> String {
        format!(
            "{}/knowledgebases/{}/generateAnswer",
            self.host, self.knowledge_base_id
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateAnswerRequest<'a> {
    question: &'a str,
    top: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateAnswerResponse {
    answers: Option<Vec<ApiAnswer>>,
}

#[derive(Debug, Deserialize)]
struct ApiAnswer {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    id: Option<i64>,
}

/// Decode a `generateAnswer` body, dropping the no-match placeholder and
/// anything under `score_threshold` (0.0-1.0).
pub fn parse_answers(body: &str, score_threshold: f64) -> CollaboratorResult<Vec<QnaAnswer>> {
    let response: GenerateAnswerResponse = serde_json::from_str(body)
        .map_err(|e| BotError::malformed(Collaborator::Qna, e.to_string()))?;

    let answers = response
        .answers
        .ok_or_else(|| BotError::malformed(Collaborator::Qna, "response has no answers field"))?;

    let mut out: Vec<QnaAnswer> = answers
        .into_iter()
        .filter(|a| a.id != Some(NO_MATCH_ID))
        .filter_map(|a| {
            let score = a.score / 100.0;
            let answer = a.answer?;
            (score >= score_threshold && !answer.is_empty()).then_some(QnaAnswer { answer, score })
        })
        .collect();

    out.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(out)
}

#[async_trait]
impl QnaClient for QnaMakerClient {
    async fn query(&self, text: &str) -> CollaboratorResult<Vec<QnaAnswer>> {
        let request = GenerateAnswerRequest {
            question: text,
            top: self.top,
        };

        let response = self
            .client
            .post(self.generate_answer_url())
            .header("Authorization", format!("EndpointKey {}", self.endpoint_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::from_reqwest(Collaborator::Qna, &e))?;

        if !response.status().is_success() {
            return Err(super::api_error(Collaborator::Qna, response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| BotError::from_reqwest(Collaborator::Qna, &e))?;

        parse_answers(&body, self.score_threshold)
    }

    fn name(&self) -> &str {
        "qnamaker"
    }
}
