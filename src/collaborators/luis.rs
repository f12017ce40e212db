//! LUIS v3 prediction client.

use super::traits::{BotError, Collaborator, CollaboratorResult, Entity, NluClient, NluResult};
use crate::config::LuisConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Entity spans live under this key of the prediction's `entities` object.
const INSTANCE_KEY: &str = "$instance";

pub struct LuisClient {
    app_id: String,
    api_key: String,
    endpoint: String,
    slot: String,
    client: Client,
}

impl LuisClient {
    pub fn new(app_id: &str, api_key: &str, endpoint: &str, slot: &str, timeout: Duration) -> Self {
        Self {
            app_id: app_id.to_string(),
            api_key: api_key.to_string(),
            endpoint: normalize_endpoint(endpoint),
            slot: slot.to_string(),
            client: super::http_client(timeout),
        }
    }

    pub fn from_config(config: &LuisConfig, timeout: Duration) -> Result<Self, BotError> {
        let app_id = super::require("luis.app_id", &config.app_id)?;
        let api_key = super::require("luis.api_key", &config.api_key)?;
        let endpoint = super::require("luis.endpoint", &config.endpoint)?;
        let slot = if config.slot.trim().is_empty() {
            "production".to_string()
        } else {
            config.slot.trim().to_string()
        };
        Ok(Self::new(&app_id, &api_key, &endpoint, &slot, timeout))
    }

    fn predict_url(&self) -> String {
        format!(
            "{}/luis/prediction/v3.0/apps/{}/slots/{}/predict",
            self.endpoint, self.app_id, self.slot
        )
    }
}

/// The portal hands out bare host names; accept those as well as full URLs.
fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    prediction: Option<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    top_intent: Option<String>,
    #[serde(default)]
    intents: HashMap<String, IntentScore>,
    #[serde(default)]
    entities: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct IntentScore {
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
struct EntityInstance {
    #[serde(default)]
    text: Option<String>,
}

fn collect_entities(entities: &serde_json::Map<String, serde_json::Value>) -> Vec<Entity> {
    let Some(serde_json::Value::Object(instances)) = entities.get(INSTANCE_KEY) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (kind, spans) in instances {
        let Ok(spans) = serde_json::from_value::<Vec<EntityInstance>>(spans.clone()) else {
            continue;
        };
        for span in spans {
            if let Some(text) = span.text.filter(|t| !t.trim().is_empty()) {
                out.push(Entity {
                    kind: kind.clone(),
                    text,
                });
            }
        }
    }
    out
}

/// Decode a prediction response body into an [`NluResult`].
pub fn parse_prediction(body: &str) -> CollaboratorResult<NluResult> {
    let response: PredictionResponse = serde_json::from_str(body)
        .map_err(|e| BotError::malformed(Collaborator::Nlu, e.to_string()))?;

    let prediction = response
        .prediction
        .ok_or_else(|| BotError::malformed(Collaborator::Nlu, "response has no prediction"))?;

    let top_intent = prediction
        .top_intent
        .filter(|intent| !intent.is_empty())
        .ok_or_else(|| BotError::malformed(Collaborator::Nlu, "prediction has no topIntent"))?;

    let intents = prediction
        .intents
        .into_iter()
        .map(|(name, score)| (name, score.score))
        .collect();

    Ok(NluResult {
        top_intent,
        intents,
        entities: collect_entities(&prediction.entities),
    })
}

#[async_trait]
impl NluClient for LuisClient {
    async fn query(&self, text: &str) -> CollaboratorResult<NluResult> {
        let response = self
            .client
            .get(self.predict_url())
            .query(&[
                ("subscription-key", self.api_key.as_str()),
                ("verbose", "true"),
                ("show-all-intents", "true"),
                ("log", "true"),
                ("query", text),
            ])
            .send()
            .await
            .map_err(|e| BotError::from_reqwest(Collaborator::Nlu, &e))?;

        if !response.status().is_success() {
            return Err(super::api_error(Collaborator::Nlu, response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| BotError::from_reqwest(Collaborator::Nlu, &e))?;

        parse_prediction(&body)
    }

    fn name(&self) -> &str {
        "luis"
    }
}
