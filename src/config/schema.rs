use crate::collaborators::BotError;
use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

// ── Top-level config ──────────────────────────────────────────────

/// Top-level dentabot configuration, loaded from `config.toml`.
///
/// Resolution order: `--config` flag → `DENTABOT_CONFIG` env → `~/.dentabot/config.toml`.
/// Environment variables override file values after loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path the config was resolved from - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Intent recognition service (`[luis]`).
    #[serde(default)]
    pub luis: LuisConfig,

    /// Knowledge-base service (`[qna]`).
    #[serde(default)]
    pub qna: QnaConfig,

    /// Appointment backend (`[scheduler]`).
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Message handling behaviour (`[bot]`).
    #[serde(default)]
    pub bot: BotConfig,

    /// HTTP gateway that receives activities (`[gateway]`).
    #[serde(default)]
    pub gateway: GatewayConfig,
}

// ── Collaborators ────────────────────────────────────────────────

/// LUIS prediction endpoint credentials (`[luis]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LuisConfig {
    /// LUIS application id. Env: `DENTABOT_LUIS_APP_ID` or `LuisAppId`.
    #[serde(default)]
    pub app_id: String,
    /// Prediction resource key. Env: `DENTABOT_LUIS_API_KEY` or `LuisAPIKey`.
    #[serde(default)]
    pub api_key: String,
    /// Prediction host, with or without scheme. Env: `DENTABOT_LUIS_ENDPOINT` or `LuisAPIHostName`.
    #[serde(default)]
    pub endpoint: String,
    /// Publishing slot. Default: `"production"`.
    #[serde(default = "default_luis_slot")]
    pub slot: String,
}

fn default_luis_slot() -> String {
    "production".into()
}

impl Default for LuisConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            slot: default_luis_slot(),
        }
    }
}

/// QnA Maker runtime credentials (`[qna]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QnaConfig {
    /// Knowledge base id. Env: `DENTABOT_QNA_KNOWLEDGE_BASE_ID` or `QnAKnowledgebaseId`.
    #[serde(default)]
    pub knowledge_base_id: String,
    /// Runtime endpoint key. Env: `DENTABOT_QNA_ENDPOINT_KEY` or `QnAAuthKey`.
    #[serde(default)]
    pub endpoint_key: String,
    /// Runtime host, e.g. `https://contoso.azurewebsites.net/qnamaker`.
    /// Env: `DENTABOT_QNA_HOST` or `QnAEndpointHostName`.
    #[serde(default)]
    pub host: String,
    /// Number of candidate answers requested. Default: `1`.
    #[serde(default = "default_qna_top")]
    pub top: usize,
    /// Minimum confidence (0.0-1.0) for an answer to be used. Default: `0.3`.
    #[serde(default = "default_qna_score_threshold")]
    pub score_threshold: f64,
}

fn default_qna_top() -> usize {
    1
}

fn default_qna_score_threshold() -> f64 {
    0.3
}

impl Default for QnaConfig {
    fn default() -> Self {
        Self {
            knowledge_base_id: String::new(),
            endpoint_key: String::new(),
            host: String::new(),
            top: default_qna_top(),
            score_threshold: default_qna_score_threshold(),
        }
    }
}

/// Dentist scheduler API (`[scheduler]` section).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Base URL. Env: `DENTABOT_SCHEDULER_ENDPOINT` or `SchedulerEndpoint`.
    #[serde(default)]
    pub endpoint: String,
}

// ── Bot ──────────────────────────────────────────────────────────

/// Message handling configuration (`[bot]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Upper bound for each collaborator call, in seconds. Default: `10`.
    #[serde(default = "default_collaborator_timeout_secs")]
    pub collaborator_timeout_secs: u64,
    /// Replaces the built-in greeting for newly joined participants.
    #[serde(default)]
    pub welcome_text: Option<String>,
}

fn default_collaborator_timeout_secs() -> u64 {
    10
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            collaborator_timeout_secs: default_collaborator_timeout_secs(),
            welcome_text: None,
        }
    }
}

// ── Gateway ──────────────────────────────────────────────────────

/// Gateway server configuration (`[gateway]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Gateway port (default: 3978)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// When set, `/api/messages` requires `Authorization: Bearer <token>`.
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Largest accepted activity body in bytes (default: 64 KiB).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Whole-request timeout in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    3978
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
            max_body_bytes: default_max_body_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ── Config impl ──────────────────────────────────────────────────

fn default_config_path() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".dentabot").join("config.toml"))
}

fn resolve_config_path(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(raw) = explicit.filter(|p| !p.trim().is_empty()) {
        return Ok(PathBuf::from(shellexpand::tilde(raw.trim()).as_ref()));
    }
    if let Ok(raw) = std::env::var("DENTABOT_CONFIG") {
        if !raw.trim().is_empty() {
            return Ok(PathBuf::from(shellexpand::tilde(raw.trim()).as_ref()));
        }
    }
    default_config_path()
}

/// First non-empty value among the given environment variables.
fn env_first(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

fn override_string(target: &mut String, names: &[&str]) {
    if let Some(value) = env_first(names) {
        *target = value;
    }
}

impl Config {
    /// Load, apply env overrides, then validate. Fails fast on missing credentials.
    pub async fn load(explicit_path: Option<&str>) -> Result<Self> {
        let config = Self::load_unvalidated(explicit_path).await?;
        config.validate()?;
        tracing::info!(
            path = %config.config_path.display(),
            luis_key = %crate::security::redact(&config.luis.api_key),
            qna_key = %crate::security::redact(&config.qna.endpoint_key),
            "Config loaded"
        );
        Ok(config)
    }

    /// Load and apply env overrides without validating. A missing file is not
    /// an error: the bot can be configured from the environment alone.
    pub async fn load_unvalidated(explicit_path: Option<&str>) -> Result<Self> {
        let config_path = resolve_config_path(explicit_path)?;
        let mut config = Self::read_file(&config_path).await?;
        config.config_path = config_path;
        config.apply_env_overrides();
        Ok(config)
    }

    async fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file absent, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply environment variable overrides to config.
    ///
    /// `DENTABOT_*` names win; the legacy `.env` variable names are
    /// honoured as fallbacks.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.luis.app_id, &["DENTABOT_LUIS_APP_ID", "LuisAppId"]);
        override_string(&mut self.luis.api_key, &["DENTABOT_LUIS_API_KEY", "LuisAPIKey"]);
        override_string(
            &mut self.luis.endpoint,
            &["DENTABOT_LUIS_ENDPOINT", "LuisAPIHostName"],
        );
        override_string(&mut self.luis.slot, &["DENTABOT_LUIS_SLOT"]);

        override_string(
            &mut self.qna.knowledge_base_id,
            &["DENTABOT_QNA_KNOWLEDGE_BASE_ID", "QnAKnowledgebaseId"],
        );
        override_string(
            &mut self.qna.endpoint_key,
            &["DENTABOT_QNA_ENDPOINT_KEY", "QnAAuthKey"],
        );
        override_string(&mut self.qna.host, &["DENTABOT_QNA_HOST", "QnAEndpointHostName"]);

        override_string(
            &mut self.scheduler.endpoint,
            &["DENTABOT_SCHEDULER_ENDPOINT", "SchedulerEndpoint"],
        );

        if let Some(raw) = env_first(&["DENTABOT_COLLABORATOR_TIMEOUT_SECS"]) {
            match raw.parse::<u64>() {
                Ok(secs) => self.bot.collaborator_timeout_secs = secs,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid DENTABOT_COLLABORATOR_TIMEOUT_SECS"),
            }
        }

        override_string(&mut self.gateway.host, &["DENTABOT_GATEWAY_HOST"]);
        if let Some(raw) = env_first(&["DENTABOT_GATEWAY_PORT", "PORT", "port"]) {
            match raw.parse::<u16>() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid gateway port override"),
            }
        }
        if let Some(token) = env_first(&["DENTABOT_GATEWAY_TOKEN"]) {
            self.gateway.bearer_token = Some(token);
        }
    }

    /// Validate configuration values that would cause runtime failures.
    ///
    /// Missing credentials surface as [`BotError::ConfigurationMissing`] so
    /// callers can tell them apart from malformed values.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("luis.app_id", &self.luis.app_id),
            ("luis.api_key", &self.luis.api_key),
            ("luis.endpoint", &self.luis.endpoint),
            ("qna.knowledge_base_id", &self.qna.knowledge_base_id),
            ("qna.endpoint_key", &self.qna.endpoint_key),
            ("qna.host", &self.qna.host),
            ("scheduler.endpoint", &self.scheduler.endpoint),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(BotError::ConfigurationMissing(field.to_string()).into());
            }
        }

        if self.bot.collaborator_timeout_secs == 0 {
            anyhow::bail!("bot.collaborator_timeout_secs must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.qna.score_threshold) {
            anyhow::bail!("qna.score_threshold must be between 0.0 and 1.0");
        }
        if self.gateway.host.trim().is_empty() {
            anyhow::bail!("gateway.host must not be empty");
        }
        if self.gateway.bearer_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            anyhow::bail!("gateway.bearer_token must not be blank when set");
        }

        Ok(())
    }

    /// TOML rendering with every credential masked, for display.
    pub fn masked(&self) -> Result<String> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        Ok(mask_sensitive_fields(&toml_str))
    }
}

fn mask_sensitive_fields(toml_str: &str) -> String {
    let mut output = String::with_capacity(toml_str.len());
    for line in toml_str.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("api_key")
            || trimmed.starts_with("endpoint_key")
            || trimmed.starts_with("bearer_token")
        {
            if let Some(eq_pos) = line.find('=') {
                output.push_str(&line[..=eq_pos]);
                output.push_str(" \"***MASKED***\"");
            } else {
                output.push_str(line);
            }
        } else {
            output.push_str(line);
        }
        output.push('\n');
    }
    output
}
