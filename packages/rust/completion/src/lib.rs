//! Text-completion endpoint client.
//!
//! Sends the research query as a prompt to an OpenAI-compatible
//! `POST {base_url}/completions` endpoint and returns the first choice.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use autoresearch_shared::{AppConfig, CompletionConfig, ResearchError, Result, validate_api_key};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Settings for one completion client.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl From<&CompletionConfig> for CompletionOptions {
    fn from(config: &CompletionConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        }
    }
}

/// Client for a text-completion endpoint.
pub struct CompletionClient {
    client: Client,
    api_key: String,
    options: CompletionOptions,
}

impl CompletionClient {
    /// Create a client with an explicit API key.
    pub fn new(options: CompletionOptions, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| ResearchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            options,
        })
    }

    /// Create a client from app config, reading the key from the configured env var.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = validate_api_key(config)?;
        info!(env = %config.completion.api_key_env, "completion API key loaded");
        Self::new(CompletionOptions::from(&config.completion), api_key)
    }

    /// Complete `prompt` and return the first choice's text, trimmed.
    #[instrument(skip_all, fields(model = %self.options.model, prompt_len = prompt.len()))]
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/completions", self.options.base_url.trim_end_matches('/'));
        let body = CompletionRequest {
            model: &self.options.model,
            prompt,
            max_tokens: self.options.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ResearchError::Completion(format!("{url}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ResearchError::Completion(format!("{url}: failed to read body: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| env.error.message)
                .unwrap_or(text);
            return Err(ResearchError::Completion(format!("HTTP {status}: {detail}")));
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| ResearchError::Completion(format!("unexpected response shape: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ResearchError::Completion("response contained no choices".into()))?;

        info!(
            model = parsed.model.as_deref().unwrap_or(&self.options.model),
            "completion received"
        );
        Ok(choice.text.trim().to_string())
    }
}
