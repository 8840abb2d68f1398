/// Language-model fallback module
///
/// Free-text questions that match no tour are forwarded to an OpenAI-compatible
/// chat completions endpoint. The call is made once: no retry, no backoff.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;

/// System instruction framing the model as the agency's travel assistant
const SYSTEM_PROMPT: &str = "You are the travel assistant of Bartargasht, an Iranian tour agency. \
    Answer in Persian, briefly and politely. Help the user with questions about travel, \
    destinations and tours. If they ask about a specific tour, suggest they type the \
    destination name so the bot can search the agency's catalog.";

/// A text-completion service
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Produce a reply for `prompt`
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI API request/response structures
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChatChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatChoice {
    message: ChatMessage,
}

/// Chat completions client
pub struct OpenAICompletion {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAICompletion {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    /// Build a client from configuration, or `None` when no API key is set
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        let Some(api_key) = config.openai_api_key.as_ref() else {
            return Ok(None);
        };

        Self::new(
            api_key.clone(),
            config.openai_base_url.clone(),
            config.gpt_model.clone(),
            Duration::from_secs(config.completion_timeout_secs),
        )
        .map(Some)
    }

    fn build_request(&self, prompt: &str) -> OpenAIChatRequest {
        OpenAIChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

/// Pull the first choice's text out of a raw response body
fn parse_reply(body: &str) -> Result<String> {
    let response: OpenAIChatResponse = serde_json::from_str(body).context(format!(
        "Failed to parse chat completion response. Response was: {}",
        body
    ))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .context("No response from GPT")
}

#[async_trait]
impl CompletionClient for OpenAICompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        log::info!("Asking {} for a fallback answer", self.model);

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.build_request(prompt))
            .send()
            .await
            .context("Failed to send chat completion request")?;

        // Check HTTP status
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(anyhow::anyhow!(
                "OpenAI API error (status {}): {}",
                status,
                error_text
            ));
        }

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        parse_reply(&body)
    }
}
