//! OpenRouter chat-completion client with ordered model fallback
//!
//! Tries each configured model in sequence: 403 (region-blocked) and 404
//! (model unavailable) advance to the next candidate, every other failure
//! is terminal. Successful completions always pass through the response
//! normalizer - no upstream body is trusted structurally.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use silk_common::api::{FortuneStick, Interpretation};

use crate::config::OracleConfig;
use crate::services::{normalizer, prompt};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f64 = 0.8;
const MAX_TOKENS: u32 = 1000;

/// Default model fallback order: strongest first, most-available last
pub const DEFAULT_MODELS: &[&str] = &[
    "anthropic/claude-3.5-sonnet",
    "openai/gpt-4",
    "openai/gpt-4-turbo",
    "deepseek/deepseek-chat",
    "deepseek/deepseek-coder",
    "openai/gpt-3.5-turbo",
];

/// The last recorded per-model failure when every candidate was skipped
#[derive(Debug, Clone)]
pub struct UpstreamFailure {
    pub status: u16,
    pub message: String,
}

/// Interpretation request errors
#[derive(Debug, Error)]
pub enum OracleError {
    /// Every candidate model was region-blocked or unavailable
    #[error("All models unavailable")]
    AllModelsUnavailable { last: Option<UpstreamFailure> },

    /// A terminal (non-403/404) upstream error status
    #[error("Upstream API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Client for the interpretation flow
pub struct OracleClient {
    http: reqwest::Client,
    config: OracleConfig,
}

impl OracleClient {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }

    /// Generate a three-part reading for the drawn stick and question.
    pub async fn interpret(
        &self,
        stick: &FortuneStick,
        question: &str,
    ) -> Result<Interpretation, OracleError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            // No gateway key configured: development mode
            return Ok(mock_interpretation(stick));
        };

        let raw = self.complete(api_key, stick, question).await?;
        Ok(normalizer::normalize(&raw))
    }

    /// Run the model fallback loop and return the first raw completion.
    async fn complete(
        &self,
        api_key: &str,
        stick: &FortuneStick,
        question: &str,
    ) -> Result<String, OracleError> {
        let user_prompt = prompt::build_oracle_prompt(stick, question);
        let mut last_failure: Option<UpstreamFailure> = None;

        for model in &self.config.models {
            let response = self
                .http
                .post(OPENROUTER_URL)
                .bearer_auth(api_key)
                .header("HTTP-Referer", &self.config.referer)
                .header("X-Title", &self.config.title)
                .json(&json!({
                    "model": model,
                    "messages": [
                        { "role": "system", "content": prompt::SYSTEM_PROMPT },
                        { "role": "user", "content": user_prompt },
                    ],
                    "temperature": TEMPERATURE,
                    "max_tokens": MAX_TOKENS,
                }))
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                info!("Interpretation served by model {}", model);
                let body: ChatCompletionResponse = response.json().await?;
                return Ok(body
                    .content()
                    .unwrap_or_else(|| "Unable to generate interpretation.".to_string()));
            }

            let message = upstream_error_message(response).await;
            if status == StatusCode::FORBIDDEN || status == StatusCode::NOT_FOUND {
                warn!(
                    "Model {} unavailable ({}): {}, trying next model",
                    model, status, message
                );
                last_failure = Some(UpstreamFailure {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }

            return Err(OracleError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Err(OracleError::AllModelsUnavailable { last: last_failure })
    }
}

/// Pull a readable message out of an upstream error body.
///
/// Gateway error bodies are usually `{"error": {"message": ...}}`, but may
/// be a bare string or not JSON at all.
async fn upstream_error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return message.to_string();
        }
    }

    if text.is_empty() {
        format!("Model unavailable ({})", status.as_u16())
    } else {
        text
    }
}

/// Deterministic reading used when no gateway key is configured
fn mock_interpretation(stick: &FortuneStick) -> Interpretation {
    Interpretation {
        resonance: format!(
            "The Silk has felt your query... Under the light of {}, the threads of your fate \
             are beginning to shimmer. The energy of Lot #{} resonates deeply with your \
             question. The ancient legend of {} speaks to this moment in your journey.",
            stick.display_level(),
            stick.number,
            stick.story_en.as_deref().unwrap_or("the Oracle"),
        ),
        weaving: format!(
            "Regarding your question, the Oracle's guidance suggests a path of reflection and \
             inner wisdom. The message reveals that {}. Trust in your ability to navigate this \
             situation with grace. The ancient wisdom reminds us that every challenge carries \
             within it the seed of growth and understanding.",
            stick
                .detail2_en
                .as_deref()
                .unwrap_or("this is a time for thoughtful consideration"),
        ),
        ritual: "Take 10 minutes each morning this week to write down three things you're \
                 grateful for, then reflect on how this practice shifts your perspective. This \
                 mindfulness exercise will help anchor the insights you've gained."
            .to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn content(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.is_empty())
    }
}
