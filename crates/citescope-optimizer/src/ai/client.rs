//! HTTP client for an OpenAI-compatible chat-completions endpoint.

use std::future::Future;
use std::time::Duration;

use citescope_core::AppConfig;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BACKOFF_BASE_SECS: u64 = 1;
/// Error bodies are truncated to this many characters before logging.
const MAX_ERROR_BODY_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = "You are a generative engine optimization analyst. \
Reply with a single JSON object of the form \
{\"recommendations\": [{\"type\": string, \"title\": string, \"description\": string, \"steps\": [string]}]} \
and nothing else.";

/// Anything that can turn a prompt into completion text.
///
/// The analyzer only depends on this trait, so tests can substitute a canned
/// implementation for the HTTP client.
pub trait ReasoningClient: Send + Sync {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, AnalyzerError>> + Send;
}

/// Client for the external reasoning service.
///
/// Use [`HttpReasoningClient::new`] for the public endpoint or
/// [`HttpReasoningClient::with_base_url`] to point at a self-hosted gateway
/// or a mock server.
pub struct HttpReasoningClient {
    client: Client,
    api_key: String,
    endpoint: Url,
    model: String,
    max_retries: u32,
    backoff_base_secs: u64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl HttpReasoningClient {
    /// Creates a client for the default public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, AnalyzerError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, model, timeout_secs)
    }

    /// Creates a client against a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::MissingCredential`] for a blank key,
    /// [`AnalyzerError::InvalidBaseUrl`] if `base_url` does not parse, or
    /// [`AnalyzerError::Http`] if the `reqwest::Client` cannot be built.
    pub fn with_base_url(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, AnalyzerError> {
        if api_key.trim().is_empty() {
            return Err(AnalyzerError::MissingCredential);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("citescope/0.1 (optimization-analysis)")
            .build()?;

        // Trailing slash so `join` appends instead of replacing the last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join("chat/completions"))
            .map_err(|e| AnalyzerError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            endpoint,
            model: model.to_owned(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
        })
    }

    /// Builds a client from the process configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::MissingCredential`] when no API key is
    /// configured, plus anything [`Self::with_base_url`] returns.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AnalyzerError> {
        let api_key = config
            .ai_api_key
            .as_deref()
            .ok_or(AnalyzerError::MissingCredential)?;
        Ok(Self::with_base_url(
            api_key,
            &config.ai_base_url,
            &config.ai_model,
            config.ai_timeout_secs,
        )?
        .with_retry(config.ai_max_retries, config.ai_retry_backoff_base_secs))
    }

    /// Overrides the retry policy for transient failures.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_secs: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_secs = backoff_base_secs;
        self
    }

    async fn send_once(&self, prompt: &str) -> Result<String, AnalyzerError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::UnexpectedStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AnalyzerError::EmptyCompletion)
    }
}

impl ReasoningClient for HttpReasoningClient {
    async fn complete(&self, prompt: &str) -> Result<String, AnalyzerError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            self.send_once(prompt)
        })
        .await
    }
}
