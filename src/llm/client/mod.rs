//! HTTP client for hosted language models.
//!
//! Speaks the Gemini `generateContent` API by default, plus OpenAI-compatible
//! chat completions and Ollama's generate endpoint.

mod config;
mod wire;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use thiserror::Error;
use tracing::{debug, warn};

pub use config::{parse_temperature, preset, LlmConfig, LlmProvider, ProviderPreset};

use super::retry::{backoff_delay, is_retryable, parse_retry_after};
use wire::*;

/// Base delay for exponential backoff on rate limits.
const BACKOFF_BASE_MS: u64 = 1000;

/// Anything that can turn a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send a single prompt and return the raw model output.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier, for logging and responses.
    fn model_name(&self) -> &str;
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Failed to reach the model service
    #[error("Connection error: {0}")]
    Connection(String),

    /// API returned an error
    #[error("API error: {0}")]
    Api(String),

    /// Failed to decode the response
    #[error("Parse error: {0}")]
    Parse(String),

    /// No key configured for a provider that needs one
    #[error("No API key configured for {provider}; set {hint}")]
    MissingApiKey { provider: LlmProvider, hint: String },

    /// Still rate limited after all retries
    #[error("Rate limited by {provider} after {attempts} attempts")]
    RateLimited {
        provider: LlmProvider,
        attempts: u32,
        retry_after_secs: Option<u64>,
    },

    /// The provider refused to answer (safety filters and similar)
    #[error("Response blocked by provider: {0}")]
    Blocked(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            LlmError::Parse(e.to_string())
        } else if e.is_timeout() {
            LlmError::Connection(format!("request timed out: {}", e))
        } else {
            LlmError::Connection(e.to_string())
        }
    }
}

/// LLM client for document summarisation.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Check if the model service answers its model-listing endpoint.
    pub async fn is_available(&self) -> bool {
        let endpoint = &self.config.endpoint;
        let request = match self.config.provider {
            LlmProvider::Gemini => {
                let Ok(key) = self.require_key() else {
                    return false;
                };
                self.client
                    .get(format!("{}/v1beta/models", endpoint))
                    .header("x-goog-api-key", key)
            }
            LlmProvider::OpenAI => {
                let Ok(key) = self.require_key() else {
                    return false;
                };
                self.client
                    .get(format!("{}/v1/models", endpoint))
                    .bearer_auth(key)
            }
            LlmProvider::Ollama => self.client.get(format!("{}/api/tags", endpoint)),
        };

        match request.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("Availability probe failed: {}", e);
                false
            }
        }
    }

    /// Configured API key, or `MissingApiKey` naming the variables to set.
    pub fn require_key(&self) -> Result<&str, LlmError> {
        self.config.api_key().ok_or_else(|| {
            let hint = self
                .config
                .active_preset()
                .map(|p| p.key_vars.join(" or "))
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| "LLM_API_KEY".to_string());
            LlmError::MissingApiKey {
                provider: self.config.provider,
                hint,
            }
        })
    }

    /// Send a request, retrying on 429/503 with backoff.
    async fn send_with_retry<F>(&self, build: F) -> Result<Response, LlmError>
    where
        F: Fn() -> RequestBuilder,
    {
        let delay = Duration::from_millis(self.config.request_delay_ms);
        if delay > Duration::ZERO {
            debug!("Waiting {:?} before request", delay);
            tokio::time::sleep(delay).await;
        }

        let mut attempt = 0;
        loop {
            let response = build().send().await?;
            let status = response.status();

            if is_retryable(status) {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                if attempt >= self.config.max_retries {
                    return Err(LlmError::RateLimited {
                        provider: self.config.provider,
                        attempts: attempt + 1,
                        retry_after_secs: retry_after.and_then(|s| s.trim().parse().ok()),
                    });
                }

                let wait = parse_retry_after(retry_after.as_deref())
                    .unwrap_or_else(|| backoff_delay(attempt, BACKOFF_BASE_MS));
                warn!(
                    "{} returned {} (attempt {}), waiting {:?}",
                    self.config.provider,
                    status,
                    attempt + 1,
                    wait
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api(format!("HTTP {}: {}", status, body.trim())));
            }

            return Ok(response);
        }
    }

    /// Call the Gemini generateContent API.
    async fn call_gemini(&self, prompt: &str) -> Result<String, LlmError> {
        let key = self.require_key()?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint, self.config.model
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            },
        };

        let resp = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .header("x-goog-api-key", key)
                    .json(&request)
            })
            .await?;

        let body: GeminiResponse = resp.json().await?;
        if let Some(error) = &body.error {
            return Err(LlmError::Api(error.message.clone()));
        }
        if let Some(reason) = body
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Err(LlmError::Blocked(reason));
        }
        if let Some(reason) = body
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.finish_reason.as_deref())
            .filter(|r| *r != "STOP" && *r != "MAX_TOKENS")
        {
            debug!("Gemini finish reason: {}", reason);
        }

        body.into_text()
            .ok_or_else(|| LlmError::Parse("Gemini response contained no candidates".to_string()))
    }

    /// Call an OpenAI-compatible chat completions API.
    async fn call_openai(&self, prompt: &str) -> Result<String, LlmError> {
        let key = self.require_key()?;
        let url = format!("{}/v1/chat/completions", self.config.endpoint);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let resp = self
            .send_with_retry(|| self.client.post(&url).bearer_auth(key).json(&request))
            .await?;

        let body: ChatResponse = resp.json().await?;
        if let Some(error) = body.error {
            return Err(LlmError::Api(error.message));
        }

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("Chat response contained no choices".to_string()))
    }

    /// Call Ollama API with a prompt.
    async fn call_ollama(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.config.endpoint);
        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let resp = self
            .send_with_retry(|| self.client.post(&url).json(&request))
            .await?;

        let body: OllamaResponse = resp.json().await?;
        Ok(body.response)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(
            "Sending {} chars to {} ({})",
            prompt.len(),
            self.config.provider,
            self.config.model
        );
        match self.config.provider {
            LlmProvider::Gemini => self.call_gemini(prompt).await,
            LlmProvider::OpenAI => self.call_openai(prompt).await,
            LlmProvider::Ollama => self.call_ollama(prompt).await,
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
