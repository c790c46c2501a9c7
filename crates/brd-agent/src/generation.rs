//! Generative-model provider abstraction and the Gemini implementation.
//!
//! Defines the [`Generator`] trait the orchestrator and chat responder are
//! injected with, plus:
//! - **[`GeminiGenerator`]** — calls the Gemini `generateContent` endpoint
//!   with retry and exponential backoff.
//! - **[`DisabledGenerator`]** — fails every call; used when generation is
//!   not configured, which drives the pipeline's fallback content.
//!
//! # Retry Strategy
//!
//! Transient errors retry with exponential backoff (1s, 2s, 4s, ... capped
//! at 2^5):
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//!
//! Every failure surfaces as a recoverable `anyhow` error; callers decide
//! whether to fall back or propagate.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationConfig;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Text-in, text-out generative completion service.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-1.5-flash"`).
    fn model_name(&self) -> &str;

    /// Generate a completion for `prompt`, returning the raw response text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Build the configured generator.
///
/// The API key is read from `GEMINI_API_KEY` at call time, not here, so a
/// missing key degrades to per-call failures (and fallback content) rather
/// than preventing startup.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiGenerator::new(config))),
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

/// Generator that always fails. Configured with `provider = "disabled"`.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        bail!("Generation provider is disabled")
    }
}

/// Gemini `generateContent` client.
pub struct GeminiGenerator {
    model: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, api_key
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client.post(&url).json(&body).send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_generate_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("Gemini API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Gemini API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(anyhow::anyhow!("Gemini request failed: {}", e));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Gemini request failed")))
    }
}

/// Pull the candidate text out of a `generateContent` response.
///
/// Multi-part candidates are concatenated in order.
fn parse_generate_response(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow::anyhow!("Gemini response missing candidates"))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        bail!("Gemini response contained no text parts");
    }

    Ok(text)
}
