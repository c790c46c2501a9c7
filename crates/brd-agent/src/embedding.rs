//! Embedding provider abstraction and the Gemini implementation.
//!
//! Defines the [`Embedder`] trait plus:
//! - **[`GeminiEmbedder`]** — calls the Gemini `embedContent` endpoint with
//!   the same retry/backoff policy as the generation adapter.
//! - **[`DisabledEmbedder`]** — fails every call; the pipeline then runs
//!   with no vectors and chat falls back to insight-only context.
//!
//! The orchestrator treats an embedding failure as non-fatal for the chunk
//! involved: the chunk is skipped and the pipeline proceeds with whatever
//! vectors were produced.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbeddingConfig;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Text-in, fixed-length-vector-out embedding service.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-004"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `768`).
    fn dims(&self) -> usize;

    /// Embed a single text into a vector of [`dims`](Embedder::dims) floats.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Build the configured embedder.
///
/// As with generation, the API key is checked per call so a missing key is
/// a recoverable upstream failure, not a startup error.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiEmbedder::new(config))),
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Embedder that always fails. Configured with `provider = "disabled"`.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("Embedding provider is disabled")
    }
}

/// Gemini `embedContent` client.
pub struct GeminiEmbedder {
    model: String,
    dims: usize,
    max_retries: u32,
    timeout_secs: u64,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            model: config.model.clone(),
            dims: config.dims,
            max_retries: config.max_retries,
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let url = format!(
            "{}/models/{}:embedContent?key={}",
            GEMINI_BASE_URL, self.model, api_key
        );

        let body = serde_json::json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
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
                        let vector = parse_embed_response(&json)?;
                        if vector.len() != self.dims {
                            bail!(
                                "embedding dims mismatch: expected {}, got {}",
                                self.dims,
                                vector.len()
                            );
                        }
                        return Ok(vector);
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

/// Pull the vector out of an `embedContent` response.
fn parse_embed_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let values = json
        .pointer("/embedding/values")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("Gemini response missing embedding values"))?;

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| anyhow::anyhow!("non-numeric embedding value"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_embed_response() {
        let json = serde_json::json!({ "embedding": { "values": [0.1, -0.2, 0.3] } });
        let vector = parse_embed_response(&json).unwrap();
        assert_eq!(vector.len(), 3);
        assert!((vector[1] + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_parse_missing_embedding() {
        let json = serde_json::json!({ "error": "nope" });
        assert!(parse_embed_response(&json).is_err());
    }

    #[tokio::test]
    async fn test_disabled_embedder_fails() {
        let embedder = DisabledEmbedder;
        assert!(embedder.embed("text").await.is_err());
        assert_eq!(embedder.dims(), 0);
    }
}
