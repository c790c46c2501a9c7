use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub generation: GenerationConfig,
    pub embedding: EmbeddingConfig,
    pub analysis: AnalysisConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    /// `"gemini"` or `"disabled"`. A disabled provider fails every call,
    /// which routes the pipeline through its fallback content.
    pub provider: String,
    pub model: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"gemini"` or `"disabled"`.
    pub provider: String,
    pub model: String,
    /// Vector dimensionality; constant across all chunk and query
    /// embeddings so similarity comparison stays valid.
    pub dims: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "text-embedding-004".to_string(),
            dims: 768,
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Chunk window length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Pacing delay between reported pipeline steps.
    pub step_delay_ms: u64,
    /// Number of chunks assembled into chat context.
    pub context_top_k: usize,
    /// Submitted content is truncated to this many characters.
    pub max_content_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            step_delay_ms: 800,
            context_top_k: 3,
            max_content_chars: 15_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.analysis.chunk_size == 0 {
        anyhow::bail!("analysis.chunk_size must be > 0");
    }
    if config.analysis.chunk_overlap >= config.analysis.chunk_size {
        anyhow::bail!("analysis.chunk_overlap must be smaller than analysis.chunk_size");
    }
    if config.analysis.context_top_k == 0 {
        anyhow::bail!("analysis.context_top_k must be >= 1");
    }

    match config.generation.provider.as_str() {
        "gemini" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be gemini or disabled.",
            other
        ),
    }

    match config.embedding.provider.as_str() {
        "gemini" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be gemini or disabled.",
            other
        ),
    }

    if config.embedding.is_enabled() && config.embedding.dims == 0 {
        anyhow::bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            config.embedding.provider
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.analysis.chunk_size, 1000);
        assert_eq!(config.analysis.chunk_overlap, 200);
        assert_eq!(config.analysis.step_delay_ms, 800);
        assert_eq!(config.embedding.dims, 768);
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_partial_file_overrides() {
        let config: Config = toml::from_str(
            r#"
            [generation]
            provider = "disabled"

            [analysis]
            step_delay_ms = 0
            "#,
        )
        .unwrap();
        assert!(!config.generation.is_enabled());
        assert!(config.embedding.is_enabled());
        assert_eq!(config.analysis.step_delay_ms, 0);
        assert_eq!(config.analysis.chunk_size, 1000);
    }

    #[test]
    fn test_rejects_overlap_ge_size() {
        let config: Config = toml::from_str(
            r#"
            [analysis]
            chunk_size = 100
            chunk_overlap = 100
            "#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let config: Config = toml::from_str(
            r#"
            [generation]
            provider = "cohere"
            "#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }
}
