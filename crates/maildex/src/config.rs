use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Weight of the dense (vector) score in fusion:
    /// `final = alpha * sim + (1 - alpha) * lexical`.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Queries slower than this log a warning but still answer.
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            slow_query_ms: default_slow_query_ms(),
        }
    }
}

fn default_alpha() -> f64 {
    0.7
}
fn default_slow_query_ms() -> u64 {
    150
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Endpoint override (Ollama only).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    /// SQLite database holding the mail collaborator's `emails` table.
    pub email_db: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if !(0.0..=1.0).contains(&config.retrieval.alpha) {
        anyhow::bail!("retrieval.alpha must be in [0.0, 1.0]");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("maildex.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let tmp = std::env::temp_dir().join("maildex-config-minimal");
        std::fs::create_dir_all(&tmp).unwrap();
        let path = write_config(&tmp, "[db]\npath = \"/tmp/maildex.sqlite\"\n");

        let config = load_config(&path).unwrap();
        assert_eq!(config.retrieval.alpha, 0.7);
        assert_eq!(config.retrieval.slow_query_ms, 150);
        assert_eq!(config.embedding.provider, "disabled");
        assert!(!config.embedding.is_enabled());
    }

    #[test]
    fn test_enabled_provider_requires_model_and_dims() {
        let tmp = std::env::temp_dir().join("maildex-config-invalid");
        std::fs::create_dir_all(&tmp).unwrap();
        let path = write_config(
            &tmp,
            "[db]\npath = \"/tmp/maildex.sqlite\"\n[embedding]\nprovider = \"openai\"\n",
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_alpha_out_of_range_rejected() {
        let tmp = std::env::temp_dir().join("maildex-config-alpha");
        std::fs::create_dir_all(&tmp).unwrap();
        let path = write_config(
            &tmp,
            "[db]\npath = \"/tmp/maildex.sqlite\"\n[retrieval]\nalpha = 1.5\n",
        );
        assert!(load_config(&path).is_err());
    }
}
