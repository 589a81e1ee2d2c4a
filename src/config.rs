use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    500
}
fn default_overlap_chars() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
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
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_instruction: default_system_instruction(),
            max_retries: default_max_retries(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// Entity-extraction and dialogue settings.
///
/// Exactly one extraction rule is active: `keyword` returns the first
/// history token containing `entity_pattern`, `prefix` the first token
/// starting with it. `default_resource` is returned when nothing matches.
#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_entity_match")]
    pub entity_match: String,
    #[serde(default = "default_entity_pattern")]
    pub entity_pattern: String,
    #[serde(default = "default_resource")]
    pub default_resource: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            entity_match: default_entity_match(),
            entity_pattern: default_entity_pattern(),
            default_resource: default_resource(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    32
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_tokens() -> u32 {
    500
}
fn default_temperature() -> f64 {
    0.7
}
fn default_system_instruction() -> String {
    "You are an AI assistant that provides answers based on the given context.".to_string()
}
fn default_generation_timeout_secs() -> u64 {
    60
}
fn default_entity_match() -> String {
    "keyword".to_string()
}
fn default_entity_pattern() -> String {
    "service".to_string()
}
fn default_resource() -> String {
    "primary".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.max_chars {
        anyhow::bail!("chunking.overlap_chars must be < chunking.max_chars");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "hash" | "huggingface" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, hash, or huggingface.",
            other
        ),
    }
    if config.embedding.is_enabled() {
        match config.embedding.dims {
            Some(d) if d > 0 => {}
            _ => anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            ),
        }
        if config.embedding.provider == "huggingface" && config.embedding.model.is_none() {
            anyhow::bail!("embedding.model must be specified for the huggingface provider");
        }
        if config.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be >= 1");
        }
    }

    match config.generation.provider.as_str() {
        "disabled" | "huggingface" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled or huggingface.",
            other
        ),
    }
    if config.generation.is_enabled() && config.generation.model.is_none() {
        anyhow::bail!("generation.model must be specified for the huggingface provider");
    }

    match config.agent.entity_match.as_str() {
        "keyword" | "prefix" => {}
        other => anyhow::bail!(
            "Unknown agent.entity_match: '{}'. Must be keyword or prefix.",
            other
        ),
    }
    if config.agent.entity_pattern.is_empty() {
        anyhow::bail!("agent.entity_pattern must not be empty");
    }
    if config.agent.default_resource.is_empty() {
        anyhow::bail!("agent.default_resource must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(extra: &str) -> Config {
        let toml = format!(
            r#"
[db]
path = "/tmp/opsmate-test.sqlite"
{}
"#,
            extra
        );
        toml::from_str(&toml).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        let config = base_config("");
        assert!(validate(&config).is_ok());
        assert_eq!(config.chunking.max_chars, 500);
        assert_eq!(config.chunking.overlap_chars, 50);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.embedding.provider, "disabled");
        assert_eq!(config.agent.entity_pattern, "service");
    }

    #[test]
    fn rejects_overlap_not_below_window() {
        let config = base_config("[chunking]\nmax_chars = 100\noverlap_chars = 100");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_unknown_embedding_provider() {
        let config = base_config("[embedding]\nprovider = \"chroma\"\ndims = 8");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_enabled_embedding_without_dims() {
        let config = base_config("[embedding]\nprovider = \"hash\"");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_huggingface_generation_without_model() {
        let config = base_config("[generation]\nprovider = \"huggingface\"");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_unknown_entity_rule() {
        let config = base_config("[agent]\nentity_match = \"regex\"");
        assert!(validate(&config).is_err());
    }
}
