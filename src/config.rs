//! Settings file parsing and validation.
//!
//! The settings file is YAML (`.yaml`/`.yml`, the default `settings.yaml`)
//! or TOML (`.toml`). Recognized sections:
//!
//! | Section | Purpose |
//! |---------|---------|
//! | `model` | Chat-completions endpoint, model name, provider label |
//! | `chromadb` (alias `store`) | Persist directory, collection, documents directory, result count |
//! | `front_end` | Page title and description |
//! | `general` | Repository URL and contacts shown on the about panel |
//! | `embedding` | Optional embedding provider for similarity search |
//! | `server` | Bind address of the chat server |
//! | `history` | CSV files for chat history and feedback |

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub model: ModelConfig,
    #[serde(alias = "store")]
    pub chromadb: StoreConfig,
    #[serde(default)]
    pub front_end: FrontEndConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub base_model_url: String,
    pub model_name: String,
    #[serde(default)]
    pub service_provider: Option<String>,
    /// Name of the environment variable holding the API key. When the
    /// variable is unset, requests are sent without authorization.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_model_timeout_secs() -> u64 {
    120
}

impl ModelConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub persist_directory: PathBuf,
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
    #[serde(default = "default_documents_directory")]
    pub documents_directory: PathBuf,
    #[serde(default = "default_n_results")]
    pub n_results: usize,
}

fn default_collection_name() -> String {
    "docs_collection".to_string()
}
fn default_documents_directory() -> PathBuf {
    PathBuf::from("docs")
}
fn default_n_results() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct FrontEndConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

fn default_title() -> String {
    "Chat with your documents".to_string()
}

impl Default for FrontEndConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GeneralConfig {
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub contacts: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
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

    /// Check provider name and required fields.
    pub fn validate(&self) -> Result<()> {
        match self.provider.as_str() {
            "disabled" | "openai" | "ollama" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
                other
            ),
        }
        if self.is_enabled() {
            if self.dims.is_none() || self.dims == Some(0) {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    self.provider
                );
            }
            if self.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    self.provider
                );
            }
            if self.batch_size == 0 {
                bail!("embedding.batch_size must be > 0");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:7860".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_chat_log")]
    pub chat_log: PathBuf,
    #[serde(default = "default_feedback_log")]
    pub feedback_log: PathBuf,
}

fn default_chat_log() -> PathBuf {
    PathBuf::from("chat_history.csv")
}
fn default_feedback_log() -> PathBuf {
    PathBuf::from("feedback.csv")
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            chat_log: default_chat_log(),
            feedback_log: default_feedback_log(),
        }
    }
}

/// Only the `embedding` section, for tools that otherwise run from flags.
#[derive(Debug, Deserialize, Default)]
struct EmbeddingOnly {
    #[serde(default)]
    embedding: EmbeddingConfig,
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
}

fn parse<T: for<'de> Deserialize<'de>>(path: &Path, content: &str) -> Result<T> {
    if is_toml(path) {
        toml::from_str(content).with_context(|| "Failed to parse config file")
    } else {
        serde_yaml::from_str(content).with_context(|| "Failed to parse config file")
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        bail!("{} config file not found!", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = parse(path, &content)?;

    if config.model.model_name.trim().is_empty() {
        bail!("model.model_name must not be empty");
    }
    if config.chromadb.collection_name.trim().is_empty() {
        bail!("chromadb.collection_name must not be empty");
    }
    if config.chromadb.n_results < 1 {
        bail!("chromadb.n_results must be >= 1");
    }
    config.embedding.validate()?;

    Ok(config)
}

/// Read just the `embedding` section of `path`.
///
/// A missing file means embeddings are disabled; a present but invalid file
/// is an error.
pub fn load_embedding_config(path: &Path) -> Result<EmbeddingConfig> {
    if !path.exists() {
        return Ok(EmbeddingConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let parsed: EmbeddingOnly = parse(path, &content)?;
    parsed.embedding.validate()?;
    Ok(parsed.embedding)
}
