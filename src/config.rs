//! Configuration parsing and validation.
//!
//! UniBot is configured with a TOML file (default `./config/unibot.toml`).
//! Every section and field has a default, so an empty file is a valid
//! configuration that indexes `./docs` with local embeddings and answers
//! through the Hugging Face router.
//!
//! ```toml
//! [documents]
//! dir = "docs"
//! include_globs = ["**/*.pdf", "**/*.docx", "**/*.md", "**/*.txt"]
//!
//! [chunking]
//! chunk_size = 500
//! chunk_overlap = 50
//!
//! [retrieval]
//! k = 3
//!
//! [index]
//! path = "./data/unibot-index.sqlite"
//!
//! [embedding]
//! provider = "local"          # "openai" | "ollama" | "local"
//! model = "all-minilm-l6-v2"
//! dims = 384
//!
//! [llm]
//! provider = "huggingface"    # "openai" | "ollama" | "huggingface"
//! model = "HuggingFaceH4/zephyr-7b-beta"
//! max_tokens = 256
//! temperature = 0.5
//!
//! [history]
//! max_length = 10
//! ```
//!
//! [`load_config`] rejects invalid values with
//! [`Error::Configuration`](unibot_core::Error::Configuration).

use serde::Deserialize;
use std::path::{Path, PathBuf};

use unibot_core::{Error, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    #[serde(default = "default_docs_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dir: default_docs_dir(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("docs")
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: default_k() }
    }
}

fn default_k() -> usize {
    unibot_core::pipeline::DEFAULT_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./data/unibot-index.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (Ollama server, OpenAI-compatible gateway).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_timeout() -> u64 {
    30
}

impl EmbeddingConfig {
    /// Configured model, or the provider's default.
    pub fn model_name(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        match self.provider.as_str() {
            "openai" => "text-embedding-3-small",
            "ollama" => "nomic-embed-text",
            _ => "all-minilm-l6-v2",
        }
        .to_string()
    }

    /// Configured dimensionality, or the default model's.
    pub fn dims(&self) -> usize {
        if let Some(dims) = self.dims {
            return dims;
        }
        match self.provider.as_str() {
            "openai" => 1536,
            "ollama" => 768,
            _ => 384,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_provider() -> String {
    "huggingface".to_string()
}
fn default_max_tokens() -> u32 {
    256
}
fn default_temperature() -> f32 {
    0.5
}
fn default_llm_timeout() -> u64 {
    120
}

impl LlmConfig {
    pub fn model_name(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        match self.provider.as_str() {
            "openai" => "gpt-4o-mini",
            "ollama" => "llama3.2",
            _ => "HuggingFaceH4/zephyr-7b-beta",
        }
        .to_string()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
        }
    }
}

fn default_max_length() -> usize {
    unibot_core::history::DEFAULT_MAX_LENGTH
}

/// Read, parse and validate the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)
        .map_err(|e| Error::Configuration(format!("failed to parse config file: {}", e)))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let fail = |msg: String| Err(Error::Configuration(msg));

    if config.chunking.chunk_size == 0 {
        return fail("chunking.chunk_size must be > 0".to_string());
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        return fail(format!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap, config.chunking.chunk_size
        ));
    }

    if config.retrieval.k == 0 {
        return fail("retrieval.k must be >= 1".to_string());
    }

    if config.history.max_length == 0 || config.history.max_length % 2 != 0 {
        return fail(format!(
            "history.max_length must be a positive even number, got {}",
            config.history.max_length
        ));
    }

    match config.embedding.provider.as_str() {
        "openai" | "ollama" | "local" => {}
        other => {
            return fail(format!(
                "unknown embedding provider '{}': must be openai, ollama, or local",
                other
            ))
        }
    }
    if config.embedding.dims == Some(0) {
        return fail("embedding.dims must be > 0".to_string());
    }
    if config.embedding.batch_size == 0 {
        return fail("embedding.batch_size must be > 0".to_string());
    }

    match config.llm.provider.as_str() {
        "openai" | "ollama" | "huggingface" => {}
        other => {
            return fail(format!(
                "unknown llm provider '{}': must be openai, ollama, or huggingface",
                other
            ))
        }
    }
    if config.llm.max_tokens == 0 {
        return fail("llm.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        return fail("llm.temperature must be in [0.0, 2.0]".to_string());
    }

    Ok(())
}
