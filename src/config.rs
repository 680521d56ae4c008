//! TOML configuration.
//!
//! Every section except `[db]` is optional and falls back to the defaults
//! below. [`load_config`] parses and validates; [`Config::minimal`] is used
//! by commands that can run without a config file.
//!
//! ```toml
//! [db]
//! path = "./data/lens.sqlite"
//!
//! [chunking]
//! max_tokens = 3000
//! preserve_context = true
//! overlap_sentences = 2
//! strategy = "sentences"
//!
//! [generation]
//! provider = "ollama"
//! model = "llama3.2"
//! context_tokens = 4096
//! ```

use anyhow::{Context, Result};
use doclens_core::chunk::{ChunkOptions, ChunkStrategy, DEFAULT_OVERLAP_SENTENCES};
use doclens_core::prompt::{PromptBudget, DEFAULT_CONTEXT_TOKENS, DEFAULT_RESPONSE_RESERVE};
use doclens_core::token::DEFAULT_MAX_TOKENS;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub library: LibraryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_true")]
    pub preserve_context: bool,
    #[serde(default = "default_overlap_sentences")]
    pub overlap_sentences: usize,
    #[serde(default)]
    pub strategy: ChunkStrategy,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            preserve_context: true,
            overlap_sentences: DEFAULT_OVERLAP_SENTENCES,
            strategy: ChunkStrategy::Sentences,
        }
    }
}

impl ChunkingConfig {
    pub fn options(&self) -> ChunkOptions {
        ChunkOptions {
            max_tokens: self.max_tokens,
            preserve_context: self.preserve_context,
            overlap_sentences: self.overlap_sentences,
        }
    }
}

fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}
fn default_true() -> bool {
    true
}
fn default_overlap_sentences() -> usize {
    DEFAULT_OVERLAP_SENTENCES
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL; defaults per provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_context_tokens")]
    pub context_tokens: usize,
    #[serde(default = "default_response_reserve")]
    pub response_reserve: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Chunks generated in parallel for one document.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            url: None,
            context_tokens: DEFAULT_CONTEXT_TOKENS,
            response_reserve: DEFAULT_RESPONSE_RESERVE,
            max_retries: 3,
            timeout_secs: 60,
            concurrency: 2,
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    pub fn budget(&self) -> PromptBudget {
        PromptBudget::new(self.context_tokens, self.response_reserve)
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_context_tokens() -> usize {
    DEFAULT_CONTEXT_TOKENS
}
fn default_response_reserve() -> usize {
    DEFAULT_RESPONSE_RESERVE
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_concurrency() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct LibraryConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.txt".to_string(),
        "**/*.md".to_string(),
        "**/*.pdf".to_string(),
    ]
}

impl Config {
    /// Defaults for commands that run without a config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/lens.sqlite"),
            },
            chunking: ChunkingConfig::default(),
            generation: GenerationConfig::default(),
            library: LibraryConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }

    let generation = &config.generation;
    if generation.context_tokens <= generation.response_reserve {
        anyhow::bail!("generation.context_tokens must be greater than generation.response_reserve");
    }
    if generation.budget().chunk_tokens() == 0 {
        anyhow::bail!(
            "generation.context_tokens ({}) leaves no room for document text",
            generation.context_tokens
        );
    }
    if generation.concurrency == 0 {
        anyhow::bail!("generation.concurrency must be >= 1");
    }

    match generation.provider.as_str() {
        "disabled" => {}
        "openai" | "ollama" => {
            if generation.model.is_none() {
                anyhow::bail!(
                    "generation.model must be specified when provider is '{}'",
                    generation.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(())
}
