//! Configuration for the Sahayak service.
//!
//! Loads layered configuration: built-in defaults, then an optional TOML
//! file, then `SAHAYAK_`-prefixed environment variables (with `__` as the
//! section separator), then the `PORT` environment variable for the
//! listening port.

use crate::chunk::ChunkingConfig;
use crate::embeddings::EmbeddingConfig;
use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The six languages served by default, each with five PDFs under the
/// corpus directory.
pub const DEFAULT_LANGUAGES: [&str; 6] =
    ["english", "hindi", "kannada", "telugu", "tamil", "marathi"];

const DEFAULT_PDFS_PER_LANGUAGE: usize = 5;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// The language → document-set table and the directory its paths are
/// resolved against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    #[serde(default = "default_pdf_dir")]
    pub pdf_dir: PathBuf,
    /// Language key (lowercase) → PDF file names relative to `pdf_dir`.
    #[serde(default = "default_languages")]
    pub languages: BTreeMap<String, Vec<PathBuf>>,
}

fn default_pdf_dir() -> PathBuf {
    PathBuf::from("pdfs")
}

fn default_languages() -> BTreeMap<String, Vec<PathBuf>> {
    DEFAULT_LANGUAGES
        .iter()
        .map(|lang| {
            let files = (1..=DEFAULT_PDFS_PER_LANGUAGE)
                .map(|n| PathBuf::from(format!("{lang}{n}.pdf")))
                .collect();
            (lang.to_string(), files)
        })
        .collect()
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            pdf_dir: default_pdf_dir(),
            languages: default_languages(),
        }
    }
}

/// Chat-completion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Override the API base URL (for OpenAI-compatible endpoints).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<usize>,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_chat_provider() -> String {
    "openai".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_chat_timeout_secs() -> u64 {
    60
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: default_chat_provider(),
            model: default_chat_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_chat_timeout_secs(),
        }
    }
}

/// Vector index storage and retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding one persisted index file per language.
    #[serde(default = "default_index_dir")]
    pub dir: PathBuf,
    /// Number of chunks retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("index")
}

fn default_top_k() -> usize {
    4
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
            top_k: default_top_k(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// When set, a daily-rolling JSON log file is written under this
    /// directory in addition to stderr output.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. The `PORT` environment variable (listening port only)
/// 2. Environment variables prefixed with `SAHAYAK_` (`__` splits sections,
///    e.g. `SAHAYAK_CHAT__MODEL`)
/// 3. The TOML file at `path` (or `sahayak.toml` in the working directory)
/// 4. Built-in defaults
///
/// A `[corpus.languages]` table supplied by the file or environment replaces
/// the built-in table outright; other values layer key by key.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut overrides = Figment::new();

    match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::FileNotFound { path: p.to_path_buf() });
            }
            overrides = overrides.merge(Toml::file(p));
        }
        None => {
            let default_file = Path::new("sahayak.toml");
            if default_file.exists() {
                overrides = overrides.merge(Toml::file(default_file));
            }
        }
    }

    overrides = overrides.merge(Env::prefixed("SAHAYAK_").split("__"));

    let figment =
        Figment::from(Serialized::defaults(AppConfig::default())).merge(overrides.clone());
    let mut config: AppConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;

    // figment merges dicts key by key, which would graft a configured
    // languages table onto the six defaults. A configured table stands alone.
    if let Ok(languages) =
        overrides.extract_inner::<BTreeMap<String, Vec<PathBuf>>>("corpus.languages")
    {
        config.corpus.languages = languages;
    }

    if let Ok(port) = std::env::var("PORT") {
        config.server.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
            message: format!("PORT is not a valid port number: {port}"),
        })?;
    }

    Ok(config)
}

impl AppConfig {
    /// Validate the configuration and return human-readable warnings.
    ///
    /// Warnings never prevent startup; they flag values that are likely
    /// mistakes.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.corpus.languages.is_empty() {
            warnings.push("corpus.languages is empty; every request will fail".to_string());
        }
        for (language, files) in &self.corpus.languages {
            if files.is_empty() {
                warnings.push(format!(
                    "corpus.languages.{language} lists no PDF files"
                ));
            }
        }
        if !self.corpus.pdf_dir.exists() {
            warnings.push(format!(
                "corpus.pdf_dir '{}' does not exist; indices can only be served from disk",
                self.corpus.pdf_dir.display()
            ));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            warnings.push(format!(
                "chunking.chunk_overlap ({}) >= chunk_size ({}); overlap is capped at chunk_size - 1",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            ));
        }
        if self.index.top_k == 0 {
            warnings.push("index.top_k is 0; answers will have no retrieved context".to_string());
        }
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            warnings.push(format!(
                "chat.temperature {} is outside the usual 0.0..=2.0 range",
                self.chat.temperature
            ));
        }

        warnings
    }
}
