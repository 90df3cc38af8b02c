//! Error types for the Sahayak core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering configuration, corpus loading, provider calls, and the vector
//! index.

use std::path::PathBuf;

/// Top-level error type for the Sahayak core library.
#[derive(Debug, thiserror::Error)]
pub enum SahayakError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from loading the per-language PDF corpus.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Unsupported language: {language}")]
    UnknownLanguage { language: String },

    #[error("No readable documents for language: {language}")]
    NoDocuments { language: String },

    #[error("Failed to extract text from {path}: {message}")]
    PdfParse { path: PathBuf, message: String },

    #[error("IO error reading {path}: {message}")]
    Io { path: PathBuf, message: String },
}

/// Errors from embeddings and chat-completion provider calls.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from the persisted vector index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index checksum mismatch: {path}")]
    ChecksumMismatch { path: PathBuf },

    #[error("Unsupported index format version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Index serialization error: {message}")]
    Serialization { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A type alias for results using the top-level `SahayakError`.
pub type Result<T> = std::result::Result<T, SahayakError>;
