//! The per-language PDF corpus.
//!
//! A static table maps each supported language to a set of PDF files under
//! the corpus directory. Files are existence-checked at load time: missing
//! files are skipped with a warning, and a language with no readable
//! documents is reported as unavailable rather than failing the process.

use crate::config::CorpusConfig;
use crate::error::CorpusError;
use crate::pdf;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// A source document with its extracted text.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// File stem, e.g. `english1`.
    pub id: String,
    pub path: PathBuf,
    pub text: String,
}

/// The language → document-set table, resolved against the corpus directory.
#[derive(Debug, Clone)]
pub struct Corpus {
    pdf_dir: PathBuf,
    languages: BTreeMap<String, Vec<PathBuf>>,
}

impl Corpus {
    pub fn new(config: &CorpusConfig) -> Self {
        Self {
            pdf_dir: config.pdf_dir.clone(),
            languages: config.languages.clone(),
        }
    }

    /// Normalize a user-supplied language name to a table key.
    pub fn normalize_language(raw: &str) -> String {
        raw.trim().to_lowercase()
    }

    pub fn supports(&self, language_key: &str) -> bool {
        self.languages.contains_key(language_key)
    }

    pub fn language_keys(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    /// All configured paths for a language, resolved against the corpus
    /// directory, whether or not the files exist.
    pub fn document_paths(&self, language_key: &str) -> Result<Vec<PathBuf>, CorpusError> {
        let files = self
            .languages
            .get(language_key)
            .ok_or_else(|| CorpusError::UnknownLanguage {
                language: language_key.to_string(),
            })?;
        Ok(files.iter().map(|f| self.pdf_dir.join(f)).collect())
    }

    /// The configured paths that exist on disk. Missing files are skipped
    /// with a warning.
    pub fn readable_documents(&self, language_key: &str) -> Result<Vec<PathBuf>, CorpusError> {
        let mut readable = Vec::new();
        for path in self.document_paths(language_key)? {
            if path.exists() {
                readable.push(path);
            } else {
                warn!(language = language_key, path = %path.display(), "missing PDF, skipping");
            }
        }
        Ok(readable)
    }

    /// Extract the text of every readable document for a language.
    ///
    /// Returns `NoDocuments` when none of the configured files exist; a file
    /// that exists but cannot be parsed is an error, not a skip.
    pub fn load_documents(&self, language_key: &str) -> Result<Vec<SourceDocument>, CorpusError> {
        let paths = self.readable_documents(language_key)?;
        if paths.is_empty() {
            return Err(CorpusError::NoDocuments {
                language: language_key.to_string(),
            });
        }

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            debug!(language = language_key, path = %path.display(), "extracting PDF text");
            let text = pdf::extract_text(&path)?;
            if text.trim().is_empty() {
                warn!(path = %path.display(), "PDF contains no extractable text");
            }
            let id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            documents.push(SourceDocument { id, path, text });
        }
        Ok(documents)
    }

    /// A cheap fingerprint of a language's readable documents: SHA-256 over
    /// each file's configured path and byte size. Never reads document
    /// contents, so verifying a persisted index does not re-read PDFs.
    pub fn source_fingerprint(&self, language_key: &str) -> Result<String, CorpusError> {
        let mut hasher = Sha256::new();
        for path in self.readable_documents(language_key)? {
            let meta = std::fs::metadata(&path).map_err(|e| CorpusError::Io {
                path: path.clone(),
                message: e.to_string(),
            })?;
            hasher.update(path.display().to_string().as_bytes());
            hasher.update(b":");
            hasher.update(meta.len().to_le_bytes());
            hasher.update(b"\n");
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}
