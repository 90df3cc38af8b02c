//! In-memory vector index with checksummed on-disk persistence.
//!
//! One index per language. The persisted form is a JSON envelope carrying a
//! format version, a SHA-256 checksum of the payload, and compatibility
//! metadata (embedding model, dimensionality, source fingerprint). A file
//! that fails any of these checks is discarded and the index is rebuilt from
//! the PDFs, so a corrupt or stale file never poisons retrieval.

use crate::chunk::Chunk;
use crate::error::IndexError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const INDEX_FORMAT_VERSION: u32 = 1;

/// A chunk with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A retrieval hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Compatibility metadata persisted with the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub language: String,
    pub embedding_model: String,
    pub dimensions: usize,
    /// Fingerprint of the source documents the index was built from.
    pub source_fingerprint: String,
    pub built_at: DateTime<Utc>,
}

/// An in-memory vector index for one language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    metadata: IndexMetadata,
    entries: Vec<IndexEntry>,
}

/// On-disk envelope: format version + checksum over the serialized index.
#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    /// SHA-256 hex digest of `payload`.
    checksum: String,
    /// JSON-serialized `VectorIndex`.
    payload: String,
}

fn checksum_hex(payload: &str) -> String {
    format!("{:x}", Sha256::digest(payload.as_bytes()))
}

/// Path of the persisted index for a language.
pub fn index_path(dir: &Path, language: &str) -> PathBuf {
    dir.join(format!("{language}.index.json"))
}

impl VectorIndex {
    pub fn new(metadata: IndexMetadata) -> Self {
        Self {
            metadata,
            entries: Vec::new(),
        }
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a chunk with its embedding.
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<(), IndexError> {
        if embedding.len() != self.metadata.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.metadata.dimensions,
                actual: embedding.len(),
            });
        }
        self.entries.push(IndexEntry { chunk, embedding });
        Ok(())
    }

    /// Return the `top_k` chunks most similar to the query embedding,
    /// best first. The query must match the index dimensionality.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if query.len() != self.metadata.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.metadata.dimensions,
                actual: query.len(),
            });
        }
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query, &entry.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Whether this index was built with the given model against the given
    /// sources. Used to decide if a persisted index can be reused.
    pub fn is_compatible(&self, model: &str, dimensions: usize, fingerprint: &str) -> bool {
        self.metadata.embedding_model == model
            && self.metadata.dimensions == dimensions
            && self.metadata.source_fingerprint == fingerprint
    }

    /// Atomically persist the index: write a `.tmp` sibling, then rename.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let payload = serde_json::to_string(self).map_err(|e| IndexError::Serialization {
            message: e.to_string(),
        })?;
        let file = IndexFile {
            version: INDEX_FORMAT_VERSION,
            checksum: checksum_hex(&payload),
            payload,
        };
        let json = serde_json::to_string(&file).map_err(|e| IndexError::Serialization {
            message: e.to_string(),
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json.as_bytes())?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load a persisted index, verifying version and checksum.
    ///
    /// Returns `Ok(None)` if the file doesn't exist; a file that exists but
    /// fails verification is an error so the caller can rebuild.
    pub fn load(path: &Path) -> Result<Option<VectorIndex>, IndexError> {
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(path)?;
        let file: IndexFile =
            serde_json::from_str(&data).map_err(|e| IndexError::Serialization {
                message: e.to_string(),
            })?;

        if file.version != INDEX_FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion {
                version: file.version,
            });
        }
        if checksum_hex(&file.payload) != file.checksum {
            return Err(IndexError::ChecksumMismatch {
                path: path.to_path_buf(),
            });
        }

        let index: VectorIndex =
            serde_json::from_str(&file.payload).map_err(|e| IndexError::Serialization {
                message: e.to_string(),
            })?;
        Ok(Some(index))
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
