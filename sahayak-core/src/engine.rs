//! Question answering over per-language vector indices.
//!
//! The engine owns the corpus, the embedder, the chat model, and a cache of
//! per-language indices. An index is acquired in three steps: in-memory
//! cache, then a persisted file (verified against version, checksum, and
//! source fingerprint), then a fresh build from the PDFs. Builds are
//! single-flight per language, so concurrent first requests embed the corpus
//! once.

use crate::chat::{ChatMessage, ChatModel, ChatRequest};
use crate::chunk::{self, ChunkingConfig};
use crate::config::AppConfig;
use crate::corpus::Corpus;
use crate::embeddings::Embedder;
use crate::error::{CorpusError, Result};
use crate::index::{self, IndexMetadata, VectorIndex};
use crate::prompt;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Answer returned when the requested language has no available documents.
pub const FALLBACK_ANSWER: &str = "❌ PDF not found for selected language.";

pub struct QueryEngine {
    corpus: Corpus,
    chunking: ChunkingConfig,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    index_dir: PathBuf,
    top_k: usize,
    temperature: f32,
    max_tokens: Option<usize>,
    indices: RwLock<HashMap<String, Arc<VectorIndex>>>,
    // One build lock per configured language; bounded by the language table.
    build_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl QueryEngine {
    pub fn new(config: &AppConfig, embedder: Arc<dyn Embedder>, chat: Arc<dyn ChatModel>) -> Self {
        Self {
            corpus: Corpus::new(&config.corpus),
            chunking: config.chunking.clone(),
            embedder,
            chat,
            index_dir: config.index.dir.clone(),
            top_k: config.index.top_k,
            temperature: config.chat.temperature,
            max_tokens: config.chat.max_tokens,
            indices: RwLock::new(HashMap::new()),
            build_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Answer a question against the corpus of the given language.
    ///
    /// The language name is normalized (`"English"` and `"english"` hit the
    /// same index). Unknown languages and languages whose PDFs are missing
    /// come back as `CorpusError` variants for the caller to map.
    pub async fn answer(&self, language: &str, question: &str) -> Result<String> {
        let key = Corpus::normalize_language(language);
        let index = self.ensure_index(&key).await?;

        let query_embedding = self.embedder.embed(question).await?;
        let hits = index.search(&query_embedding, self.top_k)?;
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        let context = prompt::build_context(&texts);

        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(prompt::build_system_prompt(&context)),
                ChatMessage::user(prompt::build_user_prompt(question)),
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = self.chat.complete(request).await?;

        if let Some(usage) = response.usage {
            debug!(
                language = %key,
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion finished"
            );
        }
        Ok(response.content)
    }

    /// Get the index for a language, building it at most once.
    async fn ensure_index(&self, language: &str) -> Result<Arc<VectorIndex>> {
        if !self.corpus.supports(language) {
            return Err(CorpusError::UnknownLanguage {
                language: language.to_string(),
            }
            .into());
        }

        if let Some(index) = self.indices.read().await.get(language) {
            return Ok(index.clone());
        }

        let lock = self.build_lock(language).await;
        let _guard = lock.lock().await;

        // Another request may have built the index while we waited.
        if let Some(index) = self.indices.read().await.get(language) {
            return Ok(index.clone());
        }

        let index = Arc::new(self.load_or_build(language).await?);
        self.indices
            .write()
            .await
            .insert(language.to_string(), index.clone());
        Ok(index)
    }

    async fn build_lock(&self, language: &str) -> Arc<Mutex<()>> {
        let mut locks = self.build_locks.lock().await;
        locks
            .entry(language.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load a verified persisted index, or rebuild from the PDFs.
    async fn load_or_build(&self, language: &str) -> Result<VectorIndex> {
        let path = index::index_path(&self.index_dir, language);
        let fingerprint = self.corpus.source_fingerprint(language)?;

        match VectorIndex::load(&path) {
            Ok(Some(index)) => {
                if index.is_compatible(
                    self.embedder.model_name(),
                    self.embedder.dimensions(),
                    &fingerprint,
                ) {
                    info!(
                        language,
                        path = %path.display(),
                        chunks = index.len(),
                        "Loaded persisted index"
                    );
                    return Ok(index);
                }
                warn!(language, "Persisted index is stale, rebuilding");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(language, error = %e, "Discarding unreadable index");
            }
        }

        let index = self.build_index(language, &fingerprint).await?;
        if let Err(e) = index.save(&path) {
            // Serve the in-memory index anyway; the next boot rebuilds.
            warn!(language, error = %e, "Failed to persist index");
        }
        Ok(index)
    }

    /// Chunk and embed every readable document for a language.
    async fn build_index(&self, language: &str, fingerprint: &str) -> Result<VectorIndex> {
        let documents = self.corpus.load_documents(language)?;

        let mut chunks = Vec::new();
        for document in &documents {
            chunks.extend(chunk::split_text(&document.id, &document.text, &self.chunking));
        }
        if chunks.is_empty() {
            // Documents exist but none yielded text; same contract as missing.
            return Err(CorpusError::NoDocuments {
                language: language.to_string(),
            }
            .into());
        }

        info!(
            language,
            documents = documents.len(),
            chunks = chunks.len(),
            model = self.embedder.model_name(),
            "Building vector index"
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let metadata = IndexMetadata {
            language: language.to_string(),
            embedding_model: self.embedder.model_name().to_string(),
            dimensions: self.embedder.dimensions(),
            source_fingerprint: fingerprint.to_string(),
            built_at: Utc::now(),
        };
        let mut index = VectorIndex::new(metadata);
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            index.insert(chunk, embedding)?;
        }
        Ok(index)
    }
}
