//! # Sahayak Core
//!
//! Core library for the sahayak farm-advisory question answering service.
//! Provides the PDF corpus, text chunking, embeddings, per-language vector
//! indices, prompt composition, and the retrieval-augmented query engine.

pub mod chat;
pub mod chunk;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod index;
pub mod pdf;
pub mod prompt;
pub mod providers;

// Re-export commonly used types at the crate root.
pub use chat::{ChatMessage, ChatModel, ChatRequest, ChatResponse, MockChatModel, Role, TokenUsage};
pub use chunk::{Chunk, ChunkingConfig};
pub use config::{AppConfig, load_config};
pub use corpus::{Corpus, SourceDocument};
pub use embeddings::{Embedder, EmbeddingConfig, LocalEmbedder, OpenAiEmbedder, create_embedder};
pub use engine::{FALLBACK_ANSWER, QueryEngine};
pub use error::{CorpusError, Result, SahayakError};
pub use index::{ScoredChunk, VectorIndex};
pub use prompt::AnswerStyle;
pub use providers::{OpenAiChatModel, create_chat_model};
