//! Pluggable embedding providers.
//!
//! Provides a trait-based abstraction over embedding models, with a hosted
//! OpenAI implementation and a local hashing embedder for offline use and
//! tests. Indices persist the provider's model name and dimensionality, so
//! switching providers invalidates persisted indices rather than mixing
//! vector spaces.

use crate::error::ProviderError;
use crate::providers;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Trait for embedding providers.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Generate embeddings for a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Return the dimensionality of embeddings.
    fn dimensions(&self) -> usize;

    /// Return the provider name.
    fn provider_name(&self) -> &str;

    /// Return the model name recorded in persisted indices.
    fn model_name(&self) -> &str;
}

/// Configuration for embedding providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider name: "openai" (default) or "local".
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Embedding dimensions (0 = use the model's default).
    #[serde(default)]
    pub dimensions: usize,
    /// Environment variable holding the API key.
    #[serde(default = "default_embedding_api_key_env")]
    pub api_key_env: String,
    /// Override the API base URL (for OpenAI-compatible endpoints).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    /// Number of texts sent per embeddings request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: 0,
            api_key_env: default_embedding_api_key_env(),
            base_url: None,
            timeout_secs: default_embedding_timeout_secs(),
            batch_size: default_batch_size(),
        }
    }
}

const LOCAL_DEFAULT_DIMENSIONS: usize = 128;

/// Local hashing embedder. Deterministic, offline, and cheap; useful for
/// tests and development without API keys.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dimensions: usize,
}

impl LocalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        if words.is_empty() {
            return vector;
        }

        // Count term frequency
        let mut tf: HashMap<&str, usize> = HashMap::new();
        for word in &words {
            *tf.entry(word).or_insert(0) += 1;
        }

        // Hash each unique term into a dimension
        for (term, count) in &tf {
            let idx = simple_hash(term) % self.dimensions;
            vector[idx] += *count as f32;
        }

        // L2 normalize
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        vector
    }
}

fn simple_hash(s: &str) -> usize {
    let mut hash: usize = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b as usize);
    }
    hash
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed_text(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "local"
    }

    fn model_name(&self) -> &str {
        "local-hash"
    }
}

/// OpenAI API embedder (text-embedding-3-small by default).
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
    /// Explicit dimension request, forwarded to the API. Only the
    /// text-embedding-3 family accepts it.
    dims_param: Option<usize>,
    base_url: String,
    batch_size: usize,
    timeout_secs: u64,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, ProviderError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let api_key = providers::resolve_api_key(&config.api_key_env, &base_url)?;

        let dims_param = (config.dimensions > 0).then_some(config.dimensions);
        let dims = dims_param.unwrap_or_else(|| match config.model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            _ => 1536,
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Connection {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            dims,
            dims_param,
            base_url,
            batch_size: config.batch_size.max(1),
            timeout_secs: config.timeout_secs,
        })
    }

    fn request_body(&self, inputs: &[&str]) -> Value {
        let mut body = json!({
            "model": self.model,
            "input": inputs,
        });
        if let Some(dims) = self.dims_param {
            body["dimensions"] = json!(dims);
        }
        body
    }

    async fn request_embeddings(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = self.request_body(inputs);

        debug!(url = %url, model = %self.model, count = inputs.len(), "Sending embeddings request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| providers::map_send_error("OpenAI", &e, self.timeout_secs))?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| ProviderError::ApiRequest {
            message: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(providers::map_http_error("OpenAI", status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| ProviderError::ResponseParse {
                message: format!("Invalid JSON: {e}"),
            })?;

        parse_embeddings(&json, inputs.len())
    }
}

/// Parse an OpenAI-format embeddings response body.
///
/// The API may return items out of order, so results are sorted by the
/// `index` field before being returned.
fn parse_embeddings(body: &Value, expected: usize) -> Result<Vec<Vec<f32>>, ProviderError> {
    let data = body
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| ProviderError::ResponseParse {
            message: "No data in response".to_string(),
        })?;

    if data.len() != expected {
        return Err(ProviderError::ResponseParse {
            message: format!("Expected {} embeddings, got {}", expected, data.len()),
        });
    }

    let mut indexed = Vec::with_capacity(data.len());
    for item in data {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .ok_or_else(|| ProviderError::ResponseParse {
                message: "Missing index in embedding item".to_string(),
            })? as usize;
        let embedding: Vec<f32> = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| ProviderError::ResponseParse {
                message: "Missing embedding in embedding item".to_string(),
            })?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();
        indexed.push((index, embedding));
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, embedding)| embedding).collect())
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut embeddings = self.request_embeddings(&[text]).await?;
        embeddings.pop().ok_or_else(|| ProviderError::ResponseParse {
            message: "Empty embeddings response".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let inputs: Vec<&str> = batch.iter().map(String::as_str).collect();
            embeddings.extend(self.request_embeddings(&inputs).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Create an embedder based on configuration.
///
/// A hosted provider that cannot be constructed (missing API key) is an
/// error rather than a silent local fallback: an index built with one
/// provider and queried with another returns garbage matches.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, ProviderError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        "local" => {
            let dims = if config.dimensions > 0 {
                config.dimensions
            } else {
                LOCAL_DEFAULT_DIMENSIONS
            };
            Ok(Arc::new(LocalEmbedder::new(dims)))
        }
        other => {
            warn!(provider = other, "Unknown embedding provider, using local");
            let dims = if config.dimensions > 0 {
                config.dimensions
            } else {
                LOCAL_DEFAULT_DIMENSIONS
            };
            Ok(Arc::new(LocalEmbedder::new(dims)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_embedder_dimensions() {
        let embedder = LocalEmbedder::new(128);
        assert_eq!(embedder.dimensions(), 128);
        let v = embedder.embed("hello world").await.unwrap();
        assert_eq!(v.len(), 128);
    }

    #[tokio::test]
    async fn test_local_embedder_normalized() {
        let embedder = LocalEmbedder::new(128);
        let v = embedder.embed("test input text for normalization").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!(
            (norm - 1.0).abs() < 0.01,
            "Expected normalized vector, got norm={}",
            norm
        );
    }

    #[tokio::test]
    async fn test_local_embedder_empty_text() {
        let embedder = LocalEmbedder::new(128);
        let v = embedder.embed("").await.unwrap();
        assert_eq!(v.len(), 128);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_local_embedder_deterministic() {
        let embedder = LocalEmbedder::new(128);
        let v1 = embedder.embed("same text").await.unwrap();
        let v2 = embedder.embed("same text").await.unwrap();
        assert_eq!(v1, v2);
    }

    #[tokio::test]
    async fn test_local_embedder_multilingual_input() {
        let embedder = LocalEmbedder::new(128);
        let v1 = embedder.embed("गेहूं की बुवाई कब करें").await.unwrap();
        let v2 = embedder.embed("ಬಿತ್ತನೆ ಸಮಯ").await.unwrap();
        assert_eq!(v1.len(), 128);
        assert_ne!(v1, v2);
    }

    #[tokio::test]
    async fn test_embed_batch_default() {
        let embedder = LocalEmbedder::new(64);
        let texts = vec!["hello".to_string(), "world".to_string(), "test".to_string()];
        let embeddings = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 3);
        for emb in &embeddings {
            assert_eq!(emb.len(), 64);
        }
    }

    #[test]
    fn test_embedding_config_defaults() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "text-embedding-3-small");
        assert_eq!(config.dimensions, 0);
        assert_eq!(config.batch_size, 32);
    }

    #[test]
    fn test_embedding_config_deserialize_empty() {
        let config: EmbeddingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_parse_embeddings_sorts_by_index() {
        let body = json!({
            "data": [
                { "index": 1, "embedding": [0.5, 0.5] },
                { "index": 0, "embedding": [1.0, 0.0] },
            ],
            "model": "text-embedding-3-small",
        });
        let embeddings = parse_embeddings(&body, 2).unwrap();
        assert_eq!(embeddings[0], vec![1.0, 0.0]);
        assert_eq!(embeddings[1], vec![0.5, 0.5]);
    }

    #[test]
    fn test_parse_embeddings_count_mismatch() {
        let body = json!({
            "data": [{ "index": 0, "embedding": [1.0] }],
        });
        let err = parse_embeddings(&body, 2).unwrap_err();
        match err {
            ProviderError::ResponseParse { message } => {
                assert!(message.contains("Expected 2"));
            }
            _ => panic!("Expected ResponseParse, got {:?}", err),
        }
    }

    #[test]
    fn test_parse_embeddings_missing_data() {
        let body = json!({"error": {"message": "nope"}});
        assert!(parse_embeddings(&body, 1).is_err());
    }

    #[test]
    fn test_create_embedder_local() {
        let config = EmbeddingConfig {
            provider: "local".into(),
            dimensions: 256,
            ..Default::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.provider_name(), "local");
        assert_eq!(embedder.dimensions(), 256);
    }

    #[test]
    fn test_create_embedder_unknown_falls_back_to_local() {
        let config = EmbeddingConfig {
            provider: "quantum".into(),
            ..Default::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.provider_name(), "local");
        assert_eq!(embedder.dimensions(), 128);
    }

    #[test]
    fn test_openai_embedder_dimensions() {
        let config = EmbeddingConfig {
            base_url: Some("http://localhost:9999/v1".into()),
            ..Default::default()
        };
        let embedder = OpenAiEmbedder::new(&config).unwrap();
        assert_eq!(embedder.dimensions(), 1536);
        assert_eq!(embedder.model_name(), "text-embedding-3-small");
    }

    #[test]
    fn test_openai_embedder_dimension_override() {
        let config = EmbeddingConfig {
            base_url: Some("http://localhost:9999/v1".into()),
            dimensions: 512,
            ..Default::default()
        };
        let embedder = OpenAiEmbedder::new(&config).unwrap();
        assert_eq!(embedder.dimensions(), 512);

        // The override is forwarded to the API, so returned vectors match
        // the recorded dimensionality.
        let body = embedder.request_body(&["hello"]);
        assert_eq!(body["dimensions"], 512);
    }

    #[test]
    fn test_openai_request_body_omits_default_dimensions() {
        let config = EmbeddingConfig {
            base_url: Some("http://localhost:9999/v1".into()),
            ..Default::default()
        };
        let embedder = OpenAiEmbedder::new(&config).unwrap();
        let body = embedder.request_body(&["hello", "world"]);
        assert_eq!(body["model"], "text-embedding-3-small");
        assert_eq!(body["input"], json!(["hello", "world"]));
        assert!(body.get("dimensions").is_none());
    }
}
