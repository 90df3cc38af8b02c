//! OpenAI-compatible chat-completion provider.
//!
//! Works against any endpoint speaking the `/chat/completions` protocol;
//! point `base_url` at Ollama or vLLM for local models.

use crate::chat::{ChatModel, ChatRequest, ChatResponse, TokenUsage};
use crate::config::ChatConfig;
use crate::error::ProviderError;
use crate::providers;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

pub struct OpenAiChatModel {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl OpenAiChatModel {
    /// Create a new provider from configuration.
    ///
    /// Reads the API key from the environment variable named in
    /// `config.api_key_env`.
    pub fn new(config: &ChatConfig) -> Result<Self, ProviderError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let api_key = providers::resolve_api_key(&config.api_key_env, &base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Connection {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Parse an OpenAI-format response body into a `ChatResponse`.
    fn parse_response(body: &Value, model: &str) -> Result<ChatResponse, ProviderError> {
        let choice = body
            .get("choices")
            .and_then(|c| c.get(0))
            .ok_or_else(|| ProviderError::ResponseParse {
                message: "No choices in response".to_string(),
            })?;

        let content = choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or("")
            .to_string();

        let usage = body.get("usage").map(|u| TokenUsage {
            prompt_tokens: u
                .get("prompt_tokens")
                .and_then(|t| t.as_u64())
                .unwrap_or(0) as usize,
            completion_tokens: u
                .get("completion_tokens")
                .and_then(|t| t.as_u64())
                .unwrap_or(0) as usize,
        });

        let resp_model = body
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(model)
            .to_string();

        Ok(ChatResponse {
            content,
            model: resp_model,
            usage,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        debug!(url = %url, model = %self.model, "Sending chat completion request");

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

        Self::parse_response(&json, &self.model)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
