//! Chat-completion types and the provider trait.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A request to a chat-completion provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Return the provider name (for logging and error messages).
    fn provider_name(&self) -> &str;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// A mock chat model for testing.
pub struct MockChatModel {
    model: String,
    responses: std::sync::Mutex<Vec<ChatResponse>>,
    requests: std::sync::Mutex<Vec<ChatRequest>>,
}

impl MockChatModel {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: std::sync::Mutex::new(Vec::new()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a MockChatModel that always returns the given text.
    ///
    /// Queues multiple copies of the response so it can handle multiple calls.
    pub fn with_response(text: &str) -> Self {
        let model = Self::new();
        for _ in 0..20 {
            model.queue_response(Self::text_response(text));
        }
        model
    }

    /// Queue a response to be returned by the next `complete` call.
    pub fn queue_response(&self, response: ChatResponse) {
        self.responses.lock().unwrap().push(response);
    }

    /// Create a simple text response for testing.
    pub fn text_response(text: &str) -> ChatResponse {
        ChatResponse {
            content: text.to_string(),
            model: "mock-model".to_string(),
            usage: Some(TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
            }),
        }
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(MockChatModel::text_response("mock answer"))
        } else {
            Ok(responses.remove(0))
        }
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_mock_returns_queued_responses_in_order() {
        let model = MockChatModel::new();
        model.queue_response(MockChatModel::text_response("first"));
        model.queue_response(MockChatModel::text_response("second"));

        let request = ChatRequest {
            messages: vec![ChatMessage::user("hello")],
            temperature: 0.7,
            max_tokens: None,
        };
        let first = model.complete(request.clone()).await.unwrap();
        let second = model.complete(request).await.unwrap();
        assert_eq!(first.content, "first");
        assert_eq!(second.content, "second");
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let model = MockChatModel::with_response("ok");
        let request = ChatRequest {
            messages: vec![
                ChatMessage::system("be helpful"),
                ChatMessage::user("what now?"),
            ],
            temperature: 0.2,
            max_tokens: Some(64),
        };
        model.complete(request).await.unwrap();

        let seen = model.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages.len(), 2);
        assert_eq!(seen[0].messages[1].content, "what now?");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
