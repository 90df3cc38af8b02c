//! Chat-completion provider implementations and shared HTTP plumbing.

pub mod openai;

pub use openai::OpenAiChatModel;

use crate::chat::ChatModel;
use crate::config::ChatConfig;
use crate::error::{ConfigError, ProviderError, SahayakError};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Resolve an API key from the configured environment variable.
///
/// Local endpoints (Ollama, vLLM, LM Studio) don't require a key, so a
/// localhost base URL gets a dummy bearer token instead of an error.
pub(crate) fn resolve_api_key(api_key_env: &str, base_url: &str) -> Result<String, ProviderError> {
    if let Ok(key) = std::env::var(api_key_env) {
        if !key.is_empty() {
            return Ok(key);
        }
    }
    if base_url.contains("localhost") || base_url.contains("127.0.0.1") {
        debug!("No API key set for local endpoint; using dummy bearer token");
        return Ok("local".to_string());
    }
    Err(ProviderError::AuthFailed {
        provider: format!("env var '{api_key_env}' not set"),
    })
}

/// Map a reqwest transport error to the appropriate `ProviderError`.
pub(crate) fn map_send_error(
    provider: &str,
    error: &reqwest::Error,
    timeout_secs: u64,
) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout { timeout_secs }
    } else if error.is_connect() {
        ProviderError::Connection {
            message: format!("{provider}: {error}"),
        }
    } else {
        ProviderError::ApiRequest {
            message: format!("Request failed: {error}"),
        }
    }
}

/// Map an HTTP status code to the appropriate `ProviderError`.
pub(crate) fn map_http_error(
    provider: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> ProviderError {
    match status.as_u16() {
        401 | 403 => {
            debug!(body = %body, "Authentication failed ({status})");
            ProviderError::AuthFailed {
                provider: provider.to_string(),
            }
        }
        429 => {
            // Try to extract the wait from "Rate limit... try again in Xs"
            let retry_secs = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| {
                    v.get("error")?
                        .get("message")?
                        .as_str()
                        .map(|s| s.to_string())
                })
                .and_then(|msg| {
                    msg.split("in ")
                        .last()
                        .and_then(|s| s.trim_end_matches('s').parse::<u64>().ok())
                })
                .unwrap_or(5);
            ProviderError::RateLimited {
                retry_after_secs: retry_secs,
            }
        }
        status if status >= 500 => ProviderError::ApiRequest {
            message: format!("Server error ({}): {}", status, body),
        },
        _ => ProviderError::ApiRequest {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// Create a chat model based on configuration.
pub fn create_chat_model(config: &ChatConfig) -> Result<Arc<dyn ChatModel>, SahayakError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiChatModel::new(config)?)),
        other => Err(ConfigError::Invalid {
            message: format!("Unknown chat provider '{other}'"),
        }
        .into()),
    }
}
