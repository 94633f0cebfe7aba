//! The inference boundary the agent loop talks to.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Model client errors.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),
}

impl ModelError {
    /// Whether the same request may succeed if sent again.
    ///
    /// Network failures, timeouts, rate limits, server errors and unreadable
    /// completion bodies are retryable. Other HTTP statuses and bad
    /// configuration are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::RequestFailed(e) => !e.is_builder(),
            ModelError::Api { status, .. } => {
                *status == 408 || *status == 429 || (500..=599).contains(status)
            }
            ModelError::ParseError(_) => true,
            ModelError::InvalidConfig(_) => false,
        }
    }
}

/// Response from the AI model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub thinking: String,
    pub action: String,
    pub raw_content: String,
}

impl ModelResponse {
    /// Split raw `<think>..</think><answer>..</answer>` content.
    ///
    /// Content without an `<answer>` tag is treated as the answer itself.
    pub fn from_content(content: &str) -> Self {
        let (thinking, action) = match content.split_once("<answer>") {
            Some((think, answer)) => (
                think.replace("<think>", "").replace("</think>", "").trim().to_string(),
                answer.replace("</answer>", "").trim().to_string(),
            ),
            None => (String::new(), content.trim().to_string()),
        };

        Self {
            thinking,
            action,
            raw_content: content.to_string(),
        }
    }
}

/// Vision-language inference over an OpenAI-style message list.
#[async_trait]
pub trait ModelInference: Send + Sync {
    async fn request(&self, messages: &[Value]) -> Result<ModelResponse, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_content_with_tags() {
        let content = "<think>I need to tap the button</think><answer>do(action=\"Tap\", element=[100, 200])</answer>";
        let response = ModelResponse::from_content(content);
        assert_eq!(response.thinking, "I need to tap the button");
        assert_eq!(response.action, "do(action=\"Tap\", element=[100, 200])");
        assert_eq!(response.raw_content, content);
    }

    #[test]
    fn test_from_content_without_answer() {
        let response = ModelResponse::from_content("some raw content");
        assert_eq!(response.thinking, "");
        assert_eq!(response.action, "some raw content");
    }

    #[test]
    fn test_retry_classification() {
        let api = |status| ModelError::Api {
            status,
            body: String::new(),
        };
        assert!(api(429).is_retryable());
        assert!(api(503).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(ModelError::ParseError("no choices".into()).is_retryable());
        assert!(!ModelError::InvalidConfig("empty".into()).is_retryable());
    }
}
