//! Client for OpenAI-compatible vision-language endpoints.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

use super::inference::{ModelError, ModelInference, ModelResponse};

/// Configuration for the AI model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    /// Provider-specific fields merged into the request body as-is.
    pub extra_body: HashMap<String, Value>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let mut extra_body = HashMap::new();
        extra_body.insert("skip_special_tokens".to_string(), json!(false));

        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            api_key: "EMPTY".to_string(),
            model_name: "autoglm-phone-9b".to_string(),
            max_tokens: 3000,
            temperature: 0.0,
            top_p: 0.85,
            frequency_penalty: 0.2,
            extra_body,
            timeout: Duration::from_secs(120),
        }
    }
}

impl ModelConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add one provider-specific body field. Later values win.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_body.insert(key.into(), value);
        self
    }

    /// Check the settings that make a request impossible.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.base_url.trim().is_empty() {
            return Err(ModelError::InvalidConfig("base_url is empty".to_string()));
        }
        if self.model_name.trim().is_empty() {
            return Err(ModelError::InvalidConfig("model_name is empty".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(ModelError::InvalidConfig("max_tokens must be positive".to_string()));
        }
        Ok(())
    }

    /// Request body for a message list, with `extra_body` merged on top.
    fn request_body(&self, messages: &[Value]) -> Value {
        let mut body = json!({
            "messages": messages,
            "model": self.model_name,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "top_p": self.top_p,
            "frequency_penalty": self.frequency_penalty,
        });

        if let Value::Object(ref mut map) = body {
            for (key, value) in &self.extra_body {
                map.insert(key.clone(), value.clone());
            }
        }

        body
    }
}

/// OpenAI API response structures.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

/// Client for interacting with OpenAI-compatible vision-language models.
///
/// Each call sends one request. Retrying is the caller's decision, guided by
/// [`ModelError::is_retryable`].
pub struct ModelClient {
    config: ModelConfig,
    client: Client,
}

impl ModelClient {
    /// Create a new ModelClient with the given configuration.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ModelInference for ModelClient {
    async fn request(&self, messages: &[Value]) -> Result<ModelResponse, ModelError> {
        let body = self.config.request_body(messages);

        tracing::debug!(
            model = %self.config.model_name,
            messages = messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let completion: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| ModelError::ParseError(format!("invalid completion body: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::ParseError("No choices in response".to_string()))?;

        Ok(ModelResponse::from_content(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn completion(content: &str) -> String {
        json!({
            "choices": [{
                "message": { "role": "assistant", "content": content }
            }]
        })
        .to_string()
    }

    #[test]
    fn test_model_config_default() {
        let config = ModelConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000/v1");
        assert_eq!(config.model_name, "autoglm-phone-9b");
        assert_eq!(config.extra_body.get("skip_special_tokens"), Some(&json!(false)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = ModelClient::new(ModelConfig::default().with_model_name("")).err();
        assert!(matches!(err, Some(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn test_extra_body_is_merged_verbatim() {
        let config = ModelConfig::default()
            .with_extra("api-version", json!("2024-02-15-preview"))
            .with_extra("temperature", json!(0.7));
        let body = config.request_body(&[]);
        assert_eq!(body["api-version"], "2024-02-15-preview");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["model"], "autoglm-phone-9b");
    }

    #[tokio::test]
    async fn test_request_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(json!({
                "model": "vision-test",
                "max_tokens": 512,
                "api-version": "2024-02-15-preview"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(
                "<think>open it</think><answer>do(action=\"Launch\", app=\"Chrome\")</answer>",
            ))
            .create_async()
            .await;

        let config = ModelConfig::default()
            .with_base_url(format!("{}/v1", server.url()))
            .with_api_key("secret")
            .with_model_name("vision-test")
            .with_max_tokens(512)
            .with_extra("api-version", json!("2024-02-15-preview"));
        let client = ModelClient::new(config).unwrap();

        let response = client.request(&[json!({"role": "user", "content": "hi"})]).await.unwrap();
        assert_eq!(response.thinking, "open it");
        assert_eq!(response.action, "do(action=\"Launch\", app=\"Chrome\")");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let client = ModelClient::new(
            ModelConfig::default().with_base_url(format!("{}/v1", server.url())),
        )
        .unwrap();

        let err = client.request(&[]).await.unwrap_err();
        assert!(matches!(err, ModelError::Api { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retryable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;

        let client = ModelClient::new(
            ModelConfig::default().with_base_url(format!("{}/v1", server.url())),
        )
        .unwrap();

        let err = client.request(&[]).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_choices_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let client = ModelClient::new(
            ModelConfig::default().with_base_url(format!("{}/v1", server.url())),
        )
        .unwrap();

        let err = client.request(&[]).await.unwrap_err();
        assert!(matches!(err, ModelError::ParseError(_)));
    }
}
