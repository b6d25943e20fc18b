//! OpenAI-compatible LLM client.
//!
//! Uses `async-openai` for API calls, `moka` for response caching, and
//! `backoff` for exponential-backoff retry on rate limits and connection faults.
//! Pointing `base_url` at `http://localhost:11434/v1` drives a local Ollama.

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use backoff::ExponentialBackoffBuilder;
use moka::future::Cache;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::CompletionConfig;
use crate::errors::{LlmError, Result, WorkflowError};

use super::{LlmClient, Message};

const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for the in-process response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_capacity: u64,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1_000,
            ttl: Duration::from_secs(3_600),
        }
    }
}

/// OpenAI-compatible chat client implementing [`LlmClient`].
pub struct OpenAiClient {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retry_elapsed: Duration,
    /// Keyed by md5 of `{mode}{model}{messages}`.
    cache: Cache<String, String>,
}

impl OpenAiClient {
    /// Build a client for `config.base_url` with the default cache.
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        Self::with_cache(config, CacheConfig::default())
    }

    pub fn with_cache(config: &CompletionConfig, cache_config: CacheConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| WorkflowError::Configuration(format!("HTTP client: {e}")))?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.clone())
            .with_api_base(config.base_url.trim_end_matches('/'));
        let client = async_openai::Client::with_config(openai_config).with_http_client(http);

        let cache = Cache::builder()
            .max_capacity(cache_config.max_capacity)
            .time_to_live(cache_config.ttl)
            .build();

        Ok(Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retry_elapsed: Duration::from_secs(120),
            cache,
        })
    }

    /// Bound the total time spent retrying transient failures.
    pub fn with_max_retry_elapsed(mut self, elapsed: Duration) -> Self {
        self.max_retry_elapsed = elapsed;
        self
    }

    fn cache_key(&self, mode: &str, messages: &[Message]) -> String {
        use md5::{Digest, Md5};
        let mut h = Md5::new();
        h.update(mode.as_bytes());
        h.update(self.model.as_bytes());
        for m in messages {
            h.update(m.role.as_str().as_bytes());
            h.update(m.content.as_bytes());
        }
        format!("{:x}", h.finalize())
    }

    async fn complete(&self, messages: &[Message], json_mode: bool) -> Result<String> {
        let mode = if json_mode { "json" } else { "text" };
        let key = self.cache_key(mode, messages);

        if let Some(cached) = self.cache.get(&key).await {
            debug!(mode, "LLM cache hit");
            return Ok(cached);
        }

        let mut request = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        if json_mode {
            request["response_format"] = json!({ "type": "json_object" });
        }

        let response = self.call_with_retry(request).await?;
        let content = extract_content(&response)?;

        self.cache.insert(key, content.clone()).await;
        Ok(content)
    }

    /// Call the chat completions endpoint, retrying rate limits and connection faults.
    async fn call_with_retry(&self, request: serde_json::Value) -> Result<serde_json::Value> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_interval(Duration::from_secs(30))
            .with_max_elapsed_time(Some(self.max_retry_elapsed))
            .build();

        backoff::future::retry(policy, || async {
            let outcome: std::result::Result<serde_json::Value, OpenAIError> =
                self.client.chat().create_byot(request.clone()).await;

            outcome.map_err(|e| {
                let err = map_openai_error(e);
                match &err {
                    WorkflowError::Llm(LlmError::RateLimit) => {
                        warn!(model = %self.model, "rate limited, retrying with backoff");
                        backoff::Error::transient(err)
                    }
                    WorkflowError::Connectivity(reason) => {
                        warn!(model = %self.model, %reason, "completion endpoint unreachable, retrying");
                        backoff::Error::transient(err)
                    }
                    _ => backoff::Error::permanent(err),
                }
            })
        })
        .await
    }
}

impl LlmClient for OpenAiClient {
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        self.complete(messages, false).await
    }

    async fn generate_json(&self, messages: &[Message]) -> Result<String> {
        self.complete(messages, true).await
    }
}

/// Extract the assistant message text from a chat-completions response.
fn extract_content(response: &serde_json::Value) -> Result<String> {
    let choice = &response["choices"][0];
    if choice["message"]["refusal"].is_string() {
        return Err(LlmError::Refusal.into());
    }
    match choice["message"]["content"].as_str() {
        Some(text) if !text.trim().is_empty() => Ok(text.to_owned()),
        _ => Err(LlmError::EmptyResponse.into()),
    }
}

/// Map an [`OpenAIError`] onto the workflow taxonomy.
fn map_openai_error(err: OpenAIError) -> WorkflowError {
    match err {
        OpenAIError::Reqwest(e) if e.is_connect() || e.is_timeout() => {
            WorkflowError::Connectivity(e.to_string())
        }
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().unwrap_or_default();
            let kind = api.r#type.as_deref().unwrap_or_default();
            let llm = match (code, kind) {
                ("invalid_api_key", _) | (_, "authentication_error") => LlmError::Authentication,
                ("rate_limit_exceeded", _) | (_, "rate_limit_error") => LlmError::RateLimit,
                _ => LlmError::Api {
                    status: 0,
                    message: api.message,
                },
            };
            WorkflowError::Llm(llm)
        }
        other => WorkflowError::Llm(LlmError::Api {
            status: 0,
            message: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(base_url: &str) -> OpenAiClient {
        let config = CompletionConfig {
            base_url: base_url.to_string(),
            api_key: "test-key".to_string(),
            model: "llama3.2".to_string(),
            max_tokens: 512,
            ..CompletionConfig::default()
        };
        OpenAiClient::from_config(&config)
            .expect("client builds")
            .with_max_retry_elapsed(Duration::ZERO)
    }

    fn chat_completions_response(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "created": 1700000000_u64,
            "model": "llama3.2",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop",
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30 }
        })
    }

    #[tokio::test]
    async fn generate_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "model": "llama3.2", "max_tokens": 512 })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_completions_response("Hello from Ollama!")),
            )
            .mount(&server)
            .await;

        let reply = client_for(&server.uri())
            .generate(&[Message::user("Say hello")])
            .await
            .expect("generate should succeed");
        assert_eq!(reply, "Hello from Ollama!");
    }

    #[tokio::test]
    async fn generate_json_requests_json_object_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "response_format": { "type": "json_object" } })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_completions_response("{\"ok\": true}")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server.uri())
            .generate_json(&[Message::user("json please")])
            .await
            .expect("json mode call");
        assert_eq!(reply, "{\"ok\": true}");
    }

    #[tokio::test]
    async fn generate_uses_cache_on_second_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_completions_response("cached")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let msgs = [Message::user("Same question")];
        assert_eq!(client.generate(&msgs).await.unwrap(), "cached");
        assert_eq!(client.generate(&msgs).await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn empty_content_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completions_response("")))
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .generate(&[Message::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Llm(LlmError::EmptyResponse)), "{err:?}");
    }

    #[tokio::test]
    async fn auth_error_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {
                    "message": "Incorrect API key",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": "invalid_api_key"
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .generate(&[Message::user("Hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Llm(LlmError::Authentication)), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_connectivity_fault() {
        let err = client_for("http://127.0.0.1:9/v1")
            .generate(&[Message::user("Hello")])
            .await
            .unwrap_err();
        assert!(err.is_connectivity(), "{err:?}");
    }

    #[test]
    fn cache_key_differs_by_mode_and_content() {
        let client = OpenAiClient::from_config(&CompletionConfig::default()).unwrap();
        let a = [Message::user("hello")];
        let b = [Message::user("world")];
        assert_ne!(client.cache_key("text", &a), client.cache_key("text", &b));
        assert_ne!(client.cache_key("text", &a), client.cache_key("json", &a));
    }

    #[test]
    fn cache_key_differs_by_model() {
        let config = CompletionConfig::default();
        let a = OpenAiClient::from_config(&config).unwrap();
        let b = OpenAiClient::from_config(&CompletionConfig {
            model: "qwen2.5".to_string(),
            ..config.clone()
        })
        .unwrap();
        let msgs = [Message::user("hello")];
        assert_ne!(a.cache_key("text", &msgs), b.cache_key("text", &msgs));
    }
}
