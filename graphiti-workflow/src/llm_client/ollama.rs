//! Native Ollama chat client (`POST /api/chat`).

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::CompletionConfig;
use crate::errors::{LlmError, Result, WorkflowError};

use super::{LlmClient, Message};

const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: String,
}

/// Client for a local Ollama server's chat endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaClient {
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| WorkflowError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[instrument(skip(self, messages), fields(model = %self.model, json = format.is_some()))]
    async fn chat(&self, messages: &[Message], format: Option<&str>) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            format,
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }

        let reply: ChatResponse = response.json().await.map_err(|e| {
            WorkflowError::Llm(LlmError::Api {
                status: status.as_u16(),
                message: format!("malformed chat response: {e}"),
            })
        })?;
        debug!(chars = reply.message.content.len(), "chat reply received");

        if reply.message.content.trim().is_empty() {
            return Err(LlmError::EmptyResponse.into());
        }
        Ok(reply.message.content)
    }
}

impl LlmClient for OllamaClient {
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        self.chat(messages, None).await
    }

    async fn generate_json(&self, messages: &[Message]) -> Result<String> {
        self.chat(messages, Some("json")).await
    }
}

/// Map a transport failure; refused connections and timeouts are connectivity faults.
fn map_http_error(error: reqwest::Error) -> WorkflowError {
    if error.is_connect() || error.is_timeout() {
        WorkflowError::Connectivity(error.to_string())
    } else {
        WorkflowError::Llm(LlmError::Api {
            status: error.status().map_or(0, |s| s.as_u16()),
            message: error.to_string(),
        })
    }
}

fn map_status(status: StatusCode, body: String) -> WorkflowError {
    let llm = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Authentication,
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimit,
        other => LlmError::Api {
            status: other.as_u16(),
            message: body,
        },
    };
    WorkflowError::Llm(llm)
}
