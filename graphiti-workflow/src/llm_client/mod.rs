//! LLM client abstraction.
//!
//! # Implementations
//! - [`openai::OpenAiClient`] — any OpenAI-compatible chat endpoint via `async-openai`
//!   (OpenAI itself, or Ollama's `/v1`).
//! - [`ollama::OllamaClient`] — Ollama's native `/api/chat`.
//!
//! [`LlmBackend`] is the closed set of these, picked by [`ProviderKind`].

pub mod ollama;
pub mod openai;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{CompletionConfig, ProviderKind};
use crate::errors::{LlmError, Result};
use crate::utils::extract_json_object;

/// A chat message for the LLM conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
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

/// Speaker role in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Trait for chat-completion clients.
#[allow(async_fn_in_trait)]
pub trait LlmClient: Send + Sync {
    /// Send a request and return the reply as plain text.
    async fn generate(&self, messages: &[Message]) -> Result<String>;

    /// Send a request with the provider's JSON mode switched on.
    async fn generate_json(&self, messages: &[Message]) -> Result<String>;

    /// Send a request and parse the reply as `T`.
    ///
    /// The JSON schema of `T` is given to the model as a system message and the
    /// first JSON object in the reply is deserialized. Local models rarely honour
    /// strict schema response formats, so this does not rely on them.
    async fn generate_structured<T>(&self, messages: &[Message]) -> Result<T>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let mut request = Vec::with_capacity(messages.len() + 1);
        request.push(schema_instruction::<T>()?);
        request.extend_from_slice(messages);

        let reply = self.generate_json(&request).await?;
        parse_structured(&reply)
    }
}

/// The configured completion client.
pub enum LlmBackend {
    OpenAi(openai::OpenAiClient),
    Ollama(ollama::OllamaClient),
}

impl LlmBackend {
    pub fn from_config(config: &CompletionConfig) -> Result<Self> {
        Ok(match config.provider {
            ProviderKind::OpenAi => LlmBackend::OpenAi(openai::OpenAiClient::from_config(config)?),
            ProviderKind::Ollama => LlmBackend::Ollama(ollama::OllamaClient::from_config(config)?),
        })
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            LlmBackend::OpenAi(_) => ProviderKind::OpenAi,
            LlmBackend::Ollama(_) => ProviderKind::Ollama,
        }
    }
}

impl LlmClient for LlmBackend {
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        match self {
            LlmBackend::OpenAi(client) => client.generate(messages).await,
            LlmBackend::Ollama(client) => client.generate(messages).await,
        }
    }

    async fn generate_json(&self, messages: &[Message]) -> Result<String> {
        match self {
            LlmBackend::OpenAi(client) => client.generate_json(messages).await,
            LlmBackend::Ollama(client) => client.generate_json(messages).await,
        }
    }
}

fn schema_instruction<T: JsonSchema>() -> Result<Message> {
    let schema = serde_json::to_string(&schemars::schema_for!(T))?;
    Ok(Message::system(format!(
        "Respond only with a JSON object that conforms to this JSON schema:\n{schema}"
    )))
}

fn parse_structured<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let json = extract_json_object(reply)
        .ok_or_else(|| LlmError::InvalidJson(crate::utils::display_label(reply, 120)))?;
    Ok(serde_json::from_str(json)?)
}
