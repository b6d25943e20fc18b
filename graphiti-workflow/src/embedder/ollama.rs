//! Native Ollama embedding client (`POST /api/embed`).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::EmbeddingConfig;
use crate::errors::{Result, WorkflowError};

use super::{EmbedderClient, Embedding};

const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Embedding>,
}

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dim: usize,
}

impl OllamaEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| WorkflowError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dim: config.dim,
        })
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn request(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { model: &self.model, input: texts })
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Embedder(format!("HTTP {}: {body}", status.as_u16())));
        }

        let reply: EmbedResponse = response
            .json()
            .await
            .map_err(|e| WorkflowError::Embedder(format!("malformed embed response: {e}")))?;

        if reply.embeddings.len() != texts.len() {
            return Err(WorkflowError::Embedder(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                reply.embeddings.len()
            )));
        }
        Ok(reply.embeddings)
    }
}

impl EmbedderClient for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.request(&[text])
            .await?
            .pop()
            .ok_or_else(|| WorkflowError::Embedder("empty response from embedding API".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

fn map_http_error(error: reqwest::Error) -> WorkflowError {
    if error.is_connect() || error.is_timeout() {
        WorkflowError::Connectivity(error.to_string())
    } else {
        WorkflowError::Embedder(error.to_string())
    }
}
