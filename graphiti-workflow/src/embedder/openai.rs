//! OpenAI-compatible embedding client.
//!
//! Wraps [`async_openai`] to provide [`EmbedderClient`] for any `/embeddings`
//! endpoint (OpenAI itself, or Ollama's `/v1`), with chunked batches and
//! exponential-backoff retry on connection faults.

use async_openai::{
    config::OpenAIConfig, error::OpenAIError, types::CreateEmbeddingRequestArgs, Client,
};
use backoff::{future::retry, ExponentialBackoffBuilder};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::EmbeddingConfig;
use crate::embedder::{EmbedderClient, Embedding};
use crate::errors::{Result, WorkflowError};

/// Maximum number of inputs per embeddings API call.
const BATCH_CHUNK_SIZE: usize = 256;

/// Classify an [`OpenAIError`] as transient (should retry) or permanent.
fn classify_error(err: OpenAIError) -> backoff::Error<WorkflowError> {
    match &err {
        OpenAIError::Reqwest(e) if e.is_timeout() || e.is_connect() => {
            warn!(error = %e, "embedding endpoint unreachable, retrying");
            backoff::Error::transient(WorkflowError::Connectivity(err.to_string()))
        }
        _ => backoff::Error::permanent(WorkflowError::Embedder(err.to_string())),
    }
}

/// OpenAI-compatible embedding client that implements [`EmbedderClient`].
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dim: usize,
    max_retry_elapsed: Duration,
}

impl OpenAiEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.clone())
            .with_api_base(config.base_url.trim_end_matches('/'));
        Ok(Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            dim: config.dim,
            max_retry_elapsed: Duration::from_secs(60),
        })
    }

    /// Bound the total time spent retrying connection faults.
    pub fn with_max_retry_elapsed(mut self, elapsed: Duration) -> Self {
        self.max_retry_elapsed = elapsed;
        self
    }

    /// Issue a single embeddings API call for up to [`BATCH_CHUNK_SIZE`] texts.
    async fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_interval(Duration::from_secs(10))
            .with_max_elapsed_time(Some(self.max_retry_elapsed))
            .build();

        let input: Vec<String> = texts.iter().map(|s| (*s).to_owned()).collect();

        let embeddings = retry(policy, || async {
            let request = CreateEmbeddingRequestArgs::default()
                .model(self.model.as_str())
                .input(input.clone())
                .build()
                .map_err(|e| backoff::Error::permanent(WorkflowError::Embedder(e.to_string())))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(classify_error)?;

            let mut data = response.data;
            data.sort_by_key(|item| item.index);
            let embeddings: Vec<Embedding> = data
                .into_iter()
                .map(|item| item.embedding.into_iter().map(|x| x as f32).collect())
                .collect();
            Ok::<_, backoff::Error<WorkflowError>>(embeddings)
        })
        .await?;

        if embeddings.len() != texts.len() {
            return Err(WorkflowError::Embedder(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        debug!(count = embeddings.len(), model = %self.model, "embeddings received");
        Ok(embeddings)
    }
}

impl EmbedderClient for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.embed_chunk(&[text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| WorkflowError::Embedder("empty response from embedding API".to_string()))
    }

    /// Embed multiple texts, split into chunks of at most [`BATCH_CHUNK_SIZE`].
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut result = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_CHUNK_SIZE) {
            result.extend(self.embed_chunk(chunk).await?);
        }
        Ok(result)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}
