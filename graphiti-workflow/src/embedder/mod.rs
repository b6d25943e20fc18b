//! Embedder client abstraction.
//!
//! Provides a trait for generating vector embeddings from text, plus the
//! closed [`EmbedderBackend`] set selected by [`ProviderKind`]:
//! - [`openai::OpenAiEmbedder`] — OpenAI-compatible `/embeddings` (incl. Ollama `/v1`)
//! - [`ollama::OllamaEmbedder`] — Ollama's native `/api/embed`

pub mod ollama;
pub mod openai;

use crate::config::{EmbeddingConfig, ProviderKind};
use crate::errors::Result;

/// A vector embedding (f32 components).
pub type Embedding = Vec<f32>;

/// Trait for text-to-vector embedding clients.
#[allow(async_fn_in_trait)]
pub trait EmbedderClient: Send + Sync {
    /// Generate an embedding for a single text string.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for a batch of texts, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Returns the configured dimensionality of embeddings.
    fn dim(&self) -> usize;
}

/// The configured embedding client.
pub enum EmbedderBackend {
    OpenAi(openai::OpenAiEmbedder),
    Ollama(ollama::OllamaEmbedder),
}

impl EmbedderBackend {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Ok(match config.provider {
            ProviderKind::OpenAi => EmbedderBackend::OpenAi(openai::OpenAiEmbedder::from_config(config)?),
            ProviderKind::Ollama => EmbedderBackend::Ollama(ollama::OllamaEmbedder::from_config(config)?),
        })
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            EmbedderBackend::OpenAi(_) => ProviderKind::OpenAi,
            EmbedderBackend::Ollama(_) => ProviderKind::Ollama,
        }
    }
}

impl EmbedderClient for EmbedderBackend {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        match self {
            EmbedderBackend::OpenAi(e) => e.embed(text).await,
            EmbedderBackend::Ollama(e) => e.embed(text).await,
        }
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        match self {
            EmbedderBackend::OpenAi(e) => e.embed_batch(texts).await,
            EmbedderBackend::Ollama(e) => e.embed_batch(texts).await,
        }
    }

    fn dim(&self) -> usize {
        match self {
            EmbedderBackend::OpenAi(e) => e.dim(),
            EmbedderBackend::Ollama(e) => e.dim(),
        }
    }
}
